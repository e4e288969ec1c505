use anyhow::Context;
use axum::{
    extract::{Path, Query},
    Json,
};
use civic_api::{
    Comment, Error as ApiError, Issue, IssueId, NewComment, NewIssue, NewUser, SetStatus,
    UpvoteRequest, UpvoteState, User, UserId, Uuid,
};

use crate::{db, extractors::*, Error};

/// `?userId=` on issue reads, for whom `hasUpvoted` is computed
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: Option<Uuid>,
}

impl Viewer {
    fn user(&self) -> Option<UserId> {
        self.user_id.map(UserId)
    }
}

pub async fn create_user(mut conn: DbConn, Json(data): Json<NewUser>) -> Result<Json<User>, Error> {
    data.validate()?;
    Ok(Json(db::create_user(&mut *conn, data).await?))
}

pub async fn fetch_users(mut conn: DbConn) -> Result<Json<Vec<User>>, Error> {
    Ok(Json(
        db::fetch_users(&mut *conn)
            .await
            .context("fetching user list")?,
    ))
}

pub async fn create_issue(
    mut conn: DbConn,
    Json(data): Json<NewIssue>,
) -> Result<Json<Issue>, Error> {
    data.validate()?;
    Ok(Json(db::create_issue(&mut *conn, data).await?))
}

pub async fn fetch_issues(
    mut conn: DbConn,
    Query(viewer): Query<Viewer>,
) -> Result<Json<Vec<Issue>>, Error> {
    Ok(Json(
        db::fetch_issues(&mut *conn, viewer.user())
            .await
            .with_context(|| format!("fetching issue list for {:?}", viewer.user()))?,
    ))
}

pub async fn fetch_user_issues(
    mut conn: DbConn,
    Path(user): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, Error> {
    Ok(Json(db::fetch_user_issues(&mut *conn, UserId(user)).await?))
}

pub async fn fetch_issue(
    mut conn: DbConn,
    Path(issue): Path<Uuid>,
    Query(viewer): Query<Viewer>,
) -> Result<Json<Issue>, Error> {
    Ok(Json(
        db::fetch_issue(&mut *conn, IssueId(issue), viewer.user()).await?,
    ))
}

pub async fn set_status(
    mut conn: DbConn,
    Path(issue): Path<Uuid>,
    Json(data): Json<SetStatus>,
) -> Result<Json<Issue>, Error> {
    let status = data.validate()?;
    Ok(Json(db::set_status(&mut *conn, IssueId(issue), status).await?))
}

pub async fn toggle_upvote(
    mut conn: DbConn,
    Path(issue): Path<Uuid>,
    Json(data): Json<UpvoteRequest>,
) -> Result<Json<UpvoteState>, Error> {
    let user = data.user_id.ok_or(ApiError::MissingUser)?;
    Ok(Json(
        db::toggle_upvote(&mut *conn, IssueId(issue), user).await?,
    ))
}

pub async fn fetch_comments(
    mut conn: DbConn,
    Path(issue): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, Error> {
    let issue = IssueId(issue);
    Ok(Json(
        db::fetch_comments(&mut *conn, issue)
            .await
            .with_context(|| format!("fetching comments of {:?}", issue))?,
    ))
}

pub async fn append_comment(
    mut conn: DbConn,
    Path(issue): Path<Uuid>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    data.validate()?;
    Ok(Json(
        db::append_comment(&mut *conn, IssueId(issue), data).await?,
    ))
}
