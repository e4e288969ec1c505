use anyhow::{anyhow, Context};
use axum::async_trait;
use chrono::Utc;
use civic_api::{
    Comment, CommentId, CommentStore, Issue, IssueId, IssueStatus, NewComment, NewIssue, NewUser,
    Time, UpvoteState, User, UserId, Uuid,
};
use futures::TryStreamExt;
use sqlx::{sqlite::SqliteRow, Connection, Row};

use crate::Error;

pub async fn create_user(conn: &mut sqlx::SqliteConnection, u: NewUser) -> Result<User, Error> {
    u.validate()?;
    let mut tx = conn.begin().await.context("starting transaction")?;
    let taken = sqlx::query("SELECT id FROM users WHERE email = ?")
        .bind(&u.email)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("checking whether email {:?} is taken", u.email))?;
    if taken.is_some() {
        return Err(Error::email_already_used(u.email));
    }
    let user = User {
        id: UserId(Uuid::new_v4()),
        name: u.name,
        email: u.email,
    };
    sqlx::query("INSERT INTO users (id, name, email) VALUES (?, ?, ?)")
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("inserting user {:?}", user.id))?;
    tx.commit().await.context("committing user creation")?;
    Ok(user)
}

pub async fn fetch_users(conn: &mut sqlx::SqliteConnection) -> anyhow::Result<Vec<User>> {
    sqlx::query("SELECT id, name, email FROM users ORDER BY rowid")
        .fetch(conn)
        .map_err(anyhow::Error::from)
        .and_then(|u| async move {
            Ok(User {
                id: UserId(u.try_get("id").context("retrieving the id field")?),
                name: u.try_get("name").context("retrieving the name field")?,
                email: u.try_get("email").context("retrieving the email field")?,
            })
        })
        .try_collect()
        .await
        .context("querying users table")
}

async fn user_name(conn: &mut sqlx::SqliteConnection, user: UserId) -> anyhow::Result<Option<String>> {
    Ok(sqlx::query("SELECT name FROM users WHERE id = ?")
        .bind(user.0)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("looking up user {:?}", user))?
        .map(|r| r.try_get::<String, _>("name"))
        .transpose()
        .context("retrieving the name field")?)
}

async fn issue_exists(conn: &mut sqlx::SqliteConnection, issue: IssueId) -> anyhow::Result<bool> {
    Ok(sqlx::query("SELECT id FROM issues WHERE id = ?")
        .bind(issue.0)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("looking up issue {:?}", issue))?
        .is_some())
}

const ISSUE_COLUMNS: &str = "
    i.id, i.user_id, i.title, i.description, i.category, i.address, i.status, i.created_at,
    (SELECT COUNT(*) FROM issue_upvotes u WHERE u.issue_id = i.id) AS upvotes,
    EXISTS (
        SELECT 1 FROM issue_upvotes u WHERE u.issue_id = i.id AND u.user_id = ?
    ) AS has_upvoted
";

fn issue_from_row(i: &SqliteRow) -> anyhow::Result<Issue> {
    let status: String = i.try_get("status").context("retrieving the status field")?;
    Ok(Issue {
        id: IssueId(i.try_get("id").context("retrieving the id field")?),
        user_id: UserId(i.try_get("user_id").context("retrieving the user_id field")?),
        title: i.try_get("title").context("retrieving the title field")?,
        description: i
            .try_get("description")
            .context("retrieving the description field")?,
        category: i.try_get("category").context("retrieving the category field")?,
        address: i.try_get("address").context("retrieving the address field")?,
        status: status
            .parse()
            .map_err(|_| anyhow!("issue has unknown status {status:?}"))?,
        upvotes: i.try_get("upvotes").context("retrieving the upvotes field")?,
        has_upvoted: i
            .try_get::<i64, _>("has_upvoted")
            .context("retrieving the has_upvoted field")?
            != 0,
        created_at: i
            .try_get::<Time, _>("created_at")
            .context("retrieving the created_at field")?,
    })
}

pub async fn create_issue(conn: &mut sqlx::SqliteConnection, i: NewIssue) -> Result<Issue, Error> {
    let owner = i.validate()?;
    if user_name(&mut *conn, owner).await?.is_none() {
        return Err(Error::unknown_user(owner));
    }
    let issue = Issue {
        id: IssueId(Uuid::new_v4()),
        user_id: owner,
        title: i.title,
        description: i.description,
        category: i.category,
        address: i.address,
        status: IssueStatus::Open,
        upvotes: 0,
        has_upvoted: false,
        created_at: Utc::now(),
    };
    sqlx::query(
        "
            INSERT INTO issues (id, user_id, title, description, category, address, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(issue.id.0)
    .bind(issue.user_id.0)
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(&issue.category)
    .bind(&issue.address)
    .bind(issue.status.as_str())
    .bind(issue.created_at)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting issue {:?}", issue.id))?;
    Ok(issue)
}

/// Newest first; `has_upvoted` is computed for `for_user`
pub async fn fetch_issues(
    conn: &mut sqlx::SqliteConnection,
    for_user: Option<UserId>,
) -> anyhow::Result<Vec<Issue>> {
    let rows = sqlx::query(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues i ORDER BY i.created_at DESC, i.rowid DESC"
    ))
    .bind(for_user.map(|u| u.0))
    .fetch_all(conn)
    .await
    .context("querying issues table")?;
    rows.iter().map(issue_from_row).collect()
}

/// Issues reported by `owner`, newest first, with `has_upvoted` computed for `owner`
pub async fn fetch_user_issues(
    conn: &mut sqlx::SqliteConnection,
    owner: UserId,
) -> anyhow::Result<Vec<Issue>> {
    let rows = sqlx::query(&format!(
        "
            SELECT {ISSUE_COLUMNS} FROM issues i
            WHERE i.user_id = ?
            ORDER BY i.created_at DESC, i.rowid DESC
        "
    ))
    .bind(owner.0)
    .bind(owner.0)
    .fetch_all(conn)
    .await
    .with_context(|| format!("querying issues of {:?}", owner))?;
    rows.iter().map(issue_from_row).collect()
}

pub async fn fetch_issue(
    conn: &mut sqlx::SqliteConnection,
    issue: IssueId,
    for_user: Option<UserId>,
) -> Result<Issue, Error> {
    let row = sqlx::query(&format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.id = ?"))
        .bind(for_user.map(|u| u.0))
        .bind(issue.0)
        .fetch_optional(conn)
        .await
        .with_context(|| format!("querying issue {:?}", issue))?;
    match row {
        None => Err(Error::unknown_issue(issue)),
        Some(row) => Ok(issue_from_row(&row)?),
    }
}

pub async fn set_status(
    conn: &mut sqlx::SqliteConnection,
    issue: IssueId,
    status: IssueStatus,
) -> Result<Issue, Error> {
    let res = sqlx::query("UPDATE issues SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(issue.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("setting status of issue {:?}", issue))?;
    if res.rows_affected() == 0 {
        return Err(Error::unknown_issue(issue));
    }
    fetch_issue(conn, issue, None).await
}

pub async fn toggle_upvote(
    conn: &mut sqlx::SqliteConnection,
    issue: IssueId,
    user: UserId,
) -> Result<UpvoteState, Error> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    if !issue_exists(&mut *tx, issue).await? {
        return Err(Error::unknown_issue(issue));
    }
    if user_name(&mut *tx, user).await?.is_none() {
        return Err(Error::unknown_user(user));
    }
    let removed = sqlx::query("DELETE FROM issue_upvotes WHERE issue_id = ? AND user_id = ?")
        .bind(issue.0)
        .bind(user.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("removing upvote of {:?} on {:?}", user, issue))?
        .rows_affected();
    if removed == 0 {
        sqlx::query("INSERT INTO issue_upvotes (issue_id, user_id) VALUES (?, ?)")
            .bind(issue.0)
            .bind(user.0)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("adding upvote of {:?} on {:?}", user, issue))?;
    }
    let upvotes: i64 = sqlx::query("SELECT COUNT(*) AS upvotes FROM issue_upvotes WHERE issue_id = ?")
        .bind(issue.0)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("counting upvotes on {:?}", issue))?
        .try_get("upvotes")
        .context("retrieving the upvotes field")?;
    tx.commit().await.context("committing upvote toggle")?;
    Ok(UpvoteState {
        upvotes,
        has_upvoted: removed == 0,
    })
}

/// All comments of `issue`, oldest first, with insertion order breaking ties
pub async fn fetch_comments(
    conn: &mut sqlx::SqliteConnection,
    issue: IssueId,
) -> anyhow::Result<Vec<Comment>> {
    sqlx::query(
        "
            SELECT c.id, c.issue_id, c.user_id, c.parent_id, c.text, c.created_at,
                users.name AS author_name
            FROM comments c
            LEFT JOIN users
                ON users.id = c.user_id
            WHERE c.issue_id = ?
            ORDER BY c.created_at ASC, c.rowid ASC
        ",
    )
    .bind(issue.0)
    .fetch(conn)
    .map_err(anyhow::Error::from)
    .and_then(|c| async move {
        Ok(Comment {
            id: CommentId(c.try_get("id").context("retrieving the id field")?),
            issue_id: IssueId(c.try_get("issue_id").context("retrieving the issue_id field")?),
            user_id: UserId(c.try_get("user_id").context("retrieving the user_id field")?),
            author_name: c
                .try_get("author_name")
                .context("retrieving the author_name field")?,
            text: c.try_get("text").context("retrieving the text field")?,
            parent_id: c
                .try_get::<Option<Uuid>, _>("parent_id")
                .context("retrieving the parent_id field")?
                .map(CommentId),
            created_at: c
                .try_get::<Time, _>("created_at")
                .context("retrieving the created_at field")?,
        })
    })
    .try_collect()
    .await
    .with_context(|| format!("querying comments of issue {:?}", issue))
}

pub async fn append_comment(
    conn: &mut sqlx::SqliteConnection,
    issue: IssueId,
    c: NewComment,
) -> Result<Comment, Error> {
    let author = c.validate()?;
    let mut tx = conn.begin().await.context("starting transaction")?;
    if !issue_exists(&mut *tx, issue).await? {
        return Err(Error::unknown_issue(issue));
    }
    let author_name = match user_name(&mut *tx, author).await? {
        None => return Err(Error::unknown_user(author)),
        Some(name) => name,
    };
    if let Some(parent) = c.parent_id {
        let found = sqlx::query("SELECT id FROM comments WHERE id = ? AND issue_id = ?")
            .bind(parent.0)
            .bind(issue.0)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("looking up parent comment {:?}", parent))?;
        if found.is_none() {
            return Err(Error::unknown_parent(parent));
        }
    }
    let comment = Comment {
        id: CommentId(Uuid::new_v4()),
        issue_id: issue,
        user_id: author,
        author_name: Some(author_name),
        text: c.text,
        parent_id: c.parent_id,
        created_at: Utc::now(),
    };
    let res = sqlx::query(
        "
            INSERT INTO comments (id, issue_id, user_id, parent_id, text, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(comment.id.0)
    .bind(comment.issue_id.0)
    .bind(comment.user_id.0)
    .bind(comment.parent_id.map(|p| p.0))
    .bind(&comment.text)
    .bind(comment.created_at)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("inserting comment {:?}", comment.id))?;
    if res.rows_affected() != 1 {
        return Err(Error::Anyhow(anyhow!(
            "insertion of comment {:?} affected {} rows",
            comment.id,
            res.rows_affected()
        )));
    }
    tx.commit().await.context("committing comment")?;
    tracing::debug!(comment = ?comment.id, ?issue, "stored comment");
    Ok(comment)
}

/// The comment store behind one pooled connection
pub struct SqliteDb<'a> {
    pub conn: &'a mut sqlx::SqliteConnection,
}

#[async_trait]
impl<'a> CommentStore for SqliteDb<'a> {
    type Error = Error;

    async fn list_comments(&mut self, issue: IssueId) -> Result<Vec<Comment>, Error> {
        Ok(fetch_comments(&mut *self.conn, issue).await?)
    }

    async fn append_comment(&mut self, issue: IssueId, c: NewComment) -> Result<Comment, Error> {
        append_comment(&mut *self.conn, issue, c).await
    }
}
