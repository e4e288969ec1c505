use async_trait::async_trait;
use civic_client::api::{
    self, Comment, CommentStore, Issue, IssueId, NewComment, NewIssue, NewUser, SetStatus,
    UpvoteRequest, UpvoteState, User, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] api::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// The civic server, reached over HTTP
pub struct Client {
    http: reqwest::Client,
    host: String,
}

impl Client {
    pub fn new(host: String) -> Client {
        Client {
            http: reqwest::Client::new(),
            host: String::from(host.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }

    async fn send<R>(&self, req: reqwest::RequestBuilder) -> Result<R, Error>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let body = resp.bytes().await?;
        let err = api::Error::parse(&body)?;
        tracing::debug!(%status, %err, "server returned an error");
        Err(Error::Api(err))
    }

    pub async fn create_user(&self, u: &NewUser) -> Result<User, Error> {
        self.send(self.http.post(self.url("users")).json(u)).await
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>, Error> {
        self.send(self.http.get(self.url("users"))).await
    }

    pub async fn create_issue(&self, i: &NewIssue) -> Result<Issue, Error> {
        self.send(self.http.post(self.url("issues")).json(i)).await
    }

    pub async fn fetch_issues(&self, viewer: Option<UserId>) -> Result<Vec<Issue>, Error> {
        let mut req = self.http.get(self.url("issues"));
        if let Some(viewer) = viewer {
            req = req.query(&[("userId", viewer.0)]);
        }
        self.send(req).await
    }

    pub async fn fetch_user_issues(&self, owner: UserId) -> Result<Vec<Issue>, Error> {
        let url = self.url(&format!("users/{}/issues", owner.0));
        self.send(self.http.get(url)).await
    }

    pub async fn fetch_issue(&self, issue: IssueId, viewer: Option<UserId>) -> Result<Issue, Error> {
        let mut req = self.http.get(self.url(&format!("issues/{}", issue.0)));
        if let Some(viewer) = viewer {
            req = req.query(&[("userId", viewer.0)]);
        }
        self.send(req).await
    }

    pub async fn set_status(&self, issue: IssueId, s: &SetStatus) -> Result<Issue, Error> {
        let url = self.url(&format!("issues/{}/status", issue.0));
        self.send(self.http.put(url).json(s)).await
    }

    pub async fn toggle_upvote(
        &self,
        issue: IssueId,
        req: &UpvoteRequest,
    ) -> Result<UpvoteState, Error> {
        let url = self.url(&format!("issues/{}/upvote", issue.0));
        self.send(self.http.post(url).json(req)).await
    }
}

#[async_trait]
impl CommentStore for Client {
    type Error = Error;

    async fn list_comments(&mut self, issue: IssueId) -> Result<Vec<Comment>, Error> {
        let url = self.url(&format!("issues/{}/comments", issue.0));
        self.send(self.http.get(url)).await
    }

    async fn append_comment(&mut self, issue: IssueId, c: NewComment) -> Result<Comment, Error> {
        let url = self.url(&format!("issues/{}/comments", issue.0));
        self.send(self.http.post(url).json(&c)).await
    }
}
