use async_trait::async_trait;

use crate::{Comment, IssueId, NewComment};

/// Where comments live, as seen by thread readers
///
/// `list_comments` returns every comment of the issue in ascending creation order,
/// and an empty list (not an error) for an issue without comments.
///
/// `append_comment` must reject empty text and a missing author before any mutation,
/// and reject unknown issues, users and parents (a parent must belong to the same issue).
#[async_trait]
pub trait CommentStore {
    type Error: std::fmt::Display + Send;

    async fn list_comments(&mut self, issue: IssueId) -> Result<Vec<Comment>, Self::Error>;
    async fn append_comment(
        &mut self,
        issue: IssueId,
        comment: NewComment,
    ) -> Result<Comment, Self::Error>;
}
