use uuid::Uuid;

use crate::{Error, IssueId, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

/// A comment as stored: replies point at their parent, the tree is rebuilt by readers
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "postId")]
    pub issue_id: IssueId,
    pub user_id: UserId,

    /// Display name of the author, joined in when listing
    pub author_name: Option<String>,

    /// May start with a cosmetic `@name` mention, see civic-client's mention module
    pub text: String,

    /// None for top-level comments
    pub parent_id: Option<CommentId>,
    pub created_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn top_level(user_id: UserId, text: String) -> NewComment {
        NewComment {
            text,
            user_id: Some(user_id),
            parent_id: None,
        }
    }

    pub fn reply(user_id: UserId, parent_id: CommentId, text: String) -> NewComment {
        NewComment {
            text,
            user_id: Some(user_id),
            parent_id: Some(parent_id),
        }
    }

    /// Checks the parts that do not need the store, returning the author on success
    pub fn validate(&self) -> Result<UserId, Error> {
        if self.text.is_empty() {
            return Err(Error::EmptyComment);
        }
        crate::validate_string(&self.text)?;
        self.user_id.ok_or(Error::MissingUser)
    }
}
