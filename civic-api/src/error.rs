use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, IssueId, UserId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Field {0:?} cannot be empty")]
    EmptyField(String),

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("User ID is required")]
    MissingUser,

    #[error("Invalid status {0:?}")]
    InvalidStatus(String),

    #[error("Email already used {0}")]
    EmailAlreadyUsed(String),

    #[error("Issue not found {0:?}")]
    UnknownIssue(IssueId),

    #[error("User not found {0:?}")]
    UnknownUser(UserId),

    #[error("Parent comment not found in this issue {0:?}")]
    UnknownParent(CommentId),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::EmptyField(_) => StatusCode::BAD_REQUEST,
            Error::EmptyComment => StatusCode::BAD_REQUEST,
            Error::MissingUser => StatusCode::BAD_REQUEST,
            Error::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Error::EmailAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::UnknownIssue(_) => StatusCode::NOT_FOUND,
            Error::UnknownUser(_) => StatusCode::NOT_FOUND,
            Error::UnknownParent(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Validation errors are the ones detected before looking at the store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NullByteInString(_)
                | Error::EmptyField(_)
                | Error::EmptyComment
                | Error::MissingUser
                | Error::InvalidStatus(_)
        )
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyField(f) => json!({
                "message": "a required field was empty",
                "type": "empty-field",
                "field": f,
            }),
            Error::EmptyComment => json!({
                "message": "comment cannot be empty",
                "type": "empty-comment",
            }),
            Error::MissingUser => json!({
                "message": "user id is required",
                "type": "missing-user",
            }),
            Error::InvalidStatus(s) => json!({
                "message": "invalid status",
                "type": "invalid-status",
                "status": s,
            }),
            Error::EmailAlreadyUsed(e) => json!({
                "message": "email already used",
                "type": "conflict-email",
                "email": e,
            }),
            Error::UnknownIssue(i) => json!({
                "message": "issue not found",
                "type": "unknown-issue",
                "uuid": i.0,
            }),
            Error::UnknownUser(u) => json!({
                "message": "user not found",
                "type": "unknown-user",
                "uuid": u.0,
            }),
            Error::UnknownParent(c) => json!({
                "message": "parent comment not found in this issue",
                "type": "unknown-parent",
                "uuid": c.0,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let string_field = |name: &str| -> anyhow::Result<String> {
            Ok(String::from(
                data.get(name)
                    .and_then(|s| s.as_str())
                    .ok_or_else(|| anyhow!("error is missing its {name:?} field"))?,
            ))
        };
        let uuid_field = || -> anyhow::Result<Uuid> {
            data.get("uuid")
                .and_then(|uuid| uuid.as_str())
                .and_then(|uuid| Uuid::from_str(uuid).ok())
                .ok_or_else(|| anyhow!("error is about a missing object without a proper uuid"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "null-byte" => Error::NullByteInString(string_field("string")?),
                "empty-field" => Error::EmptyField(string_field("field")?),
                "empty-comment" => Error::EmptyComment,
                "missing-user" => Error::MissingUser,
                "invalid-status" => Error::InvalidStatus(string_field("status")?),
                "conflict-email" => Error::EmailAlreadyUsed(string_field("email")?),
                "unknown-issue" => Error::UnknownIssue(IssueId(uuid_field()?)),
                "unknown-user" => Error::UnknownUser(UserId(uuid_field()?)),
                "unknown-parent" => Error::UnknownParent(CommentId(uuid_field()?)),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_survives_the_wire() {
        let errors = [
            Error::Unknown(String::from("oops")),
            Error::NullByteInString(String::from("a\0b")),
            Error::EmptyField(String::from("title")),
            Error::EmptyComment,
            Error::MissingUser,
            Error::InvalidStatus(String::from("Closed")),
            Error::EmailAlreadyUsed(String::from("ann@example.org")),
            Error::UnknownIssue(IssueId(Uuid::new_v4())),
            Error::UnknownUser(UserId(Uuid::new_v4())),
            Error::UnknownParent(CommentId(Uuid::new_v4())),
        ];
        for e in errors {
            assert_eq!(Error::parse(&e.contents()).unwrap(), e);
        }
    }

    #[test]
    fn reference_errors_are_not_found() {
        assert_eq!(
            Error::UnknownParent(CommentId::stub()).status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert!(!Error::UnknownParent(CommentId::stub()).is_validation());
        assert!(Error::EmptyComment.is_validation());
    }
}
