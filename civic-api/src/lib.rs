use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod error;
pub use error::Error;

mod issue;
pub use issue::{Issue, IssueId, IssueStatus, NewIssue, SetStatus, UpvoteRequest, UpvoteState};

mod store;
pub use store::CommentStore;

mod user;
pub use user::{NewUser, User, UserId};

// The `validate` functions throughout civic-api check what the type system cannot:
// the database rejects NUL bytes in text, and some fields must not be left empty.
// They are run by the server before touching storage, and by the mock server.

pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

pub fn validate_required(field: &str, s: &str) -> Result<(), Error> {
    if s.trim().is_empty() {
        return Err(Error::EmptyField(String::from(field)));
    }
    validate_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bytes_are_rejected() {
        assert_eq!(
            validate_string("foo\0bar"),
            Err(Error::NullByteInString(String::from("foo\0bar")))
        );
        assert_eq!(validate_string("foo bar"), Ok(()));
    }

    #[test]
    fn required_fields_must_have_content() {
        assert_eq!(
            validate_required("title", "   "),
            Err(Error::EmptyField(String::from("title")))
        );
        assert_eq!(validate_required("title", "Pothole"), Ok(()));
    }
}
