use std::{fmt, str::FromStr};

use uuid::Uuid;

use crate::{Error, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct IssueId(pub Uuid);

impl IssueId {
    pub fn stub() -> IssueId {
        IssueId(STUB_UUID)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum IssueStatus {
    Open,
    Working,
    Resolve,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "Open",
            IssueStatus::Working => "Working",
            IssueStatus::Resolve => "Resolve",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<IssueStatus, Error> {
        match s {
            "Open" => Ok(IssueStatus::Open),
            "Working" => Ok(IssueStatus::Working),
            "Resolve" => Ok(IssueStatus::Resolve),
            _ => Err(Error::InvalidStatus(String::from(s))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub address: String,
    pub status: IssueStatus,
    pub upvotes: i64,

    /// Whether the user the listing was requested for upvoted this issue
    pub has_upvoted: bool,
    pub created_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub address: String,
}

impl NewIssue {
    pub fn validate(&self) -> Result<UserId, Error> {
        crate::validate_required("title", &self.title)?;
        crate::validate_required("description", &self.description)?;
        crate::validate_required("category", &self.category)?;
        crate::validate_required("address", &self.address)?;
        self.user_id.ok_or(Error::MissingUser)
    }
}

/// Status is kept as a raw string on the wire so unknown values get a proper error
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SetStatus {
    pub status: String,
}

impl SetStatus {
    pub fn new(status: IssueStatus) -> SetStatus {
        SetStatus {
            status: String::from(status.as_str()),
        }
    }

    pub fn validate(&self) -> Result<IssueStatus, Error> {
        self.status.parse()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteState {
    pub upvotes: i64,
    pub has_upvoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        for s in [IssueStatus::Open, IssueStatus::Working, IssueStatus::Resolve] {
            assert_eq!(s.as_str().parse::<IssueStatus>(), Ok(s));
        }
        assert_eq!(
            SetStatus {
                status: String::from("Closed")
            }
            .validate(),
            Err(Error::InvalidStatus(String::from("Closed")))
        );
    }

    #[test]
    fn new_issue_requires_every_field() {
        let mut i = NewIssue {
            user_id: Some(UserId::stub()),
            title: String::from("Broken bench"),
            description: String::from("The bench in the park is broken"),
            category: String::from("Parks"),
            address: String::new(),
        };
        assert_eq!(i.validate(), Err(Error::EmptyField(String::from("address"))));
        i.address = String::from("Central park");
        assert_eq!(i.validate(), Ok(UserId::stub()));
        i.user_id = None;
        assert_eq!(i.validate(), Err(Error::MissingUser));
    }
}
