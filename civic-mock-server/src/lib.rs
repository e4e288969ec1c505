use async_trait::async_trait;
use chrono::Utc;
use civic_api::{
    Comment, CommentId, CommentStore, Error, Issue, IssueId, IssueStatus, NewComment, NewIssue,
    NewUser, SetStatus, UpvoteRequest, UpvoteState, User, UserId, Uuid,
};

/// In-memory civic server, answering like civic-server does
#[derive(Debug, Default)]
pub struct MockServer {
    users: Vec<User>,
    issues: Vec<DbIssue>,
    comments: Vec<Comment>,
    unavailable: bool,
}

#[derive(Debug)]
struct DbIssue {
    issue: Issue,
    upvoted_by: Vec<UserId>,
}

impl DbIssue {
    fn view_for(&self, user: Option<UserId>) -> Issue {
        Issue {
            upvotes: self.upvoted_by.len() as i64,
            has_upvoted: user.map_or(false, |u| self.upvoted_by.contains(&u)),
            ..self.issue.clone()
        }
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer::default()
    }

    /// While set, every call fails as if the database were down
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> Result<(), Error> {
        if self.unavailable {
            return Err(Error::Unknown(String::from("store unavailable")));
        }
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<&User, Error> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or(Error::UnknownUser(id))
    }

    fn issue(&self, id: IssueId) -> Result<&DbIssue, Error> {
        self.issues
            .iter()
            .find(|i| i.issue.id == id)
            .ok_or(Error::UnknownIssue(id))
    }

    fn issue_mut(&mut self, id: IssueId) -> Result<&mut DbIssue, Error> {
        self.issues
            .iter_mut()
            .find(|i| i.issue.id == id)
            .ok_or(Error::UnknownIssue(id))
    }

    pub fn create_user(&mut self, u: NewUser) -> Result<User, Error> {
        self.check_available()?;
        u.validate()?;
        if self.users.iter().any(|other| other.email == u.email) {
            return Err(Error::EmailAlreadyUsed(u.email));
        }
        let user = User {
            id: UserId(Uuid::new_v4()),
            name: u.name,
            email: u.email,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn fetch_users(&self) -> Result<Vec<User>, Error> {
        self.check_available()?;
        Ok(self.users.clone())
    }

    pub fn create_issue(&mut self, i: NewIssue) -> Result<Issue, Error> {
        self.check_available()?;
        let owner = i.validate()?;
        self.user(owner)?;
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
        self.issues.push(DbIssue {
            issue: issue.clone(),
            upvoted_by: Vec::new(),
        });
        Ok(issue)
    }

    /// Newest first
    pub fn fetch_issues(&self, for_user: Option<UserId>) -> Result<Vec<Issue>, Error> {
        self.check_available()?;
        Ok(self
            .issues
            .iter()
            .rev()
            .map(|i| i.view_for(for_user))
            .collect())
    }

    /// Issues reported by `owner`, newest first, as `owner` sees them
    pub fn fetch_user_issues(&self, owner: UserId) -> Result<Vec<Issue>, Error> {
        self.check_available()?;
        Ok(self
            .issues
            .iter()
            .rev()
            .filter(|i| i.issue.user_id == owner)
            .map(|i| i.view_for(Some(owner)))
            .collect())
    }

    pub fn fetch_issue(&self, id: IssueId, for_user: Option<UserId>) -> Result<Issue, Error> {
        self.check_available()?;
        Ok(self.issue(id)?.view_for(for_user))
    }

    pub fn set_status(&mut self, id: IssueId, s: SetStatus) -> Result<Issue, Error> {
        self.check_available()?;
        let status = s.validate()?;
        let issue = self.issue_mut(id)?;
        issue.issue.status = status;
        Ok(issue.view_for(None))
    }

    pub fn toggle_upvote(&mut self, id: IssueId, req: UpvoteRequest) -> Result<UpvoteState, Error> {
        self.check_available()?;
        let user = req.user_id.ok_or(Error::MissingUser)?;
        self.issue(id)?;
        self.user(user)?;
        let issue = self.issue_mut(id)?;
        let has_upvoted = match issue.upvoted_by.iter().position(|u| *u == user) {
            Some(pos) => {
                issue.upvoted_by.remove(pos);
                false
            }
            None => {
                issue.upvoted_by.push(user);
                true
            }
        };
        Ok(UpvoteState {
            upvotes: issue.upvoted_by.len() as i64,
            has_upvoted,
        })
    }

    /// Comments of an issue in creation order, empty if there are none
    pub fn comments_of(&self, issue: IssueId) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.issue_id == issue)
            .cloned()
            .collect()
    }

    pub fn fetch_comments(&self, issue: IssueId) -> Result<Vec<Comment>, Error> {
        self.check_available()?;
        Ok(self.comments_of(issue))
    }

    pub fn append(&mut self, issue: IssueId, c: NewComment) -> Result<Comment, Error> {
        self.check_available()?;
        let author = c.validate()?;
        self.issue(issue)?;
        let author_name = self.user(author)?.name.clone();
        if let Some(parent) = c.parent_id {
            if !self
                .comments
                .iter()
                .any(|other| other.id == parent && other.issue_id == issue)
            {
                return Err(Error::UnknownParent(parent));
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
        self.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl CommentStore for MockServer {
    type Error = Error;

    async fn list_comments(&mut self, issue: IssueId) -> Result<Vec<Comment>, Error> {
        self.fetch_comments(issue)
    }

    async fn append_comment(&mut self, issue: IssueId, c: NewComment) -> Result<Comment, Error> {
        self.append(issue, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with_issue() -> (MockServer, UserId, IssueId) {
        let mut s = MockServer::new();
        let user = s
            .create_user(NewUser::new(String::from("Ann"), String::from("ann@example.org")))
            .unwrap()
            .id;
        let issue = s
            .create_issue(NewIssue {
                user_id: Some(user),
                title: String::from("Overflowing bin"),
                description: String::from("Not collected for a week"),
                category: String::from("Waste"),
                address: String::from("Market square"),
            })
            .unwrap()
            .id;
        (s, user, issue)
    }

    #[test]
    fn parents_must_be_in_the_same_issue() {
        let (mut s, user, issue) = server_with_issue();
        let other = s
            .create_issue(NewIssue {
                user_id: Some(user),
                title: String::from("Graffiti"),
                description: String::from("On the town hall"),
                category: String::from("Vandalism"),
                address: String::from("Town hall"),
            })
            .unwrap()
            .id;
        let c = s
            .append(other, NewComment::top_level(user, String::from("ugly")))
            .unwrap();
        assert_eq!(
            s.append(issue, NewComment::reply(user, c.id, String::from("here?"))),
            Err(Error::UnknownParent(c.id))
        );
        assert!(s.comments_of(issue).is_empty());
    }

    #[test]
    fn user_issues_only_list_the_owners() {
        let (mut s, user, issue) = server_with_issue();
        let other = s
            .create_user(NewUser::new(String::from("Bob"), String::from("bob@example.org")))
            .unwrap()
            .id;
        s.create_issue(NewIssue {
            user_id: Some(other),
            title: String::from("Broken bench"),
            description: String::from("Two planks missing"),
            category: String::from("Parks"),
            address: String::from("River park"),
        })
        .unwrap();
        s.toggle_upvote(
            issue,
            UpvoteRequest {
                user_id: Some(user),
            },
        )
        .unwrap();
        let mine = s.fetch_user_issues(user).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, issue);
        assert!(mine[0].has_upvoted);
        assert!(s.fetch_user_issues(UserId::stub()).unwrap().is_empty());
    }

    #[test]
    fn upvotes_toggle() {
        let (mut s, user, issue) = server_with_issue();
        let req = UpvoteRequest {
            user_id: Some(user),
        };
        assert_eq!(
            s.toggle_upvote(issue, req.clone()),
            Ok(UpvoteState {
                upvotes: 1,
                has_upvoted: true
            })
        );
        assert!(s.fetch_issue(issue, Some(user)).unwrap().has_upvoted);
        assert_eq!(
            s.toggle_upvote(issue, req),
            Ok(UpvoteState {
                upvotes: 0,
                has_upvoted: false
            })
        );
        assert_eq!(
            s.toggle_upvote(issue, UpvoteRequest { user_id: None }),
            Err(Error::MissingUser)
        );
    }
}
