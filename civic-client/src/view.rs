use std::fmt::Display;

use crate::{
    api::{self, Comment, CommentId, CommentStore, IssueId, NewComment, UserId},
    compose_prefix, Forest,
};

/// The single reply box of a thread
///
/// Opening a reply on another comment replaces whatever was being composed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplyState {
    Idle,
    Composing {
        parent_id: CommentId,
        mention: Option<String>,
        text: String,
    },
    Submitting {
        parent_id: CommentId,
        mention: Option<String>,
        text: String,
    },
}

impl ReplyState {
    pub fn parent_id(&self) -> Option<CommentId> {
        match self {
            ReplyState::Idle => None,
            ReplyState::Composing { parent_id, .. } | ReplyState::Submitting { parent_id, .. } => {
                Some(*parent_id)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError<E> {
    #[error("no reply is being composed")]
    NotComposing,

    #[error(transparent)]
    Invalid(api::Error),

    #[error("{0}")]
    Store(E),
}

/// A reply that left the reply box and is waiting for the store
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingReply {
    pub issue: IssueId,
    pub comment: NewComment,
}

/// Comments of one issue, as shown to one user
///
/// Every successful post is followed by a full reload, so the displayed tree is
/// always the store's.
#[derive(Clone, Debug)]
pub struct ThreadView {
    issue: IssueId,
    user: Option<UserId>,
    forest: Option<Forest>,
    reply: ReplyState,
    last_error: Option<String>,
}

impl ThreadView {
    pub fn new(issue: IssueId, user: Option<UserId>) -> ThreadView {
        ThreadView {
            issue,
            user,
            forest: None,
            reply: ReplyState::Idle,
            last_error: None,
        }
    }

    pub fn issue(&self) -> IssueId {
        self.issue
    }

    /// None until the first load finished
    pub fn forest(&self) -> Option<&Forest> {
        self.forest.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.forest.is_none()
    }

    pub fn comment_count(&self) -> usize {
        self.forest.as_ref().map_or(0, |f| f.len())
    }

    pub fn reply_state(&self) -> &ReplyState {
        &self.reply
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn set_error(&mut self, err: &impl Display) {
        tracing::warn!(issue = ?self.issue, %err, "comment thread operation failed");
        self.last_error = Some(err.to_string());
    }

    /// Refetches and rebuilds the whole tree; on failure the previous tree stays
    pub async fn load<S: CommentStore>(&mut self, store: &mut S) -> Result<(), S::Error> {
        match store.list_comments(self.issue).await {
            Ok(comments) => {
                tracing::debug!(issue = ?self.issue, num = comments.len(), "loaded comments");
                self.forest = Some(Forest::build(comments));
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.set_error(&err);
                if self.forest.is_none() {
                    self.forest = Some(Forest::empty());
                }
                Err(err)
            }
        }
    }

    /// Returns false if the reply control is disabled or the comment is not shown
    pub fn open_reply(&mut self, parent_id: CommentId) -> bool {
        if matches!(self.reply, ReplyState::Submitting { .. }) {
            return false;
        }
        let mention = match self.forest.as_ref().and_then(|f| f.get(&parent_id)) {
            None => return false,
            Some(node) => node.comment().author_name.clone(),
        };
        let text = mention.as_deref().map(compose_prefix).unwrap_or_default();
        self.reply = ReplyState::Composing {
            parent_id,
            mention,
            text,
        };
        true
    }

    pub fn edit_reply(&mut self, new_text: String) {
        if let ReplyState::Composing { text, .. } = &mut self.reply {
            *text = new_text;
        }
    }

    pub fn cancel_reply(&mut self) {
        if let ReplyState::Composing { .. } = self.reply {
            self.reply = ReplyState::Idle;
        }
    }

    fn new_comment(&self, parent_id: Option<CommentId>, text: String) -> NewComment {
        NewComment {
            text,
            user_id: self.user,
            parent_id,
        }
    }

    /// Moves the reply box to `Submitting`, unless what it holds is invalid
    pub fn begin_submit<E>(&mut self) -> Result<PendingReply, SubmitError<E>> {
        let (parent_id, mention, text) = match &self.reply {
            ReplyState::Composing {
                parent_id,
                mention,
                text,
            } => (*parent_id, mention.clone(), text.clone()),
            _ => return Err(SubmitError::NotComposing),
        };
        let comment = self.new_comment(Some(parent_id), text.clone());
        if let Err(err) = comment.validate() {
            self.set_error(&err);
            return Err(SubmitError::Invalid(err));
        }
        self.reply = ReplyState::Submitting {
            parent_id,
            mention,
            text,
        };
        Ok(PendingReply {
            issue: self.issue,
            comment,
        })
    }

    /// On failure the reply box reopens with the text that was sent
    pub fn finish_submit<E: Display>(
        &mut self,
        res: Result<Comment, E>,
    ) -> Result<Comment, SubmitError<E>> {
        let (parent_id, mention, text) = match std::mem::replace(&mut self.reply, ReplyState::Idle)
        {
            ReplyState::Submitting {
                parent_id,
                mention,
                text,
            } => (parent_id, mention, text),
            other => {
                self.reply = other;
                return Err(SubmitError::NotComposing);
            }
        };
        match res {
            Ok(comment) => Ok(comment),
            Err(err) => {
                self.set_error(&err);
                self.reply = ReplyState::Composing {
                    parent_id,
                    mention,
                    text,
                };
                Err(SubmitError::Store(err))
            }
        }
    }

    /// Sends the reply being composed, then reloads the thread
    pub async fn submit_reply<S: CommentStore>(
        &mut self,
        store: &mut S,
    ) -> Result<Comment, SubmitError<S::Error>> {
        let pending = self.begin_submit::<S::Error>()?;
        let res = store.append_comment(pending.issue, pending.comment).await;
        let comment = self.finish_submit(res)?;
        // the reply is stored, a failed reload is only reported through last_error
        let _ = self.load(store).await;
        Ok(comment)
    }

    /// Posts a top-level comment, leaving the reply box alone
    pub async fn post_comment<S: CommentStore>(
        &mut self,
        store: &mut S,
        text: String,
    ) -> Result<Comment, SubmitError<S::Error>> {
        let comment = self.new_comment(None, text);
        if let Err(err) = comment.validate() {
            self.set_error(&err);
            return Err(SubmitError::Invalid(err));
        }
        match store.append_comment(self.issue, comment).await {
            Ok(comment) => {
                let _ = self.load(store).await;
                Ok(comment)
            }
            Err(err) => {
                self.set_error(&err);
                Err(SubmitError::Store(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use civic_mock_server::MockServer;

    use super::*;
    use crate::api::{NewIssue, NewUser};

    struct Setup {
        server: MockServer,
        issue: IssueId,
        ann: UserId,
        bob: UserId,
    }

    fn setup() -> Setup {
        let mut server = MockServer::new();
        let ann = server
            .create_user(NewUser::new(String::from("Ann"), String::from("ann@example.org")))
            .unwrap()
            .id;
        let bob = server
            .create_user(NewUser::new(String::from("Bob Lee"), String::from("bob@example.org")))
            .unwrap()
            .id;
        let issue = server
            .create_issue(NewIssue {
                user_id: Some(ann),
                title: String::from("Streetlight out"),
                description: String::from("The light on 5th street is out"),
                category: String::from("Lighting"),
                address: String::from("5th street"),
            })
            .unwrap()
            .id;
        Setup {
            server,
            issue,
            ann,
            bob,
        }
    }

    #[tokio::test]
    async fn empty_thread_then_top_level_post() {
        let mut s = setup();
        let mut view = ThreadView::new(s.issue, Some(s.ann));
        assert!(view.is_loading());
        view.load(&mut s.server).await.unwrap();
        assert!(!view.is_loading());
        assert_eq!(view.comment_count(), 0);

        view.post_comment(&mut s.server, String::from("Still broken"))
            .await
            .unwrap();
        assert_eq!(view.comment_count(), 1);
        assert_eq!(view.reply_state(), &ReplyState::Idle);
    }

    #[tokio::test]
    async fn reply_cycle_appends_under_parent() {
        let mut s = setup();
        let root = s
            .server
            .append(s.issue, NewComment::top_level(s.bob, String::from("I saw it too")))
            .unwrap();
        s.server
            .append(s.issue, NewComment::reply(s.ann, root.id, String::from("Reported")))
            .unwrap();

        let mut view = ThreadView::new(s.issue, Some(s.ann));
        view.load(&mut s.server).await.unwrap();
        assert!(view.open_reply(root.id));
        assert_eq!(
            view.reply_state(),
            &ReplyState::Composing {
                parent_id: root.id,
                mention: Some(String::from("Bob Lee")),
                text: String::from("@Bob Lee "),
            }
        );
        view.edit_reply(String::from("@Bob Lee it is fixed now"));
        let posted = view.submit_reply(&mut s.server).await.unwrap();
        assert_eq!(posted.parent_id, Some(root.id));
        assert_eq!(posted.text, "@Bob Lee it is fixed now");
        assert_eq!(view.reply_state(), &ReplyState::Idle);

        let forest = view.forest().unwrap();
        assert_eq!(forest.len(), 3);
        let root = forest.roots().next().unwrap();
        let replies = root
            .children()
            .map(|c| c.comment().text.clone())
            .collect::<Vec<_>>();
        assert_eq!(replies, vec!["Reported", "@Bob Lee it is fixed now"]);
    }

    #[tokio::test]
    async fn only_one_reply_box() {
        let mut s = setup();
        let first = s
            .server
            .append(s.issue, NewComment::top_level(s.bob, String::from("first")))
            .unwrap();
        let second = s
            .server
            .append(s.issue, NewComment::top_level(s.ann, String::from("second")))
            .unwrap();
        let mut view = ThreadView::new(s.issue, Some(s.bob));
        view.load(&mut s.server).await.unwrap();

        assert!(view.open_reply(first.id));
        view.edit_reply(String::from("draft"));
        assert!(view.open_reply(second.id));
        assert_eq!(view.reply_state().parent_id(), Some(second.id));
        assert!(!view.open_reply(CommentId::stub()));
        assert_eq!(view.reply_state().parent_id(), Some(second.id));

        let _pending = view.begin_submit::<api::Error>().unwrap();
        assert!(!view.open_reply(first.id));
        view.cancel_reply();
        assert!(matches!(view.reply_state(), ReplyState::Submitting { .. }));
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_draft() {
        let mut s = setup();
        let root = s
            .server
            .append(s.issue, NewComment::top_level(s.bob, String::from("hello")))
            .unwrap();
        let mut view = ThreadView::new(s.issue, Some(s.ann));
        view.load(&mut s.server).await.unwrap();
        assert!(view.open_reply(root.id));
        view.begin_submit::<api::Error>().unwrap();
        let res = view.finish_submit(Err(api::Error::UnknownParent(root.id)));
        assert!(matches!(res, Err(SubmitError::Store(api::Error::UnknownParent(_)))));
        assert_eq!(
            view.reply_state(),
            &ReplyState::Composing {
                parent_id: root.id,
                mention: Some(String::from("Bob Lee")),
                text: String::from("@Bob Lee "),
            }
        );
        assert!(view.last_error().is_some());
        assert_eq!(view.comment_count(), 1);
    }

    #[tokio::test]
    async fn validation_errors_never_reach_the_store() {
        let mut s = setup();
        let root = s
            .server
            .append(s.issue, NewComment::top_level(s.bob, String::from("hello")))
            .unwrap();

        let mut anonymous = ThreadView::new(s.issue, None);
        anonymous.load(&mut s.server).await.unwrap();
        assert!(anonymous.open_reply(root.id));
        let res = anonymous.submit_reply(&mut s.server).await;
        assert!(matches!(res, Err(SubmitError::Invalid(api::Error::MissingUser))));
        assert!(matches!(anonymous.reply_state(), ReplyState::Composing { .. }));

        let mut view = ThreadView::new(s.issue, Some(s.ann));
        view.load(&mut s.server).await.unwrap();
        let res = view.post_comment(&mut s.server, String::new()).await;
        assert!(matches!(res, Err(SubmitError::Invalid(api::Error::EmptyComment))));
        assert_eq!(s.server.comments_of(s.issue).len(), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_tree() {
        let mut s = setup();
        s.server
            .append(s.issue, NewComment::top_level(s.bob, String::from("hello")))
            .unwrap();
        let mut view = ThreadView::new(s.issue, Some(s.ann));
        view.load(&mut s.server).await.unwrap();

        s.server.set_unavailable(true);
        let mut never_loaded = ThreadView::new(s.issue, Some(s.ann));
        assert!(never_loaded.load(&mut s.server).await.is_err());
        assert_eq!(never_loaded.comment_count(), 0);
        assert!(!never_loaded.is_loading());

        assert!(view.load(&mut s.server).await.is_err());
        assert_eq!(view.comment_count(), 1);
        assert!(view.last_error().is_some());
    }
}
