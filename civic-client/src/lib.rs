mod mention;
pub use mention::{compose_prefix, split_mention, with_prefix};

pub mod render;

mod thread;
pub use thread::{Forest, NodeRef, Walk};

mod view;
pub use view::{PendingReply, ReplyState, SubmitError, ThreadView};

pub mod api {
    pub use civic_api::*;
}
