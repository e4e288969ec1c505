use std::fmt::Write;

use crate::{split_mention, Forest, ReplyState, ThreadView};

const INDENT: &str = "  ";

pub fn author_label(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => "Anonymous",
    }
}

/// Display names of everyone who commented, to recognize multi-word mentions
pub fn known_names(forest: &Forest) -> Vec<String> {
    let mut names = forest
        .comments()
        .filter_map(|c| c.author_name.clone())
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.dedup();
    names
}

/// Plain-text thread, one line per comment, replies indented under their parent
///
/// Each line ends with the comment id, which is what a reply has to be addressed to.
/// The open reply box, if any, is shown right below the comment it answers.
pub fn render_thread(view: &ThreadView) -> String {
    let mut out = String::new();
    let forest = match view.forest() {
        None => {
            out.push_str("Loading comments...\n");
            return out;
        }
        Some(forest) => forest,
    };
    if forest.is_empty() {
        out.push_str("No comments yet.\n");
    }
    let names = known_names(forest);
    for (depth, node) in forest.walk() {
        let c = node.comment();
        let indent = INDENT.repeat(depth);
        let author = author_label(c.author_name.as_deref());
        // writing to a String cannot fail
        let _ = match split_mention(&c.text, &names) {
            (Some(mention), rest) => writeln!(
                out,
                "{indent}- {author} → @{mention}: {rest} [{}]",
                c.id.0
            ),
            (None, text) => writeln!(out, "{indent}- {author}: {text} [{}]", c.id.0),
        };
        match view.reply_state() {
            ReplyState::Composing {
                parent_id, text, ..
            } if *parent_id == c.id => {
                let _ = writeln!(out, "{indent}{INDENT}> {text}");
            }
            ReplyState::Submitting {
                parent_id, text, ..
            } if *parent_id == c.id => {
                let _ = writeln!(out, "{indent}{INDENT}> {text} (sending...)");
            }
            _ => (),
        }
    }
    if let Some(err) = view.last_error() {
        let _ = writeln!(out, "error: {err}");
    }
    out
}
