use std::collections::HashMap;

use crate::api::{Comment, CommentId};

#[derive(Clone, Debug, Eq, PartialEq)]
struct Node {
    comment: Comment,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Reply tree of one issue, stored as an arena indexed in fetch order
///
/// Every comment given to `build` ends up exactly once in the forest. Siblings keep
/// the order in which they were given, which is creation order when fed from a
/// comment store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    index: HashMap<CommentId, usize>,
}

impl Forest {
    pub fn empty() -> Forest {
        Forest {
            nodes: Vec::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn build(comments: Vec<Comment>) -> Forest {
        let mut index = HashMap::with_capacity(comments.len());
        let mut nodes = Vec::with_capacity(comments.len());
        for (idx, comment) in comments.into_iter().enumerate() {
            // on duplicate ids, replies attach to the first occurrence
            index.entry(comment.id).or_insert(idx);
            nodes.push(Node {
                comment,
                parent: None,
                children: Vec::new(),
            });
        }

        let mut roots = Vec::new();
        for idx in 0..nodes.len() {
            let parent_id = nodes[idx].comment.parent_id;
            match parent_id.and_then(|p| index.get(&p).copied()) {
                Some(parent) => {
                    nodes[idx].parent = Some(parent);
                    nodes[parent].children.push(idx);
                }
                None => {
                    if let Some(parent_id) = parent_id {
                        tracing::warn!(
                            comment = ?nodes[idx].comment.id,
                            parent = ?parent_id,
                            "parent comment not found, showing reply as top-level comment"
                        );
                    }
                    roots.push(idx);
                }
            }
        }

        let mut forest = Forest {
            nodes,
            roots,
            index,
        };
        forest.break_cycles();
        forest
    }

    /// Comments whose parent chain loops never reach a root: cut them loose
    fn break_cycles(&mut self) {
        let mut seen = vec![false; self.nodes.len()];
        for root in self.roots.clone() {
            self.mark_subtree(root, &mut seen);
        }
        let mut promoted = false;
        for idx in 0..self.nodes.len() {
            if seen[idx] {
                continue;
            }
            tracing::warn!(
                comment = ?self.nodes[idx].comment.id,
                "comment is part of a reply cycle, showing it as top-level comment"
            );
            if let Some(parent) = self.nodes[idx].parent.take() {
                self.nodes[parent].children.retain(|c| *c != idx);
            }
            self.roots.push(idx);
            self.mark_subtree(idx, &mut seen);
            promoted = true;
        }
        if promoted {
            self.roots.sort_unstable();
        }
    }

    fn mark_subtree(&self, from: usize, seen: &mut [bool]) {
        let mut stack = vec![from];
        while let Some(idx) = stack.pop() {
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            stack.extend(self.nodes[idx].children.iter().copied());
        }
    }

    /// Total number of comments, at every depth
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl '_ + Iterator<Item = NodeRef<'_>> {
        self.roots.iter().map(move |idx| NodeRef {
            forest: self,
            idx: *idx,
        })
    }

    pub fn get(&self, id: &CommentId) -> Option<NodeRef<'_>> {
        self.index.get(id).map(|idx| NodeRef {
            forest: self,
            idx: *idx,
        })
    }

    /// Depth-first walk in display order, yielding the depth of each node (roots are 0)
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            forest: self,
            stack: self.roots.iter().rev().map(|idx| (0, *idx)).collect(),
        }
    }

    pub fn comments(&self) -> impl '_ + Iterator<Item = &'_ Comment> {
        self.nodes.iter().map(|n| &n.comment)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'a> {
    forest: &'a Forest,
    idx: usize,
}

impl<'a> NodeRef<'a> {
    pub fn comment(&self) -> &'a Comment {
        &self.forest.nodes[self.idx].comment
    }

    pub fn children(&self) -> impl 'a + Iterator<Item = NodeRef<'a>> {
        let forest = self.forest;
        forest.nodes[self.idx]
            .children
            .iter()
            .map(move |idx| NodeRef { forest, idx: *idx })
    }

    pub fn num_children(&self) -> usize {
        self.forest.nodes[self.idx].children.len()
    }
}

pub struct Walk<'a> {
    forest: &'a Forest,
    stack: Vec<(usize, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, NodeRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, idx) = self.stack.pop()?;
        self.stack.extend(
            self.forest.nodes[idx]
                .children
                .iter()
                .rev()
                .map(|c| (depth + 1, *c)),
        );
        Some((
            depth,
            NodeRef {
                forest: self.forest,
                idx,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::api::{IssueId, UserId, Uuid};

    fn comment(id: u128, parent: Option<u128>, text: &str, at: i64) -> Comment {
        Comment {
            id: CommentId(Uuid::from_u128(id)),
            issue_id: IssueId::stub(),
            user_id: UserId::stub(),
            author_name: Some(String::from("Ann")),
            text: String::from(text),
            parent_id: parent.map(|p| CommentId(Uuid::from_u128(p))),
            created_at: Utc.timestamp_opt(at, 0).unwrap(),
        }
    }

    fn texts<'a>(nodes: impl Iterator<Item = NodeRef<'a>>) -> Vec<&'a str> {
        nodes.map(|n| &n.comment().text as &str).collect()
    }

    #[test]
    fn nests_replies_in_arrival_order() {
        let forest = Forest::build(vec![
            comment(1, None, "A", 1),
            comment(2, Some(1), "B", 2),
            comment(3, Some(1), "C", 3),
            comment(4, Some(2), "D", 4),
        ]);
        assert_eq!(forest.len(), 4);
        assert_eq!(texts(forest.roots()), vec!["A"]);
        let a = forest.roots().next().unwrap();
        assert_eq!(texts(a.children()), vec!["B", "C"]);
        let b = a.children().next().unwrap();
        assert_eq!(texts(b.children()), vec!["D"]);
        let c = a.children().nth(1).unwrap();
        assert_eq!(c.num_children(), 0);

        let walked = forest
            .walk()
            .map(|(depth, n)| (depth, &n.comment().text as &str))
            .collect::<Vec<_>>();
        assert_eq!(walked, vec![(0, "A"), (1, "B"), (2, "D"), (1, "C")]);
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        let forest = Forest::build(Vec::new());
        assert!(forest.is_empty());
        assert_eq!(forest.roots().count(), 0);
        assert_eq!(forest, Forest::empty());
    }

    #[test]
    fn orphans_become_roots() {
        let forest = Forest::build(vec![
            comment(1, None, "A", 1),
            comment(2, Some(42), "orphan", 2),
            comment(3, None, "C", 3),
        ]);
        assert_eq!(texts(forest.roots()), vec!["A", "orphan", "C"]);
    }

    #[test]
    fn new_reply_lands_last_under_its_parent() {
        let mut comments = vec![
            comment(1, None, "A", 1),
            comment(2, Some(1), "B", 2),
            comment(3, None, "C", 3),
        ];
        comments.push(comment(4, Some(1), "E", 4));
        let forest = Forest::build(comments);
        let a = forest.get(&CommentId(Uuid::from_u128(1))).unwrap();
        assert_eq!(texts(a.children()), vec!["B", "E"]);
    }

    #[test]
    fn cycles_are_cut() {
        let forest = Forest::build(vec![
            comment(1, None, "A", 1),
            comment(2, Some(3), "B", 2),
            comment(3, Some(2), "C", 3),
            comment(4, Some(4), "self", 4),
        ]);
        assert_eq!(forest.walk().count(), 4);
        assert_eq!(texts(forest.roots()), vec!["A", "B", "self"]);
        let b = forest.roots().nth(1).unwrap();
        assert_eq!(texts(b.children()), vec!["C"]);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let comments = vec![
            comment(1, None, "A", 1),
            comment(2, Some(1), "B", 2),
            comment(3, Some(9), "orphan", 3),
        ];
        assert_eq!(
            Forest::build(comments.clone()),
            Forest::build(comments)
        );
    }

    /// Comment `i` gets id `i + 1`; its parent choice may dangle, point forward, or loop
    fn from_parent_choices(choices: &[Option<u8>]) -> Vec<Comment> {
        choices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                comment(
                    i as u128 + 1,
                    p.map(|p| p as u128 % (choices.len() as u128 + 3) + 1),
                    &format!("{i}"),
                    i as i64,
                )
            })
            .collect()
    }

    #[test]
    fn forest_properties() {
        bolero::check!()
            .with_type::<Vec<Option<u8>>>()
            .cloned()
            .for_each(|choices| {
                let comments = from_parent_choices(&choices);
                let ids = comments.iter().map(|c| c.id).collect::<HashSet<_>>();
                let forest = Forest::build(comments.clone());

                // every comment exactly once
                let walked = forest
                    .walk()
                    .map(|(_, n)| n.comment().id)
                    .collect::<Vec<_>>();
                assert_eq!(walked.len(), comments.len());
                assert_eq!(walked.iter().collect::<HashSet<_>>().len(), comments.len());

                // siblings keep input order
                let position = |n: &NodeRef| n.comment().created_at;
                let roots = forest.roots().map(|n| position(&n)).collect::<Vec<_>>();
                assert!(roots.windows(2).all(|w| w[0] < w[1]));
                for (_, n) in forest.walk() {
                    let children = n.children().map(|c| position(&c)).collect::<Vec<_>>();
                    assert!(children.windows(2).all(|w| w[0] < w[1]));
                }

                // dangling parents are roots
                let root_ids = forest.roots().map(|n| n.comment().id).collect::<HashSet<_>>();
                for c in &comments {
                    match c.parent_id {
                        None => assert!(root_ids.contains(&c.id)),
                        Some(p) if !ids.contains(&p) => assert!(root_ids.contains(&c.id)),
                        Some(_) => (),
                    }
                }

                assert_eq!(forest, Forest::build(comments));
            });
    }
}
