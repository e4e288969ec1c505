//! `@name` prefixes are plain text: the reply box is seeded with one, and display
//! splits it back off. Nothing about them is stored separately.

pub fn compose_prefix(name: &str) -> String {
    format!("@{name} ")
}

/// Puts `prefix` in front of `text`, unless `text` already opens with that mention
pub fn with_prefix(prefix: &str, text: &str) -> String {
    let mention = prefix.trim_end();
    let typed = text
        .strip_prefix(mention)
        .map_or(false, |rest| rest.chars().next().map_or(true, char::is_whitespace));
    if mention.is_empty() || typed {
        String::from(text)
    } else {
        format!("{prefix}{text}")
    }
}

/// Splits a leading `@name` off `text`
///
/// Display names may contain spaces, so the longest of `known_names` that follows the
/// `@` wins. Without a known match, the mention runs up to the first whitespace.
pub fn split_mention<'a, N: AsRef<str>>(
    text: &'a str,
    known_names: &[N],
) -> (Option<&'a str>, &'a str) {
    let after = match text.strip_prefix('@') {
        Some(after) => after,
        None => return (None, text),
    };
    let known = known_names
        .iter()
        .map(|n| n.as_ref())
        .filter(|n| !n.is_empty() && after.starts_with(n))
        .filter(|n| {
            after[n.len()..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
        })
        .map(|n| n.len())
        .max();
    let len = known.unwrap_or_else(|| after.find(char::is_whitespace).unwrap_or(after.len()));
    if len == 0 {
        return (None, text);
    }
    let (name, rest) = after.split_at(len);
    (Some(name), rest.trim_start())
}
