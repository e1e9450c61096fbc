use regex::Regex;
use std::sync::LazyLock;
use teloxide::types::{MessageEntity, MessageEntityKind};

use crate::models::Target;

// `@` is required; bare words are never treated as handles.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w@])@(\w{1,64})").expect("mention pattern is valid"));

/// Users named in a message, in order of appearance, without duplicates.
///
/// `@handle` mentions come from the text; users without a public handle
/// arrive as text-mention entities. Invalid handles (too short, numeric)
/// are skipped.
pub fn extract_targets(text: &str, entities: &[MessageEntity], limit: usize) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();

    let handles = MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| Target::handle(m.as_str()));

    let users = entities.iter().filter_map(|entity| match &entity.kind {
        MessageEntityKind::TextMention { user } => Some(Target::user(
            user.id.0 as i64,
            user.username.as_deref(),
        )),
        _ => None,
    });

    for target in handles.chain(users) {
        if targets.len() >= limit {
            break;
        }
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}
