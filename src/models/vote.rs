use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const USER_KEY_PREFIX: &str = "id:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Recommend,
    Blacklist,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Recommend => "recommend",
            VoteKind::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user being rated.
///
/// Handles are stored lowercase without the leading `@`. Resolved users are
/// keyed by their platform id so that renames do not split their history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Handle { handle: String },
    User { id: i64, username: Option<String> },
}

impl Target {
    pub fn handle(raw: &str) -> Option<Self> {
        normalize_handle(raw).map(|handle| Target::Handle { handle })
    }

    pub fn user(id: i64, username: Option<&str>) -> Self {
        Target::User {
            id,
            username: username.and_then(normalize_handle),
        }
    }

    /// Parses an admin-supplied argument: a numeric user id or a handle.
    pub fn parse_arg(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        if arg.is_empty() {
            return None;
        }
        match arg.parse::<i64>() {
            Ok(id) => Some(Target::user(id, None)),
            Err(_) => Target::handle(arg),
        }
    }

    /// Canonical storage key. Handles never contain `:`, so the two key
    /// spaces cannot collide.
    pub fn key(&self) -> String {
        match self {
            Target::Handle { handle } => handle.clone(),
            Target::User { id, .. } => format!("{}{}", USER_KEY_PREFIX, id),
        }
    }

    /// Every key this target may have been stored under.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Target::User {
                username: Some(username),
                ..
            } => vec![self.key(), username.clone()],
            _ => vec![self.key()],
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Target::User { id, .. } => Some(*id),
            Target::Handle { .. } => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Target::Handle { handle } => Some(handle),
            Target::User { username, .. } => username.as_deref(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Handle { handle } => write!(f, "@{}", handle),
            Target::User {
                username: Some(username),
                ..
            } => write!(f, "@{}", username),
            Target::User { id, username: None } => write!(f, "user {}", id),
        }
    }
}

/// The user id behind an `id:<n>` storage key.
pub fn user_id_from_key(key: &str) -> Option<i64> {
    key.strip_prefix(USER_KEY_PREFIX)?.parse().ok()
}

/// Lowercases a handle and strips the leading `@`. Handles must be 3-32 word
/// characters and not purely numeric.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_start_matches('@').to_lowercase();
    let len = handle.chars().count();
    if !(3..=32).contains(&len) {
        return None;
    }
    if !handle.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    if handle.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(handle)
}

/// Identifies the single stored vote a voter may hold per target and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteKey {
    pub chat_id: i64,
    pub voter_id: i64,
    pub target: String,
    pub kind: VoteKind,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub chat_id: i64,
    pub voter_id: i64,
    /// Normalized handle of the voter, kept so a handle can later be
    /// resolved to this id.
    pub voter_username: Option<String>,
    pub target: Target,
    pub kind: VoteKind,
    pub evidence_msg_id: Option<i64>,
    pub cast_at: DateTime<Utc>,
    /// Aggregate row the counter lives in: the chat, or `0` for global scope.
    pub scope_id: i64,
}

impl NewVote {
    pub fn key(&self) -> VoteKey {
        VoteKey {
            chat_id: self.chat_id,
            voter_id: self.voter_id,
            target: self.target.key(),
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub inserted: bool,
    pub counted: bool,
}
