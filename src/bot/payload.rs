//! Callback data attached to the vote buttons.
//!
//! Layout: `<kind>:h:<handle>` or `<kind>:u:<id>[:<username>]` with
//! `kind` one of `rec` / `black`. The platform caps callback data at 64
//! bytes; anything longer, or not matching the layout, decodes to `None`.

use crate::models::{Target, VoteKind, normalize_handle};

pub const MAX_PAYLOAD_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePayload {
    pub kind: VoteKind,
    pub target: Target,
}

impl VotePayload {
    pub fn new(kind: VoteKind, target: Target) -> Self {
        Self { kind, target }
    }

    pub fn encode(&self) -> String {
        let kind = kind_tag(self.kind);
        let full = match &self.target {
            Target::Handle { handle } => format!("{}:h:{}", kind, handle),
            Target::User {
                id,
                username: Some(username),
            } => format!("{}:u:{}:{}", kind, id, username),
            Target::User { id, username: None } => format!("{}:u:{}", kind, id),
        };

        if full.len() <= MAX_PAYLOAD_LEN {
            return full;
        }
        // The id alone is always short enough; the name is refreshed on vote.
        match &self.target {
            Target::User { id, .. } => format!("{}:u:{}", kind, id),
            Target::Handle { .. } => full,
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        if data.len() > MAX_PAYLOAD_LEN {
            return None;
        }

        let mut parts = data.splitn(3, ':');
        let kind = match parts.next()? {
            "rec" => VoteKind::Recommend,
            "black" => VoteKind::Blacklist,
            _ => return None,
        };

        let target = match (parts.next()?, parts.next()?) {
            ("h", handle) => {
                let normalized = normalize_handle(handle)?;
                // Stored handles are already canonical.
                if normalized != handle {
                    return None;
                }
                Target::Handle { handle: normalized }
            }
            ("u", rest) => {
                let (id, username) = match rest.split_once(':') {
                    Some((id, username)) => (id, Some(normalize_handle(username)?)),
                    None => (rest, None),
                };
                Target::User {
                    id: id.parse().ok()?,
                    username,
                }
            }
            _ => return None,
        };

        Some(Self { kind, target })
    }
}

fn kind_tag(kind: VoteKind) -> &'static str {
    match kind {
        VoteKind::Recommend => "rec",
        VoteKind::Blacklist => "black",
    }
}
