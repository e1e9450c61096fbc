//! The reputation ledger: cooldown checks, vote gates, recording and stats.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::{str::FromStr, sync::Arc};

use crate::{
    error::Result,
    models::{
        ChatSettings, NewVote, RatingStats, Target, VoteKey, VoteKind, VoteReceipt, normalize_handle,
    },
    store::LedgerStore,
};

pub const VOTE_COOLDOWN_HOURS: i64 = 24;

/// Aggregate row used when ratings are not split per chat.
pub const GLOBAL_SCOPE_ID: i64 = 0;

/// When an accepted vote bumps the target's counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementPolicy {
    /// Every accepted vote counts, including renewals after the cooldown.
    #[default]
    EveryAcceptedVote,
    /// Only the first vote per (chat, voter, target, type) counts.
    FirstVoteOnly,
}

impl IncrementPolicy {
    pub fn counts(self, inserted: bool) -> bool {
        match self {
            IncrementPolicy::EveryAcceptedVote => true,
            IncrementPolicy::FirstVoteOnly => inserted,
        }
    }
}

impl FromStr for IncrementPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "every" | "every_accepted_vote" => Ok(IncrementPolicy::EveryAcceptedVote),
            "first" | "first_vote_only" => Ok(IncrementPolicy::FirstVoteOnly),
            other => Err(format!("unknown increment policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingScope {
    #[default]
    PerChat,
    Global,
}

impl FromStr for RatingScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" | "per_chat" => Ok(RatingScope::PerChat),
            "global" => Ok(RatingScope::Global),
            other => Err(format!("unknown rating scope: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub cooldown: Duration,
    pub increment: IncrementPolicy,
    pub scope: RatingScope,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::hours(VOTE_COOLDOWN_HOURS),
            increment: IncrementPolicy::default(),
            scope: RatingScope::default(),
        }
    }
}

/// A voter's standing in a chat or channel, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Owner,
    Administrator,
    Member,
    Left,
    Kicked,
}

impl MemberRole {
    pub fn is_elevated(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Administrator)
    }

    pub fn is_present(self) -> bool {
        !matches!(self, MemberRole::Left | MemberRole::Kicked)
    }
}

/// Platform lookups the vote gates depend on.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole>;
    async fn joined_at(&self, chat_id: i64, user_id: i64) -> Result<Option<DateTime<Utc>>>;
}

/// A vote request as it arrives from the chat adapter.
#[derive(Debug, Clone)]
pub struct Ballot {
    pub chat_id: i64,
    pub voter_id: i64,
    pub voter_username: Option<String>,
    pub target: Target,
    pub kind: VoteKind,
    pub evidence_msg_id: Option<i64>,
}

impl Ballot {
    pub fn key(&self) -> VoteKey {
        VoteKey {
            chat_id: self.chat_id,
            voter_id: self.voter_id,
            target: self.target.key(),
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteDecision {
    Accepted {
        receipt: VoteReceipt,
        stats: RatingStats,
    },
    VoterBanned,
    /// Tenure below the chat's minimum.
    TooNew { required_days: i32 },
    /// Tenure could not be established; the voter should retry later.
    TenureUnknown,
    NotSubscribed { channel_id: i64 },
    Cooldown { retry_at: DateTime<Utc> },
}

impl VoteDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteDecision::Accepted { .. })
    }
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, policy: LedgerPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    fn scope_id(&self, chat_id: i64) -> i64 {
        match self.policy.scope {
            RatingScope::PerChat => chat_id,
            RatingScope::Global => GLOBAL_SCOPE_ID,
        }
    }

    /// The cooldown gate. A stored vote blocks while
    /// `cast_at > now - cooldown`; one exactly a cooldown old is eligible.
    pub async fn can_vote(&self, key: &VoteKey, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.retry_at(key, now).await?.is_none())
    }

    async fn retry_at(&self, key: &VoteKey, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let Some(cast_at) = self.store.last_vote_at(key).await? else {
            return Ok(None);
        };

        if cast_at > now - self.policy.cooldown {
            Ok(Some(cast_at + self.policy.cooldown))
        } else {
            Ok(None)
        }
    }

    /// Stores the vote without consulting any gate.
    pub async fn record_vote(&self, ballot: &Ballot, now: DateTime<Utc>) -> Result<VoteReceipt> {
        let vote = NewVote {
            chat_id: ballot.chat_id,
            voter_id: ballot.voter_id,
            voter_username: ballot.voter_username.as_deref().and_then(normalize_handle),
            target: ballot.target.clone(),
            kind: ballot.kind,
            evidence_msg_id: ballot.evidence_msg_id,
            cast_at: now,
            scope_id: self.scope_id(ballot.chat_id),
        };

        let receipt = self.store.record_vote(&vote, self.policy.increment).await?;
        tracing::debug!(
            chat_id = ballot.chat_id,
            voter_id = ballot.voter_id,
            rated = %ballot.target,
            kind = %ballot.kind,
            inserted = receipt.inserted,
            counted = receipt.counted,
            "vote recorded"
        );
        Ok(receipt)
    }

    /// Counters for `target`. With per-chat scope and no chat, every chat is
    /// summed.
    pub async fn get_stats(&self, target: &Target, chat_id: Option<i64>) -> Result<RatingStats> {
        let scope_id = match (self.policy.scope, chat_id) {
            (RatingScope::Global, _) => Some(GLOBAL_SCOPE_ID),
            (RatingScope::PerChat, chat_id) => chat_id,
        };

        // A resolved user may also carry history under their handle.
        let mut stats = RatingStats::default();
        for key in target.keys() {
            let part = self.store.rating(&key, scope_id).await?;
            stats.recommend += part.recommend;
            stats.blacklist += part.blacklist;
        }
        Ok(stats)
    }

    pub async fn chat_settings(&self, chat_id: i64) -> Result<ChatSettings> {
        Ok(self
            .store
            .chat_settings(chat_id)
            .await?
            .unwrap_or_else(|| ChatSettings::unrestricted(chat_id)))
    }

    async fn is_banned(&self, user_id: i64, username: Option<&str>) -> Result<bool> {
        let target = Target::user(user_id, username);
        self.store.is_banned(&target.keys()).await
    }

    /// Runs every gate in order (ban, tenure, forced membership, cooldown)
    /// and records the vote when all pass. Denials never mutate state.
    pub async fn cast(
        &self,
        ballot: &Ballot,
        directory: &dyn MemberDirectory,
        now: DateTime<Utc>,
    ) -> Result<VoteDecision> {
        if self
            .is_banned(ballot.voter_id, ballot.voter_username.as_deref())
            .await?
        {
            return Ok(VoteDecision::VoterBanned);
        }

        let settings = self.chat_settings(ballot.chat_id).await?;

        if settings.min_join_days > 0 {
            if let Some(denied) = self.tenure_gate(ballot, &settings, directory, now).await {
                return Ok(denied);
            }
        }

        if settings.force_channel_id != 0 {
            match directory.role(settings.force_channel_id, ballot.voter_id).await {
                Ok(role) if !role.is_present() => {
                    return Ok(VoteDecision::NotSubscribed {
                        channel_id: settings.force_channel_id,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    // An unreachable channel must not block all voting.
                    tracing::warn!(
                        channel_id = settings.force_channel_id,
                        voter_id = ballot.voter_id,
                        "Forced channel lookup failed, allowing vote: {}",
                        e
                    );
                }
            }
        }

        if let Some(retry_at) = self.retry_at(&ballot.key(), now).await? {
            return Ok(VoteDecision::Cooldown { retry_at });
        }

        let receipt = self.record_vote(ballot, now).await?;
        let stats = self.get_stats(&ballot.target, Some(ballot.chat_id)).await?;
        Ok(VoteDecision::Accepted { receipt, stats })
    }

    /// Fails closed: an unknown tenure denies the vote.
    async fn tenure_gate(
        &self,
        ballot: &Ballot,
        settings: &ChatSettings,
        directory: &dyn MemberDirectory,
        now: DateTime<Utc>,
    ) -> Option<VoteDecision> {
        match directory.role(ballot.chat_id, ballot.voter_id).await {
            Ok(role) if role.is_elevated() => return None,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    chat_id = ballot.chat_id,
                    voter_id = ballot.voter_id,
                    "Role lookup failed, denying vote: {}",
                    e
                );
                return Some(VoteDecision::TenureUnknown);
            }
        }

        match directory.joined_at(ballot.chat_id, ballot.voter_id).await {
            Ok(Some(joined_at)) => {
                let required = Duration::days(i64::from(settings.min_join_days));
                if now - joined_at >= required {
                    None
                } else {
                    Some(VoteDecision::TooNew {
                        required_days: settings.min_join_days,
                    })
                }
            }
            Ok(None) => {
                tracing::info!(
                    chat_id = ballot.chat_id,
                    voter_id = ballot.voter_id,
                    "No join date on record, denying vote"
                );
                Some(VoteDecision::TenureUnknown)
            }
            Err(e) => {
                tracing::warn!(
                    chat_id = ballot.chat_id,
                    voter_id = ballot.voter_id,
                    "Join date lookup failed, denying vote: {}",
                    e
                );
                Some(VoteDecision::TenureUnknown)
            }
        }
    }
}
