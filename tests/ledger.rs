mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{FakeDirectory, StoreDirectory, policy, sqlite_store};
use reputation_bot::{
    models::{BanRecord, ChatSettings, RatingStats, Target, VoteKind},
    services::{
        ledger::{Ballot, IncrementPolicy, Ledger, MemberRole, RatingScope, VoteDecision},
        scoring::Band,
    },
};

const CHAT: i64 = -1001;
const OTHER_CHAT: i64 = -1002;
const CHANNEL: i64 = -1009;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn alice() -> Target {
    Target::handle("alice").unwrap()
}

fn ballot(chat_id: i64, voter_id: i64, target: Target, kind: VoteKind) -> Ballot {
    Ballot {
        chat_id,
        voter_id,
        voter_username: None,
        target,
        kind,
        evidence_msg_id: Some(7),
    }
}

async fn ledger_with(increment: IncrementPolicy, scope: RatingScope) -> (Ledger, tempfile::TempDir) {
    let (store, dir) = sqlite_store().await;
    (Ledger::new(store, policy(increment, scope)), dir)
}

async fn ledger() -> (Ledger, tempfile::TempDir) {
    ledger_with(IncrementPolicy::EveryAcceptedVote, RatingScope::PerChat).await
}

#[tokio::test]
async fn unseen_target_is_neutral() {
    let (ledger, _dir) = ledger().await;
    let stats = ledger.get_stats(&alice(), Some(CHAT)).await.unwrap();
    assert_eq!(stats, RatingStats::new(0, 0));
    assert_eq!(stats.band(), Band::Neutral);
}

#[tokio::test]
async fn first_recommend_counts_once() {
    let (ledger, _dir) = ledger().await;
    let directory = FakeDirectory::default();

    let decision = ledger
        .cast(&ballot(CHAT, 1, alice(), VoteKind::Recommend), &directory, t0())
        .await
        .unwrap();
    let VoteDecision::Accepted { receipt, stats } = decision else {
        panic!("expected acceptance, got {:?}", decision);
    };
    assert!(receipt.inserted);
    assert!(receipt.counted);
    assert_eq!(stats, RatingStats::new(1, 0));
    assert_eq!(stats.band(), Band::Neutral);

    // Reading is idempotent.
    for _ in 0..3 {
        assert_eq!(
            ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
            RatingStats::new(1, 0)
        );
    }
}

#[tokio::test]
async fn repeat_vote_in_the_same_instant_is_refused() {
    let (ledger, _dir) = ledger().await;
    let directory = FakeDirectory::default();
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    ledger.cast(&vote, &directory, t0()).await.unwrap();
    let decision = ledger.cast(&vote, &directory, t0()).await.unwrap();

    assert_eq!(
        decision,
        VoteDecision::Cooldown {
            retry_at: t0() + Duration::hours(24)
        }
    );
    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::new(1, 0)
    );
}

#[tokio::test]
async fn cooldown_reopens_exactly_after_24_hours() {
    let (ledger, _dir) = ledger().await;
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);
    ledger.record_vote(&vote, t0()).await.unwrap();

    let almost = t0() + Duration::hours(24) - Duration::milliseconds(1);
    assert!(!ledger.can_vote(&vote.key(), almost).await.unwrap());
    assert!(ledger.can_vote(&vote.key(), t0() + Duration::hours(24)).await.unwrap());
}

#[tokio::test]
async fn every_accepted_vote_increments_by_default() {
    let (ledger, _dir) = ledger().await;
    let directory = FakeDirectory::default();
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    ledger.cast(&vote, &directory, t0()).await.unwrap();
    let decision = ledger
        .cast(&vote, &directory, t0() + Duration::hours(24))
        .await
        .unwrap();

    let VoteDecision::Accepted { receipt, stats } = decision else {
        panic!("expected acceptance, got {:?}", decision);
    };
    assert!(!receipt.inserted);
    assert!(receipt.counted);
    assert_eq!(stats, RatingStats::new(2, 0));
}

#[tokio::test]
async fn first_vote_only_renews_without_counting() {
    let (ledger, _dir) = ledger_with(IncrementPolicy::FirstVoteOnly, RatingScope::PerChat).await;
    let directory = FakeDirectory::default();
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    ledger.cast(&vote, &directory, t0()).await.unwrap();
    let renewed = t0() + Duration::hours(30);
    let decision = ledger.cast(&vote, &directory, renewed).await.unwrap();

    let VoteDecision::Accepted { receipt, stats } = decision else {
        panic!("expected acceptance, got {:?}", decision);
    };
    assert!(!receipt.inserted);
    assert!(!receipt.counted);
    assert_eq!(stats, RatingStats::new(1, 0));

    // The stored vote was refreshed, so the cooldown restarts from the renewal.
    let key = vote.key();
    assert!(!ledger.can_vote(&key, renewed + Duration::hours(23)).await.unwrap());
}

#[tokio::test]
async fn recommend_and_blacklist_have_separate_cooldowns() {
    let (ledger, _dir) = ledger().await;
    let directory = FakeDirectory::default();

    let rec = ledger
        .cast(&ballot(CHAT, 1, alice(), VoteKind::Recommend), &directory, t0())
        .await
        .unwrap();
    let black = ledger
        .cast(&ballot(CHAT, 1, alice(), VoteKind::Blacklist), &directory, t0())
        .await
        .unwrap();

    assert!(rec.is_accepted());
    assert!(black.is_accepted());
    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::new(1, 1)
    );
}

#[tokio::test]
async fn many_voters_reach_excellent() {
    let (ledger, _dir) = ledger().await;
    let directory = FakeDirectory::default();

    for voter in 1..=25 {
        let vote = ballot(CHAT, voter, alice(), VoteKind::Recommend);
        assert!(ledger.cast(&vote, &directory, t0()).await.unwrap().is_accepted());
    }
    for voter in 26..=28 {
        let vote = ballot(CHAT, voter, alice(), VoteKind::Blacklist);
        assert!(ledger.cast(&vote, &directory, t0()).await.unwrap().is_accepted());
    }

    let stats = ledger.get_stats(&alice(), Some(CHAT)).await.unwrap();
    assert_eq!(stats, RatingStats::new(25, 3));
    assert_eq!(stats.net(), 22);
    assert_eq!(stats.band(), Band::Excellent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_votes_are_never_lost() {
    let (ledger, _dir) = ledger().await;

    let tasks: Vec<_> = (1..=20)
        .map(|voter| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .record_vote(&ballot(CHAT, voter, alice(), VoteKind::Recommend), t0())
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::new(20, 0)
    );
}

#[tokio::test]
async fn per_chat_scope_keeps_chats_apart() {
    let (ledger, _dir) = ledger().await;
    ledger
        .record_vote(&ballot(CHAT, 1, alice(), VoteKind::Recommend), t0())
        .await
        .unwrap();
    ledger
        .record_vote(&ballot(OTHER_CHAT, 2, alice(), VoteKind::Blacklist), t0())
        .await
        .unwrap();

    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::new(1, 0)
    );
    assert_eq!(
        ledger.get_stats(&alice(), Some(OTHER_CHAT)).await.unwrap(),
        RatingStats::new(0, 1)
    );
    // No chat: every chat summed.
    assert_eq!(
        ledger.get_stats(&alice(), None).await.unwrap(),
        RatingStats::new(1, 1)
    );
}

#[tokio::test]
async fn global_scope_shares_one_counter() {
    let (ledger, _dir) = ledger_with(IncrementPolicy::EveryAcceptedVote, RatingScope::Global).await;
    ledger
        .record_vote(&ballot(CHAT, 1, alice(), VoteKind::Recommend), t0())
        .await
        .unwrap();
    ledger
        .record_vote(&ballot(OTHER_CHAT, 2, alice(), VoteKind::Recommend), t0())
        .await
        .unwrap();

    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::new(2, 0)
    );
    // Cooldowns stay per chat.
    let vote = ballot(OTHER_CHAT, 1, alice(), VoteKind::Recommend);
    assert!(ledger.can_vote(&vote.key(), t0()).await.unwrap());
}

#[tokio::test]
async fn resolved_users_include_history_under_their_handle() {
    let (ledger, _dir) = ledger().await;
    let carol = Target::user(9, Some("carol"));

    ledger
        .record_vote(&ballot(CHAT, 1, Target::handle("carol").unwrap(), VoteKind::Recommend), t0())
        .await
        .unwrap();
    ledger
        .record_vote(&ballot(CHAT, 2, carol.clone(), VoteKind::Recommend), t0())
        .await
        .unwrap();

    assert_eq!(
        ledger.get_stats(&carol, Some(CHAT)).await.unwrap(),
        RatingStats::new(2, 0)
    );
    // A bare id does not know the handle.
    assert_eq!(
        ledger.get_stats(&Target::user(9, None), Some(CHAT)).await.unwrap(),
        RatingStats::new(1, 0)
    );
}

#[tokio::test]
async fn clearing_a_user_removes_their_votes_both_ways() {
    let (ledger, _dir) = ledger().await;
    let store = ledger.store().clone();
    let dave = Target::user(5, Some("dave"));
    let bob = Target::handle("bob").unwrap();

    ledger
        .record_vote(&ballot(CHAT, 1, dave.clone(), VoteKind::Recommend), t0())
        .await
        .unwrap();
    ledger
        .record_vote(&ballot(CHAT, 2, Target::handle("dave").unwrap(), VoteKind::Blacklist), t0())
        .await
        .unwrap();
    let dave_votes_bob = ballot(CHAT, 5, bob.clone(), VoteKind::Recommend);
    ledger.record_vote(&dave_votes_bob, t0()).await.unwrap();

    let removed = store
        .clear_user_data(&dave.keys(), dave.user_id())
        .await
        .unwrap();
    assert_eq!(removed, 5);

    assert_eq!(
        ledger.get_stats(&dave, Some(CHAT)).await.unwrap(),
        RatingStats::default()
    );
    // Dave's own vote is gone, so the cooldown no longer applies.
    assert!(ledger.can_vote(&dave_votes_bob.key(), t0()).await.unwrap());
    // Bob's aggregate is untouched.
    assert_eq!(
        ledger.get_stats(&bob, Some(CHAT)).await.unwrap(),
        RatingStats::new(1, 0)
    );
}

#[tokio::test]
async fn banned_voters_cannot_vote() {
    let (ledger, _dir) = ledger().await;
    ledger
        .store()
        .ban(&BanRecord::new(&Target::handle("mallory").unwrap(), t0()))
        .await
        .unwrap();

    let mut vote = ballot(CHAT, 66, alice(), VoteKind::Blacklist);
    vote.voter_username = Some("Mallory".to_string());

    let decision = ledger
        .cast(&vote, &FakeDirectory::default(), t0())
        .await
        .unwrap();
    assert_eq!(decision, VoteDecision::VoterBanned);
    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::default()
    );
}

async fn require_tenure(ledger: &Ledger, days: i32) {
    ledger
        .store()
        .set_chat_settings(&ChatSettings {
            chat_id: CHAT,
            min_join_days: days,
            force_channel_id: 0,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn tenure_gate_checks_join_date() {
    let (ledger, _dir) = ledger().await;
    require_tenure(&ledger, 7).await;
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    let newcomer = FakeDirectory::default()
        .with_role(CHAT, 1, MemberRole::Member)
        .with_join(CHAT, 1, t0() - Duration::days(3));
    assert_eq!(
        ledger.cast(&vote, &newcomer, t0()).await.unwrap(),
        VoteDecision::TooNew { required_days: 7 }
    );

    let veteran = FakeDirectory::default()
        .with_role(CHAT, 1, MemberRole::Member)
        .with_join(CHAT, 1, t0() - Duration::days(7));
    assert!(ledger.cast(&vote, &veteran, t0()).await.unwrap().is_accepted());
}

#[tokio::test]
async fn tenure_gate_fails_closed() {
    let (ledger, _dir) = ledger().await;
    require_tenure(&ledger, 7).await;
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    let no_record = FakeDirectory::default().with_role(CHAT, 1, MemberRole::Member);
    assert_eq!(
        ledger.cast(&vote, &no_record, t0()).await.unwrap(),
        VoteDecision::TenureUnknown
    );

    let unreachable = FakeDirectory::default().unreachable(CHAT);
    assert_eq!(
        ledger.cast(&vote, &unreachable, t0()).await.unwrap(),
        VoteDecision::TenureUnknown
    );
    assert_eq!(
        ledger.get_stats(&alice(), Some(CHAT)).await.unwrap(),
        RatingStats::default()
    );
}

#[tokio::test]
async fn chat_admins_skip_the_tenure_gate() {
    let (ledger, _dir) = ledger().await;
    require_tenure(&ledger, 30).await;

    let directory = FakeDirectory::default().with_role(CHAT, 1, MemberRole::Administrator);
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);
    assert!(ledger.cast(&vote, &directory, t0()).await.unwrap().is_accepted());
}

async fn require_channel(ledger: &Ledger) {
    ledger
        .store()
        .set_chat_settings(&ChatSettings {
            chat_id: CHAT,
            min_join_days: 0,
            force_channel_id: CHANNEL,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn forced_channel_requires_membership() {
    let (ledger, _dir) = ledger().await;
    require_channel(&ledger).await;
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    let outsider = FakeDirectory::default().with_role(CHANNEL, 1, MemberRole::Left);
    assert_eq!(
        ledger.cast(&vote, &outsider, t0()).await.unwrap(),
        VoteDecision::NotSubscribed { channel_id: CHANNEL }
    );

    let subscriber = FakeDirectory::default().with_role(CHANNEL, 1, MemberRole::Member);
    assert!(ledger.cast(&vote, &subscriber, t0()).await.unwrap().is_accepted());
}

#[tokio::test]
async fn forced_channel_fails_open() {
    let (ledger, _dir) = ledger().await;
    require_channel(&ledger).await;

    let directory = FakeDirectory::default().unreachable(CHANNEL);
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);
    assert!(ledger.cast(&vote, &directory, t0()).await.unwrap().is_accepted());
}

#[tokio::test]
async fn gates_run_before_the_cooldown() {
    let (ledger, _dir) = ledger().await;
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);
    ledger.record_vote(&vote, t0()).await.unwrap();
    require_channel(&ledger).await;

    // Both the channel gate and the cooldown would deny; the gate answers.
    let decision = ledger
        .cast(&vote, &FakeDirectory::default(), t0())
        .await
        .unwrap();
    assert_eq!(decision, VoteDecision::NotSubscribed { channel_id: CHANNEL });
}

#[tokio::test]
async fn join_dates_reset_on_rejoin() {
    let (ledger, _dir) = ledger().await;
    let store = ledger.store();

    store.record_join(CHAT, 1, t0() - Duration::days(40)).await.unwrap();
    store.record_join(CHAT, 1, t0()).await.unwrap();

    let joined = store.joined_at(CHAT, 1).await.unwrap();
    assert_eq!(joined, Some(t0()));
    assert_eq!(store.joined_at(CHAT, 2).await.unwrap(), None);
}

#[tokio::test]
async fn first_sighting_never_overrides_a_join_date() {
    let (ledger, _dir) = ledger().await;
    let store = ledger.store();

    store.record_first_seen(CHAT, 1, t0()).await.unwrap();
    store.record_first_seen(CHAT, 1, t0() + Duration::days(2)).await.unwrap();
    assert_eq!(store.joined_at(CHAT, 1).await.unwrap(), Some(t0()));

    // A real join event still resets tenure.
    store.record_join(CHAT, 1, t0() + Duration::days(3)).await.unwrap();
    store.record_first_seen(CHAT, 1, t0() + Duration::days(4)).await.unwrap();
    assert_eq!(
        store.joined_at(CHAT, 1).await.unwrap(),
        Some(t0() + Duration::days(3))
    );
}

#[tokio::test]
async fn long_standing_members_pass_once_seen_long_enough() {
    let (ledger, _dir) = ledger().await;
    require_tenure(&ledger, 7).await;
    let directory = StoreDirectory(ledger.store().clone());
    let vote = ballot(CHAT, 1, alice(), VoteKind::Recommend);

    assert_eq!(
        ledger.cast(&vote, &directory, t0()).await.unwrap(),
        VoteDecision::TenureUnknown
    );

    ledger.store().record_first_seen(CHAT, 1, t0()).await.unwrap();
    assert_eq!(
        ledger
            .cast(&vote, &directory, t0() + Duration::days(1))
            .await
            .unwrap(),
        VoteDecision::TooNew { required_days: 7 }
    );
    assert!(
        ledger
            .cast(&vote, &directory, t0() + Duration::days(7))
            .await
            .unwrap()
            .is_accepted()
    );
}
