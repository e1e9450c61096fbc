mod common;

use chrono::Utc;
use common::{OWNER_ID, app_state, sqlite_store};
use reputation_bot::{
    error::AppError,
    models::{ChatSettings, RatingStats, Target, VoteKind},
    services::{admin_service::DEFAULT_WELCOME, ledger::Ballot},
};

fn vote(voter_id: i64, voter_username: Option<&str>, target: Target, kind: VoteKind) -> Ballot {
    Ballot {
        chat_id: -1001,
        voter_id,
        voter_username: voter_username.map(str::to_string),
        target,
        kind,
        evidence_msg_id: None,
    }
}

#[tokio::test]
async fn owner_is_persisted_and_protected() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store.clone()).await;

    assert_eq!(store.list_admins().await.unwrap(), vec![OWNER_ID]);
    assert!(state.admin.access().is_admin(OWNER_ID).await);

    let err = state.admin.remove_admin(OWNER_ID).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.list_admins().await.unwrap().contains(&OWNER_ID));

    let err = state.admin.ban_user(&Target::user(OWNER_ID, None)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn access_cache_follows_every_write() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;
    let access = state.admin.access();

    assert!(!access.is_admin(7).await);
    assert!(state.admin.add_admin(7).await.unwrap());
    assert!(access.is_admin(7).await);
    assert!(!state.admin.add_admin(7).await.unwrap());
    assert!(state.admin.remove_admin(7).await.unwrap());
    assert!(!access.is_admin(7).await);

    assert!(!access.is_authorized_chat(-42).await);
    assert!(state.admin.authorize_chat(-42).await.unwrap());
    assert!(access.is_authorized_chat(-42).await);
    assert_eq!(access.authorized_chats().await, vec![-42]);
    assert!(state.admin.revoke_chat(-42).await.unwrap());
    assert!(!state.admin.revoke_chat(-42).await.unwrap());
    assert!(!access.is_authorized_chat(-42).await);
}

#[tokio::test]
async fn a_restarted_cache_sees_stored_rights() {
    let (store, _dir) = sqlite_store().await;
    let first = app_state(store.clone()).await;
    first.admin.add_admin(8).await.unwrap();
    first.admin.authorize_chat(-5).await.unwrap();

    let second = app_state(store).await;
    assert!(second.admin.access().is_admin(8).await);
    assert!(second.admin.access().is_authorized_chat(-5).await);
}

#[tokio::test]
async fn bans_match_by_id_or_handle() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;

    state.admin.ban_user(&Target::handle("@Eve").unwrap()).await.unwrap();
    assert!(state.admin.is_banned(31, Some("eve")).await.unwrap());
    assert!(!state.admin.is_banned(31, None).await.unwrap());

    state.admin.ban_user(&Target::user(32, None)).await.unwrap();
    assert!(state.admin.is_banned(32, Some("renamed")).await.unwrap());

    let bans = state.admin.list_bans().await.unwrap();
    let keys: Vec<_> = bans.iter().map(|ban| ban.ban_key.as_str()).collect();
    assert!(keys.contains(&"eve"));
    assert!(keys.contains(&"id:32"));

    assert!(state.admin.unban_user(&Target::user(31, Some("eve"))).await.unwrap());
    assert!(!state.admin.is_banned(31, Some("eve")).await.unwrap());
    assert!(!state.admin.unban_user(&Target::handle("eve").unwrap()).await.unwrap());
}

#[tokio::test]
async fn clearing_by_handle_reaches_the_user_behind_it() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;
    let now = Utc::now();
    let bob = Target::handle("bob").unwrap();
    let alice_by_id = Target::user(42, Some("alice"));

    let alice_votes_bob = vote(42, Some("Alice"), bob.clone(), VoteKind::Recommend);
    let ballots = [
        alice_votes_bob.clone(),
        vote(100, None, Target::handle("alice").unwrap(), VoteKind::Blacklist),
        vote(101, None, Target::user(42, None), VoteKind::Blacklist),
    ];
    for ballot in &ballots {
        state.ledger.record_vote(ballot, now).await.unwrap();
    }
    assert_eq!(
        state.ledger.get_stats(&alice_by_id, Some(-1001)).await.unwrap(),
        RatingStats::new(0, 2)
    );

    let removed = state
        .admin
        .clear_user_data(&Target::handle("@alice").unwrap())
        .await
        .unwrap();
    // Two aggregates and three votes.
    assert_eq!(removed, 5);

    assert_eq!(
        state.ledger.get_stats(&alice_by_id, Some(-1001)).await.unwrap(),
        RatingStats::default()
    );
    assert!(state.ledger.can_vote(&alice_votes_bob.key(), now).await.unwrap());
    // Counters already credited to others stay.
    assert_eq!(
        state.ledger.get_stats(&bob, Some(-1001)).await.unwrap(),
        RatingStats::new(1, 0)
    );
}

#[tokio::test]
async fn clearing_an_unknown_handle_only_touches_that_handle() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;
    let now = Utc::now();

    let ballot = vote(7, None, Target::handle("ghost").unwrap(), VoteKind::Recommend);
    state.ledger.record_vote(&ballot, now).await.unwrap();

    let removed = state
        .admin
        .clear_user_data(&Target::handle("ghost").unwrap())
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(state.ledger.can_vote(&ballot.key(), now).await.unwrap());
}

#[tokio::test]
async fn welcome_message_is_seeded_and_replaceable() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;

    assert_eq!(state.admin.welcome_message().await.unwrap(), DEFAULT_WELCOME);

    state.admin.set_welcome_message("  Hello <b>group</b>  ").await.unwrap();
    assert_eq!(
        state.admin.welcome_message().await.unwrap(),
        "Hello <b>group</b>"
    );

    assert!(state.admin.set_welcome_message("   ").await.is_err());
}

#[tokio::test]
async fn chat_settings_update_one_field_at_a_time() {
    let (store, _dir) = sqlite_store().await;
    let state = app_state(store).await;

    assert_eq!(
        state.admin.chat_settings(-9).await.unwrap(),
        ChatSettings::unrestricted(-9)
    );

    state.admin.set_min_join_days(-9, 3).await.unwrap();
    let settings = state.admin.set_force_channel(-9, -777).await.unwrap();
    assert_eq!(
        settings,
        ChatSettings {
            chat_id: -9,
            min_join_days: 3,
            force_channel_id: -777,
        }
    );
    assert_eq!(state.admin.list_chat_settings().await.unwrap(), vec![settings]);

    assert!(state.admin.set_min_join_days(-9, -1).await.is_err());
}
