use teloxide::{
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::html,
};

use super::payload::VotePayload;
use crate::models::{RatingStats, Target, VoteKind};

/// HTML card shown under a mention and refreshed after each vote.
pub fn card(target: &Target, stats: RatingStats) -> String {
    let band = stats.band();
    format!(
        "<b>{} {}</b>\nRecommend {}  Blacklist {}\nNet {:+} ({})",
        band.badge(),
        html::escape(&target.to_string()),
        stats.recommend,
        stats.blacklist,
        stats.net(),
        band.label(),
    )
}

pub fn vote_keyboard(target: &Target) -> InlineKeyboardMarkup {
    let button = |label: &str, kind: VoteKind| {
        InlineKeyboardButton::callback(
            label.to_string(),
            VotePayload::new(kind, target.clone()).encode(),
        )
    };

    InlineKeyboardMarkup::new(vec![vec![
        button("👍 Recommend", VoteKind::Recommend),
        button("👎 Blacklist", VoteKind::Blacklist),
    ]])
}
