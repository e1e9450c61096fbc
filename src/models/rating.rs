use serde::Serialize;

use crate::services::scoring::{self, Band};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RatingStats {
    pub recommend: i64,
    pub blacklist: i64,
}

impl RatingStats {
    pub fn new(recommend: i64, blacklist: i64) -> Self {
        Self {
            recommend,
            blacklist,
        }
    }

    pub fn net(&self) -> i64 {
        scoring::net_score(self.recommend, self.blacklist)
    }

    pub fn band(&self) -> Band {
        scoring::classify(self.net())
    }
}

// Rating response
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub target: String,
    pub chat_id: Option<i64>,
    pub recommend: i64,
    pub blacklist: i64,
    pub net: i64,
    pub band: Band,
    pub label: &'static str,
}

impl RatingResponse {
    pub fn new(target: String, chat_id: Option<i64>, stats: RatingStats) -> Self {
        let band = stats.band();
        Self {
            target,
            chat_id,
            recommend: stats.recommend,
            blacklist: stats.blacklist,
            net: stats.net(),
            band,
            label: band.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub rated_users: i64,
    pub votes: i64,
}
