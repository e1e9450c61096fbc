//! Net score and reputation bands.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Excellent,
    Good,
    Neutral,
    Watch,
    Dangerous,
}

impl Band {
    pub fn label(self) -> &'static str {
        match self {
            Band::Excellent => "excellent",
            Band::Good => "good",
            Band::Neutral => "neutral",
            Band::Watch => "watch",
            Band::Dangerous => "dangerous",
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Band::Excellent => "🟢",
            Band::Good => "🟡",
            Band::Neutral => "⚪",
            Band::Watch => "🟠",
            Band::Dangerous => "🔴",
        }
    }
}

/// Lower bounds, checked top-down. Anything below the last bound is
/// `Band::Dangerous`, so every integer lands in exactly one band.
pub const BAND_THRESHOLDS: [(i64, Band); 4] = [
    (20, Band::Excellent),
    (5, Band::Good),
    (0, Band::Neutral),
    (-5, Band::Watch),
];

pub fn net_score(recommend: i64, blacklist: i64) -> i64 {
    recommend - blacklist
}

pub fn classify(net: i64) -> Band {
    BAND_THRESHOLDS
        .iter()
        .find(|(min, _)| net >= *min)
        .map(|(_, band)| *band)
        .unwrap_or(Band::Dangerous)
}
