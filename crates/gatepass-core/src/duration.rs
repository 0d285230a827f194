// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symbolic duration vocabulary for invite expiry and quota periods.
//!
//! Invite expiries are expressed as a closed set of tokens ("24h", "7d",
//! "never", ...) rather than free-form durations. Tokens map to millisecond
//! magnitudes and human display labels; `never` has no magnitude and compares
//! greater than every other token.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// A symbolic invite-expiry duration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum DurationToken {
    #[serde(rename = "1h")]
    #[strum(serialize = "1h")]
    Hour1,
    #[serde(rename = "6h")]
    #[strum(serialize = "6h")]
    Hour6,
    #[serde(rename = "12h")]
    #[strum(serialize = "12h")]
    Hour12,
    #[serde(rename = "24h")]
    #[strum(serialize = "24h")]
    Hour24,
    #[serde(rename = "1d")]
    #[strum(serialize = "1d")]
    Day1,
    #[serde(rename = "3d")]
    #[strum(serialize = "3d")]
    Day3,
    #[serde(rename = "7d")]
    #[strum(serialize = "7d")]
    Day7,
    #[serde(rename = "14d")]
    #[strum(serialize = "14d")]
    Day14,
    #[serde(rename = "30d")]
    #[strum(serialize = "30d")]
    Day30,
    #[serde(rename = "1m")]
    #[strum(serialize = "1m")]
    Month1,
    #[serde(rename = "3m")]
    #[strum(serialize = "3m")]
    Month3,
    #[serde(rename = "6m")]
    #[strum(serialize = "6m")]
    Month6,
    #[serde(rename = "1y")]
    #[strum(serialize = "1y")]
    Year1,
    #[serde(rename = "never")]
    #[strum(serialize = "never")]
    Never,
}

impl DurationToken {
    /// Magnitude in milliseconds. `None` means unbounded (`never`).
    pub fn millis(self) -> Option<u64> {
        match self {
            Self::Hour1 => Some(HOUR_MS),
            Self::Hour6 => Some(6 * HOUR_MS),
            Self::Hour12 => Some(12 * HOUR_MS),
            Self::Hour24 | Self::Day1 => Some(DAY_MS),
            Self::Day3 => Some(3 * DAY_MS),
            Self::Day7 => Some(7 * DAY_MS),
            Self::Day14 => Some(14 * DAY_MS),
            Self::Day30 | Self::Month1 => Some(30 * DAY_MS),
            Self::Month3 => Some(90 * DAY_MS),
            Self::Month6 => Some(180 * DAY_MS),
            Self::Year1 => Some(365 * DAY_MS),
            Self::Never => None,
        }
    }

    /// Human-readable display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hour1 => "1 Hour",
            Self::Hour6 => "6 Hours",
            Self::Hour12 => "12 Hours",
            Self::Hour24 => "24 Hours",
            Self::Day1 => "1 Day",
            Self::Day3 => "3 Days",
            Self::Day7 => "7 Days",
            Self::Day14 => "2 Weeks",
            Self::Day30 => "30 Days",
            Self::Month1 => "1 Month",
            Self::Month3 => "3 Months",
            Self::Month6 => "6 Months",
            Self::Year1 => "1 Year",
            Self::Never => "Never",
        }
    }

    /// Whether this token's duration is at most `other`'s, treating `never`
    /// as infinite.
    pub fn at_most(self, other: DurationToken) -> bool {
        match (self.millis(), other.millis()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a <= b,
        }
    }
}

/// The canonical expiry ladder offered to invite creators, ascending.
pub const EXPIRY_LADDER: [DurationToken; 5] = [
    DurationToken::Hour24,
    DurationToken::Day3,
    DurationToken::Day7,
    DurationToken::Day14,
    DurationToken::Never,
];

/// Quota accounting period for recurring strategies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// Sliding lookback window in milliseconds. The window is anchored at the
    /// instant of evaluation, not at a calendar boundary.
    pub fn lookback_millis(self) -> u64 {
        match self {
            Self::Day => DAY_MS,
            Self::Week => 7 * DAY_MS,
            Self::Month => 30 * DAY_MS,
            Self::Year => 365 * DAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn token_magnitudes() {
        assert_eq!(DurationToken::Hour1.millis(), Some(3_600_000));
        assert_eq!(DurationToken::Hour24.millis(), Some(86_400_000));
        // "1d" and "24h" are synonyms.
        assert_eq!(
            DurationToken::Day1.millis(),
            DurationToken::Hour24.millis()
        );
        assert_eq!(
            DurationToken::Day30.millis(),
            DurationToken::Month1.millis()
        );
        assert_eq!(DurationToken::Never.millis(), None);
    }

    #[test]
    fn token_string_round_trip() {
        for token in EXPIRY_LADDER {
            let s = token.to_string();
            let parsed = DurationToken::from_str(&s).unwrap();
            assert_eq!(parsed, token);
        }
        assert_eq!(DurationToken::from_str("14d").unwrap(), DurationToken::Day14);
        assert!(DurationToken::from_str("2w").is_err());
    }

    #[test]
    fn token_serde_uses_short_form() {
        let json = serde_json::to_string(&DurationToken::Day7).unwrap();
        assert_eq!(json, "\"7d\"");
        let parsed: DurationToken = serde_json::from_str("\"never\"").unwrap();
        assert_eq!(parsed, DurationToken::Never);
    }

    #[test]
    fn never_dominates_ordering() {
        assert!(DurationToken::Year1.at_most(DurationToken::Never));
        assert!(!DurationToken::Never.at_most(DurationToken::Year1));
        assert!(DurationToken::Never.at_most(DurationToken::Never));
        assert!(DurationToken::Day3.at_most(DurationToken::Day7));
        assert!(!DurationToken::Day7.at_most(DurationToken::Day3));
    }

    #[test]
    fn labels() {
        assert_eq!(DurationToken::Day14.label(), "2 Weeks");
        assert_eq!(DurationToken::Never.label(), "Never");
    }

    #[test]
    fn expiry_ladder_is_ascending() {
        for pair in EXPIRY_LADDER.windows(2) {
            assert!(pair[0].at_most(pair[1]), "{:?} should be <= {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn period_lookbacks() {
        assert_eq!(Period::Day.lookback_millis(), 86_400_000);
        assert_eq!(Period::Week.lookback_millis(), 7 * 86_400_000);
        assert_eq!(Period::from_str("week").unwrap(), Period::Week);
    }
}
