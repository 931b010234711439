use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

pub fn is_valid_score(score: i16) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// The six fixed rating dimensions.
///
/// Variants are declared in lexical order of their stored names so the derived
/// `Ord` agrees with `ORDER BY subcategory` in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingSubcategory {
    Breaks,
    Overall,
    Pedals,
    Power,
    Seat,
    Sturdiness,
}

impl RatingSubcategory {
    pub const ALL: [RatingSubcategory; 6] = [
        RatingSubcategory::Breaks,
        RatingSubcategory::Overall,
        RatingSubcategory::Pedals,
        RatingSubcategory::Power,
        RatingSubcategory::Seat,
        RatingSubcategory::Sturdiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breaks => "breaks",
            Self::Overall => "overall",
            Self::Pedals => "pedals",
            Self::Power => "power",
            Self::Seat => "seat",
            Self::Sturdiness => "sturdiness",
        }
    }
}

impl fmt::Display for RatingSubcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rating subcategory: {0}")]
pub struct UnknownSubcategory(pub String);

impl FromStr for RatingSubcategory {
    type Err = UnknownSubcategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sub| sub.as_str() == s)
            .ok_or_else(|| UnknownSubcategory(s.to_string()))
    }
}

/// Scores submitted with a review. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub overall: Option<i16>,
    pub breaks: Option<i16>,
    pub seat: Option<i16>,
    pub sturdiness: Option<i16>,
    pub power: Option<i16>,
    pub pedals: Option<i16>,
}

impl RatingScores {
    pub fn with(mut self, subcategory: RatingSubcategory, score: i16) -> Self {
        let slot = match subcategory {
            RatingSubcategory::Overall => &mut self.overall,
            RatingSubcategory::Breaks => &mut self.breaks,
            RatingSubcategory::Seat => &mut self.seat,
            RatingSubcategory::Sturdiness => &mut self.sturdiness,
            RatingSubcategory::Power => &mut self.power,
            RatingSubcategory::Pedals => &mut self.pedals,
        };
        *slot = Some(score);
        self
    }

    /// Provided scores in the order they are written: overall first.
    pub fn provided(&self) -> Vec<(RatingSubcategory, i16)> {
        [
            (RatingSubcategory::Overall, self.overall),
            (RatingSubcategory::Breaks, self.breaks),
            (RatingSubcategory::Seat, self.seat),
            (RatingSubcategory::Sturdiness, self.sturdiness),
            (RatingSubcategory::Power, self.power),
            (RatingSubcategory::Pedals, self.pedals),
        ]
        .into_iter()
        .filter_map(|(sub, score)| score.map(|s| (sub, s)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingAggregate {
    pub bike_numerical_id: i64,
    pub subcategory: RatingSubcategory,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub average_rating: Decimal,
}

/// One stored score together with the creation time of its review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedScore {
    pub subcategory: RatingSubcategory,
    pub score: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RatingWindow {
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "2w")]
    TwoWeeks,
    #[serde(rename = "overall")]
    Overall,
}

impl RatingWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWeek => "1w",
            Self::TwoWeeks => "2w",
            Self::Overall => "overall",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowedRating {
    pub bike_numerical_id: i64,
    pub subcategory: RatingSubcategory,
    pub window: RatingWindow,
    pub average_rating: Decimal,
}
