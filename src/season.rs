use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Years planned on either side of the reference year.
const YEARS_AROUND: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Month is 1-based. Out-of-range months fall into FALL, same as Sep–Nov.
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    pub fn as_graphql(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Fall => "FALL",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_graphql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeasonBucket {
    pub season: Season,
    pub year: i32,
}

impl fmt::Display for SeasonBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}

/// December stays in the reference year.
pub fn current_bucket(reference: NaiveDate) -> SeasonBucket {
    SeasonBucket {
        season: Season::from_month(reference.month()),
        year: reference.year(),
    }
}

/// Buckets from two years ahead down to two years behind, each year in
/// WINTER, SPRING, SUMMER, FALL order.
pub fn plan_seasons(reference: NaiveDate) -> Vec<SeasonBucket> {
    let year = reference.year();
    ((year - YEARS_AROUND)..=(year + YEARS_AROUND))
        .rev()
        .flat_map(|year| Season::ALL.into_iter().map(move |season| SeasonBucket { season, year }))
        .collect()
}
