//! Calendar-week tokens (`KALW-YYYYWW`) to dated weekly records.
//!
//! A token is first resolved to the Monday of week `WW`, counting weeks from
//! the first Monday of the year (week 1 starts on that Monday, days before
//! it belong to week 0). The upstream week numbering is then reconciled with
//! [`WEEK_CORRECTIONS`], an ordered table evaluated first-match-wins.

use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

static WEEK_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^KALW-(\d{4})(\d{2})$").expect("week token pattern is valid"));

pub const MIN_WEEK: u32 = 1;
pub const MAX_WEEK: u32 = 53;

/// Year and week exactly as written in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekToken {
    pub year: i32,
    pub week: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedWeek {
    pub year: i32,
    pub week: u32,
    pub time: NaiveDate,
}

/// One row of the correction table.
pub struct WeekCorrection {
    pub name: &'static str,
    pub applies: fn(&WeekToken) -> bool,
    /// New (year, week) for a matching token.
    pub relabel: fn(&WeekToken) -> (i32, u32),
    /// Weeks added to the Monday the token resolves to.
    pub shift_weeks: i64,
}

pub const WEEK_CORRECTIONS: &[WeekCorrection] = &[
    WeekCorrection {
        name: "2020-W53 is reported as 2021-W01",
        applies: |t| t.year == 2020 && t.week == 53,
        relabel: |_| (2021, 1),
        shift_weeks: 1,
    },
    WeekCorrection {
        name: "2021 weeks lag by one after the 2020-W53 shift",
        applies: |t| t.year == 2021,
        relabel: |t| (t.year, t.week + 1),
        shift_weeks: 2,
    },
    WeekCorrection {
        name: "record date is the end of the week",
        applies: |_| true,
        relabel: |t| (t.year, t.week),
        shift_weeks: 1,
    },
];

fn token_error(token: &str, reason: impl Into<String>) -> EtlError {
    EtlError::ParseError {
        context: "week token".to_string(),
        value: token.to_string(),
        reason: reason.into(),
    }
}

pub fn parse_week_token(token: &str) -> Result<WeekToken> {
    let trimmed = token.trim();
    let caps = WEEK_TOKEN
        .captures(trimmed)
        .ok_or_else(|| token_error(token, "expected KALW-YYYYWW"))?;

    let year: i32 = caps[1]
        .parse()
        .map_err(|_| token_error(token, "year is not a number"))?;
    let week: u32 = caps[2]
        .parse()
        .map_err(|_| token_error(token, "week is not a number"))?;

    if !(MIN_WEEK..=MAX_WEEK).contains(&week) {
        return Err(token_error(
            token,
            format!("week must be between {} and {}", MIN_WEEK, MAX_WEEK),
        ));
    }

    Ok(WeekToken { year, week })
}

/// Monday of `week`, where week 1 begins on the first Monday of `year`.
/// Late weeks may fall into the following calendar year.
pub fn monday_of_week(year: i32, week: u32) -> Result<NaiveDate> {
    let new_year = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| EtlError::ParseError {
        context: "week token".to_string(),
        value: year.to_string(),
        reason: "year out of range".to_string(),
    })?;
    let days_to_first_monday = (7 - new_year.weekday().num_days_from_monday()) % 7;
    let first_monday = new_year + Duration::days(i64::from(days_to_first_monday));

    Ok(first_monday + Duration::weeks(i64::from(week) - 1))
}

pub fn normalize_week_token(token: &WeekToken) -> Result<NormalizedWeek> {
    let monday = monday_of_week(token.year, token.week)?;
    let correction = WEEK_CORRECTIONS
        .iter()
        .find(|c| (c.applies)(token))
        .ok_or_else(|| token_error(&format!("{}/{}", token.year, token.week), "no week rule applies"))?;

    let (year, week) = (correction.relabel)(token);
    Ok(NormalizedWeek {
        year,
        week,
        time: monday + Duration::weeks(correction.shift_weeks),
    })
}

pub fn normalize_week(token: &str) -> Result<NormalizedWeek> {
    normalize_week_token(&parse_week_token(token)?)
}
