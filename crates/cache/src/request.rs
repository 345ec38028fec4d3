//! Render request parameters

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical textual form of a request date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Count used when a form omits the field
pub const DEFAULT_COUNT: u32 = 1;

/// The normalized parameters a chart is rendered from
///
/// Fields are private so a request cannot change after it has been used as a
/// memo key. Equality and hashing are derived over the typed fields; since the
/// date is a structured [`NaiveDate`], requests whose dates were written
/// differently but name the same day compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderRequest {
    count: u32,
    label: String,
    date: NaiveDate,
}

impl RenderRequest {
    /// Build a request from already-validated values
    #[must_use]
    pub fn new(count: u32, label: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            count,
            label: label.into(),
            date,
        }
    }

    /// Build a request from loosely typed values, rejecting anything that
    /// would have to be coerced
    pub fn from_parts(count: i64, label: impl Into<String>, date: &str) -> Result<Self> {
        let count = u32::try_from(count).map_err(|_| {
            Error::invalid_input(
                "count",
                format!("expected a non-negative integer, got {count}"),
            )
        })?;
        Ok(Self::new(count, label, parse_date(date)?))
    }

    /// Build a request from raw form fields
    ///
    /// Missing fields fall back to a count of one, an empty label and
    /// `today`. Present fields must be well formed.
    pub fn from_form(
        count: Option<&str>,
        label: Option<&str>,
        date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self> {
        let count = match count.map(str::trim) {
            None => i64::from(DEFAULT_COUNT),
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                Error::invalid_input("count", format!("expected an integer, got {raw:?}"))
            })?,
        };
        let label = label.unwrap_or_default();
        match date {
            Some(raw) => Self::from_parts(count, label, raw),
            None => Self::from_parts(count, label, &today.format(DATE_FORMAT).to_string()),
        }
    }

    /// Number of days plotted
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Chart label, unescaped
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// First plotted day
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// The date in its canonical `YYYY-MM-DD` form
    #[must_use]
    pub fn canonical_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={} label={:?} date={}",
            self.count,
            self.label,
            self.canonical_date()
        )
    }
}

/// Parse a date in strict `YYYY-MM-DD` form
///
/// chrono accepts unpadded months and days, so the parsed value is formatted
/// back and compared to reject `2024-1-1` and similar spellings.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        Error::invalid_input("date", format!("expected YYYY-MM-DD, got {raw:?} ({e})"))
    })?;
    if date.format(DATE_FORMAT).to_string() != raw {
        return Err(Error::invalid_input(
            "date",
            format!("expected YYYY-MM-DD, got {raw:?}"),
        ));
    }
    Ok(date)
}
