//! Query-string filters shared by every list endpoint.
//!
//! [`ListParams`] is the raw query string as axum deserializes it; it is
//! turned into a typed [`ListFilter`] (a set of [`Condition`]s plus
//! pagination) before it reaches the repository.
//!
//! | Param | Condition |
//! |-------|-----------|
//! | `is_active` | `active = ?` |
//! | `is_deleted` | `deleted = ?` (defaults to `false`) |
//! | `last_one_week` / `last_one_month` / `last_one_quarter` | `created` in `[value - window, value]` |
//! | `created_after` / `updated_after` | `>=` |
//! | `created_before` / `updated_before` | `<=` |
//! | `search` | substring match on the entity's name column |
//!
//! `search` runs on SQLite `LIKE`, which folds case for ASCII letters only:
//! `kil` finds `Kilimani`, but `Á` does not match `á`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::schema::{Column, SqlValue};

/// Format marker selecting the lenient ISO-8601 parser in [`parse_datetime`].
pub const ISO_8601: &str = "iso-8601";

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})[T ](?P<hour>\d{1,2}):(?P<minute>\d{1,2})(?::(?P<second>\d{1,2})(?:\.(?P<micro>\d{1,6})\d{0,6})?)?(?P<tz>Z|[+-]\d{2}(?::?\d{2})?)?$",
    )
    .expect("datetime pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{param}: '{value}' is not a valid boolean")]
    InvalidBoolean { param: String, value: String },

    #[error("'{value}' is not a valid date/time")]
    InvalidDateTime { value: String },

    #[error("{param}: '{value}' is not a valid positive integer")]
    InvalidNumber { param: String, value: String },
}

/// Parses `value` with `format`.
///
/// With [`ISO_8601`] the lenient ISO grammar is used: one- or two-digit
/// month, day and hour are accepted, seconds and fractions are optional and
/// a missing offset means UTC. Any other format is handed to chrono's
/// strftime parser, falling back to a bare date at midnight.
pub fn parse_datetime(value: &str, format: &str) -> Result<DateTime<Utc>, FilterError> {
    let invalid = || FilterError::InvalidDateTime {
        value: value.to_string(),
    };

    if format != ISO_8601 {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
        return NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(invalid);
    }

    let caps = DATETIME_RE.captures(value.trim()).ok_or_else(invalid)?;
    let num = |name: &str| -> u32 {
        caps.name(name)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let micro = caps
        .name("micro")
        .map(|m| format!("{:0<6}", m.as_str()))
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    let year: i32 = caps["year"].parse().map_err(|_| invalid())?;
    let naive = NaiveDate::from_ymd_opt(year, num("month"), num("day"))
        .and_then(|d| d.and_hms_micro_opt(num("hour"), num("minute"), num("second"), micro))
        .ok_or_else(invalid)?;

    let offset_secs = match caps.name("tz").map(|m| m.as_str()) {
        None | Some("Z") => 0,
        Some(tz) => {
            let sign = if tz.starts_with('-') { -1 } else { 1 };
            let digits: String = tz[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
            let minutes: i32 = if digits.len() >= 4 {
                digits[2..4].parse().map_err(|_| invalid())?
            } else {
                0
            };
            sign * (hours * 3600 + minutes * 60)
        }
    };

    FixedOffset::east_opt(offset_secs)
        .and_then(|offset| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

pub fn parse_bool(param: &str, value: &str) -> Result<bool, FilterError> {
    match value {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        _ => Err(FilterError::InvalidBoolean {
            param: param.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_positive(param: &str, value: &str) -> Result<u32, FilterError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FilterError::InvalidNumber {
            param: param.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gte,
    Lte,
    Like,
}

impl Comparison {
    pub fn sql(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
            Comparison::Like => "LIKE",
        }
    }
}

/// One `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: &'static str,
    pub op: Comparison,
    pub value: SqlValue,
}

impl Condition {
    pub fn new(column: &'static str, op: Comparison, value: SqlValue) -> Self {
        Self { column, op, value }
    }
}

/// A named trailing window over a timestamp column
/// (`last_one_week`, `last_one_month`, `last_one_quarter`).
#[derive(Debug, Clone)]
pub struct TimeRangeFilter {
    pub column: &'static str,
    pub alias: String,
}

impl TimeRangeFilter {
    pub fn new(column: &'static str, alias: impl Into<String>) -> Self {
        Self {
            column,
            alias: alias.into(),
        }
    }

    pub fn window(&self) -> Option<Duration> {
        match self.alias.as_str() {
            "last_one_week" => Some(Duration::days(7)),
            "last_one_month" => Some(Duration::days(30)),
            "last_one_quarter" => Some(Duration::days(90)),
            _ => None,
        }
    }

    /// Appends the window ending at `value`; an unknown alias adds nothing.
    pub fn apply(&self, conditions: &mut Vec<Condition>, value: DateTime<Utc>) {
        if let Some(window) = self.window() {
            conditions.push(Condition::new(
                self.column,
                Comparison::Gte,
                (value - window).to_sql(),
            ));
            conditions.push(Condition::new(self.column, Comparison::Lte, value.to_sql()));
        }
    }
}

/// Raw list query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub is_active: Option<String>,
    pub is_deleted: Option<String>,
    pub last_one_week: Option<String>,
    pub last_one_month: Option<String>,
    pub last_one_quarter: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub updated_after: Option<String>,
    pub updated_before: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Typed list filter handed to the repository.
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub conditions: Vec<Condition>,
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ListFilter {
    /// Default view: not deleted, first page.
    pub fn new(page_size: u32) -> Self {
        Self {
            conditions: vec![Condition::new("deleted", Comparison::Eq, false.to_sql())],
            search: None,
            page: 1,
            page_size,
        }
    }

    pub fn from_params(params: &ListParams, api: &ApiConfig) -> Result<Self, FilterError> {
        let mut filter = Self::new(api.page_size);

        if let Some(ref v) = params.is_deleted {
            let deleted = parse_bool("is_deleted", v)?;
            filter.conditions[0] = Condition::new("deleted", Comparison::Eq, deleted.to_sql());
        }

        if let Some(ref v) = params.is_active {
            let active = parse_bool("is_active", v)?;
            filter
                .conditions
                .push(Condition::new("active", Comparison::Eq, active.to_sql()));
        }

        let windows = [
            ("last_one_week", &params.last_one_week),
            ("last_one_month", &params.last_one_month),
            ("last_one_quarter", &params.last_one_quarter),
        ];
        for (alias, value) in windows {
            if let Some(v) = value {
                let at = parse_datetime(v, ISO_8601)?;
                TimeRangeFilter::new("created", alias).apply(&mut filter.conditions, at);
            }
        }

        let bounds = [
            ("created", Comparison::Gte, &params.created_after),
            ("created", Comparison::Lte, &params.created_before),
            ("updated", Comparison::Gte, &params.updated_after),
            ("updated", Comparison::Lte, &params.updated_before),
        ];
        for (column, op, value) in bounds {
            if let Some(v) = value {
                let at = parse_datetime(v, ISO_8601)?;
                filter.conditions.push(Condition::new(column, op, at.to_sql()));
            }
        }

        filter.search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(ref v) = params.page {
            filter.page = parse_positive("page", v)?;
        }
        if let Some(ref v) = params.page_size {
            filter.page_size = parse_positive("page_size", v)?.min(api.max_page_size);
        }

        Ok(filter)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_iso_date() {
        let parsed = parse_datetime("2015-04-14T06:46:32.709388Z", ISO_8601).unwrap();
        let expected = DateTime::parse_from_rfc3339("2015-04-14T06:46:32.709388Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_unpadded_iso_date() {
        let parsed = parse_datetime("2015-4-6T12:22:55.988064Z", ISO_8601).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2015-04-06T12:22:55.988064+00:00");
    }

    #[test]
    fn test_parse_iso_with_offset() {
        let parsed = parse_datetime("2015-04-14T09:46:32+03:00", ISO_8601).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2015-04-14T06:46:32+00:00");
    }

    #[test]
    fn test_parse_invalid_iso_date() {
        let err = parse_datetime("random stuff", ISO_8601).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDateTime { .. }));
    }

    #[test]
    fn test_parse_strftime_fallback() {
        let parsed = parse_datetime("2006-10-25 14:30:59", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2006-10-25T14:30:59+00:00");
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("is_active", "True").unwrap());
        assert!(parse_bool("is_active", "1").unwrap());
        assert!(!parse_bool("is_active", "False").unwrap());
        assert!(parse_bool("is_active", "maybe").is_err());
    }

    #[test]
    fn test_time_range_windows() {
        let week = TimeRangeFilter::new("created", "last_one_week");
        let month = TimeRangeFilter::new("created", "last_one_month");
        let quarter = TimeRangeFilter::new("created", "last_one_quarter");
        assert_eq!(week.window(), Some(Duration::days(7)));
        assert_eq!(month.window(), Some(Duration::days(30)));
        assert_eq!(quarter.window(), Some(Duration::days(90)));
    }

    #[test]
    fn test_unsupported_alias_leaves_conditions_unchanged() {
        let filter = TimeRangeFilter::new("created", "not_supported");
        let mut conditions = Vec::new();
        let at = parse_datetime("2015-04-26T13:17:18.975021Z", ISO_8601).unwrap();
        filter.apply(&mut conditions, at);
        assert!(conditions.is_empty());
    }

    #[test]
    fn test_from_params_defaults_hide_deleted() {
        let filter = ListFilter::from_params(&ListParams::default(), &ApiConfig::default()).unwrap();
        assert_eq!(filter.conditions.len(), 1);
        assert_eq!(filter.conditions[0].column, "deleted");
        assert_eq!(filter.conditions[0].value, SqlValue::Integer(0));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 30);
    }

    #[test]
    fn test_from_params_collects_conditions() {
        let params = ListParams {
            is_active: Some("False".to_string()),
            is_deleted: Some("true".to_string()),
            last_one_week: Some("2015-04-14T06:46:32Z".to_string()),
            page: Some("3".to_string()),
            page_size: Some("10000".to_string()),
            ..Default::default()
        };
        let filter = ListFilter::from_params(&params, &ApiConfig::default()).unwrap();
        assert_eq!(filter.conditions[0].value, SqlValue::Integer(1));
        assert!(filter
            .conditions
            .iter()
            .any(|c| c.column == "active" && c.value == SqlValue::Integer(0)));
        assert_eq!(
            filter
                .conditions
                .iter()
                .filter(|c| c.column == "created")
                .count(),
            2
        );
        assert_eq!(filter.page_size, 500);
        assert_eq!(filter.offset(), 1000);
    }

    #[test]
    fn test_from_params_rejects_bad_values() {
        let params = ListParams {
            last_one_month: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(ListFilter::from_params(&params, &ApiConfig::default()).is_err());

        let params = ListParams {
            page: Some("0".to_string()),
            ..Default::default()
        };
        assert!(ListFilter::from_params(&params, &ApiConfig::default()).is_err());
    }
}
