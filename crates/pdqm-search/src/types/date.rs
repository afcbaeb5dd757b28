//! Date search parameter implementation.
//!
//! A literal is widened to the calendar interval it denotes:
//! - Year: 1980 -> [1980-01-01, 1981-01-01)
//! - Month: 1980-05 -> [1980-05-01, 1980-06-01)
//! - Day: 1980-05-17 -> [1980-05-17, 1980-05-18)
//!
//! The prefix then narrows it:
//! - eq: the interval itself (default)
//! - ge: from the interval start, unbounded above
//! - gt: from the interval end, unbounded above
//! - le: unbounded below, up to the interval end
//! - lt: unbounded below, up to the interval start
//! - ne: everything outside the interval (two ranges)

use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use time::{Date, Month};

use crate::error::SearchError;
use crate::parameters::SearchPrefix;
use crate::parser::ValueGroup;
use crate::predicate::Condition;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

static DATE_LITERAL: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("Invalid date literal regex")
});

/// Half-open day interval; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBound {
    /// Inclusive lower bound
    #[serde(with = "iso_date::option")]
    pub from: Option<Date>,
    /// Exclusive upper bound
    #[serde(with = "iso_date::option")]
    pub to: Option<Date>,
}

impl DateBound {
    pub fn between(from: Date, to: Date) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn since(from: Date) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn until(to: Date) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date < to)
    }
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.from {
            Some(from) => write!(f, "[{}", format_date(from))?,
            None => f.write_str("(-inf")?,
        }
        match self.to {
            Some(to) => write!(f, ", {})", format_date(to)),
            None => f.write_str(", +inf)"),
        }
    }
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parse a possibly-partial date literal into the interval it denotes.
pub fn parse_date_range(literal: &str) -> Result<(Date, Date), String> {
    if literal.contains('T') {
        return Err(format!("time components are not supported: '{literal}'"));
    }
    let caps = DATE_LITERAL
        .captures(literal)
        .ok_or_else(|| format!("unrecognized date '{literal}'"))?;

    let year: i32 = caps[1]
        .parse()
        .map_err(|_| format!("invalid year in '{literal}'"))?;
    let month = caps
        .get(2)
        .map(|m| m.as_str().parse::<u8>())
        .transpose()
        .map_err(|_| format!("invalid month in '{literal}'"))?;
    let day = caps
        .get(3)
        .map(|d| d.as_str().parse::<u8>())
        .transpose()
        .map_err(|_| format!("invalid day in '{literal}'"))?;

    let invalid = |e: time::error::ComponentRange| format!("invalid date '{literal}': {e}");

    match (month, day) {
        (None, _) => {
            let start = Date::from_calendar_date(year, Month::January, 1).map_err(invalid)?;
            let end = Date::from_calendar_date(year + 1, Month::January, 1).map_err(invalid)?;
            Ok((start, end))
        }
        (Some(month), None) => {
            let month = Month::try_from(month).map_err(invalid)?;
            let start = Date::from_calendar_date(year, month, 1).map_err(invalid)?;
            let end = if month == Month::December {
                Date::from_calendar_date(year + 1, Month::January, 1)
            } else {
                Date::from_calendar_date(year, month.next(), 1)
            }
            .map_err(invalid)?;
            Ok((start, end))
        }
        (Some(month), Some(day)) => {
            let month = Month::try_from(month).map_err(invalid)?;
            let start = Date::from_calendar_date(year, month, day).map_err(invalid)?;
            let end = start
                .next_day()
                .ok_or_else(|| format!("date '{literal}' is out of range"))?;
            Ok((start, end))
        }
    }
}

/// Resolve one prefixed value into the ranges it matches (OR'd together).
pub fn resolve(value: &str) -> Result<Vec<DateBound>, String> {
    let (prefix, literal) = SearchPrefix::split(value);
    if matches!(prefix, SearchPrefix::Sa | SearchPrefix::Eb | SearchPrefix::Ap) {
        return Err(format!("prefix '{prefix}' is not supported"));
    }
    let (from, to) = parse_date_range(literal)?;

    let bounds = match prefix {
        SearchPrefix::Ne => vec![DateBound::until(from), DateBound::since(to)],
        SearchPrefix::Ge => vec![DateBound::since(from)],
        SearchPrefix::Gt => vec![DateBound::since(to)],
        SearchPrefix::Le => vec![DateBound::until(to)],
        SearchPrefix::Lt => vec![DateBound::until(from)],
        _ => vec![DateBound::between(from, to)],
    };
    Ok(bounds)
}

/// Build range conditions for a date parameter occurrence.
///
/// A malformed literal rejects the whole search.
pub fn build_date_conditions(group: &ValueGroup<'_>) -> Result<Vec<Condition>, SearchError> {
    let column = group.param.primary_column();
    let mut conditions = Vec::new();
    for value in &group.values {
        let bounds =
            resolve(value).map_err(|message| SearchError::invalid_value(&group.param.code, message))?;
        conditions.extend(bounds.into_iter().map(|b| Condition::range(column, b)));
    }
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_partial_dates_widen() {
        assert_eq!(
            parse_date_range("1980").unwrap(),
            (date!(1980 - 01 - 01), date!(1981 - 01 - 01))
        );
        assert_eq!(
            parse_date_range("1980-05").unwrap(),
            (date!(1980 - 05 - 01), date!(1980 - 06 - 01))
        );
        assert_eq!(
            parse_date_range("1980-12").unwrap(),
            (date!(1980 - 12 - 01), date!(1981 - 01 - 01))
        );
        assert_eq!(
            parse_date_range("1980-02-29").unwrap(),
            (date!(1980 - 02 - 29), date!(1980 - 03 - 01))
        );
    }

    #[test]
    fn test_malformed_dates_rejected() {
        for bad in ["zz1980", "80", "1980-5", "1980-13", "1981-02-29", "1980-01-15T10:00", ""] {
            assert!(parse_date_range(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(
            resolve("ge1980").unwrap(),
            vec![DateBound::since(date!(1980 - 01 - 01))]
        );
        assert_eq!(
            resolve("le1980").unwrap(),
            vec![DateBound::until(date!(1981 - 01 - 01))]
        );
        assert_eq!(
            resolve("gt1980-05").unwrap(),
            vec![DateBound::since(date!(1980 - 06 - 01))]
        );
        assert_eq!(
            resolve("lt1980-05").unwrap(),
            vec![DateBound::until(date!(1980 - 05 - 01))]
        );
        assert_eq!(
            resolve("eq1980-05-17").unwrap(),
            resolve("1980-05-17").unwrap()
        );
        assert_eq!(
            resolve("ne1980").unwrap(),
            vec![
                DateBound::until(date!(1980 - 01 - 01)),
                DateBound::since(date!(1981 - 01 - 01)),
            ]
        );
    }

    #[test]
    fn test_unsupported_prefixes_rejected() {
        assert!(resolve("sa1980").is_err());
        assert!(resolve("eb1980").is_err());
        assert!(resolve("ap1980").is_err());
    }

    #[test]
    fn test_upper_year_overflow_rejected() {
        assert!(resolve("9999").is_err());
    }

    #[test]
    fn test_bound_contains() {
        let may = DateBound::between(date!(1980 - 05 - 01), date!(1980 - 06 - 01));
        assert!(may.contains(date!(1980 - 05 - 01)));
        assert!(may.contains(date!(1980 - 05 - 31)));
        assert!(!may.contains(date!(1980 - 06 - 01)));
        assert!(!may.contains(date!(1980 - 04 - 30)));
        assert!(DateBound::until(date!(1981 - 01 - 01)).contains(date!(1900 - 01 - 01)));
        assert_eq!(may.to_string(), "[1980-05-01, 1980-06-01)");
    }
}
