use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::GraphError;

/// Subject match derived from a `*` wildcard pattern.
///
/// `*text*` is contains, `text*` is starts-with and a bare `text` is an
/// exact match. A leading-only wildcard (`*text`) would need `endswith` on
/// `subject`, which Graph does not serve for messages, so it is rejected
/// before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectPattern {
    Exact(String),
    StartsWith(String),
    Contains(String),
}

impl SubjectPattern {
    pub fn parse(raw: &str) -> Result<Self, GraphError> {
        let leading = raw.starts_with('*');
        let trailing = raw.ends_with('*');
        let text = raw.trim_matches('*');

        if text.is_empty() {
            return Err(GraphError::validation(
                "subject",
                "pattern must contain text besides '*'",
            ));
        }

        match (leading, trailing) {
            (true, true) => Ok(Self::Contains(text.to_string())),
            (true, false) => Err(GraphError::validation(
                "subject",
                format!("'{raw}': ends-with matching is not supported by Microsoft Graph"),
            )),
            (false, true) => Ok(Self::StartsWith(text.to_string())),
            (false, false) => Ok(Self::Exact(text.to_string())),
        }
    }

    /// Values are interpolated verbatim; no OData quoting or escaping.
    pub fn to_odata(&self) -> String {
        match self {
            Self::Exact(text) => format!("subject eq '{text}'"),
            Self::StartsWith(text) => format!("startswith(subject,'{text}')"),
            Self::Contains(text) => format!("contains(subject,'{text}')"),
        }
    }
}

impl FromStr for SubjectPattern {
    type Err = GraphError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Result size: a positive `$top`, or every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultLimit {
    Top(u32),
    All,
}

impl ResultLimit {
    pub fn top(count: u32) -> Result<Self, GraphError> {
        if count == 0 {
            return Err(GraphError::validation(
                "limit",
                "must be a positive integer or 'all'",
            ));
        }
        Ok(Self::Top(count))
    }

    fn top_param(self) -> Result<Option<u32>, GraphError> {
        match self {
            Self::Top(count) => Self::top(count).map(|_| Some(count)),
            Self::All => Ok(None),
        }
    }
}

impl Default for ResultLimit {
    fn default() -> Self {
        Self::Top(10)
    }
}

impl Display for ResultLimit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top(count) => write!(f, "{count}"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for ResultLimit {
    type Err = GraphError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let count = trimmed.parse::<u32>().map_err(|_| {
            GraphError::validation("limit", format!("'{value}' is not a positive integer or 'all'"))
        })?;
        Self::top(count)
    }
}

/// Message filter criteria. Present fields combine with `and`; blank
/// strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub subject: Option<String>,
    pub sender: Option<String>,
    /// Lower bound on `receivedDateTime` (exclusive).
    pub received_after: Option<String>,
    /// Upper bound on `receivedDateTime` (exclusive).
    pub received_before: Option<String>,
    pub has_attachments: Option<bool>,
    pub limit: Option<ResultLimit>,
}

impl FilterCriteria {
    /// `$filter` fragments in fixed order: sender, subject, lower date bound,
    /// upper date bound, attachments.
    pub fn filter_clauses(&self) -> Result<Vec<String>, GraphError> {
        let mut clauses = Vec::new();

        if let Some(sender) = present(&self.sender) {
            clauses.push(format!("sender/emailAddress/address eq '{sender}'"));
        }

        if let Some(subject) = present(&self.subject) {
            clauses.push(SubjectPattern::parse(subject)?.to_odata());
        }

        if let Some(after) = present(&self.received_after) {
            clauses.push(format!(
                "receivedDateTime gt {}",
                validate_timestamp("received_after", after)?
            ));
        }

        if let Some(before) = present(&self.received_before) {
            clauses.push(format!(
                "receivedDateTime lt {}",
                validate_timestamp("received_before", before)?
            ));
        }

        if let Some(has_attachments) = self.has_attachments {
            clauses.push(format!("hasAttachments eq {has_attachments}"));
        }

        Ok(clauses)
    }

    /// `$filter` and `$top` as unencoded name/value pairs, in that order.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>, GraphError> {
        let mut params = Vec::new();

        let clauses = self.filter_clauses()?;
        if !clauses.is_empty() {
            params.push(("$filter", clauses.join(" and ")));
        }

        if let Some(top) = self.limit.map(ResultLimit::top_param).transpose()?.flatten() {
            params.push(("$top", top.to_string()));
        }

        Ok(params)
    }

    /// Query suffix such as `$filter=...&$top=...`, or `""` when nothing is set.
    pub fn to_query_string(&self) -> Result<String, GraphError> {
        Ok(self
            .query_pairs()?
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&"))
    }
}

pub fn build_filter(criteria: &FilterCriteria) -> Result<String, GraphError> {
    criteria.to_query_string()
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn validate_timestamp<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, GraphError> {
    let value = raw.trim();
    let parses = DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();

    if parses {
        Ok(value)
    } else {
        Err(GraphError::validation(
            field,
            format!("'{raw}' is not an ISO-8601 date or date-time"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{build_filter, FilterCriteria, ResultLimit, SubjectPattern};

    fn subject(pattern: &str) -> FilterCriteria {
        FilterCriteria {
            subject: Some(pattern.to_string()),
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn subject_wildcard_grammar() {
        assert_eq!(
            build_filter(&subject("*Invoice*")).expect("contains"),
            "$filter=contains(subject,'Invoice')"
        );
        assert_eq!(
            build_filter(&subject("Invoice*")).expect("startswith"),
            "$filter=startswith(subject,'Invoice')"
        );
        assert_eq!(
            build_filter(&subject("Invoice")).expect("exact"),
            "$filter=subject eq 'Invoice'"
        );

        let error = build_filter(&subject("*Invoice")).expect_err("leading wildcard rejected");
        assert!(error.is_validation());
    }

    #[test]
    fn subject_pattern_parses_repeated_and_bare_wildcards() {
        assert_eq!(
            "**Q3 report**".parse::<SubjectPattern>().expect("parse"),
            SubjectPattern::Contains("Q3 report".to_string())
        );
        assert!("*".parse::<SubjectPattern>().is_err());
        assert!("***".parse::<SubjectPattern>().is_err());
    }

    #[test]
    fn empty_criteria_builds_empty_string() {
        assert_eq!(build_filter(&FilterCriteria::default()).expect("empty"), "");

        let blanks = FilterCriteria {
            subject: Some(String::new()),
            sender: Some("   ".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(build_filter(&blanks).expect("blank strings"), "");
    }

    #[test]
    fn single_field_yields_single_clause() {
        let cases = vec![
            FilterCriteria {
                sender: Some("alice@example.com".to_string()),
                ..FilterCriteria::default()
            },
            subject("Kickoff*"),
            FilterCriteria {
                received_after: Some("2026-01-01T00:00:00Z".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                received_before: Some("2026-02-01".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                has_attachments: Some(false),
                ..FilterCriteria::default()
            },
        ];

        for criteria in cases {
            let query = build_filter(&criteria).expect("single clause");
            assert_eq!(query.matches("$filter=").count(), 1, "{query}");
            assert!(!query.contains(" and "), "{query}");
            assert!(!query.contains("$top"), "{query}");
        }
    }

    #[test]
    fn clauses_follow_fixed_order() {
        let criteria = FilterCriteria {
            subject: Some("*Invoice*".to_string()),
            sender: Some("billing@example.com".to_string()),
            received_after: Some("2026-01-01T00:00:00Z".to_string()),
            received_before: Some("2026-01-31T23:59:59Z".to_string()),
            has_attachments: Some(true),
            limit: Some(ResultLimit::Top(25)),
        };

        assert_eq!(
            build_filter(&criteria).expect("full criteria"),
            "$filter=sender/emailAddress/address eq 'billing@example.com' and \
             contains(subject,'Invoice') and \
             receivedDateTime gt 2026-01-01T00:00:00Z and \
             receivedDateTime lt 2026-01-31T23:59:59Z and \
             hasAttachments eq true&$top=25"
        );
    }

    #[test]
    fn top_only_for_numeric_limits() {
        let top = FilterCriteria {
            limit: Some(ResultLimit::Top(10)),
            ..FilterCriteria::default()
        };
        assert_eq!(build_filter(&top).expect("top"), "$top=10");

        let all = FilterCriteria {
            sender: Some("a@example.com".to_string()),
            limit: Some(ResultLimit::All),
            ..FilterCriteria::default()
        };
        let query = build_filter(&all).expect("all");
        assert!(!query.contains("$top"));

        let zero = FilterCriteria {
            limit: Some(ResultLimit::Top(0)),
            ..FilterCriteria::default()
        };
        assert!(build_filter(&zero).expect_err("zero limit").is_validation());
    }

    #[test]
    fn result_limit_parses_all_and_positive_integers() {
        assert_eq!("all".parse::<ResultLimit>().expect("all"), ResultLimit::All);
        assert_eq!("ALL".parse::<ResultLimit>().expect("all"), ResultLimit::All);
        assert_eq!("50".parse::<ResultLimit>().expect("50"), ResultLimit::Top(50));
        assert!("0".parse::<ResultLimit>().is_err());
        assert!("-3".parse::<ResultLimit>().is_err());
        assert!("many".parse::<ResultLimit>().is_err());
        assert_eq!(ResultLimit::default(), ResultLimit::Top(10));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let criteria = FilterCriteria {
            received_after: Some("last tuesday".to_string()),
            ..FilterCriteria::default()
        };
        let error = build_filter(&criteria).expect_err("bad date");
        assert!(error.to_string().contains("received_after"));

        let naive = FilterCriteria {
            received_before: Some("2026-03-01T08:30:00".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(
            build_filter(&naive).expect("naive date-time"),
            "$filter=receivedDateTime lt 2026-03-01T08:30:00"
        );
    }

    #[test]
    fn values_are_interpolated_without_escaping() {
        let criteria = subject("O'Brien*");
        assert_eq!(
            build_filter(&criteria).expect("verbatim"),
            "$filter=startswith(subject,'O'Brien')"
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_from_values() {
        let criteria = FilterCriteria {
            sender: Some("  ops@example.com ".to_string()),
            subject: Some("  *x*  ".to_string()),
            received_after: Some(" 2026-01-01 ".to_string()),
            ..FilterCriteria::default()
        };
        assert_eq!(
            build_filter(&criteria).expect("padded values"),
            "$filter=sender/emailAddress/address eq 'ops@example.com' and \
             contains(subject,'x') and \
             receivedDateTime gt 2026-01-01"
        );
    }

    #[test]
    fn query_pairs_keep_reserved_characters_raw() {
        let criteria = FilterCriteria {
            subject: Some("R&D*".to_string()),
            received_after: Some("2026-01-01T00:00:00+02:00".to_string()),
            limit: Some(ResultLimit::Top(5)),
            ..FilterCriteria::default()
        };
        assert_eq!(
            criteria.query_pairs().expect("pairs"),
            vec![
                (
                    "$filter",
                    "startswith(subject,'R&D') and receivedDateTime gt 2026-01-01T00:00:00+02:00"
                        .to_string()
                ),
                ("$top", "5".to_string()),
            ]
        );
    }
}
