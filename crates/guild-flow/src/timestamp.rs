//! Timestamp extraction from free-text log lines.
//!
//! Formats are tried in priority order and the first one that both matches and
//! parses wins:
//!
//! 1. ISO-8601 with a `T` separator, optional fraction and offset
//!    (`2026-03-01T12:00:00Z`, `2026-03-01T12:00:00.250+02:00`)
//! 2. Space-separated date time, optional `.` or `,` fraction
//!    (`2026-03-01 12:00:00,123`)
//! 3. Common Log Format (`[01/Mar/2026:12:00:00 +0000]`)
//! 4. Syslog at line start (`Mar  1 12:00:00`), year taken from the reference clock
//!
//! Timestamps without an offset are read as UTC.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    IsoT,
    IsoSpace,
    CommonLog,
    Syslog,
}

const PATTERNS: [(Format, &str); 4] = [
    (
        Format::IsoT,
        r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
    ),
    (
        Format::IsoSpace,
        r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:[.,]\d+)?",
    ),
    (
        Format::CommonLog,
        r"\[(\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4})\]",
    ),
    (
        Format::Syslog,
        r"^([A-Z][a-z]{2}\s+\d{1,2} \d{2}:\d{2}:\d{2})\b",
    ),
];

/// Prioritized timestamp recognizer.
#[derive(Debug, Clone)]
pub struct TimestampExtractor {
    formats: Vec<(Format, Regex)>,
}

impl TimestampExtractor {
    /// Compile the built-in format list.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidPattern` if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, FlowError> {
        let formats = PATTERNS
            .iter()
            .map(|(format, pattern)| {
                Regex::new(pattern)
                    .map(|re| (*format, re))
                    .map_err(|source| FlowError::InvalidPattern {
                        owner: format!("timestamp format {format:?}"),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { formats })
    }

    /// Find the first recognizable timestamp in `line`.
    ///
    /// `reference` supplies the year for formats that omit it.
    #[must_use]
    pub fn extract(&self, line: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.formats.iter().find_map(|(format, re)| {
            let caps = re.captures(line)?;
            let text = caps.get(1).or_else(|| caps.get(0))?.as_str();
            parse(*format, text, reference)
        })
    }
}

fn parse(format: Format, text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match format {
        Format::IsoT => parse_iso_t(text),
        Format::IsoSpace => {
            let normalized = text.replace(',', ".");
            NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        }
        Format::CommonLog => DateTime::parse_from_str(text, "%d/%b/%Y:%H:%M:%S %z")
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Format::Syslog => parse_syslog(text, reference),
    }
}

fn parse_iso_t(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_syslog(text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let year = reference.year();
    let parsed = NaiveDateTime::parse_from_str(
        &format!("{year} {collapsed}"),
        "%Y %b %d %H:%M:%S",
    )
    .ok()?
    .and_utc();

    // A December line read in early January belongs to the previous year.
    if parsed > reference + TimeDelta::days(1) {
        NaiveDateTime::parse_from_str(
            &format!("{} {collapsed}", year - 1),
            "%Y %b %d %H:%M:%S",
        )
        .ok()
        .map(|naive| naive.and_utc())
    } else {
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[rstest]
    #[case("2026-03-01T12:00:00Z task received", utc(2026, 3, 1, 12, 0, 0))]
    #[case("at 2026-03-01T14:00:00+02:00 planning", utc(2026, 3, 1, 12, 0, 0))]
    #[case("2026-03-01T12:00:00+0000 x", utc(2026, 3, 1, 12, 0, 0))]
    #[case("2026-03-01T12:00:00 naive", utc(2026, 3, 1, 12, 0, 0))]
    #[case("2026-03-01 12:00:00,123 INFO review", utc(2026, 3, 1, 12, 0, 0))]
    #[case("INFO 2026-03-01 12:00:00 merged", utc(2026, 3, 1, 12, 0, 0))]
    #[case("127.0.0.1 - - [01/Mar/2026:13:00:00 +0100] GET", utc(2026, 3, 1, 12, 0, 0))]
    #[case("Mar  1 12:00:00 host agent[12]: planning", utc(2026, 3, 1, 12, 0, 0))]
    fn recognizes_known_formats(#[case] line: &str, #[case] expected: DateTime<Utc>) {
        let extractor = TimestampExtractor::new().unwrap();
        let got = extractor.extract(line, reference()).expect("timestamp");
        assert_eq!(got.timestamp(), expected.timestamp());
    }

    #[test]
    fn fraction_is_preserved() {
        let extractor = TimestampExtractor::new().unwrap();
        let got = extractor
            .extract("2026-03-01T12:00:00.250Z", reference())
            .unwrap();
        assert_eq!(got.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn iso_t_takes_priority_over_later_formats() {
        let extractor = TimestampExtractor::new().unwrap();
        let line = "Mar  1 09:00:00 host: event at 2026-03-02T08:00:00Z";
        let got = extractor.extract(line, reference()).unwrap();
        assert_eq!(got, utc(2026, 3, 2, 8, 0, 0));
    }

    #[test]
    fn syslog_rolls_back_a_year_across_new_year() {
        let extractor = TimestampExtractor::new().unwrap();
        let january = utc(2026, 1, 2, 0, 0, 0);
        let got = extractor
            .extract("Dec 31 23:00:00 host: review started", january)
            .unwrap();
        assert_eq!(got, utc(2025, 12, 31, 23, 0, 0));
    }

    #[rstest]
    #[case("no timestamp here")]
    #[case("2026-13-45T99:00:00Z impossible date")]
    #[case("")]
    fn unparseable_lines_yield_none(#[case] line: &str) {
        let extractor = TimestampExtractor::new().unwrap();
        assert!(extractor.extract(line, reference()).is_none());
    }
}
