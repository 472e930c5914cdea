//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Shown when a post has no (or an unreadable) publication date
pub const PUBLICATION_DATE_PLACEHOLDER: &str = "Publication Date";

/// Used when the configured format does not convert to a valid pattern
pub const DEFAULT_DATE_FORMAT: &str = "DD MMM YYYY";

/// Parse a timestamp as the content API emits it (`2021-03-25T19:25:28+0000`)
pub fn parse_api_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().fixed_offset())
        })
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Z: TimeZone>(date: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Locale- and timezone-aware date formatting
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// `format` is Moment.js style, `language` a locale like `pt_BR`,
    /// `timezone` an IANA name (empty for UTC)
    pub fn new(format: &str, language: &str, timezone: &str) -> Self {
        let locale = Locale::try_from(language.replace('-', "_").as_str()).unwrap_or_else(|_| {
            tracing::warn!("Unknown locale {:?}, falling back to POSIX", language);
            Locale::POSIX
        });

        let timezone = if timezone.trim().is_empty() {
            Tz::UTC
        } else {
            timezone.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!("Unknown timezone {:?}, falling back to UTC", timezone);
                Tz::UTC
            })
        };

        let mut pattern = moment_to_chrono_format(format);
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            tracing::warn!(
                "Invalid date format {:?}, falling back to {:?}",
                format,
                DEFAULT_DATE_FORMAT
            );
            pattern = moment_to_chrono_format(DEFAULT_DATE_FORMAT);
        }

        Self {
            pattern,
            locale,
            timezone,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.date_format, &config.language, &config.timezone)
    }

    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.pattern, self.locale)
            .to_string()
    }

    /// Format a raw API timestamp, or the placeholder when there is none
    pub fn publication_date(&self, raw: Option<&str>) -> String {
        raw.and_then(parse_api_date)
            .map(|date| self.format(&date))
            .unwrap_or_else(|| PUBLICATION_DATE_PLACEHOLDER.to_string())
    }

    /// Machine-readable form for `<time datetime>`
    pub fn datetime_attr(&self, raw: Option<&str>) -> Option<String> {
        raw.and_then(parse_api_date)
            .map(|date| date_xml(&date.with_timezone(&self.timezone)))
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each category
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DDDD", "%j"),
        ("DD", "%d"),
        // Hour 24h
        ("HH", "%H"),
        // Hour 12h
        ("hh", "%I"),
        // Minute (after MM)
        ("mm", "%M"),
        // Second
        ("ss", "%S"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
        // Timezone
        ("ZZ", "%z"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
