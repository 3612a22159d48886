//! Timestamp formats used in call-event lines and deadline arguments.

use std::fmt;
use std::time::SystemTime;

use time::format_description::{self, OwnedFormatItem};
use time::{OffsetDateTime, UtcOffset};

use crate::error::OptionsError;

/// Format description applied when a sink has no explicit timestamp format.
///
/// Renders as `2024-03-05 07:08:09.12345+0100`: five fractional digits and a
/// numeric UTC offset.
pub const DEFAULT_TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:5][offset_hour sign:mandatory][offset_minute]";

/// A parsed `time` format description together with its source text.
#[derive(Clone, Debug)]
pub struct TimeFormat {
    source: String,
    items: OwnedFormatItem,
}

impl TimeFormat {
    /// Parses a format description such as `[hour]:[minute]:[second]`.
    pub fn parse(source: &str) -> Result<Self, OptionsError> {
        let items = format_description::parse_owned::<2>(source).map_err(|error| {
            OptionsError::TimeFormat {
                format: source.to_owned(),
                source: error,
            }
        })?;

        Ok(Self {
            source: source.to_owned(),
            items,
        })
    }

    /// Returns the format description this value was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders `instant` with this format.
    ///
    /// A description that asks for components the instant cannot supply
    /// renders as `?` rather than failing; trace output never aborts a call.
    pub fn format(&self, instant: OffsetDateTime) -> String {
        instant
            .format(&self.items)
            .unwrap_or_else(|_| String::from("?"))
    }

    /// Renders the current wall-clock time in the local offset.
    pub fn now(&self) -> String {
        self.format(local_now())
    }

    /// Renders a [`SystemTime`] (for example a deadline) in the local offset.
    pub fn system_time(&self, instant: SystemTime) -> String {
        self.format(OffsetDateTime::from(instant).to_offset(local_offset()))
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        let items = format_description::parse_owned::<2>(DEFAULT_TIME_FORMAT)
            .expect("default timestamp format description is valid");
        Self {
            source: DEFAULT_TIME_FORMAT.to_owned(),
            items,
        }
    }
}

impl PartialEq for TimeFormat {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for TimeFormat {}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimeFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::parse(&source).map_err(serde::de::Error::custom)
    }
}

// The local offset is unavailable on some platforms once several threads are
// running; UTC keeps timestamps monotonic in that case.
fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    #[test]
    fn default_format_matches_documented_shape() {
        let format = TimeFormat::default();
        let rendered = format.format(datetime!(2024-03-05 07:08:09.123456789 +01:00));
        assert_eq!(rendered, "2024-03-05 07:08:09.12345+0100");
    }

    #[test]
    fn negative_offsets_keep_their_sign() {
        let format = TimeFormat::default();
        let rendered = format.format(datetime!(2006-01-02 15:04:05 -08:00));
        assert_eq!(rendered, "2006-01-02 15:04:05.00000-0800");
    }

    #[test]
    fn custom_format_is_applied() {
        let format = TimeFormat::parse("[hour]:[minute]").unwrap();
        assert_eq!(format.as_str(), "[hour]:[minute]");
        assert_eq!(format.format(datetime!(2020-01-01 23:59 UTC)), "23:59");
    }

    #[test]
    fn invalid_description_is_rejected() {
        let err = TimeFormat::parse("[hour").unwrap_err();
        match err {
            OptionsError::TimeFormat { format, .. } => assert_eq!(format, "[hour"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn system_time_renders_unix_epoch_year() {
        let format = TimeFormat::parse("[year]").unwrap();
        let instant = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400 * 365 * 10);
        let year = format.system_time(instant);
        assert!(year == "1979" || year == "1980", "unexpected year {year}");
    }

    #[test]
    fn equality_follows_source_text() {
        assert_eq!(TimeFormat::default(), TimeFormat::parse(DEFAULT_TIME_FORMAT).unwrap());
        assert_ne!(TimeFormat::default(), TimeFormat::parse("[hour]").unwrap());
    }
}
