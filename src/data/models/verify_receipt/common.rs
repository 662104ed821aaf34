use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_with::DeserializeAs;

/// Receipt timestamps, formatted as `yyyy-MM-dd HH:mm:ss <zone>`. The service
/// uses `Etc/GMT` as the zone; numeric offsets are accepted as well.
pub struct ReceiptDate;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl ReceiptDate {
    pub(crate) fn parse(value: &str) -> Result<DateTime<Utc>, String> {
        let value = value.trim();
        let (date_time, zone) = value
            .rsplit_once(' ')
            .ok_or_else(|| format!("missing zone in receipt date '{value}'"))?;
        match zone {
            "Etc/GMT" | "GMT" | "UTC" | "Etc/UTC" | "Z" => {
                NaiveDateTime::parse_from_str(date_time, DATE_TIME_FORMAT)
                    .map(|naive| naive.and_utc())
                    .map_err(|e| format!("invalid receipt date '{value}': {e}"))
            }
            _ => DateTime::<FixedOffset>::parse_from_str(
                value,
                &format!("{DATE_TIME_FORMAT} %#z"),
            )
            .map(|date_time| date_time.with_timezone(&Utc))
            .map_err(|e| format!("invalid receipt date '{value}': {e}")),
        }
    }
}

impl<'de> DeserializeAs<'de, DateTime<Utc>> for ReceiptDate {
    fn deserialize_as<D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ReceiptDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EnvironmentModel {
    Production,
    Sandbox,
}
