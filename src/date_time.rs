//! Date time formats shared by the auth token, the ledger records and the HTML views.

use time::{
    Date, OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::Error;

/// Date time format for serialized timestamps, e.g. "2021-01-01 00:00:00.0 +00:00:00".
const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
         sign:mandatory]:[offset_minute]:[offset_second]"
);

/// Date format for date inputs, e.g. "2021-01-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Date time format shown to users, e.g. "2021-01-31 13:45".
const DISPLAY_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub mod datetime_format {
    //! Serializes an [OffsetDateTime] with a fixed width format.
    //!
    //! The default serializer writes midnight as "0:00:00.0" which its own
    //! deserializer then rejects, since it expects two digit hours.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    use super::DATE_TIME_FORMAT;

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Parse a date from a form field in the format YYYY-MM-DD.
///
/// # Errors
/// Returns [Error::InvalidDate] if `raw_date` is not a valid date in that format.
pub fn parse_date(raw_date: &str) -> Result<Date, Error> {
    Date::parse(raw_date.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(raw_date.to_owned()))
}

/// Format `date_time` in the local timezone given by `local_offset`.
pub fn format_local_date_time(date_time: OffsetDateTime, local_offset: UtcOffset) -> String {
    let local = date_time.to_offset(local_offset);

    local.format(DISPLAY_FORMAT).unwrap_or_else(|error| {
        tracing::error!("could not format date time {local:?}: {error}");
        local.to_string()
    })
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::{OffsetDateTime, UtcOffset, macros::date, macros::datetime};

    use crate::Error;

    use super::{format_local_date_time, parse_date};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Stamped {
        #[serde(with = "super::datetime_format")]
        at: OffsetDateTime,
    }

    #[test]
    fn round_trips_midnight() {
        let want = Stamped {
            at: datetime!(2025-12-21 00:00:00).assume_offset(UtcOffset::UTC),
        };

        let json = serde_json::to_string(&want).unwrap();
        let got: Stamped = serde_json::from_str(&json).unwrap();

        assert_eq!(json, r#"{"at":"2025-12-21 00:00:00.0 +00:00:00"}"#);
        assert_eq!(want, got);
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("1990-04-23"), Ok(date!(1990 - 04 - 23)));
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(
            parse_date("23/04/1990"),
            Err(Error::InvalidDate("23/04/1990".to_owned()))
        );
    }

    #[test]
    fn format_local_date_time_applies_offset() {
        let date_time = datetime!(2025-01-01 23:30:00).assume_offset(UtcOffset::UTC);
        let offset = UtcOffset::from_hms(13, 0, 0).unwrap();

        assert_eq!(format_local_date_time(date_time, offset), "2025-01-02 12:30");
    }
}
