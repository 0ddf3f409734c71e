//! Date-time members as ISO-8601 text
//!
//! Use with serde's `with` attribute:
//!
//! ```
//! use serde_derive::{Deserialize, Serialize};
//! use time::{OffsetDateTime, PrimitiveDateTime};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Entry {
//!     #[serde(with = "jsongeek::datetime")]
//!     created: OffsetDateTime,
//!     #[serde(with = "jsongeek::datetime::local")]
//!     wall_clock: PrimitiveDateTime,
//!     #[serde(with = "jsongeek::datetime::option", default)]
//!     closed: Option<OffsetDateTime>,
//! }
//! ```
//!
//! Offset date-times are written as RFC 3339 (`2024-03-01T12:30:45Z`), local
//! ones as `YYYY-MM-DDTHH:MM:SS` with a fraction only when there is one.

use core::fmt;

use serde::{de, ser, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Writes an [`OffsetDateTime`] as RFC 3339 text.
pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = value.format(&Rfc3339).map_err(ser::Error::custom)?;
    serializer.serialize_str(&text)
}

/// Reads an [`OffsetDateTime`] from RFC 3339 text.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_str(OffsetVisitor)
}

struct OffsetVisitor;

impl<'de> de::Visitor<'de> for OffsetVisitor {
    type Value = OffsetDateTime;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an RFC 3339 date-time")
    }

    fn visit_str<E>(self, v: &str) -> Result<OffsetDateTime, E>
    where
        E: de::Error,
    {
        OffsetDateTime::parse(v, &Rfc3339).map_err(E::custom)
    }
}

/// `PrimitiveDateTime` members, without an offset.
pub mod local {
    use core::fmt;

    use serde::{de, ser, Deserializer, Serializer};
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;
    use time::PrimitiveDateTime;

    const WHOLE_SECONDS: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    const WITH_FRACTION: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

    /// Writes a [`PrimitiveDateTime`] as `YYYY-MM-DDTHH:MM:SS[.fraction]`.
    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let format = if value.nanosecond() == 0 {
            WHOLE_SECONDS
        } else {
            WITH_FRACTION
        };
        let text = value.format(format).map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    /// Reads a [`PrimitiveDateTime`], with or without a fraction of a second.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(LocalVisitor)
    }

    struct LocalVisitor;

    impl<'de> de::Visitor<'de> for LocalVisitor {
        type Value = PrimitiveDateTime;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a local ISO-8601 date-time")
        }

        fn visit_str<E>(self, v: &str) -> Result<PrimitiveDateTime, E>
        where
            E: de::Error,
        {
            PrimitiveDateTime::parse(v, WITH_FRACTION)
                .or_else(|_| PrimitiveDateTime::parse(v, WHOLE_SECONDS))
                .map_err(E::custom)
        }
    }
}

/// `Option<OffsetDateTime>` members; `None` is `null`.
pub mod option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::OffsetDateTime;

    struct Text<'a>(&'a OffsetDateTime);

    impl Serialize for Text<'_> {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            super::serialize(self.0, serializer)
        }
    }

    struct Parsed(OffsetDateTime);

    impl<'de> Deserialize<'de> for Parsed {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            super::deserialize(deserializer).map(Parsed)
        }
    }

    /// Writes `Some` as RFC 3339 text and `None` as `null`.
    pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_some(&Text(value)),
            None => serializer.serialize_none(),
        }
    }

    /// Reads `null` as `None` and RFC 3339 text as `Some`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Parsed>::deserialize(deserializer)?.map(|parsed| parsed.0))
    }
}

#[cfg(test)]
mod tests {
    use serde_derive::{Deserialize, Serialize};
    use time::macros::datetime;
    use time::{OffsetDateTime, PrimitiveDateTime};

    use crate::error::{Error, ErrorCategory};

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Entry {
        #[serde(with = "crate::datetime")]
        created: OffsetDateTime,
        #[serde(with = "crate::datetime::local")]
        wall_clock: PrimitiveDateTime,
        #[serde(with = "crate::datetime::option", default)]
        closed: Option<OffsetDateTime>,
    }

    #[test]
    fn whole_seconds() {
        let entry = Entry {
            created: datetime!(2024-03-01 12:30:45 UTC),
            wall_clock: datetime!(2024-03-01 07:30:45),
            closed: Some(datetime!(2024-03-02 00:00:00 -5)),
        };

        let text = crate::to_string(&entry).unwrap();
        assert_eq!(
            text,
            r#"{"created":"2024-03-01T12:30:45Z","wall_clock":"2024-03-01T07:30:45","closed":"2024-03-02T00:00:00-05:00"}"#
        );
        assert_eq!(crate::from_str::<Entry>(&text), Ok(entry));
    }

    #[test]
    fn fractions_survive() {
        let entry = Entry {
            created: datetime!(2024-03-01 12:30:45.123456789 +1),
            wall_clock: datetime!(2024-03-01 07:30:45.25),
            closed: None,
        };

        let text = crate::to_string(&entry).unwrap();
        assert!(text.contains(r#""wall_clock":"2024-03-01T07:30:45.25""#));
        assert!(text.ends_with(r#""closed":null}"#));
        assert_eq!(crate::from_str::<Entry>(&text), Ok(entry));
    }

    #[test]
    fn absent_optional_member() {
        let entry: Entry = crate::from_str(
            r#"{"created":"2024-03-01T12:30:45+02:00","wall_clock":"2024-03-01T07:30:45"}"#,
        )
        .unwrap();
        assert_eq!(entry.closed, None);
        assert_eq!(entry.created, datetime!(2024-03-01 10:30:45 UTC));
    }

    #[test]
    fn malformed_text_is_a_binding_error() {
        let err = crate::from_str::<Entry>(
            r#"{"created":"yesterday","wall_clock":"2024-03-01T07:30:45"}"#,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::TypeBinding);

        assert_eq!(
            crate::from_str::<Entry>(r#"{"created":5,"wall_clock":"2024-03-01T07:30:45"}"#),
            Err(Error::InvalidType)
        );
    }
}
