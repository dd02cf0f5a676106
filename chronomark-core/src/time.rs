//! Conversion between epoch milliseconds and the RFC3339 strings used on the
//! wire by the annotation service.

use crate::error::TimeError;
use crate::identity::EpochMs;
use chrono::{DateTime, SecondsFormat, Utc};

/// `0000-01-01T00:00:00.000Z`, the earliest instant with a four-digit year.
pub const MIN_RFC3339_MS: EpochMs = -62_167_219_200_000;

/// `9999-12-31T23:59:59.999Z`, the latest instant with a four-digit year.
pub const MAX_RFC3339_MS: EpochMs = 253_402_300_799_999;

/// Format epoch milliseconds as RFC3339 with millisecond precision and a
/// `Z` suffix, e.g. `2018-01-01T00:00:00.000Z`.
///
/// RFC3339 only has four-digit years, so instants outside
/// [`MIN_RFC3339_MS`]..=[`MAX_RFC3339_MS`] are `OutOfRange`.
pub fn ms_to_rfc3339(ms: EpochMs) -> Result<String, TimeError> {
    if !(MIN_RFC3339_MS..=MAX_RFC3339_MS).contains(&ms) {
        return Err(TimeError::OutOfRange { ms });
    }
    let dt = DateTime::<Utc>::from_timestamp_millis(ms).ok_or(TimeError::OutOfRange { ms })?;
    Ok(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Round fractional milliseconds half-up, then format.
///
/// Chart interactions produce sub-millisecond positions; those are rounded
/// before they reach the wire.
pub fn fractional_ms_to_rfc3339(ms: f64) -> Result<String, TimeError> {
    ms_to_rfc3339(round_ms(ms)?)
}

/// Round fractional milliseconds half-up to an integer timestamp.
pub fn round_ms(ms: f64) -> Result<EpochMs, TimeError> {
    if !ms.is_finite() {
        return Err(TimeError::NotFinite {
            value: ms.to_string(),
        });
    }
    let rounded = (ms + 0.5).floor();
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(TimeError::OutOfRange {
            ms: if rounded < 0.0 { i64::MIN } else { i64::MAX },
        });
    }
    Ok(rounded as i64)
}

/// Parse an RFC3339 timestamp (any offset) into epoch milliseconds.
/// Sub-millisecond precision is truncated.
pub fn rfc3339_to_ms(input: &str) -> Result<EpochMs, TimeError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| TimeError::InvalidRfc3339 {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Convenience for optional bounds: `None` stays `None`.
pub fn opt_ms_to_rfc3339(ms: Option<EpochMs>) -> Result<Option<String>, TimeError> {
    ms.map(ms_to_rfc3339).transpose()
}

/// Convenience for optional bounds: `None` stays `None`.
pub fn opt_rfc3339_to_ms(input: Option<&str>) -> Result<Option<EpochMs>, TimeError> {
    input.map(rfc3339_to_ms).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ms_to_rfc3339_epoch() {
        assert_eq!(ms_to_rfc3339(0).unwrap(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_ms_to_rfc3339_keeps_millis() {
        assert_eq!(
            ms_to_rfc3339(1_514_764_800_123).unwrap(),
            "2018-01-01T00:00:00.123Z"
        );
    }

    #[test]
    fn test_rfc3339_to_ms_with_offset() {
        let ms = rfc3339_to_ms("2018-01-01T01:00:00.000+01:00").unwrap();
        assert_eq!(ms, 1_514_764_800_000);
    }

    #[test]
    fn test_rfc3339_to_ms_truncates_sub_millis() {
        let ms = rfc3339_to_ms("2018-01-01T00:00:00.123999Z").unwrap();
        assert_eq!(ms, 1_514_764_800_123);
    }

    #[test]
    fn test_rfc3339_to_ms_rejects_garbage() {
        assert!(matches!(
            rfc3339_to_ms("yesterday"),
            Err(TimeError::InvalidRfc3339 { .. })
        ));
    }

    #[test]
    fn test_round_ms_half_up() {
        assert_eq!(round_ms(1000.5).unwrap(), 1001);
        assert_eq!(round_ms(1000.49).unwrap(), 1000);
        assert_eq!(round_ms(-0.5).unwrap(), 0);
    }

    #[test]
    fn test_round_ms_rejects_nan() {
        assert!(matches!(round_ms(f64::NAN), Err(TimeError::NotFinite { .. })));
        assert!(round_ms(f64::INFINITY).is_err());
    }

    #[test]
    fn test_out_of_range_ms() {
        assert!(matches!(
            ms_to_rfc3339(i64::MAX),
            Err(TimeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_four_digit_year_bounds() {
        let last = ms_to_rfc3339(MAX_RFC3339_MS).unwrap();
        assert_eq!(last, "9999-12-31T23:59:59.999Z");
        assert_eq!(rfc3339_to_ms(&last).unwrap(), MAX_RFC3339_MS);

        let first = ms_to_rfc3339(MIN_RFC3339_MS).unwrap();
        assert_eq!(first, "0000-01-01T00:00:00.000Z");
        assert_eq!(rfc3339_to_ms(&first).unwrap(), MIN_RFC3339_MS);

        assert!(matches!(
            ms_to_rfc3339(MAX_RFC3339_MS + 1),
            Err(TimeError::OutOfRange { ms }) if ms == MAX_RFC3339_MS + 1
        ));
        assert!(ms_to_rfc3339(MIN_RFC3339_MS - 1).is_err());
    }

    #[test]
    fn test_optional_conversions() {
        assert_eq!(opt_ms_to_rfc3339(None).unwrap(), None);
        assert_eq!(opt_rfc3339_to_ms(None).unwrap(), None);
        assert_eq!(
            opt_rfc3339_to_ms(Some("1970-01-01T00:00:01Z")).unwrap(),
            Some(1000)
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(t in 0i64..=MAX_RFC3339_MS) {
            let rfc = ms_to_rfc3339(t).unwrap();
            prop_assert_eq!(rfc3339_to_ms(&rfc).unwrap(), t);
        }

        #[test]
        fn prop_fractional_round_trip(t in 0.0f64..(MAX_RFC3339_MS as f64)) {
            let rfc = fractional_ms_to_rfc3339(t).unwrap();
            prop_assert_eq!(rfc3339_to_ms(&rfc).unwrap(), (t + 0.5).floor() as i64);
        }
    }
}
