//! Logical type preparation
//!
//! A fixed, enumerable table of conversions between domain values and
//! the raw wire representation underneath them: decimal over bytes or
//! fixed, date as days since the Unix epoch, time of day in millis or
//! micros, timestamps in millis or micros, uuid as its string form.
//! Nothing here recurses; the generator only selects the conversion by
//! name and threads the schema parameters through.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike};
use num_bigint::BigInt;
use num_bigint::Sign;

use crate::error::{CodecError, Result, SchemaError};
use crate::schema::{LogicalKind, LogicalRaw, LogicalSchema, Primitive};
use crate::value::Datum;
use crate::wire::{reader, writer};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch is a valid date")
}

/// Check the kind/raw pairing the Avro specification allows. Called at
/// generation time so a compiled codec never sees a bad pairing.
pub fn validate(spec: &LogicalSchema) -> Result<()> {
    let ok = match spec.kind {
        LogicalKind::Decimal => matches!(
            spec.raw,
            LogicalRaw::Primitive(Primitive::Bytes) | LogicalRaw::Fixed(_)
        ),
        LogicalKind::Date | LogicalKind::TimeMillis => {
            spec.raw == LogicalRaw::Primitive(Primitive::Int)
        }
        LogicalKind::TimeMicros
        | LogicalKind::TimestampMillis
        | LogicalKind::TimestampMicros => spec.raw == LogicalRaw::Primitive(Primitive::Long),
        LogicalKind::Uuid => spec.raw == LogicalRaw::Primitive(Primitive::String),
    };
    if ok {
        Ok(())
    } else {
        Err(SchemaError::Generation(format!(
            "logical type {} cannot annotate {:?}",
            spec.kind.name(),
            spec.raw
        )))
    }
}

/// Prepare `datum` and encode it through the raw wire type.
pub fn encode(
    buf: &mut Vec<u8>,
    spec: &LogicalSchema,
    datum: &Datum,
    location: &str,
) -> std::result::Result<(), CodecError> {
    let mismatch = |expected: &'static str| CodecError::TypeMismatch {
        expected,
        found: datum.kind(),
        location: location.to_string(),
    };
    match spec.kind {
        LogicalKind::Decimal => {
            let Datum::Decimal(unscaled) = datum else {
                return Err(mismatch("decimal"));
            };
            let bytes = decimal_to_bytes(unscaled);
            match spec.raw {
                LogicalRaw::Primitive(_) => writer::write_bytes(buf, &bytes),
                LogicalRaw::Fixed(size) => {
                    let padded = sign_extend(&bytes, size, unscaled.sign() == Sign::Minus)
                        .ok_or_else(|| {
                            CodecError::LogicalOutOfRange(format!(
                                "decimal {unscaled} does not fit in {size} bytes"
                            ))
                        })?;
                    buf.extend_from_slice(&padded);
                }
            }
        }
        LogicalKind::Date => {
            let Datum::Date(date) = datum else {
                return Err(mismatch("date"));
            };
            let days = (*date - epoch()).num_days();
            let days = i32::try_from(days).map_err(|_| CodecError::IntOverflow(days))?;
            writer::write_int(buf, days);
        }
        LogicalKind::TimeMillis => {
            let Datum::Time(time) = datum else {
                return Err(mismatch("time"));
            };
            let millis =
                time.num_seconds_from_midnight() as i32 * 1000 + (time.nanosecond() / 1_000_000) as i32;
            writer::write_int(buf, millis);
        }
        LogicalKind::TimeMicros => {
            let Datum::Time(time) = datum else {
                return Err(mismatch("time"));
            };
            let micros =
                time.num_seconds_from_midnight() as i64 * 1_000_000 + (time.nanosecond() / 1_000) as i64;
            writer::write_long(buf, micros);
        }
        LogicalKind::TimestampMillis => {
            let Datum::Timestamp(ts) = datum else {
                return Err(mismatch("timestamp"));
            };
            writer::write_long(buf, ts.timestamp_millis());
        }
        LogicalKind::TimestampMicros => {
            let Datum::Timestamp(ts) = datum else {
                return Err(mismatch("timestamp"));
            };
            writer::write_long(buf, ts.timestamp_micros());
        }
        LogicalKind::Uuid => {
            let Datum::Uuid(uuid) = datum else {
                return Err(mismatch("uuid"));
            };
            writer::write_string(buf, &uuid.to_string());
        }
    }
    Ok(())
}

/// Decode the raw wire type and lift it back into the domain value.
pub fn decode(
    input: &mut &[u8],
    spec: &LogicalSchema,
) -> std::result::Result<Datum, CodecError> {
    match spec.kind {
        LogicalKind::Decimal => {
            let bytes = match spec.raw {
                LogicalRaw::Primitive(_) => reader::read_bytes(input)?,
                LogicalRaw::Fixed(size) => reader::read_fixed(input, size)?,
            };
            Ok(Datum::Decimal(BigInt::from_signed_bytes_be(&bytes)))
        }
        LogicalKind::Date => {
            let days = reader::read_int(input)?;
            Ok(Datum::Date(epoch() + Duration::days(days as i64)))
        }
        LogicalKind::TimeMillis => {
            let millis = reader::read_int(input)?;
            let time = NaiveTime::from_num_seconds_from_midnight_opt(
                (millis / 1000) as u32,
                ((millis % 1000) * 1_000_000) as u32,
            )
            .ok_or_else(|| CodecError::LogicalOutOfRange(format!("{millis} ms of day")))?;
            Ok(Datum::Time(time))
        }
        LogicalKind::TimeMicros => {
            let micros = reader::read_long(input)?;
            let time = NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .ok_or_else(|| CodecError::LogicalOutOfRange(format!("{micros} us of day")))?;
            Ok(Datum::Time(time))
        }
        LogicalKind::TimestampMillis => {
            let millis = reader::read_long(input)?;
            DateTime::from_timestamp_millis(millis)
                .map(Datum::Timestamp)
                .ok_or_else(|| CodecError::LogicalOutOfRange(format!("{millis} ms since epoch")))
        }
        LogicalKind::TimestampMicros => {
            let micros = reader::read_long(input)?;
            DateTime::from_timestamp_micros(micros)
                .map(Datum::Timestamp)
                .ok_or_else(|| CodecError::LogicalOutOfRange(format!("{micros} us since epoch")))
        }
        LogicalKind::Uuid => {
            let text = reader::read_string(input)?;
            uuid::Uuid::parse_str(&text)
                .map(Datum::Uuid)
                .map_err(|_| CodecError::InvalidUuid(text))
        }
    }
}

/// Minimal two's-complement big-endian representation of the unscaled
/// integer. `BigInt::to_signed_bytes_be` already yields exactly that,
/// except it returns an empty slice for zero.
fn decimal_to_bytes(unscaled: &BigInt) -> Vec<u8> {
    let bytes = unscaled.to_signed_bytes_be();
    if bytes.is_empty() {
        vec![0]
    } else {
        bytes
    }
}

/// Left-pad a two's-complement value to `size` bytes, or `None` when it
/// does not fit.
fn sign_extend(bytes: &[u8], size: usize, negative: bool) -> Option<Vec<u8>> {
    if bytes.len() > size {
        return None;
    }
    let fill = if negative { 0xFF } else { 0x00 };
    let mut out = vec![fill; size - bytes.len()];
    out.extend_from_slice(bytes);
    Some(out)
}
