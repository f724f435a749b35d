use core::fmt;
use core::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use odata_edm::EdmPrimitiveKind;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::ValueError;

/// A decoded primitive value, one variant per `Edm` primitive kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// `Edm.Binary`
    Binary(Vec<u8>),
    /// `Edm.Boolean`
    Boolean(bool),
    /// `Edm.Byte`
    Byte(u8),
    /// `Edm.Date`
    Date(NaiveDate),
    /// `Edm.DateTimeOffset`
    DateTimeOffset(DateTime<FixedOffset>),
    /// `Edm.Decimal`
    Decimal(Decimal),
    /// `Edm.Double`
    Double(f64),
    /// `Edm.Duration`
    Duration(TimeDelta),
    /// `Edm.Guid`
    Guid(Uuid),
    /// `Edm.Int16`
    Int16(i16),
    /// `Edm.Int32`
    Int32(i32),
    /// `Edm.Int64`
    Int64(i64),
    /// `Edm.SByte`
    SByte(i8),
    /// `Edm.Single`
    Single(f32),
    /// `Edm.String`
    String(String),
    /// `Edm.TimeOfDay`
    TimeOfDay(NaiveTime),
}

impl Primitive {
    /// The kind of this value.
    pub fn kind(&self) -> EdmPrimitiveKind {
        match self {
            Primitive::Binary(_) => EdmPrimitiveKind::Binary,
            Primitive::Boolean(_) => EdmPrimitiveKind::Boolean,
            Primitive::Byte(_) => EdmPrimitiveKind::Byte,
            Primitive::Date(_) => EdmPrimitiveKind::Date,
            Primitive::DateTimeOffset(_) => EdmPrimitiveKind::DateTimeOffset,
            Primitive::Decimal(_) => EdmPrimitiveKind::Decimal,
            Primitive::Double(_) => EdmPrimitiveKind::Double,
            Primitive::Duration(_) => EdmPrimitiveKind::Duration,
            Primitive::Guid(_) => EdmPrimitiveKind::Guid,
            Primitive::Int16(_) => EdmPrimitiveKind::Int16,
            Primitive::Int32(_) => EdmPrimitiveKind::Int32,
            Primitive::Int64(_) => EdmPrimitiveKind::Int64,
            Primitive::SByte(_) => EdmPrimitiveKind::SByte,
            Primitive::Single(_) => EdmPrimitiveKind::Single,
            Primitive::String(_) => EdmPrimitiveKind::String,
            Primitive::TimeOfDay(_) => EdmPrimitiveKind::TimeOfDay,
        }
    }

    /// The string, if this is an `Edm.String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an `i64`, if it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Primitive::Byte(v) => Some(i64::from(v)),
            Primitive::SByte(v) => Some(i64::from(v)),
            Primitive::Int16(v) => Some(i64::from(v)),
            Primitive::Int32(v) => Some(i64::from(v)),
            Primitive::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to `kind` without losing information.
    ///
    /// Integral values narrow with range checks and widen to decimal and
    /// floating point. Strings parse into every non-string kind (binary from
    /// base64). Anything else is a [`ValueError::TypeMismatch`].
    pub fn coerce_to(self, kind: EdmPrimitiveKind) -> Result<Primitive, ValueError> {
        if self.kind() == kind {
            return Ok(self);
        }

        if let Some(int) = self.as_i64() {
            return from_integral(int, kind);
        }

        match (self, kind) {
            (Primitive::String(s), kind) => parse_literal(&s, kind),
            (Primitive::Decimal(d), EdmPrimitiveKind::Double) => d
                .to_f64()
                .map(Primitive::Double)
                .ok_or_else(|| ValueError::out_of_range(d, kind)),
            (Primitive::Decimal(d), EdmPrimitiveKind::Single) => d
                .to_f32()
                .map(Primitive::Single)
                .ok_or_else(|| ValueError::out_of_range(d, kind)),
            (Primitive::Decimal(d), kind) if kind.is_integral() => {
                if !d.fract().is_zero() {
                    return Err(ValueError::out_of_range(d, kind));
                }
                let int = i64::try_from(d).map_err(|_| ValueError::out_of_range(d, kind))?;
                from_integral(int, kind)
            }
            (Primitive::Single(v), EdmPrimitiveKind::Double) => Ok(Primitive::Double(f64::from(v))),
            (Primitive::Single(v), kind) => from_float(f64::from(v), kind),
            (Primitive::Double(v), kind) => from_float(v, kind),
            (Primitive::DateTimeOffset(dt), EdmPrimitiveKind::Date) => {
                Ok(Primitive::Date(dt.date_naive()))
            }
            (other, kind) => Err(ValueError::type_mismatch(
                kind.full_name(),
                other.kind().full_name(),
            )),
        }
    }

    /// Re-express a date-time-offset in `offset`. Other kinds are returned unchanged.
    pub fn with_time_zone(self, offset: FixedOffset) -> Primitive {
        match self {
            Primitive::DateTimeOffset(dt) => Primitive::DateTimeOffset(dt.with_timezone(&offset)),
            other => other,
        }
    }
}

fn from_integral(int: i64, kind: EdmPrimitiveKind) -> Result<Primitive, ValueError> {
    let out_of_range = || ValueError::out_of_range(int, kind);
    Ok(match kind {
        EdmPrimitiveKind::Byte => Primitive::Byte(u8::try_from(int).map_err(|_| out_of_range())?),
        EdmPrimitiveKind::SByte => Primitive::SByte(i8::try_from(int).map_err(|_| out_of_range())?),
        EdmPrimitiveKind::Int16 => Primitive::Int16(i16::try_from(int).map_err(|_| out_of_range())?),
        EdmPrimitiveKind::Int32 => Primitive::Int32(i32::try_from(int).map_err(|_| out_of_range())?),
        EdmPrimitiveKind::Int64 => Primitive::Int64(int),
        EdmPrimitiveKind::Decimal => Primitive::Decimal(Decimal::from(int)),
        EdmPrimitiveKind::Double => Primitive::Double(int as f64),
        EdmPrimitiveKind::Single => Primitive::Single(int as f32),
        other => {
            return Err(ValueError::type_mismatch(
                other.full_name(),
                "an integral number",
            ));
        }
    })
}

fn from_float(v: f64, kind: EdmPrimitiveKind) -> Result<Primitive, ValueError> {
    match kind {
        EdmPrimitiveKind::Double => Ok(Primitive::Double(v)),
        EdmPrimitiveKind::Single => {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(ValueError::out_of_range(v, kind));
            }
            Ok(Primitive::Single(v as f32))
        }
        EdmPrimitiveKind::Decimal => Decimal::try_from(v)
            .map(Primitive::Decimal)
            .map_err(|_| ValueError::out_of_range(v, kind)),
        kind if kind.is_integral() => {
            if v.fract() != 0.0 || !(i64::MIN as f64..=i64::MAX as f64).contains(&v) {
                return Err(ValueError::out_of_range(v, kind));
            }
            from_integral(v as i64, kind)
        }
        other => Err(ValueError::type_mismatch(
            other.full_name(),
            "a floating point number",
        )),
    }
}

/// Parse the textual form of a primitive of `kind`.
///
/// Numbers use the invariant (`.`-separated, no grouping) notation; `INF`,
/// `-INF` and `NaN` are accepted for floating point kinds.
pub fn parse_literal(text: &str, kind: EdmPrimitiveKind) -> Result<Primitive, ValueError> {
    let invalid = || ValueError::invalid_literal(kind, text);
    let trimmed = text.trim();
    Ok(match kind {
        EdmPrimitiveKind::String => Primitive::String(text.to_string()),
        EdmPrimitiveKind::Boolean => match trimmed {
            "true" => Primitive::Boolean(true),
            "false" => Primitive::Boolean(false),
            _ => return Err(invalid()),
        },
        kind if kind.is_integral() => {
            let int = trimmed.parse::<i64>().map_err(|_| invalid())?;
            from_integral(int, kind)?
        }
        EdmPrimitiveKind::Decimal => Primitive::Decimal(
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|_| invalid())?,
        ),
        EdmPrimitiveKind::Double => Primitive::Double(parse_float(trimmed).ok_or_else(invalid)?),
        EdmPrimitiveKind::Single => {
            from_float(parse_float(trimmed).ok_or_else(invalid)?, EdmPrimitiveKind::Single)?
        }
        EdmPrimitiveKind::Guid => Primitive::Guid(Uuid::parse_str(trimmed).map_err(|_| invalid())?),
        EdmPrimitiveKind::Date => {
            Primitive::Date(NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?)
        }
        EdmPrimitiveKind::TimeOfDay => Primitive::TimeOfDay(
            NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
                .map_err(|_| invalid())?,
        ),
        EdmPrimitiveKind::DateTimeOffset => Primitive::DateTimeOffset(
            DateTime::parse_from_rfc3339(trimmed).map_err(|_| invalid())?,
        ),
        EdmPrimitiveKind::Duration => {
            Primitive::Duration(parse_duration(trimmed).ok_or_else(invalid)?)
        }
        EdmPrimitiveKind::Binary => Primitive::Binary(
            STANDARD
                .decode(trimmed)
                .or_else(|_| URL_SAFE.decode(trimmed))
                .map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    })
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Parse an ISO 8601 day-time duration such as `P1DT2H30M`, `PT0.5S` or `-P3D`.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (days_part, time_part) = match rest.split_once('T') {
        Some((days, time)) => (days, Some(time)),
        None => (rest, None),
    };

    let mut total = TimeDelta::zero();
    if !days_part.is_empty() {
        let days = days_part.strip_suffix('D')?.parse::<i64>().ok()?;
        total = total.checked_add(&TimeDelta::try_days(days)?)?;
    }

    if let Some(mut time) = time_part {
        if time.is_empty() {
            return None;
        }
        for (unit, seconds) in [('H', 3600.0), ('M', 60.0), ('S', 1.0)] {
            if let Some(pos) = time.find(unit) {
                let amount = time[..pos].parse::<f64>().ok()?;
                let nanos = amount * seconds * 1e9;
                if !nanos.is_finite() || nanos.abs() > i64::MAX as f64 {
                    return None;
                }
                total = total.checked_add(&TimeDelta::nanoseconds(nanos.round() as i64))?;
                time = &time[pos + 1..];
            }
        }
        if !time.is_empty() {
            return None;
        }
    }

    Some(if negative { -total } else { total })
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Binary(v) => f.write_str(&STANDARD.encode(v)),
            Primitive::Boolean(v) => write!(f, "{v}"),
            Primitive::Byte(v) => write!(f, "{v}"),
            Primitive::Date(v) => write!(f, "{v}"),
            Primitive::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Primitive::Decimal(v) => write!(f, "{v}"),
            Primitive::Double(v) => write!(f, "{v}"),
            Primitive::Duration(v) => write!(f, "{v}"),
            Primitive::Guid(v) => write!(f, "{v}"),
            Primitive::Int16(v) => write!(f, "{v}"),
            Primitive::Int32(v) => write!(f, "{v}"),
            Primitive::Int64(v) => write!(f, "{v}"),
            Primitive::SByte(v) => write!(f, "{v}"),
            Primitive::Single(v) => write!(f, "{v}"),
            Primitive::String(v) => f.write_str(v),
            Primitive::TimeOfDay(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_native {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(value: $ty) -> Self {
                    Primitive::$variant(value)
                }
            }
        )*
    };
}

impl_from_native! {
    bool => Boolean,
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Uuid => Guid,
    NaiveDate => Date,
    NaiveTime => TimeOfDay,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => Duration,
    Vec<u8> => Binary,
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_narrowing_is_range_checked() {
        assert_eq!(
            Primitive::Int64(300).coerce_to(EdmPrimitiveKind::Int16),
            Ok(Primitive::Int16(300))
        );
        assert!(matches!(
            Primitive::Int64(300).coerce_to(EdmPrimitiveKind::Byte),
            Err(ValueError::OutOfRange { .. })
        ));
        assert!(matches!(
            Primitive::Int32(-1).coerce_to(EdmPrimitiveKind::Byte),
            Err(ValueError::OutOfRange { .. })
        ));
    }

    #[test]
    fn integral_widens_to_decimal_and_float() {
        assert_eq!(
            Primitive::Int32(42).coerce_to(EdmPrimitiveKind::Decimal),
            Ok(Primitive::Decimal(Decimal::from(42)))
        );
        assert_eq!(
            Primitive::Int32(42).coerce_to(EdmPrimitiveKind::Double),
            Ok(Primitive::Double(42.0))
        );
    }

    #[test]
    fn strings_parse_into_typed_kinds() {
        assert_eq!(
            Primitive::from("2024-02-29").coerce_to(EdmPrimitiveKind::Date),
            Ok(Primitive::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            Primitive::from("aGVsbG8=").coerce_to(EdmPrimitiveKind::Binary),
            Ok(Primitive::Binary(b"hello".to_vec()))
        );
        assert_eq!(
            Primitive::from("9223372036854775807").coerce_to(EdmPrimitiveKind::Int64),
            Ok(Primitive::Int64(i64::MAX))
        );
        assert!(matches!(
            Primitive::from("nope").coerce_to(EdmPrimitiveKind::Guid),
            Err(ValueError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn boolean_does_not_become_a_number() {
        assert!(matches!(
            Primitive::Boolean(true).coerce_to(EdmPrimitiveKind::Int32),
            Err(ValueError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn fractional_decimal_does_not_narrow() {
        let d = Decimal::from_str("1.5").unwrap();
        assert!(Primitive::Decimal(d).coerce_to(EdmPrimitiveKind::Int32).is_err());
        let whole = Decimal::from_str("7.00").unwrap();
        assert_eq!(
            Primitive::Decimal(whole).coerce_to(EdmPrimitiveKind::Int32),
            Ok(Primitive::Int32(7))
        );
    }

    #[test]
    fn durations() {
        assert_eq!(
            parse_duration("P1DT2H30M"),
            Some(TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::minutes(30))
        );
        assert_eq!(parse_duration("PT0.5S"), Some(TimeDelta::milliseconds(500)));
        assert_eq!(parse_duration("-P3D"), Some(-TimeDelta::days(3)));
        assert_eq!(parse_duration("P"), Some(TimeDelta::zero()));
        assert_eq!(parse_duration("PT"), None);
        assert_eq!(parse_duration("1D"), None);
        assert_eq!(parse_duration("PT5X"), None);
    }

    #[test]
    fn time_zone_normalization() {
        let dt = DateTime::parse_from_rfc3339("2024-01-01T12:00:00+00:00").unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let Primitive::DateTimeOffset(shifted) =
            Primitive::DateTimeOffset(dt).with_time_zone(plus_two)
        else {
            panic!("expected a date-time-offset");
        };
        assert_eq!(shifted.to_rfc3339(), "2024-01-01T14:00:00+02:00");
        assert_eq!(shifted, dt);
    }
}
