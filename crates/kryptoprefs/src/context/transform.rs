//! Conversions between typed preference values and their stored text

use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Error produced by a [`Transform`]; the preference adds the key when reporting it
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

pub type TransformResult<T> = std::result::Result<T, TransformError>;

/// Converts `T` to the text stored for a preference and back
pub trait Transform<T>: Send + Sync {
    fn serialize(&self, value: &T) -> TransformResult<String>;

    fn deserialize(&self, text: &str) -> TransformResult<T>;
}

/// Value types with a built-in stored representation
pub trait PrefValue: Clone + Send + Sync + 'static {
    fn to_pref(&self) -> String;

    fn from_pref(text: &str) -> TransformResult<Self>;
}

macro_rules! impl_pref_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PrefValue for $ty {
                fn to_pref(&self) -> String {
                    self.to_string()
                }

                fn from_pref(text: &str) -> TransformResult<Self> {
                    Ok(text.parse::<$ty>()?)
                }
            }
        )*
    };
}

impl_pref_value!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, char, String);

/// Dates are stored as milliseconds since the Unix epoch
impl PrefValue for DateTime<Utc> {
    fn to_pref(&self) -> String {
        self.timestamp_millis().to_string()
    }

    fn from_pref(text: &str) -> TransformResult<Self> {
        let millis: i64 = text.parse()?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| format!("timestamp out of range: {}", millis).into())
    }
}

/// [`Transform`] for any [`PrefValue`]
pub struct ValueTransform<T>(PhantomData<fn() -> T>);

impl<T> ValueTransform<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ValueTransform<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PrefValue> Transform<T> for ValueTransform<T> {
    fn serialize(&self, value: &T) -> TransformResult<String> {
        Ok(value.to_pref())
    }

    fn deserialize(&self, text: &str) -> TransformResult<T> {
        T::from_pref(text)
    }
}

/// [`Transform`] through `Display`/`FromStr`, typically for enums
pub struct ParseTransform<T>(PhantomData<fn() -> T>);

impl<T> ParseTransform<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ParseTransform<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Transform<T> for ParseTransform<T>
where
    T: Display + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fn serialize(&self, value: &T) -> TransformResult<String> {
        Ok(value.to_string())
    }

    fn deserialize(&self, text: &str) -> TransformResult<T> {
        Ok(text.parse()?)
    }
}

/// [`Transform`] built from a pair of closures
pub struct FnTransform<S, D> {
    serialize: S,
    deserialize: D,
}

impl<S, D> FnTransform<S, D> {
    pub fn new(serialize: S, deserialize: D) -> Self {
        Self {
            serialize,
            deserialize,
        }
    }
}

impl<T, S, D> Transform<T> for FnTransform<S, D>
where
    S: Fn(&T) -> TransformResult<String> + Send + Sync,
    D: Fn(&str) -> TransformResult<T> + Send + Sync,
{
    fn serialize(&self, value: &T) -> TransformResult<String> {
        (self.serialize)(value)
    }

    fn deserialize(&self, text: &str) -> TransformResult<T> {
        (self.deserialize)(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Pillar {
        D,
        F,
    }

    impl Display for Pillar {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(match self {
                Pillar::D => "D",
                Pillar::F => "F",
            })
        }
    }

    impl FromStr for Pillar {
        type Err = std::io::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "D" => Ok(Pillar::D),
                "F" => Ok(Pillar::F),
                other => Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unknown pillar {}", other),
                )),
            }
        }
    }

    #[test]
    fn test_primitive_values() {
        assert_eq!(42i32.to_pref(), "42");
        assert_eq!(i32::from_pref("42").unwrap(), 42);
        assert_eq!(0x42u8.to_pref(), "66");
        assert_eq!(f64::from_pref("100").unwrap(), 100.0);
        assert!(bool::from_pref("true").unwrap());
        assert_eq!(char::from_pref("V").unwrap(), 'V');
        assert_eq!(String::from_pref("Don't panic.").unwrap(), "Don't panic.");
    }

    #[test]
    fn test_invalid_text_fails() {
        assert!(i16::from_pref("70000").is_err());
        assert!(char::from_pref("VV").is_err());
        assert!(bool::from_pref("yes").is_err());
    }

    #[test]
    fn test_date_as_epoch_millis() {
        let date = DateTime::from_timestamp_millis(100).unwrap();
        assert_eq!(date.to_pref(), "100");
        assert_eq!(DateTime::<Utc>::from_pref("-1").unwrap().timestamp_millis(), -1);
        assert!(DateTime::<Utc>::from_pref("i64 only").is_err());
    }

    #[test]
    fn test_parse_transform_for_enum() {
        let transform = ParseTransform::<Pillar>::new();
        assert_eq!(transform.serialize(&Pillar::F).unwrap(), "F");
        assert_eq!(transform.deserialize("D").unwrap(), Pillar::D);
        assert!(transform.deserialize("Q").is_err());
    }

    #[test]
    fn test_fn_transform() {
        let transform = FnTransform::new(
            |v: &(i32, i32)| -> TransformResult<String> { Ok(format!("{},{}", v.0, v.1)) },
            |text: &str| -> TransformResult<(i32, i32)> {
                let (a, b) = text.split_once(',').ok_or("missing comma")?;
                Ok((a.parse()?, b.parse()?))
            },
        );

        assert_eq!(transform.serialize(&(1, 2)).unwrap(), "1,2");
        assert_eq!(transform.deserialize("3,4").unwrap(), (3, 4));
        assert!(transform.deserialize("34").is_err());
    }
}
