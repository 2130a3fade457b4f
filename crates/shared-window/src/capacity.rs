//! Validation of the `max_size` argument.

use crate::CAP_MAX;
use crate::error::{Result, WindowError};

/// The `max_size` argument as handed over by a caller.
///
/// Bindings for dynamically typed callers can pass whatever they received;
/// Rust callers normally go through one of the `From` conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxSize {
    /// No value given; use the configured default capacity.
    Default,
    /// Integral value.
    Integer(i64),
    /// Floating point value, truncated toward zero with a warning.
    Float(f64),
}

macro_rules! max_size_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for MaxSize {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

max_size_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for MaxSize {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f32> for MaxSize {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for MaxSize {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for MaxSize {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Default, Into::into)
    }
}

/// A validated capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityCheck {
    /// Capacity in `1..=CAP_MAX`.
    pub capacity: usize,
    /// The caller passed a float that had to be truncated.
    pub coerced: bool,
}

impl MaxSize {
    /// Validate against `1..=CAP_MAX`, substituting `default` for
    /// `MaxSize::Default`.
    ///
    /// `name` is only used for the error message.
    pub fn check(self, name: &str, default: usize) -> Result<CapacityCheck> {
        let (value, coerced) = match self {
            Self::Default => (i64::try_from(default).unwrap_or(i64::MAX), false),
            Self::Integer(value) => (value, false),
            // `as` truncates toward zero, saturates and maps NaN to 0.
            Self::Float(value) => (value as i64, true),
        };

        if value <= 0 {
            return Err(WindowError::invalid_argument(
                name,
                "max_size must be greater than zero",
            ));
        }
        if value > CAP_MAX as i64 {
            return Err(WindowError::invalid_argument(
                name,
                format!("max_size cannot be greater than {CAP_MAX}"),
            ));
        }

        Ok(CapacityCheck {
            capacity: value as usize,
            coerced,
        })
    }
}
