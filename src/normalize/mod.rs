//! Conversion of arbitrary serde values into the [`Value`] model.
//!
//! The [`Normalizer`] is a serde [`Serializer`](serde::Serializer) whose
//! output is a [`Value`]. Anything that implements `Serialize` can be fed to a
//! pipeline; the normalizer decides how each serde data-model type maps onto
//! the restricted value model:
//!
//! | serde type | Value |
//! |------------|-------|
//! | `bool`, `str`, `char` | `Bool`, `String` |
//! | `i64` | `Int` |
//! | `i8` `i16` `i32` `u8` `u16` `u32` `u64` `f32` `f64` | `Float` (widened, lossy above 2^53) |
//! | `i128`, `u128` | `Int` when it fits in `i64`, else `BigInt` |
//! | `bytes` | `Array` of `Int` |
//! | unit, `None` | `Null` |
//! | seq, tuple | `Array` |
//! | map, struct | `Object` (map keys must be string-like) |
//! | enum variant with data | `{"Variant": data}` |
//!
//! Custom marshalers registered through
//! [`EncodeOption::CustomMarshaler`](crate::EncodeOption::CustomMarshaler)
//! replace the normalized form of the named types.

mod ser;

use core::fmt;
use std::collections::HashMap;

use serde::Serialize;

use crate::marshal::Input;
use crate::options::{EncodeOption, MarshalFn};
use crate::value::Value;

pub(crate) use ser::ValueSerializer;

/// Converts serde values into [`Value`]s.
#[derive(Clone, Default)]
pub struct Normalizer {
    marshalers: HashMap<String, MarshalFn>,
}

impl Normalizer {
    /// Create a normalizer honoring the custom marshalers in `options`.
    /// A later marshaler for the same type replaces an earlier one.
    pub fn new(options: &[EncodeOption]) -> Self {
        let mut marshalers = HashMap::new();
        for option in options {
            if let EncodeOption::CustomMarshaler { type_name, marshal } = option {
                marshalers.insert(type_name.clone(), marshal.clone());
            }
        }
        Normalizer { marshalers }
    }

    /// Normalize any serializable value.
    pub fn normalize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, NormalizeError> {
        value.serialize(ValueSerializer::new(self))
    }

    /// Normalize a pipeline input. Inputs that already are a [`Value`] are
    /// cloned without going through serde.
    pub fn normalize_input(&self, input: &dyn Input) -> Result<Value, NormalizeError> {
        match input.as_any().downcast_ref::<Value>() {
            Some(value) => Ok(value.clone()),
            None => input.normalize(self),
        }
    }

    /// Whether any custom marshalers are registered.
    pub fn has_marshalers(&self) -> bool {
        !self.marshalers.is_empty()
    }

    /// Run the custom marshaler registered for `type_name`, if any.
    pub(crate) fn apply_marshaler(
        &self,
        type_name: &str,
        value: Value,
    ) -> Result<Value, NormalizeError> {
        let Some(marshal) = self.marshalers.get(type_name) else {
            return Ok(value);
        };
        let bytes = marshal(&value).map_err(|e| {
            NormalizeError::new(format!("custom marshaler for {}: {}", type_name, e))
        })?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(value),
            Err(_) => {
                let text = String::from_utf8_lossy(&bytes);
                Ok(Value::String(text.trim_end_matches('\n').to_string()))
            }
        }
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.marshalers.keys().collect();
        names.sort();
        f.debug_struct("Normalizer")
            .field("marshalers", &names)
            .finish()
    }
}

/// A value that cannot be represented in the [`Value`] model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeError {
    message: String,
}

impl NormalizeError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        NormalizeError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NormalizeError {}

impl serde::ser::Error for NormalizeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        NormalizeError::new(msg.to_string())
    }
}
