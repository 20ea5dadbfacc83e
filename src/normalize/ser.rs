//! serde `Serializer` producing [`Value`]s.

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::ser::{self, Impossible, Serialize};

use super::{NormalizeError, Normalizer};
use crate::value::{Value, BIGINT_TOKEN};

type Result<T> = core::result::Result<T, NormalizeError>;

/// Serializer whose output is a normalized [`Value`].
pub(crate) struct ValueSerializer<'n> {
    normalizer: &'n Normalizer,
}

impl<'n> ValueSerializer<'n> {
    pub(crate) fn new(normalizer: &'n Normalizer) -> Self {
        ValueSerializer { normalizer }
    }

    fn widen(v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }
}

impl<'n> ser::Serializer for ValueSerializer<'n> {
    type Ok = Value;
    type Error = NormalizeError;

    type SerializeSeq = SerializeVec<'n>;
    type SerializeTuple = SerializeVec<'n>;
    type SerializeTupleStruct = SerializeVec<'n>;
    type SerializeTupleVariant = SerializeTupleVariant<'n>;
    type SerializeMap = SerializeMap<'n>;
    type SerializeStruct = SerializeMap<'n>;
    type SerializeStructVariant = SerializeStructVariant<'n>;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value> {
        Ok(Value::integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Self::widen(v as f64)
    }

    fn serialize_u128(self, v: u128) -> Result<Value> {
        Ok(Value::integer(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        Self::widen(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Array(
            v.iter().map(|&b| Value::Int(i64::from(b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value> {
        self.normalizer.apply_marshaler(name, Value::Null)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        self.normalizer
            .apply_marshaler(name, Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value> {
        let normalizer = self.normalizer;
        let inner = value.serialize(self)?;
        if name == BIGINT_TOKEN {
            return match &inner {
                Value::String(digits) => digits
                    .parse::<BigInt>()
                    .map(Value::integer)
                    .map_err(|e| NormalizeError::new(format!("invalid big integer: {}", e))),
                _ => Err(NormalizeError::new("invalid big integer")),
            };
        }
        normalizer.apply_marshaler(name, inner)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value> {
        let normalizer = self.normalizer;
        let inner = value.serialize(self)?;
        normalizer.apply_marshaler(name, Value::object_from([(variant, inner)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec<'n>> {
        Ok(SerializeVec {
            normalizer: self.normalizer,
            name: None,
            vec: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec<'n>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, name: &'static str, len: usize) -> Result<SerializeVec<'n>> {
        Ok(SerializeVec {
            normalizer: self.normalizer,
            name: Some(name),
            vec: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant<'n>> {
        Ok(SerializeTupleVariant {
            normalizer: self.normalizer,
            name,
            variant,
            vec: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<SerializeMap<'n>> {
        Ok(SerializeMap {
            normalizer: self.normalizer,
            name: None,
            map: IndexMap::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<SerializeMap<'n>> {
        Ok(SerializeMap {
            normalizer: self.normalizer,
            name: Some(name),
            map: IndexMap::with_capacity(len),
            next_key: None,
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeStructVariant<'n>> {
        Ok(SerializeStructVariant {
            normalizer: self.normalizer,
            name,
            variant,
            map: IndexMap::with_capacity(len),
        })
    }
}

// ============================================================================
// Sequences
// ============================================================================

pub(crate) struct SerializeVec<'n> {
    normalizer: &'n Normalizer,
    name: Option<&'static str>,
    vec: Vec<Value>,
}

impl SerializeVec<'_> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.vec.push(value.serialize(ValueSerializer::new(self.normalizer))?);
        Ok(())
    }

    fn finish(self) -> Result<Value> {
        let value = Value::Array(self.vec);
        match self.name {
            Some(name) => self.normalizer.apply_marshaler(name, value),
            None => Ok(value),
        }
    }
}

impl ser::SerializeSeq for SerializeVec<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        self.finish()
    }
}

impl ser::SerializeTuple for SerializeVec<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SerializeVec<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        self.finish()
    }
}

pub(crate) struct SerializeTupleVariant<'n> {
    normalizer: &'n Normalizer,
    name: &'static str,
    variant: &'static str,
    vec: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.vec.push(value.serialize(ValueSerializer::new(self.normalizer))?);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let value = Value::object_from([(self.variant, Value::Array(self.vec))]);
        self.normalizer.apply_marshaler(self.name, value)
    }
}

// ============================================================================
// Maps
// ============================================================================

pub(crate) struct SerializeMap<'n> {
    normalizer: &'n Normalizer,
    name: Option<&'static str>,
    map: IndexMap<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| NormalizeError::new("map value serialized before its key"))?;
        let value = value.serialize(ValueSerializer::new(self.normalizer))?;
        self.map.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        let value = value.serialize(ValueSerializer::new(self.normalizer))?;
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let value = Value::Object(self.map);
        match self.name {
            Some(name) => self.normalizer.apply_marshaler(name, value),
            None => Ok(value),
        }
    }
}

pub(crate) struct SerializeStructVariant<'n> {
    normalizer: &'n Normalizer,
    name: &'static str,
    variant: &'static str,
    map: IndexMap<String, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant<'_> {
    type Ok = Value;
    type Error = NormalizeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        let value = value.serialize(ValueSerializer::new(self.normalizer))?;
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Value> {
        let value = Value::object_from([(self.variant, Value::Object(self.map))]);
        self.normalizer.apply_marshaler(self.name, value)
    }
}

// ============================================================================
// Map keys
// ============================================================================

/// Serializes a map key into its string form. Only string-like keys are
/// accepted.
struct MapKeySerializer;

fn key_error(kind: &str) -> NormalizeError {
    NormalizeError::new(format!("unsupported map key type: {}", kind))
}

macro_rules! display_keys {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(v.to_string())
            }
        )*
    };
}

macro_rules! rejected_keys {
    ($($method:ident: $ty:ty => $kind:literal),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> Result<String> {
                Err(key_error($kind))
            }
        )*
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = NormalizeError;

    type SerializeSeq = Impossible<String, NormalizeError>;
    type SerializeTuple = Impossible<String, NormalizeError>;
    type SerializeTupleStruct = Impossible<String, NormalizeError>;
    type SerializeTupleVariant = Impossible<String, NormalizeError>;
    type SerializeMap = Impossible<String, NormalizeError>;
    type SerializeStruct = Impossible<String, NormalizeError>;
    type SerializeStructVariant = Impossible<String, NormalizeError>;

    display_keys! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
    }

    rejected_keys! {
        serialize_f32: f32 => "f32",
        serialize_f64: f64 => "f64",
        serialize_bytes: &[u8] => "bytes",
    }

    fn serialize_str(self, v: &str) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_none(self) -> Result<String> {
        Err(key_error("none"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(key_error("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String> {
        Err(key_error(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<String> {
        Err(key_error(variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_error("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_error("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_error(name))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_error(variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_error("map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_error(name))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_error(variant))
    }
}
