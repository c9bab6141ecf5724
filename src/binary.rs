//! Binary ("portable") object format
//!
//! A binary object is a self-describing encoding of a typed record. Any single
//! field can be read by name without decoding the rest of the record, which is
//! what lets caches hand out values in binary form instead of deserializing
//! them into user types.
//!
//! ## Layout
//!
//! All integers are little-endian.
//!
//! ```text
//! 0   magic        u8   (0x67)
//! 1   version      u8   (1)
//! 2   flags        u16  (reserved)
//! 4   type_id      i32  (FNV-1a of the lowercase type name)
//! 8   total_len    u32
//! 12  schema_off   u32
//! 16  field_count  u16
//! 18  name_len     u16
//! 20  type name    [u8; name_len]
//!     field values (tag u8 + payload), one per field
//!     schema       field_count x (field_id i32, value_off u32, name_len u16, name)
//! ```
//!
//! Nested objects are stored whole, so a nested field is returned as a
//! zero-copy slice of the parent's buffer.

use crate::error::{GridError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use smallvec::SmallVec;
use std::fmt;

const MAGIC: u8 = 0x67;
const VERSION: u8 = 1;
const HEADER_LEN: usize = 20;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_I32: u8 = 2;
const TAG_I64: u8 = 3;
const TAG_F64: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_TIMESTAMP: u8 = 6;
const TAG_ENUM: u8 = 7;
const TAG_OBJECT: u8 = 8;
const TAG_BYTES: u8 = 9;

/// Stable identifier derived from a type or field name (case-insensitive)
pub fn name_id(name: &str) -> i32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= byte.to_ascii_lowercase() as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash as i32
}

/// Enum value stored as its type id and ordinal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BinaryEnum {
    pub type_id: i32,
    pub ordinal: i32,
}

/// A single field value of a binary object
#[derive(Clone, Debug, PartialEq)]
pub enum BinaryValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Enum(BinaryEnum),
    Object(BinaryObject),
    Bytes(Bytes),
}

impl BinaryValue {
    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            BinaryValue::Null => "null",
            BinaryValue::Bool(_) => "bool",
            BinaryValue::I32(_) => "i32",
            BinaryValue::I64(_) => "i64",
            BinaryValue::F64(_) => "f64",
            BinaryValue::String(_) => "string",
            BinaryValue::Timestamp(_) => "timestamp",
            BinaryValue::Enum(_) => "enum",
            BinaryValue::Object(_) => "object",
            BinaryValue::Bytes(_) => "bytes",
        }
    }

    /// Render the value as JSON, nested objects included
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BinaryValue::Null => serde_json::Value::Null,
            BinaryValue::Bool(v) => serde_json::Value::from(*v),
            BinaryValue::I32(v) => serde_json::Value::from(*v),
            BinaryValue::I64(v) => serde_json::Value::from(*v),
            BinaryValue::F64(v) => serde_json::Value::from(*v),
            BinaryValue::String(v) => serde_json::Value::from(v.as_str()),
            BinaryValue::Timestamp(v) => serde_json::Value::from(v.to_rfc3339()),
            BinaryValue::Enum(v) => serde_json::json!({ "ordinal": v.ordinal }),
            BinaryValue::Object(v) => v.to_json(),
            BinaryValue::Bytes(v) => serde_json::Value::from(v.to_vec()),
        }
    }

    fn encode(&self, out: &mut BytesMut) {
        match self {
            BinaryValue::Null => out.put_u8(TAG_NULL),
            BinaryValue::Bool(v) => {
                out.put_u8(TAG_BOOL);
                out.put_u8(*v as u8);
            }
            BinaryValue::I32(v) => {
                out.put_u8(TAG_I32);
                out.put_i32_le(*v);
            }
            BinaryValue::I64(v) => {
                out.put_u8(TAG_I64);
                out.put_i64_le(*v);
            }
            BinaryValue::F64(v) => {
                out.put_u8(TAG_F64);
                out.put_f64_le(*v);
            }
            BinaryValue::String(v) => {
                out.put_u8(TAG_STRING);
                out.put_u32_le(v.len() as u32);
                out.put_slice(v.as_bytes());
            }
            BinaryValue::Timestamp(v) => {
                out.put_u8(TAG_TIMESTAMP);
                out.put_i64_le(v.timestamp());
                out.put_u32_le(v.timestamp_subsec_nanos());
            }
            BinaryValue::Enum(v) => {
                out.put_u8(TAG_ENUM);
                out.put_i32_le(v.type_id);
                out.put_i32_le(v.ordinal);
            }
            BinaryValue::Object(v) => {
                out.put_u8(TAG_OBJECT);
                out.put_slice(v.as_bytes());
            }
            BinaryValue::Bytes(v) => {
                out.put_u8(TAG_BYTES);
                out.put_u32_le(v.len() as u32);
                out.put_slice(v);
            }
        }
    }
}

impl fmt::Display for BinaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryValue::Null => write!(f, "null"),
            BinaryValue::Bool(v) => write!(f, "{}", v),
            BinaryValue::I32(v) => write!(f, "{}", v),
            BinaryValue::I64(v) => write!(f, "{}", v),
            BinaryValue::F64(v) => write!(f, "{}", v),
            BinaryValue::String(v) => write!(f, "{}", v),
            BinaryValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            BinaryValue::Enum(v) => write!(f, "enum#{}", v.ordinal),
            BinaryValue::Object(v) => write!(f, "{}", v),
            BinaryValue::Bytes(v) => write!(f, "{} bytes", v.len()),
        }
    }
}

macro_rules! impl_from_for_binary_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for BinaryValue {
                fn from(v: $ty) -> Self {
                    BinaryValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_binary_value! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    f64 => F64,
    String => String,
    DateTime<Utc> => Timestamp,
    BinaryEnum => Enum,
    BinaryObject => Object,
    Bytes => Bytes,
}

impl From<&str> for BinaryValue {
    fn from(v: &str) -> Self {
        BinaryValue::String(v.to_string())
    }
}

impl<T: Into<BinaryValue>> From<Option<T>> for BinaryValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BinaryValue::Null)
    }
}

/// Conversion from a decoded field value into a concrete Rust type
pub trait FromBinaryValue: Sized {
    fn from_binary_value(field: &str, value: BinaryValue) -> Result<Self>;
}

macro_rules! impl_from_binary_value {
    ($($ty:ty => $variant:ident, $expected:literal),* $(,)?) => {
        $(
            impl FromBinaryValue for $ty {
                fn from_binary_value(field: &str, value: BinaryValue) -> Result<Self> {
                    match value {
                        BinaryValue::$variant(v) => Ok(v),
                        other => Err(GridError::FieldType {
                            field: field.to_string(),
                            expected: $expected,
                            actual: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_from_binary_value! {
    bool => Bool, "bool",
    i32 => I32, "i32",
    i64 => I64, "i64",
    f64 => F64, "f64",
    String => String, "string",
    DateTime<Utc> => Timestamp, "timestamp",
    BinaryEnum => Enum, "enum",
    BinaryObject => Object, "object",
    Bytes => Bytes, "bytes",
}

impl<T: FromBinaryValue> FromBinaryValue for Option<T> {
    fn from_binary_value(field: &str, value: BinaryValue) -> Result<Self> {
        match value {
            BinaryValue::Null => Ok(None),
            other => T::from_binary_value(field, other).map(Some),
        }
    }
}

/// A Rust type with a binary object representation
pub trait BinaryType: Sized {
    /// Type name recorded in the object header
    const TYPE_NAME: &'static str;

    fn write_binary(&self, builder: &mut BinaryObjectBuilder);

    fn read_binary(object: &BinaryObject) -> Result<Self>;

    fn to_binary(&self) -> Result<BinaryObject> {
        let mut builder = BinaryObjectBuilder::new(Self::TYPE_NAME);
        self.write_binary(&mut builder);
        builder.build()
    }
}

/// A Rust enum stored by ordinal
pub trait BinaryEnumType: Sized {
    const TYPE_NAME: &'static str;

    fn ordinal(&self) -> i32;

    fn from_ordinal(ordinal: i32) -> Option<Self>;

    fn to_binary_enum(&self) -> BinaryEnum {
        BinaryEnum {
            type_id: name_id(Self::TYPE_NAME),
            ordinal: self.ordinal(),
        }
    }
}

/// Bounds-checked little-endian reader over an object buffer
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                GridError::binary(format!(
                    "read of {} bytes at offset {} exceeds buffer of {}",
                    len,
                    self.pos,
                    self.buf.len()
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }

    fn i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_le_bytes(raw))
    }

    fn str(&mut self, len: usize) -> Result<&'a str> {
        std::str::from_utf8(self.take(len)?)
            .map_err(|e| GridError::binary(format!("invalid UTF-8: {}", e)))
    }
}

/// Parsed schema entry pointing at a field value
#[derive(Clone, Debug)]
struct SchemaEntry {
    field_id: i32,
    offset: u32,
    name: (usize, usize),
}

/// An encoded record whose fields can be read individually
#[derive(Clone)]
pub struct BinaryObject {
    bytes: Bytes,
    type_id: i32,
    type_name_len: usize,
    schema: SmallVec<[SchemaEntry; 8]>,
}

impl BinaryObject {
    /// Parse and validate an encoded object
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut cur = Cursor::at(&bytes, 0);
        if cur.u8()? != MAGIC {
            return Err(GridError::binary("bad magic byte"));
        }
        let version = cur.u8()?;
        if version != VERSION {
            return Err(GridError::binary(format!("unsupported version {}", version)));
        }
        let _flags = cur.u16()?;
        let type_id = cur.i32()?;
        let total_len = cur.u32()? as usize;
        if total_len != bytes.len() {
            return Err(GridError::binary(format!(
                "length mismatch: header says {}, buffer has {}",
                total_len,
                bytes.len()
            )));
        }
        let schema_offset = cur.u32()? as usize;
        let field_count = cur.u16()? as usize;
        let type_name_len = cur.u16()? as usize;
        let type_name = cur.str(type_name_len)?;
        if name_id(type_name) != type_id {
            return Err(GridError::binary(format!(
                "type id does not match type name '{}'",
                type_name
            )));
        }
        let values_start = cur.pos;
        if schema_offset < values_start || schema_offset > bytes.len() {
            return Err(GridError::binary("schema offset out of bounds"));
        }

        let mut schema = SmallVec::with_capacity(field_count);
        let mut cur = Cursor::at(&bytes, schema_offset);
        for _ in 0..field_count {
            let field_id = cur.i32()?;
            let offset = cur.u32()?;
            let name_len = cur.u16()? as usize;
            let name_start = cur.pos;
            let name = cur.str(name_len)?;
            if name_id(name) != field_id {
                return Err(GridError::binary(format!(
                    "field id does not match field name '{}'",
                    name
                )));
            }
            if (offset as usize) < values_start || (offset as usize) >= schema_offset {
                return Err(GridError::binary(format!(
                    "field '{}' offset {} out of bounds",
                    name, offset
                )));
            }
            schema.push(SchemaEntry {
                field_id,
                offset,
                name: (name_start, name_len),
            });
        }
        if cur.pos != bytes.len() {
            return Err(GridError::binary("trailing bytes after schema"));
        }

        Ok(Self {
            bytes,
            type_id,
            type_name_len,
            schema,
        })
    }

    /// Type name recorded in the header
    pub fn type_name(&self) -> &str {
        self.slice_str(HEADER_LEN, self.type_name_len)
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    /// Encoded form of the object
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Field names in the order they were written
    pub fn field_names(&self) -> Vec<&str> {
        self.schema
            .iter()
            .map(|entry| self.slice_str(entry.name.0, entry.name.1))
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Read a single field, decoding only that field's value
    pub fn field(&self, name: &str) -> Result<Option<BinaryValue>> {
        match self.find(name) {
            Some(entry) => self.decode_at(entry.offset as usize).map(Some),
            None => Ok(None),
        }
    }

    /// Read a field that must be present, converted to `T`
    pub fn field_as<T: FromBinaryValue>(&self, name: &str) -> Result<T> {
        let value = self.field(name)?.ok_or_else(|| GridError::MissingField {
            type_name: self.type_name().to_string(),
            field: name.to_string(),
        })?;
        T::from_binary_value(name, value)
    }

    /// Read a nested object field and deserialize it
    pub fn field_object<T: BinaryType>(&self, name: &str) -> Result<T> {
        self.field_as::<BinaryObject>(name)?.deserialize()
    }

    /// Read an enum field by ordinal
    pub fn field_enum<E: BinaryEnumType>(&self, name: &str) -> Result<E> {
        let value = self.field_as::<BinaryEnum>(name)?;
        if value.type_id != name_id(E::TYPE_NAME) {
            return Err(GridError::binary(format!(
                "field '{}' is not an enum of type {}",
                name,
                E::TYPE_NAME
            )));
        }
        E::from_ordinal(value.ordinal).ok_or_else(|| {
            GridError::binary(format!(
                "ordinal {} is not a valid {}",
                value.ordinal,
                E::TYPE_NAME
            ))
        })
    }

    /// Reconstruct the typed value
    pub fn deserialize<T: BinaryType>(&self) -> Result<T> {
        if self.type_id != name_id(T::TYPE_NAME) {
            return Err(GridError::binary(format!(
                "cannot deserialize {} as {}",
                self.type_name(),
                T::TYPE_NAME
            )));
        }
        T::read_binary(self)
    }

    /// Builder pre-populated with every field of this object
    pub fn to_builder(&self) -> Result<BinaryObjectBuilder> {
        let mut builder = BinaryObjectBuilder::new(self.type_name());
        for entry in &self.schema {
            let name = self.slice_str(entry.name.0, entry.name.1);
            builder.set_field(name, self.decode_at(entry.offset as usize)?);
        }
        Ok(builder)
    }

    /// Render every field as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for entry in &self.schema {
            let name = self.slice_str(entry.name.0, entry.name.1);
            let value = self
                .decode_at(entry.offset as usize)
                .map(|v| v.to_json())
                .unwrap_or(serde_json::Value::Null);
            map.insert(name.to_string(), value);
        }
        serde_json::Value::Object(map)
    }

    fn find(&self, name: &str) -> Option<&SchemaEntry> {
        let id = name_id(name);
        self.schema.iter().find(|entry| {
            entry.field_id == id
                && self
                    .slice_str(entry.name.0, entry.name.1)
                    .eq_ignore_ascii_case(name)
        })
    }

    // Offsets were validated in from_bytes
    fn slice_str(&self, start: usize, len: usize) -> &str {
        std::str::from_utf8(&self.bytes[start..start + len]).unwrap_or_default()
    }

    fn decode_at(&self, offset: usize) -> Result<BinaryValue> {
        let mut cur = Cursor::at(&self.bytes, offset);
        let value = match cur.u8()? {
            TAG_NULL => BinaryValue::Null,
            TAG_BOOL => BinaryValue::Bool(cur.u8()? != 0),
            TAG_I32 => BinaryValue::I32(cur.i32()?),
            TAG_I64 => BinaryValue::I64(cur.i64()?),
            TAG_F64 => BinaryValue::F64(f64::from_bits(cur.i64()? as u64)),
            TAG_STRING => {
                let len = cur.u32()? as usize;
                BinaryValue::String(cur.str(len)?.to_string())
            }
            TAG_TIMESTAMP => {
                let secs = cur.i64()?;
                let nanos = cur.u32()?;
                let ts = DateTime::from_timestamp(secs, nanos)
                    .ok_or_else(|| GridError::binary("timestamp out of range"))?;
                BinaryValue::Timestamp(ts)
            }
            TAG_ENUM => BinaryValue::Enum(BinaryEnum {
                type_id: cur.i32()?,
                ordinal: cur.i32()?,
            }),
            TAG_OBJECT => {
                let start = cur.pos;
                let mut header = Cursor::at(&self.bytes, start + 8);
                let len = header.u32()? as usize;
                cur.take(len)?;
                BinaryValue::Object(BinaryObject::from_bytes(
                    self.bytes.slice(start..start + len),
                )?)
            }
            TAG_BYTES => {
                let len = cur.u32()? as usize;
                let start = cur.pos;
                cur.take(len)?;
                BinaryValue::Bytes(self.bytes.slice(start..start + len))
            }
            tag => return Err(GridError::binary(format!("unknown value tag {}", tag))),
        };
        Ok(value)
    }
}

impl PartialEq for BinaryObject {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl fmt::Debug for BinaryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryObject")
            .field("type_name", &self.type_name())
            .field("fields", &self.field_names())
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl fmt::Display for BinaryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.type_name())?;
        for (i, entry) in self.schema.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let name = self.slice_str(entry.name.0, entry.name.1);
            match self.decode_at(entry.offset as usize) {
                Ok(value) => write!(f, "{}={}", name, value)?,
                Err(_) => write!(f, "{}=<corrupt>", name)?,
            }
        }
        write!(f, "]")
    }
}

/// Assembles a binary object field by field
#[derive(Clone, Debug)]
pub struct BinaryObjectBuilder {
    type_name: String,
    fields: SmallVec<[(String, BinaryValue); 8]>,
    /// First nested object that failed to build, reported by `build`
    nested_error: Option<String>,
}

impl BinaryObjectBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: SmallVec::new(),
            nested_error: None,
        }
    }

    /// Set a field, replacing any existing field with the same name
    pub fn set_field(&mut self, name: &str, value: impl Into<BinaryValue>) -> &mut Self {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    pub fn set_enum<E: BinaryEnumType>(&mut self, name: &str, value: &E) -> &mut Self {
        self.set_field(name, value.to_binary_enum())
    }

    pub fn set_object<T: BinaryType>(&mut self, name: &str, value: &T) -> &mut Self {
        match value.to_binary() {
            Ok(object) => self.set_field(name, object),
            Err(e) => {
                self.nested_error
                    .get_or_insert_with(|| format!("field '{}': {}", name, e));
                self
            }
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<BinaryValue> {
        let idx = self
            .fields
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(idx).1)
    }

    pub fn build(&self) -> Result<BinaryObject> {
        if let Some(message) = &self.nested_error {
            return Err(GridError::binary(message.clone()));
        }
        if self.fields.len() > u16::MAX as usize {
            return Err(GridError::binary(format!(
                "{} fields exceed the limit of {}",
                self.fields.len(),
                u16::MAX
            )));
        }
        check_name_len("type name", &self.type_name)?;
        for (name, _) in &self.fields {
            check_name_len("field name", name)?;
        }

        let mut out = BytesMut::with_capacity(64);
        out.put_u8(MAGIC);
        out.put_u8(VERSION);
        out.put_u16_le(0);
        out.put_i32_le(name_id(&self.type_name));
        out.put_u32_le(0); // total_len, patched below
        out.put_u32_le(0); // schema_off, patched below
        out.put_u16_le(self.fields.len() as u16);
        out.put_u16_le(self.type_name.len() as u16);
        out.put_slice(self.type_name.as_bytes());

        let mut offsets = SmallVec::<[u32; 8]>::with_capacity(self.fields.len());
        for (_, value) in &self.fields {
            offsets.push(out.len() as u32);
            value.encode(&mut out);
        }

        let schema_offset = out.len() as u32;
        for ((name, _), offset) in self.fields.iter().zip(offsets) {
            out.put_i32_le(name_id(name));
            out.put_u32_le(offset);
            out.put_u16_le(name.len() as u16);
            out.put_slice(name.as_bytes());
        }

        if out.len() > u32::MAX as usize {
            return Err(GridError::binary(format!(
                "object of {} bytes exceeds the 4GB limit",
                out.len()
            )));
        }
        let total_len = out.len() as u32;
        out[8..12].copy_from_slice(&total_len.to_le_bytes());
        out[12..16].copy_from_slice(&schema_offset.to_le_bytes());

        let bytes = out.freeze();
        let type_name_len = self.type_name.len();
        let mut schema = SmallVec::with_capacity(self.fields.len());
        let mut cur = Cursor::at(&bytes, schema_offset as usize);
        for _ in 0..self.fields.len() {
            // The buffer was written just above, so these reads cannot fail
            let field_id = cur.i32().unwrap_or_default();
            let offset = cur.u32().unwrap_or_default();
            let name_len = cur.u16().unwrap_or_default() as usize;
            let name_start = cur.pos;
            cur.pos += name_len;
            schema.push(SchemaEntry {
                field_id,
                offset,
                name: (name_start, name_len),
            });
        }

        Ok(BinaryObject {
            type_id: name_id(&self.type_name),
            bytes,
            type_name_len,
            schema,
        })
    }
}

fn check_name_len(what: &str, name: &str) -> Result<()> {
    if name.len() > u16::MAX as usize {
        return Err(GridError::binary(format!(
            "{} of {} bytes exceeds the limit of {}",
            what,
            name.len(),
            u16::MAX
        )));
    }
    Ok(())
}
