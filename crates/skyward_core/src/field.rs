use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::ByteRange;
use crate::reader::{BigEndianReader, BigEndianWriter};

/// How the bytes behind a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    U8,
    U16,
    U32,
    U64,
    /// Three consecutive big-endian `f32`s.
    Vec3,
    /// One bit inside a byte, selected by mask.
    Bit(u8),
    /// NUL-padded ASCII of the given byte width.
    Ascii(usize),
    /// NUL-padded UTF-16BE of the given code-unit width.
    Utf16(usize),
}

impl Encoding {
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::Bit(_) => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
            Self::Vec3 => 12,
            Self::Ascii(n) => n,
            Self::Utf16(n) => n * 2,
        }
    }
}

/// Offset + encoding of one typed value, relative to the start of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub offset: usize,
    pub encoding: Encoding,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, offset: usize, encoding: Encoding) -> Self {
        Self {
            name,
            offset,
            encoding,
        }
    }

    pub const fn bit(name: &'static str, offset: usize, mask: u8) -> Self {
        Self::new(name, offset, Encoding::Bit(mask))
    }

    pub const fn width(&self) -> usize {
        self.encoding.width()
    }

    pub const fn range(&self) -> ByteRange {
        ByteRange {
            start: self.offset,
            end: self.offset + self.width(),
        }
    }

    /// Same field moved `delta` bytes further into the slot.
    pub const fn shifted(self, delta: usize) -> Self {
        Self::new(self.name, self.offset + delta, self.encoding)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A Rust type that can be stored in a slot field.
///
/// `accepts` decides which encodings the type may be used with; reading a
/// field through a type that does not accept its encoding is a caller bug.
pub trait FieldType: Sized {
    fn accepts(encoding: Encoding) -> bool;
    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self;
    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor);
}

impl FieldType for u8 {
    fn accepts(encoding: Encoding) -> bool {
        encoding == Encoding::U8
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        reader.read_u8(field.offset)
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        writer.write_u8(field.offset, *self);
    }
}

impl FieldType for u16 {
    fn accepts(encoding: Encoding) -> bool {
        encoding == Encoding::U16
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        reader.read_u16(field.offset)
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        writer.write_u16(field.offset, *self);
    }
}

impl FieldType for u32 {
    fn accepts(encoding: Encoding) -> bool {
        encoding == Encoding::U32
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        reader.read_u32(field.offset)
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        writer.write_u32(field.offset, *self);
    }
}

impl FieldType for u64 {
    fn accepts(encoding: Encoding) -> bool {
        encoding == Encoding::U64
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        reader.read_u64(field.offset)
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        writer.write_u64(field.offset, *self);
    }
}

impl FieldType for bool {
    fn accepts(encoding: Encoding) -> bool {
        matches!(encoding, Encoding::Bit(mask) if mask != 0)
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        let Encoding::Bit(mask) = field.encoding else {
            unreachable!("bool accepted a non-bit encoding");
        };
        reader.read_u8(field.offset) & mask != 0
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        let Encoding::Bit(mask) = field.encoding else {
            unreachable!("bool accepted a non-bit encoding");
        };
        let current = writer.read_u8(field.offset);
        let next = if *self {
            current | mask
        } else {
            current & !mask
        };
        writer.write_u8(field.offset, next);
    }
}

impl FieldType for Vec3 {
    fn accepts(encoding: Encoding) -> bool {
        encoding == Encoding::Vec3
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        let [x, y, z] = reader.read_f32_array::<3>(field.offset);
        Vec3 { x, y, z }
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        writer.write_f32_array(field.offset, [self.x, self.y, self.z]);
    }
}

impl FieldType for String {
    fn accepts(encoding: Encoding) -> bool {
        matches!(encoding, Encoding::Ascii(_) | Encoding::Utf16(_))
    }

    fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        match field.encoding {
            Encoding::Ascii(n) => reader.read_fixed_string(field.offset, n),
            Encoding::Utf16(n) => reader.read_utf16_string(field.offset, n),
            _ => unreachable!("String accepted a non-text encoding"),
        }
    }

    fn encode(&self, writer: &mut BigEndianWriter<'_>, field: &FieldDescriptor) {
        match field.encoding {
            Encoding::Ascii(n) => writer.write_fixed_string(field.offset, n, self),
            Encoding::Utf16(n) => writer.write_utf16_string(field.offset, n, self),
            _ => unreachable!("String accepted a non-text encoding"),
        }
    }
}

/// A field value of any encoding, for callers that walk descriptors
/// generically (dumps, JSON export).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(u64),
    Flag(bool),
    Vector(Vec3),
    Text(String),
}

impl FieldValue {
    pub fn decode(reader: &BigEndianReader<'_>, field: &FieldDescriptor) -> Self {
        match field.encoding {
            Encoding::U8 => Self::Integer(u8::decode(reader, field).into()),
            Encoding::U16 => Self::Integer(u16::decode(reader, field).into()),
            Encoding::U32 => Self::Integer(u32::decode(reader, field).into()),
            Encoding::U64 => Self::Integer(u64::decode(reader, field)),
            Encoding::Bit(_) => Self::Flag(bool::decode(reader, field)),
            Encoding::Vec3 => Self::Vector(Vec3::decode(reader, field)),
            Encoding::Ascii(_) | Encoding::Utf16(_) => Self::Text(String::decode(reader, field)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
            Self::Vector(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}
