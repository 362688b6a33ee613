//
// value.rs
// Dicom-Inspect-rs
//
// Element tree model: tags, elements and the closed set of value kinds an element can carry.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::frame::Frame;

/// A DICOM attribute tag, ordered by group then element number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub group: u16,
    pub element: u16,
}

impl Tag {
    /// (7FE0,0010) Pixel Data
    pub const PIXEL_DATA: Tag = Tag::new(0x7fe0, 0x0010);
    /// (FFFE,E000) Item, the container of one sequence item
    pub const ITEM: Tag = Tag::new(0xfffe, 0xe000);

    pub const fn new(group: u16, element: u16) -> Self {
        Tag { group, element }
    }

    /// Odd groups hold private tags.
    pub const fn is_private(self) -> bool {
        self.group % 2 == 1
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x},{:04x}", self.group, self.element)
    }
}

impl FromStr for Tag {
    type Err = Error;

    /// Parses `gggg,eeee` (hex, case-insensitive, optional surrounding parentheses).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let invalid = || Error::InvalidDictionary(format!("malformed tag {s:?}"));
        let (group, element) = trimmed.split_once(',').ok_or_else(invalid)?;
        let group = u16::from_str_radix(group.trim(), 16).map_err(|_| invalid())?;
        let element = u16::from_str_radix(element.trim(), 16).map_err(|_| invalid())?;
        Ok(Tag { group, element })
    }
}

impl From<dicom::core::Tag> for Tag {
    fn from(tag: dicom::core::Tag) -> Self {
        Tag::new(tag.group(), tag.element())
    }
}

impl From<Tag> for dicom::core::Tag {
    fn from(tag: Tag) -> Self {
        dicom::core::Tag(tag.group, tag.element)
    }
}

/// One attribute of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    /// Value representation exactly as declared in the source.
    pub vr: String,
    /// Declared value length in bytes.
    pub length: u32,
    pub value: Value,
}

impl Element {
    pub fn new(tag: Tag, vr: impl Into<String>, length: u32, value: Value) -> Self {
        Element {
            tag,
            vr: vr.into(),
            length,
            value,
        }
    }
}

/// A nested element list inside a sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceItem {
    pub elements: Vec<Element>,
}

impl SequenceItem {
    pub fn new(elements: Vec<Element>) -> Self {
        SequenceItem { elements }
    }
}

/// Pixel data frames plus the encapsulation flag of the whole element.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDataInfo {
    pub is_encapsulated: bool,
    pub frames: Vec<Frame>,
}

/// The value of an element. The variant is fixed when the element is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Strings(Vec<String>),
    Bytes(Vec<u8>),
    Ints(Vec<i64>),
    UInts(Vec<u64>),
    Floats(Vec<f64>),
    PixelData(PixelDataInfo),
    Sequences(Vec<SequenceItem>),
    /// Only carried by item container elements (pseudo-VR `na`).
    SequenceItem(SequenceItem),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Strings(_) => ValueKind::Strings,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Ints(_) => ValueKind::Ints,
            Value::UInts(_) => ValueKind::UInts,
            Value::Floats(_) => ValueKind::Floats,
            Value::PixelData(_) => ValueKind::PixelData,
            Value::Sequences(_) => ValueKind::Sequences,
            Value::SequenceItem(_) => ValueKind::SequenceItem,
        }
    }

    /// An empty value of the given kind.
    pub fn empty(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Strings => Value::Strings(Vec::new()),
            ValueKind::Bytes => Value::Bytes(Vec::new()),
            ValueKind::Ints => Value::Ints(Vec::new()),
            ValueKind::UInts => Value::UInts(Vec::new()),
            ValueKind::Floats => Value::Floats(Vec::new()),
            ValueKind::PixelData => Value::PixelData(PixelDataInfo {
                is_encapsulated: false,
                frames: Vec::new(),
            }),
            ValueKind::Sequences => Value::Sequences(Vec::new()),
            ValueKind::SequenceItem => Value::SequenceItem(SequenceItem::default()),
        }
    }
}

/// Discriminant of [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Strings,
    Bytes,
    Ints,
    UInts,
    Floats,
    PixelData,
    Sequences,
    SequenceItem,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Strings => "Strings",
            ValueKind::Bytes => "Bytes",
            ValueKind::Ints => "Ints",
            ValueKind::UInts => "UInts",
            ValueKind::Floats => "Floats",
            ValueKind::PixelData => "PixelData",
            ValueKind::Sequences => "Sequences",
            ValueKind::SequenceItem => "SequenceItem",
        };
        f.write_str(name)
    }
}
