use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::value::{PrimitiveValue, Value as DicomValue};
use dicom::core::VR;
use dicom::dictionary_std::{tags, StandardDataDictionary};
use dicom::object::mem::InMemElement;
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};

use crate::frame::{EncapsulatedFrame, Frame, NativeFrame};
use crate::validate;
use crate::value::{Element, PixelDataInfo, SequenceItem, Tag, Value};

/// Small helper trait to pull numeric attributes out of a dataset or sequence item.
pub trait ElementAccess {
    fn element_u32(&self, tag: dicom::core::Tag) -> Option<u32>;
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_u32(&self, tag: dicom::core::Tag) -> Option<u32> {
        self.element(tag).ok().and_then(|e| e.to_int::<u32>().ok())
    }
}

/// Opens a DICOM file, keeping the codec object for write-back alongside the element list.
pub fn load(path: &Path) -> Result<(DefaultDicomObject, Vec<Element>)> {
    let obj = open_file(path).context("Failed to open DICOM file")?;
    let elements = dataset_from_object(&obj);
    tracing::debug!("loaded {} top-level elements from {:?}", elements.len(), path);
    Ok((obj, elements))
}

/// Opens a DICOM file and returns its elements in file order.
pub fn load_dataset(path: &Path) -> Result<Vec<Element>> {
    load(path).map(|(_, elements)| elements)
}

/// Re-encodes the codec object to `output`.
pub fn write_copy(obj: &DefaultDicomObject, output: &Path) -> Result<()> {
    obj.write_to_file(output)
        .with_context(|| format!("Failed to write DICOM file {:?}", output))?;
    tracing::debug!("DICOM written to {:?}", output);
    Ok(())
}

/// Converts every element of a dataset (or sequence item), recursing into sequences.
pub fn dataset_from_object(obj: &InMemDicomObject<StandardDataDictionary>) -> Vec<Element> {
    obj.iter().map(|elem| convert_element(obj, elem)).collect()
}

fn convert_element(
    parent: &InMemDicomObject<StandardDataDictionary>,
    elem: &InMemElement<StandardDataDictionary>,
) -> Element {
    let header = elem.header();
    let tag = Tag::from(header.tag);
    let vr = String::from(header.vr.to_string());

    let value = match elem.value() {
        DicomValue::Primitive(p) if tag == Tag::PIXEL_DATA => Value::PixelData(PixelDataInfo {
            is_encapsulated: false,
            frames: native_frames(parent, &p.to_bytes()),
        }),
        DicomValue::Primitive(p) => convert_primitive(tag, header.vr, &vr, p),
        DicomValue::Sequence(seq) => Value::Sequences(
            seq.items()
                .iter()
                .map(|item| SequenceItem::new(dataset_from_object(item)))
                .collect(),
        ),
        DicomValue::PixelSequence(seq) => Value::PixelData(PixelDataInfo {
            is_encapsulated: true,
            frames: encapsulated_frames(parent, seq.offset_table(), seq.fragments()),
        }),
    };

    Element::new(tag, vr, header.len.0, value)
}

fn convert_primitive(tag: Tag, vr: VR, vr_code: &str, p: &PrimitiveValue) -> Value {
    if matches!(vr, VR::OB | VR::OW) {
        return Value::Bytes(p.to_bytes().into_owned());
    }

    match p {
        PrimitiveValue::Empty => Value::empty(validate::expected_kind(tag, vr_code)),
        PrimitiveValue::Strs(values) => Value::Strings(values.iter().cloned().collect()),
        PrimitiveValue::Str(value) => Value::Strings(vec![value.clone()]),
        PrimitiveValue::Tags(values) => Value::Strings(
            values
                .iter()
                .map(|t| Tag::from(*t).to_string())
                .collect(),
        ),
        PrimitiveValue::U8(values) => Value::Bytes(values.to_vec()),
        PrimitiveValue::I16(values) => Value::Ints(values.iter().map(|&v| i64::from(v)).collect()),
        PrimitiveValue::I32(values) => Value::Ints(values.iter().map(|&v| i64::from(v)).collect()),
        PrimitiveValue::I64(values) => Value::Ints(values.to_vec()),
        PrimitiveValue::U16(values) => Value::Ints(values.iter().map(|&v| i64::from(v)).collect()),
        PrimitiveValue::U32(values) => Value::Ints(values.iter().map(|&v| i64::from(v)).collect()),
        PrimitiveValue::U64(values) => Value::UInts(values.to_vec()),
        PrimitiveValue::F32(values) => Value::Floats(values.iter().map(|&v| f64::from(v)).collect()),
        PrimitiveValue::F64(values) => Value::Floats(values.to_vec()),
        // dates, times and date-times
        other => Value::Strings(other.to_multi_str().into_owned()),
    }
}

struct Geometry {
    rows: u32,
    cols: u32,
    samples_per_pixel: u16,
    bits_allocated: u16,
    number_of_frames: u32,
}

impl Geometry {
    fn of<T: ElementAccess>(obj: &T) -> Self {
        Geometry {
            rows: obj.element_u32(tags::ROWS).unwrap_or(0),
            cols: obj.element_u32(tags::COLUMNS).unwrap_or(0),
            samples_per_pixel: obj
                .element_u32(tags::SAMPLES_PER_PIXEL)
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(1),
            bits_allocated: obj
                .element_u32(tags::BITS_ALLOCATED)
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(8),
            number_of_frames: obj.element_u32(tags::NUMBER_OF_FRAMES).unwrap_or(1).max(1),
        }
    }

    /// Bytes per frame, `None` on overflow.
    fn frame_len(&self) -> Option<usize> {
        (self.rows as usize)
            .checked_mul(self.cols as usize)?
            .checked_mul(self.samples_per_pixel as usize)?
            .checked_mul(self.bits_allocated as usize / 8)
    }

    fn native(&self, data: Vec<u8>) -> Frame {
        Frame::Native(NativeFrame {
            rows: self.rows,
            cols: self.cols,
            samples_per_pixel: self.samples_per_pixel,
            bits_per_sample: self.bits_allocated,
            data,
        })
    }
}

/// Splits a native pixel buffer into frames. Short trailing frames are kept
/// as is so that decoding reports the bounds violation.
///
/// The declared frame count is capped by what the buffer can hold.
fn native_frames<T: ElementAccess>(obj: &T, bytes: &[u8]) -> Vec<Frame> {
    let geometry = Geometry::of(obj);
    let frame_len = match geometry.frame_len() {
        Some(len) if len > 0 => len,
        _ => return vec![geometry.native(bytes.to_vec())],
    };

    let declared = geometry.number_of_frames as usize;
    let available = bytes.len().div_ceil(frame_len).max(1);
    if declared > available {
        tracing::warn!(
            "{} frames declared but pixel data holds at most {}; reading {}",
            declared,
            available,
            available
        );
    }

    (0..declared.min(available))
        .map(|i| {
            let start = i.saturating_mul(frame_len).min(bytes.len());
            let end = start.saturating_add(frame_len).min(bytes.len());
            geometry.native(bytes[start..end].to_vec())
        })
        .collect()
}

/// Groups encapsulated fragments into frames.
fn encapsulated_frames<T: ElementAccess>(
    obj: &T,
    offset_table: &[u32],
    fragments: &[Vec<u8>],
) -> Vec<Frame> {
    let number_of_frames = Geometry::of(obj).number_of_frames as usize;
    let encapsulated = |data: Vec<u8>| Frame::Encapsulated(EncapsulatedFrame { data });

    if fragments.is_empty() {
        return Vec::new();
    }
    if number_of_frames == 1 {
        return vec![encapsulated(fragments.concat())];
    }
    if fragments.len() == number_of_frames || offset_table.len() != number_of_frames {
        if fragments.len() != number_of_frames {
            tracing::warn!(
                "{} fragments for {} frames and no usable offset table; one frame per fragment",
                fragments.len(),
                number_of_frames
            );
        }
        return fragments.iter().cloned().map(encapsulated).collect();
    }

    // Offsets point at each frame's first fragment item, counted from the
    // first fragment and including 8 bytes of item header per fragment.
    let mut frames: Vec<Vec<u8>> = vec![Vec::new(); number_of_frames];
    let mut position: u64 = 0;
    for fragment in fragments {
        let index = offset_table
            .iter()
            .rposition(|&offset| u64::from(offset) <= position)
            .unwrap_or(0);
        frames[index].extend_from_slice(fragment);
        position += 8 + fragment.len() as u64;
    }
    frames.into_iter().map(encapsulated).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::value::DataSetSequence;
    use dicom::core::{DataElement, Tag as DicomTag};
    use dicom::object::InMemDicomObject;

    fn geometry_object(rows: u16, cols: u16, spp: u16, bits: u16, frames: &str) -> InMemDicomObject {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(cols)));
        obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(spp)));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(bits)));
        obj.put(DataElement::new(tags::NUMBER_OF_FRAMES, VR::IS, PrimitiveValue::from(frames)));
        obj
    }

    #[test]
    fn primitives_are_classified_by_representation() {
        let tag = Tag::new(0x0015, 0x0001);
        assert_eq!(
            convert_primitive(tag, VR::US, "US", &PrimitiveValue::from(512_u16)),
            Value::Ints(vec![512])
        );
        assert_eq!(
            convert_primitive(tag, VR::FD, "FD", &PrimitiveValue::from(-1.5_f64)),
            Value::Floats(vec![-1.5])
        );
        assert_eq!(
            convert_primitive(tag, VR::CS, "CS", &PrimitiveValue::from("OT")),
            Value::Strings(vec!["OT".into()])
        );
        assert_eq!(
            convert_primitive(tag, VR::AT, "AT", &PrimitiveValue::Tags(vec![DicomTag(0x0010, 0x0020)].into())),
            Value::Strings(vec!["0010,0020".into()])
        );
        assert_eq!(
            convert_primitive(tag, VR::OB, "OB", &PrimitiveValue::from(vec![1_u8, 2, 3])),
            Value::Bytes(vec![1, 2, 3])
        );
        assert_eq!(
            convert_primitive(tag, VR::SL, "SL", &PrimitiveValue::Empty),
            Value::Ints(vec![])
        );
    }

    #[test]
    fn native_buffer_is_split_per_frame() {
        let obj = geometry_object(1, 2, 1, 8, "2");
        let frames = native_frames(&obj, &[1, 2, 3, 4]);
        assert_eq!(frames.len(), 2);
        let second = frames[1].as_native().unwrap();
        assert_eq!(second.data, vec![3, 4]);
        assert_eq!((second.rows, second.cols, second.bits_per_sample), (1, 2, 8));
    }

    #[test]
    fn declared_frame_count_is_capped_by_the_buffer() {
        let obj = geometry_object(1, 1, 1, 8, "2000000000");
        let frames = native_frames(&obj, &[1, 2]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_native().unwrap().data, vec![2]);

        let obj = geometry_object(1, 2, 1, 8, "10");
        let frames = native_frames(&obj, &[1, 2, 3]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_native().unwrap().data, vec![3]);

        let empty = native_frames(&geometry_object(4, 4, 1, 16, "500"), &[]);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].as_native().unwrap().data.is_empty());
    }

    #[test]
    fn short_native_buffer_yields_short_frame() {
        let obj = geometry_object(2, 2, 1, 16, "1");
        let frames = native_frames(&obj, &[0; 6]);
        let frame = frames[0].as_native().unwrap();
        assert_eq!(frame.data.len(), 6);
        assert!(frame.get_image().is_err());
    }

    #[test]
    fn fragments_are_grouped_by_offset_table() {
        let obj = geometry_object(1, 1, 1, 8, "2");
        let fragments = vec![vec![1; 4], vec![2; 2], vec![3; 6]];
        // frame 0: fragments 0 and 1 (8+4 + 8+2 = 22 bytes), frame 1 starts at 22
        let frames = encapsulated_frames(&obj, &[0, 22], &fragments);
        assert_eq!(frames.len(), 2);
        match (&frames[0], &frames[1]) {
            (Frame::Encapsulated(a), Frame::Encapsulated(b)) => {
                assert_eq!(a.data, vec![1, 1, 1, 1, 2, 2]);
                assert_eq!(b.data, vec![3; 6]);
            }
            other => panic!("unexpected frames {other:?}"),
        }
    }

    #[test]
    fn single_frame_concatenates_fragments() {
        let obj = geometry_object(1, 1, 1, 8, "1");
        let frames = encapsulated_frames(&obj, &[], &[vec![1], vec![2, 3]]);
        assert_eq!(
            frames,
            vec![Frame::Encapsulated(EncapsulatedFrame { data: vec![1, 2, 3] })]
        );
    }

    #[test]
    fn sequences_become_nested_items() {
        let mut item = InMemDicomObject::new_empty();
        item.put(DataElement::new(
            tags::REFERENCED_SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from("1.2.3"),
        ));
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::REFERENCED_IMAGE_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(vec![item]),
        ));

        let elements = dataset_from_object(&obj);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].vr, "SQ");
        match &elements[0].value {
            Value::Sequences(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(
                    items[0].elements[0].value,
                    Value::Strings(vec!["1.2.3".into()])
                );
            }
            other => panic!("unexpected value {other:?}"),
        }
        assert!(validate::verify_dataset(&elements).is_empty());
    }
}
