//
// json.rs
// Dicom-Inspect-rs
//
// Projects an element tree into a tag-keyed JSON document, recursing through sequence items.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;

use crate::dicom_access;
use crate::dictionary::TagDictionary;
use crate::frame::Frame;
use crate::models::{ElementRecord, EncodedDataset, EncodedValue, FrameDescriptor};
use crate::value::{Element, PixelDataInfo, Value};

/// Encode an ordered element list into records keyed by `gggg,eeee`.
///
/// The branch taken for each element depends only on its value kind, never on
/// the declared VR. Tags the dictionary cannot name get an empty name and a
/// warning in the log.
pub fn encode(elements: &[Element], dictionary: &dyn TagDictionary) -> EncodedDataset {
    let mut encoded = EncodedDataset::new();

    for element in elements {
        let name = match dictionary.name(element.tag) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("find tag {}: {}", element.tag, e);
                String::new()
            }
        };

        let record = ElementRecord {
            vr: element.vr.clone(),
            name,
            length: element.length,
            values: encode_value(&element.value, dictionary),
        };
        encoded.insert(element.tag.to_string(), record);
    }

    encoded
}

fn encode_value(value: &Value, dictionary: &dyn TagDictionary) -> Vec<EncodedValue> {
    match value {
        Value::Strings(strings) => strings.iter().cloned().map(EncodedValue::Text).collect(),
        Value::Bytes(bytes) => vec![EncodedValue::Text(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )],
        Value::Ints(ints) => ints.iter().map(|v| EncodedValue::Text(v.to_string())).collect(),
        Value::UInts(uints) => uints
            .iter()
            .map(|v| EncodedValue::Text(v.to_string()))
            .collect(),
        // `Display` for f64 is the shortest round-trip form and never uses an exponent.
        Value::Floats(floats) => floats
            .iter()
            .map(|v| EncodedValue::Text(v.to_string()))
            .collect(),
        Value::PixelData(info) => frame_descriptors(info)
            .into_iter()
            .map(EncodedValue::Frame)
            .collect(),
        Value::Sequences(items) => items
            .iter()
            .map(|item| EncodedValue::Item(encode(&item.elements, dictionary)))
            .collect(),
        Value::SequenceItem(item) => vec![EncodedValue::Item(encode(&item.elements, dictionary))],
    }
}

/// Describes each frame without touching its pixel bytes.
pub fn frame_descriptors(info: &PixelDataInfo) -> Vec<FrameDescriptor> {
    info.frames
        .iter()
        .map(|frame| match frame {
            Frame::Native(native) => FrameDescriptor {
                native: true,
                rows: Some(native.rows),
                cols: Some(native.cols),
                samples_per_pixel: Some(native.samples_per_pixel),
                bits_per_sample: Some(native.bits_per_sample),
                size: native.data.len(),
            },
            Frame::Encapsulated(encapsulated) => FrameDescriptor {
                native: false,
                rows: None,
                cols: None,
                samples_per_pixel: None,
                bits_per_sample: None,
                size: encapsulated.data.len(),
            },
        })
        .collect()
}

/// Encode a whole dataset into a pretty JSON string.
pub fn encode_to_string(elements: &[Element], dictionary: &dyn TagDictionary) -> Result<String> {
    let encoded = encode(elements, dictionary);
    serde_json::to_string_pretty(&encoded).context("Failed to serialize to JSON")
}

/// Convert a DICOM file to JSON and print it to stdout or write it to `output`.
pub fn to_json(input: &Path, output: Option<&Path>, dictionary: &dyn TagDictionary) -> Result<()> {
    let dataset = dicom_access::load_dataset(input)
        .with_context(|| format!("Failed to load DICOM file {:?}", input))?;
    let json_string = encode_to_string(&dataset, dictionary)?;

    match output {
        Some(path) => {
            std::fs::write(path, json_string).context("Failed to write JSON to file")?;
            println!("JSON saved to {:?}", path);
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{PrivateDictionary, StandardDictionary};
    use crate::frame::{EncapsulatedFrame, NativeFrame};
    use crate::value::{SequenceItem, Tag};
    use serde_json::json;

    fn strings(tag: Tag, vr: &str, values: &[&str]) -> Element {
        Element::new(
            tag,
            vr,
            10,
            Value::Strings(values.iter().map(|s| s.to_string()).collect()),
        )
    }

    #[test]
    fn strings_keep_order_under_tag_key() {
        let elements = vec![strings(Tag::new(0x0015, 0x0004), "CS", &["CS_VR", "TEST"])];
        let encoded = encode(&elements, &StandardDictionary);
        let value = serde_json::to_value(&encoded).unwrap();

        assert_eq!(value["0015,0004"]["vr"], "CS");
        assert_eq!(value["0015,0004"]["name"], "");
        assert_eq!(value["0015,0004"]["length"], 10);
        assert_eq!(value["0015,0004"]["values"], json!(["CS_VR", "TEST"]));
    }

    #[test]
    fn numbers_are_emitted_as_decimal_strings() {
        let elements = vec![
            Element::new(Tag::new(0x0015, 0x0021), "SL", 8, Value::Ints(vec![-1, 42])),
            Element::new(Tag::new(0x0015, 0x0034), "UV", 8, Value::UInts(vec![u64::MAX])),
            Element::new(
                Tag::new(0x0015, 0x0009),
                "FD",
                24,
                Value::Floats(vec![-123.456789, 1.0, 1e21]),
            ),
        ];
        let value = serde_json::to_value(encode(&elements, &StandardDictionary)).unwrap();

        assert_eq!(value["0015,0021"]["values"], json!(["-1", "42"]));
        assert_eq!(
            value["0015,0034"]["values"],
            json!(["18446744073709551615"])
        );
        assert_eq!(
            value["0015,0009"]["values"],
            json!(["-123.456789", "1", "1000000000000000000000"])
        );
    }

    #[test]
    fn float_strings_round_trip() {
        let floats = vec![0.1, -1234.5678, f64::MIN_POSITIVE, 6.02214076e23];
        let elements = vec![Element::new(
            Tag::new(0x0015, 0x0014),
            "FD",
            32,
            Value::Floats(floats.clone()),
        )];
        let encoded = encode(&elements, &StandardDictionary);
        let parsed: Vec<f64> = encoded["0015,0014"]
            .values
            .iter()
            .map(|v| match v {
                EncodedValue::Text(s) => s.parse().unwrap(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(parsed, floats);
    }

    #[test]
    fn bytes_round_trip_through_base64() {
        let bytes = vec![b'O', b'B', 0, 0xff, 0x7f, 0x80, 1];
        let elements = vec![Element::new(
            Tag::new(0x0015, 0x0013),
            "OB",
            8,
            Value::Bytes(bytes.clone()),
        )];
        let encoded = encode(&elements, &StandardDictionary);
        let values = &encoded["0015,0013"].values;
        assert_eq!(values.len(), 1);
        let EncodedValue::Text(text) = &values[0] else {
            panic!("expected text");
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(text)
            .unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn sequences_recurse_into_items() {
        let item = |n: &str| {
            SequenceItem::new(vec![
                strings(Tag::new(0x0008, 0x1150), "UI", &["1.2.3"]),
                strings(Tag::new(0x0008, 0x1155), "UI", &[n]),
            ])
        };
        let elements = vec![Element::new(
            Tag::new(0x0008, 0x1115),
            "SQ",
            0xffff_ffff,
            Value::Sequences(vec![item("1.2.3.4"), item("1.2.3.5")]),
        )];
        let value = serde_json::to_value(encode(&elements, &StandardDictionary)).unwrap();

        let items = value["0008,1115"]["values"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        for entry in items {
            assert_eq!(entry.as_object().unwrap().len(), 2);
        }
        assert_eq!(items[1]["0008,1155"]["values"], json!(["1.2.3.5"]));
        assert_eq!(items[0]["0008,1150"]["name"], "ReferencedSOPClassUID");
        assert_eq!(value["0008,1115"]["name"], "ReferencedSeriesSequence");
    }

    #[test]
    fn pixel_data_emits_descriptors_only() {
        let info = PixelDataInfo {
            is_encapsulated: false,
            frames: vec![Frame::Native(NativeFrame {
                rows: 2,
                cols: 3,
                samples_per_pixel: 1,
                bits_per_sample: 16,
                data: vec![0; 12],
            })],
        };
        let elements = vec![Element::new(
            Tag::PIXEL_DATA,
            "OW",
            12,
            Value::PixelData(info),
        )];
        let value = serde_json::to_value(encode(&elements, &StandardDictionary)).unwrap();
        assert_eq!(
            value["7fe0,0010"]["values"],
            json!([{
                "native": true,
                "rows": 2,
                "cols": 3,
                "samples_per_pixel": 1,
                "bits_per_sample": 16,
                "size": 12
            }])
        );

        let encapsulated = PixelDataInfo {
            is_encapsulated: true,
            frames: vec![
                Frame::Encapsulated(EncapsulatedFrame { data: vec![1; 5] }),
                Frame::Encapsulated(EncapsulatedFrame { data: vec![2; 7] }),
            ],
        };
        let descriptors = frame_descriptors(&encapsulated);
        assert_eq!(
            serde_json::to_value(&descriptors).unwrap(),
            json!([{"native": false, "size": 5}, {"native": false, "size": 7}])
        );
    }

    #[test]
    fn keys_match_input_tags_and_names_come_from_dictionary() {
        let mut private = PrivateDictionary::default();
        private.insert(Tag::new(0x0015, 0x0004), "PrivateCodeString");
        let elements = vec![
            strings(Tag::new(0x0015, 0x0004), "CS", &["A"]),
            strings(Tag::new(0x0010, 0x0010), "PN", &["Doe^John"]),
            strings(Tag::new(0x0008, 0x0060), "CS", &["OT"]),
        ];
        let encoded = encode(&elements, &private);
        let keys: Vec<&str> = encoded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["0008,0060", "0010,0010", "0015,0004"]);
        assert_eq!(encoded["0015,0004"].name, "PrivateCodeString");
        // not in the private dictionary: blank, not an error
        assert_eq!(encoded["0010,0010"].name, "");
    }

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn unnamed_tags_are_logged_as_warnings() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let elements = vec![
            strings(Tag::new(0x0015, 0x0021), "SL", &["7"]),
            strings(Tag::new(0x0010, 0x0010), "PN", &["Doe^John"]),
        ];
        let encoded = tracing::subscriber::with_default(subscriber, || {
            encode(&elements, &StandardDictionary)
        });
        assert_eq!(encoded["0015,0021"].name, "");
        assert_eq!(encoded["0010,0010"].name, "PatientName");

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("WARN"));
        assert!(output.contains("find tag 0015,0021"));
    }

    #[test]
    fn vr_does_not_steer_encoding() {
        // a US element holding strings is still encoded by its value kind
        let elements = vec![strings(Tag::new(0x0028, 0x0010), "US", &["512"])];
        let encoded = encode(&elements, &StandardDictionary);
        assert_eq!(
            encoded["0028,0010"].values,
            vec![EncodedValue::Text("512".into())]
        );
    }
}
