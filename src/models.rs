//
// models.rs
// Dicom-Inspect-rs
//
// Serializable projection of an element tree: element records, encoded values and frame descriptors.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;

use serde::Serialize;

/// Element records keyed by `gggg,eeee` tag strings.
pub type EncodedDataset = BTreeMap<String, ElementRecord>;

/// JSON record for one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRecord {
    pub vr: String,
    pub name: String,
    pub length: u32,
    pub values: Vec<EncodedValue>,
}

/// One entry of an element record's `values` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EncodedValue {
    Text(String),
    Frame(FrameDescriptor),
    Item(EncodedDataset),
}

/// Shape of a pixel data frame, without its bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDescriptor {
    pub native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples_per_pixel: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<u16>,
    pub size: usize,
}

/// Outcome of running the conformance pass over one file.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationSummary {
    pub valid: bool,
    pub elements_checked: usize,
    pub mismatches: Vec<String>,
}
