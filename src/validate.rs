use std::path::Path;

use anyhow::{Context, Result};

use crate::dicom_access;
use crate::error::Error;
use crate::models::VerificationSummary;
use crate::value::{Element, Tag, Value, ValueKind};

/// Value kind a VR requires.
#[derive(Debug, Clone, Copy)]
enum Expected {
    Kind(ValueKind),
    /// PixelData on the pixel data tag, Bytes anywhere else.
    PixelDataOrBytes,
}

/// Pseudo-VR of item container elements.
pub const ITEM_VR: &str = "na";

/// VR codes with a dedicated kind. Every other code expects [`DEFAULT_KIND`].
///
/// US and UL map to the signed integer kind like SL and SS: integers of
/// either signedness share one kind on this path.
const VR_KINDS: &[(&str, Expected)] = &[
    ("US", Expected::Kind(ValueKind::Ints)),
    ("UL", Expected::Kind(ValueKind::Ints)),
    ("SL", Expected::Kind(ValueKind::Ints)),
    ("SS", Expected::Kind(ValueKind::Ints)),
    ("SQ", Expected::Kind(ValueKind::Sequences)),
    (ITEM_VR, Expected::Kind(ValueKind::SequenceItem)),
    ("OW", Expected::PixelDataOrBytes),
    ("OB", Expected::PixelDataOrBytes),
    ("FL", Expected::Kind(ValueKind::Floats)),
    ("FD", Expected::Kind(ValueKind::Floats)),
    ("AT", Expected::Kind(ValueKind::Strings)),
];

const DEFAULT_KIND: ValueKind = ValueKind::Strings;

/// The kind an element with this tag and VR must hold.
pub fn expected_kind(tag: Tag, vr: &str) -> ValueKind {
    let expected = VR_KINDS
        .iter()
        .find(|(code, _)| *code == vr)
        .map(|(_, expected)| *expected);

    match expected {
        Some(Expected::Kind(kind)) => kind,
        Some(Expected::PixelDataOrBytes) if tag == Tag::PIXEL_DATA => ValueKind::PixelData,
        Some(Expected::PixelDataOrBytes) => ValueKind::Bytes,
        None => DEFAULT_KIND,
    }
}

/// Checks that `value` has the kind `vr` requires. Never modifies the value.
pub fn verify(tag: Tag, value: &Value, vr: &str) -> Result<(), Error> {
    let expected = expected_kind(tag, vr);
    let actual = value.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::ConformanceMismatch {
            vr: vr.to_string(),
            tag,
            expected,
            actual,
        })
    }
}

pub fn verify_element(element: &Element) -> Result<(), Error> {
    verify(element.tag, &element.value, &element.vr)
}

/// Verifies every element, descending into sequence items. Returns all mismatches found.
pub fn verify_dataset(elements: &[Element]) -> Vec<Error> {
    let mut failures = Vec::new();
    walk(elements, &mut |element| {
        if let Err(e) = verify_element(element) {
            failures.push(e);
        }
    });
    failures
}

/// Runs the conformance pass and counts the elements it visited.
pub fn summarize(elements: &[Element]) -> VerificationSummary {
    let mut elements_checked = 0;
    walk(elements, &mut |_| elements_checked += 1);
    let mismatches: Vec<String> = verify_dataset(elements)
        .iter()
        .map(ToString::to_string)
        .collect();

    VerificationSummary {
        valid: mismatches.is_empty(),
        elements_checked,
        mismatches,
    }
}

fn walk<'a>(elements: &'a [Element], visit: &mut impl FnMut(&'a Element)) {
    for element in elements {
        visit(element);
        match &element.value {
            Value::Sequences(items) => {
                for item in items {
                    walk(&item.elements, visit);
                }
            }
            Value::SequenceItem(item) => walk(&item.elements, visit),
            _ => {}
        }
    }
}

/// Loads a file and prints the outcome of the conformance pass.
pub fn check_file(path: &Path) -> Result<VerificationSummary> {
    let dataset = dicom_access::load_dataset(path)
        .with_context(|| format!("Failed to load DICOM file {:?}", path))?;
    let summary = summarize(&dataset);

    println!("File: {}", path.display());
    println!("  Elements checked: {}", summary.elements_checked);
    if summary.valid {
        println!("  All elements conform to their declared VR");
    } else {
        for mismatch in &summary.mismatches {
            println!("  Mismatch: {}", mismatch);
        }
    }

    Ok(summary)
}
