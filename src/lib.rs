//
// lib.rs
// Dicom-Inspect-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Core model and the two pure components: the JSON encoder and the native frame decoder.
pub mod dictionary;
pub mod error;
pub mod frame;
pub mod json;
pub mod models;
pub mod validate;
pub mod value;

// Glue around the external codec and the command line.
pub mod batch;
pub mod cli;
pub mod dicom_access;
pub mod image;

pub use cli::{run as run_cli, Cli, Commands};
pub use error::{Error, Result};
pub use frame::{EncapsulatedFrame, Frame, NativeFrame};
pub use value::{Element, PixelDataInfo, SequenceItem, Tag, Value, ValueKind};
