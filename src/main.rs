//
// main.rs
// Dicom-Inspect-rs
//
// Binary entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_inspect::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
