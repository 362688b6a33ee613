use anyhow::Result;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::validate;

/// Per-directory totals of a batch verification run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub conforming: Vec<PathBuf>,
    pub nonconforming: Vec<PathBuf>,
    pub unreadable: Vec<PathBuf>,
}

/// Runs the conformance pass over every `.dcm` file below `dir`.
pub fn process_directory(dir: &Path) -> Result<BatchReport> {
    tracing::info!("Processing directory {:?}", dir);

    let files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "dcm"))
        .map(|e| e.into_path())
        .collect();

    tracing::info!("Found {} files", files.len());

    let outcomes: Vec<(PathBuf, Result<bool>)> = files
        .into_par_iter()
        .map(|path| {
            let res = validate::check_file(&path).map(|summary| summary.valid);
            (path, res)
        })
        .collect();

    let mut report = BatchReport::default();
    for (path, res) in outcomes {
        match res {
            Ok(true) => report.conforming.push(path),
            Ok(false) => report.nonconforming.push(path),
            Err(e) => {
                eprintln!("Error in {:?}: {:#}", path, e);
                report.unreadable.push(path);
            }
        }
    }

    println!(
        "Conforming: {} | Non-conforming: {} | Unreadable: {}",
        report.conforming.len(),
        report.nonconforming.len(),
        report.unreadable.len()
    );

    Ok(report)
}
