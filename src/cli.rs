//
// cli.rs
// Dicom-Inspect-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use crate::{batch, dicom_access, dictionary, image, json, validate};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-inspect")]
#[command(about = "Inspect DICOM element trees and native pixel data", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the element tree as JSON, verify it, export frames and write the file back
    Inspect {
        file: PathBuf,
        /// JSON file with private tag names
        #[arg(long)]
        dictionary: Option<PathBuf>,
        #[arg(long)]
        skip_vr_verification: bool,
        #[arg(long, value_enum, default_value_t = Format::Png)]
        format: Format,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Convert DICOM to JSON
    ToJson {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dictionary: Option<PathBuf>,
    },
    /// Check every element against its declared value representation
    Verify { file: PathBuf },
    /// Export pixel data frames as images
    ToImage {
        input: PathBuf,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Png)]
        format: Format,
        #[arg(long)]
        frame: Option<usize>,
    },
    /// Verify every .dcm file of a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Format {
    Png,
    Jpeg,
}

impl From<Format> for image::ExportFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Png => image::ExportFormat::Png,
            Format::Jpeg => image::ExportFormat::Jpeg,
        }
    }
}

/// Settings of one `inspect` run.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub dictionary: Option<PathBuf>,
    pub skip_vr_verification: bool,
    pub format: image::ExportFormat,
    pub output_dir: Option<PathBuf>,
}

/// Files produced by `inspect`.
#[derive(Debug, Clone)]
pub struct InspectOutput {
    pub json: String,
    pub images: Vec<PathBuf>,
    pub export: PathBuf,
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect {
            file,
            dictionary,
            skip_vr_verification,
            format,
            output_dir,
        } => {
            let options = InspectOptions {
                dictionary,
                skip_vr_verification,
                format: format.into(),
                output_dir,
            };
            let output = inspect(&file, &options)?;
            println!("{}", output.json);
            for path in &output.images {
                println!("Image saved to: {:?}", path);
            }
            println!("DICOM saved to {:?}", output.export);
        }
        Commands::ToJson {
            file,
            output,
            dictionary,
        } => {
            let dict = dictionary::load(dictionary.as_deref())
                .context("Failed to load tag dictionary")?;
            json::to_json(&file, output.as_deref(), &dict)?
        }
        Commands::Verify { file } => {
            let summary = validate::check_file(&file)?;
            if !summary.valid {
                bail!(
                    "{} element(s) do not conform to their declared VR",
                    summary.mismatches.len()
                );
            }
        }
        Commands::ToImage {
            input,
            output_dir,
            format,
            frame,
        } => {
            image::convert(&input, output_dir.as_deref(), format.into(), frame)?;
        }
        Commands::Batch { directory } => {
            batch::process_directory(&directory)?;
        }
    }

    Ok(())
}

/// Encodes, verifies, exports frames and writes `<stem>.export.dcm`.
///
/// A conformance mismatch aborts the run unless verification is skipped.
/// Frame export failures are logged and do not prevent the write-back.
pub fn inspect(file: &Path, options: &InspectOptions) -> anyhow::Result<InspectOutput> {
    let dict = dictionary::load(options.dictionary.as_deref())
        .context("Failed to load tag dictionary")?;
    let (obj, dataset) = dicom_access::load(file)?;

    let json = json::encode_to_string(&dataset, &dict)?;

    if !options.skip_vr_verification {
        let failures = validate::verify_dataset(&dataset);
        if let Some(first) = failures.first() {
            bail!(
                "{} element(s) do not conform to their declared VR, first: {}",
                failures.len(),
                first
            );
        }
    }

    let output_dir = options
        .output_dir
        .clone()
        .or_else(|| file.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dicom".to_string());

    let mut images = Vec::new();
    if let Some(info) = image::find_pixel_data(&dataset) {
        let indices: Vec<usize> = (0..info.frames.len()).collect();
        match image::export_frames(info, &indices, &output_dir, &stem, options.format) {
            Ok(paths) => images = paths,
            Err(e) => tracing::warn!("frame export failed: {:#}", e),
        }
    }

    let export = output_dir.join(format!("{}.export.dcm", stem));
    dicom_access::write_copy(&obj, &export)?;

    Ok(InspectOutput {
        json,
        images,
        export,
    })
}

fn init_logging(verbose: bool) {
    // Logs go to stderr so that JSON on stdout stays machine-readable.
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .with_writer(std::io::stderr)
            .finish(),
    )
    .unwrap_or_else(|e| eprintln!("[ERROR] Could not set up global logging subscriber: {}", e));
}
