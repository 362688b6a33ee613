//
// image.rs
// Dicom-Inspect-rs
//
// Renders pixel data frames and writes them out as PNG or JPEG files, one file per frame.
//
// Thales Matheus Mendonça Santos - November 2025

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;

use crate::dicom_access;
use crate::error::Result;
use crate::frame::Frame;
use crate::value::{Element, PixelDataInfo, Tag, Value};

/// Output container for exported frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExportFormat {
    /// Keeps the full 16-bit grayscale range.
    Png,
    /// 16-bit grayscale is reduced to 8 bits, JPEG has no 16-bit gray.
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Turns one frame into an image.
///
/// Native frames go through the grayscale decoder, which rejects multi-sample
/// layouts. Encapsulated frames are handed to the generic container decoder
/// of the `image` crate.
pub fn render_frame(frame: &Frame) -> Result<DynamicImage> {
    match frame {
        Frame::Native(native) => Ok(DynamicImage::ImageLuma16(native.get_image()?)),
        Frame::Encapsulated(encapsulated) => Ok(image::load_from_memory(&encapsulated.data)?),
    }
}

pub fn encode_image(image: &DynamicImage, format: ExportFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match (format, image) {
        (ExportFormat::Jpeg, DynamicImage::ImageLuma16(_)) => {
            DynamicImage::ImageLuma8(image.to_luma8())
                .write_to(&mut Cursor::new(&mut buffer), format.image_format())?;
        }
        _ => image.write_to(&mut Cursor::new(&mut buffer), format.image_format())?,
    }
    Ok(buffer)
}

/// The top-level pixel data value of a dataset, if any.
pub fn find_pixel_data(elements: &[Element]) -> Option<&PixelDataInfo> {
    elements
        .iter()
        .find(|e| e.tag == Tag::PIXEL_DATA)
        .and_then(|e| match &e.value {
            Value::PixelData(info) => Some(info),
            _ => None,
        })
}

/// Writes the selected frames to `<dir>/<stem>_<index>.<ext>`, decoding them in parallel.
pub fn export_frames(
    info: &PixelDataInfo,
    indices: &[usize],
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> anyhow::Result<Vec<PathBuf>> {
    indices
        .par_iter()
        .map(|&index| -> anyhow::Result<PathBuf> {
            let frame = info
                .frames
                .get(index)
                .with_context(|| format!("Frame {} does not exist", index))?;
            let rendered =
                render_frame(frame).with_context(|| format!("Failed to render frame {}", index))?;
            let bytes = encode_image(&rendered, format)
                .with_context(|| format!("Failed to encode frame {}", index))?;

            let path = dir.join(format!("{}_{}.{}", stem, index, format.extension()));
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to save image to {:?}", path))?;
            tracing::debug!("frame {} written to {:?}", index, path);
            Ok(path)
        })
        .collect()
}

/// Exports all frames (or just `frame`) of a file's pixel data.
pub fn convert(
    input: &Path,
    output_dir: Option<&Path>,
    format: ExportFormat,
    frame: Option<usize>,
) -> anyhow::Result<Vec<PathBuf>> {
    let dataset = dicom_access::load_dataset(input)?;
    let Some(info) = find_pixel_data(&dataset) else {
        bail!("{:?} has no pixel data", input);
    };

    let num_frames = info.frames.len();
    let indices: Vec<usize> = match frame {
        Some(frame) if frame >= num_frames => bail!(
            "Requested frame {} but file has {} frame(s)",
            frame,
            num_frames
        ),
        Some(frame) => vec![frame],
        None => (0..num_frames).collect(),
    };

    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let written = export_frames(info, &indices, &dir, &stem, format)?;
    for path in &written {
        println!("Image saved to: {:?}", path);
    }
    Ok(written)
}
