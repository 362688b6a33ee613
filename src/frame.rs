//
// frame.rs
// Dicom-Inspect-rs
//
// Native (uncompressed) frame decoding: sample extraction at 8/16/32 bits and grayscale rendering.
//
// Thales Matheus Mendonça Santos - November 2025

use image::{ImageBuffer, Luma};

use crate::error::{Error, Result};

/// Single-channel image with 16 bits per pixel.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// One frame of pixel data.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Native(NativeFrame),
    Encapsulated(EncapsulatedFrame),
}

impl Frame {
    pub fn as_native(&self) -> Option<&NativeFrame> {
        match self {
            Frame::Native(frame) => Some(frame),
            Frame::Encapsulated(_) => None,
        }
    }
}

/// A compressed frame payload, kept opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct EncapsulatedFrame {
    pub data: Vec<u8>,
}

/// An uncompressed frame: interleaved little-endian samples plus geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeFrame {
    pub rows: u32,
    pub cols: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub data: Vec<u8>,
}

impl NativeFrame {
    /// Byte length the buffer should have for this geometry, `None` when it
    /// does not fit in `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        (self.rows as usize)
            .checked_mul(self.cols as usize)?
            .checked_mul(self.samples_per_pixel as usize)?
            .checked_mul(self.bits_per_sample as usize / 8)
    }

    fn bytes_per_sample(&self) -> Result<usize> {
        match self.bits_per_sample {
            8 | 16 | 32 => Ok(self.bits_per_sample as usize / 8),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }

    /// Reads the `samples_per_pixel` samples of pixel `(x, y)`.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Vec<u32>> {
        let bytes_per_sample = self.bytes_per_sample()?;
        if x >= self.cols || y >= self.rows {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                cols: self.cols,
                rows: self.rows,
            });
        }

        let spp = self.samples_per_pixel as usize;
        let stride = spp * bytes_per_sample;
        let base = (y as usize)
            .checked_mul(self.cols as usize)
            .and_then(|p| p.checked_add(x as usize))
            .and_then(|p| p.checked_mul(stride));

        (0..spp)
            .map(|i| -> Result<u32> {
                let len = self.data.len();
                let offset = base
                    .and_then(|b| b.checked_add(i * bytes_per_sample))
                    .ok_or(Error::BufferOutOfBounds {
                        offset: usize::MAX,
                        end: usize::MAX,
                        len,
                    })?;
                let end = offset.saturating_add(bytes_per_sample);
                let raw = self
                    .data
                    .get(offset..end)
                    .ok_or(Error::BufferOutOfBounds { offset, end, len })?;
                Ok(match *raw {
                    [b] => u32::from(b),
                    [b0, b1] => u32::from(u16::from_le_bytes([b0, b1])),
                    [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
                    _ => unreachable!("sample width is 1, 2 or 4 bytes"),
                })
            })
            .collect()
    }

    /// Renders a single-sample frame as a 16-bit grayscale image of `cols` x `rows`.
    ///
    /// Samples are zero-extended (8 bits) or kept as is; 32-bit samples wider
    /// than 16 bits are truncated. No rescale, windowing or photometric
    /// interpretation is applied. Frames with more than one sample per pixel
    /// are rejected with [`Error::UnsupportedChannelLayout`].
    ///
    /// The buffer must cover the whole frame; a short one fails with
    /// [`Error::BufferOutOfBounds`] before the image is allocated.
    pub fn get_image(&self) -> Result<Gray16Image> {
        if self.samples_per_pixel != 1 {
            return Err(Error::UnsupportedChannelLayout(self.samples_per_pixel));
        }
        self.bytes_per_sample()?;
        match self.expected_len() {
            Some(needed) if needed <= self.data.len() => {}
            needed => {
                return Err(Error::BufferOutOfBounds {
                    offset: 0,
                    end: needed.unwrap_or(usize::MAX),
                    len: self.data.len(),
                })
            }
        }

        let mut img = Gray16Image::new(self.cols, self.rows);
        let total = self.cols as u64 * self.rows as u64;
        for j in 0..total {
            let x = (j % self.cols as u64) as u32;
            let y = (j / self.cols as u64) as u32;
            let sample = self.get_pixel(x, y)?[0];
            img.put_pixel(x, y, Luma([sample as u16]));
        }
        Ok(img)
    }
}
