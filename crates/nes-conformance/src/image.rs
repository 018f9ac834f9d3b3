//! Reference images and exact frame comparison.
//!
//! Reference frames live on disk as PNGs named `<rom>-<cycles>.<ext>`:
//! the stem encodes which ROM produced the frame and the exact cycle
//! budget to run before capturing. Anything not matching that shape is
//! not a reference and is skipped without complaint, so stray files can
//! live alongside the references.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::HarnessError;
use crate::frame::FrameBuffer;

/// Result of comparing a captured frame against a reference.
///
/// Mismatches are comparison results, not errors — a visual diff is an
/// expected outcome while an emulator is being brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameComparison {
    /// Every channel of every pixel matches.
    Identical,
    /// The geometries differ; no pixel data was inspected.
    DimensionMismatch {
        /// Reference width × height.
        expected: (u32, u32),
        /// Captured width × height.
        actual: (u32, u32),
    },
    /// First differing pixel, with both RGBA quadruples.
    PixelMismatch {
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
        /// Reference RGBA.
        expected: [u8; 4],
        /// Captured RGBA.
        actual: [u8; 4],
    },
}

impl FrameComparison {
    /// True for [`FrameComparison::Identical`].
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Identical)
    }

    /// Human-readable diagnosis for fail lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Identical => "frames identical".to_string(),
            Self::DimensionMismatch { expected, actual } => format!(
                "dimension mismatch: reference {}x{}, captured {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            Self::PixelMismatch {
                x,
                y,
                expected,
                actual,
            } => format!(
                "pixel mismatch at ({x}, {y}): reference {expected:?}, captured {actual:?}"
            ),
        }
    }
}

/// Compare a captured frame against a reference, exactly.
///
/// Dimensions are judged first and a mismatch short-circuits before any
/// pixel is read. Otherwise every channel of every pixel must be equal —
/// no tolerance, no perceptual metric.
#[must_use]
pub fn compare_frames(reference: &FrameBuffer, captured: &FrameBuffer) -> FrameComparison {
    let expected = (reference.width(), reference.height());
    let actual = (captured.width(), captured.height());
    if expected != actual {
        return FrameComparison::DimensionMismatch { expected, actual };
    }

    for (index, (a, b)) in reference
        .as_rgba()
        .iter()
        .zip(captured.as_rgba())
        .enumerate()
    {
        if a != b {
            let pixel = (index / 4) as u32;
            let x = pixel % reference.width();
            let y = pixel / reference.width();
            return FrameComparison::PixelMismatch {
                x,
                y,
                expected: reference.pixel(x, y),
                actual: captured.pixel(x, y),
            };
        }
    }

    FrameComparison::Identical
}

/// Decode a reference filename of shape `<rom>-<cycles>.<ext>`.
///
/// Splits the stem at the *last* dash so ROM names may themselves
/// contain dashes. Returns `None` for anything that doesn't match;
/// callers skip those paths silently.
#[must_use]
pub fn decode_reference_name(path: &Path) -> Option<(String, u64)> {
    let stem = path.file_stem()?.to_str()?;
    let (rom, cycles) = stem.rsplit_once('-')?;
    if rom.is_empty() {
        return None;
    }
    let cycles = cycles.parse::<u64>().ok()?;
    Some((rom.to_string(), cycles))
}

/// A decoded reference frame plus the metadata recovered from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// ROM base name the frame belongs to.
    pub rom: String,
    /// Exact cycle budget to run before capturing.
    pub cycles: u64,
    /// The reference pixels.
    pub frame: FrameBuffer,
}

impl ReferenceImage {
    /// Load a reference PNG whose name matches the reference shape.
    ///
    /// Accepts 8-bit RGB or RGBA; RGB is widened with opaque alpha, the
    /// same convention the capture side uses when it writes frames out.
    ///
    /// # Errors
    ///
    /// [`HarnessError::ReferenceImage`] if the name doesn't decode, the
    /// file can't be read, or the PNG isn't an 8-bit RGB/RGBA image.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let fail = |reason: String| HarnessError::ReferenceImage {
            path: path.to_path_buf(),
            reason,
        };

        let (rom, cycles) = decode_reference_name(path)
            .ok_or_else(|| fail("name does not match <rom>-<cycles>.<ext>".to_string()))?;

        let file = File::open(path).map_err(|e| fail(e.to_string()))?;
        let decoder = png::Decoder::new(BufReader::new(file));
        let mut reader = decoder.read_info().map_err(|e| fail(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| fail(e.to_string()))?;
        buf.truncate(info.buffer_size());

        if info.bit_depth != png::BitDepth::Eight {
            return Err(fail(format!("unsupported bit depth {:?}", info.bit_depth)));
        }

        let mut frame = FrameBuffer::new(info.width, info.height);
        match info.color_type {
            png::ColorType::Rgba => frame.as_rgba_mut().copy_from_slice(&buf),
            png::ColorType::Rgb => {
                for (dst, src) in frame
                    .as_rgba_mut()
                    .chunks_exact_mut(4)
                    .zip(buf.chunks_exact(3))
                {
                    dst[..3].copy_from_slice(src);
                    dst[3] = 0xFF;
                }
            }
            other => return Err(fail(format!("unsupported color type {other:?}"))),
        }

        Ok(Self { rom, cycles, frame })
    }
}
