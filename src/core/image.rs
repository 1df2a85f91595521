//! Immutable image buffers handed to every checker
//!
//! The engine never decodes pixels. It only rejects buffers that are empty or whose
//! leading bytes match no supported container format, so that "not an image" is
//! reported as an input error instead of as a wall of checker faults.

use crate::core::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Container formats recognized by signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
  Jpeg,
  Png,
  Bmp,
  Gif,
  Webp,
  Tiff,
}

impl ImageFormat {
  /// Identify a format from the leading bytes of a buffer
  pub fn sniff(bytes: &[u8]) -> Option<Self> {
    match bytes {
      [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
      [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageFormat::Png),
      [b'B', b'M', ..] => Some(ImageFormat::Bmp),
      [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageFormat::Gif),
      [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::Webp),
      [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(ImageFormat::Tiff),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ImageFormat::Jpeg => "jpeg",
      ImageFormat::Png => "png",
      ImageFormat::Bmp => "bmp",
      ImageFormat::Gif => "gif",
      ImageFormat::Webp => "webp",
      ImageFormat::Tiff => "tiff",
    }
  }
}

impl fmt::Display for ImageFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An uploaded photograph
///
/// Cloning is cheap (shared buffer), which lets every worker hold its own handle
/// without copying the bytes or borrowing from the request.
#[derive(Clone)]
pub struct Image {
  bytes: Arc<[u8]>,
  format: ImageFormat,
}

impl Image {
  /// Validate and wrap raw bytes
  pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, InputError> {
    let bytes = bytes.into();
    if bytes.is_empty() {
      return Err(InputError::Empty);
    }
    let format = ImageFormat::sniff(&bytes).ok_or(InputError::UnrecognizedFormat)?;
    Ok(Self { bytes, format })
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn format(&self) -> ImageFormat {
    self.format
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

impl fmt::Debug for Image {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Image")
      .field("format", &self.format)
      .field("len", &self.bytes.len())
      .finish()
  }
}
