//! The `IHDR` chunk: image geometry and pixel layout.

use crate::error::PngError;

/// The color models a PNG image can declare.
///
/// The numbering follows the channel-oriented convention used by this
/// crate's wire format rather than counting from zero; what matters for
/// the scanline math is [`channel_count`](Self::channel_count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  Grayscale = 1,
  Rgb = 2,
  Indexed = 3,
  GrayscaleAlpha = 4,
  Rgba = 6,
}
impl ColorType {
  /// Samples per pixel for this model.
  ///
  /// Indexed images store one palette index per pixel, so they count as
  /// a single channel.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      ColorType::Grayscale => 1,
      ColorType::Rgb => 3,
      ColorType::Indexed => 1,
      ColorType::GrayscaleAlpha => 2,
      ColorType::Rgba => 4,
    }
  }
}
impl TryFrom<u8> for ColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(ColorType::Grayscale),
      2 => Ok(ColorType::Rgb),
      3 => Ok(ColorType::Indexed),
      4 => Ok(ColorType::GrayscaleAlpha),
      6 => Ok(ColorType::Rgba),
      other => Err(PngError::UnsupportedColorType(other)),
    }
  }
}

/// The parsed form of an `IHDR` payload.
///
/// The compression method and filter method bytes of the wire format are
/// not stored here: PNG defines exactly one legal value (0) for each, so
/// they only exist at [`to_bytes`](Self::to_bytes) /
/// [`from_bytes`](Self::from_bytes) time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
  /// Width in pixels.
  pub width: u32,
  /// Height in pixels.
  pub height: u32,
  /// Bits per channel. This crate handles 8 and 16.
  pub bit_depth: u8,
  /// The image's color model.
  pub color_type: ColorType,
  /// 0 for no interlace, 1 for Adam7.
  pub interlace: u8,
}
impl Default for ImageHeader {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self { width: 0, height: 0, bit_depth: 8, color_type: ColorType::Rgba, interlace: 0 }
  }
}
impl ImageHeader {
  /// Bytes per pixel under this header.
  ///
  /// Fails with [`UnsupportedDepth`](PngError::UnsupportedDepth) when the
  /// bit depth is not 8 or 16.
  #[inline]
  pub const fn bytes_per_pixel(&self) -> Result<usize, PngError> {
    match self.bit_depth {
      8 => Ok(self.color_type.channel_count()),
      16 => Ok(self.color_type.channel_count() * 2),
      other => Err(PngError::UnsupportedDepth(other)),
    }
  }

  /// Bytes per unfiltered scanline, *excluding* the leading filter byte.
  #[inline]
  pub const fn bytes_per_scanline(&self) -> Result<usize, PngError> {
    match self.bytes_per_pixel() {
      Ok(bpp) => Ok(bpp * self.width as usize),
      Err(e) => Err(e),
    }
  }

  /// Serializes into the 13-byte `IHDR` payload.
  ///
  /// Compression method and filter method are written as 0, their only
  /// defined values.
  #[inline]
  #[must_use]
  pub const fn to_bytes(&self) -> [u8; 13] {
    let w = self.width.to_be_bytes();
    let h = self.height.to_be_bytes();
    [
      w[0],
      w[1],
      w[2],
      w[3],
      h[0],
      h[1],
      h[2],
      h[3],
      self.bit_depth,
      self.color_type as u8,
      0,
      0,
      self.interlace,
    ]
  }

  /// Parses a 13-byte `IHDR` payload.
  ///
  /// Exact inverse of [`to_bytes`](Self::to_bytes). Any payload that is
  /// not exactly 13 bytes is [`BadIhdr`](PngError::BadIhdr); an unknown
  /// color model reports which byte was seen.
  pub fn from_bytes(payload: &[u8]) -> Result<Self, PngError> {
    match payload {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, _compression, _filter, interlace] => {
        Ok(Self {
          width: u32::from_be_bytes([*w0, *w1, *w2, *w3]),
          height: u32::from_be_bytes([*h0, *h1, *h2, *h3]),
          bit_depth: *bit_depth,
          color_type: ColorType::try_from(*color_type)?,
          interlace: *interlace,
        })
      }
      _ => Err(PngError::BadIhdr),
    }
  }
}
