//! Codecs for the ancillary chunks an encoder commonly writes.
//!
//! Each codec here maps between a typed value and a chunk payload;
//! framing (length and CRC) stays in the [`chunk`](crate::chunk)
//! module. Decoders borrow from the payload where the data allows it.

use crate::{
  chunk::{Chunk, ChunkType},
  error::PngError,
};

use alloc::vec::Vec;

/// The sRGB gamma value for a `gAMA` chunk (1/2.2, times 100000).
pub const GAMMA_SRGB: u32 = 45_455;

/// The sRGB primaries and white point for a `cHRM` chunk.
///
/// Order is white x, white y, red x, red y, green x, green y, blue x,
/// blue y, each times 100000.
pub const CHROMATICITY_SRGB: [u32; 8] =
  [31_270, 32_900, 64_000, 33_000, 30_000, 60_000, 15_000, 6_000];

/// Physical pixel dimensions, as carried by a `pHYs` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phys {
  /// Pixels per unit on the x axis.
  pub x: u32,
  /// Pixels per unit on the y axis.
  pub y: u32,
  /// 0 for unknown unit, 1 for meters.
  pub unit: u8,
}
impl Phys {
  /// Square pixel density from pixels-per-inch.
  ///
  /// PNG only knows meters, so this converts at 5000 in / 127 m with
  /// round-to-nearest; 72 ppi becomes the familiar 2835 per meter.
  #[inline]
  #[must_use]
  pub const fn from_ppi(ppi: u32) -> Self {
    let ppm = (ppi * 5000 + 63) / 127;
    Self { x: ppm, y: ppm, unit: 1 }
  }

  /// The x-axis density converted back to pixels-per-inch.
  ///
  /// Rounds to nearest, so it inverts [`from_ppi`](Self::from_ppi) for
  /// any realistic density.
  #[inline]
  #[must_use]
  pub const fn to_ppi(&self) -> u32 {
    (self.x * 127 + 2500) / 5000
  }

  #[inline]
  #[must_use]
  pub const fn to_bytes(&self) -> [u8; 9] {
    let x = self.x.to_be_bytes();
    let y = self.y.to_be_bytes();
    [x[0], x[1], x[2], x[3], y[0], y[1], y[2], y[3], self.unit]
  }

  pub fn from_bytes(payload: &[u8]) -> Result<Self, PngError> {
    match payload {
      [x0, x1, x2, x3, y0, y1, y2, y3, unit] => Ok(Self {
        x: u32::from_be_bytes([*x0, *x1, *x2, *x3]),
        y: u32::from_be_bytes([*y0, *y1, *y2, *y3]),
        unit: *unit,
      }),
      _ => Err(PngError::UnexpectedEnd),
    }
  }

  #[inline]
  #[must_use]
  pub fn to_chunk(&self) -> Chunk {
    Chunk::new(ChunkType::pHYs, self.to_bytes().to_vec())
  }
}

/// An `sRGB` chunk's rendering intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Intent {
  Perceptual = 0,
  RelativeColorimetric = 1,
  Saturation = 2,
  AbsoluteColorimetric = 3,
}
impl TryFrom<u8> for Intent {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Intent::Perceptual),
      1 => Ok(Intent::RelativeColorimetric),
      2 => Ok(Intent::Saturation),
      3 => Ok(Intent::AbsoluteColorimetric),
      other => Err(PngError::BadRenderingIntent(other)),
    }
  }
}

/// Builds a `gAMA` chunk; the value is gamma times 100000.
#[inline]
#[must_use]
pub fn gama_chunk(gamma: u32) -> Chunk {
  Chunk::new(ChunkType::gAMA, gamma.to_be_bytes().to_vec())
}

/// Builds a `cHRM` chunk from the eight scaled coordinates.
#[must_use]
pub fn chrm_chunk(values: &[u32; 8]) -> Chunk {
  let mut data = Vec::with_capacity(32);
  for value in values {
    data.extend_from_slice(&value.to_be_bytes());
  }
  Chunk::new(ChunkType::cHRM, data)
}

/// Builds an `sRGB` chunk.
#[inline]
#[must_use]
pub fn srgb_chunk(intent: Intent) -> Chunk {
  Chunk::new(ChunkType::sRGB, alloc::vec![intent as u8])
}

/// Reads the rendering intent back out of an `sRGB` payload.
pub fn decode_srgb(payload: &[u8]) -> Result<Intent, PngError> {
  match payload {
    [byte] => Intent::try_from(*byte),
    _ => Err(PngError::UnexpectedEnd),
  }
}

/// A PNG keyword: 1 to 79 bytes, no NUL.
///
/// The wire format is Latin-1 but this crate stays within the ASCII
/// subset, which every real-world keyword uses anyway.
fn check_keyword(keyword: &str) -> Result<(), PngError> {
  let bytes = keyword.as_bytes();
  if bytes.is_empty() || bytes.len() > 79 || bytes.iter().any(|b| *b == 0 || !b.is_ascii()) {
    return Err(PngError::BadTextChunk);
  }
  Ok(())
}

/// Builds an `iCCP` chunk payload.
///
/// `compressed_profile` must already be a zlib stream (the chunk's
/// compression method 0); this codec does not compress.
pub fn encode_iccp(name: &str, compressed_profile: &[u8]) -> Result<Chunk, PngError> {
  check_keyword(name)?;
  let mut data = Vec::with_capacity(name.len() + 2 + compressed_profile.len());
  data.extend_from_slice(name.as_bytes());
  data.push(0);
  data.push(0); // compression method, zlib is the only defined one
  data.extend_from_slice(compressed_profile);
  Ok(Chunk::new(ChunkType::iCCP, data))
}

/// Splits an `iCCP` payload into its profile name and its still
/// compressed profile bytes, borrowing both from the payload.
pub fn decode_iccp(payload: &[u8]) -> Result<(&str, &[u8]), PngError> {
  let nul = payload.iter().position(|b| *b == 0).ok_or(PngError::BadTextChunk)?;
  let name = core::str::from_utf8(&payload[..nul]).map_err(|_| PngError::BadTextChunk)?;
  check_keyword(name)?;
  match &payload[nul + 1..] {
    [0, ..] => Ok((name, &payload[nul + 2..])),
    _ => Err(PngError::BadTextChunk),
  }
}

/// The decoded fields of an `iTXt` chunk, borrowing from the payload.
///
/// When `compression_flag` is 1 the `text` field holds the still
/// compressed bytes of the UTF-8 text; decompression is the caller's
/// business, same as for `iCCP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternationalText<'a> {
  pub keyword: &'a str,
  pub compression_flag: u8,
  pub compression_method: u8,
  pub language_tag: &'a str,
  pub translated_keyword: &'a str,
  pub text: &'a [u8],
}
impl<'a> InternationalText<'a> {
  /// Plain uncompressed text under a keyword, no language information.
  #[inline]
  #[must_use]
  pub fn plain(keyword: &'a str, text: &'a str) -> Self {
    Self {
      keyword,
      compression_flag: 0,
      compression_method: 0,
      language_tag: "",
      translated_keyword: "",
      text: text.as_bytes(),
    }
  }

  /// The text as UTF-8, when it is stored uncompressed.
  pub fn text_str(&self) -> Result<&'a str, PngError> {
    if self.compression_flag != 0 {
      return Err(PngError::BadTextChunk);
    }
    core::str::from_utf8(self.text).map_err(|_| PngError::BadTextChunk)
  }

  pub fn to_chunk(&self) -> Result<Chunk, PngError> {
    check_keyword(self.keyword)?;
    let mut data = Vec::with_capacity(
      self.keyword.len()
        + self.language_tag.len()
        + self.translated_keyword.len()
        + self.text.len()
        + 5,
    );
    data.extend_from_slice(self.keyword.as_bytes());
    data.push(0);
    data.push(self.compression_flag);
    data.push(self.compression_method);
    data.extend_from_slice(self.language_tag.as_bytes());
    data.push(0);
    data.extend_from_slice(self.translated_keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(self.text);
    Ok(Chunk::new(ChunkType::iTXt, data))
  }

  pub fn from_payload(payload: &'a [u8]) -> Result<Self, PngError> {
    let nul = payload.iter().position(|b| *b == 0).ok_or(PngError::BadTextChunk)?;
    let keyword = core::str::from_utf8(&payload[..nul]).map_err(|_| PngError::BadTextChunk)?;
    check_keyword(keyword)?;
    let rest = &payload[nul + 1..];
    let (&compression_flag, rest) = rest.split_first().ok_or(PngError::UnexpectedEnd)?;
    let (&compression_method, rest) = rest.split_first().ok_or(PngError::UnexpectedEnd)?;
    let nul = rest.iter().position(|b| *b == 0).ok_or(PngError::BadTextChunk)?;
    let language_tag =
      core::str::from_utf8(&rest[..nul]).map_err(|_| PngError::BadTextChunk)?;
    let rest = &rest[nul + 1..];
    let nul = rest.iter().position(|b| *b == 0).ok_or(PngError::BadTextChunk)?;
    let translated_keyword =
      core::str::from_utf8(&rest[..nul]).map_err(|_| PngError::BadTextChunk)?;
    let text = &rest[nul + 1..];
    Ok(Self {
      keyword,
      compression_flag,
      compression_method,
      language_tag,
      translated_keyword,
      text,
    })
  }
}
