//! Scanline filtering and de-filtering.
//!
//! PNG compresses filtered scanlines, not raw pixels: each row is
//! prefixed with a one-byte filter tag and transformed relative to its
//! neighbors so the deflate stage sees smaller residuals. This module
//! turns pixel buffers into the pre-compression `IDAT` payload
//! ([`filter_scanlines`]) and reverses the transform in place after
//! inflation ([`unfilter_scanlines`]).
//!
//! All filter arithmetic is modulo 256 (`wrapping_add` /
//! `wrapping_sub`); "left", "above" and "upper-left" neighbors that fall
//! outside the image read as zero. For 16-bit images the multi-byte
//! samples are repacked to PNG's big-endian order first, and the filters
//! then run on the packed bytes exactly as in the 8-bit case.

use crate::{
  error::PngError,
  ihdr::ImageHeader,
};

#[cfg(feature = "alloc")]
use alloc::{vec, vec::Vec};

/// The five per-scanline filter methods of PNG filter method 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FilterMethod {
  None = 0,
  Sub = 1,
  Up = 2,
  Average = 3,
  Paeth = 4,
}
impl TryFrom<u8> for FilterMethod {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(FilterMethod::None),
      1 => Ok(FilterMethod::Sub),
      2 => Ok(FilterMethod::Up),
      3 => Ok(FilterMethod::Average),
      4 => Ok(FilterMethod::Paeth),
      other => Err(PngError::UnsupportedFilter(other)),
    }
  }
}

/// A borrowed pixel buffer in the machine's native layout.
///
/// Sixteen-bit images are handed over as `&[u16]` so the caller never
/// has to think about byte order; the filter engine does the big-endian
/// repacking itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelData<'a> {
  Eight(&'a [u8]),
  Sixteen(&'a [u16]),
}
impl<'a> PixelData<'a> {
  /// Views a raw byte buffer as pixel data for the given header.
  ///
  /// For 16-bit headers the bytes are reinterpreted as native-endian
  /// `u16` values, which requires the buffer to be 2-aligned and of even
  /// length.
  pub fn from_native_bytes(header: &ImageHeader, bytes: &'a [u8]) -> Result<Self, PngError> {
    match header.bit_depth {
      8 => Ok(PixelData::Eight(bytes)),
      16 => match bytemuck::try_cast_slice(bytes) {
        Ok(words) => Ok(PixelData::Sixteen(words)),
        Err(_) => Err(PngError::GeometryMismatch),
      },
      other => Err(PngError::UnsupportedDepth(other)),
    }
  }
  /// Total length of the buffer in bytes.
  #[inline]
  #[must_use]
  pub const fn byte_len(&self) -> usize {
    match self {
      PixelData::Eight(bytes) => bytes.len(),
      PixelData::Sixteen(words) => words.len() * 2,
    }
  }
}

/// `a` is left, `b` is above, `c` is upper-left.
///
/// Ties break toward left, then above, exactly per the PNG spec's
/// ordering of the comparisons.
const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let p = a as i32 + b as i32 - c as i32;
  let pa = (p - a as i32).unsigned_abs();
  let pb = (p - b as i32).unsigned_abs();
  let pc = (p - c as i32).unsigned_abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Filters one packed scanline into `out`.
///
/// `prev` is the packed previous scanline, or empty for the image's (or
/// band's) first row, in which case every "above" sample reads as zero.
fn filter_row(out: &mut [u8], cur: &[u8], prev: &[u8], bpp: usize, method: FilterMethod) {
  debug_assert_eq!(out.len(), cur.len());
  debug_assert!(prev.is_empty() || prev.len() == cur.len());
  let above = |i: usize| if prev.is_empty() { 0 } else { prev[i] };
  match method {
    FilterMethod::None => out.copy_from_slice(cur),
    FilterMethod::Sub => {
      for i in 0..cur.len() {
        let left = if i >= bpp { cur[i - bpp] } else { 0 };
        out[i] = cur[i].wrapping_sub(left);
      }
    }
    FilterMethod::Up => {
      for i in 0..cur.len() {
        out[i] = cur[i].wrapping_sub(above(i));
      }
    }
    FilterMethod::Average => {
      for i in 0..cur.len() {
        let left = if i >= bpp { cur[i - bpp] } else { 0 };
        let avg = ((left as u16 + above(i) as u16) / 2) as u8;
        out[i] = cur[i].wrapping_sub(avg);
      }
    }
    FilterMethod::Paeth => {
      for i in 0..cur.len() {
        let left = if i >= bpp { cur[i - bpp] } else { 0 };
        let upleft = if i >= bpp { above(i - bpp) } else { 0 };
        out[i] = cur[i].wrapping_sub(paeth_predict(left, above(i), upleft));
      }
    }
  }
}

/// Reverses one scanline's filter in place.
///
/// `prev` is the already-reconstructed previous scanline, or empty for
/// the first row.
fn unfilter_row(cur: &mut [u8], prev: &[u8], bpp: usize, method: FilterMethod) {
  let above = |prev: &[u8], i: usize| if prev.is_empty() { 0_u8 } else { prev[i] };
  match method {
    FilterMethod::None => (),
    FilterMethod::Sub => {
      for i in bpp..cur.len() {
        cur[i] = cur[i].wrapping_add(cur[i - bpp]);
      }
    }
    FilterMethod::Up => {
      for i in 0..cur.len() {
        cur[i] = cur[i].wrapping_add(above(prev, i));
      }
    }
    FilterMethod::Average => {
      for i in 0..cur.len() {
        let left = if i >= bpp { cur[i - bpp] } else { 0 };
        let avg = ((left as u16 + above(prev, i) as u16) / 2) as u8;
        cur[i] = cur[i].wrapping_add(avg);
      }
    }
    FilterMethod::Paeth => {
      for i in 0..cur.len() {
        let left = if i >= bpp { cur[i - bpp] } else { 0 };
        let upleft = if i >= bpp { above(prev, i - bpp) } else { 0 };
        cur[i] = cur[i].wrapping_add(paeth_predict(left, above(prev, i), upleft));
      }
    }
  }
}

/// Checks pixel geometry and returns `(bytes_per_pixel, stride, rows)`.
///
/// `stride` is the packed byte length of one scanline without the filter
/// tag. The buffer may hold fewer rows than the declared height (bands
/// filter their slice of the image independently) but never more, and
/// never a fractional row.
fn scanline_geometry(
  header: &ImageHeader, byte_len: usize,
) -> Result<(usize, usize, usize), PngError> {
  if header.width == 0 || header.height == 0 {
    return Err(PngError::ZeroDimension);
  }
  let bpp = header.bytes_per_pixel()?;
  let stride = header.bytes_per_scanline()?;
  if byte_len == 0 || byte_len % stride != 0 {
    return Err(PngError::GeometryMismatch);
  }
  let rows = byte_len / stride;
  if rows > header.height as usize {
    return Err(PngError::GeometryMismatch);
  }
  Ok((bpp, stride, rows))
}

/// Filters a pixel buffer into tagged scanlines, ready for compression.
///
/// Output layout is `height` repetitions of `[filter_tag ‖ stride
/// bytes]`. The same `filter` is applied to every row except possibly
/// the first: `first_filter` overrides row zero, which is how a band
/// that doesn't know its predecessor's pixels restricts itself to
/// filters with no "above" dependency.
///
/// For 16-bit input each row is repacked to big-endian before
/// filtering; with `FilterMethod::None` that repacking is the only
/// transformation applied.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
pub fn filter_scanlines(
  header: &ImageHeader, pixels: PixelData<'_>, filter: FilterMethod,
  first_filter: Option<FilterMethod>,
) -> Result<Vec<u8>, PngError> {
  let (bpp, stride, rows) = scanline_geometry(header, pixels.byte_len())?;
  let first = first_filter.unwrap_or(filter);
  let mut out: Vec<u8> = vec![0; rows * (1 + stride)];
  match pixels {
    PixelData::Eight(bytes) => {
      let mut prev: &[u8] = &[];
      for (r, cur) in bytes.chunks_exact(stride).enumerate() {
        let method = if r == 0 { first } else { filter };
        let row_out = &mut out[r * (1 + stride)..(r + 1) * (1 + stride)];
        row_out[0] = method as u8;
        filter_row(&mut row_out[1..], cur, prev, bpp, method);
        prev = cur;
      }
    }
    PixelData::Sixteen(words) => {
      // Two packed rows roll through the image: the row being filtered
      // and its predecessor.
      let mut cur_packed: Vec<u8> = vec![0; stride];
      let mut prev_packed: Vec<u8> = vec![0; stride];
      let mut have_prev = false;
      for (r, cur) in words.chunks_exact(stride / 2).enumerate() {
        for (pair, word) in cur_packed.chunks_exact_mut(2).zip(cur.iter()) {
          pair.copy_from_slice(&word.to_be_bytes());
        }
        let method = if r == 0 { first } else { filter };
        let row_out = &mut out[r * (1 + stride)..(r + 1) * (1 + stride)];
        row_out[0] = method as u8;
        let prev: &[u8] = if have_prev { &prev_packed } else { &[] };
        filter_row(&mut row_out[1..], &cur_packed, prev, bpp, method);
        core::mem::swap(&mut cur_packed, &mut prev_packed);
        have_prev = true;
      }
    }
  }
  Ok(out)
}

/// Reverses scanline filtering in place.
///
/// `bytes` must be whole `[filter_tag ‖ stride bytes]` rows, at most
/// `height` of them. Rows are processed strictly in order since each
/// depends on the one before it. Every tag byte is reset to 0 once its
/// row is reconstructed, so afterwards the pixel bytes can be read with
/// a fixed `1 + stride` step. Sixteen-bit samples stay big-endian; the
/// caller converts when it wants native values.
///
/// An unknown filter tag fails with
/// [`UnsupportedFilter`](PngError::UnsupportedFilter), leaving prior
/// rows reconstructed.
pub fn unfilter_scanlines(header: &ImageHeader, bytes: &mut [u8]) -> Result<(), PngError> {
  if header.width == 0 || header.height == 0 {
    return Err(PngError::ZeroDimension);
  }
  let bpp = header.bytes_per_pixel()?;
  let stride = header.bytes_per_scanline()?;
  let row_len = 1 + stride;
  if bytes.is_empty() || bytes.len() % row_len != 0 {
    return Err(PngError::GeometryMismatch);
  }
  let rows = bytes.len() / row_len;
  if rows > header.height as usize {
    return Err(PngError::GeometryMismatch);
  }
  for r in 0..rows {
    let (done, rest) = bytes.split_at_mut(r * row_len);
    let row = &mut rest[..row_len];
    let method = FilterMethod::try_from(row[0])?;
    let prev: &[u8] = if r == 0 { &[] } else { &done[(r - 1) * row_len + 1..] };
    unfilter_row(&mut row[1..], prev, bpp, method);
    row[0] = 0;
  }
  Ok(())
}
