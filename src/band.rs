//! Splitting an image into horizontal bands that compress independently.
//!
//! Deflate is sequential, so compressing one huge `IDAT` stream is a
//! single-core affair. The trick here: cut the image into horizontal
//! bands, filter and *raw*-deflate each band on its own (full-flush on
//! every band but the last, finish on the last), then stitch the pieces
//! back together. A raw deflate stream that ends on a full flush is a
//! valid prefix of a longer one, so `zlib header ‖ band₀ ‖ band₁ ‖ … ‖
//! combined Adler32` inflates to exactly the concatenated filtered
//! scanlines. [`adler32_combine`](crate::checksum::adler32_combine)
//! produces the trailer without ever rescanning the data.
//!
//! The price of independence is that a band can't see its predecessor's
//! last scanline, so its first row must use a filter with no "above"
//! dependency. [`safe_first_filter`] enforces that.
//!
//! Compression itself is injected: any `Fn(&[u8], Flush) -> Result<Vec
//! <u8>, PngError>` that produces *headerless* deflate data works. The
//! `miniz_oxide` feature provides [`deflate_band`](crate::encode::deflate_band).

use core::ops::Range;

use crate::{
  checksum::{adler32, adler32_combine},
  error::PngError,
  filter::{filter_scanlines, FilterMethod, PixelData},
  ihdr::ImageHeader,
};

use alloc::vec::Vec;

/// How a band's deflate output must end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
  /// Let the compressor buffer freely (mid-band streaming).
  None,
  /// End on a full flush: byte-aligned, window reset, concatenable.
  Full,
  /// Terminate the deflate stream (last band only).
  Finish,
}

/// One band's compressed output plus what's needed to stitch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBand {
  /// Headerless deflate bytes.
  pub bytes: Vec<u8>,
  /// Adler32 of the band's filtered (uncompressed) scanlines.
  pub adler32: u32,
  /// Byte length of the band's filtered scanlines.
  pub raw_len: u32,
  /// Whether this band holds scanline 0 of the image.
  pub is_first: bool,
  /// Whether this band's stream was finished rather than flushed.
  pub is_last: bool,
}

/// Splits `scanline_count` rows into up to `bands` contiguous ranges.
///
/// The band count is clamped to `1..=scanline_count`. Every band gets
/// `scanline_count / bands` rows and the last one absorbs the
/// remainder, so ranges tile the image exactly in order.
#[must_use]
pub fn band_ranges(scanline_count: usize, bands: usize) -> Vec<Range<usize>> {
  let bands = bands.clamp(1, scanline_count.max(1));
  let base = scanline_count / bands;
  let mut out = Vec::with_capacity(bands);
  for b in 0..bands {
    let start = b * base;
    let end = if b + 1 == bands { scanline_count } else { start + base };
    out.push(start..end);
  }
  out
}

/// Restricts a filter choice to what a band's first scanline can use.
///
/// `None` stays `None`; everything else becomes `Sub`, the only other
/// filter that never reads the scanline above.
#[inline]
#[must_use]
pub const fn safe_first_filter(filter: FilterMethod) -> FilterMethod {
  match filter {
    FilterMethod::None => FilterMethod::None,
    _ => FilterMethod::Sub,
  }
}

/// Filters and compresses one horizontal band of the image.
///
/// `rows` indexes scanlines of `pixels`, which must be the full image
/// buffer. The band's first scanline is filtered with
/// [`safe_first_filter`] so the result never depends on pixels outside
/// the band. The compressor receives [`Flush::Finish`] when `is_last`,
/// otherwise [`Flush::Full`].
pub fn encode_band<F>(
  header: &ImageHeader, pixels: PixelData<'_>, rows: Range<usize>, filter: FilterMethod,
  is_last: bool, deflate_raw: &F,
) -> Result<CompressedBand, PngError>
where
  F: Fn(&[u8], Flush) -> Result<Vec<u8>, PngError>,
{
  let stride = header.bytes_per_scanline()?;
  if stride == 0 {
    return Err(PngError::ZeroDimension);
  }
  let total_rows = pixels.byte_len() / stride;
  if rows.start >= rows.end || rows.end > total_rows {
    return Err(PngError::GeometryMismatch);
  }
  let band_pixels = match pixels {
    PixelData::Eight(bytes) => PixelData::Eight(&bytes[rows.start * stride..rows.end * stride]),
    PixelData::Sixteen(words) => {
      let row_words = stride / 2;
      PixelData::Sixteen(&words[rows.start * row_words..rows.end * row_words])
    }
  };
  let filtered =
    filter_scanlines(header, band_pixels, filter, Some(safe_first_filter(filter)))?;
  let flush = if is_last { Flush::Finish } else { Flush::Full };
  let bytes = deflate_raw(&filtered, flush)?;
  Ok(CompressedBand {
    bytes,
    adler32: adler32(&filtered),
    raw_len: filtered.len() as u32,
    is_first: rows.start == 0,
    is_last,
  })
}

/// Filters and compresses the whole image as `bands` bands, in order.
///
/// This is the sequential driver; with the `parallel` feature,
/// [`encode_bands_parallel`] produces the identical result on a rayon
/// pool.
pub fn encode_bands<F>(
  header: &ImageHeader, pixels: PixelData<'_>, filter: FilterMethod, bands: usize, deflate_raw: &F,
) -> Result<Vec<CompressedBand>, PngError>
where
  F: Fn(&[u8], Flush) -> Result<Vec<u8>, PngError>,
{
  let stride = header.bytes_per_scanline()?;
  if header.width == 0 || header.height == 0 || stride == 0 {
    return Err(PngError::ZeroDimension);
  }
  if pixels.byte_len() % stride != 0 {
    return Err(PngError::GeometryMismatch);
  }
  let ranges = band_ranges(pixels.byte_len() / stride, bands);
  let last = ranges.len() - 1;
  ranges
    .into_iter()
    .enumerate()
    .map(|(i, rows)| encode_band(header, pixels, rows, filter, i == last, deflate_raw))
    .collect()
}

/// [`encode_bands`], but each band compresses as a rayon task.
///
/// Results are collected by band index, so the output order (and every
/// byte of it) matches the sequential driver regardless of which band
/// finishes first.
#[cfg(feature = "parallel")]
#[cfg_attr(docs_rs, doc(cfg(feature = "parallel")))]
pub fn encode_bands_parallel<F>(
  header: &ImageHeader, pixels: PixelData<'_>, filter: FilterMethod, bands: usize, deflate_raw: &F,
) -> Result<Vec<CompressedBand>, PngError>
where
  F: Fn(&[u8], Flush) -> Result<Vec<u8>, PngError> + Sync,
{
  use rayon::prelude::*;
  let stride = header.bytes_per_scanline()?;
  if header.width == 0 || header.height == 0 || stride == 0 {
    return Err(PngError::ZeroDimension);
  }
  if pixels.byte_len() % stride != 0 {
    return Err(PngError::GeometryMismatch);
  }
  let ranges = band_ranges(pixels.byte_len() / stride, bands);
  let last = ranges.len() - 1;
  ranges
    .into_par_iter()
    .enumerate()
    .map(|(i, rows)| encode_band(header, pixels, rows, filter, i == last, deflate_raw))
    .collect()
}

/// The 2-byte zlib stream header for a given compression level.
///
/// CMF is always `0x78` (deflate, 32 KiB window); FLG encodes the
/// level's FLEVEL hint plus the check bits that make `CMF*256 + FLG`
/// divisible by 31.
#[must_use]
pub const fn zlib_header_for_level(level: u8) -> [u8; 2] {
  let flevel: u8 = match level {
    0 | 1 => 0,
    2..=5 => 1,
    6 => 2,
    _ => 3,
  };
  let cmf = 0x78_u8;
  let mut flg = (flevel as u16) << 6;
  let rem = ((cmf as u16) * 256 + flg) % 31;
  if rem != 0 {
    flg += 31 - rem;
  }
  [cmf, flg as u8]
}

/// Stitches compressed bands into one complete zlib stream.
///
/// Output is `zlib_header ‖ band bytes in order ‖ big-endian combined
/// Adler32`. The bands must be every band of one image in scanline
/// order, produced under the rules [`encode_band`] enforces.
#[must_use]
pub fn assemble_zlib(bands: &[CompressedBand], zlib_header: [u8; 2]) -> Vec<u8> {
  let total: usize = 2 + bands.iter().map(|b| b.bytes.len()).sum::<usize>() + 4;
  let mut out = Vec::with_capacity(total);
  out.extend_from_slice(&zlib_header);
  let mut adler: Option<u32> = None;
  for band in bands {
    out.extend_from_slice(&band.bytes);
    adler = Some(adler32_combine(adler, band.adler32, band.raw_len));
  }
  // an image with no bands would still be an empty zlib stream
  out.extend_from_slice(&adler.unwrap_or(1).to_be_bytes());
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ihdr::ColorType;
  use alloc::vec;

  #[test]
  fn band_ranges_tile_the_image() {
    assert_eq!(band_ranges(10, 2), vec![0..5, 5..10]);
    // remainder lands in the last band
    assert_eq!(band_ranges(10, 3), vec![0..3, 3..6, 6..10]);
    // more bands than scanlines clamps down
    assert_eq!(band_ranges(2, 8), vec![0..1, 1..2]);
    assert_eq!(band_ranges(5, 0), vec![0..5]);
  }

  #[test]
  fn safe_first_filter_keeps_only_above_free_filters() {
    assert_eq!(safe_first_filter(FilterMethod::None), FilterMethod::None);
    assert_eq!(safe_first_filter(FilterMethod::Sub), FilterMethod::Sub);
    assert_eq!(safe_first_filter(FilterMethod::Up), FilterMethod::Sub);
    assert_eq!(safe_first_filter(FilterMethod::Average), FilterMethod::Sub);
    assert_eq!(safe_first_filter(FilterMethod::Paeth), FilterMethod::Sub);
  }

  #[test]
  fn zlib_headers_are_valid_for_every_level() {
    assert_eq!(zlib_header_for_level(1), [0x78, 0x01]);
    assert_eq!(zlib_header_for_level(3), [0x78, 0x5E]);
    assert_eq!(zlib_header_for_level(6), [0x78, 0x9C]);
    assert_eq!(zlib_header_for_level(9), [0x78, 0xDA]);
    for level in 0..=9 {
      let [cmf, flg] = zlib_header_for_level(level);
      assert_eq!((u16::from(cmf) * 256 + u16::from(flg)) % 31, 0, "level {level}");
    }
  }

  // A "compressor" that stores bytes untouched. Not deflate, but enough
  // to check the assembly bookkeeping end to end.
  fn store(bytes: &[u8], _flush: Flush) -> Result<alloc::vec::Vec<u8>, PngError> {
    Ok(bytes.to_vec())
  }

  #[test]
  fn assembled_trailer_is_the_whole_stream_adler() {
    let header = ImageHeader {
      width: 4,
      height: 9,
      bit_depth: 8,
      color_type: ColorType::Rgb,
      interlace: 0,
    };
    let pixels: [u8; 108] = core::array::from_fn(|i| (i * 11) as u8);
    let bands =
      encode_bands(&header, PixelData::Eight(&pixels), FilterMethod::Sub, 3, &store).unwrap();
    assert_eq!(bands.len(), 3);
    assert!(bands[0].is_first && !bands[0].is_last);
    assert!(!bands[2].is_first && bands[2].is_last);
    let stream = assemble_zlib(&bands, zlib_header_for_level(6));
    // with the identity compressor the stream body is the filtered data
    let body = &stream[2..stream.len() - 4];
    let trailer = u32::from_be_bytes(stream[stream.len() - 4..].try_into().unwrap());
    assert_eq!(trailer, crate::checksum::adler32(body));
    assert_eq!(body.len(), 9 * (1 + 12));
  }

  #[test]
  fn banding_choices_agree_on_filtered_output() {
    let header = ImageHeader {
      width: 6,
      height: 10,
      bit_depth: 8,
      color_type: ColorType::Rgba,
      interlace: 0,
    };
    let pixels: [u8; 240] = core::array::from_fn(|i| (i * 7 % 256) as u8);
    let whole =
      encode_bands(&header, PixelData::Eight(&pixels), FilterMethod::Sub, 1, &store).unwrap();
    for n in [2, 3, 4, 7] {
      let split =
        encode_bands(&header, PixelData::Eight(&pixels), FilterMethod::Sub, n, &store).unwrap();
      let mut joined = alloc::vec::Vec::new();
      for band in &split {
        joined.extend_from_slice(&band.bytes);
      }
      assert_eq!(joined, whole[0].bytes, "bands {n}");
    }
  }

  #[test]
  fn out_of_range_bands_are_rejected() {
    let header = ImageHeader {
      width: 2,
      height: 4,
      bit_depth: 8,
      color_type: ColorType::Grayscale,
      interlace: 0,
    };
    let pixels = [0_u8; 8];
    let got =
      encode_band(&header, PixelData::Eight(&pixels), 2..6, FilterMethod::Sub, true, &store);
    assert_eq!(got.err(), Some(PngError::GeometryMismatch));
    let got =
      encode_band(&header, PixelData::Eight(&pixels), 3..3, FilterMethod::Sub, true, &store);
    assert_eq!(got.err(), Some(PngError::GeometryMismatch));
  }
}
