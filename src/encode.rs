//! Whole-image encoding: pixels in, PNG bytes out.
//!
//! The drivers here chain the rest of the crate together: filter the
//! pixel buffer, compress it, frame everything as chunks. Compression
//! is injected as a function so any deflate implementation plugs in;
//! with the `miniz_oxide` feature the [`deflate_zlib`] /
//! [`deflate_band`] adapters are ready to pass.
//!
//! Three drivers, one output format:
//!
//! * [`encode`]: one zlib stream, one `IDAT` chunk.
//! * [`encode_banded`]: the image split into bands, one `IDAT` per
//!   band, stitched into a single valid zlib stream across chunks.
//! * [`encode_parallel`]: same output as `encode_banded`, with the
//!   bands compressed on a rayon pool (`parallel` feature).

use crate::{
  band::{encode_bands, zlib_header_for_level, CompressedBand, Flush},
  checksum::adler32_combine,
  chunk::{push_chunk, Chunk, ChunkType, PNG_SIGNATURE},
  error::PngError,
  filter::{filter_scanlines, FilterMethod, PixelData},
  ihdr::ImageHeader,
};

use alloc::vec::Vec;

#[cfg(feature = "miniz_oxide")]
use alloc::vec;

/// Settings for the encoding drivers.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
  /// Geometry and pixel layout of the image.
  pub header: ImageHeader,
  /// Filter applied to every scanline.
  pub filter: FilterMethod,
  /// Override for scanline 0 only. `None` means use `filter` there too.
  ///
  /// The banded drivers ignore this: each band's first row is forced to
  /// a filter with no "above" dependency.
  pub first_filter: Option<FilterMethod>,
}
impl Default for EncodeOptions {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self { header: ImageHeader::default(), filter: FilterMethod::Paeth, first_filter: None }
  }
}

/// The pixel buffer must hold exactly `height` scanlines here; the
/// partial-image allowance exists only inside band encoding.
fn full_image_geometry(header: &ImageHeader, byte_len: usize) -> Result<(), PngError> {
  if header.width == 0 || header.height == 0 {
    return Err(PngError::ZeroDimension);
  }
  let stride = header.bytes_per_scanline()?;
  if byte_len != stride * header.height as usize {
    return Err(PngError::GeometryMismatch);
  }
  Ok(())
}

fn begin_png(header: &ImageHeader, ancillary: &[Chunk]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&PNG_SIGNATURE);
  push_chunk(&mut out, ChunkType::IHDR, &header.to_bytes());
  for chunk in ancillary {
    push_chunk(&mut out, chunk.ty, &chunk.data);
  }
  out
}

/// Encodes a complete PNG with a single `IDAT` chunk.
///
/// `zlib_deflate` must produce a complete zlib stream (header and
/// Adler32 trailer included) for the filtered scanlines it is given.
/// `ancillary` chunks land between `IHDR` and `IDAT` in the order
/// given.
pub fn encode<F>(
  pixels: PixelData<'_>, opts: &EncodeOptions, ancillary: &[Chunk], zlib_deflate: F,
) -> Result<Vec<u8>, PngError>
where
  F: Fn(&[u8]) -> Result<Vec<u8>, PngError>,
{
  full_image_geometry(&opts.header, pixels.byte_len())?;
  let filtered = filter_scanlines(&opts.header, pixels, opts.filter, opts.first_filter)?;
  let idat = zlib_deflate(&filtered)?;
  let mut out = begin_png(&opts.header, ancillary);
  push_chunk(&mut out, ChunkType::IDAT, &idat);
  push_chunk(&mut out, ChunkType::IEND, &[]);
  Ok(out)
}

/// Frames compressed bands as `IDAT` chunks onto a PNG in progress.
///
/// The zlib header rides in the first band's chunk and the combined
/// Adler32 trailer in the last one, so the concatenated `IDAT` payloads
/// form exactly one zlib stream.
fn push_band_idats(out: &mut Vec<u8>, bands: &[CompressedBand], level: u8) {
  let mut adler: Option<u32> = None;
  for band in bands {
    let mut data = Vec::with_capacity(band.bytes.len() + 6);
    if band.is_first {
      data.extend_from_slice(&zlib_header_for_level(level));
    }
    data.extend_from_slice(&band.bytes);
    adler = Some(adler32_combine(adler, band.adler32, band.raw_len));
    if band.is_last {
      data.extend_from_slice(&adler.unwrap_or(1).to_be_bytes());
    }
    push_chunk(out, ChunkType::IDAT, &data);
  }
}

/// Encodes a complete PNG as `bands` independently compressed bands.
///
/// `deflate_raw` must produce *headerless* deflate data, fully flushed
/// or finished per its [`Flush`] argument. `level` only picks the
/// advisory zlib header bytes; it has to match whatever the compressor
/// actually does only in spirit, as decoders ignore the hint.
pub fn encode_banded<F>(
  pixels: PixelData<'_>, opts: &EncodeOptions, ancillary: &[Chunk], bands: usize, level: u8,
  deflate_raw: F,
) -> Result<Vec<u8>, PngError>
where
  F: Fn(&[u8], Flush) -> Result<Vec<u8>, PngError>,
{
  full_image_geometry(&opts.header, pixels.byte_len())?;
  let compressed = encode_bands(&opts.header, pixels, opts.filter, bands, &deflate_raw)?;
  let mut out = begin_png(&opts.header, ancillary);
  push_band_idats(&mut out, &compressed, level);
  push_chunk(&mut out, ChunkType::IEND, &[]);
  Ok(out)
}

/// [`encode_banded`] with the band compression fanned out on rayon.
///
/// Byte-for-byte identical output to the sequential driver for the same
/// compressor.
#[cfg(feature = "parallel")]
#[cfg_attr(docs_rs, doc(cfg(feature = "parallel")))]
pub fn encode_parallel<F>(
  pixels: PixelData<'_>, opts: &EncodeOptions, ancillary: &[Chunk], bands: usize, level: u8,
  deflate_raw: F,
) -> Result<Vec<u8>, PngError>
where
  F: Fn(&[u8], Flush) -> Result<Vec<u8>, PngError> + Sync,
{
  full_image_geometry(&opts.header, pixels.byte_len())?;
  let compressed =
    crate::band::encode_bands_parallel(&opts.header, pixels, opts.filter, bands, &deflate_raw)?;
  let mut out = begin_png(&opts.header, ancillary);
  push_band_idats(&mut out, &compressed, level);
  push_chunk(&mut out, ChunkType::IEND, &[]);
  Ok(out)
}

/// One-shot zlib compression via `miniz_oxide`.
///
/// Suitable for [`encode`]'s compressor argument as
/// `|b| Ok(deflate_zlib(b, level))`.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
#[must_use]
pub fn deflate_zlib(bytes: &[u8], level: u8) -> Vec<u8> {
  miniz_oxide::deflate::compress_to_vec_zlib(bytes, level)
}

/// One-shot zlib decompression via `miniz_oxide`.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
pub fn inflate_zlib(bytes: &[u8]) -> Result<Vec<u8>, PngError> {
  miniz_oxide::inflate::decompress_to_vec_zlib(bytes).map_err(|_| PngError::Compressor)
}

/// Headerless streaming deflate for one band via `miniz_oxide`.
///
/// Ends the output on a full flush or a stream finish per `flush`, the
/// contract the band assembler needs. Suitable for the banded drivers
/// as `|b, f| deflate_band(b, f, level)`.
#[cfg(feature = "miniz_oxide")]
#[cfg_attr(docs_rs, doc(cfg(feature = "miniz_oxide")))]
pub fn deflate_band(bytes: &[u8], flush: Flush, level: u8) -> Result<Vec<u8>, PngError> {
  use miniz_oxide::deflate::core::{
    compress, create_comp_flags_from_zip_params, CompressorOxide, TDEFLFlush, TDEFLStatus,
  };
  // window_bits 0 selects a raw stream, no zlib wrapper
  let flags = create_comp_flags_from_zip_params(i32::from(level), 0, 0);
  let mut compressor = CompressorOxide::new(flags);
  let flush = match flush {
    Flush::None => TDEFLFlush::None,
    Flush::Full => TDEFLFlush::Full,
    Flush::Finish => TDEFLFlush::Finish,
  };
  let mut out = vec![0_u8; (bytes.len() / 2).max(64)];
  let mut in_pos = 0;
  let mut out_pos = 0;
  loop {
    let (status, bytes_in, bytes_out) =
      compress(&mut compressor, &bytes[in_pos..], &mut out[out_pos..], flush);
    in_pos += bytes_in;
    out_pos += bytes_out;
    match status {
      TDEFLStatus::Done => {
        out.truncate(out_pos);
        return Ok(out);
      }
      TDEFLStatus::Okay => {
        // spare output room after the input ran dry means the flush has
        // fully drained
        if in_pos == bytes.len() && out_pos < out.len() {
          out.truncate(out_pos);
          return Ok(out);
        }
        if out_pos == out.len() {
          out.resize(out.len() * 2, 0);
        }
      }
      _ => return Err(PngError::Compressor),
    }
  }
}

#[cfg(all(test, feature = "miniz_oxide"))]
mod tests {
  use super::*;
  use crate::{
    chunk::{read_chunks, ReadOptions},
    filter::unfilter_scanlines,
    ihdr::ColorType,
  };

  #[test]
  fn solid_color_column_pipeline() {
    // white, red, green, blue stacked in a 1-wide column
    let header = ImageHeader {
      width: 1,
      height: 4,
      bit_depth: 8,
      color_type: ColorType::Rgb,
      interlace: 0,
    };
    let pixels: [u8; 12] = [255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255];
    let opts = EncodeOptions { header, filter: FilterMethod::None, first_filter: None };
    let png =
      encode(PixelData::Eight(&pixels), &opts, &[], |b| Ok(deflate_zlib(b, 6))).unwrap();
    let chunks = read_chunks(&png, ReadOptions { check_crc: true }).unwrap();
    assert_eq!(chunks[0].ty, ChunkType::IHDR);
    assert_eq!(chunks[1].ty, ChunkType::IDAT);
    assert_eq!(chunks[2].ty, ChunkType::IEND);
    let inflated = inflate_zlib(chunks[1].data).unwrap();
    let want: [u8; 16] = [0, 255, 255, 255, 0, 255, 0, 0, 0, 0, 255, 0, 0, 0, 0, 255];
    assert_eq!(inflated, want);
  }

  #[test]
  fn ancillary_chunks_land_between_ihdr_and_idat() {
    let header = ImageHeader { width: 2, height: 2, ..Default::default() };
    let opts = EncodeOptions { header, ..Default::default() };
    let pixels = [7_u8; 16];
    let extra = [Chunk::new(ChunkType::pHYs, alloc::vec![0, 0, 46, 35, 0, 0, 46, 35, 1])];
    let png =
      encode(PixelData::Eight(&pixels), &opts, &extra, |b| Ok(deflate_zlib(b, 6))).unwrap();
    let chunks = read_chunks(&png, ReadOptions::default()).unwrap();
    let types: alloc::vec::Vec<ChunkType> = chunks.iter().map(|c| c.ty).collect();
    assert_eq!(
      types,
      [ChunkType::IHDR, ChunkType::pHYs, ChunkType::IDAT, ChunkType::IEND]
    );
  }

  #[test]
  fn banded_idats_form_one_zlib_stream() {
    let header = ImageHeader {
      width: 8,
      height: 21,
      bit_depth: 8,
      color_type: ColorType::Rgba,
      interlace: 0,
    };
    let pixels: alloc::vec::Vec<u8> = (0..8 * 21 * 4).map(|i| (i % 253) as u8).collect();
    let opts = EncodeOptions { header, filter: FilterMethod::Paeth, first_filter: None };
    let level = 6;
    let png = encode_banded(
      PixelData::Eight(&pixels),
      &opts,
      &[],
      4,
      level,
      |b, f| deflate_band(b, f, level),
    )
    .unwrap();
    let chunks = read_chunks(&png, ReadOptions { check_crc: true }).unwrap();
    let idats: alloc::vec::Vec<&[u8]> =
      chunks.iter().filter(|c| c.ty == ChunkType::IDAT).map(|c| c.data).collect();
    assert_eq!(idats.len(), 4);
    let mut stream = alloc::vec::Vec::new();
    for idat in idats {
      stream.extend_from_slice(idat);
    }
    let mut inflated = inflate_zlib(&stream).unwrap();
    assert_eq!(inflated.len(), 21 * (1 + 32));
    unfilter_scanlines(&header, &mut inflated).unwrap();
    for (r, row) in inflated.chunks_exact(33).enumerate() {
      assert_eq!(row[0], 0);
      assert_eq!(&row[1..], &pixels[r * 32..(r + 1) * 32], "row {r}");
    }
  }

  #[test]
  fn compressor_errors_propagate() {
    let header = ImageHeader { width: 2, height: 2, ..Default::default() };
    let opts = EncodeOptions { header, ..Default::default() };
    let pixels = [0_u8; 16];
    let got = encode(PixelData::Eight(&pixels), &opts, &[], |_| Err(PngError::Compressor));
    assert_eq!(got.err(), Some(PngError::Compressor));
  }
}
