#![allow(bad_style)]
#![cfg(all(feature = "alloc", feature = "miniz_oxide"))]

use pngforge::{
  deflate_band, deflate_zlib, encode, encode_banded, inflate_zlib, read_chunks, read_header,
  unfilter_scanlines, ChunkIter, ChunkType, ColorType, EncodeOptions, FilterMethod, ImageHeader,
  PixelData, ReadOptions,
};

fn rand_bytes(count: usize) -> Vec<u8> {
  let mut buffer = vec![0; count];
  getrandom::getrandom(&mut buffer).unwrap();
  buffer
}

fn inflate_idats(png: &[u8]) -> Vec<u8> {
  let mut stream = Vec::new();
  for chunk in read_chunks(png, ReadOptions { check_crc: true }).unwrap() {
    if chunk.ty == ChunkType::IDAT {
      stream.extend_from_slice(chunk.data);
    }
  }
  inflate_zlib(&stream).unwrap()
}

#[test]
fn test_encode_decode_pipeline_8_bit() {
  let header = ImageHeader {
    width: 31,
    height: 17,
    bit_depth: 8,
    color_type: ColorType::Rgba,
    interlace: 0,
  };
  let pixels = rand_bytes(31 * 17 * 4);
  for filter in [
    FilterMethod::None,
    FilterMethod::Sub,
    FilterMethod::Up,
    FilterMethod::Average,
    FilterMethod::Paeth,
  ] {
    let opts = EncodeOptions { header, filter, first_filter: None };
    let png =
      encode(PixelData::Eight(&pixels), &opts, &[], |b| Ok(deflate_zlib(b, 6))).unwrap();
    assert_eq!(read_header(&png, ReadOptions::default()).unwrap(), header);
    let mut filtered = inflate_idats(&png);
    unfilter_scanlines(&header, &mut filtered).unwrap();
    let stride = 31 * 4;
    for (r, row) in filtered.chunks_exact(1 + stride).enumerate() {
      assert_eq!(&row[1..], &pixels[r * stride..(r + 1) * stride], "filter {filter:?} row {r}");
    }
  }
}

#[test]
fn test_encode_decode_pipeline_16_bit() {
  let header = ImageHeader {
    width: 9,
    height: 11,
    bit_depth: 16,
    color_type: ColorType::Rgb,
    interlace: 0,
  };
  let raw = rand_bytes(9 * 11 * 3 * 2);
  let words: Vec<u16> =
    raw.chunks_exact(2).map(|p| u16::from_ne_bytes([p[0], p[1]])).collect();
  let opts = EncodeOptions { header, filter: FilterMethod::Paeth, first_filter: None };
  let png =
    encode(PixelData::Sixteen(&words), &opts, &[], |b| Ok(deflate_zlib(b, 6))).unwrap();
  let mut filtered = inflate_idats(&png);
  unfilter_scanlines(&header, &mut filtered).unwrap();
  let stride = 9 * 3 * 2;
  let mut recovered: Vec<u16> = Vec::new();
  for row in filtered.chunks_exact(1 + stride) {
    for pair in row[1..].chunks_exact(2) {
      recovered.push(u16::from_be_bytes([pair[0], pair[1]]));
    }
  }
  assert_eq!(recovered, words);
}

#[test]
fn test_banded_and_plain_encodes_decode_identically() {
  let header = ImageHeader {
    width: 16,
    height: 33,
    bit_depth: 8,
    color_type: ColorType::Rgb,
    interlace: 0,
  };
  let pixels = rand_bytes(16 * 33 * 3);
  let level = 6;
  // the safe-first-filter rule makes every banding of a Sub-filtered
  // image produce the same filtered stream
  let opts = EncodeOptions { header, filter: FilterMethod::Sub, first_filter: None };
  let plain = encode_banded(
    PixelData::Eight(&pixels),
    &opts,
    &[],
    1,
    level,
    |b, f| deflate_band(b, f, level),
  )
  .unwrap();
  let whole = inflate_idats(&plain);
  for bands in [2, 3, 5, 8] {
    let banded = encode_banded(
      PixelData::Eight(&pixels),
      &opts,
      &[],
      bands,
      level,
      |b, f| deflate_band(b, f, level),
    )
    .unwrap();
    assert_eq!(inflate_idats(&banded), whole, "bands {bands}");
  }
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_encode_matches_sequential_bytes() {
  use pngforge::encode_parallel;
  let header = ImageHeader {
    width: 20,
    height: 50,
    bit_depth: 8,
    color_type: ColorType::Rgba,
    interlace: 0,
  };
  let pixels = rand_bytes(20 * 50 * 4);
  let level = 6;
  let opts = EncodeOptions { header, filter: FilterMethod::Paeth, first_filter: None };
  let sequential = encode_banded(
    PixelData::Eight(&pixels),
    &opts,
    &[],
    4,
    level,
    |b, f| deflate_band(b, f, level),
  )
  .unwrap();
  let parallel = encode_parallel(
    PixelData::Eight(&pixels),
    &opts,
    &[],
    4,
    level,
    |b, f| deflate_band(b, f, level),
  )
  .unwrap();
  assert_eq!(sequential, parallel);
}

#[test]
fn test_ChunkIter_no_panics_on_garbage() {
  // random data should error out, never panic
  for _ in 0..10 {
    let v = rand_bytes(1024);
    if let Ok(iter) = ChunkIter::new(&v, ReadOptions { check_crc: true }) {
      for _ in iter {
        //
      }
    }
  }
  // a real signature followed by garbage shouldn't panic either
  for _ in 0..10 {
    let mut v = pngforge::PNG_SIGNATURE.to_vec();
    v.extend_from_slice(&rand_bytes(512));
    for _ in ChunkIter::new(&v, ReadOptions { check_crc: true }).unwrap() {
      //
    }
  }
}
