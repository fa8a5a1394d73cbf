//! The PNG chunk framing protocol.
//!
//! A PNG byte stream is the 8-byte signature followed by chunk records,
//! each laid out as `u32BE length ‖ 4-byte type ‖ data ‖ u32BE CRC32`,
//! where the CRC covers the type code and the data. The first chunk must
//! be `IHDR` and the stream ends at `IEND`.
//!
//! Reading happens through [`ChunkIter`], a lazy iterator over
//! [`RawChunk`] views into the input buffer. Stopping early is just
//! dropping the iterator. Writing happens through [`push_chunk`] and
//! friends, which compute and append the CRC for you.

use crate::{checksum::crc32, error::PngError, AsciiArray};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// The first eight bytes of every PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A 4-byte PNG chunk type code.
///
/// Type codes are 4 ASCII letters, equivalently interpreted as a
/// big-endian `u32`. Both spellings canonicalize through this one type:
/// [`from_name`](Self::from_name) for the string form and
/// [`from_code`](Self::from_code) for the integer form. Critical and
/// ancillary types differ only by convention (the case of the first
/// letter), not by structure.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const cHRM: Self = Self(*b"cHRM");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const iCCP: Self = Self(*b"iCCP");
  pub const sBIT: Self = Self(*b"sBIT");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const bKGD: Self = Self(*b"bKGD");
  pub const hIST: Self = Self(*b"hIST");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const pHYs: Self = Self(*b"pHYs");
  pub const sPLT: Self = Self(*b"sPLT");
  pub const tIME: Self = Self(*b"tIME");
  pub const iTXt: Self = Self(*b"iTXt");
  pub const tEXt: Self = Self(*b"tEXt");
  pub const zTXt: Self = Self(*b"zTXt");
}
impl ChunkType {
  /// Canonicalizes a 4-character ASCII name into a chunk type.
  ///
  /// Fails with [`PngError::BadChunkName`] when the name is not exactly
  /// four ASCII letters.
  #[inline]
  pub fn from_name(name: &str) -> Result<Self, PngError> {
    let bytes: [u8; 4] = name.as_bytes().try_into().map_err(|_| PngError::BadChunkName)?;
    if bytes.iter().all(|b| b.is_ascii_alphabetic()) {
      Ok(Self(bytes))
    } else {
      Err(PngError::BadChunkName)
    }
  }
  /// Canonicalizes the big-endian `u32` form of a type code.
  #[inline]
  #[must_use]
  pub const fn from_code(code: u32) -> Self {
    Self(code.to_be_bytes())
  }
  /// The big-endian `u32` form of this type code.
  #[inline]
  #[must_use]
  pub const fn code(self) -> u32 {
    u32::from_be_bytes(self.0)
  }
}
impl core::fmt::Debug for ChunkType {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    core::fmt::Debug::fmt(&AsciiArray(self.0), f)
  }
}
impl core::fmt::Display for ChunkType {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    core::fmt::Display::fmt(&AsciiArray(self.0), f)
  }
}

/// An unparsed chunk, viewing data in the source buffer.
///
/// The view is zero-copy; it cannot outlive the input buffer. Use
/// [`to_owned`](Self::to_owned) when the data has to stick around.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  pub ty: ChunkType,
  pub data: &'b [u8],
}
impl core::fmt::Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("ty", &self.ty)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .finish()
  }
}
impl RawChunk<'_> {
  #[inline]
  #[must_use]
  #[cfg(feature = "alloc")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
  pub fn to_owned(&self) -> Chunk {
    Chunk { ty: self.ty, data: self.data.to_vec() }
  }
}

/// An owned chunk value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
pub struct Chunk {
  pub ty: ChunkType,
  pub data: Vec<u8>,
}
#[cfg(feature = "alloc")]
impl Chunk {
  #[inline]
  #[must_use]
  pub fn new(ty: ChunkType, data: Vec<u8>) -> Self {
    Self { ty, data }
  }
  #[inline]
  #[must_use]
  pub fn as_raw(&self) -> RawChunk<'_> {
    RawChunk { ty: self.ty, data: &self.data }
  }
}

/// Options for reading a chunk stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
  /// Verify each chunk's CRC while reading.
  ///
  /// Off by default (it costs a pass over every byte). Once enabled, any
  /// mismatch is fatal and reports the offending chunk's type.
  pub check_crc: bool,
}

/// An iterator that produces successive chunks from PNG bytes.
///
/// The sequence is lazy, finite and non-restartable. It enforces the
/// protocol's framing rules: the signature has already been validated by
/// [`ChunkIter::new`], the first chunk must be `IHDR`, and the stream
/// must reach `IEND` before the buffer runs out. Any violation is
/// yielded as a single fatal `Err`, after which the iterator is fused.
///
/// Consumers that only want a prefix of the stream simply stop calling
/// `next` (for example [`read_header`] returns after the first chunk).
#[derive(Debug, Clone)]
pub struct ChunkIter<'b> {
  spare: &'b [u8],
  check_crc: bool,
  seen_ihdr: bool,
  done: bool,
}
impl<'b> ChunkIter<'b> {
  /// Validates the 8-byte signature and sets up the iterator.
  ///
  /// A stream whose first four bytes are right but whose `\r\n\x1a\n`
  /// tail is wrong gets the distinct
  /// [`SignatureLineEndings`](PngError::SignatureLineEndings) error: that
  /// pattern is the classic fingerprint of a PNG that went through
  /// CR/LF text-mode conversion.
  pub fn new(bytes: &'b [u8], opts: ReadOptions) -> Result<Self, PngError> {
    let rest = match bytes {
      [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, rest @ ..] => rest,
      [0x89, 0x50, 0x4E, 0x47, ..] if bytes.len() >= 8 => {
        return Err(PngError::SignatureLineEndings)
      }
      _ => return Err(PngError::BadSignature),
    };
    Ok(Self { spare: rest, check_crc: opts.check_crc, seen_ihdr: false, done: false })
  }

  /// One fatal error, then the iterator is finished for good.
  #[inline]
  fn fail(&mut self, err: PngError) -> Option<Result<RawChunk<'b>, PngError>> {
    self.done = true;
    Some(Err(err))
  }
}
impl<'b> Iterator for ChunkIter<'b> {
  type Item = Result<RawChunk<'b>, PngError>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    // Reaching the end of the buffer between chunks still means the
    // stream never ended properly: IEND termination sets `done` below.
    let len: usize = if self.spare.len() >= 4 {
      let (len_bytes, rest) = self.spare.split_at(4);
      self.spare = rest;
      u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize
    } else {
      return self.fail(PngError::UnexpectedEnd);
    };
    let ty: ChunkType = if self.spare.len() >= 4 {
      let (ty_bytes, rest) = self.spare.split_at(4);
      self.spare = rest;
      ChunkType(ty_bytes.try_into().unwrap())
    } else {
      return self.fail(PngError::UnexpectedEnd);
    };
    if !self.seen_ihdr {
      if ty != ChunkType::IHDR {
        return self.fail(PngError::FirstChunkNotIhdr);
      }
      self.seen_ihdr = true;
    }
    let data: &'b [u8] = if self.spare.len() >= len {
      let (data, rest) = self.spare.split_at(len);
      self.spare = rest;
      data
    } else {
      return self.fail(PngError::UnexpectedEnd);
    };
    let declared_crc: u32 = if self.spare.len() >= 4 {
      let (crc_bytes, rest) = self.spare.split_at(4);
      self.spare = rest;
      u32::from_be_bytes(crc_bytes.try_into().unwrap())
    } else {
      return self.fail(PngError::UnexpectedEnd);
    };
    if self.check_crc {
      let mut crc = crate::checksum::Crc32::new();
      crc.update(&ty.0);
      crc.update(data);
      if crc.finalize() != declared_crc {
        return self.fail(PngError::CrcMismatch(ty));
      }
    }
    if ty == ChunkType::IEND {
      self.done = true;
    }
    Some(Ok(RawChunk { ty, data }))
  }
}
impl core::iter::FusedIterator for ChunkIter<'_> {}

/// Reads every chunk of a PNG stream up to and including `IEND`.
///
/// The returned chunks are zero-copy views; map them through
/// [`RawChunk::to_owned`] if they need to outlive `bytes`.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
pub fn read_chunks(bytes: &[u8], opts: ReadOptions) -> Result<Vec<RawChunk<'_>>, PngError> {
  ChunkIter::new(bytes, opts)?.collect()
}

/// Reads a PNG stream only as far as its `IHDR` and decodes it.
pub fn read_header(bytes: &[u8], opts: ReadOptions) -> Result<crate::ImageHeader, PngError> {
  let mut it = ChunkIter::new(bytes, opts)?;
  match it.next() {
    Some(Ok(chunk)) => crate::ImageHeader::from_bytes(chunk.data),
    Some(Err(e)) => Err(e),
    None => Err(PngError::UnexpectedEnd),
  }
}

/// An iterator over the `IDAT` payload slices of a PNG stream.
///
/// All `IDAT` chunks together form one zlib stream; feed the slices to a
/// decompressor in order. Framing errors end the iteration early — use
/// [`read_chunks`] when strict validation matters.
pub fn idat_slices(
  bytes: &[u8], opts: ReadOptions,
) -> Result<impl Iterator<Item = &[u8]>, PngError> {
  let it = ChunkIter::new(bytes, opts)?;
  Ok(
    it.map_while(Result::ok)
      .filter(|chunk| chunk.ty == ChunkType::IDAT)
      .map(|chunk| chunk.data),
  )
}

/// Appends one framed chunk record to `out`.
///
/// Writes the big-endian length, the type code, the data, and the CRC32
/// over type-plus-data.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
pub fn push_chunk(out: &mut Vec<u8>, ty: ChunkType, data: &[u8]) {
  out.reserve(12 + data.len());
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  let crc_start = out.len();
  out.extend_from_slice(&ty.0);
  out.extend_from_slice(data);
  let crc = crc32(&out[crc_start..]);
  out.extend_from_slice(&crc.to_be_bytes());
}

/// Encodes a single chunk record into its own buffer.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
#[must_use]
pub fn encode_chunk(ty: ChunkType, data: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(12 + data.len());
  push_chunk(&mut out, ty, data);
  out
}

/// Writes a complete PNG byte stream: signature plus every chunk record.
///
/// The chunk list is taken as-is; callers are responsible for it starting
/// with `IHDR` and ending with `IEND`.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
#[must_use]
pub fn write_png(chunks: &[Chunk]) -> Vec<u8> {
  let total: usize = 8 + chunks.iter().map(|c| 12 + c.data.len()).sum::<usize>();
  let mut out = Vec::with_capacity(total);
  out.extend_from_slice(&PNG_SIGNATURE);
  for chunk in chunks {
    push_chunk(&mut out, chunk.ty, &chunk.data);
  }
  out
}

/// Drops every chunk of the given type from a chunk list.
#[cfg(feature = "alloc")]
#[cfg_attr(docs_rs, doc(cfg(feature = "alloc")))]
#[must_use]
pub fn without_chunks(chunks: Vec<Chunk>, ty: ChunkType) -> Vec<Chunk> {
  chunks.into_iter().filter(|c| c.ty != ty).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::vec;

  #[test]
  fn chunk_type_canonicalizes_both_spellings() {
    assert_eq!(ChunkType::IHDR.code(), 0x4948_4452);
    assert_eq!(ChunkType::from_code(0x4948_4452), ChunkType::IHDR);
    assert_eq!(ChunkType::from_name("IHDR").unwrap(), ChunkType::IHDR);
    assert_eq!(ChunkType::from_name("pHYs").unwrap(), ChunkType::pHYs);
    assert_eq!(ChunkType::from_name("IHD"), Err(PngError::BadChunkName));
    assert_eq!(ChunkType::from_name("IHDRX"), Err(PngError::BadChunkName));
    assert_eq!(ChunkType::from_name("IH0R"), Err(PngError::BadChunkName));
  }

  #[test]
  fn signature_errors_are_distinguished() {
    let err = ChunkIter::new(b"GIF89a something", ReadOptions::default());
    assert_eq!(err.err(), Some(PngError::BadSignature));
    // CRLF conversion ate the CR at offset 4.
    let mangled = [0x89, 0x50, 0x4E, 0x47, 0x0A, 0x1A, 0x0A, 0x00];
    let err = ChunkIter::new(&mangled, ReadOptions::default());
    assert_eq!(err.err(), Some(PngError::SignatureLineEndings));
    let err = ChunkIter::new(&[0x89], ReadOptions::default());
    assert_eq!(err.err(), Some(PngError::BadSignature));
  }

  #[test]
  fn first_chunk_must_be_ihdr() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&PNG_SIGNATURE);
    push_chunk(&mut bytes, ChunkType::IDAT, &[1, 2, 3]);
    push_chunk(&mut bytes, ChunkType::IEND, &[]);
    let got = read_chunks(&bytes, ReadOptions::default());
    assert_eq!(got.err(), Some(PngError::FirstChunkNotIhdr));
  }

  #[test]
  fn missing_iend_is_fatal() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&PNG_SIGNATURE);
    push_chunk(&mut bytes, ChunkType::IHDR, &[0; 13]);
    let got = read_chunks(&bytes, ReadOptions::default());
    assert_eq!(got.err(), Some(PngError::UnexpectedEnd));
    // ...and so is a record truncated partway through.
    bytes.extend_from_slice(&5_u32.to_be_bytes());
    bytes.extend_from_slice(b"IDAT");
    bytes.extend_from_slice(&[1, 2]);
    let got = read_chunks(&bytes, ReadOptions::default());
    assert_eq!(got.err(), Some(PngError::UnexpectedEnd));
  }

  #[test]
  fn chunks_round_trip_with_and_without_crc_checks() {
    let chunks = vec![
      Chunk::new(ChunkType::IHDR, vec![0; 13]),
      Chunk::new(ChunkType::pHYs, vec![0, 0, 46, 35, 0, 0, 46, 35, 1]),
      Chunk::new(ChunkType::IDAT, vec![1, 2, 3, 4, 5]),
      Chunk::new(ChunkType::IEND, vec![]),
    ];
    let bytes = write_png(&chunks);
    for check_crc in [false, true] {
      let got = read_chunks(&bytes, ReadOptions { check_crc }).unwrap();
      assert_eq!(got.len(), chunks.len());
      for (raw, chunk) in got.iter().zip(chunks.iter()) {
        assert_eq!(&raw.to_owned(), chunk);
      }
    }
  }

  #[test]
  fn corrupted_crc_names_the_chunk() {
    let chunks = vec![
      Chunk::new(ChunkType::IHDR, vec![0; 13]),
      Chunk::new(ChunkType::pHYs, vec![0, 0, 46, 35, 0, 0, 46, 35, 1]),
      Chunk::new(ChunkType::IEND, vec![]),
    ];
    let mut bytes = write_png(&chunks);
    // flip one bit in the pHYs record's CRC field (last 4 bytes of the
    // second record)
    let phys_crc_at = 8 + (12 + 13) + 12 + 9 - 4;
    bytes[phys_crc_at] ^= 0x40;
    let got = read_chunks(&bytes, ReadOptions { check_crc: true });
    assert_eq!(got.err(), Some(PngError::CrcMismatch(ChunkType::pHYs)));
    // without verification the damaged chunk reads back unchanged
    let got = read_chunks(&bytes, ReadOptions { check_crc: false }).unwrap();
    assert_eq!(got[1].data, &chunks[1].data[..]);
  }

  #[test]
  fn iteration_stops_at_iend() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&PNG_SIGNATURE);
    push_chunk(&mut bytes, ChunkType::IHDR, &[0; 13]);
    push_chunk(&mut bytes, ChunkType::IEND, &[]);
    // trailing garbage after IEND is never touched
    bytes.extend_from_slice(&[0xAB; 7]);
    let got = read_chunks(&bytes, ReadOptions::default()).unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[1].ty, ChunkType::IEND);
  }

  #[test]
  fn without_chunks_filters_by_type() {
    let chunks = vec![
      Chunk::new(ChunkType::IHDR, vec![0; 13]),
      Chunk::new(ChunkType::tEXt, vec![1]),
      Chunk::new(ChunkType::IEND, vec![]),
    ];
    let filtered = without_chunks(chunks, ChunkType::tEXt);
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|c| c.ty != ChunkType::tEXt));
  }
}
