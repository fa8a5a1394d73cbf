//! The CRC32 and Adler32 engines behind chunk and stream integrity.
//!
//! CRC32 protects each chunk record, Adler32 protects the zlib stream
//! inside `IDAT`. Both are available as one-shot functions and as
//! streaming state so callers can feed data in arbitrary pieces. The
//! extra [`adler32_combine`] operation merges two independently computed
//! Adler32 values without rescanning either buffer, which is what lets
//! band-compressed segments be stitched into one stream.

/// Slice-by-4 CRC32 tables, built once at compile time.
///
/// `CRC_TABLE[0]` is the classic byte-at-a-time table; each further table
/// advances the remainder one more byte so the hot loop can fold four
/// input bytes per iteration.
const CRC_TABLE: [[u32; 256]; 4] = make_crc_tables();

const fn make_crc_tables() -> [[u32; 256]; 4] {
  let mut out = [[0_u32; 256]; 4];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c = c >> 1;
      }
      //
      k += 1;
    }
    out[0][n] = c;
    //
    n += 1;
  }
  let mut n = 0;
  while n < 256 {
    let mut t = 1;
    while t < 4 {
      out[t][n] = (out[t - 1][n] >> 8) ^ out[0][(out[t - 1][n] & 0xFF) as usize];
      t += 1;
    }
    n += 1;
  }
  out
}

fn crc32_update(mut crc: u32, bytes: &[u8]) -> u32 {
  let mut quads = bytes.chunks_exact(4);
  for quad in quads.by_ref() {
    crc ^= u32::from_le_bytes(quad.try_into().unwrap());
    crc = CRC_TABLE[3][(crc & 0xFF) as usize]
      ^ CRC_TABLE[2][((crc >> 8) & 0xFF) as usize]
      ^ CRC_TABLE[1][((crc >> 16) & 0xFF) as usize]
      ^ CRC_TABLE[0][(crc >> 24) as usize];
  }
  for byte in quads.remainder().iter().copied() {
    crc = CRC_TABLE[0][((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
  }
  crc
}

/// Streaming CRC32 (IEEE, reflected) state.
///
/// Feed any number of buffers through [`update`](Self::update), then call
/// [`finalize`](Self::finalize) for the checksum.
#[derive(Debug, Clone, Copy)]
pub struct Crc32(u32);
impl Crc32 {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }
  #[inline]
  pub fn update(&mut self, bytes: &[u8]) {
    self.0 = crc32_update(self.0, bytes);
  }
  /// Complements the running remainder into the final checksum value.
  #[inline]
  #[must_use]
  pub const fn finalize(self) -> u32 {
    self.0 ^ u32::MAX
  }
}
impl Default for Crc32 {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self::new()
  }
}

/// CRC32 of a single buffer.
#[inline]
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
  let mut crc = Crc32::new();
  crc.update(bytes);
  crc.finalize()
}

const ADLER_BASE: u32 = 65_521;

/// Largest number of bytes the two Adler sums can absorb before the
/// 32-bit `s2` accumulator must be reduced (zlib's NMAX).
const ADLER_NMAX: usize = 5552;

/// Streaming Adler32 state, starting from the standard seed of 1.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
  s1: u32,
  s2: u32,
}
impl Adler32 {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { s1: 1, s2: 0 }
  }
  pub fn update(&mut self, bytes: &[u8]) {
    for run in bytes.chunks(ADLER_NMAX) {
      for byte in run.iter().copied() {
        self.s1 += u32::from(byte);
        self.s2 += self.s1;
      }
      self.s1 %= ADLER_BASE;
      self.s2 %= ADLER_BASE;
    }
  }
  #[inline]
  #[must_use]
  pub const fn finish(self) -> u32 {
    (self.s2 << 16) | self.s1
  }
}
impl Default for Adler32 {
  #[inline]
  #[must_use]
  fn default() -> Self {
    Self::new()
  }
}

/// Adler32 of a single buffer.
#[inline]
#[must_use]
pub fn adler32(bytes: &[u8]) -> u32 {
  let mut adler = Adler32::new();
  adler.update(bytes);
  adler.finish()
}

/// Merges the Adler32 checksums of two adjacent buffers.
///
/// Given `a1 = adler32(A)` and `a2 = adler32(B)`, returns `adler32(A‖B)`
/// using zlib's combination identity over GF(65521). `len2` must be the
/// exact byte length of the buffer that produced `a2`; a wrong length
/// yields a wrong but structurally valid checksum, so callers have to
/// track lengths precisely.
///
/// Passing `None` for the first checksum (no preceding segment) returns
/// `a2` unchanged.
#[must_use]
pub fn adler32_combine(a1: Option<u32>, a2: u32, len2: u32) -> u32 {
  let a1 = match a1 {
    Some(a1) => a1,
    None => return a2,
  };
  let rem = len2 % ADLER_BASE;
  let mut sum1 = a1 & 0xFFFF;
  let mut sum2 = (rem * sum1) % ADLER_BASE;
  sum1 += (a2 & 0xFFFF) + ADLER_BASE - 1;
  sum2 += ((a1 >> 16) & 0xFFFF) + ((a2 >> 16) & 0xFFFF) + ADLER_BASE - rem;
  if sum1 >= ADLER_BASE {
    sum1 -= ADLER_BASE;
  }
  if sum1 >= ADLER_BASE {
    sum1 -= ADLER_BASE;
  }
  if sum2 >= ADLER_BASE << 1 {
    sum2 -= ADLER_BASE << 1;
  }
  if sum2 >= ADLER_BASE {
    sum2 -= ADLER_BASE;
  }
  (sum2 << 16) | sum1
}
