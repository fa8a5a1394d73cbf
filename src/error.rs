use crate::chunk::ChunkType;

/// An error from the `pngforge` crate.
///
/// Every failure surfaces as a distinct kind; nothing is coerced to a
/// default value or silently recovered. Compressor failures are
/// propagated, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngError {
  /// The first 8 bytes did not match the PNG signature.
  BadSignature,

  /// The signature's leading bytes were fine but its CR/LF tail was
  /// mangled, which usually means the file went through a line-ending
  /// conversion (e.g. FTP text mode).
  SignatureLineEndings,

  /// The first chunk of the stream was not `IHDR`.
  FirstChunkNotIhdr,

  /// The buffer ran out before an `IEND` chunk was seen, either between
  /// chunks or in the middle of one.
  UnexpectedEnd,

  /// A chunk's stored CRC did not match its contents.
  ///
  /// Carries the type of the offending chunk. Only produced when CRC
  /// verification is enabled via [`ReadOptions`](crate::ReadOptions).
  CrcMismatch(ChunkType),

  /// An `IHDR` payload was not exactly 13 bytes.
  BadIhdr,

  /// Bit depths other than 8 and 16 are not supported.
  UnsupportedDepth(u8),

  /// Per-scanline filter values outside `0..=4`.
  UnsupportedFilter(u8),

  /// The pixel buffer length is not a whole number of scanlines, or
  /// implies more scanlines than the declared height.
  GeometryMismatch,

  /// A chunk name was not exactly 4 ASCII characters.
  BadChunkName,

  /// The color type byte was not one of the defined models.
  UnsupportedColorType(u8),

  /// The declared width and/or height of this image is 0.
  ZeroDimension,

  /// A text-bearing chunk payload was malformed: keyword missing or too
  /// long, a NUL separator absent, or a field that must be UTF-8 wasn't.
  BadTextChunk,

  /// An `sRGB` rendering intent byte outside `0..=3`.
  BadRenderingIntent(u8),

  /// The injected compressor reported a failure.
  Compressor,
}
