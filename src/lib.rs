#![no_std]
#![forbid(unsafe_code)]
#![cfg_attr(docs_rs, feature(doc_cfg))]

//! A crate for building and parsing PNG container data.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! This crate handles the *container* layer of PNG: the chunk stream, the
//! IHDR record, the per-scanline filtering that turns pixel data into the
//! pre-compression IDAT payload, and the checksums that hold it all
//! together. It does **not** implement DEFLATE itself — compression and
//! decompression are injected by the caller (the `miniz_oxide` feature
//! provides ready-made adapters).
//!
//! ## Encoding
//!
//! 1) Describe the image with an [`ImageHeader`].
//! 2) Turn the pixel buffer into filtered scanlines with
//!    [`filter_scanlines`], or let [`encode`](encode::encode) drive the
//!    whole pipeline.
//! 3) Compress the filtered bytes with any zlib deflate and frame the
//!    result with [`write_png`] / [`push_chunk`].
//!
//! Large images can be split into horizontal bands that are filtered and
//! compressed independently and then stitched back into one valid zlib
//! stream, see the [`band`] module. With the `parallel` feature the bands
//! are compressed on a rayon pool.
//!
//! ## Decoding
//!
//! [`ChunkIter`] walks the chunk records of a PNG byte slice, optionally
//! verifying each chunk's CRC. [`read_header`] grabs the IHDR,
//! [`idat_slices`] yields the compressed image data, and after inflation
//! [`unfilter_scanlines`] recovers the raw pixel bytes in place.
//!
//! The whole crate is `no_std`; everything that builds owned buffers is
//! behind the `alloc` feature.

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "parallel")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod ascii_array;
pub(crate) use ascii_array::*;

pub mod error;
pub use error::*;

pub mod checksum;
pub use checksum::*;

pub mod chunk;
pub use chunk::*;

pub mod ihdr;
pub use ihdr::*;

pub mod filter;
pub use filter::*;

#[cfg(feature = "alloc")]
pub mod band;
#[cfg(feature = "alloc")]
pub use band::*;

#[cfg(feature = "alloc")]
pub mod encode;
#[cfg(feature = "alloc")]
pub use encode::*;

#[cfg(feature = "alloc")]
pub mod ancillary;
#[cfg(feature = "alloc")]
pub use ancillary::*;
