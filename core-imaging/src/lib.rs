//! # Image Codec
//!
//! Bounded transcoding of catalog images into self-describing `data:` URLs,
//! plus a concurrent bulk recompression pass.
//!
//! ```ignore
//! use core_imaging::{CodecOptions, ImageCodec};
//!
//! let codec = ImageCodec::new(CodecOptions::default());
//! let encoded = codec.encode(bytes).await?;
//! item.image_url = Some(encoded.data_url);
//! ```

pub mod batch;
pub mod codec;
pub mod data_url;
pub mod error;

pub use batch::{compress_batch, compress_batch_with_events, CompressedBatch};
pub use codec::{CodecOptions, EncodedImage, ImageCodec, OutputFormat};
pub use data_url::{decode_data_url, encode_data_url, is_data_url, DataUrl};
pub use error::{ImagingError, Result};
