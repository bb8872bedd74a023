//! Image variant generation.
//!
//! Turns one source image into a set of resized encodings, one per target
//! width, written under a content-addressed layout:
//!
//! ```text
//! <output_root>/<source base name>/<width>/<sha256>.<ext>
//! ```
//!
//! # Pipeline
//!
//! ```text
//! SourceLocator ──load──► bytes ──decode──► DynamicImage (EXIF-oriented)
//!                                              │
//!                        ┌─────────────────────┼─────────────────────┐
//!                        ▼ (rayon, per width)  ▼                     ▼
//!                   resize + encode      resize + encode       resize + encode
//!                        └─────────────────────┼─────────────────────┘
//!                                              ▼
//!                                all succeeded? write files
//! ```
//!
//! Decode and encode run on Tokio's blocking pool. Nothing is written until
//! every width has encoded successfully.

mod codec;
mod error;
mod generator;
mod http;
mod options;
mod resize;
mod source;

pub use codec::content_hash;
pub use error::{VariantError, VariantErrorKind};
pub use generator::{VariantGenerator, VariantInfo};
pub use http::{AsyncHttpClient, HttpError, ReqwestClient, DEFAULT_HTTP_TIMEOUT};
pub use options::{
    extension_for, FitStrategy, GenerateOptions, OutputFormat, DEFAULT_JPEG_QUALITY,
};
pub use resize::target_dimensions;
pub use source::SourceLocator;
