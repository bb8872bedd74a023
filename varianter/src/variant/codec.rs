//! Image decoding, resizing, and encoding.
//!
//! Everything here is synchronous and CPU-bound; callers run it on the
//! blocking pool.

use std::fmt;
use std::io::Cursor;

use image::codecs::avif::AvifEncoder;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPDecoder;
use image::imageops::{self, FilterType};
use image::metadata::Orientation;
use image::{
    AnimationDecoder, DynamicImage, Frame, ImageDecoder, ImageError, ImageFormat, ImageReader,
};
use sha2::{Digest, Sha256};

use super::error::VariantError;

/// NeuQuant speed for animated GIF output (1 = best, 30 = fastest).
const GIF_ENCODE_SPEED: i32 = 10;

/// rav1e speed for AVIF output (1 = best, 10 = fastest).
const AVIF_ENCODE_SPEED: u8 = 8;

/// A decoded source with EXIF orientation already applied.
pub struct DecodedSource {
    /// The still image; the first frame of an animation.
    pub image: DynamicImage,
    /// Detected container format, if recognized.
    pub format: Option<ImageFormat>,
    /// Full-canvas frames of an animated GIF or WebP with more than one
    /// frame.
    pub frames: Option<Vec<Frame>>,
}

impl DecodedSource {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn is_animated(&self) -> bool {
        self.frames.is_some()
    }
}

impl fmt::Debug for DecodedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedSource")
            .field("dimensions", &self.dimensions())
            .field("format", &self.format)
            .field("frames", &self.frames.as_ref().map(Vec::len))
            .finish()
    }
}

fn decode_failure(e: ImageError) -> VariantError {
    VariantError::EncodingFailure(format!("cannot decode source image: {}", e))
}

/// Decodes `bytes`, guessing the format from content.
pub fn decode(bytes: &[u8]) -> Result<DecodedSource, VariantError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VariantError::EncodingFailure(format!("cannot read source image: {}", e)))?;
    let format = reader.format();

    let mut decoder = reader.into_decoder().map_err(decode_failure)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_failure)?;
    image.apply_orientation(orientation);

    let frames = match format {
        Some(format @ (ImageFormat::Gif | ImageFormat::WebP)) => decode_frames(bytes, format)?,
        _ => None,
    };

    Ok(DecodedSource {
        image,
        format,
        frames,
    })
}

/// Collects every frame of an animated source; `None` for a single frame.
fn decode_frames(bytes: &[u8], format: ImageFormat) -> Result<Option<Vec<Frame>>, VariantError> {
    let frames = match format {
        ImageFormat::Gif => GifDecoder::new(Cursor::new(bytes))
            .map_err(decode_failure)?
            .into_frames()
            .collect_frames(),
        ImageFormat::WebP => {
            let decoder = WebPDecoder::new(Cursor::new(bytes)).map_err(decode_failure)?;
            if !decoder.has_animation() {
                return Ok(None);
            }
            decoder.into_frames().collect_frames()
        }
        _ => return Ok(None),
    }
    .map_err(decode_failure)?;

    Ok((frames.len() > 1).then_some(frames))
}

/// Resizes `image` to exactly `dimensions`, or clones it if they match.
pub fn resize(image: &DynamicImage, dimensions: (u32, u32)) -> DynamicImage {
    if (image.width(), image.height()) == dimensions {
        return image.clone();
    }
    image.resize_exact(dimensions.0, dimensions.1, FilterType::Lanczos3)
}

/// Resizes every frame to `dimensions`, keeping each frame's delay.
pub fn resize_frames(frames: &[Frame], dimensions: (u32, u32)) -> Vec<Frame> {
    frames
        .iter()
        .map(|frame| {
            let buffer = if frame.buffer().dimensions() == dimensions {
                frame.buffer().clone()
            } else {
                imageops::resize(frame.buffer(), dimensions.0, dimensions.1, FilterType::Lanczos3)
            };
            Frame::from_parts(buffer, 0, 0, frame.delay())
        })
        .collect()
}

/// Encodes `frames` as an endlessly looping animated GIF.
pub fn encode_animation(frames: Vec<Frame>) -> Result<Vec<u8>, VariantError> {
    let encode_failure =
        |e: ImageError| VariantError::EncodingFailure(format!("cannot encode animated GIF: {}", e));

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, GIF_ENCODE_SPEED);
        encoder.set_repeat(Repeat::Infinite).map_err(encode_failure)?;
        encoder.encode_frames(frames).map_err(encode_failure)?;
    }
    Ok(buffer)
}

/// Encodes `image` as `format`.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, VariantError> {
    let mut buffer = Vec::new();

    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                &mut buffer,
                CompressionType::Best,
                PngFilterType::Adaptive,
            );
            image.write_with_encoder(encoder)
        }
        ImageFormat::Avif => {
            let encoder =
                AvifEncoder::new_with_speed_quality(&mut buffer, AVIF_ENCODE_SPEED, jpeg_quality);
            DynamicImage::ImageRgba8(image.to_rgba8()).write_with_encoder(encoder)
        }
        ImageFormat::Gif | ImageFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut Cursor::new(&mut buffer), format),
        _ => {
            let normalized = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            normalized.write_to(&mut Cursor::new(&mut buffer), format)
        }
    };

    result.map_err(|e| {
        VariantError::EncodingFailure(format!("cannot encode {:?} output: {}", format, e))
    })?;
    Ok(buffer)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
