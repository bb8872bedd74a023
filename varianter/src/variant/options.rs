//! Options controlling how variants are sized and encoded.

use std::fmt;
use std::str::FromStr;

use image::ImageFormat;

/// Default JPEG quality for encoded variants.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// How a target width bounds the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FitStrategy {
    /// Width bounded by the target, height free (box `width × ∞`).
    #[default]
    Inside,
    /// Both sides bounded by the target (box `width × width`).
    InsideSquare,
}

impl FitStrategy {
    /// Returns the config-file spelling of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::InsideSquare => "inside-square",
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inside" => Ok(Self::Inside),
            "inside-square" | "inside_square" | "square" => Ok(Self::InsideSquare),
            other => Err(format!(
                "unknown fit strategy '{}' (expected 'inside' or 'inside-square')",
                other
            )),
        }
    }
}

/// Encoding used for variant files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Same format as the source, or PNG if that format cannot be written.
    #[default]
    Original,
    Jpeg,
    Png,
    Webp,
    Gif,
    Tiff,
    Bmp,
    Avif,
}

impl OutputFormat {
    /// Returns the config-file spelling of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Avif => "avif",
        }
    }

    /// Resolves the concrete codec for a source decoded as `source`.
    pub fn resolve(&self, source: Option<ImageFormat>) -> ImageFormat {
        match self {
            Self::Original => match source {
                Some(
                    format @ (ImageFormat::Jpeg
                    | ImageFormat::Png
                    | ImageFormat::WebP
                    | ImageFormat::Gif
                    | ImageFormat::Tiff
                    | ImageFormat::Bmp),
                ) => format,
                _ => ImageFormat::Png,
            },
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Tiff => ImageFormat::Tiff,
            Self::Bmp => ImageFormat::Bmp,
            Self::Avif => ImageFormat::Avif,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "gif" => Ok(Self::Gif),
            "tiff" | "tif" => Ok(Self::Tiff),
            "bmp" => Ok(Self::Bmp),
            "avif" => Ok(Self::Avif),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// File extension written for an encoded format.
pub fn extension_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        other => other.extensions_str().first().copied().unwrap_or("img"),
    }
}

/// Options for a single `generate` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    pub fit: FitStrategy,
    /// Enlarge sources narrower than the target. Off by default.
    pub allow_upscale: bool,
    pub output_format: OutputFormat,
    /// 1..=100, used for JPEG and AVIF output.
    pub jpeg_quality: u8,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            fit: FitStrategy::default(),
            allow_upscale: false,
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl GenerateOptions {
    pub fn with_fit(mut self, fit: FitStrategy) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_upscale(mut self, allow: bool) -> Self {
        self.allow_upscale = allow;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets the JPEG quality, clamped to 1..=100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}
