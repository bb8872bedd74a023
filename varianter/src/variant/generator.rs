//! Variant generation: source in, resized files out.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::ImageFormat;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::codec::{self, DecodedSource};
use super::error::VariantError;
use super::http::AsyncHttpClient;
use super::options::{extension_for, GenerateOptions};
use super::resize::target_dimensions;
use super::source::SourceLocator;
use crate::task::VariantReference;

/// One produced variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantInfo {
    /// Requested target width.
    pub width: u32,
    pub path: PathBuf,
    /// SHA-256 of the written bytes, lowercase hex.
    pub content_hash: String,
    /// Pixel width actually written (smaller than `width` for small
    /// sources without upscaling).
    pub actual_width: u32,
    pub actual_height: u32,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl VariantInfo {
    /// Converts to the reference stored on a completed task.
    pub fn to_reference(&self) -> VariantReference {
        VariantReference {
            width: self.width,
            path: self.path.clone(),
            content_hash: self.content_hash.clone(),
            created_at: self.created_at,
        }
    }
}

/// Encoded output held in memory until every width has succeeded.
struct EncodedVariant {
    width: u32,
    dimensions: (u32, u32),
    extension: &'static str,
    content_hash: String,
    bytes: Vec<u8>,
}

/// Produces resized variants of a source image under an output root.
///
/// Files land at `<root>/<base>/<width>/<sha256>.<ext>`, so re-running the
/// same source rewrites identical paths.
pub struct VariantGenerator {
    output_root: PathBuf,
    http: Arc<dyn AsyncHttpClient>,
}

impl VariantGenerator {
    pub fn new(output_root: impl Into<PathBuf>, http: Arc<dyn AsyncHttpClient>) -> Self {
        Self {
            output_root: output_root.into(),
            http,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Generates one variant per entry of `widths`, in the same order.
    ///
    /// Either every variant is produced or an error is returned; no
    /// partial list is ever reported. Each width is resized from the
    /// decoded original.
    pub async fn generate(
        &self,
        source: &str,
        widths: &[u32],
        options: &GenerateOptions,
    ) -> Result<Vec<VariantInfo>, VariantError> {
        validate_widths(widths)?;

        let locator = SourceLocator::parse(source);
        let bytes = locator.load(self.http.as_ref()).await?;
        debug!(source = %locator, bytes = bytes.len(), "Source loaded");

        let render_widths = widths.to_vec();
        let render_options = options.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let decoded = codec::decode(&bytes)?;
            render_all(&decoded, &render_widths, &render_options)
        })
        .await
        .map_err(|e| VariantError::EncodingFailure(format!("render task failed: {}", e)))??;

        let base_dir = self.output_root.join(locator.base_name());
        let variants = persist_all(&base_dir, encoded).await?;

        info!(
            source = %locator,
            count = variants.len(),
            dir = %base_dir.display(),
            "Variants generated"
        );
        Ok(variants)
    }
}

fn validate_widths(widths: &[u32]) -> Result<(), VariantError> {
    if widths.is_empty() {
        return Err(VariantError::InvalidConfiguration(
            "no target widths requested".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(widths.len());
    for &width in widths {
        if width == 0 {
            return Err(VariantError::InvalidConfiguration(
                "target width must be positive".to_string(),
            ));
        }
        if !seen.insert(width) {
            return Err(VariantError::InvalidConfiguration(format!(
                "duplicate target width {}",
                width
            )));
        }
    }
    Ok(())
}

/// Resizes and encodes every width in parallel; fails on the first error.
fn render_all(
    decoded: &DecodedSource,
    widths: &[u32],
    options: &GenerateOptions,
) -> Result<Vec<EncodedVariant>, VariantError> {
    let format = options.output_format.resolve(decoded.format);
    let extension = extension_for(format);
    let source_dims = decoded.dimensions();

    widths
        .par_iter()
        .map(|&width| {
            let dimensions =
                target_dimensions(source_dims, width, options.fit, options.allow_upscale);
            let bytes = match (&decoded.frames, format) {
                (Some(frames), ImageFormat::Gif) => {
                    codec::encode_animation(codec::resize_frames(frames, dimensions))?
                }
                _ => {
                    let resized = codec::resize(&decoded.image, dimensions);
                    codec::encode(&resized, format, options.jpeg_quality)?
                }
            };
            Ok(EncodedVariant {
                width,
                dimensions,
                extension,
                content_hash: codec::content_hash(&bytes),
                bytes,
            })
        })
        .collect()
}

/// An encoded variant written to a temp file beside its final path.
struct StagedVariant {
    variant: EncodedVariant,
    tmp: PathBuf,
    path: PathBuf,
    /// Something was already at the final path before this call.
    existed: bool,
}

impl StagedVariant {
    fn into_info(self) -> VariantInfo {
        VariantInfo {
            width: self.variant.width,
            path: self.path,
            content_hash: self.variant.content_hash,
            actual_width: self.variant.dimensions.0,
            actual_height: self.variant.dimensions.1,
            size_bytes: self.variant.bytes.len() as u64,
            created_at: Utc::now(),
        }
    }
}

fn write_failure(path: &Path, e: std::io::Error) -> VariantError {
    VariantError::EncodingFailure(format!("cannot write {}: {}", path.display(), e))
}

/// Writes every variant or none.
///
/// All temp files are written first, then renamed into place. On failure
/// the temp files and any outputs this call created are removed.
async fn persist_all(
    base_dir: &Path,
    encoded: Vec<EncodedVariant>,
) -> Result<Vec<VariantInfo>, VariantError> {
    let mut staged = Vec::with_capacity(encoded.len());
    for variant in encoded {
        match stage_variant(base_dir, variant).await {
            Ok(s) => staged.push(s),
            Err(e) => {
                discard(staged.iter().map(|s| s.tmp.as_path()).collect()).await;
                return Err(e);
            }
        }
    }

    let mut created: Vec<&Path> = Vec::new();
    for (i, s) in staged.iter().enumerate() {
        if let Err(e) = tokio::fs::rename(&s.tmp, &s.path).await {
            discard(staged[i..].iter().map(|s| s.tmp.as_path()).collect()).await;
            discard(created).await;
            return Err(write_failure(&s.path, e));
        }
        if !s.existed {
            created.push(s.path.as_path());
        }
        debug!(
            width = s.variant.width,
            actual_width = s.variant.dimensions.0,
            actual_height = s.variant.dimensions.1,
            path = %s.path.display(),
            "Variant written"
        );
    }

    Ok(staged.into_iter().map(StagedVariant::into_info).collect())
}

async fn stage_variant(base_dir: &Path, variant: EncodedVariant) -> Result<StagedVariant, VariantError> {
    let dir = base_dir.join(variant.width.to_string());
    let path = dir.join(format!("{}.{}", variant.content_hash, variant.extension));

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| write_failure(&dir, e))?;
    // Unique temp name so concurrent runs of the same task never share one.
    let tmp = path.with_extension(format!(
        "{}.{}.tmp",
        variant.extension,
        Uuid::new_v4().simple()
    ));
    if let Err(e) = tokio::fs::write(&tmp, &variant.bytes).await {
        discard(vec![tmp.as_path()]).await;
        return Err(write_failure(&tmp, e));
    }
    let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);

    Ok(StagedVariant {
        variant,
        tmp,
        path,
        existed,
    })
}

/// Best-effort removal of partial output.
async fn discard(paths: Vec<&Path>) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove partial variant output")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::http::tests::MockHttpClient;
    use crate::variant::http::HttpError;
    use crate::variant::{FitStrategy, OutputFormat, VariantErrorKind};
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
        });
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    fn generator(root: &Path, response: Result<Bytes, HttpError>) -> VariantGenerator {
        VariantGenerator::new(root, Arc::new(MockHttpClient { response }))
    }

    fn write_source(dir: &Path, name: &str, bytes: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_generates_each_width_in_order() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_source(
            input.path(),
            "photo.jpg",
            &encoded_image(1000, 1000, ImageFormat::Jpeg),
        );

        let variants = generator(output.path(), Ok(Bytes::new()))
            .generate(&source, &[1024, 800], &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].width, 1024);
        assert_eq!((variants[0].actual_width, variants[0].actual_height), (1000, 1000));
        assert_eq!(variants[1].width, 800);
        assert_eq!((variants[1].actual_width, variants[1].actual_height), (800, 800));

        for variant in &variants {
            assert!(variant.path.exists());
            assert!(variant.path.starts_with(output.path().join("photo")));
            assert!(variant
                .path
                .to_string_lossy()
                .contains(&format!("/{}/", variant.width)));
            assert_eq!(variant.path.extension().unwrap(), "jpg");
            let written = std::fs::read(&variant.path).unwrap();
            assert_eq!(written.len() as u64, variant.size_bytes);
            assert_eq!(codec::content_hash(&written), variant.content_hash);
        }
    }

    #[tokio::test]
    async fn test_widths_resized_from_original() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_source(
            input.path(),
            "wide.png",
            &encoded_image(1600, 800, ImageFormat::Png),
        );

        let variants = generator(output.path(), Ok(Bytes::new()))
            .generate(&source, &[400, 1200], &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!((variants[0].actual_width, variants[0].actual_height), (400, 200));
        assert_eq!((variants[1].actual_width, variants[1].actual_height), (1200, 600));
    }

    #[tokio::test]
    async fn test_rerun_produces_same_paths() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_source(
            input.path(),
            "same.png",
            &encoded_image(300, 200, ImageFormat::Png),
        );
        let generator = generator(output.path(), Ok(Bytes::new()));

        let first = generator
            .generate(&source, &[100], &GenerateOptions::default())
            .await
            .unwrap();
        let second = generator
            .generate(&source, &[100], &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(first[0].path, second[0].path);
        assert_eq!(first[0].content_hash, second[0].content_hash);
    }

    #[tokio::test]
    async fn test_remote_source_uses_http_client() {
        let output = tempfile::tempdir().unwrap();
        let body = Bytes::from(encoded_image(50, 50, ImageFormat::Png));

        let variants = generator(output.path(), Ok(body))
            .generate(
                "https://example.com/assets/tiny.png",
                &[1024, 800],
                &GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(variants.len(), 2);
        for variant in &variants {
            assert_eq!((variant.actual_width, variant.actual_height), (50, 50));
            assert!(variant.path.starts_with(output.path().join("tiny")));
        }
    }

    #[tokio::test]
    async fn test_upscale_option() {
        let output = tempfile::tempdir().unwrap();
        let body = Bytes::from(encoded_image(50, 25, ImageFormat::Png));
        let options = GenerateOptions::default().with_upscale(true);

        let variants = generator(output.path(), Ok(body))
            .generate("https://example.com/small.png", &[200], &options)
            .await
            .unwrap();

        assert_eq!((variants[0].actual_width, variants[0].actual_height), (200, 100));
    }

    #[tokio::test]
    async fn test_inside_square_and_format_override() {
        let output = tempfile::tempdir().unwrap();
        let body = Bytes::from(encoded_image(100, 400, ImageFormat::Png));
        let options = GenerateOptions::default()
            .with_fit(FitStrategy::InsideSquare)
            .with_output_format(OutputFormat::Webp);

        let variants = generator(output.path(), Ok(body))
            .generate("https://example.com/tall.png", &[200], &options)
            .await
            .unwrap();

        assert_eq!((variants[0].actual_width, variants[0].actual_height), (50, 200));
        assert_eq!(variants[0].path.extension().unwrap(), "webp");
    }

    #[tokio::test]
    async fn test_invalid_widths_rejected() {
        let output = tempfile::tempdir().unwrap();
        let generator = generator(output.path(), Ok(Bytes::new()));
        let options = GenerateOptions::default();

        let cases: [&[u32]; 3] = [&[], &[0], &[800, 800]];
        for widths in cases {
            let err = generator
                .generate("/tmp/unused.jpg", widths, &options)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), VariantErrorKind::InvalidConfiguration);
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_unavailable() {
        let output = tempfile::tempdir().unwrap();
        let err = generator(output.path(), Ok(Bytes::new()))
            .generate(
                "/tmp/does-not-exist-varianter.jpg",
                &[1024, 800],
                &GenerateOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VariantErrorKind::SourceUnavailable);
        assert!(std::fs::read_dir(output.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_source_writes_nothing() {
        let output = tempfile::tempdir().unwrap();
        let err = generator(output.path(), Ok(Bytes::from_static(b"<html>not an image</html>")))
            .generate("https://example.com/a.jpg", &[800], &GenerateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VariantErrorKind::EncodingFailure);
        assert!(std::fs::read_dir(output.path()).unwrap().next().is_none());
    }

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return files;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
        files
    }

    #[tokio::test]
    async fn test_blocked_width_directory_leaves_no_output() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let source = write_source(
            input.path(),
            "pic.png",
            &encoded_image(1200, 600, ImageFormat::Png),
        );
        // A plain file where the 800 directory should go
        std::fs::create_dir_all(output.path().join("pic")).unwrap();
        std::fs::write(output.path().join("pic").join("800"), b"in the way").unwrap();

        let err = generator(output.path(), Ok(Bytes::new()))
            .generate(&source, &[1024, 800], &GenerateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VariantErrorKind::EncodingFailure);
        assert!(files_under(&output.path().join("pic").join("1024")).is_empty());
    }

    #[tokio::test]
    async fn test_failed_publish_removes_outputs_of_the_call() {
        let input = tempfile::tempdir().unwrap();
        let source = write_source(
            input.path(),
            "pic.png",
            &encoded_image(1200, 600, ImageFormat::Png),
        );
        let options = GenerateOptions::default();

        // Learn the deterministic 800 path from a clean run elsewhere
        let scratch = tempfile::tempdir().unwrap();
        let reference = generator(scratch.path(), Ok(Bytes::new()))
            .generate(&source, &[800], &options)
            .await
            .unwrap();
        let relative = reference[0].path.strip_prefix(scratch.path()).unwrap();

        // A non-empty directory at the final path makes the rename fail
        let output = tempfile::tempdir().unwrap();
        let blocker = output.path().join(relative);
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let err = generator(output.path(), Ok(Bytes::new()))
            .generate(&source, &[1024, 800], &options)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VariantErrorKind::EncodingFailure);
        assert!(files_under(&output.path().join("pic").join("1024")).is_empty());
        assert_eq!(files_under(&output.path().join("pic").join("800")), vec![blocker.join("keep")]);
    }

    #[tokio::test]
    async fn test_animated_gif_keeps_every_frame() {
        use image::codecs::gif::GifDecoder;
        use image::{AnimationDecoder, Delay, Frame, Rgba, RgbaImage};

        let frames = [Rgba([255, 0, 0, 255]), Rgba([0, 255, 0, 255])]
            .into_iter()
            .map(|color| {
                Frame::from_parts(
                    RgbaImage::from_pixel(60, 30, color),
                    0,
                    0,
                    Delay::from_numer_denom_ms(80, 1),
                )
            })
            .collect();
        let body = Bytes::from(codec::encode_animation(frames).unwrap());
        let output = tempfile::tempdir().unwrap();

        let variants = generator(output.path(), Ok(body))
            .generate("https://example.com/spin.gif", &[30], &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(variants[0].path.extension().unwrap(), "gif");
        assert_eq!((variants[0].actual_width, variants[0].actual_height), (30, 15));

        let written = std::fs::read(&variants[0].path).unwrap();
        let frames = GifDecoder::new(Cursor::new(written))
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.buffer().dimensions() == (30, 15)));
    }

    #[test]
    fn test_to_reference() {
        let info = VariantInfo {
            width: 800,
            path: PathBuf::from("/out/a/800/abc.jpg"),
            content_hash: "abc".to_string(),
            actual_width: 640,
            actual_height: 480,
            size_bytes: 10,
            created_at: Utc::now(),
        };
        let reference = info.to_reference();
        assert_eq!(reference.width, 800);
        assert_eq!(reference.path, info.path);
        assert_eq!(reference.content_hash, "abc");
    }
}
