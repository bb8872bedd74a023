//! Integration tests for the task lifecycle.
//!
//! These tests drive the public API end to end:
//! - submit → queue → processor → generator → store
//! - local and remote sources, including failures
//! - recovery of pending tasks after a restart
//!
//! Run with: `cargo test --test task_lifecycle_integration`

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use varianter::app::{App, AppConfig};
use varianter::processor::{TaskOutcome, TaskProcessor};
use varianter::service::TaskView;
use varianter::store::{ImageStore, JsonFileStore, Store, TaskStore};
use varianter::task::{Price, TaskStatus};
use varianter::variant::{GenerateOptions, ReqwestClient, VariantGenerator};

// ============================================================================
// Helper Functions
// ============================================================================

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

fn test_config(root: &Path) -> AppConfig {
    AppConfig::rooted_at(root).with_drain_timeout(IDLE_TIMEOUT)
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Minimal HTTP/1.1 responder serving `body` as `image/png` on every request.
///
/// With a gate, each response waits for one `notify_one` call.
async fn serve_image(body: Vec<u8>, gate: Option<Arc<Notify>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}/images/small.png", addr)
}

async fn finished_view(app: &App, id: &str) -> TaskView {
    app.wait_idle(IDLE_TIMEOUT).await.unwrap();
    app.service().query_task(id).await.unwrap()
}

fn variant_path<'a>(view: &'a TaskView, width: &str) -> &'a str {
    view.variants
        .as_ref()
        .unwrap()
        .iter()
        .find(|v| v.resolution == width)
        .map(|v| v.path.as_str())
        .unwrap()
}

// ============================================================================
// Submission and Processing
// ============================================================================

#[tokio::test]
async fn test_local_image_produces_both_variants() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("landscape.jpg");
    write_jpeg(&source, 1000, 1000);

    let app = App::start(test_config(temp_dir.path())).await.unwrap();
    let submitted = app
        .service()
        .submit_task(source.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(submitted.status, TaskStatus::Pending);

    let view = finished_view(&app, &submitted.id.to_string()).await;
    assert_eq!(view.status, TaskStatus::Completed);
    assert_eq!(view.price, submitted.price);
    assert!(view.error.is_none());
    assert_eq!(view.variants.as_ref().unwrap().len(), 2);

    for width in ["1024", "800"] {
        let path = variant_path(&view, width);
        assert!(path.contains(&format!("/{}/", width)), "path {}", path);
        assert!(Path::new(path).is_file());
    }

    // 1000px is below 1024, so that variant keeps the source size
    let large = image::open(variant_path(&view, "1024")).unwrap();
    assert_eq!((large.width(), large.height()), (1000, 1000));
    let small = image::open(variant_path(&view, "800")).unwrap();
    assert_eq!((small.width(), small.height()), (800, 800));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_local_source_fails_task() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("does-not-exist.jpg");

    let app = App::start(test_config(temp_dir.path())).await.unwrap();
    let submitted = app
        .service()
        .submit_task(missing.to_str().unwrap())
        .await
        .unwrap();

    let view = finished_view(&app, &submitted.id.to_string()).await;
    assert_eq!(view.status, TaskStatus::Failed);
    assert!(!view.error.as_deref().unwrap_or_default().is_empty());
    assert!(view.variants.is_none());

    let images = app.store().images_for_task(submitted.id).await.unwrap();
    assert!(images.is_empty());

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remote_small_image_is_not_upscaled() {
    let temp_dir = tempdir().unwrap();
    let url = serve_image(png_bytes(50, 50), None).await;

    let app = App::start(test_config(temp_dir.path())).await.unwrap();
    let submitted = app.service().submit_task(&url).await.unwrap();

    let view = finished_view(&app, &submitted.id.to_string()).await;
    assert_eq!(view.status, TaskStatus::Completed);
    for width in ["1024", "800"] {
        let img = image::open(variant_path(&view, width)).unwrap();
        assert_eq!((img.width(), img.height()), (50, 50));
    }

    // Output lands under the sanitized URL file stem
    assert!(variant_path(&view, "800").contains("/small/800/"));

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_task_is_pending_until_processing_finishes() {
    let temp_dir = tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let url = serve_image(png_bytes(64, 48), Some(Arc::clone(&gate))).await;

    let app = App::start(test_config(temp_dir.path())).await.unwrap();
    let submitted = app.service().submit_task(&url).await.unwrap();
    let id = submitted.id.to_string();

    let view = app.service().query_task(&id).await.unwrap();
    assert_eq!(view.status, TaskStatus::Pending);
    assert!(view.variants.is_none());
    assert!(view.error.is_none());

    gate.notify_one();
    let view = finished_view(&app, &id).await;
    assert_eq!(view.status, TaskStatus::Completed);

    app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_source_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let app = App::start(test_config(temp_dir.path())).await.unwrap();

    assert!(app.service().submit_task("   ").await.is_err());
    let snapshot = app.shutdown().await.unwrap();
    assert_eq!(snapshot.submitted, 0);
}

// ============================================================================
// Duplicate Processing and Recovery
// ============================================================================

#[tokio::test]
async fn test_duplicate_processing_stays_coherent() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("dup.jpg");
    write_jpeg(&source, 1200, 900);
    let source = source.to_str().unwrap().to_string();

    let store: Arc<dyn Store> =
        Arc::new(JsonFileStore::open(temp_dir.path().join("store")).await.unwrap());
    let task = store
        .create_task(Price::new(12.5).unwrap(), source.clone())
        .await
        .unwrap();

    let generator = Arc::new(VariantGenerator::new(
        temp_dir.path().join("variants"),
        Arc::new(ReqwestClient::new().unwrap()),
    ));
    let processor = TaskProcessor::new(Arc::clone(&store), generator, GenerateOptions::default());

    let (first, second) = tokio::join!(
        processor.process_task(task.id, &source),
        processor.process_task(task.id, &source)
    );
    let outcomes = [first.unwrap(), second.unwrap()];
    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, TaskOutcome::Completed { .. }))
        .count();
    assert!(completed >= 1);
    assert!(outcomes.iter().all(|o| o.status() == TaskStatus::Completed));

    let stored = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    let images = store.images_for_task(task.id).await.unwrap();
    assert_eq!(images.len(), 2);

    // A third run sees the terminal state and leaves everything alone
    let third = processor.process_task(task.id, &source).await.unwrap();
    assert!(matches!(third, TaskOutcome::AlreadyTerminal(TaskStatus::Completed)));
    assert_eq!(store.images_for_task(task.id).await.unwrap(), images);
}

#[tokio::test]
async fn test_pending_tasks_resume_after_restart() {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let source = temp_dir.path().join("resume.jpg");
    write_jpeg(&source, 900, 600);

    // A previous run that accepted the task but never processed it
    let task_id = {
        let store = JsonFileStore::open(config.storage.directory.clone())
            .await
            .unwrap();
        store
            .create_task(Price::new(20.0).unwrap(), source.to_str().unwrap().to_string())
            .await
            .unwrap()
            .id
    };

    let app = App::start(config.clone()).await.unwrap();
    let report = app.recovery_report();
    assert_eq!(report.found, 1);
    assert_eq!(report.accepted, 1);

    let view = finished_view(&app, &task_id.to_string()).await;
    assert_eq!(view.status, TaskStatus::Completed);
    app.shutdown().await.unwrap();

    // Nothing left to resume on the next start
    let app = App::start(config).await.unwrap();
    assert_eq!(app.recovery_report().found, 0);
    app.shutdown().await.unwrap();
}
