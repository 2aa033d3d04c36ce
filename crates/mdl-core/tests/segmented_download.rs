//! Manifest (segmented) downloads against a local server.

mod common;

use std::sync::{Arc, Mutex};

use common::range_server::{self, Route, TestServer};
use mdl_core::config::MdlConfig;
use mdl_core::{DownloadError, ProgressEvent, ProgressFn, Scheduler, TaskStatus, TransferKind};
use tempfile::tempdir;

fn segment_body(i: usize) -> Vec<u8> {
    format!("<segment {i}>").repeat(100 + i * 37).into_bytes()
}

/// Serves `count` segments under /hls/ and a manifest listing them in order.
/// Segment 3 is referenced by absolute URL, the rest relative to the manifest.
fn serve_segments(count: usize) -> (TestServer, Vec<u8>) {
    let server = range_server::start(Vec::new());
    let mut manifest = String::from("#EXTM3U\n#EXT-X-TARGETDURATION:4\n");
    let mut expected = Vec::new();
    for i in 0..count {
        let body = segment_body(i);
        expected.extend_from_slice(&body);
        let path = format!("/hls/seg{i}.ts");
        server.add_route(&path, Route::plain(body));
        manifest.push_str("#EXTINF:4.0,\n");
        if i == 3 {
            manifest.push_str(&server.url(&path));
        } else {
            manifest.push_str(&format!("  seg{i}.ts  "));
        }
        manifest.push('\n');
        manifest.push('\n');
    }
    manifest.push_str("#EXT-X-ENDLIST\n");
    server.add_route("/hls/index.m3u8", Route::text(&manifest));
    (server, expected)
}

fn quick_retry_config() -> MdlConfig {
    let mut cfg = MdlConfig::default();
    cfg.per_file_threads = 4;
    cfg.segment_retry.delay_ms = 10;
    cfg
}

fn recorder() -> (ProgressFn, Arc<Mutex<Vec<ProgressEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let cb: ProgressFn = Arc::new(move |e: &ProgressEvent| s.lock().unwrap().push(e.clone()));
    (cb, seen)
}

fn leftover_work_dirs(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
        .count()
}

#[test]
fn merged_output_follows_manifest_order() {
    let (server, expected) = serve_segments(12);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("show.ts");

    let scheduler = Scheduler::new(&quick_retry_config());
    let (cb, seen) = recorder();
    let task = scheduler.add_task(server.url("/hls/index.m3u8"), &dest, Some(cb));
    assert!(task.kind().is_segmented());
    scheduler.start();
    task.wait();

    assert_eq!(task.status(), TaskStatus::Completed, "error: {:?}", task.error());
    assert_eq!(task.kind(), TransferKind::Segmented { segment_count: Some(12) });
    assert_eq!(task.downloaded_segments(), 12);
    assert_eq!(task.missing_segments(), Some(0));
    assert_eq!(task.downloaded_bytes(), expected.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), expected);
    assert_eq!(leftover_work_dirs(dir.path()), 0);

    let events = seen.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| e.percent == 90.0 && e.label == "merging"));
    let last = events.last().unwrap();
    assert_eq!(last.percent, 100.0);
    assert_eq!(last.label, "Completed");
    assert_eq!(last.current_or_unknown(), -1);
    assert_eq!(last.total_bytes, Some(expected.len() as u64));
    assert!(events.iter().all(|e| e.percent <= 100.0));
}

#[test]
fn flaky_segment_is_retried() {
    let (server, expected) = serve_segments(5);
    server.add_route("/hls/seg2.ts", Route::plain(segment_body(2)).failing_first(2));
    let dir = tempdir().unwrap();
    let dest = dir.path().join("flaky.ts");

    let scheduler = Scheduler::new(&quick_retry_config());
    let task = scheduler.add_task(server.url("/hls/index.m3u8"), &dest, None);
    scheduler.start();
    task.wait();

    assert_eq!(task.status(), TaskStatus::Completed, "error: {:?}", task.error());
    assert_eq!(server.hits("/hls/seg2.ts"), 3);
    assert_eq!(std::fs::read(&dest).unwrap(), expected);
}

#[test]
fn permanently_missing_segment_is_tolerated() {
    let (server, _) = serve_segments(5);
    server.add_route("/hls/seg1.ts", Route::status(500));
    let dir = tempdir().unwrap();
    let dest = dir.path().join("gap.ts");

    let scheduler = Scheduler::new(&quick_retry_config());
    let task = scheduler.add_task(server.url("/hls/index.m3u8"), &dest, None);
    scheduler.start();
    task.wait();

    assert_eq!(task.status(), TaskStatus::Completed);
    assert_eq!(server.hits("/hls/seg1.ts"), 3, "default policy makes three attempts");
    assert_eq!(task.downloaded_segments(), 4);
    assert_eq!(task.missing_segments(), Some(1));

    let expected: Vec<u8> = [0, 2, 3, 4].iter().flat_map(|&i| segment_body(i)).collect();
    assert_eq!(std::fs::read(&dest).unwrap(), expected);
    assert_eq!(leftover_work_dirs(dir.path()), 0);
}

#[test]
fn empty_manifest_fails_and_cleans_up() {
    let server = range_server::start(vec![(
        "/live/index.m3u8",
        Route::text("#EXTM3U\n#EXT-X-ENDLIST\n"),
    )]);
    let dir = tempdir().unwrap();

    let scheduler = Scheduler::new(&MdlConfig::default());
    let (cb, seen) = recorder();
    let task = scheduler.add_task(server.url("/live/index.m3u8"), dir.path().join("live.ts"), Some(cb));
    scheduler.start();
    task.wait();

    assert_eq!(task.status(), TaskStatus::Error);
    let err = task.error().unwrap();
    assert!(err
        .chain()
        .any(|e| matches!(e.downcast_ref::<DownloadError>(), Some(DownloadError::EmptyManifest))));
    assert!(seen.lock().unwrap().last().unwrap().label.starts_with("error: "));
    assert_eq!(leftover_work_dirs(dir.path()), 0);
}
