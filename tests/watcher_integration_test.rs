//! Real filesystem events through the watcher into a subscriber.

use std::fs;
use std::path::Path;
use std::time::Duration;

use livewatch::{Broadcaster, ChangeWatcher, Subscriber, WatchConfig};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Give the OS watch registration time to settle.
const SETTLE: Duration = Duration::from_millis(300);

struct Running {
    subscriber: Subscriber,
    ct: CancellationToken,
    task: JoinHandle<()>,
}

impl Running {
    async fn stop(self) {
        self.ct.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), self.task).await;
    }
}

async fn start(root: &Path, pattern: &str, recursive: bool) -> Running {
    let broadcaster = Broadcaster::new();
    let subscriber = broadcaster.subscribe();
    let config = WatchConfig {
        root: root.to_path_buf(),
        pattern: pattern.to_string(),
        recursive,
        debounce: Duration::from_millis(100),
    };
    let watcher = ChangeWatcher::new(&config, broadcaster).unwrap();

    let ct = CancellationToken::new();
    let task = tokio::spawn(watcher.run(ct.clone()));
    tokio::time::sleep(SETTLE).await;

    Running {
        subscriber,
        ct,
        task,
    }
}

/// Receive notifications until `wanted` shows up, returning everything seen.
async fn collect_until(subscriber: &mut Subscriber, wanted: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

    while let Ok(Some(path)) = tokio::time::timeout_at(deadline, subscriber.recv()).await {
        let done = path == wanted;
        seen.push(path);
        if done {
            break;
        }
    }
    seen
}

#[tokio::test]
async fn test_pattern_filters_by_file_name() {
    let temp = TempDir::new().unwrap();
    let mut running = start(temp.path(), r"\.txt$", true).await;

    fs::write(temp.path().join("a.log"), "log").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    fs::write(temp.path().join("a.txt"), "text").unwrap();

    let seen = collect_until(&mut running.subscriber, "a.txt").await;

    assert_eq!(seen.last().map(String::as_str), Some("a.txt"));
    assert!(seen.iter().all(|p| !p.ends_with(".log")), "{seen:?}");

    running.stop().await;
}

#[tokio::test]
async fn test_published_paths_are_root_relative() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("css")).unwrap();
    let mut running = start(temp.path(), r"\.css$", true).await;

    fs::write(temp.path().join("css/site.css"), "body {}").unwrap();

    let seen = collect_until(&mut running.subscriber, "css/site.css").await;

    assert_eq!(seen.last().map(String::as_str), Some("css/site.css"));
    let root = temp.path().to_string_lossy().to_string();
    for path in &seen {
        assert!(!path.starts_with('/'), "{path}");
        assert!(!path.contains(&root), "{path}");
    }

    running.stop().await;
}

#[tokio::test]
async fn test_new_subdirectory_is_watched_when_recursive() {
    let temp = TempDir::new().unwrap();
    let mut running = start(temp.path(), r"\.txt$", true).await;

    fs::create_dir_all(temp.path().join("sub/deeper")).unwrap();
    tokio::time::sleep(SETTLE).await;
    fs::write(temp.path().join("sub/deeper/b.txt"), "b").unwrap();

    let seen = collect_until(&mut running.subscriber, "sub/deeper/b.txt").await;

    assert_eq!(seen.last().map(String::as_str), Some("sub/deeper/b.txt"));
    // Directories themselves are never published
    assert!(seen.iter().all(|p| p.ends_with(".txt")), "{seen:?}");

    running.stop().await;
}

#[tokio::test]
async fn test_new_subdirectory_is_ignored_when_flat() {
    let temp = TempDir::new().unwrap();
    let mut running = start(temp.path(), r"\.txt$", false).await;

    fs::create_dir(temp.path().join("sub")).unwrap();
    tokio::time::sleep(SETTLE).await;
    fs::write(temp.path().join("sub/b.txt"), "b").unwrap();
    tokio::time::sleep(SETTLE).await;
    // Sentinel in the root: once it arrives, anything from sub/ would have too
    fs::write(temp.path().join("top.txt"), "top").unwrap();

    let seen = collect_until(&mut running.subscriber, "top.txt").await;

    assert_eq!(seen.last().map(String::as_str), Some("top.txt"));
    assert!(!seen.iter().any(|p| p.starts_with("sub")), "{seen:?}");

    running.stop().await;
}

#[tokio::test]
async fn test_removed_file_is_published() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("gone.txt"), "x").unwrap();
    let mut running = start(temp.path(), r"\.txt$", true).await;

    fs::remove_file(temp.path().join("gone.txt")).unwrap();

    let seen = collect_until(&mut running.subscriber, "gone.txt").await;
    assert_eq!(seen.last().map(String::as_str), Some("gone.txt"));

    running.stop().await;
}
