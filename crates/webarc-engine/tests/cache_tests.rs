//! Index cache integration tests
//!
//! These tests verify:
//! - Concurrent requests for the same job-ID set trigger exactly one build
//! - Artifacts are sorted, reused and named after the canonical ID set
//! - Waiters give up on stale markers and report missing artifacts
//! - A failed sort leaves only the cache directory's prior contents behind
//! - Index lines can come from embedded CDX metadata bundles

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use webarc_common::ArchiveFormat;
use webarc_engine::cache::{marker_path, IndexCache, IndexSource};
use webarc_engine::error::CacheBuildError;
use webarc_engine::metadata::write_cdx_metadata_bundle;
use webarc_engine::{BatchJob, BatchRepository, BatchStatus, FileSelection, LocalArchive};

/// Local archive that counts batch runs and makes each one slow
struct CountingRepository {
    inner: LocalArchive,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingRepository {
    fn new(storage: &Path, delay: Duration) -> Self {
        Self {
            inner: LocalArchive::new(vec![storage.to_path_buf()]),
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BatchRepository for CountingRepository {
    fn batch(
        &self,
        job: &mut dyn BatchJob,
        selection: &FileSelection,
        output: &mut dyn Write,
    ) -> webarc_engine::Result<BatchStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.batch(job, selection, output)
    }
}

fn harvest_storage(temp: &TempDir) -> std::path::PathBuf {
    let storage = temp.path().join("storage");
    std::fs::create_dir_all(&storage).unwrap();
    write_container(
        &storage,
        "7-1-20240102.warc",
        &[
            warcinfo(),
            warc_response("http://example.org/z", "z"),
            warc_response("http://example.org/b", "b"),
        ],
    );
    write_gzip_container(
        &storage,
        "3-1-20240102.warc.gz",
        &[warcinfo(), warc_response("http://example.org/m", "m")],
    );
    write_container(
        &storage,
        "5-1-20240102.warc",
        &[warc_response("http://example.org/other", "not requested")],
    );
    storage
}

fn cache(repository: Arc<CountingRepository>, dir: &Path) -> IndexCache {
    IndexCache::new(repository, dir)
        .with_poll_interval(Duration::from_millis(10))
        .with_wait_timeout(Duration::from_secs(30))
}

#[test]
fn test_concurrent_requests_build_once() {
    let temp = TempDir::new().unwrap();
    let storage = harvest_storage(&temp);
    let repository = Arc::new(CountingRepository::new(&storage, Duration::from_millis(300)));
    let index = cache(repository.clone(), &temp.path().join("cache"));

    let (first, second) = std::thread::scope(|s| {
        let a = s.spawn(|| index.get_or_build(&[7, 3, 7, 3]));
        let b = s.spawn(|| index.get_or_build(&[3, 7]));
        (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
    });

    assert_eq!(first, second);
    assert_eq!(repository.calls(), 1);
    assert_eq!(first.file_name().unwrap(), "job-3-7-index.cdx");
    assert!(!marker_path(&first).exists());

    let content = std::fs::read_to_string(&first).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    let mut sorted = lines.clone();
    sorted.sort();
    assert_eq!(lines, sorted);
    assert!(lines[0].starts_with("http://example.org/b "));
    assert!(lines.iter().all(|l| !l.contains("5-1-20240102.warc")));
}

#[test]
fn test_existing_artifact_is_reused() {
    let temp = TempDir::new().unwrap();
    let storage = harvest_storage(&temp);
    let repository = Arc::new(CountingRepository::new(&storage, Duration::ZERO));
    let index = cache(repository.clone(), &temp.path().join("cache"));

    let path = index.get_or_build(&[3]).unwrap();
    let before = std::fs::read(&path).unwrap();

    let again = index.get_or_build(&[3, 3]).unwrap();

    assert_eq!(path, again);
    assert_eq!(std::fs::read(&again).unwrap(), before);
    assert_eq!(repository.calls(), 1);
}

#[test]
fn test_missing_jobs_still_produce_an_artifact() {
    let temp = TempDir::new().unwrap();
    let storage = harvest_storage(&temp);
    let repository = Arc::new(CountingRepository::new(&storage, Duration::ZERO));
    let index = cache(repository, &temp.path().join("cache"));

    let path = index.get_or_build(&[3, 99]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);

    let empty = index.get_or_build(&[98]).unwrap();
    assert!(std::fs::read_to_string(&empty).unwrap().is_empty());
}

#[test]
fn test_empty_id_set_is_rejected() {
    let temp = TempDir::new().unwrap();
    let repository = Arc::new(CountingRepository::new(temp.path(), Duration::ZERO));
    let index = cache(repository.clone(), temp.path());

    assert!(matches!(index.get_or_build(&[]), Err(CacheBuildError::NoJobIds)));
    assert!(matches!(
        index.retrieve_unsorted(&[], &mut Vec::new()),
        Err(CacheBuildError::NoJobIds)
    ));
    assert_eq!(repository.calls(), 0);
}

#[test]
fn test_stale_marker_times_out() {
    let temp = TempDir::new().unwrap();
    let repository = Arc::new(CountingRepository::new(temp.path(), Duration::ZERO));
    let index = IndexCache::new(repository.clone(), temp.path())
        .with_poll_interval(Duration::from_millis(10))
        .with_wait_timeout(Duration::from_millis(100));

    let artifact = index.artifact_path(&[4]).unwrap();
    std::fs::write(marker_path(&artifact), b"").unwrap();

    let err = index.get_or_build(&[4]).unwrap_err();
    assert!(matches!(err, CacheBuildError::WaitTimeout { .. }));
    assert_eq!(repository.calls(), 0);
}

#[test]
fn test_marker_gone_without_artifact() {
    let temp = TempDir::new().unwrap();
    let repository = Arc::new(CountingRepository::new(temp.path(), Duration::ZERO));
    let index = cache(repository.clone(), temp.path());

    let artifact = index.artifact_path(&[6]).unwrap();
    let marker = marker_path(&artifact);
    std::fs::write(&marker, b"partial").unwrap();

    let remover = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        std::fs::remove_file(marker).unwrap();
    });
    let result = index.get_or_build(&[6]);
    remover.join().unwrap();

    assert!(matches!(result, Err(CacheBuildError::ArtifactMissing { .. })));
    assert_eq!(repository.calls(), 0);
}

#[test]
fn test_failed_sort_cleans_up_staging() {
    let temp = TempDir::new().unwrap();
    let storage = harvest_storage(&temp);
    let cache_dir = temp.path().join("cache");
    std::fs::create_dir_all(&cache_dir).unwrap();
    // Occupies the path of the second sort run.
    std::fs::create_dir(cache_dir.join("job-3-7-index.cdx.sorting.run-1")).unwrap();

    let repository = Arc::new(CountingRepository::new(&storage, Duration::ZERO));
    let index = cache(repository, &cache_dir).with_sort_run_bytes(1);

    let err = index.get_or_build(&[7, 3]).unwrap_err();
    assert!(matches!(err, CacheBuildError::Io(_)));

    let left: Vec<_> = std::fs::read_dir(&cache_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(left, vec!["job-3-7-index.cdx.sorting.run-1"]);
}

#[test]
fn test_embedded_cdx_source() {
    let temp = TempDir::new().unwrap();
    let storage = temp.path().join("storage");
    std::fs::create_dir_all(&storage).unwrap();

    let lines = vec![
        "http://example.org/z 192.0.2.1 20240102030405 text/html 120 3-1-20240102.warc.gz 0",
        "http://example.org/a 192.0.2.1 20240102030405 text/html 130 3-1-20240102.warc.gz 512",
        "http://example.org/q - 20240102030405 image/png 400 3-2-20240102.warc.gz 77",
    ];
    write_cdx_metadata_bundle(&storage, "example", 3, 1, ArchiveFormat::Warc, true, &lines).unwrap();
    // Harvest containers of the same job are not read by this source.
    write_container(
        &storage,
        "3-1-20240102.warc",
        &[warc_response("http://example.org/ignored", "x")],
    );

    let repository = Arc::new(CountingRepository::new(&storage, Duration::ZERO));
    let index = cache(repository, &temp.path().join("cache")).with_source(IndexSource::EmbeddedCdx);

    let path = index.get_or_build(&[3]).unwrap();
    let content = std::fs::read_to_string(path).unwrap();

    let mut expected: Vec<&str> = lines.clone();
    expected.sort();
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn test_retrieve_unsorted_streams_raw_lines() {
    let temp = TempDir::new().unwrap();
    let storage = harvest_storage(&temp);
    let repository = Arc::new(CountingRepository::new(&storage, Duration::ZERO));
    let index = cache(repository, &temp.path().join("cache"));

    let mut output = Vec::new();
    let status = index.retrieve_unsorted(&[7, 3], &mut output).unwrap();

    let urls: Vec<String> = output_lines(&output)
        .iter()
        .map(|l| l.split(' ').next().unwrap().to_string())
        .collect();
    // Files in name order, records in container order
    assert_eq!(
        urls,
        vec!["http://example.org/m", "http://example.org/z", "http://example.org/b"]
    );
    assert_eq!(status.files_processed, 2);
    assert!(!index.artifact_path(&[3, 7]).unwrap().exists());
}
