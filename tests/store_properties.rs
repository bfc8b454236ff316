//! Store behaviour tests
//!
//! Exercise the public API against a real directory and redb index:
//! addressing, dedup, atomic publish, staged writes, deletion, and
//! secondary ids.

use blobdb::{BlobStore, ContentHash, Error, StoreConfig};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn blob_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name().unwrap() == "blob" {
                found.push(path);
            }
        }
    }
    found
}

/// Reader that yields some bytes and then fails
struct FailingReader {
    sent: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream gone"));
        }
        self.sent = true;
        buf[..4].copy_from_slice(b"part");
        Ok(4)
    }
}

// ============================================================================
// Content addressing
// ============================================================================

#[test]
fn test_content_addressing() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let samples: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"a".to_vec(),
        b"The cat sat on the mat".to_vec(),
        (0..200_000u32).map(|i| (i % 251) as u8).collect(),
    ];

    for bytes in samples {
        let hash = *store.put(bytes.as_slice()).unwrap().hash();
        assert_eq!(hash, ContentHash::digest(&bytes));

        let handle = store.get(&hash).unwrap();
        assert_eq!(handle.size(), bytes.len() as u64);

        let mut read_back = Vec::new();
        handle.open().unwrap().read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, bytes);
    }
}

#[test]
fn test_sharded_path_layout() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let handle = store.put(&b"abc"[..]).unwrap();
    let hex = handle.hash().to_hex();
    assert_eq!(
        hex,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let expected = dir
        .path()
        .join("ba")
        .join("78")
        .join("16")
        .join(&hex)
        .join("blob");
    assert_eq!(handle.path(), expected);
    assert_eq!(fs::read(&expected).unwrap(), b"abc");
}

#[test]
fn test_sharding_is_independent_of_history() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let a = BlobStore::open(dir_a.path()).unwrap();
    let b = BlobStore::open(dir_b.path()).unwrap();

    a.put(&b"noise"[..]).unwrap();
    let in_a = a.put(&b"target"[..]).unwrap();
    let in_b = b.put(&b"target"[..]).unwrap();

    let rel_a = in_a.path().strip_prefix(dir_a.path()).unwrap().to_path_buf();
    let rel_b = in_b.path().strip_prefix(dir_b.path()).unwrap().to_path_buf();
    assert_eq!(rel_a, rel_b);
}

#[test]
fn test_get_rejects_malformed_hash() {
    assert!(matches!(
        "ABC".parse::<ContentHash>(),
        Err(Error::InvalidHash(_))
    ));
}

// ============================================================================
// Dedup and concurrency
// ============================================================================

#[test]
fn test_idempotent_write() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let first = *store.put(&b"duplicate data"[..]).unwrap().hash();
    let second = *store.put(&b"duplicate data"[..]).unwrap().hash();

    assert_eq!(first, second);
    assert_eq!(blob_files(dir.path()).len(), 1);
    assert_eq!(fs::read(store.blob_path(&first)).unwrap(), b"duplicate data");
}

#[test]
fn test_concurrent_identical_puts_converge() {
    let dir = tempdir().unwrap();
    let store = Arc::new(BlobStore::open(dir.path()).unwrap());
    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 7) as u8).collect();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let payload = payload.clone();
            thread::spawn(move || *store.put(payload.as_slice()).unwrap().hash())
        })
        .collect();
    let hashes: Vec<ContentHash> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    assert!(hashes.iter().all(|h| *h == hashes[0]));
    assert_eq!(blob_files(dir.path()).len(), 1);
    assert_eq!(fs::read(store.blob_path(&hashes[0])).unwrap(), payload);
    assert_eq!(fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
}

#[test]
fn test_concurrent_distinct_puts_do_not_collide() {
    let dir = tempdir().unwrap();
    let store = Arc::new(BlobStore::open(dir.path()).unwrap());

    let threads: Vec<_> = (0..16u32)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let payload = format!("payload number {}", i).into_bytes();
                let hash = *store.put(payload.as_slice()).unwrap().hash();
                (hash, payload)
            })
        })
        .collect();

    for t in threads {
        let (hash, payload) = t.join().unwrap();
        assert_eq!(store.get(&hash).unwrap().read_to_vec().unwrap(), payload);
    }
    assert_eq!(blob_files(dir.path()).len(), 16);
}

/// Reader that hands out its payload in small pieces with a pause between
struct SlowReader {
    data: Vec<u8>,
    pos: usize,
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        thread::sleep(Duration::from_millis(2));
        let n = buf.len().min(1024).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn test_reader_during_put_never_sees_partial_blob() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();
    let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 253) as u8).collect();
    let hash = ContentHash::digest(&payload);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let watcher = s.spawn(|| {
            let mut saw_absent = false;
            loop {
                let finished = done.load(Ordering::Acquire);
                match store.get(&hash) {
                    Ok(handle) => {
                        assert_eq!(handle.size(), payload.len() as u64);
                        assert_eq!(handle.read_to_vec().unwrap(), payload);
                        assert!(store.contains(&hash));
                        return saw_absent;
                    }
                    Err(e) => {
                        assert!(e.is_not_found(), "unexpected error: {}", e);
                        assert!(!finished, "blob missing after put returned");
                        saw_absent = true;
                    }
                }
                thread::sleep(Duration::from_millis(1));
            }
        });

        let handle = store
            .put(SlowReader {
                data: payload.clone(),
                pos: 0,
            })
            .unwrap();
        assert_eq!(handle.hash(), &hash);
        done.store(true, Ordering::Release);

        assert!(watcher.join().unwrap(), "watcher should see the blob absent first");
    });
}

#[test]
fn test_failed_stream_publishes_nothing() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let err = store.put(FailingReader { sent: false }).unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    let partial = ContentHash::digest(b"part");
    assert!(!store.contains(&partial));
    assert!(store.get(&partial).unwrap_err().is_not_found());
    assert!(blob_files(dir.path()).is_empty());
    assert_eq!(fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
}

#[test]
fn test_unfinished_staged_write_is_invisible() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let mut staged = store.create_empty_file().unwrap();
    staged.write_all(b"not yet published").unwrap();

    let hash = ContentHash::digest(b"not yet published");
    assert!(!store.contains(&hash));
    assert!(store.get(&hash).unwrap_err().is_not_found());

    let handle = store.put_file(staged).unwrap();
    assert_eq!(handle.hash(), &hash);
    assert!(store.contains(&hash));
}

// ============================================================================
// Staged writes
// ============================================================================

#[test]
fn test_staged_write_equivalence() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 256) as u8).collect();

    let mut staged = store.create_empty_file().unwrap();
    for chunk in payload.chunks(4096) {
        staged.write_all(chunk).unwrap();
    }
    let staged_hash = *store.put_file(staged).unwrap().hash();

    let streamed = store.put(payload.as_slice()).unwrap();
    assert_eq!(&staged_hash, streamed.hash());
    assert_eq!(streamed.read_to_vec().unwrap(), payload);
    assert_eq!(blob_files(dir.path()).len(), 1);
}

#[test]
fn test_abandoned_staged_file_is_cleaned_up() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    {
        let mut staged = store.create_empty_file().unwrap();
        staged.write_all(b"abandoned").unwrap();
    }
    assert_eq!(fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);
}

#[test]
fn test_unsynced_config_still_stores() {
    let dir = tempdir().unwrap();
    let config = StoreConfig {
        sync_writes: false,
        ..StoreConfig::default()
    };
    let store = BlobStore::open_with_config(dir.path(), config).unwrap();
    assert!(!store.config().sync_writes);

    let handle = store.put(&b"fast path"[..]).unwrap();
    assert_eq!(handle.read_to_vec().unwrap(), b"fast path");
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn test_delete_then_get_is_not_found() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let hash = *store.put(&b"doomed"[..]).unwrap().hash();
    store.delete(&hash).unwrap();

    let err = store.get(&hash).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_missing_is_ok() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    store.delete(&ContentHash::digest(b"never stored")).unwrap();
}

// ============================================================================
// Secondary ids
// ============================================================================

#[test]
fn test_secondary_id_round_trip() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let handle = store.put(&b"indexed"[..]).unwrap();
    handle.add_secondary_id("x").unwrap();

    let found = store.find_by_secondary_id("x").unwrap().unwrap();
    assert_eq!(found.hash(), handle.hash());
    assert_eq!(found.size(), handle.size());
}

#[test]
fn test_unregistered_secondary_id_is_none() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    assert!(store.find_by_secondary_id("nobody").unwrap().is_none());
}

#[test]
fn test_dangling_secondary_id() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let hash = {
        let handle = store.put(&b"short lived"[..]).unwrap();
        handle.add_secondary_id("x").unwrap();
        *handle.hash()
    };
    store.delete(&hash).unwrap();

    let err = store.find_by_secondary_id("x").unwrap_err();
    assert!(err.is_not_found());
    // the entry itself is still there
    assert_eq!(store.secondary_id_target("x").unwrap(), Some(hash));
}

#[test]
fn test_secondary_id_overwrite_wins() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let old = store.put(&b"v1"[..]).unwrap();
    let new = store.put(&b"v2"[..]).unwrap();
    store.add_secondary_id(&old, "latest").unwrap();
    store.add_secondary_id(&new, "latest").unwrap();

    let found = store.find_by_secondary_id("latest").unwrap().unwrap();
    assert_eq!(found.hash(), new.hash());
}

#[test]
fn test_remove_secondary_id() {
    let dir = tempdir().unwrap();
    let store = BlobStore::open(dir.path()).unwrap();

    let handle = store.put(&b"named"[..]).unwrap();
    handle.add_secondary_id("name").unwrap();

    assert!(store.remove_secondary_id("name").unwrap());
    assert!(!store.remove_secondary_id("name").unwrap());
    assert!(store.find_by_secondary_id("name").unwrap().is_none());
    // the blob stays
    assert!(store.contains(handle.hash()));
}

#[test]
fn test_secondary_ids_persist_across_reopen() {
    let dir = tempdir().unwrap();

    let hash = {
        let store = BlobStore::open(dir.path()).unwrap();
        let handle = store.put(&b"persistent"[..]).unwrap();
        handle.add_secondary_id("urn:isbn:0451450523").unwrap();
        *handle.hash()
    };

    let store = BlobStore::open(dir.path()).unwrap();
    let found = store
        .find_by_secondary_id("urn:isbn:0451450523")
        .unwrap()
        .unwrap();
    assert_eq!(found.hash(), &hash);
    assert_eq!(found.read_to_vec().unwrap(), b"persistent");
}
