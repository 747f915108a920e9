//! Crash-safe whole-file replacement.
//!
//! Each write goes to its own uniquely named temp file next to the target,
//! which is fsynced and then renamed over it. Readers see one complete
//! version even with several writers racing; a crash mid-write leaves the
//! committed file untouched.

use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let prefix = path
        .file_name()
        .map(|n| format!(".{}.", n.to_string_lossy()))
        .unwrap_or_else(|| ".battmon.".to_string());

    // Dropped (and removed) on any early return below.
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    // Persist the rename itself; not all platforms allow opening a directory.
    #[cfg(unix)]
    {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn replaces_contents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert_eq!(dir_entries(dir.path()), vec!["state.json".to_string()]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("state.json");
        write_atomic(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn stale_temp_file_does_not_affect_committed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, b"committed").unwrap();
        // A crash can leave a half-written temp file behind.
        let leftover = dir.path().join(".state.json.crashed.tmp");
        fs::write(&leftover, b"half").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"committed");
        write_atomic(&path, b"next").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"next");
        assert_eq!(fs::read(&leftover).unwrap(), b"half");
    }

    #[cfg(unix)]
    #[test]
    fn concurrent_writers_never_tear_the_file() {
        const LEN: usize = 256 * 1024;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, &vec![b'A'; LEN]).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let writers: Vec<_> = [b'A', b'B']
            .into_iter()
            .map(|fill| {
                let path = path.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    let body = vec![fill; LEN];
                    let mut failures = 0u32;
                    while !stop.load(Ordering::Relaxed) {
                        if write_atomic(&path, &body).is_err() {
                            failures += 1;
                        }
                    }
                    failures
                })
            })
            .collect();

        let deadline = Instant::now() + Duration::from_secs(1);
        let mut reads = 0u32;
        while Instant::now() < deadline {
            let got = fs::read(&path).unwrap();
            assert_eq!(got.len(), LEN, "torn read after {reads} reads");
            let first = got[0];
            assert!(first == b'A' || first == b'B');
            assert!(got.iter().all(|&b| b == first), "mixed contents");
            reads += 1;
        }
        stop.store(true, Ordering::Relaxed);
        for w in writers {
            assert_eq!(w.join().unwrap(), 0, "a writer failed");
        }
        assert_eq!(dir_entries(dir.path()), vec!["state.json".to_string()]);
    }
}
