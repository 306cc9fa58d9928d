//! Locked File Access Module
//!
//! Scoped shared/exclusive advisory locks around whole-file reads and writes.
//! Locks are cooperative across every process using the same cache directory.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;

// == Lock Guard ==
/// Holds an advisory lock on an open file and releases it on drop.
///
/// The file handle is closed when the guard goes away, after the unlock.
struct LockGuard {
    file: File,
}

impl LockGuard {
    fn shared(file: File) -> io::Result<Self> {
        FileExt::lock_shared(&file)?;
        Ok(Self { file })
    }

    fn exclusive(file: File) -> io::Result<Self> {
        FileExt::lock_exclusive(&file)?;
        Ok(Self { file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the handle releases the lock anyway.
        let _ = FileExt::unlock(&self.file);
    }
}

// == Locked Read ==
/// Reads the whole file under a shared lock.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn locked_read(path: &Path) -> io::Result<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut guard = LockGuard::shared(file)?;
    let mut bytes = Vec::new();
    guard.file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

// == Locked Write ==
/// Replaces the file contents under an exclusive lock, creating it if needed.
///
/// The file is truncated only after the lock is held. A short write fails with
/// `ErrorKind::WriteZero`.
pub fn locked_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let mut guard = LockGuard::exclusive(file)?;
    guard.file.set_len(0)?;
    guard.file.seek(SeekFrom::Start(0))?;
    guard.file.write_all(bytes)?;
    guard.file.flush()?;
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let result = locked_read(&dir.path().join("missing.cache")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.cache");

        locked_write(&path, b"hello world").unwrap();
        assert_eq!(locked_read(&path).unwrap().unwrap(), b"hello world");
    }

    #[test]
    fn test_overwrite_truncates_longer_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.cache");

        locked_write(&path, b"a much longer first value").unwrap();
        locked_write(&path, b"short").unwrap();
        assert_eq!(locked_read(&path).unwrap().unwrap(), b"short");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_dir").join("entry.cache");
        assert!(locked_write(&path, b"data").is_err());
    }

    #[test]
    fn test_lock_released_after_read_and_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.cache");

        locked_write(&path, b"data").unwrap();
        locked_read(&path).unwrap();

        // Both locks must be gone: an exclusive try-lock succeeds immediately.
        let file = File::open(&path).unwrap();
        FileExt::try_lock_exclusive(&file).unwrap();
        FileExt::unlock(&file).unwrap();
    }

    #[test]
    fn test_write_waits_for_shared_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.cache");
        locked_write(&path, b"before").unwrap();

        let reader = File::open(&path).unwrap();
        FileExt::lock_shared(&reader).unwrap();

        let (tx, rx) = mpsc::channel();
        let writer_path = path.clone();
        let handle = thread::spawn(move || {
            locked_write(&writer_path, b"after").unwrap();
            tx.send(()).unwrap();
        });

        // The writer stays blocked while the shared lock is held.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"before");

        FileExt::unlock(&reader).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();

        assert_eq!(locked_read(&path).unwrap().unwrap(), b"after");
    }
}
