use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `bytes` without ever leaving a partial file behind.
///
/// The data is written to a temporary file in the destination directory,
/// flushed, then renamed over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.sav");
        fs::write(&path, b"old contents").expect("seed file");

        write_atomic(&path, b"new").expect("atomic write");

        assert_eq!(fs::read(&path).expect("read back"), b"new");
        let leftovers = fs::read_dir(dir.path()).expect("list dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_directory_fails_without_creating_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.sav");
        assert!(write_atomic(&path, b"data").is_err());
        assert!(!path.exists());
    }
}
