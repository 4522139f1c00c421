use std::fs;
use std::io;
use std::path::Path;

/// Deletes the file or directory at `file_path` if it exists.
pub fn delete_file(file_path: &str) -> io::Result<()> {
    let path = Path::new(file_path);
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    }
}

/// Creates a folder (and any necessary parent directories) at `folder_path`.
pub fn create_folder(folder_path: &str) -> io::Result<()> {
    fs::create_dir_all(folder_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_folder_is_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        create_folder(nested.to_str().unwrap()).unwrap();
        create_folder(nested.to_str().unwrap()).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn delete_file_on_missing_path_is_a_noop() {
        delete_file("/tmp/seek-tune-rs-nonexistent-path").unwrap();
    }
}
