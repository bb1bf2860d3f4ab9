//! Writing the two output files
//!
//! Both files are staged as temporary files next to their destinations and
//! renamed into place only once both were written completely. Staged files
//! take the permissions of the file they replace, or `0644` when new.
//!
//! The two renames are not one atomic step: if the header rename fails after
//! the C file was replaced, the previous C file is put back.

use crate::error::GenerateError;
use log::{debug, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub c: PathBuf,
    pub header: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, c_file: &str, header_file: &str) -> Self {
        OutputPaths {
            c: dir.join(c_file),
            header: dir.join(header_file),
        }
    }
}

pub struct OutputWriter {
    paths: OutputPaths,
}

impl OutputWriter {
    pub fn new(paths: OutputPaths) -> Self {
        OutputWriter { paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Overwrite both files with `c` and `header`.
    pub fn write(&self, c: &str, header: &str) -> Result<(), GenerateError> {
        let staged_c = stage(&self.paths.c, c.as_bytes())?;
        let staged_header = stage(&self.paths.header, header.as_bytes())?;
        let previous_c = backup(&self.paths.c)?;

        commit(staged_c, &self.paths.c)?;
        if let Err(e) = commit(staged_header, &self.paths.header) {
            restore(&self.paths.c, previous_c);
            return Err(e);
        }
        Ok(())
    }
}

fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile, GenerateError> {
    let write_err = |source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    if let Some(permissions) = permissions_for(path) {
        file.as_file().set_permissions(permissions).map_err(write_err)?;
    }
    debug!("staged {} bytes for {}", contents.len(), path.display());
    Ok(file)
}

fn commit(file: NamedTempFile, path: &Path) -> Result<(), GenerateError> {
    file.persist(path).map_err(|e| GenerateError::Write {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Current contents of `path`, or `None` when it does not exist yet.
fn backup(path: &Path) -> Result<Option<Vec<u8>>, GenerateError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(GenerateError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn restore(path: &Path, previous: Option<Vec<u8>>) {
    let result = match previous {
        Some(bytes) => stage(path, &bytes).and_then(|file| commit(file, path)),
        None => fs::remove_file(path).map_err(|source| GenerateError::Write {
            path: path.to_path_buf(),
            source,
        }),
    };
    if let Err(e) = result {
        warn!("could not roll back {}: {}", path.display(), e);
    }
}

/// Permissions for a staged file: those of the file it replaces, else `0644`.
fn permissions_for(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_directories_and_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
        OutputWriter::new(paths.clone()).write("int c;", "int h;").unwrap();
        assert_eq!(fs::read_to_string(&paths.c).unwrap(), "int c;");
        assert_eq!(fs::read_to_string(&paths.header).unwrap(), "int h;");
    }

    #[test]
    fn test_overwrites_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
        let writer = OutputWriter::new(paths.clone());
        writer.write("first body that is long", "first").unwrap();
        writer.write("second", "second").unwrap();
        assert_eq!(fs::read_to_string(&paths.c).unwrap(), "second");
        assert_eq!(fs::read_to_string(&paths.header).unwrap(), "second");
    }

    #[test]
    fn test_blocked_directory_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the `c/` directory should go.
        fs::write(dir.path().join("c"), "not a directory").unwrap();
        let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
        let err = OutputWriter::new(paths.clone()).write("c", "h").unwrap_err();
        assert_eq!(err.stage(), "write");
        assert!(!paths.header.exists());
    }

    #[test]
    fn test_failed_header_rename_restores_previous_c() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
        fs::create_dir_all(paths.c.parent().unwrap()).unwrap();
        fs::write(&paths.c, "old c").unwrap();
        // A directory at the header path makes the final rename fail.
        fs::create_dir(&paths.header).unwrap();

        let err = OutputWriter::new(paths.clone()).write("new c", "new h").unwrap_err();
        assert_eq!(err.stage(), "write");
        assert_eq!(fs::read_to_string(&paths.c).unwrap(), "old c");
    }

    #[test]
    fn test_failed_header_rename_removes_fresh_c() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
        fs::create_dir(&paths.header).unwrap();

        assert!(OutputWriter::new(paths.clone()).write("new c", "new h").is_err());
        assert!(!paths.c.exists());
    }

    #[cfg(unix)]
    mod permissions {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn mode(path: &Path) -> u32 {
            fs::metadata(path).unwrap().permissions().mode() & 0o777
        }

        #[test]
        fn test_new_outputs_are_world_readable() {
            let dir = tempfile::tempdir().unwrap();
            let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
            OutputWriter::new(paths.clone()).write("c", "h").unwrap();
            assert_eq!(mode(&paths.c), 0o644);
            assert_eq!(mode(&paths.header), 0o644);
        }

        #[test]
        fn test_overwrite_keeps_existing_mode() {
            let dir = tempfile::tempdir().unwrap();
            let paths = OutputPaths::new(dir.path(), "c/llrtsp.c", "llrtsp.h");
            let writer = OutputWriter::new(paths.clone());
            writer.write("c", "h").unwrap();
            fs::set_permissions(&paths.header, fs::Permissions::from_mode(0o664)).unwrap();

            writer.write("c2", "h2").unwrap();
            assert_eq!(mode(&paths.header), 0o664);
            assert_eq!(fs::read_to_string(&paths.header).unwrap(), "h2");
        }
    }
}
