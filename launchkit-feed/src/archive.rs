//! `.nupkg` unpacking.
//!
//! A package is unpacked next to its own `.nupkg` file, which stays in the
//! folder as the package manifest. OPC bookkeeping entries (`_rels/`,
//! `package/`, `[Content_Types].xml`) are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{io_err, FeedError};

const SKIPPED_ROOTS: [&str; 3] = ["_rels", "package", "[Content_Types].xml"];

/// Unpack `nupkg` into its parent folder and list the folder's files.
///
/// The returned list contains the extracted files plus the `.nupkg` itself,
/// sorted for a stable order.
pub fn unpack_in_place(nupkg: &Path) -> Result<Vec<PathBuf>, FeedError> {
    let folder = nupkg
        .parent()
        .ok_or_else(|| io_err(nupkg, io::Error::other("package file has no parent folder")))?;

    let file = fs::File::open(nupkg).map_err(|e| io_err(nupkg, e))?;
    let mut archive = ZipArchive::new(file).map_err(|source| FeedError::Archive {
        path: nupkg.to_path_buf(),
        source,
    })?;

    let mut files = vec![nupkg.to_path_buf()];
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| FeedError::Archive {
            path: nupkg.to_path_buf(),
            source,
        })?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(FeedError::UnsafeEntry {
                path: nupkg.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        if is_bookkeeping(&relative) {
            continue;
        }

        let target = folder.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| io_err(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| io_err(&target, e))?;
        restore_mode(&target, entry.unix_mode())?;
        files.push(target);
    }

    files.sort();
    tracing::debug!(
        package = %nupkg.display(),
        files = files.len(),
        "unpacked package",
    );
    Ok(files)
}

/// Reapply the permission bits recorded in the archive, so packaged scripts
/// stay executable.
#[cfg(unix)]
fn restore_mode(target: &Path, mode: Option<u32>) -> Result<(), FeedError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| io_err(target, e))
}

#[cfg(not(unix))]
fn restore_mode(_target: &Path, _mode: Option<u32>) -> Result<(), FeedError> {
    Ok(())
}

fn is_bookkeeping(relative: &Path) -> bool {
    relative
        .components()
        .next()
        .and_then(|first| first.as_os_str().to_str())
        .is_some_and(|first| SKIPPED_ROOTS.contains(&first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_nupkg(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn unpacks_content_next_to_the_package() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("Contoso.Viewer.1.0.0");
        fs::create_dir_all(&folder).unwrap();
        let nupkg = folder.join("contoso.viewer.1.0.0.nupkg");
        write_nupkg(
            &nupkg,
            &[
                ("lib/net8.0/viewer.exe", "MZ"),
                ("Contoso.Viewer.nuspec", "<package/>"),
                ("_rels/.rels", "<rels/>"),
                ("[Content_Types].xml", "<types/>"),
                ("package/services/metadata/core-properties/x.psmdcp", "<core/>"),
            ],
        );

        let files = unpack_in_place(&nupkg).unwrap();

        assert!(files.contains(&nupkg));
        assert!(files.contains(&folder.join("lib/net8.0/viewer.exe")));
        assert!(files.contains(&folder.join("Contoso.Viewer.nuspec")));
        assert_eq!(files.len(), 3, "bookkeeping entries must be skipped: {files:?}");
        assert_eq!(fs::read_to_string(folder.join("lib/net8.0/viewer.exe")).unwrap(), "MZ");
    }

    #[cfg(unix)]
    #[test]
    fn executable_bits_survive_unpacking() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let nupkg = tmp.path().join("contoso.tools.1.0.0.nupkg");
        let file = fs::File::create(&nupkg).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file("bin/start.sh", SimpleFileOptions::default().unix_permissions(0o755))
            .unwrap();
        zip.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
        zip.start_file("README.md", SimpleFileOptions::default().unix_permissions(0o644))
            .unwrap();
        zip.write_all(b"docs").unwrap();
        zip.finish().unwrap();

        unpack_in_place(&nupkg).unwrap();

        let mode = |name: &str| {
            fs::metadata(tmp.path().join(name)).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode("bin/start.sh"), 0o755);
        assert_eq!(mode("README.md"), 0o644);
    }

    #[test]
    fn corrupt_package_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let nupkg = tmp.path().join("broken.1.0.0.nupkg");
        fs::write(&nupkg, "not a zip").unwrap();

        let err = unpack_in_place(&nupkg).unwrap_err();
        assert!(matches!(err, FeedError::Archive { .. }), "got: {err}");
        assert!(err.to_string().contains("broken.1.0.0.nupkg"));
    }
}
