use std::ffi::OsStr;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// Directory names never carried from a draft into a live tree.
pub const EXCLUDED_DIRS: [&str; 4] = [".git", ".hg", ".svn", "node_modules"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
}

/// Recursively copies `source` onto `destination`, overwriting what is there.
/// An existing entry of a different type is removed first.
pub fn copy_tree(source: &Path, destination: &Path) -> io::Result<CopyStats> {
    let mut stats = CopyStats::default();
    let mut skipped = 0;

    let walker = WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let excluded = entry.depth() > 0 && entry.file_type().is_dir() && is_excluded(entry);
            if excluded {
                skipped += 1;
            }
            !excluded
        });

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let to = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            prepare_dir(&to)?;
            stats.dirs += 1;
        } else if file_type.is_symlink() {
            replace_non_dir(&to)?;
            copy_symlink(entry.path(), &to)?;
            stats.files += 1;
        } else {
            replace_non_dir(&to)?;
            fs::copy(entry.path(), &to)?;
            stats.files += 1;
        }
    }

    stats.skipped = skipped;
    Ok(stats)
}

fn is_excluded(entry: &DirEntry) -> bool {
    EXCLUDED_DIRS
        .iter()
        .any(|name| entry.file_name() == OsStr::new(name))
}

fn prepare_dir(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path)?,
        Ok(_) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => return Err(error),
    }
    fs::create_dir_all(path)
}

fn replace_non_dir(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Removes a tree. A missing tree is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

pub fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
