use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;

/// Moves every entry of `src_dir` into the existing directory `dst_dir`, leaving `src_dir` in
/// place but empty. Entries are renamed, so both directories must be on the same filesystem.
///
/// Nothing is rolled back on failure: entries moved before the error stay in `dst_dir`.
///
/// ```no_run
/// use cnb_shim_support::fs::move_directory_contents;
///
/// move_directory_contents("/tmp/app", "/home/vcap/workspace").unwrap();
/// ```
pub fn move_directory_contents(
    src_dir: impl AsRef<Path>,
    dst_dir: impl AsRef<Path>,
) -> Result<(), io::Error> {
    let src_dir = src_dir.as_ref();

    for dir_entry in fs::read_dir(src_dir)? {
        let entry_path = dir_entry?.path();
        let relative_path = pathdiff::diff_paths(&entry_path, src_dir).ok_or_else(|| {
            io::Error::other(format!(
                "{} is not inside {}",
                entry_path.display(),
                src_dir.display()
            ))
        })?;

        fs::rename(&entry_path, dst_dir.as_ref().join(relative_path))?;
    }

    Ok(())
}

/// Moves `src` to `dst`, replacing anything that already exists at `dst`. Missing parent
/// directories of `dst` are created.
pub fn move_replacing(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<(), io::Error> {
    let dst = dst.as_ref();

    remove_path(dst)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(src.as_ref(), dst)
}

/// Moves the contents of `src_dir` into `dst_dir`, descending into directories that exist on
/// both sides. Files in `dst_dir` are replaced by files of the same name from `src_dir`.
/// `src_dir` is removed afterwards.
pub fn merge_directory(
    src_dir: impl AsRef<Path>,
    dst_dir: impl AsRef<Path>,
) -> Result<(), io::Error> {
    let src_dir = src_dir.as_ref();
    let dst_dir = dst_dir.as_ref();
    fs::create_dir_all(dst_dir)?;

    for dir_entry in fs::read_dir(src_dir)? {
        let dir_entry = dir_entry?;
        let target = dst_dir.join(dir_entry.file_name());

        if dir_entry.file_type()?.is_dir() && is_directory(&target)? {
            merge_directory(dir_entry.path(), &target)?;
        } else {
            move_replacing(dir_entry.path(), &target)?;
        }
    }

    fs::remove_dir(src_dir)
}

/// Recursively copies `src_dir` into `dst_dir`, creating `dst_dir` if needed. Symbolic links are
/// recreated rather than followed.
// Not `fs_extra::dir::copy`, which follows symbolic links and breaks relative links in layers.
pub fn copy_directory(
    src_dir: impl AsRef<Path>,
    dst_dir: impl AsRef<Path>,
) -> Result<(), io::Error> {
    let dst_dir = dst_dir.as_ref();
    fs::create_dir_all(dst_dir)?;

    for dir_entry in fs::read_dir(src_dir.as_ref())? {
        let dir_entry = dir_entry?;
        let file_type = dir_entry.file_type()?;
        let target = dst_dir.join(dir_entry.file_name());

        if file_type.is_dir() {
            copy_directory(dir_entry.path(), &target)?;
        } else if file_type.is_symlink() {
            remove_path(&target)?;
            symlink(fs::read_link(dir_entry.path())?, &target)?;
        } else {
            fs::copy(dir_entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Copies a single file, creating missing parent directories of `dst`.
pub fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<(), io::Error> {
    let dst = dst.as_ref();
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::copy(src.as_ref(), dst).map(|_| ())
}

/// Removes a file, symbolic link or directory tree. A missing path is not an error.
pub fn remove_path(path: impl AsRef<Path>) -> Result<(), io::Error> {
    let path = path.as_ref();

    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

fn is_directory(path: &Path) -> Result<bool, io::Error> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}
