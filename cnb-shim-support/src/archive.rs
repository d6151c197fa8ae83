use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use tar::Archive;

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("Unsupported archive format, expected a .tgz, .tar.gz or .tar file: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error while unpacking {0}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// Archive formats dependencies can be shipped in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArchiveFormat {
    GzipTarball,
    Tarball,
}

impl ArchiveFormat {
    /// Determines the format from a file name or URL, ignoring any query string or fragment.
    ///
    /// ```
    /// use cnb_shim_support::archive::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::from_name("https://example.com/lifecycle-0.3.0.tgz?token=x"),
    ///     Some(ArchiveFormat::GzipTarball)
    /// );
    /// assert_eq!(ArchiveFormat::from_name("node.tar"), Some(ArchiveFormat::Tarball));
    /// assert_eq!(ArchiveFormat::from_name("node.zip"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.split(['?', '#']).next().unwrap_or(name);

        if name.ends_with(".tgz") || name.ends_with(".tar.gz") {
            Some(Self::GzipTarball)
        } else if name.ends_with(".tar") {
            Some(Self::Tarball)
        } else {
            None
        }
    }
}

/// Decompresses and untars a given .tar.gz file to the given directory.
pub fn decompress_tarball(
    tarball: &mut File,
    destination: impl AsRef<Path>,
) -> Result<(), std::io::Error> {
    tarball.rewind()?;
    Archive::new(GzDecoder::new(tarball)).unpack(destination)
}

/// Untars a given uncompressed .tar file to the given directory.
pub fn unpack_tarball(
    tarball: &mut File,
    destination: impl AsRef<Path>,
) -> Result<(), std::io::Error> {
    tarball.rewind()?;
    Archive::new(tarball).unpack(destination)
}

/// Unpacks the archive at `path` into `destination`, which is created if missing.
///
/// `name` is used to determine the archive format, usually the URL the archive was fetched from.
pub fn unpack(
    path: impl AsRef<Path>,
    name: &str,
    destination: impl AsRef<Path>,
) -> Result<(), ArchiveError> {
    let path = path.as_ref();
    let destination = destination.as_ref();
    let io_error = |error| ArchiveError::Io(path.to_string_lossy().into_owned(), error);

    let format = ArchiveFormat::from_name(name)
        .ok_or_else(|| ArchiveError::UnsupportedFormat(String::from(name)))?;

    std::fs::create_dir_all(destination).map_err(io_error)?;
    let mut file = File::open(path).map_err(io_error)?;

    match format {
        ArchiveFormat::GzipTarball => decompress_tarball(&mut file, destination),
        ArchiveFormat::Tarball => unpack_tarball(&mut file, destination),
    }
    .map_err(io_error)
}
