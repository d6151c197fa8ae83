use std::fs;
use std::io::Read;
use std::path::Path;

/// Obtains the MD5 checksum of a file as a lowercase hex string.
///
/// # Examples
/// ```
/// use cnb_shim_support::digest::md5;
/// use std::fs::write;
/// use tempfile::tempdir;
///
/// let temp_dir = tempdir().unwrap();
/// let temp_file = temp_dir.path().join("test.txt");
///
/// write(&temp_file, "Hello World!").unwrap();
/// assert_eq!(md5(&temp_file).unwrap(), "ed076287532e86365e841e92bfc50d8c");
/// ```
pub fn md5(path: impl AsRef<Path>) -> Result<String, std::io::Error> {
    let mut file = fs::File::open(path.as_ref())?;
    let mut buffer = [0x00; 10 * 1024];
    let mut context = md5::Context::new();

    let mut read = file.read(&mut buffer)?;
    while read > 0 {
        context.consume(&buffer[..read]);
        read = file.read(&mut buffer)?;
    }

    Ok(format!("{:x}", context.compute()))
}
