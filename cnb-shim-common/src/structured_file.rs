use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

/// An error that occurred during reading or writing a TOML or YAML file.
#[derive(thiserror::Error, Debug)]
pub enum StructuredFileError {
    #[error("I/O error while reading/writing {0}: {1}")]
    IoError(String, #[source] std::io::Error),

    #[error("TOML deserialization error while reading {0}: {1}")]
    TomlDeserializationError(String, #[source] toml::de::Error),

    #[error("TOML serialization error while writing {0}: {1}")]
    TomlSerializationError(String, #[source] toml::ser::Error),

    #[error("YAML error while reading/writing {0}: {1}")]
    YamlError(String, #[source] serde_yaml::Error),
}

/// Serializes the given value as TOML and writes it to the given file path.
///
/// Missing parent directories are created. An existing file is replaced.
pub fn write_toml_file(
    value: &impl Serialize,
    path: impl AsRef<Path>,
) -> Result<(), StructuredFileError> {
    let path = path.as_ref();
    let contents = toml::to_string(value)
        .map_err(|error| StructuredFileError::TomlSerializationError(display(path), error))?;

    write_creating_parents(path, contents)
}

/// Reads the file at the given path and parses it as TOML into `A`.
pub fn read_toml_file<A: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<A, StructuredFileError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|error| StructuredFileError::IoError(display(path), error))?;

    toml::from_str(&contents)
        .map_err(|error| StructuredFileError::TomlDeserializationError(display(path), error))
}

/// Serializes the given value as YAML and writes it to the given file path.
///
/// Missing parent directories are created. An existing file is replaced.
pub fn write_yaml_file(
    value: &impl Serialize,
    path: impl AsRef<Path>,
) -> Result<(), StructuredFileError> {
    let path = path.as_ref();
    let contents = serde_yaml::to_string(value)
        .map_err(|error| StructuredFileError::YamlError(display(path), error))?;

    write_creating_parents(path, contents)
}

/// Reads the file at the given path and parses it as YAML into `A`.
pub fn read_yaml_file<A: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<A, StructuredFileError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|error| StructuredFileError::IoError(display(path), error))?;

    serde_yaml::from_str(&contents)
        .map_err(|error| StructuredFileError::YamlError(display(path), error))
}

fn write_creating_parents(path: &Path, contents: String) -> Result<(), StructuredFileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| StructuredFileError::IoError(display(parent), error))?;
    }

    fs::write(path, contents).map_err(|error| StructuredFileError::IoError(display(path), error))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
