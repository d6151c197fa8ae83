use crate::layout::launch_metadata_path;
use cnb_shim_common::{read_toml_file, StructuredFileError};
use cnb_shim_data::launch::LaunchMetadata;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ReleaseError {
    #[error("Could not read launch metadata: {0}")]
    ReadLaunchMetadata(#[source] StructuredFileError),

    #[error("Could not write release information: {0}")]
    Write(#[source] serde_yaml::Error),

    #[error("Could not remove launch metadata {0}: {1}")]
    RemoveLaunchMetadata(String, #[source] io::Error),
}

/// The release information a V2 buildpack reports to the platform.
#[derive(Serialize, Debug, Clone, Default, Eq, PartialEq)]
struct ReleaseInfo {
    default_process_types: BTreeMap<String, String>,
}

/// The `release` phase: reports the process types the lifecycle recorded during finalize.
pub struct Releaser {
    /// The V2 app directory.
    pub app_dir: PathBuf,
}

impl Releaser {
    /// Writes the process types as YAML to `output` and removes the launch metadata, which is of
    /// no use to the running app.
    pub fn release(&self, output: impl Write) -> Result<(), ReleaseError> {
        let metadata_path = launch_metadata_path(&self.app_dir);
        let metadata: LaunchMetadata =
            read_toml_file(&metadata_path).map_err(ReleaseError::ReadLaunchMetadata)?;

        let release_info = ReleaseInfo {
            default_process_types: metadata
                .processes
                .into_iter()
                .map(|process| (process.r#type, process.command))
                .collect(),
        };
        serde_yaml::to_writer(output, &release_info).map_err(ReleaseError::Write)?;

        fs::remove_file(&metadata_path).map_err(|error| {
            ReleaseError::RemoveLaunchMetadata(metadata_path.to_string_lossy().into_owned(), error)
        })
    }
}
