use cnb_shim_common::{read_toml_file, StructuredFileError};
use cnb_shim_data::order::Order;
use cnb_shim_support::fs::{move_replacing, remove_path};
use cnb_shim_support::log::Logger;
use cnb_shim_support::manifest::{Dependency, Manifest, ManifestError};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// Name of the manifest dependency that bundles the lifecycle binaries.
pub const LIFECYCLE_DEPENDENCY: &str = "lifecycle";
pub const DETECTOR: &str = "detector";
pub const BUILDER: &str = "builder";
pub const LAUNCHER: &str = "launcher";
pub const LIFECYCLE_BINARIES: [&str; 3] = [DETECTOR, BUILDER, LAUNCHER];

const LATEST: &str = "latest";

/// Materializes CNB buildpacks and lifecycle binaries on disk.
pub trait Installer {
    /// Installs every buildpack referenced by the order file at `order_path` into
    /// `install_dir/<id>/<version>`, pointing `install_dir/<id>/latest` at it.
    fn install_buildpacks(&self, order_path: &Path, install_dir: &Path) -> Result<(), InstallError>;

    /// Installs the `detector`, `builder` and `launcher` binaries into `destination_dir`.
    fn install_lifecycle(&self, destination_dir: &Path) -> Result<(), InstallError>;
}

#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    #[error("Could not read order: {0}")]
    ReadOrder(#[source] StructuredFileError),

    #[error("unable to find a unique version of {id} in the manifest, found {count}")]
    AmbiguousBuildpackVersion { id: String, count: usize },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("issue unpacking lifecycle: expected exactly one top-level directory, found: {}", .0.join(", "))]
    UnexpectedLifecycleLayout(Vec<String>),

    #[error("I/O error at {0}: {1}")]
    Io(String, #[source] io::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> InstallError + '_ {
    move |error| InstallError::Io(path.to_string_lossy().into_owned(), error)
}

/// Installs buildpacks and the lifecycle from the dependencies of a buildpack manifest.
///
/// Buildpacks are looked up by their ID, which doubles as the dependency name. Every buildpack
/// must have exactly one version in the manifest.
pub struct ManifestInstaller<'a> {
    manifest: &'a Manifest,
    logger: &'a Logger,
}

impl<'a> ManifestInstaller<'a> {
    pub fn new(manifest: &'a Manifest, logger: &'a Logger) -> Self {
        Self { manifest, logger }
    }
}

impl Installer for ManifestInstaller<'_> {
    fn install_buildpacks(&self, order_path: &Path, install_dir: &Path) -> Result<(), InstallError> {
        let order: Order = read_toml_file(order_path).map_err(InstallError::ReadOrder)?;
        let ids: BTreeSet<&str> = order.buildpack_ids().into_iter().map(|id| id.as_str()).collect();

        for id in ids {
            let version = match self.manifest.all_versions(id).as_slice() {
                [version] => String::from(*version),
                versions => {
                    return Err(InstallError::AmbiguousBuildpackVersion {
                        id: String::from(id),
                        count: versions.len(),
                    })
                }
            };

            let buildpack_dir = install_dir.join(id);
            let version_dir = buildpack_dir.join(&version);
            let latest_link = buildpack_dir.join(LATEST);

            if version_dir.exists() {
                self.logger
                    .debug(format!("Buildpack {id} {version} is already installed"));
                if fs::symlink_metadata(&latest_link).is_err() {
                    symlink(&version_dir, &latest_link).map_err(io_error(&latest_link))?;
                }
                continue;
            }

            self.manifest.install_dependency(
                &Dependency::new(id, version.as_str()),
                &version_dir,
                self.logger,
            )?;

            remove_path(&latest_link).map_err(io_error(&latest_link))?;
            symlink(&version_dir, &latest_link).map_err(io_error(&latest_link))?;
        }

        Ok(())
    }

    fn install_lifecycle(&self, destination_dir: &Path) -> Result<(), InstallError> {
        fs::create_dir_all(destination_dir).map_err(io_error(destination_dir))?;

        // Unpacking next to the destination keeps the final moves on one filesystem.
        let scratch_dir = tempfile::Builder::new()
            .prefix(".lifecycle")
            .tempdir_in(destination_dir)
            .map_err(io_error(destination_dir))?;

        self.manifest
            .install_only_version(LIFECYCLE_DEPENDENCY, scratch_dir.path(), self.logger)?;

        let top_level_dir = single_top_level_dir(scratch_dir.path())?;
        for binary in LIFECYCLE_BINARIES {
            let source = top_level_dir.join(binary);
            move_replacing(&source, destination_dir.join(binary)).map_err(io_error(&source))?;
        }

        Ok(())
    }
}

fn single_top_level_dir(dir: &Path) -> Result<PathBuf, InstallError> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(io_error(dir))?;
    entries.sort();

    match entries.as_slice() {
        [single] if single.is_dir() => Ok(single.clone()),
        _ => Err(InstallError::UnexpectedLifecycleLayout(
            entries
                .iter()
                .filter_map(|entry| entry.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        )),
    }
}

/// Installs the lifecycle into `lifecycle_dir` unless all of its binaries are already there.
pub fn ensure_lifecycle(installer: &dyn Installer, lifecycle_dir: &Path) -> Result<(), InstallError> {
    if LIFECYCLE_BINARIES
        .iter()
        .all(|binary| lifecycle_dir.join(binary).is_file())
    {
        return Ok(());
    }

    installer.install_lifecycle(lifecycle_dir)
}
