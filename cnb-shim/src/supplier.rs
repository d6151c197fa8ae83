use crate::installer::{InstallError, Installer};
use crate::layout::PlatformLayout;
use crate::order_merge::order_file_name;
use crate::stack::Stack;
use cnb_shim_support::fs::{copy_file, move_directory_contents, remove_path};
use cnb_shim_support::log::Logger;
use cnb_shim_support::manifest::{Manifest, ManifestError};
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// Target of the symbolic link left at the V2 app directory once the app has been moved into the
/// V3 workspace. Anything that still reads the V2 app directory fails with this message.
pub const MOVED_APP_SENTINEL: &str =
    "Error: the v2 app directory was moved to the v3 app directory by a previous buildpack";

const ORDER_FILE_NAME: &str = "order.toml";

#[derive(thiserror::Error, Debug)]
pub enum SupplyError {
    #[error("failed to validate buildpack: {0}")]
    InvalidBuildpack(#[source] ManifestError),

    #[error("failed to move app to the v3 app directory: {0}")]
    MoveApp(#[source] io::Error),

    #[error("failed to remove v2 dependencies of buildpack {0}: {1}")]
    RemoveLegacyDeps(usize, #[source] io::Error),

    #[error("failed to store order of buildpack {0}: {1}")]
    StoreOrder(usize, #[source] io::Error),

    #[error("failed to install buildpacks: {0}")]
    InstallBuildpacks(#[source] InstallError),
}

/// The `supply` phase of one V2 buildpack in the chain.
///
/// Every step can be repeated: running a supply phase again after it failed half-way picks up
/// where the previous attempt left off.
pub struct Supplier<'a> {
    /// The V2 app directory handed to the buildpack by the platform.
    pub app_dir: PathBuf,
    /// The V2 dependencies directory, with one subdirectory per buildpack in the chain.
    pub deps_dir: PathBuf,
    /// Position of this buildpack in the chain.
    pub phase_index: usize,
    /// Root directory of this buildpack, containing its `order.toml`.
    pub buildpack_dir: PathBuf,
    pub layout: PlatformLayout,
    pub stack: &'a Stack,
    pub manifest: &'a Manifest,
    pub installer: &'a dyn Installer,
    pub logger: &'a Logger,
}

impl Supplier<'_> {
    pub fn supply(&self) -> Result<(), SupplyError> {
        self.manifest
            .check_buildpack_valid(self.stack.name(), self.logger)
            .map_err(SupplyError::InvalidBuildpack)?;

        self.set_up_workspace().map_err(SupplyError::MoveApp)?;

        remove_path(self.deps_dir.join(self.phase_index.to_string()))
            .map_err(|error| SupplyError::RemoveLegacyDeps(self.phase_index, error))?;

        let stored_order = self.layout.order_dir.join(order_file_name(self.phase_index));
        copy_file(self.buildpack_dir.join(ORDER_FILE_NAME), &stored_order)
            .map_err(|error| SupplyError::StoreOrder(self.phase_index, error))?;

        self.installer
            .install_buildpacks(&stored_order, &self.layout.buildpacks_dir)
            .map_err(SupplyError::InstallBuildpacks)
    }

    /// Moves the V2 app into the V3 workspace, unless a previous supply phase already did.
    ///
    /// The marker file is written before the V2 app directory is replaced by the sentinel link.
    /// Either one marks the move as done.
    fn set_up_workspace(&self) -> Result<(), io::Error> {
        let marker = self.layout.workspace_marker();
        let app_dir_replaced = is_symlink(&self.app_dir);

        if app_dir_replaced {
            self.logger
                .debug("App was already moved to the v3 app directory");
            return Ok(());
        }

        if !marker.exists() {
            fs::create_dir_all(&self.layout.app_dir)?;
            move_directory_contents(&self.app_dir, &self.layout.app_dir)?;

            if let Some(marker_dir) = marker.parent() {
                fs::create_dir_all(marker_dir)?;
            }
            fs::write(&marker, "")?;
        }

        // Missing when a previous attempt stopped right before creating the link.
        match fs::remove_dir(&self.app_dir) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => return Err(error),
            _ => {}
        }
        symlink(MOVED_APP_SENTINEL, &self.app_dir)
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|metadata| metadata.file_type().is_symlink())
}
