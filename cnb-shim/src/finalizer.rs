use crate::detector::{Detect, DetectError};
use crate::installer::{ensure_lifecycle, InstallError, Installer, BUILDER, LAUNCHER};
use crate::layout::{launch_metadata_path, workspace_marker_path, PlatformLayout};
use crate::order_merge::{merge_order_files, OrderMergeError};
use crate::process::{Invocation, ProcessError, ProcessRunner};
use crate::stack::{Stack, STACK_ID_ENV_VAR};
use cnb_shim_common::{read_toml_file, write_toml_file, StructuredFileError};
use cnb_shim_data::buildpack_descriptor::WrappedBuildpackDescriptor;
use cnb_shim_data::buildpack_id::BuildpackId;
use cnb_shim_data::group::{GroupBuildpack, GroupMetadata};
use cnb_shim_data::layer_metadata::{LayerMetadata, RESERVED_LAYERS_DIR_FILES};
use cnb_shim_support::fs::{copy_directory, copy_file, merge_directory, move_replacing, remove_path};
use cnb_shim_support::log::Logger;
use cnb_shim_support::manifest::Manifest;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Subdirectory of the V2 cache directory holding the cached layers of CNB buildpacks, as
/// `<buildpack>/<layer>` plus `<buildpack>/<layer>.toml`.
pub const LAYER_CACHE_DIR_NAME: &str = "cnb";

/// Name of the script written to the profile directory that starts the app with the launcher.
pub const LAUNCH_SCRIPT_NAME: &str = "0_shim.sh";

const CONFIG_LAYERS_DIR_NAME: &str = "config";
const LEGACY_LAYER_NAME: &str = "layer";
const NOOP_BUILD_SCRIPT: &str = "#!/bin/bash\n";

#[derive(thiserror::Error, Debug)]
pub enum FinalizeError {
    #[error("failed to remove error file: {0}")]
    RemoveLegacyApp(#[source] io::Error),

    #[error("failed to locate app: {0}")]
    LocateApp(String),

    #[error("failed to merge order metadata: {0}")]
    MergeOrders(#[source] OrderMergeError),

    #[error("failed to write order metadata: {0}")]
    WriteOrder(#[source] StructuredFileError),

    #[error("failed to run V3 detect: {0}")]
    Detect(#[source] DetectError),

    #[error("failed to include previous v2 buildpacks: {0}")]
    IncludeLegacyBuildpacks(#[source] LayerMigrationError),

    #[error("failed to install lifecycle: {0}")]
    InstallLifecycle(#[source] InstallError),

    #[error("failed to restore v3 cache: {0}")]
    RestoreCache(#[source] LayerMigrationError),

    #[error("failed to run v3 lifecycle builder: {0}")]
    Build(#[source] ProcessError),

    #[error("failed to move launcher: {0}")]
    MoveLauncher(#[source] io::Error),

    #[error("failed to move app: {0}")]
    MoveApp(#[source] io::Error),

    #[error("failed to move V3 dependencies: {0}")]
    MoveLayers(#[source] LayerMigrationError),

    #[error("failed to write launch script: {0}")]
    WriteLaunchScript(#[source] io::Error),
}

/// An error while moving layers between the V2 and V3 directory layouts.
#[derive(thiserror::Error, Debug)]
pub enum LayerMigrationError {
    #[error("I/O error at {0}: {1}")]
    Io(String, #[source] io::Error),

    #[error(transparent)]
    Metadata(#[from] StructuredFileError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LayerMigrationError + '_ {
    move |error| LayerMigrationError::Io(path.to_string_lossy().into_owned(), error)
}

/// The `finalize` phase of the last V2 buildpack in the chain.
///
/// Finalizing detects and builds the app with the CNB buildpacks of every preceding supply phase.
/// Dependencies left behind by earlier V2 buildpacks are presented to the lifecycle builder as
/// layers of synthetic buildpacks. Afterwards the app and all layers are moved back to where the
/// V2 platform expects them.
pub struct Finalizer<'a> {
    /// The V2 app directory. A sentinel link while the app lives in the V3 workspace.
    pub app_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub deps_dir: PathBuf,
    /// Position of this buildpack in the chain.
    pub phase_index: usize,
    pub profile_dir: PathBuf,
    /// Directory the lifecycle binaries are installed into.
    pub lifecycle_dir: PathBuf,
    pub layout: PlatformLayout,
    pub stack: &'a Stack,
    pub manifest: &'a Manifest,
    pub installer: &'a dyn Installer,
    pub detector: &'a dyn Detect,
    pub runner: &'a dyn ProcessRunner,
    pub logger: &'a Logger,
}

impl Finalizer<'_> {
    pub fn finalize(&self) -> Result<(), FinalizeError> {
        self.reclaim_app()?;

        let order = merge_order_files(&self.layout.order_dir).map_err(FinalizeError::MergeOrders)?;
        write_toml_file(&order, self.layout.order_metadata()).map_err(FinalizeError::WriteOrder)?;

        if self.layout.group_metadata().exists() && self.layout.plan_metadata().exists() {
            self.logger
                .debug("Group and plan metadata exist, skipping detection");
        } else {
            self.detector.detect().map_err(FinalizeError::Detect)?;
        }

        self.include_legacy_buildpacks()
            .map_err(FinalizeError::IncludeLegacyBuildpacks)?;

        ensure_lifecycle(self.installer, &self.lifecycle_dir)
            .map_err(FinalizeError::InstallLifecycle)?;

        self.restore_layer_cache()
            .map_err(FinalizeError::RestoreCache)?;

        self.logger.begin_step("Running the CNB lifecycle builder");
        self.runner
            .run(&self.builder_invocation())
            .map_err(FinalizeError::Build)?;

        move_replacing(self.lifecycle_dir.join(LAUNCHER), self.layout.launcher_path())
            .map_err(FinalizeError::MoveLauncher)?;

        self.move_app_back().map_err(FinalizeError::MoveApp)?;

        self.move_layers_back().map_err(FinalizeError::MoveLayers)?;

        if let Err(error) = self.manifest.store_buildpack_metadata(&self.cache_dir) {
            self.logger
                .warning(format!("Could not store buildpack metadata: {error}"));
        }

        self.write_launch_script()
            .map_err(FinalizeError::WriteLaunchScript)
    }

    /// Makes sure the app is in the V3 workspace, with the sentinel link at the V2 app directory
    /// removed.
    ///
    /// A V2 app directory that is a real directory means an earlier attempt to finalize already
    /// moved the app back. It is moved into the V3 workspace again, unless that exists too.
    fn reclaim_app(&self) -> Result<(), FinalizeError> {
        match fs::symlink_metadata(&self.app_dir) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                remove_path(&self.app_dir).map_err(FinalizeError::RemoveLegacyApp)?;
            }
            Ok(_) if !self.layout.app_dir.exists() => {
                self.logger
                    .debug("App was already moved back, moving it to the v3 app directory again");
                move_replacing(&self.app_dir, &self.layout.app_dir)
                    .map_err(FinalizeError::MoveApp)?;
            }
            Ok(_) => {
                return Err(FinalizeError::LocateApp(format!(
                    "both {} and {} exist",
                    self.app_dir.display(),
                    self.layout.app_dir.display()
                )));
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(FinalizeError::RemoveLegacyApp(error)),
        }

        if self.layout.app_dir.is_dir() {
            Ok(())
        } else {
            Err(FinalizeError::LocateApp(format!(
                "{} does not exist",
                self.layout.app_dir.display()
            )))
        }
    }

    /// Turns the dependencies of every earlier V2 buildpack into a layer of a synthetic
    /// `buildpack.<index>` CNB buildpack that runs first.
    ///
    /// The group is written after every buildpack, and a layer that was already moved still gets
    /// its group entry, so that an interrupted run can be repeated.
    fn include_legacy_buildpacks(&self) -> Result<(), LayerMigrationError> {
        let own_deps = self.deps_dir.join(self.phase_index.to_string());
        remove_path(&own_deps).map_err(io_error(&own_deps))?;

        let group_path = self.layout.group_metadata();
        let mut group: GroupMetadata = read_toml_file(&group_path)?;

        for phase_index in (0..self.phase_index).rev() {
            let legacy_deps = self.deps_dir.join(phase_index.to_string());
            let buildpack_id = BuildpackId::legacy(phase_index);
            let buildpack_layers = self.layout.layers_dir.join(buildpack_id.as_str());
            let layer_dir = buildpack_layers.join(LEGACY_LAYER_NAME);

            if legacy_deps.is_dir() {
                self.logger.debug(format!(
                    "Including dependencies of buildpack {phase_index} as {buildpack_id}"
                ));
                move_replacing(&legacy_deps, &layer_dir).map_err(io_error(&legacy_deps))?;
            } else if !layer_dir.is_dir() {
                continue;
            }

            write_toml_file(
                &LayerMetadata::legacy(),
                buildpack_layers.join(format!("{LEGACY_LAYER_NAME}.toml")),
            )?;

            let env_dir = layer_dir.join("env");
            match fs::rename(&env_dir, layer_dir.join("env.build")) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => {
                    return Err(io_error(&env_dir)(error));
                }
                _ => {}
            }

            self.write_noop_buildpack(&buildpack_id)?;

            if !group.contains(&buildpack_id) {
                group.prepend(GroupBuildpack::new(buildpack_id));
                write_toml_file(&group, &group_path)?;
            }
        }

        Ok(())
    }

    fn write_noop_buildpack(&self, buildpack_id: &BuildpackId) -> Result<(), LayerMigrationError> {
        let buildpack_dir = self
            .layout
            .buildpacks_dir
            .join(buildpack_id.as_str())
            .join("latest");

        write_toml_file(
            &WrappedBuildpackDescriptor::new(buildpack_id.clone(), self.stack.id().clone()),
            buildpack_dir.join("buildpack.toml"),
        )?;

        let bin_dir = buildpack_dir.join("bin");
        fs::create_dir_all(&bin_dir).map_err(io_error(&bin_dir))?;

        let build_script = bin_dir.join("build");
        fs::write(&build_script, NOOP_BUILD_SCRIPT).map_err(io_error(&build_script))?;
        fs::set_permissions(&build_script, fs::Permissions::from_mode(0o777))
            .map_err(io_error(&build_script))
    }

    /// Moves the layers cached by the previous staging back into the layers directory.
    fn restore_layer_cache(&self) -> Result<(), LayerMigrationError> {
        let layer_cache = self.cache_dir.join(LAYER_CACHE_DIR_NAME);
        if !layer_cache.is_dir() {
            return Ok(());
        }

        merge_directory(&layer_cache, &self.layout.layers_dir).map_err(io_error(&layer_cache))
    }

    fn builder_invocation(&self) -> Invocation {
        Invocation::new(self.lifecycle_dir.join(BUILDER))
            .flag("-app", &self.layout.app_dir)
            .flag("-buildpacks", &self.layout.buildpacks_dir)
            .flag("-group", self.layout.group_metadata())
            .flag("-layers", &self.layout.layers_dir)
            .flag("-plan", self.layout.plan_metadata())
            .env(STACK_ID_ENV_VAR, self.stack.id().as_str())
    }

    fn move_app_back(&self) -> Result<(), io::Error> {
        move_replacing(&self.layout.app_dir, &self.app_dir)?;
        remove_path(workspace_marker_path(&self.app_dir))
    }

    /// Moves every buildpack's layers into the V2 dependencies directory, copying cacheable
    /// layers into the layer cache first. Layers that are not copied are gone from the cache.
    fn move_layers_back(&self) -> Result<(), LayerMigrationError> {
        let layers_dir = &self.layout.layers_dir;
        if !layers_dir.is_dir() {
            return Ok(());
        }

        for entry in sorted_entries(layers_dir)? {
            let Some(name) = entry.file_name().map(Path::new) else {
                continue;
            };
            let destination = self.deps_dir.join(name);

            if name == Path::new(CONFIG_LAYERS_DIR_NAME) {
                move_replacing(&entry, &destination).map_err(io_error(&entry))?;

                let launch_metadata = destination.join("metadata.toml");
                copy_file(&launch_metadata, launch_metadata_path(&self.app_dir))
                    .map_err(io_error(&launch_metadata))?;
                continue;
            }

            if entry.is_dir() {
                self.cache_layers(&entry, &self.cache_dir.join(LAYER_CACHE_DIR_NAME).join(name))?;
            }

            move_replacing(&entry, &destination).map_err(io_error(&entry))?;
        }

        Ok(())
    }

    fn cache_layers(
        &self,
        buildpack_layers: &Path,
        cache_dir: &Path,
    ) -> Result<(), LayerMigrationError> {
        for sidecar in sorted_entries(buildpack_layers)? {
            let Some(file_name) = sidecar.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(layer_name) = file_name.strip_suffix(".toml") else {
                continue;
            };
            if RESERVED_LAYERS_DIR_FILES.contains(&file_name) || !sidecar.is_file() {
                continue;
            }

            let metadata: LayerMetadata = read_toml_file(&sidecar)?;
            if !metadata.cache {
                continue;
            }

            self.logger
                .debug(format!("Caching layer {}", buildpack_layers.join(layer_name).display()));

            let layer_dir = buildpack_layers.join(layer_name);
            if layer_dir.is_dir() {
                copy_directory(&layer_dir, cache_dir.join(layer_name))
                    .map_err(io_error(&layer_dir))?;
            }
            copy_file(&sidecar, cache_dir.join(file_name)).map_err(io_error(&sidecar))?;
        }

        Ok(())
    }

    fn write_launch_script(&self) -> Result<(), io::Error> {
        fs::create_dir_all(&self.profile_dir)?;
        fs::write(
            self.profile_dir.join(LAUNCH_SCRIPT_NAME),
            launch_script(self.stack),
        )
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, LayerMigrationError> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(io_error(dir))?;

    entries.sort();
    Ok(entries)
}

/// Contents of the profile script that hands the start command to the launcher.
///
/// ```
/// use cnb_shim::finalizer::launch_script;
/// use cnb_shim::Stack;
///
/// let script = launch_script(&Stack::new("cflinuxfs3").unwrap());
/// assert!(script.starts_with(r#"export CNB_STACK_ID="org.cloudfoundry.stacks.cflinuxfs3""#));
/// assert!(script.ends_with("exec $HOME/.cloudfoundry/launcher \"$2\"\n"));
/// ```
#[must_use]
pub fn launch_script(stack: &Stack) -> String {
    format!(
        "export {STACK_ID_ENV_VAR}=\"{stack_id}\"\n\
         export CNB_LAYERS_DIR=\"$DEPS_DIR\"\n\
         export CNB_APP_DIR=\"$HOME\"\n\
         exec $HOME/.cloudfoundry/launcher \"$2\"\n",
        stack_id = stack.id()
    )
}
