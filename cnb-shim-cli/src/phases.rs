use crate::cli::{DetectArgs, FinalizeArgs, Phase, ReleaseArgs, SupplyArgs};
use cnb_shim::support::fs::remove_path;
use cnb_shim::support::log::Logger;
use cnb_shim::support::manifest::{Manifest, ManifestError};
use cnb_shim::{
    DefaultDetector, Detect, DetectError, FinalizeError, Finalizer, ManifestInstaller,
    PlatformLayout, ReleaseError, Releaser, Stack, StackError, SupplyError, Supplier,
    SystemProcessRunner,
};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ORDER_FILE_NAME: &str = "order.toml";

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("Could not determine the buildpack directory from the executable path {0}")]
    BuildpackDir(String),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Could not create a directory for the lifecycle: {0}")]
    LifecycleDir(#[source] io::Error),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Supply(#[from] SupplyError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("Could not remove {0}: {1}")]
    Cleanup(String, #[source] io::Error),
}

pub(crate) fn run(phase: &Phase, invoked_as: &Path, logger: &Logger) -> Result<(), Error> {
    match phase {
        Phase::Detect(args) => detect(args, &buildpack_dir(invoked_as)?, logger),
        Phase::Supply(args) => supply(args, &buildpack_dir(invoked_as)?, logger),
        Phase::Finalize(args) => finalize(args, &buildpack_dir(invoked_as)?, logger),
        Phase::Release(args) => release(args),
    }
}

/// The platform installs buildpack executables as `<buildpack>/bin/<phase>`.
fn buildpack_dir(invoked_as: &Path) -> Result<PathBuf, Error> {
    invoked_as
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::BuildpackDir(invoked_as.to_string_lossy().into_owned()))
}

fn lifecycle_dir() -> Result<TempDir, Error> {
    tempfile::Builder::new()
        .prefix("lifecycle")
        .tempdir()
        .map_err(Error::LifecycleDir)
}

fn detect(args: &DetectArgs, buildpack_dir: &Path, logger: &Logger) -> Result<(), Error> {
    let layout = PlatformLayout::default();
    let stack = Stack::from_env()?;
    let manifest = Manifest::load(buildpack_dir)?;
    let installer = ManifestInstaller::new(&manifest, logger);
    let lifecycle_dir = lifecycle_dir()?;

    DefaultDetector::new(
        &layout,
        lifecycle_dir.path(),
        &stack,
        &installer,
        &SystemProcessRunner,
        logger,
    )
    .with_app_dir(&args.app_dir)
    .with_order(buildpack_dir.join(ORDER_FILE_NAME))
    .detect()?;

    Ok(())
}

fn supply(args: &SupplyArgs, buildpack_dir: &Path, logger: &Logger) -> Result<(), Error> {
    let stack = Stack::from_env()?;
    let manifest = Manifest::load(buildpack_dir)?;
    let installer = ManifestInstaller::new(&manifest, logger);

    Supplier {
        app_dir: args.app_dir.clone(),
        deps_dir: args.deps_dir.clone(),
        phase_index: args.index,
        buildpack_dir: buildpack_dir.to_path_buf(),
        layout: PlatformLayout::default(),
        stack: &stack,
        manifest: &manifest,
        installer: &installer,
        logger,
    }
    .supply()?;

    Ok(())
}

fn finalize(args: &FinalizeArgs, buildpack_dir: &Path, logger: &Logger) -> Result<(), Error> {
    let layout = PlatformLayout::default();
    let stack = Stack::from_env()?;
    let manifest = Manifest::load(buildpack_dir)?;
    let installer = ManifestInstaller::new(&manifest, logger);
    let lifecycle_dir = lifecycle_dir()?;
    let detector = DefaultDetector::new(
        &layout,
        lifecycle_dir.path(),
        &stack,
        &installer,
        &SystemProcessRunner,
        logger,
    );

    Finalizer {
        app_dir: args.app_dir.clone(),
        cache_dir: args.cache_dir.clone(),
        deps_dir: args.deps_dir.clone(),
        phase_index: args.index,
        profile_dir: args.profile_dir.clone(),
        lifecycle_dir: lifecycle_dir.path().to_path_buf(),
        layout: layout.clone(),
        stack: &stack,
        manifest: &manifest,
        installer: &installer,
        detector: &detector,
        runner: &SystemProcessRunner,
        logger,
    }
    .finalize()?;

    // Staging state that must not end up in the droplet. Kept when finalizing fails, so that
    // a retry can pick it up.
    for dir in [&layout.order_dir, &layout.buildpacks_dir, &layout.metadata_dir] {
        remove_path(dir)
            .map_err(|error| Error::Cleanup(dir.to_string_lossy().into_owned(), error))?;
    }

    Ok(())
}

fn release(args: &ReleaseArgs) -> Result<(), Error> {
    Releaser {
        app_dir: args.app_dir.clone(),
    }
    .release(io::stdout().lock())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buildpack_dir_is_two_levels_above_the_executable() {
        assert_eq!(
            buildpack_dir(Path::new("/tmp/buildpacks/0123/bin/finalize")).unwrap(),
            PathBuf::from("/tmp/buildpacks/0123")
        );
    }

    #[test]
    fn bare_executable_names_have_no_buildpack_dir() {
        assert!(matches!(
            buildpack_dir(Path::new("cnb-shim")),
            Err(Error::BuildpackDir(_))
        ));
    }
}
