use crate::installer::{ensure_lifecycle, InstallError, Installer, DETECTOR};
use crate::layout::PlatformLayout;
use crate::process::{Invocation, ProcessError, ProcessRunner};
use crate::stack::{Stack, STACK_ID_ENV_VAR};
use cnb_shim_support::log::Logger;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Runs CNB detection and reports where the resulting metadata was written.
pub trait Detect {
    fn detect(&self) -> Result<DetectOutput, DetectError>;
}

/// Locations of the metadata files written by the lifecycle detector.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DetectOutput {
    pub group: PathBuf,
    pub plan: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("failed to install buildpacks for detection: {0}")]
    InstallBuildpacks(#[source] InstallError),

    #[error("failed to install v3 lifecycle detector: {0}")]
    InstallLifecycle(#[source] InstallError),

    #[error("failed to create metadata directory {0}: {1}")]
    MetadataDir(String, #[source] io::Error),

    #[error("failed to run v3 lifecycle detector: {0}")]
    Detector(#[source] ProcessError),
}

/// Detection with the lifecycle `detector` binary.
///
/// Before the detector runs, every buildpack referenced by the order is installed and the
/// lifecycle is installed unless it already is.
pub struct DefaultDetector<'a> {
    app_dir: PathBuf,
    lifecycle_dir: PathBuf,
    buildpacks_dir: PathBuf,
    order_metadata: PathBuf,
    group_metadata: PathBuf,
    plan_metadata: PathBuf,
    stack: &'a Stack,
    installer: &'a dyn Installer,
    runner: &'a dyn ProcessRunner,
    logger: &'a Logger,
}

impl<'a> DefaultDetector<'a> {
    /// A detector for the V3 workspace of `layout`, using the merged order in its metadata
    /// directory.
    pub fn new(
        layout: &PlatformLayout,
        lifecycle_dir: impl Into<PathBuf>,
        stack: &'a Stack,
        installer: &'a dyn Installer,
        runner: &'a dyn ProcessRunner,
        logger: &'a Logger,
    ) -> Self {
        Self {
            app_dir: layout.app_dir.clone(),
            lifecycle_dir: lifecycle_dir.into(),
            buildpacks_dir: layout.buildpacks_dir.clone(),
            order_metadata: layout.order_metadata(),
            group_metadata: layout.group_metadata(),
            plan_metadata: layout.plan_metadata(),
            stack,
            installer,
            runner,
            logger,
        }
    }

    /// Detects against a different app directory, such as the V2 app directory during the
    /// `detect` phase.
    #[must_use]
    pub fn with_app_dir(mut self, app_dir: impl Into<PathBuf>) -> Self {
        self.app_dir = app_dir.into();
        self
    }

    /// Detects against a different order file, such as the `order.toml` shipped with a buildpack.
    #[must_use]
    pub fn with_order(mut self, order_metadata: impl Into<PathBuf>) -> Self {
        self.order_metadata = order_metadata.into();
        self
    }

    fn detector_invocation(&self) -> Invocation {
        Invocation::new(self.lifecycle_dir.join(DETECTOR))
            .flag("-app", &self.app_dir)
            .flag("-buildpacks", &self.buildpacks_dir)
            .flag("-order", &self.order_metadata)
            .flag("-group", &self.group_metadata)
            .flag("-plan", &self.plan_metadata)
            .env(STACK_ID_ENV_VAR, self.stack.id().as_str())
    }
}

impl Detect for DefaultDetector<'_> {
    fn detect(&self) -> Result<DetectOutput, DetectError> {
        self.installer
            .install_buildpacks(&self.order_metadata, &self.buildpacks_dir)
            .map_err(DetectError::InstallBuildpacks)?;

        ensure_lifecycle(self.installer, &self.lifecycle_dir)
            .map_err(DetectError::InstallLifecycle)?;

        for metadata_file in [&self.group_metadata, &self.plan_metadata] {
            if let Some(metadata_dir) = metadata_file.parent() {
                create_metadata_dir(metadata_dir)?;
            }
        }

        let invocation = self.detector_invocation();
        self.logger.debug(format!("Running {invocation}"));
        self.runner
            .run(&invocation)
            .map_err(DetectError::Detector)?;

        Ok(DetectOutput {
            group: self.group_metadata.clone(),
            plan: self.plan_metadata.clone(),
        })
    }
}

fn create_metadata_dir(path: &Path) -> Result<(), DetectError> {
    fs::create_dir_all(path)
        .map_err(|error| DetectError::MetadataDir(path.to_string_lossy().into_owned(), error))
}
