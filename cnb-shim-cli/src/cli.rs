use clap::{Args, Parser, Subcommand};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

pub(crate) const BIN_NAME: &str = "cnb-shim";

#[derive(Parser)]
#[command(bin_name = BIN_NAME, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub phase: Phase,
}

#[derive(Subcommand)]
pub(crate) enum Phase {
    /// Runs CNB detection against the app
    Detect(DetectArgs),
    /// Moves the app into the V3 workspace and installs the CNB buildpacks of this buildpack
    Supply(SupplyArgs),
    /// Builds the app with the CNB lifecycle and restores the V2 layout
    Finalize(FinalizeArgs),
    /// Prints the process types of the built app
    Release(ReleaseArgs),
}

impl Phase {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Phase::Detect(_) => "detect",
            Phase::Supply(_) => "supply",
            Phase::Finalize(_) => "finalize",
            Phase::Release(_) => "release",
        }
    }
}

#[derive(Args)]
pub(crate) struct DetectArgs {
    pub app_dir: PathBuf,
}

#[derive(Args)]
pub(crate) struct SupplyArgs {
    pub app_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub deps_dir: PathBuf,
    /// Position of this buildpack in the buildpack chain
    pub index: usize,
}

#[derive(Args)]
pub(crate) struct FinalizeArgs {
    pub app_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub deps_dir: PathBuf,
    /// Position of this buildpack in the buildpack chain
    pub index: usize,
    pub profile_dir: PathBuf,
}

#[derive(Args)]
pub(crate) struct ReleaseArgs {
    pub app_dir: PathBuf,
}

/// Turns the arguments of an invocation through a phase link, such as `bin/supply`, into those
/// of the equivalent subcommand invocation. Other arguments are returned unchanged.
pub(crate) fn subcommand_args(mut args: Vec<OsString>) -> Vec<OsString> {
    let invoked_as = args
        .first()
        .map(Path::new)
        .and_then(Path::file_name)
        .and_then(OsStr::to_str)
        .map(String::from);

    if let Some(phase @ ("detect" | "supply" | "finalize" | "release")) = invoked_as.as_deref() {
        args[0] = OsString::from(phase);
        args.insert(0, OsString::from(BIN_NAME));
    }

    args
}
