#![doc = include_str!("../README.md")]
// This lint triggers when both layer_dir and layers_dir are present which are quite common.
#![allow(clippy::similar_names)]

pub mod detector;
pub mod finalizer;
pub mod installer;
pub mod layout;
pub mod order_merge;
pub mod process;
pub mod releaser;
pub mod stack;
pub mod supplier;

#[doc(inline)]
pub use cnb_shim_data as data;
#[doc(inline)]
pub use cnb_shim_support as support;

pub use detector::{DefaultDetector, Detect, DetectError, DetectOutput};
pub use finalizer::{FinalizeError, Finalizer, LayerMigrationError};
pub use installer::{InstallError, Installer, ManifestInstaller};
pub use layout::PlatformLayout;
pub use order_merge::OrderMergeError;
pub use process::{Invocation, ProcessError, ProcessRunner, SystemProcessRunner};
pub use releaser::{ReleaseError, Releaser};
pub use stack::{Stack, StackError};
pub use supplier::{SupplyError, Supplier};
