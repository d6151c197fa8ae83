use std::path::{Path, PathBuf};

const CLOUDFOUNDRY_DIR_NAME: &str = ".cloudfoundry";

/// The fixed on-disk locations shared by the shim phases and the lifecycle binaries.
///
/// ```
/// use cnb_shim::PlatformLayout;
/// use std::path::Path;
///
/// let layout = PlatformLayout::default();
/// assert_eq!(layout.app_dir, Path::new("/home/vcap/app"));
/// assert_eq!(layout.group_metadata(), Path::new("/home/vcap/metadata/group.toml"));
///
/// let layout = PlatformLayout::rooted_at("/tmp/staging");
/// assert_eq!(layout.layers_dir, Path::new("/tmp/staging/home/vcap/deps"));
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlatformLayout {
    /// The V3 app workspace the app is moved into for the duration of staging.
    pub app_dir: PathBuf,
    /// The V3 layers directory the lifecycle builder writes to.
    pub layers_dir: PathBuf,
    /// Holds `order.toml`, `group.toml` and `plan.toml`.
    pub metadata_dir: PathBuf,
    /// Holds the `order.toml` of every supply phase that ran so far.
    pub order_dir: PathBuf,
    /// Installed CNB buildpacks, as `<id>/<version>`.
    pub buildpacks_dir: PathBuf,
}

impl Default for PlatformLayout {
    fn default() -> Self {
        Self::rooted_at("/")
    }
}

impl PlatformLayout {
    /// The standard layout below a different root directory.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let vcap_dir = root.as_ref().join("home").join("vcap");

        Self {
            app_dir: vcap_dir.join("app"),
            layers_dir: vcap_dir.join("deps"),
            metadata_dir: vcap_dir.join("metadata"),
            order_dir: vcap_dir.join("order"),
            buildpacks_dir: vcap_dir.join("cnbs"),
        }
    }

    #[must_use]
    pub fn order_metadata(&self) -> PathBuf {
        self.metadata_dir.join("order.toml")
    }

    #[must_use]
    pub fn group_metadata(&self) -> PathBuf {
        self.metadata_dir.join("group.toml")
    }

    #[must_use]
    pub fn plan_metadata(&self) -> PathBuf {
        self.metadata_dir.join("plan.toml")
    }

    /// Where the launcher binary lives in the V3 workspace. Once the workspace is moved back to
    /// the V2 app directory this is `$HOME/.cloudfoundry/launcher` at runtime.
    #[must_use]
    pub fn launcher_path(&self) -> PathBuf {
        self.app_dir.join(CLOUDFOUNDRY_DIR_NAME).join("launcher")
    }

    /// Marker written once the V2 app has been moved into the V3 workspace.
    #[must_use]
    pub fn workspace_marker(&self) -> PathBuf {
        workspace_marker_path(&self.app_dir)
    }
}

/// Location of the workspace marker inside an app directory.
pub fn workspace_marker_path(app_dir: impl AsRef<Path>) -> PathBuf {
    app_dir
        .as_ref()
        .join(CLOUDFOUNDRY_DIR_NAME)
        .join("sentinel")
}

/// Location of the lifecycle's launch metadata inside a V2 app directory, read by the release
/// phase.
pub fn launch_metadata_path(app_dir: impl AsRef<Path>) -> PathBuf {
    app_dir
        .as_ref()
        .join(CLOUDFOUNDRY_DIR_NAME)
        .join("metadata.toml")
}
