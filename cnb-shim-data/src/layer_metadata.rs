use serde::{Deserialize, Serialize};

/// Contents of a per-layer `<layer>.toml` sidecar file.
///
/// The `cache` flag decides whether the layer is carried over to the next build.
///
/// ```
/// use cnb_shim_data::layer_metadata::LayerMetadata;
///
/// let metadata: LayerMetadata = toml::from_str(
///     r#"
///     launch = true
///     cache = true
///
///     [metadata]
///     extradata = "shamoo"
///     "#,
/// )
/// .unwrap();
///
/// assert!(metadata.launch);
/// assert!(!metadata.build);
/// assert!(metadata.cache);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct LayerMetadata {
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub launch: bool,
    #[serde(default)]
    pub cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<toml::Table>,
}

impl LayerMetadata {
    /// Metadata for a layer produced by a legacy buildpack: visible during build and launch,
    /// never cached.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            build: true,
            launch: true,
            cache: false,
            metadata: None,
        }
    }
}

/// Files inside a buildpack's layers directory that end in `.toml` but are not layer sidecars.
pub const RESERVED_LAYERS_DIR_FILES: [&str; 3] = ["launch.toml", "build.toml", "store.toml"];
