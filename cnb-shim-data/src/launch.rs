use serde::{Deserialize, Serialize};

/// The parts of the lifecycle's `config/metadata.toml` that the release phase reports back to the
/// platform.
///
/// ```
/// use cnb_shim_data::launch::LaunchMetadata;
///
/// let metadata: LaunchMetadata = toml::from_str(
///     r#"
///     buildpacks = ["some.buildpacks", "some.other.buildpack"]
///
///     [[processes]]
///     type = "web"
///     command = "npm start"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(metadata.processes[0].r#type, "web");
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct LaunchMetadata {
    #[serde(default)]
    pub processes: Vec<Process>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct Process {
    pub r#type: String,
    pub command: String,
}
