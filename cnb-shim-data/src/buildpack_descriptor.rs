use crate::buildpack_id::BuildpackId;
use crate::stack_id::StackId;
use serde::{Deserialize, Serialize};

/// The `buildpack.toml` written for a legacy buildpack that is wrapped as a no-op CNB buildpack.
///
/// ```
/// use cnb_shim_data::buildpack_descriptor::WrappedBuildpackDescriptor;
/// use cnb_shim_data::buildpack_id::BuildpackId;
/// use cnb_shim_data::stack_id::StackId;
///
/// let descriptor = WrappedBuildpackDescriptor::new(
///     BuildpackId::legacy(0),
///     StackId::from_platform_stack("cflinuxfs3").unwrap(),
/// );
///
/// let serialized = toml::to_string(&descriptor).unwrap();
/// assert!(serialized.contains(r#"id = "org.cloudfoundry.stacks.cflinuxfs3""#));
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct WrappedBuildpackDescriptor {
    pub buildpack: WrappedBuildpack,
    pub stacks: Vec<WrappedStack>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct WrappedBuildpack {
    pub id: BuildpackId,
    pub name: String,
    pub version: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct WrappedStack {
    pub id: StackId,
}

impl WrappedBuildpackDescriptor {
    /// Describes the buildpack `id` with version `latest`, supporting only `stack_id`.
    #[must_use]
    pub fn new(id: BuildpackId, stack_id: StackId) -> Self {
        Self {
            buildpack: WrappedBuildpack {
                name: id.to_string(),
                id,
                version: String::from("latest"),
            },
            stacks: vec![WrappedStack { id: stack_id }],
        }
    }
}
