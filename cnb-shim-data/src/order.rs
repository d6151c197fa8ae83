use crate::buildpack_id::BuildpackId;
use serde::{Deserialize, Serialize};

/// Data structure for `order.toml`: the detection search space handed to the lifecycle detector.
///
/// ```
/// use cnb_shim_data::order::Order;
/// use indoc::indoc;
///
/// let order: Order = toml::from_str(indoc! {r#"
///     [[groups]]
///     labels = ["nodejs"]
///
///     [[groups.buildpacks]]
///     id = "org.cloudfoundry.node-engine"
///     version = "latest"
///
///     [[groups.buildpacks]]
///     id = "org.cloudfoundry.npm"
///     version = "latest"
///     optional = true
/// "#})
/// .unwrap();
///
/// assert_eq!(order.groups.len(), 1);
/// assert!(order.groups[0].buildpacks[1].optional);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct Order {
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Order {
    /// Every buildpack ID referenced by any group, in order of first appearance and without
    /// duplicates.
    pub fn buildpack_ids(&self) -> Vec<&BuildpackId> {
        let mut ids: Vec<&BuildpackId> = Vec::new();

        for buildpack in self.groups.iter().flat_map(|group| &group.buildpacks) {
            if !ids.contains(&&buildpack.id) {
                ids.push(&buildpack.id);
            }
        }

        ids
    }
}

/// One candidate combination of buildpacks.
///
/// `labels` records which order file(s) contributed to the group.
#[derive(Deserialize, Serialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct Group {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub buildpacks: Vec<BuildpackRef>,
}

/// A reference to a buildpack from inside a [`Group`].
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
pub struct BuildpackRef {
    pub id: BuildpackId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "latest_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl BuildpackRef {
    /// A required reference to the `latest` version of the given buildpack.
    #[must_use]
    pub fn required(id: BuildpackId) -> Self {
        Self {
            id,
            name: None,
            version: latest_version(),
            optional: false,
        }
    }

    /// An optional reference to the `latest` version of the given buildpack.
    #[must_use]
    pub fn optional(id: BuildpackId) -> Self {
        Self {
            optional: true,
            ..Self::required(id)
        }
    }
}

fn latest_version() -> String {
    String::from("latest")
}
