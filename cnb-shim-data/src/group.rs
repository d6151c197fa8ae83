use crate::buildpack_id::BuildpackId;
use serde::{Deserialize, Serialize};

/// Data structure for `group.toml`: the group of buildpacks the lifecycle detector selected.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct GroupMetadata {
    #[serde(default)]
    pub buildpacks: Vec<GroupBuildpack>,
}

impl GroupMetadata {
    /// Inserts a buildpack in front of all existing entries, keeping their relative order.
    pub fn prepend(&mut self, buildpack: GroupBuildpack) {
        self.buildpacks.insert(0, buildpack);
    }

    #[must_use]
    pub fn contains(&self, id: &BuildpackId) -> bool {
        self.buildpacks.iter().any(|buildpack| &buildpack.id == id)
    }
}

/// A selected buildpack.
///
/// Keys this type doesn't know about (such as `api`) are kept in `extra` so that they survive a
/// read-modify-write cycle unchanged.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GroupBuildpack {
    pub id: BuildpackId,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl GroupBuildpack {
    #[must_use]
    pub fn new(id: BuildpackId) -> Self {
        Self {
            id,
            version: String::new(),
            extra: toml::Table::new(),
        }
    }
}
