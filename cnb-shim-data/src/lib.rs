//! Low-level representations of the files exchanged with the CNB lifecycle.

pub mod buildpack_descriptor;
pub mod buildpack_id;
pub mod group;
pub mod launch;
pub mod layer_metadata;
pub mod order;
pub mod stack_id;

mod newtypes;
