#![doc = include_str!("../README.md")]

pub mod structured_file;

pub use structured_file::{
    read_toml_file, read_yaml_file, write_toml_file, write_yaml_file, StructuredFileError,
};
