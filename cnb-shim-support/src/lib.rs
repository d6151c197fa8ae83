#![doc = include_str!("../README.md")]

pub mod archive;
pub mod digest;
pub mod download;
pub mod fs;
pub mod log;
pub mod manifest;
pub mod redact;
