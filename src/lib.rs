// Library interface for rust_manga_sources
// The binary and the integration tests use the sources through this crate

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod network;
pub mod pages;
pub mod sources;
pub mod vrf;
