pub mod actions;
pub mod compatibility;
pub mod config;
pub mod download;
pub mod plan;
pub mod repository;
pub mod version;
