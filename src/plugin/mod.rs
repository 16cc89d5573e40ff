pub mod installer;
pub mod manifest;
pub mod registry;
