//! Application services: content access, rendering and page assembly.

pub mod chrome;
pub mod content;
pub mod error;
pub mod image;
pub mod metadata;
pub mod queries;
pub mod render;
pub mod site;
