//! Module catalog and version resolution
//!
//! This module provides:
//! - The catalog client for the composer repository that hosts the modules
//! - Selection of the latest purely numeric release per module

pub mod catalog;
pub mod resolver;

pub use catalog::{CatalogClient, ModuleCatalog, VersionRecord};
pub use resolver::{resolve, ResolvedModuleSet};
