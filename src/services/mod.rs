// src/services/mod.rs

//! External collaborators around the pipeline: the upstream catalog
//! client, change notifications, and tabular export.

mod catalog;
mod export;
mod notify;

pub use catalog::CatalogClient;
pub use export::Exporter;
pub use notify::Notifier;
