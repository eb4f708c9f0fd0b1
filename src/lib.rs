//! Catalog/awards reconciliation library - shared modules for all binaries.

pub mod dedup;
pub mod extract;
pub mod genre;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod star;
pub mod warehouse;
