//! Core traits defined in `medrec-core` and implemented by other crates.

pub mod store;

pub use store::RecordPurger;
