//! Command implementations for the xref CLI.
//!
//! - [`bundle`] - bundle a document into a single file

pub mod bundle;

pub use bundle::execute as bundle_execute;
