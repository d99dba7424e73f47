//! Finds TaskRouter workers whose status has not changed for a configured
//! number of days, exports them for review, rewrites their attributes, then
//! removes them.
//!
//! The pipeline lives in [`sweep`]; the registry, export and prompt
//! collaborators sit behind the [`registry::RegistryClient`],
//! [`export::ExportSink`] and [`prompt::Confirm`] traits.

pub mod attributes;
pub mod config;
pub mod export;
#[cfg(feature = "cli")]
pub mod observability;
pub mod prompt;
pub mod registry;
pub mod sweep;

#[cfg(test)]
mod tests;
