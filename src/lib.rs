//! assetref: asset reference extraction, resolution, and indexing for
//! source workspaces.
//!
//! The pipeline runs in stages: the [`matcher`] finds candidate reference
//! strings in text, the [`mappers`] chain turns each one into a concrete
//! candidate using the [`alias`] tables and workspace layout, the
//! [`materialize`] stage races candidates to a locally readable file, and
//! the [`index`] maintains the workspace-wide reverse map that answers
//! reference-count and unused-asset queries. [`position`] ties the stages
//! together for "what is under the cursor" lookups, with the [`cache`]
//! absorbing repeat queries.

pub mod alias;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod mappers;
pub mod matcher;
pub mod materialize;
pub mod meta;
pub mod position;
pub mod scanner;
pub mod types;
pub mod watch;
pub mod workspace;
