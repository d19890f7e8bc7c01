//! Structured model over the `accurev` command-line client.
//!
//! [`source_control::SourceControl`] exposes streams and directories as a
//! [`tree::TreeNode`] hierarchy; [`issues::IssueTracker`] exposes AccuWork
//! issues through a name-to-field-id mapping resolved from the depot schema.
//! Both talk to accurev through [`client::AccuRev`] and parse its replies with
//! [`xml::Document`].

pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod issues;
pub mod path;
pub mod schema;
pub mod source_control;
pub mod tree;
pub mod xml;

pub use error::{AccuRevError, Result};
