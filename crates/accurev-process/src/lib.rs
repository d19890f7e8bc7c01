//! `accurev-process` — async driver for the `accurev` command-line client.
//!
//! Every AccuRev / AccuWork operation is a single invocation of the client
//! executable. This crate owns that boundary: building the argument vector,
//! spawning the child, draining its output and turning the exit status into
//! a typed result.
//!
//! # Architecture
//!
//! ```text
//! Invocation      ← command + argument vector (secrets flagged)
//!     │
//!     ▼
//! ToolRunner      ← resolves the executable, spawns `accurev <cmd> <args…>`
//!     │              stdout/stderr drained by background tasks
//!     ▼
//! Vec<u8>         ← raw stdout on exit 0, ProcessError otherwise
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use accurev_process::{Invocation, ToolRunner};
//!
//! let runner = ToolRunner::new("/opt/accurev/bin/accurev");
//! let xml = runner
//!     .run(&Invocation::new("show").args(["-fx", "streams"]))
//!     .await?;
//! ```

pub mod error;
pub mod invocation;

pub(crate) mod process;


pub use error::ProcessError;
pub use invocation::{quote_arg, Invocation, REDACTED};
pub use process::ToolRunner;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ProcessError>;
