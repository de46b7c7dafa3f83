//! Protocol surface for the urlgate redirect helper.
//!
//! This crate implements the synchronous line protocol spoken with the
//! calling proxy and the redirect-target construction around it.  Each
//! request line is parsed, handed to an injected [`Classifier`], and answered
//! with exactly one response line.
//!
//! # Architecture
//!
//! ```text
//! proxy --line--> [protocol loop] --Request--> Classifier
//!                       |                          |
//!                       |                    CategoryStore
//!                       |                          |
//! proxy <--line-- [redirect builder] <--verdict----+
//! ```
//!
//! The loop is strict lock-step: the proxy blocks waiting for one response
//! line per request line, so every response is flushed immediately.  There is
//! no internal parallelism; throughput is a deployment concern (run several
//! helper processes side by side).

pub mod oracle;
pub mod server;
pub mod template;

// Re-export the primary public types at the crate root for convenience.
pub use oracle::{is_literal_ip, GroupOracle};
pub use server::{run, Classifier, LoopOptions, ProtoError};
pub use template::{render_target, RedirectRule};
