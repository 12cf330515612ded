#![forbid(unsafe_code)]

//! Shared plumbing for statecell containers.
//!
//! - [`hooks`]: ordered callback lists with explicit unsubscribe and
//!   clear-all.
//! - [`access`]: host-supplied access guard and server/client role flags.
//! - [`error`]: configuration and structural error types.

pub mod access;
pub mod error;
pub mod hooks;

pub use access::{AccessGuard, AccessOp, AccessRequest, AccessViolation, Roles};
pub use error::{ConfigError, SetError};
pub use hooks::{HookId, HookList};
