#![forbid(unsafe_code)]

//! Observable state containers for sharing values between game objects.
//!
//! - [`ObservableValue`]: a typed cell whose writes pass through a
//!   rewriting pre-change chain and a read-only post-change chain.
//! - [`ObservableSet`]: an ordered, duplicate-free collection with the same
//!   hook pattern, plus subset and extension links that propagate additions
//!   and removals between sets.
//! - [`CountdownTimer`]: an integer value that counts down on host-driven
//!   ticks.
//! - [`Registry`]: the host-facing lifecycle driver (initialize, scene
//!   reset, validate).
//!
//! # Architecture
//!
//! Every container is an `Rc<RefCell<..>>` handle. Cloning a handle shares
//! state. Hook callbacks are cloned out of the container before they run, so
//! hooks may mutate the container that invoked them. Links between sets are
//! `Weak`, so no set keeps another alive.
//!
//! Everything is single-threaded and synchronous: a mutation, its hooks, and
//! any cascade into linked sets complete before the call returns.

pub mod config;
pub mod lifecycle;
pub mod set;
pub mod timer;
pub mod value;

pub use config::{SetConfig, TimerConfig, ValueConfig};
pub use lifecycle::{EditorMode, Lifecycle, Registry};
pub use set::{ObservableSet, SetHook};
pub use statecell_core::{
    AccessGuard, AccessOp, AccessRequest, AccessViolation, ConfigError, HookId, Roles, SetError,
};
pub use timer::CountdownTimer;
pub use value::{ObservableValue, ValueHook};

use tracing::warn;

/// Consult `guard` and log a refusal. The access proceeds either way.
pub(crate) fn report_access(guard: &AccessGuard, name: &str, op: AccessOp, visibility: Roles) {
    if guard.is_permissive() {
        return;
    }
    let request = AccessRequest {
        container: name,
        op,
        visibility,
    };
    if let Err(violation) = guard.check(&request) {
        warn!(container = name, %op, "access guard refused: {violation}");
    }
}
