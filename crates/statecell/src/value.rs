#![forbid(unsafe_code)]

//! Observable value cell with pre- and post-change hooks.
//!
//! # Design
//!
//! [`ObservableValue<T>`] keeps its state in shared, reference-counted
//! storage (`Rc<RefCell<..>>`); cloning a handle shares the value and its
//! hooks. A write runs two hook chains:
//!
//! ```text
//! set_value(v)
//!   on_change(&old, &mut candidate)   each hook may rewrite the candidate
//!   commit candidate
//!   after_change(&committed)          read-only
//! ```
//!
//! Hooks are invoked with no borrow held, so a hook may read or write the
//! same value. A write from inside a hook runs its own full cycle before the
//! outer one continues.
//!
//! # Invariants
//!
//! 1. `after_change` subscribers see the value produced by the whole
//!    `on_change` chain.
//! 2. Hooks run in registration order.
//! 3. `initialize` never fires hooks.
//! 4. `reset(false)` on a persistent value does nothing.
//!
//! # Failure Modes
//!
//! A panicking hook unwinds through `set_value`. Hooks later in the chain do
//! not run, and a panic in `on_change` leaves the old value in place.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use statecell_core::{AccessGuard, AccessOp, HookId, HookList, Roles};
use tracing::{debug, trace};

use crate::config::ValueConfig;
use crate::lifecycle::EditorMode;

type PreChange<T> = dyn Fn(&T, &mut T);
type PostChange<T> = dyn Fn(&T);

/// Selects one of a value's hook chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueHook {
    /// Pre-change chain, may rewrite the incoming value.
    OnChange,
    /// Post-change chain.
    AfterChange,
}

struct ValueInner<T> {
    name: String,
    description: Option<String>,
    initial: T,
    current: T,
    persistent: bool,
    visibility: Roles,
    guard: AccessGuard,
    on_change: HookList<PreChange<T>>,
    after_change: HookList<PostChange<T>>,
}

/// A shared, typed value with mutation hooks.
pub struct ObservableValue<T> {
    inner: Rc<RefCell<ValueInner<T>>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableValue")
            .field("name", &inner.name)
            .field("current", &inner.current)
            .field("initial", &inner.initial)
            .field("persistent", &inner.persistent)
            .field("on_change", &inner.on_change.len())
            .field("after_change", &inner.after_change.len())
            .finish()
    }
}

impl<T: Clone + 'static> ObservableValue<T> {
    /// Create a value whose current value starts at `config.initial`.
    #[must_use]
    pub fn new(config: ValueConfig<T>) -> Self {
        let ValueConfig {
            name,
            initial,
            persistent,
            visibility,
            description,
        } = config;
        Self {
            inner: Rc::new(RefCell::new(ValueInner {
                name,
                description,
                current: initial.clone(),
                initial,
                persistent,
                visibility,
                guard: AccessGuard::permissive(),
                on_change: HookList::new(),
                after_change: HookList::new(),
            })),
        }
    }

    /// Shorthand for a persistent, ungated value.
    #[must_use]
    pub fn with_initial(name: impl Into<String>, initial: T) -> Self {
        Self::new(ValueConfig::new(name, initial))
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.inner.borrow().description.clone()
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.inner.borrow().persistent
    }

    pub fn set_persistent(&self, persistent: bool) {
        self.inner.borrow_mut().persistent = persistent;
    }

    #[must_use]
    pub fn visibility(&self) -> Roles {
        self.inner.borrow().visibility
    }

    /// Install the access guard consulted before every get and set.
    pub fn set_guard(&self, guard: AccessGuard) {
        self.inner.borrow_mut().guard = guard;
    }

    /// The value restored by [`reset`](Self::reset) and
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn initial_value(&self) -> T {
        self.inner.borrow().initial.clone()
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> T {
        self.check_access(AccessOp::Get);
        self.inner.borrow().current.clone()
    }

    /// Borrow the current value without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.check_access(AccessOp::Get);
        f(&self.inner.borrow().current)
    }

    /// Write a value through both hook chains.
    pub fn set_value(&self, value: T) {
        self.check_access(AccessOp::Set);
        let (old, pre) = {
            let inner = self.inner.borrow();
            (inner.current.clone(), inner.on_change.snapshot())
        };

        let mut candidate = value;
        for hook in &pre {
            hook(&old, &mut candidate);
        }

        let post = {
            let mut inner = self.inner.borrow_mut();
            inner.current = candidate.clone();
            trace!(container = %inner.name, "value committed");
            inner.after_change.snapshot()
        };
        for hook in &post {
            hook(&candidate);
        }
    }

    /// Derive the next value from a copy of the current one, then write it
    /// through [`set_value`](Self::set_value).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.inner.borrow().current.clone();
        f(&mut next);
        self.set_value(next);
    }

    /// Restore the initial value and fire the post-change chain.
    ///
    /// A persistent value ignores the request unless `forced`.
    pub fn reset(&self, forced: bool) {
        let (value, post) = {
            let mut inner = self.inner.borrow_mut();
            if inner.persistent && !forced {
                return;
            }
            inner.current = inner.initial.clone();
            debug!(container = %inner.name, forced, "value reset");
            (inner.current.clone(), inner.after_change.snapshot())
        };
        for hook in &post {
            hook(&value);
        }
    }

    /// First-time setup: drop every hook, and restore the initial value of a
    /// non-persistent value without firing anything.
    pub fn initialize(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.on_change.clear();
        inner.after_change.clear();
        if !inner.persistent {
            inner.current = inner.initial.clone();
        }
        debug!(container = %inner.name, persistent = inner.persistent, "value initialized");
    }

    /// Authoring-time edit notification.
    ///
    /// While playing, re-announces the current value to post-change
    /// subscribers. While editing, a non-persistent value snaps back to its
    /// initial value silently.
    pub fn validate(&self, mode: EditorMode) {
        match mode {
            EditorMode::Playing => {
                let (value, post) = {
                    let inner = self.inner.borrow();
                    (inner.current.clone(), inner.after_change.snapshot())
                };
                for hook in &post {
                    hook(&value);
                }
            }
            EditorMode::Editing => {
                let mut inner = self.inner.borrow_mut();
                if !inner.persistent {
                    inner.current = inner.initial.clone();
                }
            }
        }
    }

    /// Register a pre-change hook. It receives the old value and the
    /// candidate, which it may overwrite.
    pub fn on_change(&self, hook: impl Fn(&T, &mut T) + 'static) -> HookId {
        self.inner.borrow_mut().on_change.push(Rc::new(hook))
    }

    /// Register a post-change hook.
    pub fn after_change(&self, hook: impl Fn(&T) + 'static) -> HookId {
        self.inner.borrow_mut().after_change.push(Rc::new(hook))
    }

    /// Remove one hook from the given chain.
    pub fn unsubscribe(&self, chain: ValueHook, id: HookId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match chain {
            ValueHook::OnChange => inner.on_change.remove(id),
            ValueHook::AfterChange => inner.after_change.remove(id),
        }
    }

    /// Number of hooks registered on the given chain.
    #[must_use]
    pub fn hook_count(&self, chain: ValueHook) -> usize {
        let inner = self.inner.borrow();
        match chain {
            ValueHook::OnChange => inner.on_change.len(),
            ValueHook::AfterChange => inner.after_change.len(),
        }
    }

    /// Drop every hook on both chains.
    pub fn clear_all_subscribers(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.on_change.clear();
        inner.after_change.clear();
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn check_access(&self, op: AccessOp) {
        let inner = self.inner.borrow();
        crate::report_access(&inner.guard, &inner.name, op, inner.visibility);
    }
}

impl ObservableValue<i64> {
    /// Add one.
    pub fn increment(&self) {
        self.modify(1);
    }

    /// Subtract one.
    pub fn decrement(&self) {
        self.modify(-1);
    }

    /// Add `delta` (wrapping on overflow) through the hook chains.
    pub fn modify(&self, delta: i64) {
        self.update(|v| *v = v.wrapping_add(delta));
    }
}
