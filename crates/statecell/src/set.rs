#![forbid(unsafe_code)]

//! Observable ordered set with mutation hooks and linked sets.
//!
//! # Design
//!
//! [`ObservableSet<T>`] stores its contents as a `Vec<T>` with membership
//! decided by `PartialEq`. Every addition and removal runs a pre-hook chain
//! that may rewrite or veto the item, commits, runs a post-hook chain, and
//! then cascades into a linked set:
//!
//! ```text
//! add(x)     on_add(&mut Some(x)) .. commit .. after_add(&x) .. subset_of.add(x)
//! remove(x)  on_remove(&mut Some(x)) .. commit .. after_remove(&x) .. extension_of.remove(x)
//! ```
//!
//! A hook vetoes by setting the candidate to `None`.
//!
//! # Links
//!
//! A set may be a *subset of* one set and an *extension of* another. Besides
//! the direct cascades above, [`initialize`](ObservableSet::initialize)
//! wires listeners on the linked sets:
//!
//! - subset of `B`: each time `B` is cleared, forward `B`'s later removals
//!   into this set.
//! - extension of `D`: each time `D` is cleared, forward `D`'s later
//!   additions into this set.
//!
//! Clearing a set drops its post-add and post-remove hooks, then fires
//! `after_cleared`, so forwarding is re-established once per cycle of the
//! linked set and never stacks up.
//!
//! # Invariants
//!
//! 1. No two equal elements are ever in the contents.
//! 2. A set is never both subset and extension of the same set.
//! 3. A subset's superset is never an extension of it, and an extension's
//!    base is never a subset of it.
//! 4. Initial contents are the seed elements, then the base's contents (if
//!    an extension), then the superset's contents (if a subset that starts
//!    full), with duplicates collapsing on insertion.
//!
//! # Failure Modes
//!
//! - Invalid links fail [`initialize`](ObservableSet::initialize) with a
//!   [`ConfigError`]; nothing is wired.
//! - A link to a set that has been dropped is ignored during mutation and
//!   reported as [`ConfigError::MissingRelation`] on initialize.
//! - Hook panics unwind through the mutating call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rand::Rng;
use rand::seq::SliceRandom;
use statecell_core::{AccessGuard, AccessOp, ConfigError, HookId, HookList, Roles, SetError};
use tracing::{debug, trace};

use crate::config::SetConfig;
use crate::lifecycle::EditorMode;

type ItemHook<T> = dyn Fn(&mut Option<T>);
type ItemListener<T> = dyn Fn(&T);
type ClearedListener = dyn Fn();

type SharedSet<T> = Rc<RefCell<SetInner<T>>>;
type WeakSet<T> = Weak<RefCell<SetInner<T>>>;

/// Selects one of a set's hook chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetHook {
    /// Before an item is added; may rewrite or veto it.
    OnAdd,
    /// After an item is added.
    AfterAdd,
    /// Before an item is removed; may rewrite or veto it.
    OnRemove,
    /// After an item is removed.
    AfterRemove,
    /// After the set is cleared back to its initial contents.
    AfterCleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Subset,
    Extension,
}

/// Listener installed on a linked set by [`ObservableSet::initialize`].
struct Wiring<T> {
    target: WeakSet<T>,
    relation: Relation,
    cleared_hook: HookId,
    /// Current forwarding hook on the target's post-add or post-remove chain.
    forward_hook: Rc<Cell<Option<HookId>>>,
}

struct SetInner<T> {
    name: String,
    description: Option<String>,
    initial: Vec<T>,
    current: Vec<T>,
    subset_of: Option<WeakSet<T>>,
    extension_of: Option<WeakSet<T>>,
    start_full: bool,
    persistent: bool,
    visibility: Roles,
    guard: AccessGuard,
    on_add: HookList<ItemHook<T>>,
    after_add: HookList<ItemListener<T>>,
    on_remove: HookList<ItemHook<T>>,
    after_remove: HookList<ItemListener<T>>,
    after_cleared: HookList<ClearedListener>,
    wiring: Vec<Wiring<T>>,
}

/// A shared, ordered, duplicate-free collection with mutation hooks.
pub struct ObservableSet<T> {
    inner: SharedSet<T>,
}

impl<T> Clone for ObservableSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableSet")
            .field("name", &inner.name)
            .field("items", &inner.current)
            .field("persistent", &inner.persistent)
            .field("start_full", &inner.start_full)
            .field("subset", &inner.subset_of.is_some())
            .field("extension", &inner.extension_of.is_some())
            .finish()
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

impl<T: Clone + PartialEq + 'static> ObservableSet<T> {
    /// Create a set whose contents start as the deduplicated seed elements.
    ///
    /// Links are attached afterwards with
    /// [`set_subset_of`](Self::set_subset_of) and
    /// [`set_extension_of`](Self::set_extension_of), then wired by
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(config: SetConfig<T>) -> Self {
        let SetConfig {
            name,
            initial,
            persistent,
            start_full,
            visibility,
            description,
        } = config;
        let mut current = Vec::with_capacity(initial.len());
        for item in &initial {
            push_unique(&mut current, item.clone());
        }
        Self {
            inner: Rc::new(RefCell::new(SetInner {
                name,
                description,
                initial,
                current,
                subset_of: None,
                extension_of: None,
                start_full,
                persistent,
                visibility,
                guard: AccessGuard::permissive(),
                on_add: HookList::new(),
                after_add: HookList::new(),
                on_remove: HookList::new(),
                after_remove: HookList::new(),
                after_cleared: HookList::new(),
                wiring: Vec::new(),
            })),
        }
    }

    /// Shorthand for an empty, persistent, ungated set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(SetConfig::new(name))
    }

    fn from_inner(inner: SharedSet<T>) -> Self {
        Self { inner }
    }

    // -- Attributes --------------------------------------------------------

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
    pub fn starts_full(&self) -> bool {
        self.inner.borrow().start_full
    }

    #[must_use]
    pub fn visibility(&self) -> Roles {
        self.inner.borrow().visibility
    }

    /// Install the access guard consulted before every read or write.
    pub fn set_guard(&self, guard: AccessGuard) {
        self.inner.borrow_mut().guard = guard;
    }

    #[must_use]
    pub fn initial_items(&self) -> Vec<T> {
        self.inner.borrow().initial.clone()
    }

    /// Whether two handles share the same set.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -- Links -------------------------------------------------------------

    /// Make this set a subset of `superset`. Takes effect on the next
    /// [`initialize`](Self::initialize).
    pub fn set_subset_of(&self, superset: &ObservableSet<T>) {
        self.inner.borrow_mut().subset_of = Some(Rc::downgrade(&superset.inner));
    }

    /// Make this set an extension of `base`. Takes effect on the next
    /// [`initialize`](Self::initialize).
    pub fn set_extension_of(&self, base: &ObservableSet<T>) {
        self.inner.borrow_mut().extension_of = Some(Rc::downgrade(&base.inner));
    }

    /// The set this one is a subset of, if it is still alive.
    #[must_use]
    pub fn subset_of(&self) -> Option<ObservableSet<T>> {
        let inner = self.inner.borrow();
        inner
            .subset_of
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Self::from_inner)
    }

    /// The set this one is an extension of, if it is still alive.
    #[must_use]
    pub fn extension_of(&self) -> Option<ObservableSet<T>> {
        let inner = self.inner.borrow();
        inner
            .extension_of
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Self::from_inner)
    }

    // -- Reads -------------------------------------------------------------

    /// Snapshot of the contents, in order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.check_access(AccessOp::Get);
        self.inner.borrow().current.clone()
    }

    /// Borrow the contents without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this same set.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.check_access(AccessOp::Get);
        f(&self.inner.borrow().current)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.check_access(AccessOp::Get);
        self.inner.borrow().current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.check_access(AccessOp::Get);
        self.inner.borrow().current.get(index).cloned()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.check_access(AccessOp::Get);
        self.inner.borrow().current.contains(item)
    }

    // -- Mutation ----------------------------------------------------------

    /// Add `item` unless an equal element is already present.
    ///
    /// Pre-add hooks may rewrite the item or veto it by setting `None`. After
    /// the post-add hooks, the committed item is also added to the set this
    /// one is a subset of.
    pub fn add(&self, item: T) {
        self.check_access(AccessOp::Set);
        let pre = {
            let inner = self.inner.borrow();
            if inner.current.contains(&item) {
                return;
            }
            inner.on_add.snapshot()
        };

        let mut candidate = Some(item);
        for hook in &pre {
            hook(&mut candidate);
        }
        let Some(item) = candidate else {
            trace!(container = %self.inner.borrow().name, "add vetoed");
            return;
        };

        let post = {
            let mut inner = self.inner.borrow_mut();
            // A rewritten item may collide with an existing element.
            if inner.current.contains(&item) {
                return;
            }
            inner.current.push(item.clone());
            trace!(container = %inner.name, len = inner.current.len(), "item added");
            inner.after_add.snapshot()
        };
        for hook in &post {
            hook(&item);
        }

        let superset = self.inner.borrow().subset_of.as_ref().and_then(Weak::upgrade);
        if let Some(superset) = superset {
            Self::from_inner(superset).add(item);
        }
    }

    /// Remove `item` if present.
    ///
    /// Pre-remove hooks may rewrite the item or veto it by setting `None`; a
    /// rewritten item that is not in the set is not removed. After the
    /// post-remove hooks, the committed item is also removed from the set this
    /// one is an extension of.
    pub fn remove(&self, item: T) {
        self.check_access(AccessOp::Set);
        let pre = {
            let inner = self.inner.borrow();
            if !inner.current.contains(&item) {
                return;
            }
            inner.on_remove.snapshot()
        };

        let mut candidate = Some(item);
        for hook in &pre {
            hook(&mut candidate);
        }
        let Some(item) = candidate else {
            trace!(container = %self.inner.borrow().name, "remove vetoed");
            return;
        };

        let post = {
            let mut inner = self.inner.borrow_mut();
            let Some(pos) = inner.current.iter().position(|x| *x == item) else {
                return;
            };
            inner.current.remove(pos);
            trace!(container = %inner.name, len = inner.current.len(), "item removed");
            inner.after_remove.snapshot()
        };
        for hook in &post {
            hook(&item);
        }

        let base = self.inner.borrow().extension_of.as_ref().and_then(Weak::upgrade);
        if let Some(base) = base {
            Self::from_inner(base).remove(item);
        }
    }

    /// Remove and return the element at `index`. No hooks, no cascade.
    pub fn remove_at(&self, index: usize) -> Result<T, SetError> {
        self.check_access(AccessOp::Set);
        let mut inner = self.inner.borrow_mut();
        let len = inner.current.len();
        if index >= len {
            return Err(SetError::IndexOutOfRange { index, len });
        }
        Ok(inner.current.remove(index))
    }

    /// Replace the contents wholesale. No per-item hooks run; replacing with
    /// an empty collection fires `after_cleared`.
    pub fn set_items(&self, items: impl IntoIterator<Item = T>) {
        self.check_access(AccessOp::Set);
        let cleared = {
            let mut inner = self.inner.borrow_mut();
            let mut next = Vec::new();
            for item in items {
                push_unique(&mut next, item);
            }
            inner.current = next;
            if !inner.current.is_empty() {
                return;
            }
            inner.after_cleared.snapshot()
        };
        for hook in &cleared {
            hook();
        }
    }

    /// Uniformly permute the contents in place.
    pub fn shuffle(&self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Uniformly permute the contents using `rng`.
    pub fn shuffle_with<R: Rng + ?Sized>(&self, rng: &mut R) {
        self.check_access(AccessOp::Set);
        self.inner.borrow_mut().current.shuffle(rng);
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Reset to the initial contents, drop all post-add and post-remove
    /// hooks, then fire `after_cleared`. Persistent sets ignore this.
    pub fn clear_to_initial(&self) {
        if self.inner.borrow().persistent {
            return;
        }
        let items = self.compose_initial();
        let cleared = {
            let mut inner = self.inner.borrow_mut();
            inner.current = items;
            inner.after_add.clear();
            inner.after_remove.clear();
            debug!(container = %inner.name, len = inner.current.len(), "set cleared to initial");
            inner.after_cleared.snapshot()
        };
        for hook in &cleared {
            hook();
        }
    }

    /// Compose the initial contents, check links, and wire forwarding into
    /// linked sets. Calling it again replaces the earlier wiring.
    pub fn initialize(&self) -> Result<(), ConfigError> {
        let items = self.compose_initial();
        self.inner.borrow_mut().current = items;
        self.check_links()?;
        self.unwire();

        let (subset_of, extension_of) = {
            let inner = self.inner.borrow();
            (
                inner.subset_of.as_ref().and_then(Weak::upgrade),
                inner.extension_of.as_ref().and_then(Weak::upgrade),
            )
        };
        if let Some(superset) = subset_of {
            let wiring = self.wire(&superset, Relation::Subset);
            self.inner.borrow_mut().wiring.push(wiring);
        }
        if let Some(base) = extension_of {
            let wiring = self.wire(&base, Relation::Extension);
            self.inner.borrow_mut().wiring.push(wiring);
        }

        let inner = self.inner.borrow();
        debug!(
            container = %inner.name,
            len = inner.current.len(),
            links = inner.wiring.len(),
            "set initialized"
        );
        Ok(())
    }

    /// Authoring-time edit notification. While playing, the contents are
    /// recomposed from the initial rule without firing hooks.
    pub fn validate(&self, mode: EditorMode) {
        if mode == EditorMode::Playing {
            let items = self.compose_initial();
            self.inner.borrow_mut().current = items;
        }
    }

    // -- Hooks -------------------------------------------------------------

    /// Register a pre-add hook.
    pub fn on_add(&self, hook: impl Fn(&mut Option<T>) + 'static) -> HookId {
        self.inner.borrow_mut().on_add.push(Rc::new(hook))
    }

    /// Register a post-add hook.
    pub fn after_add(&self, hook: impl Fn(&T) + 'static) -> HookId {
        self.inner.borrow_mut().after_add.push(Rc::new(hook))
    }

    /// Register a pre-remove hook.
    pub fn on_remove(&self, hook: impl Fn(&mut Option<T>) + 'static) -> HookId {
        self.inner.borrow_mut().on_remove.push(Rc::new(hook))
    }

    /// Register a post-remove hook.
    pub fn after_remove(&self, hook: impl Fn(&T) + 'static) -> HookId {
        self.inner.borrow_mut().after_remove.push(Rc::new(hook))
    }

    /// Register a hook fired after the set is cleared.
    pub fn after_cleared(&self, hook: impl Fn() + 'static) -> HookId {
        self.inner.borrow_mut().after_cleared.push(Rc::new(hook))
    }

    /// Remove one hook from the given chain.
    pub fn unsubscribe(&self, chain: SetHook, id: HookId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match chain {
            SetHook::OnAdd => inner.on_add.remove(id),
            SetHook::AfterAdd => inner.after_add.remove(id),
            SetHook::OnRemove => inner.on_remove.remove(id),
            SetHook::AfterRemove => inner.after_remove.remove(id),
            SetHook::AfterCleared => inner.after_cleared.remove(id),
        }
    }

    #[must_use]
    pub fn hook_count(&self, chain: SetHook) -> usize {
        let inner = self.inner.borrow();
        match chain {
            SetHook::OnAdd => inner.on_add.len(),
            SetHook::AfterAdd => inner.after_add.len(),
            SetHook::OnRemove => inner.on_remove.len(),
            SetHook::AfterRemove => inner.after_remove.len(),
            SetHook::AfterCleared => inner.after_cleared.len(),
        }
    }

    /// Drop every hook on every chain, including listeners other sets wired
    /// here.
    pub fn clear_all_subscribers(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.on_add.clear();
        inner.after_add.clear();
        inner.on_remove.clear();
        inner.after_remove.clear();
        inner.after_cleared.clear();
    }

    // -- Internals ---------------------------------------------------------

    fn check_access(&self, op: AccessOp) {
        let inner = self.inner.borrow();
        crate::report_access(&inner.guard, &inner.name, op, inner.visibility);
    }

    fn compose_initial(&self) -> Vec<T> {
        let (seed, base, superset) = {
            let inner = self.inner.borrow();
            let superset = if inner.start_full {
                inner.subset_of.as_ref().and_then(Weak::upgrade)
            } else {
                None
            };
            (
                inner.initial.clone(),
                inner.extension_of.as_ref().and_then(Weak::upgrade),
                superset,
            )
        };

        let mut items = Vec::with_capacity(seed.len());
        for item in seed {
            push_unique(&mut items, item);
        }
        for other in [base, superset].into_iter().flatten() {
            let other = other.borrow();
            for item in &other.current {
                push_unique(&mut items, item.clone());
            }
        }
        items
    }

    fn check_links(&self) -> Result<(), ConfigError> {
        let inner = self.inner.borrow();
        let me = Rc::downgrade(&self.inner);
        let name = inner.name.clone();

        if let (Some(sup), Some(base)) = (&inner.subset_of, &inner.extension_of) {
            if Weak::ptr_eq(sup, base) {
                let other = match sup.upgrade() {
                    Some(other) => other.borrow().name.clone(),
                    None => String::new(),
                };
                return Err(ConfigError::SubsetAndExtensionOfSame { set: name, other });
            }
        }

        if let Some(sup) = &inner.subset_of {
            let sup = sup.upgrade().ok_or_else(|| ConfigError::MissingRelation {
                set: name.clone(),
                relation: "superset",
            })?;
            let sup = sup.borrow();
            if sup.extension_of.as_ref().is_some_and(|w| Weak::ptr_eq(w, &me)) {
                return Err(ConfigError::SubsetOfExtension {
                    set: name,
                    superset: sup.name.clone(),
                });
            }
        }

        if let Some(base) = &inner.extension_of {
            let base = base.upgrade().ok_or_else(|| ConfigError::MissingRelation {
                set: name.clone(),
                relation: "base",
            })?;
            let base = base.borrow();
            if base.subset_of.as_ref().is_some_and(|w| Weak::ptr_eq(w, &me)) {
                return Err(ConfigError::ExtensionOfSubset {
                    set: name,
                    base: base.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Install a cleared-listener on `target` that (re)subscribes a single
    /// forwarding hook into this set.
    fn wire(&self, target: &SharedSet<T>, relation: Relation) -> Wiring<T> {
        let me = Rc::downgrade(&self.inner);
        let target_weak = Rc::downgrade(target);
        let forward_hook: Rc<Cell<Option<HookId>>> = Rc::new(Cell::new(None));

        let slot = Rc::clone(&forward_hook);
        let listener_target = target_weak.clone();
        let on_cleared = move || {
            let Some(target) = listener_target.upgrade() else {
                return;
            };
            let me = me.clone();
            let mut target = target.borrow_mut();
            match relation {
                Relation::Subset => {
                    if let Some(old) = slot.take() {
                        target.after_remove.remove(old);
                    }
                    let id = target.after_remove.push(Rc::new(move |item: &T| {
                        if let Some(inner) = me.upgrade() {
                            ObservableSet::from_inner(inner).remove(item.clone());
                        }
                    }));
                    slot.set(Some(id));
                }
                Relation::Extension => {
                    if let Some(old) = slot.take() {
                        target.after_add.remove(old);
                    }
                    let id = target.after_add.push(Rc::new(move |item: &T| {
                        if let Some(inner) = me.upgrade() {
                            ObservableSet::from_inner(inner).add(item.clone());
                        }
                    }));
                    slot.set(Some(id));
                }
            }
        };
        let cleared_hook = target.borrow_mut().after_cleared.push(Rc::new(on_cleared));

        debug!(
            container = %self.inner.borrow().name,
            target = %target.borrow().name,
            ?relation,
            "link wired"
        );
        Wiring {
            target: target_weak,
            relation,
            cleared_hook,
            forward_hook,
        }
    }

    /// Remove every listener an earlier `initialize` installed on linked sets.
    fn unwire(&self) {
        let wiring = std::mem::take(&mut self.inner.borrow_mut().wiring);
        for wiring in wiring {
            let Some(target) = wiring.target.upgrade() else {
                continue;
            };
            let mut target = target.borrow_mut();
            target.after_cleared.remove(wiring.cleared_hook);
            if let Some(id) = wiring.forward_hook.take() {
                match wiring.relation {
                    Relation::Subset => target.after_remove.remove(id),
                    Relation::Extension => target.after_add.remove(id),
                };
            }
        }
    }
}
