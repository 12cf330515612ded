#![forbid(unsafe_code)]

//! Ordered callback lists.
//!
//! A [`HookList`] stores strong `Rc` callbacks in registration order. The
//! owning container holds the list inside its `RefCell`, takes a
//! [`snapshot`](HookList::snapshot) under a short borrow, releases the borrow,
//! and then invokes the callbacks. Callbacks may therefore mutate the owning
//! container (or register further hooks) without tripping `RefCell` borrow
//! rules. Hooks registered during an invocation take effect on the next one.
//!
//! Unlike RAII subscriptions, entries live until they are removed by id or the
//! whole list is cleared. Containers rely on this: a forwarding hook must stay
//! alive with no guard held anywhere.
//!
//! # Invariants
//!
//! 1. Snapshots list callbacks in registration order.
//! 2. Every [`HookId`] handed out by a list is unique within that list.
//! 3. `remove` of an unknown or already-removed id is a no-op returning `false`.

use std::fmt;
use std::rc::Rc;

/// Handle identifying a registered hook within one [`HookList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

impl HookId {
    /// Raw numeric id. Only meaningful relative to the list that issued it.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

/// Registration-ordered list of callbacks of type `F` (usually `dyn Fn(..)`).
pub struct HookList<F: ?Sized> {
    next_id: u64,
    entries: Vec<(HookId, Rc<F>)>,
}

impl<F: ?Sized> Default for HookList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for HookList<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("len", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl<F: ?Sized> HookList<F> {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Append a callback. It runs after every callback already registered.
    pub fn push(&mut self, callback: Rc<F>) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Remove the callback registered under `id`.
    pub fn remove(&mut self, id: HookId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is still registered.
    #[must_use]
    pub fn contains(&self, id: HookId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Drop every registered callback. Ids keep counting up, so stale ids
    /// never alias new registrations.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone out the callbacks in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.iter().map(|(_, cb)| Rc::clone(cb)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Cb = dyn Fn(&mut Vec<char>);

    fn tag(c: char) -> Rc<Cb> {
        Rc::new(move |log: &mut Vec<char>| log.push(c))
    }

    #[test]
    fn snapshot_is_registration_order() {
        let mut list: HookList<Cb> = HookList::new();
        list.push(tag('A'));
        list.push(tag('B'));
        list.push(tag('C'));

        let mut log = Vec::new();
        for cb in list.snapshot() {
            cb(&mut log);
        }
        assert_eq!(log, vec!['A', 'B', 'C']);
    }

    #[test]
    fn remove_by_id() {
        let mut list: HookList<Cb> = HookList::new();
        let _a = list.push(tag('A'));
        let b = list.push(tag('B'));
        let _c = list.push(tag('C'));

        assert!(list.remove(b));
        assert!(!list.remove(b));
        assert!(!list.contains(b));

        let mut log = Vec::new();
        for cb in list.snapshot() {
            cb(&mut log);
        }
        assert_eq!(log, vec!['A', 'C']);
    }

    #[test]
    fn ids_not_reused_after_clear() {
        let mut list: HookList<Cb> = HookList::new();
        let first = list.push(tag('A'));
        list.clear();
        assert!(list.is_empty());

        let second = list.push(tag('B'));
        assert_ne!(first, second);
        assert!(!list.remove(first));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn snapshot_detached_from_list() {
        let list = RefCell::new(HookList::<Cb>::new());
        list.borrow_mut().push(tag('A'));

        let snap = list.borrow().snapshot();
        // Mutating the list while holding the snapshot is fine.
        list.borrow_mut().push(tag('B'));
        list.borrow_mut().clear();

        let mut log = Vec::new();
        for cb in snap {
            cb(&mut log);
        }
        assert_eq!(log, vec!['A']);
    }

    #[test]
    fn debug_reports_len() {
        let mut list: HookList<Cb> = HookList::new();
        list.push(tag('A'));
        let dbg = format!("{list:?}");
        assert!(dbg.contains("HookList"));
        assert!(dbg.contains("len: 1"));
    }
}
