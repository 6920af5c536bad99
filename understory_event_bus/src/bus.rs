// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Namespaced handler registry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

/// A registered event handler.
pub type Handler<P> = Rc<dyn Fn(&P)>;

/// Prefix of the synthetic namespace segment used by [`EventBus::once`].
const ONCE_SEGMENT: &str = "__once";

/// One node of the registry tree.
struct Namespace<P> {
    handlers: SmallVec<[Handler<P>; 2]>,
    /// Child namespaces in first-registration order.
    children: IndexMap<String, Self>,
}

impl<P> Default for Namespace<P> {
    fn default() -> Self {
        Self {
            handlers: SmallVec::new(),
            children: IndexMap::new(),
        }
    }
}

impl<P> Namespace<P> {
    fn find(&self, segments: &[&str]) -> Option<&Self> {
        let mut node = self;
        for seg in segments {
            node = node.children.get(*seg)?;
        }
        Some(node)
    }

    fn count(&self) -> usize {
        self.handlers.len() + self.children.values().map(Self::count).sum::<usize>()
    }

    /// Pre-order: own handlers, then each child subtree.
    fn collect(&self, out: &mut Vec<Handler<P>>) {
        out.extend(self.handlers.iter().cloned());
        for child in self.children.values() {
            child.collect(out);
        }
    }

    fn remove(&mut self, segments: &[&str], remove_descendants: bool) -> bool {
        let Some((last, parents)) = segments.split_last() else {
            return false;
        };
        let mut parent = self;
        for seg in parents {
            let Some(next) = parent.children.get_mut(*seg) else {
                return false;
            };
            parent = next;
        }
        if remove_descendants {
            return parent.children.shift_remove(*last).is_some();
        }
        let Some(node) = parent.children.get_mut(*last) else {
            return false;
        };
        let removed = !node.handlers.is_empty();
        node.handlers.clear();
        if node.children.is_empty() {
            parent.children.shift_remove(*last);
        }
        removed
    }
}

fn segments(path: &str) -> SmallVec<[&str; 4]> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// A namespaced event bus.
///
/// Paths are dot-delimited (`"base.ns1.ns2"`); empty segments are ignored. Cloning the
/// bus yields another handle onto the same registry.
///
/// Handlers are snapshotted before an emission runs, so a handler that registers or
/// removes handlers affects the *next* emission, not the current one.
pub struct EventBus<P> {
    root: Rc<RefCell<Namespace<P>>>,
    next_once: Rc<Cell<u64>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            next_once: self.next_once.clone(),
        }
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root.borrow();
        f.debug_struct("EventBus")
            .field("namespaces", &root.children.keys().collect::<Vec<_>>())
            .field("handlers", &root.count())
            .finish_non_exhaustive()
    }
}

impl<P> EventBus<P> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            root: Rc::new(RefCell::new(Namespace::default())),
            next_once: Rc::new(Cell::new(0)),
        }
    }

    /// Append `handler` to the handler list at `path`, creating namespaces as needed.
    ///
    /// Registering `"a.b"` never touches the handlers registered directly on `"a"`.
    pub fn on(&self, path: &str, handler: impl Fn(&P) + 'static) {
        self.on_handler(path, Rc::new(handler));
    }

    /// Same as [`EventBus::on`] for an already shared handler.
    pub fn on_handler(&self, path: &str, handler: Handler<P>) {
        let segs = segments(path);
        if segs.is_empty() {
            tracing::warn!(path, "ignoring handler registered on an empty event path");
            return;
        }
        let mut root = self.root.borrow_mut();
        let mut node = &mut *root;
        for seg in segs {
            node = node.children.entry(seg.to_owned()).or_default();
        }
        node.handlers.push(handler);
    }

    /// Register a handler that runs at most once.
    ///
    /// The handler lives in a synthetic child namespace of `path` and removes that
    /// namespace before it runs, so emitting `path` (or removing it) behaves exactly
    /// as for a handler registered with [`EventBus::on`].
    pub fn once(&self, path: &str, handler: impl Fn(&P) + 'static)
    where
        P: 'static,
    {
        if segments(path).is_empty() {
            tracing::warn!(path, "ignoring once-handler registered on an empty event path");
            return;
        }
        let id = self.next_once.get();
        self.next_once.set(id + 1);
        let own_path = format!("{path}.{ONCE_SEGMENT}{id}");

        let registry: Weak<RefCell<Namespace<P>>> = Rc::downgrade(&self.root);
        let fired = Cell::new(false);
        let remove_path = own_path.clone();
        self.on(&own_path, move |payload| {
            if fired.replace(true) {
                return;
            }
            if let Some(root) = registry.upgrade() {
                root.borrow_mut().remove(&segments(&remove_path), true);
            }
            handler(payload);
        });
    }

    /// Remove handlers at `path`.
    ///
    /// With `remove_descendants`, the whole namespace subtree is dropped. Without it,
    /// only the handlers registered directly on `path` are dropped, and the node is
    /// pruned if no child namespaces remain.
    ///
    /// Returns whether anything was removed. Unknown paths are a no-op.
    pub fn off(&self, path: &str, remove_descendants: bool) -> bool {
        let segs = segments(path);
        self.root.borrow_mut().remove(&segs, remove_descendants)
    }

    /// Invoke every handler at `path` and below it, returning how many ran.
    ///
    /// Order is pre-order over the namespace tree: the node's own handlers in
    /// registration order, then each child namespace in first-registration order.
    pub fn emit(&self, path: &str, payload: &P) -> usize {
        let segs = segments(path);
        if segs.is_empty() {
            return 0;
        }
        let handlers = {
            let root = self.root.borrow();
            let Some(node) = root.find(&segs) else {
                return 0;
            };
            let mut out = Vec::new();
            node.collect(&mut out);
            out
        };
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of handlers at `path` plus all descendant namespaces.
    pub fn count_handlers(&self, path: &str) -> usize {
        let segs = segments(path);
        if segs.is_empty() {
            return 0;
        }
        self.root.borrow().find(&segs).map_or(0, Namespace::count)
    }

    /// Whether no handler is registered anywhere on the bus.
    pub fn is_empty(&self) -> bool {
        self.root.borrow().count() == 0
    }

    /// Remove every handler and namespace.
    pub fn clear(&self) {
        *self.root.borrow_mut() = Namespace::default();
    }
}
