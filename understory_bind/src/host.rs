// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host: a document plus the component registry and native listeners on it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use serde_json::Value;
use smallvec::SmallVec;
use understory_dom::{Document, NodeId};
use understory_event_bus::EventBus;

use crate::{Bindable, Event};

/// Whether native dispatch continues to bubble after a listener ran.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep bubbling.
    Continue,
    /// Stop at the current node.
    Stop,
}

/// Handle of a native listener, returned by [`Host::add_listener`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A native listener. Receives the host so it can drive components.
pub type Listener = Rc<dyn Fn(&mut Host, &Event) -> Outcome>;

/// A bindable component registered at its root node.
pub type Component = Rc<RefCell<dyn Bindable>>;

struct Entry {
    id: ListenerId,
    kind: String,
    listener: Listener,
}

/// Owner of the live [`Document`].
///
/// Besides the document, the host keeps:
/// - the component registry: a node is *bindable* when a component is attached at it,
///   and the data binder delegates to that component instead of assigning properties;
/// - native listeners keyed by node and event type, dispatched with bubbling;
/// - a shared [`EventBus`] for signaling between widgets, living as long as the host.
///
/// Structural removals should go through the host ([`Host::remove`],
/// [`Host::set_markup`], [`Host::clear_children`]) so that components and listeners
/// in the removed subtree are released with it.
#[derive(Default)]
pub struct Host {
    doc: Document,
    components: HashMap<NodeId, Component>,
    listeners: HashMap<NodeId, SmallVec<[Entry; 2]>>,
    bus: EventBus<Event>,
    next_listener: u64,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("doc", &self.doc)
            .field("components", &self.components.len())
            .field(
                "listeners",
                &self.listeners.values().map(SmallVec::len).sum::<usize>(),
            )
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Create a host over an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host over an existing document.
    pub fn with_document(doc: Document) -> Self {
        Self {
            doc,
            ..Self::default()
        }
    }

    /// The document.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Mutable access to the document.
    ///
    /// Removing nodes through this bypasses component and listener cleanup.
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The shared bus for cross-widget signaling.
    pub fn bus(&self) -> &EventBus<Event> {
        &self.bus
    }

    // --- components ---

    /// Register `component` as the bindable rooted at `node`.
    ///
    /// Replaces (and returns) a component already attached there.
    pub fn attach(&mut self, node: NodeId, component: Component) -> Option<Component> {
        if !self.doc.is_alive(node) {
            tracing::warn!(?node, "attaching a component to a stale node");
        }
        let previous = self.components.insert(node, component);
        if previous.is_some() {
            tracing::warn!(?node, "replaced the component attached at node");
        }
        previous
    }

    /// Unregister the component at `node`.
    pub fn detach_component(&mut self, node: NodeId) -> Option<Component> {
        self.components.remove(&node)
    }

    /// The component rooted at `node`.
    pub fn component(&self, node: NodeId) -> Option<Component> {
        self.components.get(&node).cloned()
    }

    /// Whether a component is rooted at `node`.
    pub fn is_component(&self, node: NodeId) -> bool {
        self.components.contains_key(&node)
    }

    // --- native listeners ---

    /// Listen for `kind` events dispatched at `node` or bubbling through it.
    pub fn add_listener(
        &mut self,
        node: NodeId,
        kind: &str,
        listener: impl Fn(&mut Self, &Event) -> Outcome + 'static,
    ) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.entry(node).or_default().push(Entry {
            id,
            kind: kind.to_owned(),
            listener: Rc::new(listener),
        });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let mut found = None;
        for (node, entries) in &mut self.listeners {
            if let Some(pos) = entries.iter().position(|e| e.id == id) {
                entries.remove(pos);
                found = Some((*node, entries.is_empty()));
                break;
            }
        }
        match found {
            Some((node, true)) => {
                self.listeners.remove(&node);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Number of native listeners on `node`, of any type.
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, SmallVec::len)
    }

    /// Whether `node` has a listener for `kind`.
    pub fn has_listener(&self, node: NodeId, kind: &str) -> bool {
        self.listeners
            .get(&node)
            .is_some_and(|entries| entries.iter().any(|e| e.kind == kind))
    }

    /// Dispatch a native `kind` event at `target`, bubbling to the root.
    ///
    /// Listeners of each node are snapshotted before any of them runs. Returns the
    /// node at which a listener stopped propagation, if one did.
    pub fn dispatch(&mut self, target: NodeId, kind: &str, detail: Value) -> Option<NodeId> {
        if !self.doc.is_alive(target) {
            return None;
        }
        let event = Event::new(kind, detail).with_target(target);
        let mut node = Some(target);
        while let Some(current) = node {
            let snapshot: SmallVec<[Listener; 2]> = self
                .listeners
                .get(&current)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|e| e.kind == kind)
                        .map(|e| e.listener.clone())
                        .collect()
                })
                .unwrap_or_default();
            for listener in snapshot {
                if listener(self, &event) == Outcome::Stop {
                    return Some(current);
                }
            }
            node = self.doc.parent_of(current);
        }
        None
    }

    // --- structure ---

    fn release(&mut self, root: NodeId) {
        let ids: Vec<NodeId> = self.doc.traverse(root).collect();
        for id in ids {
            self.components.remove(&id);
            self.listeners.remove(&id);
        }
    }

    /// Destroy `node` and its subtree, dropping their components and listeners.
    pub fn remove(&mut self, node: NodeId) {
        if !self.doc.is_alive(node) {
            return;
        }
        self.release(node);
        self.doc.remove(node);
    }

    /// Destroy every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = self.doc.children_of(node).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Replace the inner markup of `node`, destroying its children first.
    pub fn set_markup(&mut self, node: NodeId, markup: &str) {
        self.clear_children(node);
        self.doc.set_markup(node, markup);
    }
}
