// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The bindable element every widget embeds.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use understory_dom::{Document, NodeFlags, NodeId, Selector, Size};
use understory_event_bus::EventBus;

use crate::binder::{self, BindingMap, Targets};
use crate::host::{ListenerId, Outcome};
use crate::{BindError, Bindable, ElementConfig, Event, Host, Widget};

type Processor = Box<dyn Fn(&Value) -> Value>;
type MarkupBuilder = Box<dyn Fn(&mut Document, NodeId)>;

/// A root node with an event bus, a binding map, and the last rendered data.
///
/// ## Lifecycle
///
/// An element is created around a node ([`Element::new`] or [`Element::adopt`]),
/// configured with the `with_*` builders, and then mounted: [`Element::mount`]
/// builds the default markup if the root is empty, indexes the binding targets, and
/// resolves the configured parts. Rendering before mount works too, with a fresh
/// attribute query per key instead of the cached map.
///
/// ## Events
///
/// [`Element::on`], [`Element::once`] and [`Element::off`] manage handlers on the
/// element's [`EventBus`]. For every base event name (the part before the first dot)
/// that has handlers, exactly one native listener is kept on the root; it re-emits
/// native events of that type on the bus. The listener is released when the last
/// handler for the base name goes away.
pub struct Element {
    root: NodeId,
    bus: EventBus<Event>,
    bound: BindingMap,
    parts: BTreeMap<String, NodeId>,
    last_raw: Value,
    last_processed: Value,
    config: ElementConfig,
    mounted: bool,
    /// Base event name to the native listener mirroring it; emptied when the
    /// listener releases itself.
    native: BTreeMap<String, Rc<Cell<Option<ListenerId>>>>,
    processor: Option<Processor>,
    markup: Option<MarkupBuilder>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("root", &self.root)
            .field("bus", &self.bus)
            .field("bound", &self.bound.keys().collect::<Vec<_>>())
            .field("parts", &self.parts)
            .field("last_raw", &self.last_raw)
            .field("last_processed", &self.last_processed)
            .field("config", &self.config)
            .field("mounted", &self.mounted)
            .field("native", &self.native.keys().collect::<Vec<_>>())
            .field("processor", &self.processor.is_some())
            .field("markup", &self.markup.is_some())
            .finish()
    }
}

impl Element {
    /// Create a detached `tag` element in the host's document.
    pub fn new(host: &mut Host, tag: &str) -> Self {
        let root = host.doc_mut().create_element(tag);
        Self::adopt(root)
    }

    /// Wrap an existing node, e.g. one declared in markup.
    pub fn adopt(root: NodeId) -> Self {
        Self {
            root,
            bus: EventBus::new(),
            bound: BindingMap::new(),
            parts: BTreeMap::new(),
            last_raw: Value::Null,
            last_processed: Value::Null,
            config: ElementConfig::default(),
            mounted: false,
            native: BTreeMap::new(),
            processor: None,
            markup: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ElementConfig) -> Self {
        self.config = config;
        self
    }

    /// Default markup, built by [`Element::mount`] when the root is empty.
    #[must_use]
    pub fn with_markup(mut self, build: impl Fn(&mut Document, NodeId) + 'static) -> Self {
        self.markup = Some(Box::new(build));
        self
    }

    /// Transform applied to rendered data before binding. Identity by default.
    #[must_use]
    pub fn with_processor(mut self, processor: impl Fn(&Value) -> Value + 'static) -> Self {
        self.processor = Some(Box::new(processor));
        self
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The configuration.
    pub fn config(&self) -> &ElementConfig {
        &self.config
    }

    /// The element's event bus.
    pub fn bus(&self) -> &EventBus<Event> {
        &self.bus
    }

    /// The binding map built at mount.
    pub fn bound(&self) -> &BindingMap {
        &self.bound
    }

    /// A part resolved from `config.elements`.
    pub fn part(&self, name: &str) -> Option<NodeId> {
        self.parts.get(name).copied()
    }

    /// All resolved parts.
    pub fn parts(&self) -> &BTreeMap<String, NodeId> {
        &self.parts
    }

    /// A copy of the data last passed to [`Element::render`].
    pub fn last_raw(&self) -> &Value {
        &self.last_raw
    }

    /// The processed form of the last rendered data.
    pub fn last_processed(&self) -> &Value {
        &self.last_processed
    }

    /// Whether [`Element::mount`] has run.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // --- lifecycle ---

    /// Build default markup if needed, apply root configuration, and index bindings.
    pub fn mount(&mut self, host: &mut Host) -> Result<(), BindError> {
        let root = self.root;
        if !host.doc().is_alive(root) {
            return Err(BindError::StaleNode(root));
        }
        let empty = host.doc().children_of(root).is_empty()
            && host.doc().markup(root).is_none_or(str::is_empty);
        if empty && let Some(build) = &self.markup {
            build(host.doc_mut(), root);
        }
        for (name, value) in &self.config.attributes {
            host.doc_mut().set_attribute(root, name, value);
        }
        if self.config.display_block {
            host.doc_mut().set_flag(root, NodeFlags::DISPLAY_BLOCK, true);
        }
        self.rebind(host)?;
        self.mounted = true;
        tracing::debug!(
            ?root,
            bindings = self.bound.len(),
            parts = self.parts.len(),
            "element mounted"
        );
        self.emit("mount", Value::Null);
        Ok(())
    }

    /// Recompute the binding map and parts, e.g. after replacing the markup.
    pub fn rebind(&mut self, host: &Host) -> Result<(), BindError> {
        self.bound = binder::discover(host, self.root, &self.config.render_attribute);
        self.parts.clear();
        for (name, selector) in &self.config.elements {
            let selector = Selector::parse(selector)?;
            match host.doc().query_selector(self.root, &selector) {
                Some(node) => {
                    self.parts.insert(name.clone(), node);
                }
                None => tracing::warn!(part = %name, "no node matches the part selector"),
            }
        }
        Ok(())
    }

    /// Render `data`: keep a copy, process it, and bind the result.
    pub fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        self.last_raw = data.clone();
        let processed = match &self.processor {
            Some(process) => process(data),
            None => data.clone(),
        };
        let targets = if self.mounted {
            Targets::Cached(&self.bound)
        } else {
            Targets::Query
        };
        binder::render(
            host,
            self.root,
            &processed,
            targets,
            &self.config.render_attribute,
        )?;
        self.last_processed = processed;
        Ok(())
    }

    // --- presentation ---

    /// Show the root.
    pub fn show(&self, host: &mut Host) {
        host.doc_mut().set_flag(self.root, NodeFlags::HIDDEN, false);
    }

    /// Hide the root.
    pub fn hide(&self, host: &mut Host) {
        host.doc_mut().set_flag(self.root, NodeFlags::HIDDEN, true);
    }

    /// Flip visibility.
    pub fn toggle(&self, host: &mut Host) {
        let hidden = host.doc().is_hidden(self.root);
        host.doc_mut().set_flag(self.root, NodeFlags::HIDDEN, !hidden);
    }

    /// Whether the root is not hidden.
    pub fn is_visible(&self, host: &Host) -> bool {
        !host.doc().is_hidden(self.root)
    }

    /// Add a class token to the root.
    pub fn add_class(&self, host: &mut Host, class: &str) {
        host.doc_mut().add_class(self.root, class);
    }

    /// Remove a class token from the root.
    pub fn remove_class(&self, host: &mut Host, class: &str) {
        host.doc_mut().remove_class(self.root, class);
    }

    /// Whether the root has a class token.
    pub fn has_class(&self, host: &Host, class: &str) -> bool {
        host.doc().has_class(self.root, class)
    }

    /// Set or clear the explicit size of the root.
    pub fn set_size(&self, host: &mut Host, size: Option<Size>) {
        host.doc_mut().set_size(self.root, size);
    }

    // --- events ---

    /// Register `handler` on `path`.
    pub fn on(&mut self, host: &mut Host, path: &str, handler: impl Fn(&Event) + 'static) {
        self.bus.on(path, handler);
        self.sync_native(host, path);
    }

    /// Register `handler` on `path` for a single invocation.
    pub fn once(&mut self, host: &mut Host, path: &str, handler: impl Fn(&Event) + 'static) {
        self.bus.once(path, handler);
        self.sync_native(host, path);
    }

    /// Remove handlers at `path`, see [`EventBus::off`].
    pub fn off(&mut self, host: &mut Host, path: &str, remove_descendants: bool) -> bool {
        let removed = self.bus.off(path, remove_descendants);
        self.sync_native(host, path);
        removed
    }

    /// Emit on the element's bus with the root as target.
    pub fn emit(&self, path: &str, detail: Value) -> usize {
        let event = Event::new(path, detail).with_target(self.root);
        self.bus.emit(path, &event)
    }

    /// Number of native listeners the element holds on its root.
    pub fn native_listener_count(&self) -> usize {
        self.native.values().filter(|slot| slot.get().is_some()).count()
    }

    /// Release native listeners whose base name lost its last handler, then make
    /// sure the base of `path` has one if it has handlers.
    fn sync_native(&mut self, host: &mut Host, path: &str) {
        let bus = &self.bus;
        let unused: Vec<String> = self
            .native
            .iter()
            .filter(|(base, slot)| slot.get().is_none() || bus.count_handlers(base) == 0)
            .map(|(base, _)| base.clone())
            .collect();
        for base in unused {
            if let Some(id) = self.native.remove(&base).and_then(|slot| slot.take()) {
                host.remove_listener(id);
                tracing::trace!(%base, "released native listener");
            }
        }

        let Some(base) = path.split('.').find(|s| !s.is_empty()) else {
            return;
        };
        if self.native.contains_key(base) || self.bus.count_handlers(base) == 0 {
            return;
        }
        let bus = self.bus.clone();
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::default();
        let own = slot.clone();
        let name = base.to_owned();
        let id = host.add_listener(self.root, base, move |host, event| {
            bus.emit(&event.name, event);
            // A `once` handler may have taken the last registration with it.
            if bus.count_handlers(&name) == 0
                && let Some(id) = own.take()
            {
                host.remove_listener(id);
                tracing::trace!(base = %name, "released native listener");
            }
            Outcome::Continue
        });
        slot.set(Some(id));
        self.native.insert(base.to_owned(), slot);
        tracing::trace!(%base, "attached native listener");
    }
}

impl Bindable for Element {
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        Self::render(self, host, data)
    }
}

impl Widget for Element {
    fn element(&self) -> &Self {
        self
    }

    fn element_mut(&mut self) -> &mut Self {
        self
    }
}
