// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed reconciler implementation.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use understory_bind::{BindError, Host, binder};
use understory_dom::NodeId;

use crate::{ReconcileError, ReconcilerConfig};

/// How new entry instances are produced.
pub enum Template {
    /// A node cloned for every new entry.
    Node(NodeId),
    /// A constructor returning the root of a freshly mounted component.
    Factory(Box<dyn FnMut(&mut Host) -> Result<NodeId, BindError>>),
}

impl Template {
    /// A factory template.
    pub fn factory(make: impl FnMut(&mut Host) -> Result<NodeId, BindError> + 'static) -> Self {
        Self::Factory(Box::new(make))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Counts of what one render call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Entries instantiated.
    pub created: usize,
    /// Existing entries rendered in place.
    pub updated: usize,
    /// Entries pruned after the walk.
    pub removed: usize,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    node: NodeId,
    /// Ordinal in the most recent render that touched the entry.
    ordinal: usize,
}

/// Maps keyed data entries to child instances of a wrapper node.
///
/// Each render call creates an instance for every new key, renders persisting keys
/// in place (the node is never recreated), and then, with pruning enabled, removes
/// the entries whose key was absent. After a render the entry keys equal the keys of
/// the data, except for entries skipped by `max_entries`.
///
/// Instances are rendered with [`binder::render_node`]: a component root delegates to
/// its component, a plain clone is bound with a fresh `data-name` query that
/// includes the clone's root.
///
/// ## Example
///
/// ```rust
/// use serde_json::json;
/// use understory_bind::Host;
/// use understory_dom::El;
/// use understory_reconcile::{KeyedReconciler, ReconcilerConfig, Template};
///
/// let mut host = Host::new();
/// let list = host.doc_mut().build(
///     None,
///     &El::new("ul").child(El::new("li").attr("data-name", "label")),
/// );
/// let template = host.doc().children_of(list)[0];
/// let mut items = KeyedReconciler::new(
///     &mut host,
///     list,
///     Template::Node(template),
///     ReconcilerConfig::default(),
/// )
/// .unwrap();
///
/// items
///     .render(&mut host, &json!([{"id": 1, "label": "A"}, {"id": 2, "label": "B"}]))
///     .unwrap();
/// assert_eq!(host.doc().text_content(list), "AB");
///
/// let kept = items.node_of("2");
/// items
///     .render(&mut host, &json!([{"id": 2, "label": "B2"}, {"id": 3, "label": "C"}]))
///     .unwrap();
/// assert_eq!(items.node_of("2"), kept);
/// assert_eq!(host.doc().text_content(list), "B2C");
/// ```
pub struct KeyedReconciler {
    wrapper: NodeId,
    template: Template,
    config: ReconcilerConfig,
    entries: IndexMap<String, Entry>,
}

impl fmt::Debug for KeyedReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedReconciler")
            .field("wrapper", &self.wrapper)
            .field("template", &self.template)
            .field("config", &self.config)
            .field("entries", &self.entries)
            .finish()
    }
}

impl KeyedReconciler {
    /// Create a reconciler appending instances of `template` to `wrapper`.
    ///
    /// Fails if the wrapper or a template node is stale, or if a template node
    /// contains the wrapper.
    pub fn new(
        host: &mut Host,
        wrapper: NodeId,
        template: Template,
        config: ReconcilerConfig,
    ) -> Result<Self, ReconcileError> {
        if !host.doc().is_alive(wrapper) {
            return Err(ReconcileError::StaleWrapper(wrapper));
        }
        if let Template::Node(node) = &template {
            let node = *node;
            if !host.doc().is_alive(node) {
                return Err(ReconcileError::StaleTemplate(node));
            }
            if host.doc().is_inclusive_ancestor(node, wrapper) {
                return Err(ReconcileError::TemplateContainsWrapper {
                    template: node,
                    wrapper,
                });
            }
            if config.remove_original_from_dom {
                host.doc_mut().detach(node);
            }
        }
        Ok(Self {
            wrapper,
            template,
            config,
            entries: IndexMap::new(),
        })
    }

    /// The wrapper node.
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    /// The configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry keys in creation order (incoming order when reordering is enabled).
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// The root node of the entry for `key`.
    pub fn node_of(&self, key: &str) -> Option<NodeId> {
        self.entries.get(key).map(|e| e.node)
    }

    /// Ordinal of `key` in the last render that included it.
    pub fn ordinal_of(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|e| e.ordinal)
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Reconcile against `data`.
    ///
    /// - An array is a sequence of objects carrying the primary key (a string or a
    ///   number). Every element is checked before anything is applied, so a
    ///   malformed element aborts the call with nothing committed.
    /// - An object maps keys to entry data in insertion order.
    ///
    /// Any other value is rejected.
    pub fn render(&mut self, host: &mut Host, data: &Value) -> Result<RenderStats, ReconcileError> {
        match data {
            Value::Array(items) => {
                let keys = self.sequence_keys(items)?;
                self.render_pairs(host, keys.iter().map(String::as_str).zip(items))
            }
            Value::Object(map) => self.render_pairs(host, map),
            other => Err(ReconcileError::UnsupportedShape(shape_name(other))),
        }
    }

    /// Reconcile against ordered `(key, data)` pairs.
    ///
    /// A key seen twice in one call renders the same entry twice.
    pub fn render_pairs<'a, K, I>(
        &mut self,
        host: &mut Host,
        pairs: I,
    ) -> Result<RenderStats, ReconcileError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, &'a Value)>,
    {
        let mut stats = RenderStats::default();
        let mut touched = IndexSet::new();
        for (ordinal, (key, data)) in pairs.into_iter().enumerate() {
            if let Some(max) = self.config.max_entries
                && ordinal >= max
            {
                tracing::debug!(max, "entry limit reached; skipping the remaining entries");
                break;
            }
            let key = key.as_ref();
            if self.render_entry(host, key, data, ordinal)? {
                stats.created += 1;
            } else {
                stats.updated += 1;
            }
            touched.insert(key.to_owned());
        }
        if self.config.prune_untouched_entries {
            stats.removed = self.prune(host, &touched);
        }
        if self.config.reorder_existing {
            self.reorder(host, &touched);
        }
        tracing::trace!(
            created = stats.created,
            updated = stats.updated,
            removed = stats.removed,
            "reconciled"
        );
        Ok(stats)
    }

    /// Render one entry: in place if `key` exists, otherwise instantiate, render,
    /// append to the wrapper, and register.
    ///
    /// Returns whether the entry was created. `ordinal` is recorded but does not
    /// move an existing node.
    pub fn render_entry(
        &mut self,
        host: &mut Host,
        key: &str,
        data: &Value,
        ordinal: usize,
    ) -> Result<bool, ReconcileError> {
        if let Some(entry) = self.entries.get_mut(key) {
            if host.doc().is_alive(entry.node) {
                entry.ordinal = ordinal;
                let node = entry.node;
                binder::render_node(host, node, data)?;
                return Ok(false);
            }
            tracing::warn!(key, "entry node was removed externally; recreating it");
            self.entries.shift_remove(key);
        }

        let node = self.instantiate(host)?;
        if let Err(err) = binder::render_node(host, node, data) {
            host.remove(node);
            return Err(err.into());
        }
        host.doc_mut().append_child(self.wrapper, node);
        self.entries.insert(key.to_owned(), Entry { node, ordinal });
        Ok(true)
    }

    /// Remove every entry and its node, regardless of data.
    pub fn empty(&mut self, host: &mut Host) -> usize {
        let removed = self.entries.len();
        for (_, entry) in self.entries.drain(..) {
            host.remove(entry.node);
        }
        removed
    }

    fn instantiate(&mut self, host: &mut Host) -> Result<NodeId, ReconcileError> {
        match &mut self.template {
            Template::Node(template) => host
                .doc_mut()
                .clone_subtree(*template, self.config.clone_template)
                .ok_or(ReconcileError::StaleTemplate(*template)),
            Template::Factory(make) => Ok(make(host)?),
        }
    }

    fn sequence_keys(&self, items: &[Value]) -> Result<Vec<String>, ReconcileError> {
        let primary_key = &self.config.primary_key;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                primary_key_of(item, primary_key).ok_or_else(|| {
                    tracing::error!(
                        index,
                        %primary_key,
                        "collection entry has no primary key; nothing was applied"
                    );
                    ReconcileError::MissingPrimaryKey {
                        index,
                        key: primary_key.clone(),
                    }
                })
            })
            .collect()
    }

    fn prune(&mut self, host: &mut Host, touched: &IndexSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let keep = touched.contains(key);
            if !keep {
                host.remove(entry.node);
            }
            keep
        });
        before - self.entries.len()
    }

    fn reorder(&mut self, host: &mut Host, touched: &IndexSet<String>) {
        for key in touched {
            if let Some(entry) = self.entries.get(key) {
                host.doc_mut().append_child(self.wrapper, entry.node);
            }
        }
        self.entries
            .sort_by_cached_key(|key, _| touched.get_index_of(key).unwrap_or(usize::MAX));
    }
}

/// The primary key of a sequence element, if it has a string or number one.
pub fn primary_key_of(item: &Value, primary_key: &str) -> Option<String> {
    match item.get(primary_key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert an array of objects into a key → object map.
///
/// Elements without a usable primary key are skipped and logged.
pub fn data_array_to_data_object(items: &[Value], primary_key: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (index, item) in items.iter().enumerate() {
        match primary_key_of(item, primary_key) {
            Some(key) => {
                out.insert(key, item.clone());
            }
            None => tracing::error!(index, primary_key, "skipping entry without primary key"),
        }
    }
    out
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use understory_bind::{Element, mount};
    use understory_dom::El;

    fn list(host: &mut Host) -> (NodeId, NodeId) {
        let ul = host.doc_mut().build(
            None,
            &El::new("ul").child(El::new("li").attr("data-name", "label")),
        );
        let li = host.doc().children_of(ul)[0];
        (ul, li)
    }

    fn reconciler(host: &mut Host, config: ReconcilerConfig) -> (NodeId, KeyedReconciler) {
        let (ul, li) = list(host);
        let r = KeyedReconciler::new(host, ul, Template::Node(li), config).unwrap();
        (ul, r)
    }

    fn texts(host: &Host, ul: NodeId) -> Vec<String> {
        host.doc()
            .children_of(ul)
            .iter()
            .map(|n| host.doc().text_content(*n))
            .collect()
    }

    #[test]
    fn list_scenario() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        assert!(host.doc().children_of(ul).is_empty(), "template detached");

        let stats = r
            .render(&mut host, &json!([{"id": 1, "label": "A"}, {"id": 2, "label": "B"}]))
            .unwrap();
        assert_eq!(stats, RenderStats { created: 2, updated: 0, removed: 0 });
        assert_eq!(texts(&host, ul), ["A", "B"]);
        let one = r.node_of("1").unwrap();
        let two = r.node_of("2").unwrap();

        let stats = r
            .render(&mut host, &json!([{"id": 2, "label": "B2"}, {"id": 3, "label": "C"}]))
            .unwrap();
        assert_eq!(stats, RenderStats { created: 1, updated: 1, removed: 1 });
        assert_eq!(host.doc().children_of(ul).len(), 2);
        assert_eq!(r.node_of("2"), Some(two), "same instance for a persisting key");
        assert_eq!(host.doc().markup(two), Some("B2"));
        assert!(!host.doc().is_alive(one));
        assert_eq!(r.keys().collect::<Vec<_>>(), ["2", "3"]);
    }

    #[test]
    fn object_shape_uses_insertion_order() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        r.render(&mut host, &json!({"z": {"label": "Z"}, "a": {"label": "A"}}))
            .unwrap();
        assert_eq!(texts(&host, ul), ["Z", "A"]);
        assert!(r.contains("z"));
    }

    #[test]
    fn pairs_shape() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        let rows = [("k1".to_owned(), json!("one")), ("k2".to_owned(), json!("two"))];
        r.render_pairs(&mut host, rows.iter().map(|(k, v)| (k, v)))
            .unwrap();
        assert_eq!(texts(&host, ul), ["one", "two"]);
    }

    #[test]
    fn malformed_array_commits_nothing() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        r.render(&mut host, &json!([{"id": 1, "label": "A"}])).unwrap();

        let err = r
            .render(
                &mut host,
                &json!([{"id": 1, "label": "changed"}, {"label": "no key"}, {"id": 3}]),
            )
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MissingPrimaryKey { index: 1, .. }));
        assert_eq!(texts(&host, ul), ["A"]);
        assert_eq!(r.len(), 1);

        let err = r.render(&mut host, &json!([{"id": true}])).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingPrimaryKey { index: 0, .. }));
    }

    #[test]
    fn unsupported_shapes() {
        let mut host = Host::new();
        let (_, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        assert!(matches!(
            r.render(&mut host, &json!("text")),
            Err(ReconcileError::UnsupportedShape("string"))
        ));
    }

    #[test]
    fn existing_entries_keep_their_position_by_default() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        r.render(&mut host, &json!([{"id": "a", "label": "A"}, {"id": "b", "label": "B"}]))
            .unwrap();
        r.render(&mut host, &json!([{"id": "b", "label": "B"}, {"id": "a", "label": "A"}]))
            .unwrap();
        // Incoming order is b, a; the nodes are not moved.
        assert_eq!(texts(&host, ul), ["A", "B"]);
        assert_eq!(r.ordinal_of("b"), Some(0));
    }

    #[test]
    fn reorder_existing_follows_incoming_order() {
        let mut host = Host::new();
        let config = ReconcilerConfig {
            reorder_existing: true,
            ..ReconcilerConfig::default()
        };
        let (ul, mut r) = reconciler(&mut host, config);
        r.render(&mut host, &json!([{"id": "a", "label": "A"}, {"id": "b", "label": "B"}]))
            .unwrap();
        let a = r.node_of("a");
        r.render(
            &mut host,
            &json!([{"id": "c", "label": "C"}, {"id": "b", "label": "B"}, {"id": "a", "label": "A"}]),
        )
        .unwrap();
        assert_eq!(texts(&host, ul), ["C", "B", "A"]);
        assert_eq!(r.keys().collect::<Vec<_>>(), ["c", "b", "a"]);
        assert_eq!(r.node_of("a"), a);
    }

    #[test]
    fn max_entries_skips_the_rest() {
        let mut host = Host::new();
        let config = ReconcilerConfig {
            max_entries: Some(2),
            ..ReconcilerConfig::default()
        };
        let (ul, mut r) = reconciler(&mut host, config);
        let stats = r
            .render(
                &mut host,
                &json!([{"id": 1, "label": "A"}, {"id": 2, "label": "B"}, {"id": 3, "label": "C"}]),
            )
            .unwrap();
        assert_eq!(stats.created, 2);
        assert_eq!(texts(&host, ul), ["A", "B"]);
    }

    #[test]
    fn keeping_dead_entries() {
        let mut host = Host::new();
        let config = ReconcilerConfig {
            prune_untouched_entries: false,
            ..ReconcilerConfig::default()
        };
        let (ul, mut r) = reconciler(&mut host, config);
        r.render(&mut host, &json!([{"id": 1, "label": "A"}])).unwrap();
        let stats = r.render(&mut host, &json!([{"id": 2, "label": "B"}])).unwrap();
        assert_eq!(stats.removed, 0);
        assert_eq!(texts(&host, ul), ["A", "B"]);
    }

    #[test]
    fn empty_removes_everything() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        r.render(&mut host, &json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(r.empty(&mut host), 2);
        assert!(r.is_empty());
        assert!(host.doc().children_of(ul).is_empty());
        r.render(&mut host, &json!([{"id": 1, "label": "again"}])).unwrap();
        assert_eq!(texts(&host, ul), ["again"]);
    }

    #[test]
    fn template_options() {
        let mut host = Host::new();
        let ul = host.doc_mut().build(
            None,
            &El::new("ul").child(
                El::new("li")
                    .attr("class", "row")
                    .child(El::new("b").attr("data-name", "label")),
            ),
        );
        let li = host.doc().children_of(ul)[0];
        let config = ReconcilerConfig {
            clone_template: false,
            remove_original_from_dom: false,
            ..ReconcilerConfig::default()
        };
        let mut r = KeyedReconciler::new(&mut host, ul, Template::Node(li), config).unwrap();
        r.render(&mut host, &json!([{"id": 1, "label": "A"}])).unwrap();

        let children = host.doc().children_of(ul).to_vec();
        assert_eq!(children.len(), 2, "template stays in place");
        let clone = r.node_of("1").unwrap();
        assert_eq!(children[1], clone);
        assert!(host.doc().has_class(clone, "row"));
        assert!(host.doc().children_of(clone).is_empty(), "shallow clone");
    }

    #[test]
    fn construction_fails_fast() {
        let mut host = Host::new();
        let (ul, li) = list(&mut host);
        host.remove(li);
        assert!(matches!(
            KeyedReconciler::new(&mut host, ul, Template::Node(li), ReconcilerConfig::default()),
            Err(ReconcileError::StaleTemplate(_))
        ));
        let outer = host.doc_mut().create_element("div");
        host.doc_mut().append_child(outer, ul);
        assert!(matches!(
            KeyedReconciler::new(&mut host, ul, Template::Node(outer), ReconcilerConfig::default()),
            Err(ReconcileError::TemplateContainsWrapper { .. })
        ));
        host.remove(outer);
        assert!(matches!(
            KeyedReconciler::new(&mut host, ul, Template::Node(outer), ReconcilerConfig::default()),
            Err(ReconcileError::StaleWrapper(_))
        ));
    }

    #[test]
    fn factory_instances_are_components() {
        let mut host = Host::new();
        let ul = host.doc_mut().create_element("ul");
        let made: Rc<RefCell<Vec<Rc<RefCell<Element>>>>> = Rc::default();
        let m = made.clone();
        let template = Template::factory(move |host| {
            let el = Element::new(host, "li").with_markup(|doc, root| {
                doc.build(Some(root), &El::new("span").attr("data-name", "label"));
            });
            let el = mount(host, el)?;
            let root = el.borrow().root();
            m.borrow_mut().push(el);
            Ok(root)
        });
        let mut r =
            KeyedReconciler::new(&mut host, ul, template, ReconcilerConfig::default()).unwrap();
        r.render(&mut host, &json!([{"id": 7, "label": "seven"}])).unwrap();
        r.render(&mut host, &json!([{"id": 7, "label": "SEVEN"}])).unwrap();

        assert_eq!(made.borrow().len(), 1);
        let el = made.borrow()[0].clone();
        assert_eq!(el.borrow().last_raw()["label"], "SEVEN");
        assert_eq!(host.doc().text_content(ul), "SEVEN");

        r.render(&mut host, &json!([])).unwrap();
        assert!(!host.is_component(el.borrow().root()), "pruned component is released");
    }

    #[test]
    fn externally_removed_entries_are_recreated() {
        let mut host = Host::new();
        let (ul, mut r) = reconciler(&mut host, ReconcilerConfig::default());
        r.render(&mut host, &json!([{"id": 1, "label": "A"}])).unwrap();
        let old = r.node_of("1").unwrap();
        host.remove(old);
        let stats = r.render(&mut host, &json!([{"id": 1, "label": "A"}])).unwrap();
        assert_eq!(stats.created, 1);
        assert_eq!(texts(&host, ul), ["A"]);
    }

    #[test]
    fn array_to_object() {
        let object = data_array_to_data_object(
            &[json!({"id": 1, "v": "a"}), json!({"v": "lost"}), json!({"id": "x"})],
            "id",
        );
        assert_eq!(
            Value::Object(object),
            json!({"1": {"id": 1, "v": "a"}, "x": {"id": "x"}})
        );
    }
}
