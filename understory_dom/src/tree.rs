// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core document implementation: structure, element state, queries.

use kurbo::Size;
use smallvec::SmallVec;

use crate::builder::El;
use crate::selector::Selector;
use crate::types::{ControlKind, NodeFlags, NodeId};

/// A live tree of elements.
///
/// Nodes are addressed by generational [`NodeId`]s. Removing a node frees its whole
/// subtree; ids of removed nodes become stale and never alias a later node.
///
/// A node created without a parent is *detached*: it stays alive and can be
/// appended somewhere later, the same way an element created by a script lives
/// outside the page until it is inserted.
///
/// ## Example
///
/// ```rust
/// use understory_dom::Document;
///
/// let mut doc = Document::new();
/// let list = doc.create_element("ul");
/// let item = doc.create_element("li");
/// doc.append_child(list, item);
/// doc.set_markup(item, "hello");
///
/// assert_eq!(doc.parent_of(item), Some(list));
/// assert_eq!(doc.text_content(list), "hello");
///
/// doc.remove(list);
/// assert!(!doc.is_alive(item));
/// ```
#[derive(Clone, Default)]
pub struct Document {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl core::fmt::Debug for Document {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Document")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
struct ElementData {
    tag: String,
    attributes: SmallVec<[(String, String); 4]>,
    markup: String,
    /// `value` property; falls back to the `value` attribute while unset.
    value: Option<String>,
    checked: bool,
    flags: NodeFlags,
    size: Option<Size>,
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: ElementData,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, data: ElementData) -> NodeId {
        let node = |generation| Node {
            generation,
            parent: None,
            children: Vec::new(),
            data,
        };
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node(generation));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices."
            )]
            NodeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(node(generation)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices."
            )]
            NodeId::new((self.nodes.len() - 1) as u32, generation)
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..ElementData::default()
        })
    }

    /// Materialize a markup description, appending it to `parent` if given.
    ///
    /// A `checked` attribute also initialises the `checked` property.
    pub fn build(&mut self, parent: Option<NodeId>, el: &El) -> NodeId {
        let checked = el.attributes.iter().any(|(n, _)| n == "checked");
        let id = self.alloc(ElementData {
            tag: el.tag.clone(),
            attributes: el.attributes.iter().cloned().collect(),
            markup: el.text.clone(),
            checked,
            ..ElementData::default()
        });
        for child in &el.children {
            self.build(Some(id), child);
        }
        if let Some(p) = parent {
            self.append_child(p, id);
        }
        id
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Whether the document holds no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.node_mut(id).map(|n| &mut n.data)
    }

    // --- structure ---

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    ///
    /// Ignored if either id is stale or if `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children_of(parent).len();
        self.insert_child(parent, child, len);
    }

    /// Insert `child` into `parent`'s children at `index` (clamped), detaching it first.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if !self.is_alive(parent) || !self.is_alive(child) || self.is_inclusive_ancestor(child, parent)
        {
            return;
        }
        self.detach(child);
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Unlink `id` from its parent. The node and its subtree stay alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent_of(id) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }

    /// Remove a node and its subtree. Stale ids are ignored.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes[n.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(n.idx());
            }
        }
    }

    /// Remove every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children_of(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Returns the parent of a node if live, or `None` for detached roots or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Get the children of a node, or empty slice if node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[][..], |n| n.children.as_slice())
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|c| *c == id)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent_of(n);
        }
        false
    }

    /// Iterate `root` and its descendants in depth-first pre-order.
    pub fn traverse(&self, root: NodeId) -> Traverse<'_> {
        Traverse {
            doc: self,
            stack: if self.is_alive(root) { vec![root] } else { Vec::new() },
            prune: None,
        }
    }

    /// Deep (or shallow) copy of a subtree as a new detached node.
    ///
    /// Attributes, markup, and control/presentation state are copied.
    pub fn clone_subtree(&mut self, id: NodeId, deep: bool) -> Option<NodeId> {
        let data = self.node(id)?.data.clone();
        let copy = self.alloc(data);
        if deep {
            let children = self.children_of(id).to_vec();
            for child in children {
                if let Some(c) = self.clone_subtree(child, true) {
                    self.append_child(copy, c);
                }
            }
        }
        Some(copy)
    }

    // --- element state ---

    /// Lowercase tag name.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.data.tag.as_str())
    }

    /// Attribute value.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?
            .data
            .attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether an attribute is present.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// All attributes in insertion order.
    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.node(id).map_or(&[][..], |n| n.data.attributes.as_slice())
    }

    /// Set (or replace) an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(data) = self.data_mut(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match data.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) if slot.1 != value => slot.1 = value.to_owned(),
            Some(_) => {}
            None => data.attributes.push((name, value.to_owned())),
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let data = self.data_mut(id)?;
        let pos = data
            .attributes
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(data.attributes.remove(pos).1)
    }

    /// The node's own inner markup.
    pub fn markup(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.data.markup.as_str())
    }

    /// Replace the node's content with `markup`, removing all of its children.
    pub fn set_markup(&mut self, id: NodeId, markup: &str) {
        if !self.is_alive(id) {
            return;
        }
        self.clear_children(id);
        if let Some(data) = self.data_mut(id)
            && data.markup != markup
        {
            markup.clone_into(&mut data.markup);
        }
    }

    /// Concatenated markup of the node and its descendants, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        self.traverse(id)
            .filter_map(|n| self.markup(n))
            .collect()
    }

    /// Form-control classification of the node.
    pub fn control_kind(&self, id: NodeId) -> ControlKind {
        match self.tag(id) {
            Some("input") => match self.attribute(id, "type").map(str::to_ascii_lowercase) {
                Some(t) if t == "checkbox" => ControlKind::Checkbox,
                Some(t) if t == "radio" => ControlKind::Radio,
                _ => ControlKind::Input,
            },
            Some("select") => ControlKind::Select,
            Some("textarea") => ControlKind::TextArea,
            _ => ControlKind::None,
        }
    }

    /// The `value` property: the last assigned value, or the `value` attribute.
    pub fn value(&self, id: NodeId) -> &str {
        match self.node(id) {
            Some(n) => n
                .data
                .value
                .as_deref()
                .or_else(|| self.attribute(id, "value"))
                .unwrap_or(""),
            None => "",
        }
    }

    /// Assign the `value` property.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(data) = self.data_mut(id)
            && data.value.as_deref() != Some(value)
        {
            data.value = Some(value.to_owned());
        }
    }

    /// The `checked` property.
    pub fn checked(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.data.checked)
    }

    /// Assign the `checked` property.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(data) = self.data_mut(id) {
            data.checked = checked;
        }
    }

    /// Restore the `value` and `checked` properties to their attribute defaults.
    pub fn reset_control(&mut self, id: NodeId) {
        let default_checked = self.has_attribute(id, "checked");
        if let Some(data) = self.data_mut(id) {
            data.value = None;
            data.checked = default_checked;
        }
    }

    /// Presentation flags.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node(id).map(|n| n.data.flags)
    }

    /// Update presentation flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(data) = self.data_mut(id) {
            data.flags = flags;
        }
    }

    /// Set or clear a single presentation flag.
    pub fn set_flag(&mut self, id: NodeId, flag: NodeFlags, on: bool) {
        if let Some(data) = self.data_mut(id) {
            data.flags.set(flag, on);
        }
    }

    /// Whether the node is hidden.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.flags(id).is_some_and(|f| f.contains(NodeFlags::HIDDEN))
    }

    /// Whether `class` is one of the node's classes.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|t| t == class))
    }

    /// Add a class token if absent.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if class.is_empty() || self.has_class(id, class) {
            return;
        }
        let value = match self.attribute(id, "class") {
            Some(c) if !c.trim().is_empty() => format!("{} {class}", c.trim()),
            _ => class.to_owned(),
        };
        self.set_attribute(id, "class", &value);
    }

    /// Remove a class token if present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let value = self
            .attribute(id, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .filter(|t| *t != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &value);
    }

    /// Explicit size, if one was set.
    pub fn size(&self, id: NodeId) -> Option<Size> {
        self.node(id).and_then(|n| n.data.size)
    }

    /// Set or clear the explicit size.
    pub fn set_size(&mut self, id: NodeId, size: Option<Size>) {
        if let Some(data) = self.data_mut(id) {
            data.size = size;
        }
    }

    // --- queries ---

    /// Nodes in `root`'s subtree (including `root`) carrying attribute `name`,
    /// optionally with the exact `value`, in document order.
    pub fn query_attribute(&self, root: NodeId, name: &str, value: Option<&str>) -> Vec<NodeId> {
        self.traverse(root)
            .filter(|n| match (self.attribute(*n, name), value) {
                (Some(actual), Some(want)) => actual == want,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// First descendant of `root` (excluding `root`) matching `selector`.
    pub fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.traverse(root)
            .skip(1)
            .find(|n| selector.matches(self, *n))
    }

    /// All descendants of `root` (excluding `root`) matching `selector`.
    pub fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.traverse(root)
            .skip(1)
            .filter(|n| selector.matches(self, *n))
            .collect()
    }
}

/// Depth-first pre-order iterator returned by [`Document::traverse`].
#[derive(Clone)]
pub struct Traverse<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
    prune: Option<&'a dyn Fn(NodeId) -> bool>,
}

impl core::fmt::Debug for Traverse<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Traverse")
            .field("stack", &self.stack)
            .field("pruned", &self.prune.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> Traverse<'a> {
    /// Do not descend below nodes for which `prune` returns true.
    ///
    /// The pruned nodes themselves are still yielded.
    #[must_use]
    pub fn prune(mut self, prune: &'a dyn Fn(NodeId) -> bool) -> Self {
        self.prune = Some(prune);
        self
    }
}

impl Iterator for Traverse<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let pruned = self.prune.is_some_and(|p| p(id));
        if !pruned {
            // Reverse so that children are visited in order.
            self.stack
                .extend(self.doc.children_of(id).iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(doc: &mut Document) -> NodeId {
        doc.build(
            None,
            &El::new("form")
                .child(El::new("input").attr("name", "title").attr("value", "x"))
                .child(
                    El::new("fieldset").child(
                        El::new("input")
                            .attr("type", "checkbox")
                            .attr("name", "done")
                            .attr("checked", ""),
                    ),
                )
                .child(El::new("p").attr("data-name", "note").text("n")),
        )
    }

    #[test]
    fn build_and_traverse_in_document_order() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let tags: Vec<_> = doc.traverse(root).filter_map(|n| doc.tag(n)).collect();
        assert_eq!(tags, ["form", "input", "fieldset", "input", "p"]);
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn liveness_insert_remove_reuse() {
        let mut doc = Document::new();
        let root = doc.create_element("ul");
        let a = doc.create_element("li");
        doc.append_child(root, a);
        assert!(doc.is_alive(a));

        doc.remove(a);
        assert!(!doc.is_alive(a));
        assert!(doc.children_of(root).is_empty());

        let b = doc.create_element("li");
        assert!(doc.is_alive(b));
        assert!(!doc.is_alive(a));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
    }

    #[test]
    fn remove_frees_subtree() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let all: Vec<_> = doc.traverse(root).collect();
        doc.remove(root);
        assert!(all.iter().all(|n| !doc.is_alive(*n)));
        assert!(doc.is_empty());
    }

    #[test]
    fn append_moves_and_rejects_cycles() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let c = doc.create_element("span");
        doc.append_child(a, c);
        doc.append_child(b, c);
        assert!(doc.children_of(a).is_empty());
        assert_eq!(doc.parent_of(c), Some(b));

        doc.append_child(c, b);
        assert_eq!(doc.parent_of(b), None, "cannot append an ancestor");
    }

    #[test]
    fn insert_child_positions() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let items: Vec<_> = (0..3).map(|_| doc.create_element("li")).collect();
        for i in &items {
            doc.append_child(list, *i);
        }
        doc.insert_child(list, items[2], 0);
        assert_eq!(doc.children_of(list), [items[2], items[0], items[1]]);
        assert_eq!(doc.index_in_parent(items[1]), Some(2));
        doc.insert_child(list, items[2], 99);
        assert_eq!(doc.children_of(list), [items[0], items[1], items[2]]);
    }

    #[test]
    fn clone_is_independent() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let copy = doc.clone_subtree(root, true).unwrap();
        assert_ne!(copy, root);
        assert_eq!(doc.parent_of(copy), None);
        assert_eq!(doc.traverse(copy).count(), 5);

        let note = doc.query_attribute(copy, "data-name", Some("note"))[0];
        doc.set_markup(note, "changed");
        assert_eq!(doc.text_content(root), "n");
        assert_eq!(doc.text_content(copy), "changed");

        let shallow = doc.clone_subtree(root, false).unwrap();
        assert!(doc.children_of(shallow).is_empty());
        assert_eq!(doc.clone_subtree(NodeId::new(999, 1), true), None);
    }

    #[test]
    fn control_properties() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let title = doc.query_attribute(root, "name", Some("title"))[0];
        let done = doc.query_attribute(root, "name", Some("done"))[0];

        assert_eq!(doc.control_kind(title), ControlKind::Input);
        assert_eq!(doc.control_kind(done), ControlKind::Checkbox);
        assert_eq!(doc.control_kind(root), ControlKind::None);

        assert_eq!(doc.value(title), "x", "falls back to the attribute");
        doc.set_value(title, "y");
        assert_eq!(doc.value(title), "y");
        assert!(doc.checked(done));
        doc.set_checked(done, false);

        doc.reset_control(title);
        doc.reset_control(done);
        assert_eq!(doc.value(title), "x");
        assert!(doc.checked(done));
    }

    #[test]
    fn set_markup_replaces_children() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let fieldset = doc.children_of(root)[1];
        let input = doc.children_of(fieldset)[0];
        doc.set_markup(fieldset, "<b>gone</b>");
        assert!(!doc.is_alive(input));
        assert_eq!(doc.markup(fieldset), Some("<b>gone</b>"));
    }

    #[test]
    fn classes_are_idempotent() {
        let mut doc = Document::new();
        let n = doc.create_element("div");
        doc.add_class(n, "a");
        doc.add_class(n, "b");
        doc.add_class(n, "a");
        assert_eq!(doc.attribute(n, "class"), Some("a b"));
        doc.remove_class(n, "a");
        doc.remove_class(n, "a");
        assert_eq!(doc.attribute(n, "class"), Some("b"));
        assert!(doc.has_class(n, "b"));
    }

    #[test]
    fn flags_and_size() {
        let mut doc = Document::new();
        let n = doc.create_element("div");
        doc.set_flag(n, NodeFlags::HIDDEN, true);
        doc.set_flag(n, NodeFlags::HIDDEN, true);
        assert!(doc.is_hidden(n));
        doc.set_flag(n, NodeFlags::HIDDEN, false);
        assert_eq!(doc.flags(n), Some(NodeFlags::empty()));

        doc.set_size(n, Some(Size::new(10.0, 20.0)));
        assert_eq!(doc.size(n), Some(Size::new(10.0, 20.0)));
    }

    #[test]
    fn pruned_traversal_yields_but_skips_below() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let fieldset = doc.children_of(root)[1];
        let prune = |n: NodeId| n == fieldset;
        let seen: Vec<_> = doc.traverse(root).prune(&prune).collect();
        assert_eq!(seen.len(), 4);
        assert!(seen.contains(&fieldset));
    }

    #[test]
    fn selector_queries_skip_root() {
        let mut doc = Document::new();
        let root = sample(&mut doc);
        let form_sel = Selector::parse("form").unwrap();
        assert_eq!(doc.query_selector(root, &form_sel), None);
        let inputs = doc.query_selector_all(root, &Selector::parse("input").unwrap());
        assert_eq!(inputs.len(), 2);
    }
}
