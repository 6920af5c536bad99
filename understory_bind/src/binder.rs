// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute-based data binding.
//!
//! A node carrying the binding attribute (default `data-name`) with value `K` is a
//! target for data key `K`. Nested objects are addressed with dot-joined keys, so
//! `{"a": {"b": 1}}` binds `1` to `data-name="a.b"` and the whole `{"b": 1}` object
//! to a component bound at `data-name="a"`.
//!
//! Values are applied with these rules, first match wins:
//! 1. a component rooted at the node renders the value itself;
//! 2. a checkbox is checked iff the value is truthy;
//! 3. a radio is checked iff its `value` attribute equals the value's text;
//! 4. other inputs, selects and textareas get their `value` property set;
//! 5. anything else gets the value as inner markup.
//!
//! Nodes with `data-render="false"` are skipped.

use indexmap::IndexMap;
use serde_json::Value;
use smallvec::SmallVec;
use understory_dom::{ControlKind, NodeId};

use crate::data::{is_truthy, value_text};
use crate::{BindError, Host};

/// Binding attribute used outside of forms.
pub const DEFAULT_ATTRIBUTE: &str = "data-name";

/// Attribute that opts a node out of binding when set to `"false"`.
pub const OPT_OUT_ATTRIBUTE: &str = "data-render";

/// Binding key to the nodes carrying it, in document order.
pub type BindingMap = IndexMap<String, SmallVec<[NodeId; 1]>>;

/// Where [`render`] looks up the nodes for a key.
#[derive(Copy, Clone, Debug)]
pub enum Targets<'a> {
    /// A map built by [`discover`] when the element was mounted.
    Cached(&'a BindingMap),
    /// A fresh attribute query below the root on every key.
    Query,
}

/// Collect the binding targets below `root`.
///
/// `root` itself is excluded. Nested components are included but not descended
/// into, since they bind their own subtree.
pub fn discover(host: &Host, root: NodeId, attribute: &str) -> BindingMap {
    let mut map = BindingMap::new();
    let nested = |n: NodeId| n != root && host.is_component(n);
    for node in host.doc().traverse(root).prune(&nested).skip(1) {
        if let Some(key) = host.doc().attribute(node, attribute) {
            map.entry(key.to_owned()).or_default().push(node);
        }
    }
    map
}

fn query(host: &Host, root: NodeId, attribute: &str, key: &str) -> SmallVec<[NodeId; 1]> {
    // A component rooted at `root` is the one rendering; never bind it to itself.
    let skip_root = host.is_component(root);
    let nested = |n: NodeId| n != root && host.is_component(n);
    host.doc()
        .traverse(root)
        .prune(&nested)
        .skip(usize::from(skip_root))
        .filter(|n| host.doc().attribute(*n, attribute) == Some(key))
        .collect()
}

/// Bind `data` into the subtree of `root`.
///
/// Objects are walked recursively; every key path, intermediate ones included, is
/// looked up. Keys without targets are skipped. `null` data does nothing, and any
/// other non-object value is applied to `root` itself.
pub fn render(
    host: &mut Host,
    root: NodeId,
    data: &Value,
    targets: Targets<'_>,
    attribute: &str,
) -> Result<(), BindError> {
    if !host.doc().is_alive(root) {
        return Err(BindError::StaleNode(root));
    }
    match data {
        Value::Null => Ok(()),
        Value::Object(map) => {
            let mut path = String::new();
            walk(host, root, map, &mut path, targets, attribute)
        }
        other => {
            apply_plain(host, root, other);
            Ok(())
        }
    }
}

fn walk(
    host: &mut Host,
    root: NodeId,
    map: &serde_json::Map<String, Value>,
    path: &mut String,
    targets: Targets<'_>,
    attribute: &str,
) -> Result<(), BindError> {
    for (key, value) in map {
        let len = path.len();
        if len > 0 {
            path.push('.');
        }
        path.push_str(key);

        let nodes = match targets {
            Targets::Cached(bound) => bound.get(path.as_str()).cloned().unwrap_or_default(),
            Targets::Query => query(host, root, attribute, path),
        };
        if nodes.is_empty() {
            tracing::trace!(key = %path, "no binding target");
        }
        for node in nodes {
            apply(host, node, value)?;
        }
        if let Value::Object(inner) = value {
            walk(host, root, inner, path, targets, attribute)?;
        }

        path.truncate(len);
    }
    Ok(())
}

/// Apply one value to one bound node.
pub fn apply(host: &mut Host, node: NodeId, value: &Value) -> Result<(), BindError> {
    if !host.doc().is_alive(node) {
        tracing::debug!(?node, "skipping stale binding target");
        return Ok(());
    }
    if host.doc().attribute(node, OPT_OUT_ATTRIBUTE) == Some("false") {
        return Ok(());
    }
    if let Some(component) = host.component(node) {
        let Ok(mut component) = component.try_borrow_mut() else {
            return Err(BindError::Reentrant(node));
        };
        return component.render(host, value);
    }
    if !value.is_object() {
        apply_plain(host, node, value);
    }
    Ok(())
}

fn apply_plain(host: &mut Host, node: NodeId, value: &Value) {
    let kind = host.doc().control_kind(node);
    match kind {
        ControlKind::Checkbox => host.doc_mut().set_checked(node, is_truthy(value)),
        ControlKind::Radio => {
            let declared = host.doc().attribute(node, "value").unwrap_or("on");
            let checked = declared == value_text(value);
            host.doc_mut().set_checked(node, checked);
        }
        k if k.has_value() => host.doc_mut().set_value(node, &value_text(value)),
        _ => {
            let text = value_text(value);
            if host.doc().markup(node) != Some(&*text) || !host.doc().children_of(node).is_empty()
            {
                host.set_markup(node, &text);
            }
        }
    }
}

/// Render `data` into `node`, delegating to its component if it has one.
///
/// Plain nodes are bound with a fresh query on [`DEFAULT_ATTRIBUTE`], `node`
/// included.
pub fn render_node(host: &mut Host, node: NodeId, data: &Value) -> Result<(), BindError> {
    if host.is_component(node) {
        return apply(host, node, data);
    }
    render(host, node, data, Targets::Query, DEFAULT_ATTRIBUTE)
}
