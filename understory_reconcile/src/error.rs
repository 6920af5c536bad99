// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_bind::BindError;
use understory_dom::NodeId;

/// Errors raised by [`KeyedReconciler`](crate::KeyedReconciler).
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The wrapper node is not alive.
    #[error("wrapper node {0:?} is not alive")]
    StaleWrapper(NodeId),
    /// The template node is not alive, so it cannot be cloned.
    #[error("template node {0:?} is not alive")]
    StaleTemplate(NodeId),
    /// The template contains the wrapper, so clones would nest the collection.
    #[error("template node {template:?} contains the wrapper {wrapper:?}")]
    TemplateContainsWrapper {
        /// The template node.
        template: NodeId,
        /// The wrapper node.
        wrapper: NodeId,
    },
    /// A sequence element has no usable primary key.
    #[error("collection entry {index} has no `{key}` primary key")]
    MissingPrimaryKey {
        /// Position of the offending element.
        index: usize,
        /// The configured primary key field.
        key: String,
    },
    /// The data is neither an array nor an object.
    #[error("cannot reconcile {0} data; expected an array or an object")]
    UnsupportedShape(&'static str),
    /// Binding an entry's data failed.
    #[error(transparent)]
    Bind(#[from] BindError),
}
