// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_dom::{NodeId, SelectorError};

/// Errors raised while binding data or mounting elements.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A flattened key path is used both as a value and as an object.
    #[error("key path `{0}` is used both as a value and as an object")]
    PathConflict(String),
    /// Configuration could not be encoded or decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A configured part selector does not parse.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// A component was asked to render while it is already rendering.
    #[error("component rooted at {0:?} is already rendering")]
    Reentrant(NodeId),
    /// A component failed for a reason of its own.
    #[error("component rooted at {node:?} failed: {message}")]
    Component {
        /// Root of the failing component.
        node: NodeId,
        /// What went wrong.
        message: String,
    },
    /// The node an element is rooted at has been removed.
    #[error("node {0:?} is not alive")]
    StaleNode(NodeId),
}
