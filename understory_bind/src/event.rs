// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde_json::Value;
use understory_dom::NodeId;

/// Payload carried by native dispatch and by element event buses.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name as emitted, e.g. `"click"` or `"tab.show"`.
    pub name: String,
    /// Node the event was dispatched at, if any.
    pub target: Option<NodeId>,
    /// Event-specific data.
    pub detail: Value,
}

impl Event {
    /// An untargeted event.
    pub fn new(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            target: None,
            detail,
        }
    }

    /// Set the target node.
    #[must_use]
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}
