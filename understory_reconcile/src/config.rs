// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use understory_bind::{BindError, merge_config};

/// Options for a [`KeyedReconciler`](crate::KeyedReconciler).
///
/// Decoded from camelCase JSON such as `{"primaryKey": "uuid", "maxEntries": 50}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconcilerConfig {
    /// Field of each sequence element that identifies its entry.
    pub primary_key: String,
    /// Entries past this many in one render are skipped.
    pub max_entries: Option<usize>,
    /// Clone the template with its descendants; `false` clones only the root.
    pub clone_template: bool,
    /// Detach the template node from the document on construction.
    #[serde(rename = "removeOriginalFromDOM")]
    pub remove_original_from_dom: bool,
    /// Remove entries whose key is absent from a render.
    pub prune_untouched_entries: bool,
    /// Move existing entries so that the wrapper follows the incoming order.
    ///
    /// Off by default: a persisting entry keeps its position even when its ordinal
    /// changes, and only new entries are appended.
    pub reorder_existing: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            primary_key: "id".to_owned(),
            max_entries: None,
            clone_template: true,
            remove_original_from_dom: true,
            prune_untouched_entries: true,
            reorder_existing: false,
        }
    }
}

impl ReconcilerConfig {
    /// The defaults with JSON `overrides` merged over them.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camel_case_overrides() {
        let config = ReconcilerConfig::with_overrides(&json!({
            "primaryKey": "uuid",
            "maxEntries": 2,
            "removeOriginalFromDOM": false
        }))
        .unwrap();
        assert_eq!(config.primary_key, "uuid");
        assert_eq!(config.max_entries, Some(2));
        assert!(!config.remove_original_from_dom);
        assert!(config.clone_template);
        assert!(config.prune_untouched_entries);
        assert!(!config.reorder_existing);
    }
}
