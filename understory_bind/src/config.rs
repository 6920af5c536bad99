// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element configuration and the default/override merge.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::BindError;
use crate::binder::DEFAULT_ATTRIBUTE;
use crate::data::deep_extend;

/// Configuration shared by every bindable element.
///
/// Decoded from camelCase JSON, for example
/// `{"renderAttribute": "name", "elements": {"next": "button.next"}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementConfig {
    /// Logical part name to the selector resolving it below the root.
    pub elements: BTreeMap<String, String>,
    /// Attribute naming binding targets.
    pub render_attribute: String,
    /// Display the root as a block.
    pub display_block: bool,
    /// Attributes copied onto the root when mounting.
    pub attributes: BTreeMap<String, String>,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            elements: BTreeMap::new(),
            render_attribute: DEFAULT_ATTRIBUTE.to_owned(),
            display_block: false,
            attributes: BTreeMap::new(),
        }
    }
}

impl ElementConfig {
    /// The default configuration with JSON `overrides` merged over it.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

/// Merge JSON `overrides` over `defaults` and decode the result.
///
/// Nested objects merge key by key, so overriding one entry of a map keeps the
/// other defaults.
pub fn merge_config<T>(defaults: &T, overrides: &Value) -> Result<T, BindError>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_json::to_value(defaults)?;
    if !overrides.is_null() {
        deep_extend(&mut merged, overrides);
    }
    Ok(serde_json::from_value(merged)?)
}
