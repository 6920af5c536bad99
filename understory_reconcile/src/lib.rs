// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_reconcile --heading-base-level=0

//! Understory Reconcile: keyed reconciliation of data into element subtrees.
//!
//! A [`KeyedReconciler`] owns the children it creates under a wrapper node. Each
//! render call takes a keyed collection and makes the live entries match it:
//!
//! - a key seen for the first time instantiates the [`Template`], renders the entry
//!   data into it, and appends it to the wrapper;
//! - a key that persists is rendered in place, keeping the same node;
//! - after the walk, keys that were not seen are removed (unless pruning is off).
//!
//! Collections come as an array of objects carrying a primary key (default `"id"`),
//! as a JSON object mapping keys to entry data, or as explicit ordered pairs through
//! [`KeyedReconciler::render_pairs`].
//!
//! Arrays are validated before anything is applied: one element without a primary
//! key aborts the call and leaves every entry as it was.
//!
//! Existing entries are not moved when their position in the data changes; set
//! [`ReconcilerConfig::reorder_existing`] to make the wrapper follow the data order.
//!
//! ## API overview
//!
//! - [`KeyedReconciler::new`]: validate wrapper and template, detach the template.
//! - [`KeyedReconciler::render`] → [`RenderStats`].
//! - [`KeyedReconciler::render_entry`] and [`KeyedReconciler::empty`].
//! - [`data_array_to_data_object`]: array-of-objects to key → object map.

mod config;
mod error;
mod reconciler;

pub use config::ReconcilerConfig;
pub use error::ReconcileError;
pub use reconciler::{
    KeyedReconciler, RenderStats, Template, data_array_to_data_object, primary_key_of,
};
