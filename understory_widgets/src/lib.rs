// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_widgets --heading-base-level=0

//! Understory Widgets: forms, tables, pagers, and wizards.
//!
//! Each widget embeds an [`understory_bind::Element`] and implements
//! [`understory_bind::Widget`], so it renders data through the same binder and can
//! be nested inside other widgets or instantiated by a keyed reconciler.
//!
//! - [`Form`]: fields bound and serialized by `name`; caller-supplied `get`, `submit`
//!   and `validate` requests whose outcomes become `success`, `fail`, `error` and
//!   `load` events.
//! - [`Table`]: a header built from a [`TableSchema`] and body rows reconciled by
//!   primary key.
//! - [`Pager`]: `next`/`previous`/`page` navigation with a debounced page input.
//! - [`Wizard`]: a form composed with a [`TabNav`], emitting `tab.show`.
//!
//! Requests return futures; the widgets never spawn them. Drive them with the
//! host's executor:
//!
//! ```rust
//! use futures::executor::block_on;
//! use serde_json::json;
//! use understory_bind::Host;
//! use understory_dom::El;
//! use understory_widgets::{Form, FormConfig, RequestOutcome};
//!
//! let mut host = Host::new();
//! let root = host.doc_mut().build(
//!     None,
//!     &El::new("form").child(El::new("input").attr("name", "user.name").attr("value", "Ada")),
//! );
//! let form = Form::adopt(root, FormConfig::default());
//! let outcome = block_on(form.submit(&host));
//! assert_eq!(outcome, RequestOutcome::Success(json!({"user": {"name": "Ada"}})));
//! ```

mod form;
mod pager;
mod table;
mod wizard;

pub use form::{
    CheckboxSerializationMode, DataSerializationMode, Form, FormConfig, FormError, Request,
    RequestCallbacks, RequestFuture, RequestOutcome, request,
};
pub use pager::{DEFAULT_DEBOUNCE_MS, Pager, PagerConfig};
pub use table::{Table, TableConfig, TableSchema};
pub use wizard::{TabNav, Wizard, WizardConfig};
