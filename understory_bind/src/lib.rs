// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_bind --heading-base-level=0

//! Understory Bind: data binding and bindable elements over an Understory DOM.
//!
//! This crate connects JSON data to a live [`understory_dom::Document`]:
//!
//! - [`binder`] assigns the values of a data object to the nodes that carry a binding
//!   attribute (`data-name` by default), delegating to nested components.
//! - [`Element`] is the base every widget embeds: a root node, a namespaced
//!   [`EventBus`](understory_event_bus::EventBus), a cached binding map, and the last
//!   rendered data.
//! - [`Host`] owns the document together with the component registry and the native
//!   listeners, and dispatches native events with bubbling.
//! - [`data`] holds the pure helpers: [`data::flatten`], [`data::unflatten`],
//!   [`data::deep_extend`], [`data::random_string`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use understory_bind::{Element, Host, mount};
//! use understory_dom::El;
//!
//! let mut host = Host::new();
//! let card = Element::new(&mut host, "div").with_markup(|doc, root| {
//!     doc.build(Some(root), &El::new("h2").attr("data-name", "title"));
//!     doc.build(Some(root), &El::new("p").attr("data-name", "author.name"));
//! });
//! let card = mount(&mut host, card).unwrap();
//!
//! card.borrow_mut()
//!     .render(&mut host, &json!({"title": "Notes", "author": {"name": "Ada"}}))
//!     .unwrap();
//!
//! let root = card.borrow().root();
//! assert_eq!(host.doc().text_content(root), "NotesAda");
//! ```
//!
//! ## API overview
//!
//! - [`Host`]: document owner; [`Host::attach`] makes a node bindable,
//!   [`Host::dispatch`] runs native listeners.
//! - [`Element`]: mount, render, presentation helpers, and `on`/`once`/`off`/`emit`.
//! - [`Bindable`] and [`Widget`]: the seams widgets implement; [`mount`] wires a widget
//!   into the host.
//! - [`ElementConfig`] and [`merge_config`]: camelCase JSON configuration merged over
//!   defaults.
//! - [`BindError`]: everything that can go wrong while binding or mounting.

pub mod binder;
pub mod data;

mod component;
mod config;
mod element;
mod error;
mod event;
mod host;

pub use component::{Bindable, Widget, mount};
pub use config::{ElementConfig, merge_config};
pub use element::Element;
pub use error::BindError;
pub use event::Event;
pub use host::{Component, Host, Listener, ListenerId, Outcome};
