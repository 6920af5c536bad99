// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_dom --heading-base-level=0

//! Understory DOM: a live, mutable element tree.
//!
//! Understory DOM is the document that bindable elements, data binders, and keyed
//! reconcilers operate on. It models just enough of an HTML document for data-driven
//! rendering:
//!
//! - Elements with a lowercase tag, ordered attributes, and inner markup.
//! - Form-control state: the `value` property (falling back to the `value` attribute)
//!   and the `checked` property.
//! - Presentation state: [`NodeFlags`] (hidden, display-block), class tokens, and an
//!   optional explicit [`kurbo::Size`].
//! - Structure: append/insert/detach/remove, deep or shallow cloning, and
//!   depth-first traversal.
//! - Queries: by attribute, and by compound [`Selector`] (`tag#id.class[attr=value]`).
//!
//! It does not parse HTML, lay anything out, or dispatch events. Markup is stored as
//! text; use [`El`] to describe element subtrees declaratively.
//!
//! ## API overview
//!
//! - [`Document`]: container managing nodes.
//! - [`NodeId`]: generational handle of a node.
//! - [`El`]: declarative subtree description, materialized by [`Document::build`].
//! - [`ControlKind`]: how a node participates in value binding.
//! - [`Selector`]: compound selector used by [`Document::query_selector`].
//!
//! Key operations:
//! - [`Document::create_element`] / [`Document::build`] → [`NodeId`]
//! - [`Document::append_child`] / [`Document::insert_child`] / [`Document::detach`] / [`Document::remove`]
//! - [`Document::clone_subtree`] for template instantiation.
//! - [`Document::query_attribute`] and [`Document::traverse`] for binding discovery.

mod builder;
mod selector;
mod tree;
mod types;

pub use builder::El;
pub use selector::{Selector, SelectorError};
pub use tree::{Document, Traverse};
pub use types::{ControlKind, NodeFlags, NodeId};

pub use kurbo::Size;
