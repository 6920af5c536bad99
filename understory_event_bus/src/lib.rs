// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_event_bus --heading-base-level=0

//! Understory Event Bus: a namespaced handler registry for UI events.
//!
//! Handlers are registered on dotted paths such as `"click"`, `"click.toolbar"` or
//! `"reset.tab1"`. Each segment of a path is a node in a registry tree, so a
//! namespace can be emitted or removed as a unit:
//!
//! - Emitting a path invokes the handlers at that exact node **and** every node below it.
//!   Emitting `"click"` reaches `"click.toolbar"`, but emitting `"click.toolbar"` never
//!   reaches the bare `"click"` handlers.
//! - Removing a path with descendants drops the whole namespace; removing it without
//!   descendants only clears the handlers registered directly on it.
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//! use understory_event_bus::EventBus;
//!
//! let bus: EventBus<u32> = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let s = seen.clone();
//! bus.on("click", move |v| s.set(s.get() + v));
//! let s = seen.clone();
//! bus.on("click.toolbar", move |v| s.set(s.get() + 10 * v));
//!
//! bus.emit("click.toolbar", &1);
//! assert_eq!(seen.get(), 10);
//!
//! bus.emit("click", &1);
//! assert_eq!(seen.get(), 21);
//!
//! bus.off("click.toolbar", true);
//! assert_eq!(bus.count_handlers("click"), 1);
//! ```
//!
//! [`EventBus`] is a handle: clones share one registry, and handlers may register,
//! remove, or emit on the same bus while they run.
//!
//! The crate also provides [`Debouncer`], a small state machine that coalesces rapid
//! inputs into a single emission after a quiescence window. It does not own a timer;
//! the host feeds it millisecond timestamps.

mod bus;
mod debounce;

pub use bus::{EventBus, Handler};
pub use debounce::Debouncer;
