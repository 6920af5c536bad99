// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::{BindError, Element, Host};

/// Something the data binder can delegate a value to.
///
/// Attach an implementation at a node with [`Host::attach`]; from then on binding a
/// value to that node calls [`Bindable::render`] instead of assigning properties.
pub trait Bindable {
    /// Render `data` into the component's subtree.
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError>;
}

/// A bindable built around an [`Element`].
///
/// Concrete widgets embed an `Element` and expose it here; [`mount`] drives the
/// element's mount and then the widget's own [`Widget::mounted`] hook.
pub trait Widget: Bindable {
    /// The embedded element.
    fn element(&self) -> &Element;

    /// The embedded element, mutably.
    fn element_mut(&mut self) -> &mut Element;

    /// Called once the element is mounted, before the widget is registered.
    fn mounted(&mut self, _host: &mut Host) -> Result<(), BindError> {
        Ok(())
    }
}

/// Mount `widget` and register it as the component at its root.
///
/// This is the explicit replacement for a "connected to the document" callback: the
/// element discovers its bindings, resolves its parts, runs the widget's hook, and
/// becomes bindable for any parent that renders data into it.
pub fn mount<W: Widget + 'static>(host: &mut Host, widget: W) -> Result<Rc<RefCell<W>>, BindError> {
    let widget = Rc::new(RefCell::new(widget));
    let root = {
        let mut w = widget.borrow_mut();
        w.element_mut().mount(host)?;
        w.mounted(host)?;
        w.element().root()
    };
    host.attach(root, widget.clone());
    Ok(widget)
}
