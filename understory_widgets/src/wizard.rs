// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-step forms: a [`Form`] composed with a [`TabNav`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use understory_bind::data::random_string;
use understory_bind::{BindError, Bindable, Element, Host, Widget, merge_config, mount};
use understory_dom::{NodeFlags, NodeId, Selector};

use crate::form::{Form, FormConfig, FormWidget, RequestCallbacks, bridge_native};

/// Tab panels of a container, exactly one of which is visible.
#[derive(Clone, Debug, Default)]
pub struct TabNav {
    tabs: Vec<NodeId>,
    current: Option<usize>,
}

impl TabNav {
    /// Collect the panels matching `selector` below `root`.
    ///
    /// Panels without an `id` get a random one.
    pub fn discover(host: &mut Host, root: NodeId, selector: &Selector) -> Self {
        let tabs = host.doc().query_selector_all(root, selector);
        for &tab in &tabs {
            if !host.doc().has_attribute(tab, "id") {
                let id = format!("tab-{}", random_string(8));
                host.doc_mut().set_attribute(tab, "id", &id);
            }
        }
        Self { tabs, current: None }
    }

    /// Number of panels.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether there are no panels.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// The panels in document order.
    pub fn tabs(&self) -> &[NodeId] {
        &self.tabs
    }

    /// Index of the visible panel.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Show panel `index` and hide the others. Returns false if out of range.
    pub fn select(&mut self, host: &mut Host, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        for (i, &tab) in self.tabs.iter().enumerate() {
            host.doc_mut().set_flag(tab, NodeFlags::HIDDEN, i != index);
        }
        self.current = Some(index);
        true
    }
}

/// Wizard configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardConfig {
    /// Form options.
    #[serde(flatten)]
    pub form: FormConfig,
    /// Selector of the tab panels.
    pub tab_selector: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            form: FormConfig::default(),
            tab_selector: "[data-tab]".to_owned(),
        }
    }
}

impl WizardConfig {
    /// The defaults with JSON `overrides` merged over them.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

/// A form split into tabs.
///
/// Panels are discovered when mounted and the first one is shown. Showing a
/// panel emits `tab.show` with `{"index", "id", "name"}`, where `name` is the
/// panel's `data-tab` value. [`Wizard::reset`] returns to the first panel and
/// emits `reset`, so handlers on `reset.<tab>` run too.
#[derive(Debug)]
pub struct Wizard {
    form: Form,
    tabs: TabNav,
    tab_selector: Selector,
}

impl Wizard {
    /// Wrap an existing form node.
    pub fn adopt(root: NodeId, config: WizardConfig) -> Result<Self, BindError> {
        let tab_selector = Selector::parse(&config.tab_selector)?;
        Ok(Self {
            form: Form::adopt(root, config.form),
            tabs: TabNav::default(),
            tab_selector,
        })
    }

    /// Set the request callbacks of the form.
    #[must_use]
    pub fn with_requests(mut self, requests: RequestCallbacks) -> Self {
        self.form = self.form.with_requests(requests);
        self
    }

    /// Mount `wizard` and bridge native `submit` and `reset` events.
    pub fn mount(host: &mut Host, wizard: Self) -> Result<Rc<RefCell<Self>>, BindError> {
        let wizard = mount(host, wizard)?;
        bridge_native(host, &wizard);
        Ok(wizard)
    }

    /// The form.
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// The form, mutably.
    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    /// The tab panels.
    pub fn tabs(&self) -> &TabNav {
        &self.tabs
    }

    /// Show panel `index`. Returns false if out of range.
    pub fn show(&mut self, host: &mut Host, index: usize) -> bool {
        if !self.tabs.select(host, index) {
            return false;
        }
        let tab = self.tabs.tabs()[index];
        let detail = json!({
            "index": index,
            "id": host.doc().attribute(tab, "id"),
            "name": host.doc().attribute(tab, "data-tab"),
        });
        self.form.element().emit("tab.show", detail);
        true
    }

    /// Show the next panel. Returns false on the last one.
    pub fn next_tab(&mut self, host: &mut Host) -> bool {
        let next = self.tabs.current().map_or(0, |i| i + 1);
        self.show(host, next)
    }

    /// Show the previous panel. Returns false on the first one.
    pub fn previous_tab(&mut self, host: &mut Host) -> bool {
        match self.tabs.current() {
            Some(i) if i > 0 => self.show(host, i - 1),
            _ => false,
        }
    }

    /// Reset the fields, return to the first panel, and emit `reset`.
    pub fn reset(&mut self, host: &mut Host) {
        self.show(host, 0);
        self.form.reset(host);
    }
}

impl Bindable for Wizard {
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        self.form.render(host, data)
    }
}

impl Widget for Wizard {
    fn element(&self) -> &Element {
        self.form.element()
    }

    fn element_mut(&mut self) -> &mut Element {
        self.form.element_mut()
    }

    fn mounted(&mut self, host: &mut Host) -> Result<(), BindError> {
        let root = self.form.element().root();
        self.tabs = TabNav::discover(host, root, &self.tab_selector);
        self.show(host, 0);
        Ok(())
    }
}

impl FormWidget for Wizard {
    fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    fn native_reset(&mut self, host: &mut Host) {
        self.show(host, 0);
        self.form.reset_fields(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use understory_dom::El;

    fn signup(host: &mut Host) -> Rc<RefCell<Wizard>> {
        let root = host.doc_mut().build(
            None,
            &El::new("form")
                .child(
                    El::new("fieldset")
                        .attr("data-tab", "account")
                        .attr("id", "account")
                        .child(El::new("input").attr("name", "email").attr("value", "a@b")),
                )
                .child(
                    El::new("fieldset")
                        .attr("data-tab", "profile")
                        .child(El::new("input").attr("name", "name")),
                )
                .child(
                    El::new("fieldset")
                        .attr("data-tab", "done")
                        .child(El::new("p").text("Thanks")),
                ),
        );
        let wizard = Wizard::adopt(root, WizardConfig::default()).unwrap();
        Wizard::mount(host, wizard).unwrap()
    }

    fn shown(host: &Host, wizard: &Wizard) -> Vec<bool> {
        wizard
            .tabs()
            .tabs()
            .iter()
            .map(|t| !host.doc().is_hidden(*t))
            .collect()
    }

    #[test]
    fn first_tab_is_shown_on_mount() {
        let mut host = Host::new();
        let wizard = signup(&mut host);
        let w = wizard.borrow();
        assert_eq!(w.tabs().len(), 3);
        assert_eq!(w.tabs().current(), Some(0));
        assert_eq!(shown(&host, &w), [true, false, false]);
        for &tab in w.tabs().tabs() {
            assert!(host.doc().attribute(tab, "id").is_some_and(|id| !id.is_empty()));
        }
        assert_eq!(host.doc().attribute(w.tabs().tabs()[0], "id"), Some("account"));
    }

    #[test]
    fn navigation_emits_tab_show() {
        let mut host = Host::new();
        let wizard = signup(&mut host);
        let mut w = wizard.borrow_mut();
        let shown_names: Rc<RefCell<Vec<Value>>> = Rc::default();
        let s = shown_names.clone();
        w.element_mut()
            .on(&mut host, "tab.show", move |e| s.borrow_mut().push(e.detail["name"].clone()));

        assert!(!w.previous_tab(&mut host));
        assert!(w.next_tab(&mut host));
        assert!(w.next_tab(&mut host));
        assert!(!w.next_tab(&mut host));
        assert!(!w.show(&mut host, 7));
        assert_eq!(shown(&host, &w), [false, false, true]);
        assert!(w.previous_tab(&mut host));
        assert_eq!(*shown_names.borrow(), ["profile", "done", "profile"]);
    }

    #[test]
    fn reset_runs_namespaced_handlers_and_returns_to_first_tab() {
        let mut host = Host::new();
        let wizard = signup(&mut host);
        let mut w = wizard.borrow_mut();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        w.element_mut()
            .on(&mut host, "reset.profile", move |_| h.set(h.get() + 1));

        w.render(&mut host, &json!({"email": "x@y", "name": "Ada"})).unwrap();
        w.next_tab(&mut host);
        w.reset(&mut host);

        assert_eq!(hits.get(), 1);
        assert_eq!(w.tabs().current(), Some(0));
        assert_eq!(
            w.form().serialize(&host).unwrap(),
            json!({"email": "a@b", "name": ""})
        );

        w.element_mut().off(&mut host, "reset", false);
        w.reset(&mut host);
        assert_eq!(hits.get(), 2, "direct-only removal keeps reset.profile");
        w.element_mut().off(&mut host, "reset", true);
        w.reset(&mut host);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn native_reset_returns_to_first_tab() {
        let mut host = Host::new();
        let wizard = signup(&mut host);
        let root = wizard.borrow().element().root();
        wizard.borrow_mut().next_tab(&mut host);
        host.dispatch(root, "reset", Value::Null);
        assert_eq!(wizard.borrow().tabs().current(), Some(0));
    }
}
