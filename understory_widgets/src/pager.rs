// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page navigation with a debounced page-number input.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use understory_bind::{
    BindError, Bindable, Element, ElementConfig, Host, Outcome, Widget, merge_config, mount,
};
use understory_dom::{El, NodeId};
use understory_event_bus::Debouncer;

/// Quiescence window for typed page numbers, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Pager configuration.
///
/// The parts `prev`, `next` and `input` drive navigation when present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PagerConfig {
    /// Base element options.
    #[serde(flatten)]
    pub element: ElementConfig,
    /// Debounce window for the page-number input.
    pub debounce_ms: u64,
}

impl Default for PagerConfig {
    fn default() -> Self {
        let elements = BTreeMap::from([
            ("prev".to_owned(), "[data-action=prev]".to_owned()),
            ("next".to_owned(), "[data-action=next]".to_owned()),
            ("input".to_owned(), "input[name=page]".to_owned()),
        ]);
        Self {
            element: ElementConfig {
                elements,
                ..ElementConfig::default()
            },
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl PagerConfig {
    /// The defaults with JSON `overrides` merged over them.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

/// A pager over `1..=page_count`.
///
/// [`Pager::next`], [`Pager::previous`] and [`Pager::set_page`] clamp to the valid
/// range. A change emits `next` or `previous` as appropriate, followed by `page`;
/// each carries `{"page": n}`. Typed page numbers go through a [`Debouncer`]: feed
/// them with [`Pager::input`] and call [`Pager::poll`] when the deadline passes.
#[derive(Debug)]
pub struct Pager {
    element: Element,
    page: usize,
    page_count: usize,
    debouncer: Debouncer<usize>,
}

impl Pager {
    /// Create a pager with the default markup.
    pub fn new(host: &mut Host, config: PagerConfig) -> Self {
        let element = Element::new(host, "nav")
            .with_config(config.element)
            .with_markup(|doc, root| {
                doc.build(
                    Some(root),
                    &El::new("button").attr("data-action", "prev").text("Previous"),
                );
                doc.build(
                    Some(root),
                    &El::new("input").attr("name", "page").attr("data-name", "page"),
                );
                doc.build(Some(root), &El::new("span").attr("data-name", "pageCount"));
                doc.build(
                    Some(root),
                    &El::new("button").attr("data-action", "next").text("Next"),
                );
            });
        Self {
            element,
            page: 1,
            page_count: 1,
            debouncer: Debouncer::new(config.debounce_ms),
        }
    }

    /// Mount `pager` and wire its `prev`, `next` and `input` parts.
    ///
    /// Native `input` events read the part's value and the `timeStamp` field of
    /// the event detail.
    pub fn mount(host: &mut Host, pager: Self) -> Result<Rc<RefCell<Self>>, BindError> {
        let pager = mount(host, pager)?;
        let (prev, next, input) = {
            let p = pager.borrow();
            let el = p.element();
            (el.part("prev"), el.part("next"), el.part("input"))
        };
        if let Some(node) = prev {
            listen(host, &pager, node, "click", |p, host, _| p.previous(host).map(drop));
        }
        if let Some(node) = next {
            listen(host, &pager, node, "click", |p, host, _| p.next(host).map(drop));
        }
        if let Some(node) = input {
            listen(host, &pager, node, "input", move |p, host, detail| {
                let now = detail.get("timeStamp").and_then(Value::as_u64).unwrap_or(0);
                let text = host.doc().value(node).to_owned();
                p.input(&text, now);
                Ok(())
            });
        }
        pager.borrow_mut().sync(host)?;
        Ok(pager)
    }

    /// Current page, starting at 1.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages, at least 1.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Set the page count, clamping the current page into range.
    pub fn set_page_count(&mut self, host: &mut Host, count: usize) -> Result<(), BindError> {
        self.page_count = count.max(1);
        self.page = self.page.min(self.page_count);
        self.sync(host)
    }

    /// Go to `page` (clamped). Returns whether the page changed.
    pub fn set_page(&mut self, host: &mut Host, page: usize) -> Result<bool, BindError> {
        self.go(host, page, None)
    }

    /// Go to the next page. Returns false on the last page.
    pub fn next(&mut self, host: &mut Host) -> Result<bool, BindError> {
        self.go(host, self.page.saturating_add(1), Some("next"))
    }

    /// Go to the previous page. Returns false on the first page.
    pub fn previous(&mut self, host: &mut Host) -> Result<bool, BindError> {
        self.go(host, self.page.saturating_sub(1), Some("previous"))
    }

    fn go(&mut self, host: &mut Host, page: usize, kind: Option<&str>) -> Result<bool, BindError> {
        let page = page.clamp(1, self.page_count);
        if page == self.page {
            // Restore the input in case it holds an out-of-range number.
            self.sync(host)?;
            return Ok(false);
        }
        self.page = page;
        self.sync(host)?;
        let detail = json!({"page": page});
        if let Some(kind) = kind {
            self.element.emit(kind, detail.clone());
        }
        self.element.emit("page", detail);
        Ok(true)
    }

    /// Record typed text at `now`.
    ///
    /// Text that is not a page number (an emptied field, say) cancels the
    /// pending page instead of scheduling one.
    pub fn input(&mut self, text: &str, now: u64) {
        match text.trim().parse::<usize>() {
            Ok(page) => {
                self.debouncer.input(page, now);
            }
            Err(_) => {
                let dropped = self.debouncer.cancel();
                tracing::trace!(text, ?dropped, "non-numeric page input cancels pending page");
            }
        }
    }

    /// When the debounced input is due at `now`, go to that page.
    pub fn poll(&mut self, host: &mut Host, now: u64) -> Result<bool, BindError> {
        match self.debouncer.poll(now) {
            Some(page) => self.set_page(host, page),
            None => Ok(false),
        }
    }

    /// When the pending input becomes due, if any.
    pub fn deadline(&self) -> Option<u64> {
        self.debouncer.deadline()
    }

    fn sync(&mut self, host: &mut Host) -> Result<(), BindError> {
        let state = json!({"page": self.page, "pageCount": self.page_count});
        self.element.render(host, &state)
    }
}

/// A native listener on `node` that drives the pager through a weak handle.
fn listen(
    host: &mut Host,
    pager: &Rc<RefCell<Pager>>,
    node: NodeId,
    kind: &str,
    action: impl Fn(&mut Pager, &mut Host, &Value) -> Result<(), BindError> + 'static,
) {
    let weak = Rc::downgrade(pager);
    host.add_listener(node, kind, move |host, event| {
        let Some(pager) = weak.upgrade() else {
            return Outcome::Continue;
        };
        let Ok(mut pager) = pager.try_borrow_mut() else {
            tracing::warn!("pager is busy; native event dropped");
            return Outcome::Continue;
        };
        if let Err(err) = action(&mut *pager, host, &event.detail) {
            tracing::warn!(%err, "pager navigation failed");
        }
        Outcome::Continue
    });
}

impl Bindable for Pager {
    /// Accepts `{"page": n, "pageCount": m}`; missing fields keep their value.
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        let field = |name: &str| {
            data.get(name)
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
        };
        if let Some(count) = field("pageCount") {
            self.page_count = count.max(1);
        }
        if let Some(page) = field("page") {
            self.page = page;
        }
        self.page = self.page.clamp(1, self.page_count);
        self.sync(host)
    }
}

impl Widget for Pager {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }
}
