// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Forms: serialization, request callbacks, and reset.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use understory_bind::data::unflatten;
use understory_bind::{
    BindError, Bindable, Element, ElementConfig, Event, Host, Outcome, Widget, merge_config, mount,
};
use understory_dom::{ControlKind, NodeId};
use understory_event_bus::EventBus;

/// How checkboxes serialize.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckboxSerializationMode {
    /// `true` / `false`.
    #[default]
    Boolean,
    /// The checkbox `value` (default `"on"`) when checked; omitted otherwise.
    Value,
}

/// Shape of serialized form data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSerializationMode {
    /// Dotted field names become nested objects.
    #[default]
    Nested,
    /// Field names are kept as flat keys.
    Flat,
}

/// Form configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormConfig {
    /// Base element options; the binding attribute defaults to `name`.
    #[serde(flatten)]
    pub element: ElementConfig,
    /// Checkbox serialization.
    pub checkbox_serialization_mode: CheckboxSerializationMode,
    /// Nested or flat output.
    pub data_serialization_mode: DataSerializationMode,
    /// Fields carrying any of these attributes are left out of serialization.
    pub excluded_field_attributes: Vec<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            element: ElementConfig {
                render_attribute: "name".to_owned(),
                ..ElementConfig::default()
            },
            checkbox_serialization_mode: CheckboxSerializationMode::default(),
            data_serialization_mode: DataSerializationMode::default(),
            excluded_field_attributes: vec!["disabled".to_owned(), "data-exclude".to_owned()],
        }
    }
}

impl FormConfig {
    /// The defaults with JSON `overrides` merged over them.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

/// Failure of a caller-supplied request.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormError {
    /// The request was rejected, e.g. by validation. Emitted as `fail`.
    #[error("request rejected: {0}")]
    Rejected(Value),
    /// The request could not complete. Emitted as `error`.
    #[error("request failed: {0}")]
    Transport(String),
}

/// Future returned by a request callback.
pub type RequestFuture = LocalBoxFuture<'static, Result<Value, FormError>>;

/// A caller-supplied request: `get`, `submit` or `validate`.
pub type Request = Rc<dyn Fn(Value) -> RequestFuture>;

/// The request callbacks of a form. Absent callbacks are skipped.
#[derive(Clone, Default)]
pub struct RequestCallbacks {
    /// Loads form data for a query.
    pub get: Option<Request>,
    /// Sends serialized form data.
    pub submit: Option<Request>,
    /// Checks serialized form data before submitting.
    pub validate: Option<Request>,
}

impl fmt::Debug for RequestCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCallbacks")
            .field("get", &self.get.is_some())
            .field("submit", &self.submit.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Wrap an async closure as a [`Request`].
pub fn request<F, Fut>(f: F) -> Request
where
    F: Fn(Value) -> Fut + 'static,
    Fut: Future<Output = Result<Value, FormError>> + 'static,
{
    Rc::new(move |data| f(data).boxed_local())
}

/// How a request ended. The matching event has already been emitted.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
    /// `success` (or `load`) with the response.
    Success(Value),
    /// `fail` with the rejection reason.
    Fail(Value),
    /// `error` with a message.
    Error(String),
}

fn emit(bus: &EventBus<Event>, root: NodeId, name: &str, detail: Value) {
    bus.emit(name, &Event::new(name, detail).with_target(root));
}

fn settle(
    bus: &EventBus<Event>,
    root: NodeId,
    success: &str,
    result: Result<Value, FormError>,
) -> RequestOutcome {
    match result {
        Ok(response) => {
            emit(bus, root, success, response.clone());
            RequestOutcome::Success(response)
        }
        Err(FormError::Rejected(reason)) => {
            tracing::debug!(%reason, "request rejected");
            emit(bus, root, "fail", reason.clone());
            RequestOutcome::Fail(reason)
        }
        Err(FormError::Transport(message)) => {
            tracing::warn!(%message, "request failed");
            emit(bus, root, "error", Value::String(message.clone()));
            RequestOutcome::Error(message)
        }
    }
}

/// A form widget.
///
/// Fields are bound and serialized through their `name` attribute. Dotted names map
/// to nested data in [`DataSerializationMode::Nested`].
pub struct Form {
    element: Element,
    config: FormConfig,
    requests: RequestCallbacks,
    pending: Vec<LocalBoxFuture<'static, RequestOutcome>>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("element", &self.element)
            .field("config", &self.config)
            .field("requests", &self.requests)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Form {
    /// Create a detached `<form>`.
    pub fn new(host: &mut Host, config: FormConfig) -> Self {
        let root = host.doc_mut().create_element("form");
        Self::adopt(root, config)
    }

    /// Wrap an existing form node.
    pub fn adopt(root: NodeId, config: FormConfig) -> Self {
        Self {
            element: Element::adopt(root).with_config(config.element.clone()),
            config,
            requests: RequestCallbacks::default(),
            pending: Vec::new(),
        }
    }

    /// Set the request callbacks.
    #[must_use]
    pub fn with_requests(mut self, requests: RequestCallbacks) -> Self {
        self.requests = requests;
        self
    }

    /// Transform the embedded element, e.g. to give it default markup.
    #[must_use]
    pub fn map_element(mut self, f: impl FnOnce(Element) -> Element) -> Self {
        self.element = f(self.element);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Mount `form` and bridge native `submit` and `reset` events.
    ///
    /// A native `submit` queues a submission, see [`Form::take_pending`].
    pub fn mount(host: &mut Host, form: Self) -> Result<Rc<RefCell<Self>>, BindError> {
        let form = mount(host, form)?;
        bridge_native(host, &form);
        Ok(form)
    }

    /// Named controls in document order, not descending into nested components.
    fn controls(&self, host: &Host) -> Vec<NodeId> {
        let root = self.element.root();
        let doc = host.doc();
        let attribute = &self.config.element.render_attribute;
        let nested = |n: NodeId| n != root && host.is_component(n);
        doc.traverse(root)
            .prune(&nested)
            .skip(1)
            .filter(|n| {
                doc.control_kind(*n) != ControlKind::None && doc.has_attribute(*n, attribute)
            })
            .collect()
    }

    fn is_excluded(&self, host: &Host, node: NodeId) -> bool {
        self.config
            .excluded_field_attributes
            .iter()
            .any(|a| host.doc().has_attribute(node, a))
    }

    /// Serialize the current field state.
    ///
    /// A name used by several fields yields an array. Nested output fails when a
    /// dotted name conflicts with a plain one.
    pub fn serialize(&self, host: &Host) -> Result<Value, BindError> {
        let doc = host.doc();
        let attribute = &self.config.element.render_attribute;
        let mut flat = Map::new();
        for node in self.controls(host) {
            if self.is_excluded(host, node) {
                continue;
            }
            let Some(name) = doc.attribute(node, attribute) else {
                continue;
            };
            let value = match doc.control_kind(node) {
                ControlKind::Checkbox => match self.config.checkbox_serialization_mode {
                    CheckboxSerializationMode::Boolean => Value::Bool(doc.checked(node)),
                    CheckboxSerializationMode::Value if doc.checked(node) => {
                        Value::String(doc.attribute(node, "value").unwrap_or("on").to_owned())
                    }
                    CheckboxSerializationMode::Value => continue,
                },
                ControlKind::Radio if doc.checked(node) => {
                    Value::String(doc.attribute(node, "value").unwrap_or("on").to_owned())
                }
                ControlKind::Radio => continue,
                _ => Value::String(doc.value(node).to_owned()),
            };
            insert_field(&mut flat, name, value);
        }
        match self.config.data_serialization_mode {
            DataSerializationMode::Flat => Ok(Value::Object(flat)),
            DataSerializationMode::Nested => Ok(Value::Object(unflatten(&flat)?)),
        }
    }

    /// Restore every field to its default and emit `reset`.
    pub fn reset(&mut self, host: &mut Host) {
        self.reset_fields(host);
        self.element.emit("reset", Value::Null);
    }

    /// Restore every field to its default without emitting.
    ///
    /// A native `reset` uses this; the event itself reaches the bus through the
    /// element's native listener.
    pub fn reset_fields(&mut self, host: &mut Host) {
        for node in self.controls(host) {
            host.doc_mut().reset_control(node);
        }
    }

    /// Validate, then submit the serialized data.
    ///
    /// The returned future emits `success`, `fail` or `error` on completion and never
    /// fails itself. Without a `submit` callback the serialized data is the response.
    pub fn submit(&self, host: &Host) -> LocalBoxFuture<'static, RequestOutcome> {
        let bus = self.element.bus().clone();
        let root = self.element.root();
        let data = self.serialize(host);
        let validate = self.requests.validate.clone();
        let submit = self.requests.submit.clone();
        async move {
            let data = match data {
                Ok(data) => data,
                Err(err) => {
                    let err = FormError::Transport(err.to_string());
                    return settle(&bus, root, "success", Err(err));
                }
            };
            if let Some(validate) = validate {
                match validate(data.clone()).await {
                    Ok(_) => {}
                    Err(err) => return settle(&bus, root, "success", Err(err)),
                }
            }
            let result = match submit {
                Some(submit) => submit(data).await,
                None => Ok(data),
            };
            settle(&bus, root, "success", result)
        }
        .boxed_local()
    }

    /// Resolve the `get` callback for `query` and emit `load` with the data.
    ///
    /// Rendering the loaded data is up to the caller, typically from the `load`
    /// handler's owner.
    pub fn load(&self, query: Value) -> LocalBoxFuture<'static, RequestOutcome> {
        let bus = self.element.bus().clone();
        let root = self.element.root();
        let get = self.requests.get.clone();
        async move {
            let result = match get {
                Some(get) => get(query).await,
                None => Err(FormError::Transport("no get callback configured".to_owned())),
            };
            settle(&bus, root, "load", result)
        }
        .boxed_local()
    }

    /// Queue a submission for the host's executor.
    pub fn queue_submit(&mut self, host: &Host) {
        let submission = self.submit(host);
        self.pending.push(submission);
    }

    /// Submissions queued by native `submit` events.
    pub fn take_pending(&mut self) -> Vec<LocalBoxFuture<'static, RequestOutcome>> {
        std::mem::take(&mut self.pending)
    }
}

fn insert_field(flat: &mut Map<String, Value>, name: &str, value: Value) {
    match flat.get_mut(name) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            flat.insert(name.to_owned(), value);
        }
    }
}

impl Bindable for Form {
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        self.element.render(host, data)
    }
}

impl Widget for Form {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }
}

/// A widget built around a [`Form`].
pub(crate) trait FormWidget: Widget {
    fn form_mut(&mut self) -> &mut Form;

    /// Reaction to a native `reset` event.
    fn native_reset(&mut self, host: &mut Host) {
        self.form_mut().reset_fields(host);
    }
}

impl FormWidget for Form {
    fn form_mut(&mut self) -> &mut Self {
        self
    }
}

/// Native `submit` queues a submission; native `reset` resets the widget.
pub(crate) fn bridge_native<W: FormWidget + 'static>(host: &mut Host, widget: &Rc<RefCell<W>>) {
    let root = widget.borrow().element().root();
    let weak = Rc::downgrade(widget);
    host.add_listener(root, "submit", move |host, _| {
        if let Some(widget) = weak.upgrade() {
            match widget.try_borrow_mut() {
                Ok(mut w) => w.form_mut().queue_submit(host),
                Err(_) => tracing::warn!("form is busy; native submit dropped"),
            }
        }
        Outcome::Continue
    });
    let weak = Rc::downgrade(widget);
    host.add_listener(root, "reset", move |host, _| {
        if let Some(widget) = weak.upgrade() {
            match widget.try_borrow_mut() {
                Ok(mut w) => w.native_reset(host),
                Err(_) => tracing::warn!("form is busy; native reset dropped"),
            }
        }
        Outcome::Continue
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::Cell;
    use understory_dom::El;

    fn signup(host: &mut Host, config: FormConfig) -> Form {
        let root = host.doc_mut().build(
            None,
            &El::new("form")
                .child(El::new("input").attr("name", "user.name").attr("value", "ada"))
                .child(El::new("input").attr("name", "user.email"))
                .child(
                    El::new("input")
                        .attr("type", "checkbox")
                        .attr("name", "terms")
                        .attr("value", "yes"),
                )
                .child(
                    El::new("input")
                        .attr("type", "radio")
                        .attr("name", "plan")
                        .attr("value", "free")
                        .attr("checked", ""),
                )
                .child(
                    El::new("input")
                        .attr("type", "radio")
                        .attr("name", "plan")
                        .attr("value", "pro"),
                )
                .child(El::new("select").attr("name", "tags"))
                .child(El::new("select").attr("name", "tags"))
                .child(El::new("input").attr("name", "secret").attr("disabled", ""))
                .child(El::new("span").attr("name", "label")),
        );
        Form::adopt(root, config)
    }

    #[test]
    fn nested_boolean_serialization() {
        let mut host = Host::new();
        let form = signup(&mut host, FormConfig::default());
        assert_eq!(
            form.serialize(&host).unwrap(),
            json!({
                "user": {"name": "ada", "email": ""},
                "terms": false,
                "plan": "free",
                "tags": ["", ""]
            })
        );
    }

    #[test]
    fn flat_value_serialization() {
        let mut host = Host::new();
        let config = FormConfig::with_overrides(&json!({
            "checkboxSerializationMode": "value",
            "dataSerializationMode": "flat",
            "excludedFieldAttributes": []
        }))
        .unwrap();
        let form = signup(&mut host, config);
        let root = form.element().root();
        let terms = host.doc().children_of(root)[2];

        let data = form.serialize(&host).unwrap();
        assert!(data.get("terms").is_none(), "unchecked value-mode box is omitted");
        assert_eq!(data["secret"], "", "nothing excluded");

        host.doc_mut().set_checked(terms, true);
        let data = form.serialize(&host).unwrap();
        assert_eq!(data["terms"], "yes");
        assert_eq!(data["user.name"], "ada");
    }

    #[test]
    fn conflicting_names_fail_nested_serialization() {
        let mut host = Host::new();
        let root = host.doc_mut().build(
            None,
            &El::new("form")
                .child(El::new("input").attr("name", "a"))
                .child(El::new("input").attr("name", "a.b")),
        );
        let form = Form::adopt(root, FormConfig::default());
        assert!(matches!(form.serialize(&host), Err(BindError::PathConflict(_))));
    }

    #[test]
    fn render_then_reset() {
        let mut host = Host::new();
        let form = signup(&mut host, FormConfig::default());
        let form = Form::mount(&mut host, form).unwrap();
        let resets = Rc::new(Cell::new(0));
        let r = resets.clone();
        {
            let mut f = form.borrow_mut();
            let el = f.element_mut();
            el.on(&mut host, "reset", move |_| r.set(r.get() + 1));
        }

        form.borrow_mut()
            .render(
                &mut host,
                &json!({"user": {"name": "grace"}, "terms": true, "plan": "pro", "label": "Hi"}),
            )
            .unwrap();
        let data = form.borrow().serialize(&host).unwrap();
        assert_eq!(data["user"]["name"], "grace");
        assert_eq!(data["terms"], true);
        assert_eq!(data["plan"], "pro");
        let root = form.borrow().element().root();
        let label = host.doc().children_of(root)[8];
        assert_eq!(host.doc().markup(label), Some("Hi"));

        host.dispatch(root, "reset", Value::Null);
        let data = form.borrow().serialize(&host).unwrap();
        assert_eq!(data["user"]["name"], "ada");
        assert_eq!(data["terms"], false);
        assert_eq!(data["plan"], "free");
        assert_eq!(resets.get(), 1);
    }

    fn outcome_log(form: &mut Form, host: &mut Host) -> Rc<RefCell<Vec<String>>> {
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        for name in ["success", "fail", "error", "load"] {
            let l = log.clone();
            form.element_mut()
                .on(host, name, move |e| l.borrow_mut().push(format!("{}:{}", e.name, e.detail)));
        }
        log
    }

    #[test]
    fn submit_success_and_rejections() {
        let mut host = Host::new();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let requests = RequestCallbacks {
            validate: Some(request(|data: Value| async move {
                if data["user"]["name"] == "" {
                    Err(FormError::Rejected(json!({"user.name": "required"})))
                } else {
                    Ok(Value::Null)
                }
            })),
            submit: Some(request(move |data: Value| {
                c.set(c.get() + 1);
                async move { Ok(json!({"saved": data["user"]["name"]})) }
            })),
            ..RequestCallbacks::default()
        };
        let mut form = signup(&mut host, FormConfig::default()).with_requests(requests);
        let log = outcome_log(&mut form, &mut host);

        let outcome = block_on(form.submit(&host));
        assert_eq!(outcome, RequestOutcome::Success(json!({"saved": "ada"})));

        let name = host.doc().children_of(form.element().root())[0];
        host.doc_mut().set_value(name, "");
        let outcome = block_on(form.submit(&host));
        assert_eq!(outcome, RequestOutcome::Fail(json!({"user.name": "required"})));
        assert_eq!(calls.get(), 1, "rejected validation does not submit");
        assert_eq!(
            *log.borrow(),
            ["success:{\"saved\":\"ada\"}", "fail:{\"user.name\":\"required\"}"]
        );
    }

    #[test]
    fn transport_errors_become_error_events() {
        let mut host = Host::new();
        let requests = RequestCallbacks {
            submit: Some(request(|_| async {
                Err::<Value, _>(FormError::Transport("offline".into()))
            })),
            ..RequestCallbacks::default()
        };
        let mut form = signup(&mut host, FormConfig::default()).with_requests(requests);
        let log = outcome_log(&mut form, &mut host);
        assert_eq!(
            block_on(form.submit(&host)),
            RequestOutcome::Error("offline".into())
        );
        assert_eq!(*log.borrow(), ["error:\"offline\""]);
    }

    #[test]
    fn superseded_submissions_still_complete() {
        let mut host = Host::new();
        let mut form = signup(&mut host, FormConfig::default());
        let log = outcome_log(&mut form, &mut host);
        let first = form.submit(&host);
        let name = host.doc().children_of(form.element().root())[0];
        host.doc_mut().set_value(name, "second");
        let second = form.submit(&host);
        block_on(second);
        block_on(first);
        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert!(log[0].contains("second"));
        assert!(log[1].contains("ada"));
    }

    #[test]
    fn native_submit_queues() {
        let mut host = Host::new();
        let form = signup(&mut host, FormConfig::default());
        let form = Form::mount(&mut host, form).unwrap();
        let root = form.borrow().element().root();
        let button = host.doc_mut().create_element("button");
        host.doc_mut().append_child(root, button);

        host.dispatch(button, "submit", Value::Null);
        let pending = form.borrow_mut().take_pending();
        assert_eq!(pending.len(), 1);
        for submission in pending {
            assert!(matches!(block_on(submission), RequestOutcome::Success(_)));
        }
    }

    #[test]
    fn load_emits_data() {
        let mut host = Host::new();
        let requests = RequestCallbacks {
            get: Some(request(|query: Value| async move {
                Ok(json!({"user": {"name": query["id"]}}))
            })),
            ..RequestCallbacks::default()
        };
        let mut form = signup(&mut host, FormConfig::default()).with_requests(requests);
        let log = outcome_log(&mut form, &mut host);
        let outcome = block_on(form.load(json!({"id": "x1"})));
        let RequestOutcome::Success(data) = outcome else {
            panic!("load should succeed");
        };
        form.render(&mut host, &data).unwrap();
        assert_eq!(form.serialize(&host).unwrap()["user"]["name"], "x1");
        assert_eq!(log.borrow().len(), 1);

        let mut bare = signup(&mut host, FormConfig::default());
        let log = outcome_log(&mut bare, &mut host);
        assert!(matches!(block_on(bare.load(Value::Null)), RequestOutcome::Error(_)));
        assert_eq!(log.borrow().len(), 1);
    }
}
