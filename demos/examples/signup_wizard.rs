// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A two-step signup wizard with validation, plus a pager with debounced input.
//!
//! This example shows how to combine:
//! - `understory_widgets::Wizard` (a form plus tab navigation),
//! - caller-supplied `validate`/`submit` requests driven by an executor,
//! - namespaced events such as `reset.profile`,
//! - `understory_widgets::Pager` with its debounced page input,
//! - the host's shared bus relaying pager events to other listeners.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example signup_wizard`

use futures::executor::block_on;
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt};
use understory_bind::{Bindable, Event, Host, Widget};
use understory_dom::El;
use understory_widgets::{
    FormError, Pager, PagerConfig, RequestCallbacks, Wizard, WizardConfig, request,
};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .try_init();

    let mut host = Host::new();
    let root = host.doc_mut().build(
        None,
        &El::new("form")
            .child(
                El::new("fieldset")
                    .attr("data-tab", "account")
                    .child(El::new("input").attr("name", "account.email")),
            )
            .child(
                El::new("fieldset")
                    .attr("data-tab", "profile")
                    .child(El::new("input").attr("name", "profile.name"))
                    .child(
                        El::new("input")
                            .attr("type", "checkbox")
                            .attr("name", "profile.newsletter"),
                    ),
            ),
    );

    let requests = RequestCallbacks {
        validate: Some(request(|data: Value| async move {
            if data["account"]["email"]
                .as_str()
                .is_some_and(|e| e.contains('@'))
            {
                Ok(Value::Null)
            } else {
                Err(FormError::Rejected(json!({"account.email": "invalid"})))
            }
        })),
        submit: Some(request(|data: Value| async move {
            Ok(json!({"created": data["profile"]["name"]}))
        })),
        ..RequestCallbacks::default()
    };
    let wizard = Wizard::adopt(root, WizardConfig::default())
        .expect("default tab selector parses")
        .with_requests(requests);
    let wizard = Wizard::mount(&mut host, wizard).expect("wizard root is alive");

    let mut w = wizard.borrow_mut();
    for name in ["tab.show", "success", "fail", "reset"] {
        w.element_mut()
            .on(&mut host, name, |e| println!("event {}: {}", e.name, e.detail));
    }
    w.element_mut()
        .on(&mut host, "reset.profile", |_| println!("profile listener ran"));

    w.render(&mut host, &json!({"account": {"email": "nope"}}))
        .expect("plain fields bind");
    block_on(w.form().submit(&host));

    w.next_tab(&mut host);
    w.render(
        &mut host,
        &json!({
            "account": {"email": "ada@example.com"},
            "profile": {"name": "Ada", "newsletter": true}
        }),
    )
    .expect("plain fields bind");
    match w.form().serialize(&host) {
        Ok(data) => println!("serialized: {data}"),
        Err(err) => println!("serialize failed: {err}"),
    }
    block_on(w.form().submit(&host));
    w.reset(&mut host);
    println!("back on tab {:?}", w.tabs().current());
    drop(w);

    let pager = Pager::new(&mut host, PagerConfig::default());
    let pager = Pager::mount(&mut host, pager).expect("pager root is alive");
    // Other widgets hear about page changes through the host's shared bus.
    host.bus()
        .on("pager.page", |e| println!("shared bus saw page {}", e.detail["page"]));
    let shared = host.bus().clone();
    let mut p = pager.borrow_mut();
    p.element_mut().on(&mut host, "page", move |e| {
        shared.emit("pager.page", &Event::new("pager.page", e.detail.clone()));
    });
    p.set_page_count(&mut host, 10).expect("pager renders");
    p.input("7", 1_000);
    p.input("8", 1_100);
    let due = p.deadline().unwrap_or_default();
    p.poll(&mut host, due).expect("pager renders");
    println!("pager at page {} of {}", p.page(), p.page_count());
}
