// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed list rendering: a todo list reconciled across three updates.
//!
//! This example shows how to combine:
//! - `understory_dom` for the element tree,
//! - `understory_bind` for `data-name` binding and the host's native dispatch,
//! - `understory_reconcile` for keyed create/update/remove of list items.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_demos --example todo_list`

use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};
use understory_bind::{Host, Outcome};
use understory_dom::{El, NodeId};
use understory_reconcile::{KeyedReconciler, ReconcilerConfig, Template};

fn print_list(host: &Host, list: NodeId, items: &KeyedReconciler) {
    for key in items.keys() {
        if let Some(node) = items.node_of(key) {
            let done = host.doc().checked(host.doc().children_of(node)[0]);
            println!("  [{}] {key}: {}", if done { 'x' } else { ' ' }, host.doc().text_content(node));
        }
    }
    println!("  ({} children under the list)", host.doc().children_of(list).len());
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .try_init();

    let mut host = Host::new();
    let list = host.doc_mut().build(
        None,
        &El::new("ul").child(
            El::new("li")
                .child(
                    El::new("input")
                        .attr("type", "checkbox")
                        .attr("data-name", "done"),
                )
                .child(El::new("span").attr("data-name", "title")),
        ),
    );
    let template = host.doc().children_of(list)[0];
    let mut items = KeyedReconciler::new(
        &mut host,
        list,
        Template::Node(template),
        ReconcilerConfig::default(),
    )
    .expect("list and template are alive");

    // Clicks anywhere in the list bubble to this listener.
    host.add_listener(list, "click", |host, event| {
        if let Some(target) = event.target {
            println!("clicked <{}>", host.doc().tag(target).unwrap_or("?"));
        }
        Outcome::Continue
    });

    let steps = [
        json!([
            {"id": 1, "title": "write the reconciler", "done": true},
            {"id": 2, "title": "write the binder", "done": false},
        ]),
        json!([
            {"id": 2, "title": "write the binder", "done": true},
            {"id": 3, "title": "write the widgets", "done": false},
        ]),
        json!([
            {"id": 3, "title": "write the widgets"},
            {"title": "missing id"},
        ]),
    ];
    for (i, step) in steps.iter().enumerate() {
        match items.render(&mut host, step) {
            Ok(stats) => println!("render {i}: {stats:?}"),
            Err(err) => println!("render {i} rejected: {err}"),
        }
        print_list(&host, list, &items);
    }

    if let Some(node) = items.node_of("3") {
        host.dispatch(node, "click", json!(null));
    }
}
