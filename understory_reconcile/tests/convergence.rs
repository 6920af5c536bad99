// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests: key-set convergence and identity preservation.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::{Value, json};
use understory_bind::Host;
use understory_dom::{El, NodeId};
use understory_reconcile::{KeyedReconciler, ReconcilerConfig, Template};

/// A sequence of renders, each a list of distinct keys with labels.
fn renders() -> impl Strategy<Value = Vec<Vec<(u8, String)>>> {
    prop::collection::vec(
        prop::collection::btree_map(0_u8..12, "[a-z]{1,4}", 0..8)
            .prop_map(|m| m.into_iter().collect::<Vec<_>>())
            .prop_shuffle(),
        1..6,
    )
}

fn setup(config: ReconcilerConfig) -> (Host, NodeId, KeyedReconciler) {
    let mut host = Host::new();
    let ul = host.doc_mut().build(
        None,
        &El::new("ul").child(El::new("li").attr("data-name", "label")),
    );
    let li = host.doc().children_of(ul)[0];
    let r = KeyedReconciler::new(&mut host, ul, Template::Node(li), config).unwrap();
    (host, ul, r)
}

fn as_data(entries: &[(u8, String)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(id, label)| json!({"id": id, "label": label}))
            .collect(),
    )
}

proptest! {
    #[test]
    fn entries_converge_and_persist(steps in renders()) {
        let (mut host, ul, mut r) = setup(ReconcilerConfig::default());
        let mut previous: BTreeMap<String, NodeId> = BTreeMap::new();
        for entries in &steps {
            r.render(&mut host, &as_data(entries)).unwrap();

            let want: BTreeSet<String> = entries.iter().map(|(id, _)| id.to_string()).collect();
            let have: BTreeSet<String> = r.keys().map(str::to_owned).collect();
            prop_assert_eq!(&have, &want);
            prop_assert_eq!(host.doc().children_of(ul).len(), want.len());

            for (id, label) in entries {
                let key = id.to_string();
                let node = r.node_of(&key).unwrap();
                prop_assert_eq!(host.doc().markup(node), Some(label.as_str()));
                if let Some(old) = previous.get(&key) {
                    prop_assert_eq!(*old, node);
                }
            }
            previous = want.iter().map(|k| (k.clone(), r.node_of(k).unwrap())).collect();
        }
    }

    #[test]
    fn reordering_matches_incoming_order(steps in renders()) {
        let config = ReconcilerConfig { reorder_existing: true, ..ReconcilerConfig::default() };
        let (mut host, ul, mut r) = setup(config);
        for entries in &steps {
            r.render(&mut host, &as_data(entries)).unwrap();
            let order: Vec<NodeId> = entries
                .iter()
                .map(|(id, _)| r.node_of(&id.to_string()).unwrap())
                .collect();
            prop_assert_eq!(host.doc().children_of(ul), order.as_slice());
        }
    }
}
