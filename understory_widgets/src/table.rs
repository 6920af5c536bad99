// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tables whose body rows are reconciled by key.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use understory_bind::{BindError, Bindable, Element, ElementConfig, Host, Widget, merge_config};
use understory_dom::El;
use understory_reconcile::{
    KeyedReconciler, ReconcileError, ReconcilerConfig, RenderStats, Template,
};

/// Columns of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableSchema {
    /// Row field identifying a row.
    pub primary_key: String,
    /// Row fields shown as columns, in order.
    pub columns: Vec<String>,
    /// Header titles; missing titles fall back to the column name.
    pub column_titles: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            primary_key: "id".to_owned(),
            columns: Vec::new(),
            column_titles: Vec::new(),
        }
    }
}

impl TableSchema {
    fn title(&self, index: usize) -> &str {
        self.column_titles
            .get(index)
            .or_else(|| self.columns.get(index))
            .map_or("", String::as_str)
    }
}

/// Table configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    /// Base element options.
    #[serde(flatten)]
    pub element: ElementConfig,
    /// Drop every row before each render instead of reconciling.
    pub always_rebuild: bool,
    /// Columns.
    pub schema: TableSchema,
}

impl TableConfig {
    /// The defaults with JSON `overrides` merged over them.
    pub fn with_overrides(overrides: &Value) -> Result<Self, BindError> {
        merge_config(&Self::default(), overrides)
    }
}

/// A `<table>` with a header built from the schema and keyed body rows.
///
/// Rendering an array reconciles the rows. Rendering an object reconciles its
/// `rows` field and binds the remaining fields to the table's own targets (a
/// caption, say). Those fields never reach the body, so a caption key named
/// like a column leaves the row cells alone.
///
/// The row template is built inside `tbody` and taken out of the tree by the
/// reconciler; it stays alive, detached, for as long as the table.
pub struct Table {
    element: Element,
    config: TableConfig,
    rows: KeyedReconciler,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("element", &self.element)
            .field("config", &self.config)
            .field("rows", &self.rows)
            .finish()
    }
}

impl Table {
    /// Build the table markup and its row reconciler.
    pub fn new(host: &mut Host, config: TableConfig) -> Result<Self, ReconcileError> {
        let schema = &config.schema;
        let root = host.doc_mut().create_element("table");
        let header = (0..schema.columns.len()).map(|i| {
            El::new("th")
                .attr("data-column", schema.columns[i].as_str())
                .text(schema.title(i))
        });
        host.doc_mut()
            .build(Some(root), &El::new("thead").child(El::new("tr").children(header)));
        let body = host.doc_mut().build(Some(root), &El::new("tbody"));
        let template = host.doc_mut().build(
            Some(body),
            &El::new("tr").children(
                schema
                    .columns
                    .iter()
                    .map(|c| El::new("td").attr("data-name", c.as_str())),
            ),
        );
        let rows = KeyedReconciler::new(
            host,
            body,
            Template::Node(template),
            ReconcilerConfig {
                primary_key: schema.primary_key.clone(),
                ..ReconcilerConfig::default()
            },
        )?;
        Ok(Self {
            element: Element::adopt(root).with_config(config.element.clone()),
            config,
            rows,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The row reconciler.
    pub fn rows(&self) -> &KeyedReconciler {
        &self.rows
    }

    /// Run `f` on the element with the body taken out of the tree.
    fn without_body<R>(
        &mut self,
        host: &mut Host,
        f: impl FnOnce(&mut Element, &mut Host) -> R,
    ) -> R {
        let body = self.rows.wrapper();
        let slot = host.doc().index_in_parent(body);
        let parent = host.doc().parent_of(body);
        host.doc_mut().detach(body);
        let out = f(&mut self.element, host);
        if let (Some(parent), Some(slot)) = (parent, slot) {
            host.doc_mut().insert_child(parent, body, slot);
        }
        out
    }

    /// Reconcile the body against `rows`.
    pub fn render_rows(
        &mut self,
        host: &mut Host,
        rows: &Value,
    ) -> Result<RenderStats, ReconcileError> {
        let mut stats = RenderStats::default();
        if self.config.always_rebuild {
            stats.removed = self.rows.empty(host);
        }
        let pass = self.rows.render(host, rows)?;
        stats.created = pass.created;
        stats.updated = pass.updated;
        stats.removed += pass.removed;
        Ok(stats)
    }
}

impl Bindable for Table {
    fn render(&mut self, host: &mut Host, data: &Value) -> Result<(), BindError> {
        let rows = match data {
            Value::Object(map) => {
                let mut rest = map.clone();
                let rows = rest.shift_remove("rows");
                let rest = Value::Object(rest);
                self.without_body(host, |element, host| element.render(host, &rest))?;
                rows
            }
            Value::Null => None,
            rows => Some(rows.clone()),
        };
        let Some(rows) = rows else {
            return Ok(());
        };
        match self.render_rows(host, &rows) {
            Ok(_) => Ok(()),
            Err(ReconcileError::Bind(err)) => Err(err),
            Err(err) => Err(BindError::Component {
                node: self.element.root(),
                message: err.to_string(),
            }),
        }
    }
}

impl Widget for Table {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn mounted(&mut self, host: &mut Host) -> Result<(), BindError> {
        self.without_body(host, |element, host| element.rebind(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use understory_bind::mount;

    fn people(host: &mut Host, always_rebuild: bool) -> Table {
        let config = TableConfig::with_overrides(&json!({
            "alwaysRebuild": always_rebuild,
            "schema": {
                "primaryKey": "uid",
                "columns": ["name", "age"],
                "columnTitles": ["Name"]
            }
        }))
        .unwrap();
        Table::new(host, config).unwrap()
    }

    fn body_text(host: &Host, table: &Table) -> Vec<String> {
        let body = table.rows().wrapper();
        host.doc()
            .children_of(body)
            .iter()
            .map(|r| host.doc().text_content(*r))
            .collect()
    }

    #[test]
    fn header_comes_from_the_schema() {
        let mut host = Host::new();
        let table = people(&mut host, false);
        let root = table.element().root();
        let thead = host.doc().children_of(root)[0];
        let tr = host.doc().children_of(thead)[0];
        let titles: Vec<_> = host
            .doc()
            .children_of(tr)
            .iter()
            .map(|th| host.doc().text_content(*th))
            .collect();
        assert_eq!(titles, ["Name", "age"]);
    }

    #[test]
    fn rows_are_reconciled_by_key() {
        let mut host = Host::new();
        let table = people(&mut host, false);
        let table = mount(&mut host, table).unwrap();
        let mut t = table.borrow_mut();

        t.render(
            &mut host,
            &json!([{"uid": "a", "name": "Ada", "age": 36}, {"uid": "b", "name": "Bo", "age": 4}]),
        )
        .unwrap();
        assert_eq!(body_text(&host, &t), ["Ada36", "Bo4"]);
        let ada = t.rows().node_of("a");

        let stats = t
            .render_rows(&mut host, &json!([{"uid": "a", "name": "Ada", "age": 37}]))
            .unwrap();
        assert_eq!(stats, RenderStats { created: 0, updated: 1, removed: 1 });
        assert_eq!(t.rows().node_of("a"), ada);
        assert_eq!(body_text(&host, &t), ["Ada37"]);
    }

    #[test]
    fn always_rebuild_recreates_rows() {
        let mut host = Host::new();
        let mut table = people(&mut host, true);
        let rows = json!([{"uid": 1, "name": "x", "age": 1}]);
        table.render_rows(&mut host, &rows).unwrap();
        let first = table.rows().node_of("1");
        let stats = table.render_rows(&mut host, &rows).unwrap();
        assert_eq!(stats, RenderStats { created: 1, updated: 0, removed: 1 });
        assert_ne!(table.rows().node_of("1"), first);
    }

    #[test]
    fn object_data_binds_the_rest() {
        let mut host = Host::new();
        let mut table = people(&mut host, false);
        let root = table.element().root();
        let caption = host
            .doc_mut()
            .build(None, &El::new("caption").attr("data-name", "caption"));
        host.doc_mut().insert_child(root, caption, 0);
        table
            .render(
                &mut host,
                &json!({"caption": "People", "rows": [{"uid": 1, "name": "x", "age": 1}]}),
            )
            .unwrap();
        assert_eq!(host.doc().markup(caption), Some("People"));
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn row_template_is_taken_out_of_the_body() {
        let mut host = Host::new();
        let mut table = people(&mut host, false);
        let body = table.rows().wrapper();
        assert!(host.doc().children_of(body).is_empty());
        table
            .render_rows(&mut host, &json!([{"uid": 1, "name": "x", "age": 1}]))
            .unwrap();
        assert_eq!(host.doc().children_of(body).len(), 1);
    }

    #[test]
    fn caption_fields_do_not_reach_row_cells() {
        for mount_first in [false, true] {
            let mut host = Host::new();
            let mut table = people(&mut host, false);
            let root = table.element().root();
            let caption = host
                .doc_mut()
                .build(None, &El::new("caption").attr("data-name", "name"));
            host.doc_mut().insert_child(root, caption, 0);
            table
                .render_rows(&mut host, &json!([{"uid": "a", "name": "Ada", "age": 36}]))
                .unwrap();
            let table = if mount_first {
                let table = mount(&mut host, table).unwrap();
                assert_eq!(table.borrow().element().bound().len(), 1);
                table
            } else {
                Rc::new(RefCell::new(table))
            };

            let mut t = table.borrow_mut();
            t.render(&mut host, &json!({"name": "People"})).unwrap();
            assert_eq!(host.doc().markup(caption), Some("People"));
            assert_eq!(body_text(&host, &t), ["Ada36"], "mounted: {mount_first}");
            let body = t.rows().wrapper();
            assert_eq!(host.doc().index_in_parent(body), Some(2), "body is put back");
        }
    }

    #[test]
    fn missing_keys_surface_as_component_errors() {
        let mut host = Host::new();
        let mut table = people(&mut host, false);
        let err = table
            .render(&mut host, &json!([{"name": "no key"}]))
            .unwrap_err();
        assert!(matches!(err, BindError::Component { .. }));
        assert!(table.rows().is_empty());
    }
}
