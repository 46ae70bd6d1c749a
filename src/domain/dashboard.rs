// Dashboard document - root aggregate, ID assignment and datasource checks
use super::error::DashboardError;
use super::layout::{Column, PlacedPanel};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    DataSource {
        plugin_id: String,
        plugin_name: String,
    },
    Constant,
}

/// A dashboard-level parameter the backend asks for on import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVariable {
    pub name: String,
    pub kind: InputKind,
    pub label: String,
    pub description: String,
    pub default_value: Option<String>,
}

impl InputVariable {
    pub fn datasource(
        name: impl Into<String>,
        label: impl Into<String>,
        plugin_id: impl Into<String>,
        plugin_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::DataSource {
                plugin_id: plugin_id.into(),
                plugin_name: plugin_name.into(),
            },
            label: label.into(),
            description: String::new(),
            default_value: None,
        }
    }

    pub fn constant(
        name: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Constant,
            label: label.into(),
            description: description.into(),
            default_value: Some(value.into()),
        }
    }

    pub fn is_datasource(&self) -> bool {
        matches!(self.kind, InputKind::DataSource { .. })
    }

    /// Whether a panel reference points at this input. Panels refer to inputs
    /// either by bare name or through a `${name}` placeholder.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        reference == self.name
            || reference
                .strip_prefix("${")
                .and_then(|rest| rest.strip_suffix('}'))
                .is_some_and(|name| name == self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDocument {
    pub title: String,
    pub description: Option<String>,
    pub uid: Option<String>,
    pub tags: BTreeSet<String>,
    pub refresh: Option<String>,
    pub timezone: String,
    pub editable: bool,
    pub time_from: String,
    pub time_to: String,
    inputs: Vec<InputVariable>,
    panels: Vec<PlacedPanel>,
}

impl DashboardDocument {
    pub fn builder(title: impl Into<String>) -> DashboardBuilder {
        DashboardBuilder::new(title)
    }

    pub fn inputs(&self) -> &[InputVariable] {
        &self.inputs
    }

    pub fn panels(&self) -> &[PlacedPanel] {
        &self.panels
    }

    /// Every panel, depth first: a row comes before the panels it owns.
    pub fn walk(&self) -> Vec<&PlacedPanel> {
        fn visit<'a>(panels: &'a [PlacedPanel], out: &mut Vec<&'a PlacedPanel>) {
            for panel in panels {
                out.push(panel);
                visit(&panel.children, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.panels, &mut out);
        out
    }

    /// Number every panel from 1 in depth-first declaration order. Rows
    /// consume an ID like any other panel.
    pub fn auto_panel_ids(mut self) -> Self {
        fn assign(panels: &mut [PlacedPanel], next: &mut u32) {
            for panel in panels {
                panel.id = Some(*next);
                *next += 1;
                assign(&mut panel.children, next);
            }
        }

        let mut next = 1;
        assign(&mut self.panels, &mut next);
        tracing::debug!(dashboard = %self.title, assigned = next - 1, "assigned panel ids");
        self
    }

    /// Fail on the first panel or query that names a datasource not declared
    /// as a datasource input.
    pub fn verify_datasources(self) -> Result<Self, DashboardError> {
        match self.first_unknown_datasource() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn first_unknown_datasource(&self) -> Option<DashboardError> {
        let declared: Vec<&InputVariable> =
            self.inputs.iter().filter(|i| i.is_datasource()).collect();
        let is_declared = |reference: &str| declared.iter().any(|i| i.is_referenced_by(reference));

        for placed in self.walk() {
            let panel = &placed.descriptor;
            let Some(datasource) = panel.datasource() else {
                continue;
            };

            let query_sources = panel
                .queries()
                .iter()
                .filter_map(|q| q.datasource.as_deref())
                .filter(|q| *q != datasource);

            for reference in std::iter::once(datasource).chain(query_sources) {
                if !is_declared(reference) {
                    return Some(DashboardError::UnknownDataSource {
                        panel: panel.title().to_string(),
                        datasource: reference.to_string(),
                    });
                }
            }
        }

        None
    }

    /// `(panel title, placeholder)` pairs for query placeholders that match no
    /// declared input. Backend builtins (`${__...}`) are skipped.
    pub fn undeclared_placeholders(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut undeclared = Vec::new();

        for placed in self.walk() {
            let panel = &placed.descriptor;
            for query in panel.queries() {
                for name in query.placeholders() {
                    if name.starts_with("__") || self.inputs.iter().any(|i| i.name == name) {
                        continue;
                    }
                    if seen.insert((panel.title(), name)) {
                        undeclared.push((panel.title().to_string(), name.to_string()));
                    }
                }
            }
        }

        undeclared
    }
}

#[derive(Debug, Clone)]
pub struct DashboardBuilder {
    title: String,
    description: Option<String>,
    uid: Option<String>,
    tags: BTreeSet<String>,
    refresh: Option<String>,
    timezone: String,
    editable: bool,
    time_from: String,
    time_to: String,
    inputs: Vec<InputVariable>,
    panels: Vec<PlacedPanel>,
}

impl DashboardBuilder {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            uid: None,
            tags: BTreeSet::new(),
            refresh: None,
            timezone: String::new(),
            editable: true,
            time_from: "now-6h".to_string(),
            time_to: "now".to_string(),
            inputs: Vec::new(),
            panels: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn time_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time_from = from.into();
        self.time_to = to.into();
        self
    }

    pub fn input(mut self, input: InputVariable) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn inputs(mut self, inputs: impl IntoIterator<Item = InputVariable>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn panels(mut self, column: Column) -> Self {
        self.panels.extend(column.into_panels());
        self
    }

    pub fn build(self) -> Result<DashboardDocument, DashboardError> {
        let mut names = HashSet::new();
        for input in &self.inputs {
            if input.name.trim().is_empty() {
                return Err(DashboardError::InvalidInput {
                    name: input.name.clone(),
                    reason: "name is empty".to_string(),
                });
            }
            if !names.insert(input.name.as_str()) {
                return Err(DashboardError::DuplicateInput {
                    name: input.name.clone(),
                });
            }
        }

        Ok(DashboardDocument {
            title: self.title,
            description: self.description,
            uid: self.uid,
            tags: self.tags,
            refresh: self.refresh,
            timezone: self.timezone,
            editable: self.editable,
            time_from: self.time_from,
            time_to: self.time_to,
            inputs: self.inputs,
            panels: self.panels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layout::{Layout, LayoutItem};
    use crate::domain::panel::{PanelDescriptor, QuerySpec};

    fn prometheus() -> InputVariable {
        InputVariable::datasource("DS_PROMETHEUS", "Prometheus", "prometheus", "Prometheus")
    }

    fn stat(title: &str, datasource: &str) -> PanelDescriptor {
        PanelDescriptor::stat(title, datasource)
            .query(QuerySpec::new(r#"sum(up{job="${job}"})"#))
            .build()
            .unwrap()
    }

    fn document(items: Vec<LayoutItem>, inputs: Vec<InputVariable>) -> DashboardDocument {
        let mut layout = Layout::default();
        let column = layout.column(items).unwrap();
        DashboardDocument::builder("CloudServer")
            .inputs(inputs)
            .panels(column)
            .build()
            .unwrap()
    }

    fn ids(document: &DashboardDocument) -> Vec<Option<u32>> {
        document.walk().iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_auto_panel_ids_are_sequential_from_one() {
        let mut layout = Layout::default();
        let first = layout
            .row(vec![stat("A", "${DS_PROMETHEUS}"), stat("B", "${DS_PROMETHEUS}")], Some(4), None)
            .unwrap();
        let second = layout.row(vec![stat("C", "${DS_PROMETHEUS}")], Some(8), None).unwrap();
        let doc = document(
            vec![
                first.into(),
                PanelDescriptor::row("Latency").unwrap().into(),
                second.into(),
            ],
            vec![prometheus()],
        )
        .auto_panel_ids();

        assert_eq!(ids(&doc), vec![Some(1), Some(2), Some(3), Some(4)]);
        let titles: Vec<&str> = doc.walk().iter().map(|p| p.descriptor.title()).collect();
        assert_eq!(titles, vec!["A", "B", "Latency", "C"]);
    }

    #[test]
    fn test_auto_panel_ids_visit_rows_before_children() {
        let mut layout = Layout::default();
        let inner_row = layout
            .row(
                vec![stat("Child 1", "DS_PROMETHEUS"), stat("Child 2", "DS_PROMETHEUS")],
                None,
                None,
            )
            .unwrap();
        let inner = layout.column(vec![inner_row.into()]).unwrap();
        let doc = document(
            vec![
                LayoutItem::collapsed(PanelDescriptor::row("Group").unwrap(), inner),
                stat("After", "DS_PROMETHEUS").into(),
            ],
            vec![prometheus()],
        )
        .auto_panel_ids();

        assert_eq!(doc.panels()[0].id, Some(1));
        assert_eq!(doc.panels()[0].children[0].id, Some(2));
        assert_eq!(doc.panels()[0].children[1].id, Some(3));
        assert_eq!(doc.panels()[1].id, Some(4));
    }

    #[test]
    fn test_auto_panel_ids_on_empty_document() {
        let doc = document(Vec::new(), Vec::new()).auto_panel_ids();
        assert!(doc.walk().is_empty());
    }

    #[test]
    fn test_verify_datasources_accepts_declared_references() {
        let doc = document(
            vec![
                stat("Up", "${DS_PROMETHEUS}").into(),
                stat("Bare", "DS_PROMETHEUS").into(),
                PanelDescriptor::row("Errors").unwrap().into(),
            ],
            vec![prometheus()],
        );
        let verified = doc.clone().verify_datasources().unwrap();
        assert_eq!(verified, doc);
    }

    #[test]
    fn test_verify_datasources_names_panel_and_reference() {
        let doc = document(
            vec![
                stat("Up", "${DS_PROMETHEUS}").into(),
                stat("Orphan", "DS_MISSING").into(),
            ],
            vec![prometheus()],
        );

        let err = doc.verify_datasources().unwrap_err();
        assert_eq!(
            err,
            DashboardError::UnknownDataSource {
                panel: "Orphan".to_string(),
                datasource: "DS_MISSING".to_string(),
            }
        );
        assert!(err.to_string().contains("Orphan"));
        assert!(err.to_string().contains("DS_MISSING"));
    }

    #[test]
    fn test_verify_datasources_ignores_constant_inputs() {
        let doc = document(
            vec![stat("Up", "${namespace}").into()],
            vec![prometheus(), InputVariable::constant("namespace", "namespace", "", "zenko")],
        );
        assert!(matches!(
            doc.verify_datasources(),
            Err(DashboardError::UnknownDataSource { .. })
        ));
    }

    #[test]
    fn test_verify_datasources_checks_query_datasources() {
        let panel = PanelDescriptor::time_series("Mixed", "${DS_PROMETHEUS}")
            .query(QuerySpec::new("sum(up)"))
            .query(QuerySpec::new("count_over_time({job=\"x\"}[1m])").datasource("${DS_LOKI}"))
            .build()
            .unwrap();

        let missing = document(vec![panel.clone().into()], vec![prometheus()]);
        let err = missing.verify_datasources().unwrap_err();
        assert!(matches!(
            err,
            DashboardError::UnknownDataSource { ref datasource, .. } if datasource == "${DS_LOKI}"
        ));

        let loki = InputVariable::datasource("DS_LOKI", "Loki", "loki", "Loki");
        let declared = document(vec![panel.into()], vec![prometheus(), loki]);
        assert!(declared.verify_datasources().is_ok());
    }

    #[test]
    fn test_verify_datasources_descends_into_collapsed_rows() {
        let mut layout = Layout::default();
        let inner_row = layout.row(vec![stat("Hidden", "DS_MISSING")], None, None).unwrap();
        let inner = layout.column(vec![inner_row.into()]).unwrap();
        let doc = document(
            vec![LayoutItem::collapsed(PanelDescriptor::row("Group").unwrap(), inner)],
            vec![prometheus()],
        );
        assert!(matches!(
            doc.verify_datasources(),
            Err(DashboardError::UnknownDataSource { ref panel, .. }) if panel == "Hidden"
        ));
    }

    #[test]
    fn test_chained_finishing_calls() {
        let doc = document(vec![stat("Up", "${DS_PROMETHEUS}").into()], vec![prometheus()])
            .auto_panel_ids()
            .verify_datasources()
            .unwrap();
        assert_eq!(doc.panels()[0].id, Some(1));
        assert_eq!(doc.title, "CloudServer");
    }

    #[test]
    fn test_builder_rejects_duplicate_and_empty_inputs() {
        let duplicate = DashboardDocument::builder("x")
            .input(prometheus())
            .input(prometheus())
            .build();
        assert_eq!(
            duplicate.unwrap_err(),
            DashboardError::DuplicateInput {
                name: "DS_PROMETHEUS".to_string()
            }
        );

        let empty = DashboardDocument::builder("x")
            .input(InputVariable::constant("", "", "", "v"))
            .build();
        assert!(matches!(empty, Err(DashboardError::InvalidInput { .. })));
    }

    #[test]
    fn test_is_referenced_by() {
        let input = prometheus();
        assert!(input.is_referenced_by("DS_PROMETHEUS"));
        assert!(input.is_referenced_by("${DS_PROMETHEUS}"));
        assert!(!input.is_referenced_by("$DS_PROMETHEUS"));
        assert!(!input.is_referenced_by("${DS_PROMETHEUS"));
        assert!(!input.is_referenced_by("DS_LOKI"));
    }

    #[test]
    fn test_undeclared_placeholders() {
        let panel = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(QuerySpec::new(
                r#"sum(up{namespace="${namespace}", job="${job}", pod="${pod}"}[${__interval}])"#,
            ))
            .query(QuerySpec::new(r#"sum(up{job="${job}"})"#))
            .build()
            .unwrap();
        let doc = document(
            vec![panel.into()],
            vec![prometheus(), InputVariable::constant("namespace", "namespace", "", "zenko")],
        );

        assert_eq!(
            doc.undeclared_placeholders(),
            vec![
                ("Up".to_string(), "job".to_string()),
                ("Up".to_string(), "pod".to_string()),
            ]
        );
    }
}
