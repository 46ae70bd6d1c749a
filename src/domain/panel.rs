// Panel descriptor domain model
use super::error::DashboardError;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Stat,
    Gauge,
    TimeSeries,
    Heatmap,
    BarGauge,
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryFormat {
    #[default]
    TimeSeries,
    Heatmap,
    Table,
}

/// A single query bound to a panel. The expression is opaque text and is
/// never parsed beyond extracting `${name}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub expression: String,
    pub legend_format: String,
    pub instant: bool,
    pub format: QueryFormat,
    pub datasource: Option<String>,
}

impl QuerySpec {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            legend_format: String::new(),
            instant: false,
            format: QueryFormat::default(),
            datasource: None,
        }
    }

    pub fn legend(mut self, legend_format: impl Into<String>) -> Self {
        self.legend_format = legend_format.into();
        self
    }

    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn format(mut self, format: QueryFormat) -> Self {
        self.format = format;
        self
    }

    /// Route this query to a datasource other than the panel's own.
    pub fn datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = Some(datasource.into());
        self
    }

    /// Names of `${name}` placeholders in the expression, in order of appearance.
    /// A `${name:format}` placeholder yields `name`.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.expression.as_str();
        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            let inner = &after[..end];
            let name = inner.split(':').next().unwrap_or(inner);
            if !name.is_empty() {
                names.push(name);
            }
            rest = &after[end + 1..];
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub color: String,
    pub index: u32,
    pub value: f64,
}

impl Threshold {
    pub fn new(color: impl Into<String>, index: u32, value: f64) -> Self {
        Self {
            color: color.into(),
            index,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatcher {
    pub field: String,
    pub target_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOverride {
    pub matcher: FieldMatcher,
    pub property_id: String,
    pub property_value: Value,
}

impl FieldOverride {
    pub fn by_name(
        target_name: impl Into<String>,
        property_id: impl Into<String>,
        property_value: impl Into<Value>,
    ) -> Self {
        Self {
            matcher: FieldMatcher {
                field: "byName".to_string(),
                target_name: target_name.into(),
            },
            property_id: property_id.into(),
            property_value: property_value.into(),
        }
    }
}

/// Immutable description of one visual element. Built through
/// [`PanelBuilder`]; sizing is only changed by the layout engine's resize.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDescriptor {
    kind: PanelKind,
    title: String,
    description: Option<String>,
    datasource: Option<String>,
    queries: Vec<QuerySpec>,
    options: BTreeMap<String, Value>,
    thresholds: Vec<Threshold>,
    overrides: Vec<FieldOverride>,
    width: Option<u32>,
    height: Option<u32>,
}

impl PanelDescriptor {
    pub fn stat(title: impl Into<String>, datasource: impl Into<String>) -> PanelBuilder {
        PanelBuilder::new(PanelKind::Stat, title, datasource)
    }

    pub fn gauge(title: impl Into<String>, datasource: impl Into<String>) -> PanelBuilder {
        PanelBuilder::new(PanelKind::Gauge, title, datasource)
    }

    pub fn time_series(title: impl Into<String>, datasource: impl Into<String>) -> PanelBuilder {
        PanelBuilder::new(PanelKind::TimeSeries, title, datasource)
    }

    pub fn heatmap(title: impl Into<String>, datasource: impl Into<String>) -> PanelBuilder {
        PanelBuilder::new(PanelKind::Heatmap, title, datasource)
    }

    pub fn bar_gauge(title: impl Into<String>, datasource: impl Into<String>) -> PanelBuilder {
        PanelBuilder::new(PanelKind::BarGauge, title, datasource)
    }

    /// A row header. Rows carry no data, so only the title is required.
    pub fn row(title: impl Into<String>) -> Result<Self, DashboardError> {
        PanelBuilder::new(PanelKind::Row, title, String::new()).build()
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn datasource(&self) -> Option<&str> {
        self.datasource.as_deref()
    }

    pub fn queries(&self) -> &[QuerySpec] {
        &self.queries
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    pub fn overrides(&self) -> &[FieldOverride] {
        &self.overrides
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn is_row(&self) -> bool {
        self.kind == PanelKind::Row
    }

    /// Copy with explicit size overrides; unset dimensions keep their current value.
    pub(crate) fn with_size(&self, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.or(self.width),
            height: height.or(self.height),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelBuilder {
    kind: PanelKind,
    title: String,
    description: Option<String>,
    datasource: String,
    queries: Vec<QuerySpec>,
    options: BTreeMap<String, Value>,
    thresholds: Vec<Threshold>,
    overrides: Vec<FieldOverride>,
}

impl PanelBuilder {
    fn new(kind: PanelKind, title: impl Into<String>, datasource: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            datasource: datasource.into(),
            queries: Vec::new(),
            options: BTreeMap::new(),
            thresholds: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn query(mut self, query: QuerySpec) -> Self {
        self.queries.push(query);
        self
    }

    pub fn queries(mut self, queries: impl IntoIterator<Item = QuerySpec>) -> Self {
        self.queries.extend(queries);
        self
    }

    /// Set a display option. Later calls with the same key replace earlier ones.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    pub fn thresholds(mut self, thresholds: impl IntoIterator<Item = Threshold>) -> Self {
        self.thresholds.extend(thresholds);
        self
    }

    pub fn field_override(mut self, field_override: FieldOverride) -> Self {
        self.overrides.push(field_override);
        self
    }

    pub fn build(mut self) -> Result<PanelDescriptor, DashboardError> {
        if self.title.trim().is_empty() {
            return Err(DashboardError::invalid_panel(&self.title, "title is empty"));
        }

        let datasource = if self.kind == PanelKind::Row {
            None
        } else {
            if self.datasource.trim().is_empty() {
                return Err(DashboardError::invalid_panel(&self.title, "datasource is empty"));
            }
            if self.queries.is_empty() {
                return Err(DashboardError::invalid_panel(&self.title, "panel has no queries"));
            }
            Some(self.datasource)
        };

        // Indices must be exactly 0..n once sorted
        self.thresholds.sort_by_key(|t| t.index);
        for (position, threshold) in self.thresholds.iter().enumerate() {
            if threshold.index as usize != position {
                return Err(DashboardError::invalid_panel(
                    &self.title,
                    format!(
                        "threshold indices are not contiguous from 0 (expected {}, found {})",
                        position, threshold.index
                    ),
                ));
            }
        }

        Ok(PanelDescriptor {
            kind: self.kind,
            title: self.title,
            description: self.description,
            datasource,
            queries: self.queries,
            options: self.options,
            thresholds: self.thresholds,
            overrides: self.overrides,
            width: None,
            height: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up_query() -> QuerySpec {
        QuerySpec::new(r#"sum(up{namespace="${namespace}", job="${job}"})"#)
    }

    #[test]
    fn test_build_stat_panel() {
        let panel = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(up_query())
            .option("reduceCalc", "lastNotNull")
            .thresholds([Threshold::new("red", 0, 0.0), Threshold::new("green", 1, 1.0)])
            .build()
            .unwrap();

        assert_eq!(panel.kind(), PanelKind::Stat);
        assert_eq!(panel.title(), "Up");
        assert_eq!(panel.datasource(), Some("${DS_PROMETHEUS}"));
        assert_eq!(panel.queries().len(), 1);
        assert_eq!(panel.options()["reduceCalc"], Value::from("lastNotNull"));
        assert_eq!(panel.width(), None);
        assert_eq!(panel.height(), None);
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let err = PanelDescriptor::gauge("  ", "${DS_PROMETHEUS}")
            .query(up_query())
            .build()
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidPanel { .. }));
    }

    #[test]
    fn test_empty_datasource_is_rejected() {
        let err = PanelDescriptor::time_series("Bandwidth", "")
            .query(up_query())
            .build()
            .unwrap_err();
        match err {
            DashboardError::InvalidPanel { title, reason } => {
                assert_eq!(title, "Bandwidth");
                assert!(reason.contains("datasource"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_panel_without_queries_is_rejected() {
        let err = PanelDescriptor::heatmap("Request time", "${DS_PROMETHEUS}")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidPanel { ref reason, .. } if reason.contains("queries")
        ));
    }

    #[test]
    fn test_row_needs_no_datasource_or_queries() {
        let row = PanelDescriptor::row("Latency").unwrap();
        assert!(row.is_row());
        assert_eq!(row.datasource(), None);
        assert!(row.queries().is_empty());

        assert!(PanelDescriptor::row("").is_err());
    }

    #[test]
    fn test_thresholds_are_sorted_by_index() {
        let panel = PanelDescriptor::gauge("Success rate", "${DS_PROMETHEUS}")
            .query(up_query())
            .thresholds([
                Threshold::new("green", 2, 90.0),
                Threshold::new("red", 0, 0.0),
                Threshold::new("orange", 1, 80.0),
            ])
            .build()
            .unwrap();

        let colors: Vec<&str> = panel.thresholds().iter().map(|t| t.color.as_str()).collect();
        assert_eq!(colors, vec!["red", "orange", "green"]);
    }

    #[test]
    fn test_non_contiguous_thresholds_are_rejected() {
        let gap = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(up_query())
            .thresholds([Threshold::new("red", 0, 0.0), Threshold::new("green", 2, 1.0)])
            .build();
        assert!(gap.is_err());

        let not_from_zero = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(up_query())
            .threshold(Threshold::new("green", 1, 1.0))
            .build();
        assert!(not_from_zero.is_err());

        let duplicate = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(up_query())
            .thresholds([Threshold::new("red", 0, 0.0), Threshold::new("green", 0, 1.0)])
            .build();
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_query_placeholders() {
        let query = QuerySpec::new(
            r#"sum(rate(x{namespace="${namespace}", job="${job:raw}"}[$__rate_interval])) ${unterminated"#,
        );
        assert_eq!(query.placeholders(), vec!["namespace", "job"]);
        assert!(QuerySpec::new("sum(up)").placeholders().is_empty());
    }

    #[test]
    fn test_with_size_keeps_existing_dimension() {
        let panel = PanelDescriptor::stat("Up", "${DS_PROMETHEUS}")
            .query(up_query())
            .build()
            .unwrap();
        let sized = panel.with_size(Some(2), Some(4)).with_size(None, Some(6));
        assert_eq!(sized.width(), Some(2));
        assert_eq!(sized.height(), Some(6));
        assert_eq!(panel.width(), None);
    }
}
