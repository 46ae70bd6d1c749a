// Mapper to convert the dashboard document to Grafana's dashboard JSON model
use crate::domain::dashboard::{DashboardDocument, InputKind, InputVariable};
use crate::domain::layout::PlacedPanel;
use crate::domain::panel::{FieldOverride, PanelKind, QueryFormat, QuerySpec, Threshold};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const SCHEMA_VERSION: u32 = 39;

/// Display options that belong to the field defaults rather than panel options.
const FIELD_DEFAULT_KEYS: &[&str] = &["unit", "decimals", "min", "max", "noValue"];
const CUSTOM_PREFIX: &str = "custom.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaDashboard {
    #[serde(rename = "__inputs")]
    pub inputs: Vec<GrafanaInput>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    pub timezone: String,
    pub editable: bool,
    pub schema_version: u32,
    pub time: GrafanaTimeRange,
    pub panels: Vec<GrafanaPanel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrafanaTimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GrafanaInput {
    Datasource {
        name: String,
        label: String,
        description: String,
        #[serde(rename = "pluginId")]
        plugin_id: String,
        #[serde(rename = "pluginName")]
        plugin_name: String,
    },
    Constant {
        name: String,
        label: String,
        description: String,
        value: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaPanel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(rename = "type")]
    pub panel_type: &'static str,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
    pub grid_pos: GrafanaGridPos,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<GrafanaTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_config: Option<GrafanaFieldConfig>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panels: Option<Vec<GrafanaPanel>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrafanaGridPos {
    pub h: u32,
    pub w: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaTarget {
    pub expr: String,
    pub legend_format: String,
    pub instant: bool,
    pub format: &'static str,
    pub ref_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrafanaFieldConfig {
    pub defaults: Map<String, Value>,
    pub overrides: Vec<GrafanaOverride>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrafanaOverride {
    pub matcher: GrafanaMatcher,
    pub properties: Vec<GrafanaProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrafanaMatcher {
    pub id: String,
    pub options: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrafanaProperty {
    pub id: String,
    pub value: Value,
}

pub fn dashboard_to_grafana(dashboard: &DashboardDocument) -> GrafanaDashboard {
    GrafanaDashboard {
        inputs: dashboard.inputs().iter().map(input_to_grafana).collect(),
        title: dashboard.title.clone(),
        description: dashboard.description.clone(),
        uid: dashboard.uid.clone(),
        tags: dashboard.tags.iter().cloned().collect(),
        refresh: dashboard.refresh.clone(),
        timezone: dashboard.timezone.clone(),
        editable: dashboard.editable,
        schema_version: SCHEMA_VERSION,
        time: GrafanaTimeRange {
            from: dashboard.time_from.clone(),
            to: dashboard.time_to.clone(),
        },
        panels: dashboard.panels().iter().map(panel_to_grafana).collect(),
    }
}

fn input_to_grafana(input: &InputVariable) -> GrafanaInput {
    match &input.kind {
        InputKind::DataSource {
            plugin_id,
            plugin_name,
        } => GrafanaInput::Datasource {
            name: input.name.clone(),
            label: input.label.clone(),
            description: input.description.clone(),
            plugin_id: plugin_id.clone(),
            plugin_name: plugin_name.clone(),
        },
        InputKind::Constant => GrafanaInput::Constant {
            name: input.name.clone(),
            label: input.label.clone(),
            description: input.description.clone(),
            value: input.default_value.clone().unwrap_or_default(),
        },
    }
}

fn panel_to_grafana(placed: &PlacedPanel) -> GrafanaPanel {
    let panel = &placed.descriptor;
    let grid_pos = GrafanaGridPos {
        h: placed.position.height,
        w: placed.position.width,
        x: placed.position.x,
        y: placed.position.y,
    };

    let mut grafana = GrafanaPanel {
        id: placed.id,
        panel_type: panel_type(panel.kind()),
        title: panel.title().to_string(),
        description: panel.description().map(str::to_string),
        datasource: panel.datasource().map(str::to_string),
        grid_pos,
        targets: Vec::new(),
        field_config: None,
        options: Map::new(),
        collapsed: None,
        panels: None,
    };

    if panel.is_row() {
        grafana.collapsed = Some(!placed.children.is_empty());
        grafana.panels = Some(placed.children.iter().map(panel_to_grafana).collect());
        return grafana;
    }

    let mut defaults = Map::new();
    let mut custom = Map::new();
    for (key, value) in panel.options() {
        if let Some(custom_key) = key.strip_prefix(CUSTOM_PREFIX) {
            custom.insert(custom_key.to_string(), value.clone());
        } else if FIELD_DEFAULT_KEYS.contains(&key.as_str()) {
            defaults.insert(key.clone(), value.clone());
        } else {
            grafana.options.insert(key.clone(), value.clone());
        }
    }
    if !custom.is_empty() {
        defaults.insert("custom".to_string(), Value::Object(custom));
    }
    if !panel.thresholds().is_empty() {
        defaults.insert("thresholds".to_string(), thresholds_to_grafana(panel.thresholds()));
    }

    grafana.targets = panel
        .queries()
        .iter()
        .enumerate()
        .map(|(position, query)| target_to_grafana(position, query))
        .collect();
    grafana.field_config = Some(GrafanaFieldConfig {
        defaults,
        overrides: overrides_to_grafana(panel.overrides()),
    });
    grafana
}

fn panel_type(kind: PanelKind) -> &'static str {
    match kind {
        PanelKind::Stat => "stat",
        PanelKind::Gauge => "gauge",
        PanelKind::TimeSeries => "timeseries",
        PanelKind::Heatmap => "heatmap",
        PanelKind::BarGauge => "bargauge",
        PanelKind::Row => "row",
    }
}

fn target_to_grafana(position: usize, query: &QuerySpec) -> GrafanaTarget {
    let format = match query.format {
        QueryFormat::TimeSeries => "time_series",
        QueryFormat::Heatmap => "heatmap",
        QueryFormat::Table => "table",
    };

    GrafanaTarget {
        expr: query.expression.clone(),
        legend_format: query.legend_format.clone(),
        instant: query.instant,
        format,
        ref_id: ref_id(position),
        datasource: query.datasource.clone(),
    }
}

/// Spreadsheet-style target letters: A..Z, AA, AB, ...
fn ref_id(position: usize) -> String {
    let mut n = position + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

// The base step (index 0) has no lower bound.
fn thresholds_to_grafana(thresholds: &[Threshold]) -> Value {
    let steps: Vec<Value> = thresholds
        .iter()
        .map(|t| {
            let value = if t.index == 0 { Value::Null } else { json!(t.value) };
            json!({ "color": t.color, "value": value })
        })
        .collect();

    json!({ "mode": "absolute", "steps": steps })
}

/// Consecutive overrides on the same matcher collapse into one entry.
fn overrides_to_grafana(overrides: &[FieldOverride]) -> Vec<GrafanaOverride> {
    let mut grouped: Vec<GrafanaOverride> = Vec::new();

    for field_override in overrides {
        let matcher = GrafanaMatcher {
            id: field_override.matcher.field.clone(),
            options: field_override.matcher.target_name.clone(),
        };
        let property = GrafanaProperty {
            id: field_override.property_id.clone(),
            value: field_override.property_value.clone(),
        };

        match grouped.last_mut() {
            Some(last) if last.matcher == matcher => last.properties.push(property),
            _ => grouped.push(GrafanaOverride {
                matcher,
                properties: vec![property],
            }),
        }
    }

    grouped
}
