// CloudServer dashboard - panel catalog and layout
use crate::domain::dashboard::{DashboardDocument, InputVariable};
use crate::domain::error::DashboardError;
use crate::domain::layout::Layout;
use crate::domain::panel::{FieldOverride, PanelDescriptor, QueryFormat, QuerySpec, Threshold};
use serde_json::{Value, json};
use std::collections::HashMap;

pub const DS_PROMETHEUS: &str = "${DS_PROMETHEUS}";
pub const DS_LOKI: &str = "${DS_LOKI}";

const UNIT_SHORT: &str = "short";
const UNIT_PERCENT: &str = "percent";
const UNIT_SECONDS: &str = "s";
const UNIT_DURATION_SECONDS: &str = "dtdurations";
const UNIT_BYTES: &str = "bytes";
const UNIT_BINARY_BPS: &str = "binBps";

const DEFAULT_NAMESPACE: &str = "zenko";
const DEFAULT_JOB: &str = "artesca-data-connector-s3api-metrics";
const DEFAULT_POD: &str = "artesca-data-connector-cloudserver";

const ASYNC_COUNT_NOTE: &str =
    "This value is computed asynchronously, and update may be delayed up to 1h.";

fn reduce(calc: &str) -> Value {
    json!({ "calcs": [calc], "fields": "", "values": false })
}

fn sum_increase(metric: &str, extra_labels: &str) -> String {
    format!(
        r#"sum(increase({metric}{{namespace="${{namespace}}", job="${{job}}"{extra_labels}}}[$__rate_interval]))"#
    )
}

fn http_status_panel(title: &str, code: &str) -> Result<PanelDescriptor, DashboardError> {
    PanelDescriptor::stat(title, DS_PROMETHEUS)
        .option("colorMode", "background")
        .option("decimals", 0)
        .option("unit", UNIT_SHORT)
        .option("noValue", "0")
        .option("reduceOptions", reduce("lastNotNull"))
        .query(QuerySpec::new(sum_increase(
            "http_requests_total",
            &format!(", code={code}"),
        )))
        .threshold(Threshold::new("semi-dark-blue", 0, 0.0))
        .build()
}

fn http_aggregated_request_target(title: &str, code: &str) -> QuerySpec {
    QuerySpec::new(sum_increase("http_requests_total", &format!(", code={code}"))).legend(title)
}

fn color_override(name: &str, color: &str) -> FieldOverride {
    FieldOverride::by_name(name, "color", json!({ "fixedColor": color, "mode": "fixed" }))
}

fn axis_placement_override(name: &str, placement: &str) -> FieldOverride {
    FieldOverride::by_name(name, "custom.axisPlacement", placement)
}

fn average_latency_target(title: &str, action: Option<&str>) -> QuerySpec {
    let extra = action.map(|a| format!(", action={a}")).unwrap_or_default();
    let rate = |metric: &str| {
        format!(
            r#"sum(rate({metric}{{namespace="${{namespace}}", job="${{job}}"{extra}}}[$__rate_interval]))"#
        )
    };

    QuerySpec::new(
        [
            rate("http_request_duration_seconds_sum"),
            "   /".to_string(),
            rate("http_request_duration_seconds_count"),
        ]
        .join("\n"),
    )
    .legend(title)
}

fn top10_errors_by_bucket(title: &str, code: &str) -> Result<PanelDescriptor, DashboardError> {
    let expression = [
        "topk(10, sum by(bucketName) (".to_string(),
        r#"    count_over_time({namespace="${namespace}", pod=~"${pod}-.*"}"#.to_string(),
        format!(r#"                    | json | bucketName!="" and httpCode={code}"#),
        "                    [$__interval])".to_string(),
        "))".to_string(),
    ]
    .join("\n");

    PanelDescriptor::time_series(title, DS_LOKI)
        .query(QuerySpec::new(expression))
        .build()
}

fn chunk_size_panel(title: &str) -> Result<PanelDescriptor, DashboardError> {
    PanelDescriptor::bar_gauge(title, DS_PROMETHEUS)
        .option("reduceOptions", reduce("last"))
        .option("displayMode", "gradient")
        .option("orientation", "vertical")
        .option("unit", UNIT_BYTES)
        .query(
            QuerySpec::new(
                r#"sum(increase(http_request_size_bytes{namespace="${namespace}",service="${job}"}[$__interval])) by (le)"#,
            )
            .format(QueryFormat::Heatmap)
            .legend("{{ le }}"),
        )
        .threshold(Threshold::new("green", 0, 0.0))
        .build()
}

const CONSTANT_INPUTS: [&str; 3] = ["namespace", "job", "pod"];

/// Keys of `constants` that do not name one of the dashboard's constant inputs
fn unknown_constants(constants: &HashMap<String, String>) -> Vec<&str> {
    let mut unknown: Vec<&str> = constants
        .keys()
        .map(String::as_str)
        .filter(|key| !CONSTANT_INPUTS.contains(key))
        .collect();
    unknown.sort_unstable();
    unknown
}

fn inputs(constants: &HashMap<String, String>) -> Vec<InputVariable> {
    for key in unknown_constants(constants) {
        tracing::warn!(
            "Ignoring constant '{}': expected one of {}",
            key,
            CONSTANT_INPUTS.join(", ")
        );
    }

    let value = |name: &str, default: &str| {
        constants
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };

    vec![
        InputVariable::datasource("DS_PROMETHEUS", "Prometheus", "prometheus", "Prometheus"),
        InputVariable::datasource("DS_LOKI", "Loki", "loki", "Loki"),
        InputVariable::constant(
            "namespace",
            "namespace",
            "Namespace associated with the Zenko instance",
            value("namespace", DEFAULT_NAMESPACE),
        ),
        InputVariable::constant(
            "job",
            "job",
            "Name of the Cloudserver job, used to filter only the Cloudserver instances.",
            value("job", DEFAULT_JOB),
        ),
        InputVariable::constant(
            "pod",
            "pod",
            "Prefix of the Cloudserver pod names, used to filter only the Cloudserver instances.",
            value("pod", DEFAULT_POD),
        ),
    ]
}

/// Build the CloudServer dashboard. `constants` replaces the default values of
/// the namespace/job/pod inputs. The result still needs its finishing passes.
pub fn cloudserver_dashboard(
    constants: &HashMap<String, String>,
) -> Result<DashboardDocument, DashboardError> {
    let up = PanelDescriptor::stat("Up", DS_PROMETHEUS)
        .option("reduceOptions", reduce("lastNotNull"))
        .query(QuerySpec::new(r#"sum(up{namespace="${namespace}", job="${job}"})"#))
        .thresholds([Threshold::new("red", 0, 0.0), Threshold::new("green", 1, 1.0)])
        .build()?;

    let http_requests = PanelDescriptor::stat("Http requests", DS_PROMETHEUS)
        .option("decimals", 0)
        .option("unit", UNIT_SHORT)
        .option("reduceOptions", reduce("last"))
        .query(QuerySpec::new(sum_increase("http_requests_total", "")))
        .threshold(Threshold::new("green", 0, 0.0))
        .build()?;

    let success_rate = PanelDescriptor::gauge("Success rate", DS_PROMETHEUS)
        .option("reduceOptions", reduce("lastNotNull"))
        .option("unit", UNIT_PERCENT)
        .option("min", 0)
        .option("max", 100)
        .query(
            QuerySpec::new(
                [
                    r#"sum(rate(http_requests_total{namespace="${namespace}", job="${job}", code=~"2.."}[$__rate_interval])) * 100"#,
                    "   /",
                    r#"sum(rate(http_requests_total{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
                ]
                .join("\n"),
            )
            .instant()
            .legend("Success rate"),
        )
        .thresholds([
            Threshold::new("red", 0, 0.0),
            Threshold::new("orange", 1, 80.0),
            Threshold::new("green", 2, 90.0),
        ])
        .build()?;

    let buckets = PanelDescriptor::stat("Buckets", DS_PROMETHEUS)
        .description(format!(
            "Number of S3 buckets available in the cluster.\n{ASYNC_COUNT_NOTE}"
        ))
        .option("colorMode", "background")
        .option("reduceOptions", reduce("lastNotNull"))
        .query(QuerySpec::new(
            r#"sum(cloud_server_number_of_buckets{namespace="${namespace}",job="${job}"})"#,
        ))
        .threshold(Threshold::new("dark-purple", 0, 0.0))
        .build()?;

    let objects = PanelDescriptor::stat("Objects", DS_PROMETHEUS)
        .description(format!(
            "Number of S3 objects available in the cluster.\n{ASYNC_COUNT_NOTE}"
        ))
        .option("colorMode", "background")
        .option("unit", UNIT_SHORT)
        .option("reduceOptions", reduce("lastNotNull"))
        .query(QuerySpec::new(
            r#"sum(cloud_server_number_of_objects{namespace="${namespace}",job="${job}"})"#,
        ))
        .threshold(Threshold::new("dark-purple", 0, 0.0))
        .build()?;

    let disk_delta = |metric: &str, legend: &str| {
        QuerySpec::new(format!(
            r#"sum(delta({metric}{{namespace="${{namespace}}",job="${{job}}"}}[$__rate_interval]))"#
        ))
        .legend(legend)
    };
    let data_disk_storage = PanelDescriptor::time_series("Data disk storage", DS_PROMETHEUS)
        .option("custom.fillOpacity", 30)
        .option("custom.lineInterpolation", "smooth")
        .queries([
            disk_delta("cloud_server_data_disk_total", "Total"),
            disk_delta("cloud_server_data_disk_free", "Free"),
            disk_delta("cloud_server_data_disk_available", "Available"),
        ])
        .build()?;

    let status_200 = http_status_panel("Status 200", r#""200""#)?;
    let status_4xx = http_status_panel("Status 4xx", r#"~"4..""#)?;
    let status_5xx = http_status_panel("Status 5xx", r#"~"5..""#)?;

    let active_requests = PanelDescriptor::stat("Active requests", DS_PROMETHEUS)
        .option("reduceOptions", reduce("lastNotNull"))
        .query(QuerySpec::new(
            r#"sum(http_active_requests{namespace="${namespace}", job="${job}"})"#,
        ))
        .thresholds([Threshold::new("green", 0, 0.0), Threshold::new("red", 1, 80.0)])
        .build()?;

    let oob_data_rate = PanelDescriptor::stat("OOB Inject. Data Rate", DS_PROMETHEUS)
        .description(
            "Rate of data ingested out-of-band (OOB) : cumulative amount of OOB \
             data created (>0) or freed (<0) per second.",
        )
        .option("colorMode", "background")
        .option("unit", UNIT_BINARY_BPS)
        .option("reduceOptions", reduce("last"))
        .query(QuerySpec::new(
            r#"sum(deriv(cloud_server_data_ingested{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
        ))
        .threshold(Threshold::new("purple", 0, 0.0))
        .build()?;

    let oob_object_rate = PanelDescriptor::stat("OOB Inject. Rate", DS_PROMETHEUS)
        .description(
            "Rate of object ingested out-of-band (OOB) : cumulative count of OOB \
             object created (>0) or freed (<0) per second.",
        )
        .option("colorMode", "background")
        .option("unit", "O/s")
        .option("reduceOptions", reduce("last"))
        .query(QuerySpec::new(
            r#"sum(deriv(cloud_server_number_of_ingested_objects{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
        ))
        .threshold(Threshold::new("purple", 0, 0.0))
        .build()?;

    let http_status_codes =
        PanelDescriptor::time_series("Http status code over time", DS_PROMETHEUS)
            .option("decimals", 0)
            .option("unit", UNIT_SHORT)
            .option("custom.fillOpacity", 30)
            .option("custom.lineInterpolation", "smooth")
            .query(
                QuerySpec::new(
                    r#"sum by (code) (increase(http_requests_total{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
                )
                .legend("{{code}}"),
            )
            .build()?;

    let aggregated_status =
        PanelDescriptor::time_series("Aggregated status over time", DS_PROMETHEUS)
            .option("decimals", 0)
            .option("unit", UNIT_SHORT)
            .option("custom.fillOpacity", 39)
            .option("custom.lineInterpolation", "smooth")
            .option("custom.scaleDistribution", json!({ "type": "log", "log": 2 }))
            .option("custom.stacking", json!({ "mode": "normal", "group": "A" }))
            .queries([
                http_aggregated_request_target("Success", r#"~"2..""#),
                http_aggregated_request_target("User errors", r#"~"4..""#),
                http_aggregated_request_target("System errors", r#"~"5..""#),
            ])
            .field_override(color_override("Success", "dark-blue"))
            .field_override(color_override("User errors", "semi-dark-orange"))
            .field_override(color_override("System errors", "semi-dark-red"))
            .build()?;

    let average_latencies = PanelDescriptor::time_series("Average latencies", DS_PROMETHEUS)
        .option("unit", UNIT_SECONDS)
        .option("custom.lineInterpolation", "smooth")
        .queries([
            average_latency_target("Overall", None),
            average_latency_target(
                "Upload",
                Some(r#"~"objectPut|objectPutPart|objectCopy|objectPutCopyPart""#),
            ),
            average_latency_target("Delete", Some(r#""objectDelete""#)),
            average_latency_target("Download", Some(r#""objectGet""#)),
            average_latency_target("Multi-delete", Some(r#"~"multiObjectDelete|multipartDelete""#)),
        ])
        .build()?;

    let request_time = PanelDescriptor::heatmap("Request time", DS_PROMETHEUS)
        .option("dataFormat", "tsbuckets")
        .option("maxDataPoints", 25)
        .option("tooltip", json!({ "show": true, "showHistogram": true }))
        .option("yAxis", json!({ "format": UNIT_DURATION_SECONDS }))
        .option("color", json!({ "mode": "opacity" }))
        .query(
            QuerySpec::new(
                r#"sum by(le) (increase(http_request_duration_seconds_bucket{namespace="${namespace}", job="${job}"}[$__interval]))"#,
            )
            .format(QueryFormat::Heatmap)
            .legend("{{ le }}"),
        )
        .build()?;

    let bandwidth = PanelDescriptor::time_series("Bandwidth", DS_PROMETHEUS)
        .option("unit", UNIT_BINARY_BPS)
        .queries([
            QuerySpec::new(
                r#"sum(rate(http_response_size_bytes_sum{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
            )
            .legend("Out"),
            QuerySpec::new(
                r#"sum(rate(http_request_size_bytes_sum{namespace="${namespace}", job="${job}"}[$__rate_interval]))"#,
            )
            .legend("In"),
        ])
        .thresholds([Threshold::new("green", 0, 0.0), Threshold::new("red", 1, 80.0)])
        .field_override(axis_placement_override("Out", "right"))
        .build()?;

    let upload_chunk_size = chunk_size_panel("Upload chunk size")?;
    let download_chunk_size = chunk_size_panel("Download chunk size")?;

    let top10_404 = top10_errors_by_bucket("404 : Top10 by Bucket", r#""404""#)?;
    let top10_500 = top10_errors_by_bucket("500 : Top10 by Bucket", r#""500""#)?;
    let top10_5xx = top10_errors_by_bucket("5xx : Top10 by Bucket", r#"~"5..""#)?;

    let mut layout = Layout::default();

    let mut overview = vec![up, http_requests, success_rate, buckets, objects];
    overview.extend(Layout::resize([data_disk_storage], Some(9), Some(8))?);
    let overview = layout.row(overview, Some(4), None)?;

    let mut requests = vec![status_200];
    requests.extend(Layout::resize([status_4xx, status_5xx, active_requests], Some(2), None)?);
    requests.extend([oob_data_rate, oob_object_rate]);
    let requests = layout.row(requests, Some(4), Some(3))?;

    let response_codes = layout.row(vec![http_status_codes, aggregated_status], Some(8), None)?;
    let latency = layout.row(vec![average_latencies, request_time], Some(8), None)?;

    let mut data_rate = Layout::resize([bandwidth], Some(12), None)?;
    data_rate.extend([upload_chunk_size, download_chunk_size]);
    let data_rate = layout.row(data_rate, Some(8), None)?;

    let errors = layout.row(vec![top10_404, top10_500, top10_5xx], Some(8), None)?;

    let column = layout.column(vec![
        overview.into(),
        requests.into(),
        PanelDescriptor::row("Response codes")?.into(),
        response_codes.into(),
        PanelDescriptor::row("Latency")?.into(),
        latency.into(),
        PanelDescriptor::row("Data rate")?.into(),
        data_rate.into(),
        PanelDescriptor::row("Errors")?.into(),
        errors.into(),
    ])?;

    DashboardDocument::builder("CloudServer")
        .editable(true)
        .refresh("30s")
        .tag("CloudServer")
        .timezone("")
        .inputs(inputs(constants))
        .panels(column)
        .build()
}
