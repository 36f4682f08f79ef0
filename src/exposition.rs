//! Prometheus text exposition format rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Content type for the exposition format, as served over HTTP.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// The TYPE comment string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// Static description of one metric family.
#[derive(Debug)]
pub struct MetricDesc {
    /// Full metric name, including namespace prefix.
    pub name: &'static str,
    /// HELP text.
    pub help: &'static str,
    pub kind: MetricKind,
}

/// One sample produced during a scrape: a family, a label set and a value.
#[derive(Debug, Clone)]
pub struct MetricSample {
    pub desc: &'static MetricDesc,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl MetricSample {
    /// Create a sample labeled with its source device topic.
    pub fn new(desc: &'static MetricDesc, source: impl Into<String>, value: f64) -> Self {
        Self {
            desc,
            labels: vec![("source", source.into())],
            value,
        }
    }

    /// Create a sample with no labels at all.
    pub fn unlabeled(desc: &'static MetricDesc, value: f64) -> Self {
        Self {
            desc,
            labels: Vec::new(),
            value,
        }
    }

    /// Attach an additional label dimension.
    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }
}

/// Render samples in exposition format.
///
/// Families are sorted by name and samples within a family by label set, so
/// consecutive scrapes of the same state produce byte-identical output.
pub fn render(samples: &[MetricSample]) -> String {
    let mut by_name: BTreeMap<&'static str, (&'static MetricDesc, Vec<&MetricSample>)> =
        BTreeMap::new();
    for sample in samples {
        by_name
            .entry(sample.desc.name)
            .or_insert((sample.desc, Vec::new()))
            .1
            .push(sample);
    }

    let mut output = String::with_capacity(samples.len() * 80);
    for (name, (desc, mut series)) in by_name {
        writeln!(output, "# HELP {} {}", name, desc.help).ok();
        writeln!(output, "# TYPE {} {}", name, desc.kind.as_str()).ok();

        series.sort_by(|a, b| a.labels.cmp(&b.labels));
        for sample in series {
            writeln!(
                output,
                "{}{} {}",
                name,
                format_labels(&sample.labels),
                format_value(sample.value)
            )
            .ok();
        }
    }
    output
}

/// Format a label set as `{k="v",...}`, empty string for no labels.
fn format_labels(labels: &[(&'static str, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition format.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
