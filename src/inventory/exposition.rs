//! Prometheus text exposition parser
//!
//! Decodes the kubelet `/metrics` document (text format 0.0.4) into metric
//! families keyed by name. A malformed line rejects the whole document, so a
//! truncated or HTML error body never yields partial families.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;

// =============================================================================
// Metric Types
// =============================================================================

/// Declared type of a metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "histogram" => Some(MetricKind::Histogram),
            "summary" => Some(MetricKind::Summary),
            "untyped" => Some(MetricKind::Untyped),
            _ => None,
        }
    }

    /// Histograms and summaries expose `_bucket`, `_sum` and `_count` series
    fn has_suffixed_series(&self) -> bool {
        matches!(self, MetricKind::Histogram | MetricKind::Summary)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Histogram => write!(f, "histogram"),
            MetricKind::Summary => write!(f, "summary"),
            MetricKind::Untyped => write!(f, "untyped"),
        }
    }
}

/// A sample value, tagged by the family type it was read under
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Gauge(f64),
    Untyped(f64),
    Counter(f64),
    /// A `_bucket`/`_sum`/`_count` series of a histogram or summary
    Distribution(f64),
}

impl SampleValue {
    fn new(kind: MetricKind, value: f64) -> Self {
        match kind {
            MetricKind::Gauge => SampleValue::Gauge(value),
            MetricKind::Untyped => SampleValue::Untyped(value),
            MetricKind::Counter => SampleValue::Counter(value),
            MetricKind::Histogram | MetricKind::Summary => SampleValue::Distribution(value),
        }
    }

    /// The reading of a gauge or untyped sample
    pub fn gauge_or_untyped(&self) -> Option<f64> {
        match *self {
            SampleValue::Gauge(v) | SampleValue::Untyped(v) => Some(v),
            _ => None,
        }
    }
}

/// One sample line
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Series name as written (may carry a histogram suffix)
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: SampleValue,
    pub timestamp_ms: Option<i64>,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// A named metric family
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: Option<String>,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    fn new(name: &str, kind: MetricKind) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            kind,
            samples: Vec::new(),
        }
    }
}

// =============================================================================
// Exposition
// =============================================================================

/// A parsed exposition document
#[derive(Debug, Clone, Default)]
pub struct Exposition {
    families: IndexMap<String, MetricFamily>,
}

impl Exposition {
    /// Parse a text exposition document
    pub fn parse(text: &str) -> Result<Self> {
        let mut expo = Exposition::default();

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix('#') {
                expo.parse_comment(comment.trim_start(), line_no)?;
                continue;
            }

            let sample = parse_sample_line(line, line_no)?;
            expo.push_sample(sample);
        }

        Ok(expo)
    }

    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    fn parse_comment(&mut self, comment: &str, line_no: usize) -> Result<()> {
        let (keyword, rest) = split_token(comment);
        if keyword != "HELP" && keyword != "TYPE" {
            return Ok(());
        }

        let (name, rest) = split_token(rest);
        if !is_metric_name(name) {
            return Err(parse_error(
                line_no,
                format!("{} without a valid metric name", keyword),
            ));
        }
        let rest = rest.trim();

        if keyword == "HELP" {
            let family = self
                .families
                .entry(name.to_string())
                .or_insert_with(|| MetricFamily::new(name, MetricKind::Untyped));
            if family.help.is_some() {
                return Err(parse_error(line_no, format!("second HELP line for {}", name)));
            }
            family.help = Some(unescape_help(rest));
            return Ok(());
        }

        let kind = MetricKind::parse(rest)
            .ok_or_else(|| parse_error(line_no, format!("unknown metric type {:?}", rest)))?;
        match self.families.get_mut(name) {
            Some(family) if !family.samples.is_empty() => Err(parse_error(
                line_no,
                format!("TYPE line for {} after its samples", name),
            )),
            Some(family) if family.kind != MetricKind::Untyped => Err(parse_error(
                line_no,
                format!("second TYPE line for {}", name),
            )),
            Some(family) => {
                family.kind = kind;
                Ok(())
            }
            None => {
                self.families
                    .insert(name.to_string(), MetricFamily::new(name, kind));
                Ok(())
            }
        }
    }

    fn push_sample(&mut self, parsed: ParsedSample) {
        let family_name = self.family_name_for(&parsed.name);
        let family = self
            .families
            .entry(family_name.clone())
            .or_insert_with(|| MetricFamily::new(&family_name, MetricKind::Untyped));

        family.samples.push(Sample {
            value: SampleValue::new(family.kind, parsed.value),
            name: parsed.name,
            labels: parsed.labels,
            timestamp_ms: parsed.timestamp_ms,
        });
    }

    fn family_name_for(&self, series: &str) -> String {
        if self.families.contains_key(series) {
            return series.to_string();
        }
        for suffix in ["_bucket", "_sum", "_count"] {
            if let Some(base) = series.strip_suffix(suffix) {
                if let Some(family) = self.families.get(base) {
                    if family.kind.has_suffixed_series() {
                        return base.to_string();
                    }
                }
            }
        }
        series.to_string()
    }
}

// =============================================================================
// Line Parsing
// =============================================================================

struct ParsedSample {
    name: String,
    labels: BTreeMap<String, String>,
    value: f64,
    timestamp_ms: Option<i64>,
}

fn parse_error(line: usize, reason: impl Into<String>) -> Error {
    Error::MetricParse {
        line,
        reason: reason.into(),
    }
}

/// Split off the first whitespace-delimited token
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_sample_line(line: &str, line_no: usize) -> Result<ParsedSample> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if !is_metric_name(name) {
        return Err(parse_error(line_no, format!("invalid metric name {:?}", name)));
    }

    let mut rest = line[name_end..].trim_start();
    let mut labels = BTreeMap::new();
    if let Some(body) = rest.strip_prefix('{') {
        let (parsed, remaining) = parse_labels(body, line_no)?;
        labels = parsed;
        rest = remaining;
    }

    let mut fields = rest.split_whitespace();
    let value = fields
        .next()
        .ok_or_else(|| parse_error(line_no, "missing sample value"))?;
    let value: f64 = value
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid sample value {:?}", value)))?;

    let timestamp_ms = match fields.next() {
        Some(ts) => Some(
            ts.parse::<i64>()
                .map_err(|_| parse_error(line_no, format!("invalid timestamp {:?}", ts)))?,
        ),
        None => None,
    };

    if fields.next().is_some() {
        return Err(parse_error(line_no, "unexpected trailing data"));
    }

    Ok(ParsedSample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parse `name="value",...}` and return the text after the closing brace
fn parse_labels(body: &str, line_no: usize) -> Result<(BTreeMap<String, String>, &str)> {
    let mut labels = BTreeMap::new();
    let mut rest = body;

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let eq = rest
            .find('=')
            .ok_or_else(|| parse_error(line_no, "label without '='"))?;
        let label = rest[..eq].trim();
        if !is_label_name(label) {
            return Err(parse_error(line_no, format!("invalid label name {:?}", label)));
        }

        rest = rest[eq + 1..].trim_start();
        rest = rest
            .strip_prefix('"')
            .ok_or_else(|| parse_error(line_no, format!("unquoted value for label {}", label)))?;

        let (value, after) = read_quoted(rest)
            .ok_or_else(|| parse_error(line_no, format!("unterminated value for label {}", label)))?;
        if labels.insert(label.to_string(), value).is_some() {
            return Err(parse_error(line_no, format!("duplicate label {}", label)));
        }

        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if !rest.starts_with('}') {
            return Err(parse_error(line_no, "expected ',' or '}' after label value"));
        }
    }
}

/// Read an escaped label value up to its closing quote
fn read_quoted(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((value, &input[idx + 1..])),
            '\\' => match chars.next()?.1 {
                'n' => value.push('\n'),
                '"' => value.push('"'),
                '\\' => value.push('\\'),
                other => {
                    value.push('\\');
                    value.push(other);
                }
            },
            c => value.push(c),
        }
    }
    None
}

fn unescape_help(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBELET_SAMPLE: &str = r#"
# HELP kubelet_volume_stats_used_bytes [ALPHA] Number of used bytes in the volume
# TYPE kubelet_volume_stats_used_bytes gauge
kubelet_volume_stats_used_bytes{namespace="default",persistentvolumeclaim="data-0"} 5.36870912e+08
kubelet_volume_stats_used_bytes{namespace="kube-system",persistentvolumeclaim="etcd"} 1024
# HELP kubelet_volume_stats_capacity_bytes [ALPHA] Capacity in bytes of the volume
# TYPE kubelet_volume_stats_capacity_bytes gauge
kubelet_volume_stats_capacity_bytes{namespace="default",persistentvolumeclaim="data-0"} 1.073741824e+09
# TYPE apiserver_request_duration_seconds histogram
apiserver_request_duration_seconds_bucket{le="0.1"} 3
apiserver_request_duration_seconds_bucket{le="+Inf"} 4
apiserver_request_duration_seconds_sum 0.52
apiserver_request_duration_seconds_count 4
kubelet_running_pods 12 1700000000000
"#;

    #[test]
    fn test_parse_kubelet_document() {
        let expo = Exposition::parse(KUBELET_SAMPLE).unwrap();

        let used = expo.family("kubelet_volume_stats_used_bytes").unwrap();
        assert_eq!(used.kind, MetricKind::Gauge);
        assert_eq!(used.samples.len(), 2);
        assert_eq!(used.samples[0].label("persistentvolumeclaim"), Some("data-0"));
        assert_eq!(used.samples[0].value.gauge_or_untyped(), Some(536870912.0));
        assert!(used.help.as_deref().unwrap().contains("used bytes"));

        let hist = expo.family("apiserver_request_duration_seconds").unwrap();
        assert_eq!(hist.samples.len(), 4);
        assert_eq!(hist.samples[1].value, SampleValue::Distribution(4.0));

        let pods = expo.family("kubelet_running_pods").unwrap();
        assert_eq!(pods.kind, MetricKind::Untyped);
        assert_eq!(pods.samples[0].value, SampleValue::Untyped(12.0));
        assert_eq!(pods.samples[0].timestamp_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn test_counter_has_no_gauge_reading() {
        let expo = Exposition::parse("# TYPE requests_total counter\nrequests_total 7\n").unwrap();
        let family = expo.family("requests_total").unwrap();
        assert_eq!(family.samples[0].value.gauge_or_untyped(), None);
    }

    #[test]
    fn test_escaped_label_values() {
        let expo =
            Exposition::parse(r#"m{path="C:\\dir",msg="say \"hi\"\nbye",} 1"#).unwrap();
        let sample = &expo.family("m").unwrap().samples[0];
        assert_eq!(sample.label("path"), Some("C:\\dir"));
        assert_eq!(sample.label("msg"), Some("say \"hi\"\nbye"));
    }

    #[test]
    fn test_special_float_values() {
        let expo = Exposition::parse("a NaN\nb +Inf\nc -Inf\n").unwrap();
        assert!(expo.family("a").unwrap().samples[0]
            .value
            .gauge_or_untyped()
            .unwrap()
            .is_nan());
        assert_eq!(
            expo.family("c").unwrap().samples[0].value,
            SampleValue::Untyped(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_malformed_documents_rejected() {
        assert!(matches!(
            Exposition::parse("<html>502 Bad Gateway</html>"),
            Err(Error::MetricParse { line: 1, .. })
        ));
        assert!(Exposition::parse("m{a=\"1\" 2").is_err());
        assert!(Exposition::parse("m{a=1} 2").is_err());
        assert!(Exposition::parse("m 1 2 3").is_err());
        assert!(Exposition::parse("m abc").is_err());
        assert!(Exposition::parse("# TYPE m sparkline\n").is_err());
        assert!(Exposition::parse("m 1\n# TYPE m gauge\n").is_err());
        assert!(Exposition::parse("m{a=\"1\",a=\"2\"} 1").is_err());
    }

    #[test]
    fn test_plain_comments_and_blank_lines_ignored() {
        let expo = Exposition::parse("\n# just a note\n\nm 1\n").unwrap();
        assert_eq!(expo.len(), 1);
        assert!(expo.contains("m"));
    }
}
