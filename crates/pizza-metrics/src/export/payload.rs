//! Wire format.
//!
//! Each push carries exactly one data point wrapped in the OTLP/JSON
//! `resourceMetrics -> scopeMetrics -> metrics -> sum` envelope.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::point::{MetricPoint, MetricValue};
use crate::error::ExportError;
use crate::series::SOURCE_KEY;

/// Temporality declared for every sum.
pub const AGGREGATION_TEMPORALITY: &str = "AGGREGATION_TEMPORALITY_CUMULATIVE";

/// Unit declared for every metric.
pub const UNIT: &str = "1";

/// Top-level request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// Always exactly one entry.
    pub resource_metrics: Vec<ResourceMetrics>,
}

/// Metrics of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    /// Instrumentation scopes.
    pub scope_metrics: Vec<ScopeMetrics>,
}

/// Metrics of one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    /// Metric entries.
    pub metrics: Vec<Metric>,
}

/// One named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Series name.
    pub name: String,
    /// Unit string.
    pub unit: String,
    /// Sum aggregation.
    pub sum: Sum,
}

/// Sum aggregation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    /// Data points; always exactly one.
    pub data_points: Vec<DataPoint>,
    /// Temporality marker.
    pub aggregation_temporality: String,
    /// Monotonicity marker.
    pub is_monotonic: bool,
}

/// Value encoding of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// Integer value.
    #[serde(rename = "asInt")]
    AsInt(u64),
    /// Floating point value.
    #[serde(rename = "asDouble")]
    AsDouble(f64),
}

impl From<MetricValue> for DataValue {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Int(v) => DataValue::AsInt(v),
            MetricValue::Double(v) => DataValue::AsDouble(v),
        }
    }
}

/// One timestamped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Value, serialized as an `asInt` or `asDouble` field.
    #[serde(flatten)]
    pub value: DataValue,
    /// Epoch nanoseconds.
    pub time_unix_nano: u64,
    /// `source` followed by series dimensions.
    pub attributes: Vec<Attribute>,
}

/// Key/value attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: AttributeValue,
}

/// String attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValue {
    /// String value.
    pub string_value: String,
}

impl Attribute {
    fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AttributeValue {
                string_value: value.into(),
            },
        }
    }
}

impl ExportPayload {
    /// Wrap one point, tagging it with `source`.
    ///
    /// A caller-supplied `source` dimension is ignored; the configured one wins.
    pub fn from_point(point: &MetricPoint, source: &str, time_unix_nano: u64) -> Self {
        let mut attributes = Vec::with_capacity(point.dimensions.len() + 1);
        attributes.push(Attribute::string(SOURCE_KEY, source));
        attributes.extend(
            point
                .dimensions
                .iter()
                .filter(|(key, _)| key != SOURCE_KEY)
                .map(|(key, value)| Attribute::string(key, value)),
        );

        let data_point = DataPoint {
            value: point.value.into(),
            time_unix_nano,
            attributes,
        };

        Self {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![Metric {
                        name: point.name.clone(),
                        unit: UNIT.to_string(),
                        sum: Sum {
                            data_points: vec![data_point],
                            aggregation_temporality: AGGREGATION_TEMPORALITY.to_string(),
                            is_monotonic: true,
                        },
                    }],
                }],
            }],
        }
    }

    /// Encode as compact JSON.
    ///
    /// Fails for non-finite doubles, which JSON cannot represent.
    pub fn to_json(&self) -> Result<Vec<u8>, ExportError> {
        for metric in self.metrics() {
            for point in &metric.sum.data_points {
                if let DataValue::AsDouble(v) = point.value {
                    if !v.is_finite() {
                        return Err(ExportError::NonFinite {
                            series: metric.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(serde_json::to_vec(self)?)
    }

    /// Iterate over every metric in the payload.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|r| r.scope_metrics.iter())
            .flat_map(|s| s.metrics.iter())
    }
}

/// Current wall-clock time in epoch nanoseconds.
pub fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
