//! Exhibits
//!
//! Structured artifacts (tables, charts, images) that an interviewer reply
//! embeds next to its spoken prose. An `Exhibit` value only exists after its
//! JSON candidate passed schema validation in the reply parser.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Exhibit identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExhibitId(pub u64);

impl fmt::Display for ExhibitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of exhibit kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhibitKind {
    Table,
    Bar,
    Line,
    Pie,
    Image,
}

impl ExhibitKind {
    pub const ALL: [ExhibitKind; 5] = [
        ExhibitKind::Table,
        ExhibitKind::Bar,
        ExhibitKind::Line,
        ExhibitKind::Pie,
        ExhibitKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExhibitKind::Table => "table",
            ExhibitKind::Bar => "bar",
            ExhibitKind::Line => "line",
            ExhibitKind::Pie => "pie",
            ExhibitKind::Image => "image",
        }
    }

    /// Bar, line and pie exhibits
    pub fn is_chart(&self) -> bool {
        matches!(self, ExhibitKind::Bar | ExhibitKind::Line | ExhibitKind::Pie)
    }
}

impl fmt::Display for ExhibitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExhibitKind {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ExhibitKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown exhibit type: {}", s))
    }
}

/// A labelled numeric value in a chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

/// A validated exhibit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exhibit {
    pub id: ExhibitId,
    pub title: String,
    pub kind: ExhibitKind,
    /// Kind-specific data, as sent in the reply's `data` field
    pub payload: Value,
}

impl Exhibit {
    pub fn new(id: ExhibitId, title: impl Into<String>, kind: ExhibitKind, payload: Value) -> Self {
        Self {
            id,
            title: title.into(),
            kind,
            payload,
        }
    }

    /// Chart payload as data points
    ///
    /// Returns `None` for non-chart kinds or when the payload is not an array
    /// of `{label, value}` objects. Numeric strings are accepted as values.
    pub fn series(&self) -> Option<Vec<DataPoint>> {
        if !self.kind.is_chart() {
            return None;
        }

        self.payload
            .as_array()?
            .iter()
            .map(|point| {
                let label = match point.get("label")? {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let value = match point.get("value")? {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse().ok()?,
                    _ => return None,
                };
                Some(DataPoint { label, value })
            })
            .collect()
    }

    /// Image source for image exhibits
    ///
    /// Accepts a bare string payload or an object carrying `url` or `src`.
    pub fn image_source(&self) -> Option<&str> {
        if self.kind != ExhibitKind::Image {
            return None;
        }

        match &self.payload {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("url")
                .or_else(|| map.get("src"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}
