//! Core document types for lexrag.
//!
//! A `Document` is one legal-text passage with a stable string id, typed
//! key-value metadata, and the collection it belongs to. `MetadataValue`
//! supports boolean, integer, float, and string values.

use crate::config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A typed metadata value attached to a document.
///
/// The server API layer converts to/from untagged JSON at the HTTP boundary;
/// corpus snapshots store metadata as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// Boolean value (`true` / `false`).
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl MetadataValue {
    /// Converts a JSON scalar into a typed metadata value.
    ///
    /// Arrays, objects, and nulls are not representable and return `None`.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Boolean(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(MetadataValue::Integer(i))
                } else {
                    n.as_f64().map(MetadataValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(MetadataValue::String(s)),
            _ => None,
        }
    }

    /// Converts a typed metadata value back into a JSON scalar.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Boolean(b) => serde_json::Value::Bool(*b),
            MetadataValue::Integer(i) => serde_json::json!(*i),
            MetadataValue::Float(f) => serde_json::json!(*f),
            MetadataValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Named collection a passage belongs to.
///
/// The wire names (`law`, `precedent`, `store_policy`) match the
/// `source_type` field of corpus snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    /// Statute text from the national law corpus.
    #[serde(rename = "law")]
    Statute,
    /// Court decisions.
    #[serde(rename = "precedent")]
    CaseLaw,
    /// App-store / platform policy documents.
    #[serde(rename = "store_policy")]
    PlatformPolicy,
}

impl SourceKind {
    /// All collections in their fixed processing order. Fusion output is
    /// concatenated in this order before the fan-in cap.
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Statute,
        SourceKind::CaseLaw,
        SourceKind::PlatformPolicy,
    ];

    /// The `source_type` wire name of this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Statute => "law",
            SourceKind::CaseLaw => "precedent",
            SourceKind::PlatformPolicy => "store_policy",
        }
    }

    /// Parses a `source_type` wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "law" => Some(SourceKind::Statute),
            "precedent" => Some(SourceKind::CaseLaw),
            "store_policy" => Some(SourceKind::PlatformPolicy),
            _ => None,
        }
    }

    /// Trust weight multiplied into final scores: statutes outrank case law,
    /// which outranks platform policy.
    pub fn trust_weight(&self) -> f32 {
        match self {
            SourceKind::Statute => config::TRUST_WEIGHT_STATUTE,
            SourceKind::CaseLaw => config::TRUST_WEIGHT_CASE_LAW,
            SourceKind::PlatformPolicy => config::TRUST_WEIGHT_PLATFORM_POLICY,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored passage with text content, stable id, and metadata.
///
/// Documents are immutable once indexed: the corpus snapshot and every index
/// built from it are shared read-only across concurrent search calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique within a collection.
    pub id: String,
    /// Passage text, indexed by the lexical index.
    pub text: String,
    /// Arbitrary key-value provenance metadata.
    pub metadata: HashMap<String, MetadataValue>,
    /// The collection this passage belongs to.
    pub collection: SourceKind,
}

impl Document {
    /// Creates a new document.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: HashMap<String, MetadataValue>,
        collection: SourceKind,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            collection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_wire_names_round_trip() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::parse("unknown"), None);
    }

    #[test]
    fn test_trust_weights_ordered_by_authority() {
        assert!(SourceKind::Statute.trust_weight() > SourceKind::CaseLaw.trust_weight());
        assert!(SourceKind::CaseLaw.trust_weight() > SourceKind::PlatformPolicy.trust_weight());
    }

    #[test]
    fn test_metadata_value_from_json() {
        assert_eq!(
            MetadataValue::from_json(serde_json::json!(true)),
            Some(MetadataValue::Boolean(true))
        );
        assert_eq!(
            MetadataValue::from_json(serde_json::json!(42)),
            Some(MetadataValue::Integer(42))
        );
        assert_eq!(
            MetadataValue::from_json(serde_json::json!(1.5)),
            Some(MetadataValue::Float(1.5))
        );
        assert_eq!(
            MetadataValue::from_json(serde_json::json!("law")),
            Some(MetadataValue::String("law".into()))
        );
        assert_eq!(MetadataValue::from_json(serde_json::json!(null)), None);
        assert_eq!(MetadataValue::from_json(serde_json::json!([1, 2])), None);
    }

    #[test]
    fn test_metadata_value_to_json_round_trip() {
        let values = [
            MetadataValue::Boolean(false),
            MetadataValue::Integer(-7),
            MetadataValue::String("제2조".into()),
        ];
        for v in values {
            assert_eq!(MetadataValue::from_json(v.to_json()), Some(v));
        }
    }
}
