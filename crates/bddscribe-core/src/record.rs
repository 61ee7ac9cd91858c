//! Untrusted endpoint records as produced by the extraction boundary.
//!
//! One `RawEndpointRecord` is produced per scraped HTML chunk. Nothing in
//! this module is trusted: the upstream extractor is an LLM, so every field
//! is coerced defensively and records missing the essentials are simply
//! unusable, never an error. The assembler consumes these and produces the
//! canonical catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The location of a parameter. Unknown locations coerce to `Query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl Default for ParamLocation {
    fn default() -> Self {
        ParamLocation::Query
    }
}

impl ParamLocation {
    /// Parse a location string leniently; anything unrecognized is `Query`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => ParamLocation::Path,
            "query" => ParamLocation::Query,
            "header" => ParamLocation::Header,
            "cookie" => ParamLocation::Cookie,
            _ => ParamLocation::Query,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

/// A single parameter as described by one extraction.
///
/// Names are unique within a canonical endpoint; uniqueness is enforced by
/// the assembler, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

impl ParamDescriptor {
    /// Coerce one LLM-emitted parameter object. Returns `None` when the
    /// object has no usable name.
    pub fn from_llm_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name").and_then(JsonValue::as_str)?.trim();
        if name.is_empty() {
            return None;
        }

        let location = obj
            .get("in")
            .or_else(|| obj.get("location"))
            .and_then(JsonValue::as_str)
            .map(ParamLocation::parse_lenient)
            .unwrap_or_default();

        // Path parameters are always required, mirroring OpenAPI semantics
        let required = obj
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(location == ParamLocation::Path);

        let type_name = obj
            .get("type")
            .and_then(JsonValue::as_str)
            .or_else(|| {
                obj.get("schema")
                    .and_then(|s| s.get("type"))
                    .and_then(JsonValue::as_str)
            })
            .unwrap_or("string")
            .to_string();

        let description = obj
            .get("description")
            .and_then(JsonValue::as_str)
            .unwrap_or("")
            .to_string();

        Some(Self {
            name: name.to_string(),
            location,
            required,
            type_name,
            description,
            schema: obj.get("schema").cloned(),
        })
    }
}

/// Request body shape: media type to schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: BTreeMap<String, JsonValue>,
}

impl BodyDescriptor {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Coerce an LLM-emitted request body object. A non-object or empty
    /// value becomes `None` — absence, not an error.
    pub fn from_llm_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.is_empty() {
            return None;
        }

        let required = obj
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);

        let content: BTreeMap<String, JsonValue> =
            match obj.get("content").and_then(JsonValue::as_object) {
                Some(media_types) => media_types
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                // A bare schema object is treated as JSON content
                None => {
                    let mut map = BTreeMap::new();
                    map.insert("application/json".to_string(), value.clone());
                    map
                }
            };

        if content.is_empty() {
            return None;
        }
        Some(Self { required, content })
    }

    /// Field names of the JSON schema properties, when declared.
    pub fn json_field_names(&self) -> Vec<String> {
        self.content
            .get("application/json")
            .and_then(|media| media.get("schema").or(Some(media)))
            .and_then(|schema| schema.get("properties"))
            .and_then(JsonValue::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// One declared response, keyed externally by status code string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: BTreeMap<String, JsonValue>,
}

impl ResponseDescriptor {
    pub fn from_llm_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(s) => Self {
                description: s.clone(),
                content: BTreeMap::new(),
            },
            JsonValue::Object(obj) => Self {
                description: obj
                    .get("description")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("")
                    .to_string(),
                content: obj
                    .get("content")
                    .and_then(JsonValue::as_object)
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default(),
            },
            _ => Self::default(),
        }
    }
}

/// Unvalidated per-chunk endpoint description.
///
/// The default value is the "empty record" the extraction boundary returns
/// on any internal failure; `is_usable` is the only gate the assembler
/// applies before merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEndpointRecord {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<ParamDescriptor>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodyDescriptor>,
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseDescriptor>,
}

impl RawEndpointRecord {
    /// The record returned when extraction fails; never merged.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A record is usable when it names both a path and a method.
    pub fn is_usable(&self) -> bool {
        !self.path.trim().is_empty() && !self.method.trim().is_empty()
    }

    /// Coerce a parsed LLM completion into a record, tolerating the shape
    /// drift the model produces: `path`/`method` at the top level, or an
    /// `endpoint` object (or bare string) carrying them; `parameters` that
    /// are not a list become no parameters; `requestBody` that is not an
    /// object becomes no body; `responses` that is not a map becomes no
    /// responses. Anything irrecoverable yields an unusable record.
    pub fn from_llm_json(value: &JsonValue) -> Self {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return Self::empty(),
        };

        let (mut path, mut method) = (
            obj.get("path")
                .and_then(JsonValue::as_str)
                .unwrap_or("")
                .to_string(),
            obj.get("method")
                .and_then(JsonValue::as_str)
                .unwrap_or("")
                .to_string(),
        );

        match obj.get("endpoint") {
            Some(JsonValue::Object(endpoint)) => {
                if path.is_empty() {
                    if let Some(p) = endpoint.get("path").and_then(JsonValue::as_str) {
                        path = p.to_string();
                    }
                }
                if method.is_empty() {
                    if let Some(m) = endpoint.get("method").and_then(JsonValue::as_str) {
                        method = m.to_string();
                    }
                }
            }
            Some(JsonValue::String(p)) if path.is_empty() => {
                path = p.clone();
            }
            _ => {}
        }

        let parameters = obj
            .get("parameters")
            .and_then(JsonValue::as_array)
            .map(|arr| arr.iter().filter_map(ParamDescriptor::from_llm_json).collect())
            .unwrap_or_default();

        let request_body = obj.get("requestBody").and_then(BodyDescriptor::from_llm_json);

        let responses = obj
            .get("responses")
            .and_then(JsonValue::as_object)
            .map(|map| {
                map.iter()
                    .map(|(code, v)| (code.trim().to_string(), ResponseDescriptor::from_llm_json(v)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path,
            method,
            parameters,
            request_body,
            responses,
        }
    }
}
