//! Endpoint assembly and deduplication.
//!
//! This is the structural core of the crate: it folds a stream of
//! possibly-inconsistent, possibly-duplicate per-chunk records into a
//! canonical catalog of endpoints, one per (path, method) pair, and reports
//! every disagreement as a `ConflictNote` instead of overwriting data.
//!
//! The merge policy is first-wins-plus-note. The documentation UI may be
//! scraped in multiple fragments describing the same operation, and the
//! extractor is noisy; overwriting would silently lose the earlier-trusted
//! extraction, while failing hard would abort the whole run over extraction
//! noise. Conflicts stay visible to the caller for audit.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::record::{BodyDescriptor, ParamDescriptor, RawEndpointRecord, ResponseDescriptor};

/// The deduplicated, merged representation of one (path, method) pair.
/// Immutable once assembly finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEndpoint {
    pub path: String,
    /// Always uppercase after assembly.
    pub method: String,
    /// Parameter names are unique within one endpoint.
    pub parameters: Vec<ParamDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodyDescriptor>,
    pub responses: BTreeMap<String, ResponseDescriptor>,
}

impl CanonicalEndpoint {
    pub fn required_parameters(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn optional_parameters(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.parameters.iter().filter(|p| !p.required)
    }

    /// First path segment, case preserved; `root` for a bare `/`.
    pub fn group_name(&self) -> &str {
        self.path
            .trim_matches('/')
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("root")
    }

    /// Every identifier a scenario may legitimately reference: declared
    /// parameter names plus JSON body field names.
    pub fn declared_identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parameters.iter().map(|p| p.name.clone()).collect();
        if let Some(body) = &self.request_body {
            names.extend(body.json_field_names());
        }
        names
    }
}

/// What kind of disagreement a conflict note records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    ParameterMismatch,
    RequestBodyMismatch,
    ResponseMismatch,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::ParameterMismatch => "parameter mismatch",
            ConflictKind::RequestBodyMismatch => "request body mismatch",
            ConflictKind::ResponseMismatch => "response mismatch",
        }
    }
}

/// A non-fatal record of disagreement between two extractions for the same
/// field. Append-only; never aborts assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictNote {
    pub path: String,
    pub method: String,
    pub kind: ConflictKind,
    /// Parameter name, `requestBody`, or a response status code.
    pub field: String,
    pub description: String,
}

/// Result of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyOutcome {
    /// Ordered by first appearance of each (path, method) key.
    pub catalog: Vec<CanonicalEndpoint>,
    pub conflicts: Vec<ConflictNote>,
    /// Records discarded for missing path or method.
    pub skipped: usize,
}

/// Fold raw records into the canonical catalog.
///
/// Never fails: malformed records are filtered and counted, duplicate keys
/// are merged first-wins with conflict notes, and catalog order is the
/// first-seen order of (path, method) keys. Methods are normalized to
/// uppercase before keying, so `post` and `POST` are the same endpoint.
pub fn assemble(records: impl IntoIterator<Item = RawEndpointRecord>) -> AssemblyOutcome {
    let mut outcome = AssemblyOutcome::default();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        if !record.is_usable() {
            log::debug!("Skipping invalid endpoint record");
            outcome.skipped += 1;
            continue;
        }

        let method = record.method.trim().to_uppercase();
        let path = record.path.trim().to_string();
        let key = (path.clone(), method.clone());

        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                outcome.catalog.push(CanonicalEndpoint {
                    path,
                    method,
                    parameters: Vec::new(),
                    request_body: None,
                    responses: BTreeMap::new(),
                });
                let slot = outcome.catalog.len() - 1;
                index.insert(key, slot);
                slot
            }
        };

        merge_record(&mut outcome.catalog[slot], record, &mut outcome.conflicts);
    }

    log::info!(
        "Assembled {} endpoint(s) from input ({} skipped, {} conflict note(s))",
        outcome.catalog.len(),
        outcome.skipped,
        outcome.conflicts.len()
    );
    outcome
}

/// Merge one usable record into its canonical endpoint, first-wins.
fn merge_record(
    endpoint: &mut CanonicalEndpoint,
    record: RawEndpointRecord,
    conflicts: &mut Vec<ConflictNote>,
) {
    for param in record.parameters {
        match endpoint.parameters.iter().find(|p| p.name == param.name) {
            Some(existing) => {
                if *existing != param {
                    conflicts.push(ConflictNote {
                        path: endpoint.path.clone(),
                        method: endpoint.method.clone(),
                        kind: ConflictKind::ParameterMismatch,
                        field: param.name.clone(),
                        description: format!(
                            "parameter '{}' described differently by a later extraction; \
                             keeping the first-seen definition",
                            param.name
                        ),
                    });
                }
            }
            None => endpoint.parameters.push(param),
        }
    }

    if let Some(body) = record.request_body {
        if !body.is_empty() {
            match &endpoint.request_body {
                Some(existing) if !existing.is_empty() => {
                    if *existing != body {
                        conflicts.push(ConflictNote {
                            path: endpoint.path.clone(),
                            method: endpoint.method.clone(),
                            kind: ConflictKind::RequestBodyMismatch,
                            field: "requestBody".to_string(),
                            description: "request body described differently by a later \
                                          extraction; keeping the first-seen definition"
                                .to_string(),
                        });
                    }
                }
                _ => endpoint.request_body = Some(body),
            }
        }
    }

    // Status codes merge independently of each other
    for (code, response) in record.responses {
        match endpoint.responses.get(&code) {
            Some(existing) => {
                if *existing != response {
                    conflicts.push(ConflictNote {
                        path: endpoint.path.clone(),
                        method: endpoint.method.clone(),
                        kind: ConflictKind::ResponseMismatch,
                        field: code.clone(),
                        description: format!(
                            "response for status {} described differently by a later \
                             extraction; keeping the first-seen definition",
                            code
                        ),
                    });
                }
            }
            None => {
                endpoint.responses.insert(code, response);
            }
        }
    }
}
