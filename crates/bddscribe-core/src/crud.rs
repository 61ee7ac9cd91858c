//! CRUD grouping: cross-endpoint lifecycle and integration scenarios.
//!
//! Endpoints are partitioned by resource group (first path segment) and
//! classified into create/read/update/delete by method. Each group gets one
//! lifecycle skeleton per operation actually present, and an integration
//! skeleton when other groups expose a POST endpoint. The integration link
//! is a heuristic over method presence, not a dependency graph — no schema
//! inspection happens here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::assemble::CanonicalEndpoint;
use crate::scenario::{GherkinStep, ScenarioSkeleton};

/// Minimal handle on a classified endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRef {
    pub method: String,
    pub path: String,
}

impl EndpointRef {
    fn of(endpoint: &CanonicalEndpoint) -> Self {
        Self {
            method: endpoint.method.clone(),
            path: endpoint.path.clone(),
        }
    }
}

/// CRUD scenario material for one resource group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrudScenarioSet {
    pub group: String,
    pub create: Option<EndpointRef>,
    pub read: Option<EndpointRef>,
    pub update: Option<EndpointRef>,
    pub delete: Option<EndpointRef>,
    /// Other groups that expose a POST endpoint.
    pub integration_partners: Vec<String>,
    pub skeletons: Vec<ScenarioSkeleton>,
}

/// Partition the catalog into CRUD scenario sets, keyed by group name.
///
/// Classification is first-representative-wins: a group with three GET
/// endpoints gets exactly one read scenario, for the first GET seen in
/// catalog order.
pub fn group(catalog: &[CanonicalEndpoint]) -> BTreeMap<String, CrudScenarioSet> {
    let mut groups: BTreeMap<String, CrudScenarioSet> = BTreeMap::new();

    for endpoint in catalog {
        let name = endpoint.group_name().to_string();
        let set = groups.entry(name.clone()).or_insert_with(|| CrudScenarioSet {
            group: name,
            ..CrudScenarioSet::default()
        });

        let slot = match endpoint.method.as_str() {
            "POST" => &mut set.create,
            "GET" => &mut set.read,
            "PUT" | "PATCH" => &mut set.update,
            "DELETE" => &mut set.delete,
            other => {
                log::debug!("Method {} takes no part in CRUD grouping", other);
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(EndpointRef::of(endpoint));
        }
    }

    // Integration partners need the full classification, so second pass
    let posting_groups: Vec<String> = groups
        .values()
        .filter(|set| set.create.is_some())
        .map(|set| set.group.clone())
        .collect();

    for set in groups.values_mut() {
        set.integration_partners = posting_groups
            .iter()
            .filter(|name| **name != set.group)
            .cloned()
            .collect();
        let skeletons = build_skeletons(set);
        set.skeletons = skeletons;
        log::info!(
            "Group {}: {} lifecycle scenario(s), {} integration partner(s)",
            set.group,
            set.skeletons.len(),
            set.integration_partners.len()
        );
    }

    groups
}

fn build_skeletons(set: &CrudScenarioSet) -> Vec<ScenarioSkeleton> {
    let mut skeletons = Vec::new();
    let group_lower = set.group.to_lowercase();

    if let Some(create) = &set.create {
        skeletons.push(ScenarioSkeleton {
            tags: crud_tags("create"),
            title: format!("Create {} resource", set.group),
            steps: vec![
                GherkinStep::given(format!("I prepare test data for {} creation", group_lower)),
                GherkinStep::when(format!(
                    "I send a POST request to \"{}\" with valid data",
                    create.path
                )),
                GherkinStep::then("the response status code should be 200"),
                GherkinStep::and(format!("I store the created {} ID", group_lower)),
            ],
        });
    }

    if let Some(read) = &set.read {
        skeletons.push(ScenarioSkeleton {
            tags: crud_tags("read"),
            title: format!("Read {} resource", set.group),
            steps: vec![
                GherkinStep::given(format!("I have a valid {} ID", group_lower)),
                GherkinStep::when(format!("I send a GET request to \"{}\"", read.path)),
                GherkinStep::then("the response status code should be 200"),
                GherkinStep::and(format!("the response should contain valid {} data", group_lower)),
            ],
        });
    }

    if let Some(update) = &set.update {
        skeletons.push(ScenarioSkeleton {
            tags: crud_tags("update"),
            title: format!("Update {} resource", set.group),
            steps: vec![
                GherkinStep::given(format!("I have a valid {} ID", group_lower)),
                GherkinStep::and(format!("I prepare updated data for {}", group_lower)),
                GherkinStep::when(format!(
                    "I send a {} request to \"{}\"",
                    update.method, update.path
                )),
                GherkinStep::then("the response status code should be 200"),
                GherkinStep::and(format!("the {} should be updated", group_lower)),
            ],
        });
    }

    if let Some(delete) = &set.delete {
        skeletons.push(ScenarioSkeleton {
            tags: crud_tags("delete"),
            title: format!("Delete {} resource", set.group),
            steps: vec![
                GherkinStep::given(format!("I have a valid {} ID", group_lower)),
                GherkinStep::when(format!("I send a DELETE request to \"{}\"", delete.path)),
                GherkinStep::then("the response status code should be 200"),
                GherkinStep::and(format!("the {} should be deleted", group_lower)),
            ],
        });
    }

    if !set.integration_partners.is_empty() {
        let mut steps = vec![
            GherkinStep::given("I have valid credentials"),
            GherkinStep::and("I am authenticated"),
        ];
        for partner in &set.integration_partners {
            let partner_lower = partner.to_lowercase();
            steps.push(GherkinStep::when(format!(
                "I create a new {} resource",
                partner_lower
            )));
            steps.push(GherkinStep::then(format!(
                "I can associate it with {}",
                group_lower
            )));
            steps.push(GherkinStep::and("I can verify the association"));
        }
        steps.push(GherkinStep::when("I remove all created resources"));
        steps.push(GherkinStep::then("all resources should be properly cleaned up"));

        skeletons.push(ScenarioSkeleton {
            tags: vec!["@e2e".to_string(), "@integration".to_string()],
            title: format!("{} integration with other resources", set.group),
            steps,
        });
    }

    skeletons
}

fn crud_tags(operation: &str) -> Vec<String> {
    vec![
        "@e2e".to_string(),
        "@crud".to_string(),
        format!("@{}", operation),
    ]
}
