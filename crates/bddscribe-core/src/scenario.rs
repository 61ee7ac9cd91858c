//! Scenario planning: deterministic skeletons derived from endpoint shape.
//!
//! A `ScenarioSkeleton` is the structural, pre-textual description of one
//! test case — tags, a title, and ordered Gherkin steps. Skeletons are
//! derived fresh from a finalized `CanonicalEndpoint`, carry no identity of
//! their own, and are discarded after rendering.
//!
//! Step text references declared parameters and body fields with
//! `<name>` placeholders; the structural validator at the end of `plan`
//! drops any skeleton referencing a name the endpoint does not declare, so
//! hallucinated identifiers from upstream extraction never leak into
//! generated scenarios.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::assemble::CanonicalEndpoint;
use crate::record::BodyDescriptor;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z_][A-Za-z0-9_-]*)>").expect("placeholder regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GherkinStep {
    pub keyword: StepKeyword,
    pub text: String,
}

impl GherkinStep {
    pub fn given(text: impl Into<String>) -> Self {
        Self { keyword: StepKeyword::Given, text: text.into() }
    }
    pub fn when(text: impl Into<String>) -> Self {
        Self { keyword: StepKeyword::When, text: text.into() }
    }
    pub fn then(text: impl Into<String>) -> Self {
        Self { keyword: StepKeyword::Then, text: text.into() }
    }
    pub fn and(text: impl Into<String>) -> Self {
        Self { keyword: StepKeyword::And, text: text.into() }
    }
}

/// Structural test-case skeleton; rendered into Gherkin by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSkeleton {
    pub tags: Vec<String>,
    pub title: String,
    pub steps: Vec<GherkinStep>,
}

/// Fixed invalid-body validation rules. Each applies only when the body
/// shape makes it meaningful; none of this is model-derived.
struct BodyRule {
    title: &'static str,
    value_phrase: &'static str,
    expectation: &'static str,
    picker: fn(&[(String, JsonValue)]) -> Option<String>,
}

const BODY_RULES: &[BodyRule] = &[
    BodyRule {
        title: "Empty required field",
        value_phrase: "an empty value",
        expectation: "the response should report that the field cannot be empty",
        picker: pick_first_field,
    },
    BodyRule {
        title: "Negative numeric field",
        value_phrase: "a negative number",
        expectation: "the response should report that the value must be positive",
        picker: pick_numeric_field,
    },
    BodyRule {
        title: "Malformed format field",
        value_phrase: "a malformed value",
        expectation: "the response should report an invalid format",
        picker: pick_formatted_field,
    },
];

/// Derive all scenario skeletons for one endpoint.
///
/// Pure function of the endpoint's shape. `max_optional` caps how many
/// optional parameters participate in combination expansion (the powerset
/// doubles per parameter); excess parameters still appear in the feature's
/// other scenarios, they just are not combined.
pub fn plan(endpoint: &CanonicalEndpoint, max_optional: usize) -> Vec<ScenarioSkeleton> {
    let mut skeletons = Vec::new();

    skeletons.extend(plan_parameter_scenarios(endpoint, max_optional));
    skeletons.extend(plan_body_scenarios(endpoint));
    skeletons.extend(plan_response_scenarios(endpoint));

    // Guard against identifiers leaking from noisy upstream text
    skeletons.retain(|skeleton| {
        if validate_skeleton(skeleton, endpoint) {
            true
        } else {
            log::warn!(
                "Dropping scenario '{}' for {} {}: it references undeclared identifiers",
                skeleton.title,
                endpoint.method,
                endpoint.path
            );
            false
        }
    });

    skeletons
}

fn request_preamble(endpoint: &CanonicalEndpoint) -> GherkinStep {
    GherkinStep::given(format!(
        "I am making a {} request to \"{}\"",
        endpoint.method, endpoint.path
    ))
}

fn plan_parameter_scenarios(
    endpoint: &CanonicalEndpoint,
    max_optional: usize,
) -> Vec<ScenarioSkeleton> {
    let mut skeletons = Vec::new();

    if endpoint.parameters.iter().any(|p| p.required) {
        skeletons.push(ScenarioSkeleton {
            tags: vec!["@negative".to_string(), "@validation".to_string()],
            title: "Missing required parameters".to_string(),
            steps: vec![
                request_preamble(endpoint),
                GherkinStep::when("I send the request without required parameters"),
                GherkinStep::then("the response status code should be 400"),
                GherkinStep::and("the response should indicate missing required parameters"),
            ],
        });
    }

    if endpoint.parameters.is_empty() {
        return skeletons;
    }

    for combination in parameter_combinations(endpoint, max_optional) {
        let title = if combination.is_empty() {
            "Parameter combination: no parameters".to_string()
        } else {
            format!("Parameter combination: {}", combination.join(", "))
        };

        let mut steps = vec![request_preamble(endpoint)];
        for name in &combination {
            steps.push(GherkinStep::and(format!(
                "I set the <{}> parameter to a valid value",
                name
            )));
        }
        steps.push(GherkinStep::when("I send the request"));
        steps.push(GherkinStep::then("the response status code should be 200"));
        steps.push(GherkinStep::and("the response should contain a successful result"));

        skeletons.push(ScenarioSkeleton {
            tags: vec!["@validation".to_string()],
            title,
            steps,
        });
    }

    skeletons
}

/// All parameter combinations for an endpoint: the required baseline plus
/// every subset of the (capped) optional parameters, smallest subsets
/// first. Count is `2^min(|optional|, max_optional)`.
pub fn parameter_combinations(
    endpoint: &CanonicalEndpoint,
    max_optional: usize,
) -> Vec<Vec<String>> {
    let required: Vec<String> = endpoint
        .required_parameters()
        .map(|p| p.name.clone())
        .collect();
    let optional: Vec<String> = endpoint
        .optional_parameters()
        .map(|p| p.name.clone())
        .collect();

    let expandable = if optional.len() > max_optional {
        log::warn!(
            "Endpoint {} {} declares {} optional parameters; combining only the first {}",
            endpoint.method,
            endpoint.path,
            optional.len(),
            max_optional
        );
        &optional[..max_optional]
    } else {
        &optional[..]
    };

    let n = expandable.len();
    let mut subsets: Vec<Vec<String>> = (0..(1usize << n))
        .map(|mask| {
            (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| expandable[i].clone())
                .collect()
        })
        .collect();
    // Stable sort keeps declaration order within each subset size
    subsets.sort_by_key(|s| s.len());

    subsets
        .into_iter()
        .map(|subset| {
            let mut combo = required.clone();
            combo.extend(subset);
            combo
        })
        .collect()
}

fn plan_body_scenarios(endpoint: &CanonicalEndpoint) -> Vec<ScenarioSkeleton> {
    let mut skeletons = Vec::new();

    if !matches!(endpoint.method.as_str(), "POST" | "PUT" | "PATCH") {
        return skeletons;
    }
    let body = match &endpoint.request_body {
        Some(body) if !body.is_empty() => body,
        _ => return skeletons,
    };
    let fields = body_properties(body);

    let mut steps = vec![request_preamble(endpoint)];
    if fields.is_empty() {
        steps.push(GherkinStep::and("I have a valid request body"));
    } else {
        for (name, _) in &fields {
            steps.push(GherkinStep::and(format!(
                "I provide a valid value for the <{}> field",
                name
            )));
        }
    }
    steps.push(GherkinStep::when("I send the request"));
    steps.push(GherkinStep::then("the response status code should be 200"));
    steps.push(GherkinStep::and("the response should contain valid data"));
    skeletons.push(ScenarioSkeleton {
        tags: vec!["@validation".to_string()],
        title: "Valid request body".to_string(),
        steps,
    });

    for rule in BODY_RULES {
        let field = match (rule.picker)(&fields) {
            Some(field) => field,
            None => continue,
        };
        skeletons.push(ScenarioSkeleton {
            tags: vec!["@negative".to_string(), "@validation".to_string()],
            title: format!("Invalid request body: {}", rule.title.to_lowercase()),
            steps: vec![
                request_preamble(endpoint),
                GherkinStep::and(format!(
                    "I set the <{}> field to {}",
                    field, rule.value_phrase
                )),
                GherkinStep::when("I send the request"),
                GherkinStep::then("the response status code should be 400"),
                GherkinStep::and(rule.expectation),
            ],
        });
    }

    skeletons
}

fn plan_response_scenarios(endpoint: &CanonicalEndpoint) -> Vec<ScenarioSkeleton> {
    let mut skeletons = Vec::new();

    for status in endpoint.responses.keys() {
        let skeleton = match status.as_str() {
            "200" => ScenarioSkeleton {
                tags: vec!["@validation".to_string()],
                title: "Successful response validation".to_string(),
                steps: vec![
                    request_preamble(endpoint),
                    GherkinStep::when("I send the request with valid data"),
                    GherkinStep::then("the response status code should be 200"),
                    GherkinStep::and("the response should contain valid data"),
                    GherkinStep::and("the response should match the expected schema"),
                ],
            },
            "400" => ScenarioSkeleton {
                tags: vec!["@negative".to_string(), "@validation".to_string()],
                title: "Bad request validation".to_string(),
                steps: vec![
                    request_preamble(endpoint),
                    GherkinStep::when("I send the request with invalid data"),
                    GherkinStep::then("the response status code should be 400"),
                    GherkinStep::and("the response should contain error details"),
                ],
            },
            "401" => ScenarioSkeleton {
                tags: vec!["@negative".to_string(), "@auth".to_string()],
                title: "Unauthorized access".to_string(),
                steps: vec![
                    request_preamble(endpoint),
                    GherkinStep::when("I send the request without authentication"),
                    GherkinStep::then("the response status code should be 401"),
                    GherkinStep::and("the response should indicate authentication required"),
                ],
            },
            "404" => ScenarioSkeleton {
                tags: vec!["@negative".to_string(), "@validation".to_string()],
                title: "Resource not found".to_string(),
                steps: vec![
                    request_preamble(endpoint),
                    GherkinStep::when("I send the request for a non-existent resource"),
                    GherkinStep::then("the response status code should be 404"),
                    GherkinStep::and("the response should indicate resource not found"),
                ],
            },
            other => {
                log::debug!(
                    "No outcome scenario for status {} on {} {}",
                    other,
                    endpoint.method,
                    endpoint.path
                );
                continue;
            }
        };
        skeletons.push(skeleton);
    }

    skeletons
}

/// Check that every `<name>` placeholder in the skeleton's steps names a
/// declared parameter or body field of the endpoint.
pub fn validate_skeleton(skeleton: &ScenarioSkeleton, endpoint: &CanonicalEndpoint) -> bool {
    let declared: HashSet<String> = endpoint.declared_identifiers().into_iter().collect();
    for step in &skeleton.steps {
        for capture in PLACEHOLDER_RE.captures_iter(&step.text) {
            if !declared.contains(&capture[1]) {
                return false;
            }
        }
    }
    true
}

fn body_properties(body: &BodyDescriptor) -> Vec<(String, JsonValue)> {
    body.content
        .get("application/json")
        .and_then(|media| media.get("schema").or(Some(media)))
        .and_then(|schema| schema.get("properties"))
        .and_then(JsonValue::as_object)
        .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn pick_first_field(fields: &[(String, JsonValue)]) -> Option<String> {
    fields.first().map(|(name, _)| name.clone())
}

fn pick_numeric_field(fields: &[(String, JsonValue)]) -> Option<String> {
    fields
        .iter()
        .find(|(_, schema)| {
            matches!(
                schema.get("type").and_then(JsonValue::as_str),
                Some("integer" | "number")
            )
        })
        .map(|(name, _)| name.clone())
}

fn pick_formatted_field(fields: &[(String, JsonValue)]) -> Option<String> {
    fields
        .iter()
        .find(|(_, schema)| schema.get("format").is_some())
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ParamDescriptor, ParamLocation, ResponseDescriptor};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn endpoint(path: &str, method: &str) -> CanonicalEndpoint {
        CanonicalEndpoint {
            path: path.to_string(),
            method: method.to_string(),
            parameters: Vec::new(),
            request_body: None,
            responses: BTreeMap::new(),
        }
    }

    fn param(name: &str, required: bool) -> ParamDescriptor {
        ParamDescriptor {
            name: name.to_string(),
            location: ParamLocation::Query,
            required,
            type_name: "string".to_string(),
            description: String::new(),
            schema: None,
        }
    }

    fn with_response(mut e: CanonicalEndpoint, code: &str) -> CanonicalEndpoint {
        e.responses
            .insert(code.to_string(), ResponseDescriptor::default());
        e
    }

    #[test]
    fn test_outcome_skeletons_only_for_parameterless_endpoint() {
        let e = with_response(with_response(endpoint("/Books", "GET"), "200"), "404");
        let skeletons = plan(&e, 4);
        assert_eq!(skeletons.len(), 2);
        let titles: Vec<&str> = skeletons.iter().map(|s| s.title.as_str()).collect();
        assert!(titles.contains(&"Successful response validation"));
        assert!(titles.contains(&"Resource not found"));
    }

    #[test]
    fn test_unknown_status_codes_are_skipped() {
        let e = with_response(with_response(endpoint("/Books", "GET"), "200"), "502");
        let skeletons = plan(&e, 4);
        assert_eq!(skeletons.len(), 1);
        assert_eq!(skeletons[0].title, "Successful response validation");
    }

    #[test]
    fn test_missing_required_parameter_skeleton() {
        let mut e = endpoint("/Books", "GET");
        e.parameters.push(param("ISBN", true));
        let skeletons = plan(&e, 4);

        let missing = skeletons
            .iter()
            .find(|s| s.title == "Missing required parameters")
            .expect("missing-required skeleton");
        assert!(missing.tags.contains(&"@negative".to_string()));
        assert!(missing
            .steps
            .iter()
            .any(|s| s.text.contains("status code should be 400")));
    }

    #[test]
    fn test_combination_count_is_powerset_of_optional() {
        let mut e = endpoint("/Books", "GET");
        e.parameters.push(param("id", true));
        e.parameters.push(param("limit", false));
        e.parameters.push(param("offset", false));

        let combos = parameter_combinations(&e, 4);
        assert_eq!(combos.len(), 4);
        // Baseline first, then singles in declaration order, then the pair
        assert_eq!(combos[0], vec!["id"]);
        assert_eq!(combos[1], vec!["id", "limit"]);
        assert_eq!(combos[2], vec!["id", "offset"]);
        assert_eq!(combos[3], vec!["id", "limit", "offset"]);
    }

    #[test]
    fn test_combination_cap_bounds_blowup() {
        let mut e = endpoint("/Books", "GET");
        for i in 0..6 {
            e.parameters.push(param(&format!("p{}", i), false));
        }
        assert_eq!(parameter_combinations(&e, 2).len(), 4);
        assert_eq!(parameter_combinations(&e, 6).len(), 64);
    }

    #[test]
    fn test_body_skeletons_for_post_with_schema() {
        let mut e = endpoint("/BookStore/v1/Books", "POST");
        e.request_body = crate::record::BodyDescriptor::from_llm_json(&json!({
            "content": {"application/json": {"schema": {"properties": {
                "title": {"type": "string"},
                "price": {"type": "number"},
                "isbn": {"type": "string", "format": "isbn-13"}
            }}}}
        }));
        e.responses
            .insert("200".to_string(), ResponseDescriptor::default());

        let skeletons = plan(&e, 4);
        let titles: Vec<&str> = skeletons.iter().map(|s| s.title.as_str()).collect();
        assert!(titles.contains(&"Valid request body"));
        assert!(titles.contains(&"Invalid request body: empty required field"));
        assert!(titles.contains(&"Invalid request body: negative numeric field"));
        assert!(titles.contains(&"Invalid request body: malformed format field"));
    }

    #[test]
    fn test_no_body_skeletons_for_get() {
        let mut e = endpoint("/Books", "GET");
        e.request_body = crate::record::BodyDescriptor::from_llm_json(&json!({
            "content": {"application/json": {"schema": {"properties": {"title": {}}}}}
        }));
        let skeletons = plan(&e, 4);
        assert!(skeletons.iter().all(|s| s.title != "Valid request body"));
    }

    #[test]
    fn test_numeric_rule_skipped_without_numeric_field() {
        let mut e = endpoint("/Account/v1/User", "POST");
        e.request_body = crate::record::BodyDescriptor::from_llm_json(&json!({
            "content": {"application/json": {"schema": {"properties": {
                "userName": {"type": "string"}
            }}}}
        }));
        let skeletons = plan(&e, 4);
        assert!(skeletons
            .iter()
            .all(|s| s.title != "Invalid request body: negative numeric field"));
        assert!(skeletons
            .iter()
            .any(|s| s.title == "Invalid request body: empty required field"));
    }

    #[test]
    fn test_validator_rejects_undeclared_reference() {
        let mut e = endpoint("/Books", "GET");
        e.parameters.push(param("bar", false));

        let skeleton = ScenarioSkeleton {
            tags: vec!["@validation".to_string()],
            title: "Hallucinated".to_string(),
            steps: vec![GherkinStep::and("I set the <foo> parameter to a valid value")],
        };
        assert!(!validate_skeleton(&skeleton, &e));

        let ok = ScenarioSkeleton {
            tags: vec![],
            title: "Declared".to_string(),
            steps: vec![GherkinStep::and("I set the <bar> parameter to a valid value")],
        };
        assert!(validate_skeleton(&ok, &e));
    }

    #[test]
    fn test_planned_skeletons_survive_their_own_validator() {
        let mut e = endpoint("/BookStore/v1/Books", "POST");
        e.parameters.push(param("ISBN", true));
        e.parameters.push(param("limit", false));
        e.request_body = crate::record::BodyDescriptor::from_llm_json(&json!({
            "content": {"application/json": {"schema": {"properties": {
                "title": {"type": "string"}
            }}}}
        }));
        e.responses
            .insert("200".to_string(), ResponseDescriptor::default());
        e.responses
            .insert("401".to_string(), ResponseDescriptor::default());

        let skeletons = plan(&e, 4);
        assert!(!skeletons.is_empty());
        assert!(skeletons.iter().all(|s| validate_skeleton(s, &e)));
    }
}
