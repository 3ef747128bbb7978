// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Rule-based playbook selection.
//!
//! A rules file maps observation patterns to playbooks:
//!
//! ```yaml
//! rules:
//!   - id: web_idor_resource
//!     test_types: [web, api]
//!     priority: 100
//!     playbook_id: idor_validation
//!     conditions:
//!       - category: service
//!         data_contains:
//!           - key: url_pattern
//!             contains: ["/user/", "/account/"]
//! default_playbook: null
//! ```
//!
//! Selection is pure: the same observations and test type always give the
//! same answer, and nothing is logged here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::errors::{AssistError, AssistResult};
use crate::types::{value_as_text, Observation, ObservationCategory};

/// Root of a selector rules file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SelectorRules {
    #[serde(default)]
    pub rules: Vec<SelectorRule>,
    #[serde(default)]
    pub default_playbook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorRule {
    pub id: String,
    pub test_types: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    pub priority: i64,
    pub playbook_id: String,
}

/// All `data_contains` requirements must hold on one observation of `category`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCondition {
    pub category: ObservationCategory,
    #[serde(default)]
    pub data_contains: Vec<DataRequirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataRequirement {
    pub key: String,
    /// Exact equality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    /// Any substring, case-insensitive, against the stringified field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<String>>,
}

impl DataRequirement {
    /// `None` when satisfied, otherwise what was unmet
    fn unmet(&self, data: &Map<String, Value>) -> Option<String> {
        let Some(actual) = data.get(&self.key) else {
            return Some(format!("key '{}' missing", self.key));
        };

        if let Some(expected) = &self.value {
            if !loosely_equal(actual, expected) {
                return Some(format!("{}={} (expected {})", self.key, actual, expected));
            }
        }

        if let Some(allowed) = &self.values {
            if !allowed.iter().any(|v| loosely_equal(actual, v)) {
                return Some(format!(
                    "{}={} not in {}",
                    self.key,
                    actual,
                    Value::Array(allowed.clone())
                ));
            }
        }

        if let Some(needles) = &self.contains {
            let haystack = value_as_text(actual).to_lowercase();
            if !needles.iter().any(|n| haystack.contains(&n.to_lowercase())) {
                return Some(format!("{} does not contain any of {:?}", self.key, needles));
            }
        }

        None
    }
}

/// JSON equality where `22` and `22.0` are the same number
fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

/// Evaluation record for one rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleTrace {
    pub rule_id: String,
    pub playbook_id: String,
    pub priority: i64,
    pub matched: bool,
    pub failure_reasons: Vec<String>,
}

/// Full explanation of a selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionTrace {
    pub test_type: String,
    pub selected_playbook: Option<String>,
    pub used_default: bool,
    pub evaluated_rules: Vec<RuleTrace>,
}

pub struct PlaybookSelector {
    rules: SelectorRules,
}

impl PlaybookSelector {
    pub fn new(rules: SelectorRules) -> Self {
        Self { rules }
    }

    /// Load a rules file. A missing or malformed file is invalid input.
    pub fn from_path(path: &Path) -> AssistResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AssistError::InvalidInput(format!("Cannot read selector rules {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
            .map_err(|e| AssistError::InvalidInput(format!("Selector rules {}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(raw: &str) -> AssistResult<Self> {
        // An empty document parses to null
        let rules: Option<SelectorRules> =
            serde_yaml::from_str(raw).map_err(|e| AssistError::InvalidInput(e.to_string()))?;
        Ok(Self::new(rules.unwrap_or_default()))
    }

    pub fn rules(&self) -> &SelectorRules {
        &self.rules
    }

    /// Highest-priority matching playbook, else the default (which may be absent).
    pub fn select(&self, observations: &[Observation], test_type: &str) -> Option<String> {
        self.explain(observations, test_type).selected_playbook
    }

    /// Evaluate every rule and report why each one did or did not match.
    pub fn explain(&self, observations: &[Observation], test_type: &str) -> SelectionTrace {
        let present: BTreeSet<&'static str> = observations.iter().map(|o| o.category.as_str()).collect();

        let mut evaluated = Vec::with_capacity(self.rules.rules.len());
        let mut best: Option<(i64, &str)> = None;

        for rule in &self.rules.rules {
            let failure_reasons = evaluate_rule(rule, observations, test_type, &present);
            let matched = failure_reasons.is_empty();

            // Strictly greater keeps the first-declared rule on ties
            if matched && best.map_or(true, |(priority, _)| rule.priority > priority) {
                best = Some((rule.priority, rule.playbook_id.as_str()));
            }

            evaluated.push(RuleTrace {
                rule_id: rule.id.clone(),
                playbook_id: rule.playbook_id.clone(),
                priority: rule.priority,
                matched,
                failure_reasons,
            });
        }

        let (selected_playbook, used_default) = match best {
            Some((_, playbook)) => (Some(playbook.to_string()), false),
            None => (self.rules.default_playbook.clone(), true),
        };

        debug!(
            test_type,
            selected = ?selected_playbook,
            used_default,
            rules = evaluated.len(),
            "Playbook selection evaluated"
        );

        SelectionTrace {
            test_type: test_type.to_string(),
            selected_playbook,
            used_default,
            evaluated_rules: evaluated,
        }
    }
}

fn evaluate_rule(
    rule: &SelectorRule,
    observations: &[Observation],
    test_type: &str,
    present: &BTreeSet<&'static str>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if !rule.test_types.iter().any(|t| t == test_type) {
        reasons.push(format!("test_type '{}' not in {:?}", test_type, rule.test_types));
    }

    if rule.conditions.is_empty() {
        reasons.push("rule has no conditions".to_string());
        return reasons;
    }

    for (index, condition) in rule.conditions.iter().enumerate() {
        let candidates: Vec<&Observation> =
            observations.iter().filter(|o| o.category == condition.category).collect();

        if candidates.is_empty() {
            reasons.push(format!(
                "condition {}: no '{}' observations (present: {:?})",
                index + 1,
                condition.category,
                present
            ));
            continue;
        }

        let mut unmet = BTreeSet::new();
        let satisfied = candidates.iter().any(|obs| {
            match condition.data_contains.iter().find_map(|req| req.unmet(&obs.data)) {
                Some(reason) => {
                    unmet.insert(reason);
                    false
                }
                None => true,
            }
        });

        if !satisfied {
            reasons.push(format!(
                "condition {}: no '{}' observation satisfies data_contains ({})",
                index + 1,
                condition.category,
                unmet.into_iter().collect::<Vec<_>>().join("; ")
            ));
        }
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &str = r#"
rules:
  - id: authz
    test_types: [web]
    priority: 95
    playbook_id: authz_broken_access
    conditions:
      - category: authorization
        data_contains:
          - key: authz_bypass_indicator
            value: true
  - id: idor
    test_types: [web]
    priority: 100
    playbook_id: idor_validation
    conditions:
      - category: service
        data_contains:
          - key: url_pattern
            contains: ["/USER/"]
  - id: empty
    test_types: [web]
    priority: 500
    playbook_id: never
default_playbook: generic_validation
"#;

    fn obs(category: ObservationCategory, data: Value) -> Observation {
        Observation::new("test", category, vec![], 0.9, data.as_object().cloned().unwrap()).unwrap()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let selector = PlaybookSelector::from_yaml_str(RULES).unwrap();
        let observations = [obs(ObservationCategory::Service, json!({"url_pattern": "/user/42"}))];
        assert_eq!(selector.select(&observations, "web").as_deref(), Some("idor_validation"));
    }

    #[test]
    fn test_rule_without_conditions_never_matches() {
        let selector = PlaybookSelector::from_yaml_str(RULES).unwrap();
        let trace = selector.explain(&[], "web");
        let empty = trace.evaluated_rules.iter().find(|r| r.rule_id == "empty").unwrap();
        assert!(!empty.matched);
        assert_eq!(trace.selected_playbook.as_deref(), Some("generic_validation"));
        assert!(trace.used_default);
    }

    #[test]
    fn test_equal_priority_keeps_first_declared() {
        let yaml = r#"
rules:
  - {id: a, test_types: [network], priority: 10, playbook_id: first, conditions: [{category: port}]}
  - {id: b, test_types: [network], priority: 10, playbook_id: second, conditions: [{category: port}]}
"#;
        let selector = PlaybookSelector::from_yaml_str(yaml).unwrap();
        let observations = [obs(ObservationCategory::Port, json!({"port": 22}))];
        assert_eq!(selector.select(&observations, "network").as_deref(), Some("first"));
    }

    #[test]
    fn test_unknown_category_is_invalid() {
        let yaml = "rules:\n  - {id: a, test_types: [web], priority: 1, playbook_id: x, conditions: [{category: database}]}\n";
        assert!(matches!(
            PlaybookSelector::from_yaml_str(yaml),
            Err(AssistError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_values_membership() {
        let requirement = DataRequirement {
            key: "port".to_string(),
            value: None,
            values: Some(vec![json!(22), json!(3389)]),
            contains: None,
        };
        let open = json!({"port": 3389});
        let closed = json!({"port": 80});
        assert!(requirement.unmet(open.as_object().unwrap()).is_none());
        assert!(requirement.unmet(closed.as_object().unwrap()).is_some());
    }

    #[test]
    fn test_numbers_match_across_int_and_float() {
        let exact = DataRequirement {
            key: "port".to_string(),
            value: Some(json!(22)),
            values: None,
            contains: None,
        };
        let member = DataRequirement {
            key: "port".to_string(),
            value: None,
            values: Some(vec![json!(502.0), json!("4840")]),
            contains: None,
        };

        assert!(exact.unmet(json!({"port": 22.0}).as_object().unwrap()).is_none());
        assert!(exact.unmet(json!({"port": 22.5}).as_object().unwrap()).is_some());
        assert!(exact.unmet(json!({"port": "22"}).as_object().unwrap()).is_some());
        assert!(member.unmet(json!({"port": 502}).as_object().unwrap()).is_none());
        assert!(member.unmet(json!({"port": 4840}).as_object().unwrap()).is_some());
    }
}
