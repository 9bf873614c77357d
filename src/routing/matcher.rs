//! Payload rule matching.
//!
//! # Responsibilities
//! - Hold the immutable endpoint rules loaded at startup
//! - Match a parsed request body against a single rule
//! - Scan the table in declaration order, first match wins
//!
//! # Design Decisions
//! - Only top-level body fields are inspected
//! - A rule matches only JSON strings equal to its value (no coercion)
//! - The table is never mutated after construction, so it is shared
//!   across connections behind an `Arc` without locking

use serde_json::{Map, Value};

use super::router::Target;

/// A single routing rule: `match_field == match_value` selects `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRule {
    name: String,
    match_field: String,
    match_value: String,
    target: Target,
}

impl EndpointRule {
    pub fn new(
        name: impl Into<String>,
        match_field: impl Into<String>,
        match_value: impl Into<String>,
        target_host: impl Into<String>,
        target_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            match_field: match_field.into(),
            match_value: match_value.into(),
            target: Target::new(target_host, target_port),
        }
    }

    /// Logical endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend this rule routes to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Returns true if the body carries the routing key this rule expects.
    pub fn matches(&self, body: &Map<String, Value>) -> bool {
        matches!(body.get(&self.match_field), Some(Value::String(v)) if *v == self.match_value)
    }
}

/// Ordered, read-only collection of endpoint rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointTable {
    rules: Vec<EndpointRule>,
}

impl EndpointTable {
    pub fn new(rules: Vec<EndpointRule>) -> Self {
        Self { rules }
    }

    /// First rule, in insertion order, matching `body`.
    pub fn find(&self, body: &Map<String, Value>) -> Option<&EndpointRule> {
        self.rules.iter().find(|rule| rule.matches(body))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<EndpointRule> for EndpointTable {
    fn from_iter<I: IntoIterator<Item = EndpointRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn rule_matches_string_value() {
        let rule = EndpointRule::new("api1", "field1", "value1", "api1.example.com", 80);
        assert!(rule.matches(&object(json!({"field1": "value1", "other": 1}))));
        assert!(!rule.matches(&object(json!({"field1": "value2"}))));
        assert!(!rule.matches(&object(json!({"field2": "value1"}))));
    }

    #[test]
    fn rule_does_not_coerce_types() {
        let rule = EndpointRule::new("n", "id", "7", "h", 80);
        assert!(!rule.matches(&object(json!({"id": 7}))));
        assert!(rule.matches(&object(json!({"id": "7"}))));
    }

    #[test]
    fn first_inserted_rule_wins() {
        let table: EndpointTable = vec![
            EndpointRule::new("first", "kind", "a", "first.example.com", 80),
            EndpointRule::new("second", "kind", "a", "second.example.com", 81),
        ]
        .into_iter()
        .collect();

        let body = object(json!({"kind": "a"}));
        assert_eq!(table.find(&body).unwrap().name(), "first");
        // Repeated lookups see the same table and the same answer.
        assert_eq!(table.find(&body).unwrap().name(), "first");
    }

    #[test]
    fn no_rule_matches() {
        let table = EndpointTable::new(vec![EndpointRule::new("a", "f", "v", "h", 80)]);
        assert!(table.find(&object(json!({"f": "w"}))).is_none());
        assert!(EndpointTable::default().find(&object(json!({}))).is_none());
    }
}
