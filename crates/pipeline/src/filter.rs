//! Exclusion filter evaluation
//!
//! A record is dropped only when every enabled rule matches it (AND).
//! A rule whose field is absent from the record does not match, so the
//! record is kept. An empty or fully disabled rule set keeps everything.

use sluice_config::FilterRule;
use sluice_event::FieldMap;

/// Decide whether a record should be dropped.
pub fn should_drop(rules: &[FilterRule], fields: &FieldMap) -> bool {
    let mut any_enabled = false;

    for rule in rules.iter().filter(|r| r.enabled) {
        any_enabled = true;
        match fields.get(&rule.field_name) {
            Some(value) if value == rule.match_value => {}
            _ => return false,
        }
    }

    any_enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_event::extract_fields;

    fn rule(field: &str, value: &str, enabled: bool) -> FilterRule {
        FilterRule {
            field_name: field.into(),
            match_value: value.into(),
            enabled,
        }
    }

    #[test]
    fn empty_rule_set_keeps_everything() {
        let fields = extract_fields("level=DEBUG");
        assert!(!should_drop(&[], &fields));
    }

    #[test]
    fn single_matching_rule_drops() {
        let fields = extract_fields("level=DEBUG msg=hi");
        assert!(should_drop(&[rule("level", "DEBUG", true)], &fields));
    }

    #[test]
    fn single_non_matching_rule_keeps() {
        let fields = extract_fields("level=INFO msg=hi");
        assert!(!should_drop(&[rule("level", "DEBUG", true)], &fields));
    }

    #[test]
    fn all_rules_must_match() {
        let rules = [rule("level", "DEBUG", true), rule("unit", "db", true)];

        // Both match: drop
        assert!(should_drop(&rules, &extract_fields("level=DEBUG unit=db")));
        // Only one matches: keep
        assert!(!should_drop(&rules, &extract_fields("level=DEBUG unit=web")));
    }

    #[test]
    fn absent_field_means_rule_does_not_match() {
        let fields = extract_fields("msg=hi");
        assert!(!should_drop(&[rule("level", "DEBUG", true)], &fields));
    }

    #[test]
    fn disabled_rules_are_ignored() {
        let fields = extract_fields("level=INFO unit=db");

        // The non-matching rule is disabled; the remaining one matches
        let rules = [rule("level", "DEBUG", false), rule("unit", "db", true)];
        assert!(should_drop(&rules, &fields));

        // All rules disabled: keep
        let rules = [rule("unit", "db", false)];
        assert!(!should_drop(&rules, &fields));
    }

    #[test]
    fn matches_nested_json_fields() {
        let fields = extract_fields(r#"{"http":{"status":404}}"#);
        assert!(should_drop(&[rule("http.status", "404", true)], &fields));
    }
}
