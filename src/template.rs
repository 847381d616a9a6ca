// src/template.rs
use regex::Regex;
use std::collections::HashMap;

use crate::config::WorkspaceConfig;
use crate::models::Lead;

/// Stand-in content for the authored-per-lead slot. Real content is supplied
/// by the content-generation collaborator at send time; previews always show
/// this marker instead.
pub const CUSTOM_MESSAGE_PLACEHOLDER: &str =
    "[Your personalized message will appear here]";

/// Substitute `{{key}}` placeholders from `data`. Total by construction:
/// any template and any mapping produce a string. Keys that are missing or
/// map to an empty value keep their placeholder token, so unresolved spots
/// stay visible in previews instead of collapsing into blanks.
pub fn render(template: &str, data: &HashMap<String, String>) -> String {
    let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static pattern");

    placeholder
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            match data.get(key) {
                Some(value) if !value.trim().is_empty() => value.clone(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Build the substitution mapping for one lead: lead attributes plus the
/// sender identity. Empty lead fields are omitted so their placeholders
/// stay visible. The caller renders the subject first and adds it under
/// the `subject` key so follow-up bodies can reference it.
pub fn lead_context(lead: &Lead, workspace: &WorkspaceConfig) -> HashMap<String, String> {
    let mut data = HashMap::new();

    data.insert("name".to_string(), lead.name.clone());
    if let Some(company) = &lead.company {
        data.insert("company".to_string(), company.clone());
    }
    if let Some(position) = &lead.position {
        data.insert("position".to_string(), position.clone());
    }
    if let Some(industry) = &lead.industry {
        data.insert("industry".to_string(), industry.clone());
    }
    if let Some(location) = &lead.location {
        data.insert("location".to_string(), location.clone());
    }

    data.insert("sender_name".to_string(), workspace.sender_name.clone());
    data.insert(
        "custom_message".to_string(),
        CUSTOM_MESSAGE_PLACEHOLDER.to_string(),
    );

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_keys() {
        let out = render(
            "Hi {{name}}, greetings from {{sender_name}}!",
            &data(&[("name", "Alice"), ("sender_name", "Bob")]),
        );
        assert_eq!(out, "Hi Alice, greetings from Bob!");
    }

    #[test]
    fn unresolved_placeholders_stay_visible() {
        let out = render("Hi {{name}} from {{company}}", &data(&[("name", "Alice")]));
        assert_eq!(out, "Hi Alice from {{company}}");
    }

    #[test]
    fn empty_values_keep_the_token() {
        let out = render("Dear {{name}}", &data(&[("name", "   ")]));
        assert_eq!(out, "Dear {{name}}");
    }

    #[test]
    fn whitespace_inside_braces_is_tolerated() {
        let out = render("Hi {{ name }}", &data(&[("name", "Alice")]));
        assert_eq!(out, "Hi Alice");
    }

    #[test]
    fn never_fails_on_arbitrary_input() {
        // malformed delimiters pass through untouched
        assert_eq!(render("{{", &HashMap::new()), "{{");
        assert_eq!(render("}}{{name", &HashMap::new()), "}}{{name");
        assert_eq!(render("", &HashMap::new()), "");
        assert_eq!(
            render("plain text, no placeholders", &HashMap::new()),
            "plain text, no placeholders"
        );
    }

    #[test]
    fn unrecognized_keys_pass_through() {
        let out = render("{{definitely_not_a_key}}", &data(&[("name", "Alice")]));
        assert_eq!(out, "{{definitely_not_a_key}}");
    }

    #[test]
    fn repeated_placeholders_all_substitute() {
        let out = render("{{name}} {{name}} {{name}}", &data(&[("name", "x")]));
        assert_eq!(out, "x x x");
    }
}
