// src/importer/columns.rs
use std::collections::HashMap;

/// Lead field name to column index, as used by one import run.
pub type ColumnMapping = HashMap<String, usize>;

/// Keyword families tested against each normalized header cell, in priority
/// order. First family whose token matches wins the cell; a field is
/// assigned to at most one column.
const FIELD_KEYWORDS: &[(&str, &[&str])] = &[
    ("name", &["name"]),
    ("email", &["email", "e-mail"]),
    ("company", &["company", "organization", "organisation"]),
    ("phone", &["phone"]),
    ("linkedin_url", &["linkedin"]),
    ("industry", &["industry"]),
    ("location", &["location", "city"]),
    ("position", &["title", "position", "job"]),
    ("website", &["website", "url"]),
];

/// Heuristic column detection over a header row. This is only the default
/// suggestion; the operator may override any assignment before the import
/// executes.
pub fn suggest_mapping(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();

    for (index, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }

        for (field, keywords) in FIELD_KEYWORDS {
            if mapping.contains_key(*field) {
                continue;
            }
            if keywords.iter().any(|kw| normalized.contains(kw)) {
                mapping.insert((*field).to_string(), index);
                break;
            }
        }
    }

    mapping
}

/// Pre-flight check: every required field must be mapped before a single
/// row is written. Returns the missing field names for the caller's error
/// message.
pub fn validate_mapping(
    mapping: &ColumnMapping,
    required_fields: &[String],
) -> Result<(), Vec<String>> {
    let missing: Vec<String> = required_fields
        .iter()
        .filter(|field| !mapping.contains_key(*field))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn detects_common_headers() {
        let mapping = suggest_mapping(&headers(&["Full Name", "Email Address", "Company"]));
        assert_eq!(mapping.get("name"), Some(&0));
        assert_eq!(mapping.get("email"), Some(&1));
        assert_eq!(mapping.get("company"), Some(&2));
    }

    #[test]
    fn detection_is_case_and_whitespace_insensitive() {
        let mapping = suggest_mapping(&headers(&["  E-MAIL  ", "NAME"]));
        assert_eq!(mapping.get("email"), Some(&0));
        assert_eq!(mapping.get("name"), Some(&1));
    }

    #[test]
    fn first_match_wins_per_field() {
        let mapping = suggest_mapping(&headers(&["Email", "Backup Email"]));
        assert_eq!(mapping.get("email"), Some(&0));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn linkedin_beats_generic_url() {
        let mapping = suggest_mapping(&headers(&["LinkedIn URL", "Website URL"]));
        assert_eq!(mapping.get("linkedin_url"), Some(&0));
        assert_eq!(mapping.get("website"), Some(&1));
    }

    #[test]
    fn position_family_covers_title_and_job() {
        let mapping = suggest_mapping(&headers(&["Job Title", "City"]));
        assert_eq!(mapping.get("position"), Some(&0));
        assert_eq!(mapping.get("location"), Some(&1));
    }

    #[test]
    fn unknown_headers_stay_unmapped() {
        let mapping = suggest_mapping(&headers(&["Favourite Color", "Shoe Size"]));
        assert!(mapping.is_empty());
    }

    #[test]
    fn validation_reports_all_missing_fields() {
        let mapping = suggest_mapping(&headers(&["Company"]));
        let required = vec!["name".to_string(), "email".to_string()];
        let missing = validate_mapping(&mapping, &required).unwrap_err();
        assert_eq!(missing, vec!["name".to_string(), "email".to_string()]);
    }

    #[test]
    fn validation_passes_with_required_fields_mapped() {
        let mapping = suggest_mapping(&headers(&["Name", "Email"]));
        let required = vec!["name".to_string(), "email".to_string()];
        assert!(validate_mapping(&mapping, &required).is_ok());
    }
}
