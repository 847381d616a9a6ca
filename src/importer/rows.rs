// src/importer/rows.rs
use regex::Regex;
use url::Url;

use super::columns::ColumnMapping;
use crate::models::{Lead, LeadOrigin};

/// Split one CSV line into cells. Handles double-quoted fields with
/// embedded commas and doubled-quote escapes; anything fancier is outside
/// the import contract.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

fn email_shape_ok(email: &str) -> bool {
    // basic local@domain shape, nothing RFC-grade
    let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static pattern");
    re.is_match(email)
}

fn cell<'a>(row: &'a [String], mapping: &ColumnMapping, field: &str) -> Option<&'a str> {
    mapping
        .get(field)
        .and_then(|&idx| row.get(idx))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Build a Lead candidate from one data row, reading only mapped columns.
/// `row_number` is 1-based over data rows and only used for the error text.
pub fn build_candidate(
    row: &[String],
    mapping: &ColumnMapping,
    workspace: &str,
    row_number: usize,
) -> Result<Lead, String> {
    let name = cell(row, mapping, "name")
        .ok_or_else(|| format!("row {}: missing required field 'name'", row_number))?;
    let email = cell(row, mapping, "email")
        .ok_or_else(|| format!("row {}: missing required field 'email'", row_number))?;

    if !email_shape_ok(email) {
        return Err(format!("row {}: invalid email '{}'", row_number, email));
    }

    let mut lead = Lead::new(workspace, name, email, LeadOrigin::CsvImport);
    lead.company = cell(row, mapping, "company").map(str::to_string);
    lead.position = cell(row, mapping, "position").map(str::to_string);
    lead.industry = cell(row, mapping, "industry").map(str::to_string);
    lead.phone = cell(row, mapping, "phone").map(str::to_string);
    lead.location = cell(row, mapping, "location").map(str::to_string);
    lead.linkedin_url = cell(row, mapping, "linkedin_url").map(str::to_string);

    // Keep a website value only when it parses as an absolute URL; a bad
    // optional cell degrades to empty instead of failing the row.
    lead.website = cell(row, mapping, "website")
        .filter(|w| Url::parse(w).is_ok() || Url::parse(&format!("https://{}", w)).is_ok())
        .map(str::to_string);

    Ok(lead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::columns::suggest_mapping;

    fn mapping_for(headers: &[&str]) -> ColumnMapping {
        suggest_mapping(&headers.iter().map(|h| h.to_string()).collect::<Vec<_>>())
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn splits_plain_and_quoted_cells() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_csv_line(r#"Alice,"Acme, Inc.",alice@acme.com"#),
            vec!["Alice", "Acme, Inc.", "alice@acme.com"]
        );
        assert_eq!(split_csv_line(r#""say ""hi""""#), vec![r#"say "hi""#]);
        assert_eq!(split_csv_line("a,,c"), vec!["a", "", "c"]);
    }

    #[test]
    fn builds_lead_from_mapped_columns_only() {
        let mapping = mapping_for(&["Email", "Name", "Company"]);
        let lead =
            build_candidate(&row(&["a@x.com", "Alice", "Acme"]), &mapping, "ws", 1).unwrap();
        assert_eq!(lead.email, "a@x.com");
        assert_eq!(lead.name, "Alice");
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(lead.origin, crate::models::LeadOrigin::CsvImport);
    }

    #[test]
    fn values_are_trimmed_and_empty_optionals_dropped() {
        let mapping = mapping_for(&["Email", "Name", "Company"]);
        let lead =
            build_candidate(&row(&[" a@x.com ", "  Alice ", "  "]), &mapping, "ws", 1).unwrap();
        assert_eq!(lead.email, "a@x.com");
        assert_eq!(lead.name, "Alice");
        assert!(lead.company.is_none());
    }

    #[test]
    fn malformed_email_fails_with_row_reference() {
        let mapping = mapping_for(&["Email", "Name"]);
        let err = build_candidate(&row(&["bad-email", "Bob"]), &mapping, "ws", 2).unwrap_err();
        assert!(err.contains("row 2"), "error was: {}", err);
        assert!(err.contains("bad-email"));
    }

    #[test]
    fn empty_required_field_fails_the_row() {
        let mapping = mapping_for(&["Email", "Name"]);
        let err = build_candidate(&row(&["a@x.com", "   "]), &mapping, "ws", 3).unwrap_err();
        assert!(err.contains("row 3"));
        assert!(err.contains("name"));
    }

    #[test]
    fn short_row_counts_as_missing_fields() {
        let mapping = mapping_for(&["Email", "Name"]);
        let err = build_candidate(&row(&["a@x.com"]), &mapping, "ws", 4).unwrap_err();
        assert!(err.contains("row 4"));
    }
}
