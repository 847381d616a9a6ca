// src/cli/run_import_leads.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use tracing::debug;

use crate::models::CliApp;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Fields the operator can (re)assign when the heuristic mapping is off.
const MAPPABLE_FIELDS: &[&str] = &[
    "name",
    "email",
    "company",
    "position",
    "industry",
    "phone",
    "website",
    "linkedin_url",
    "location",
];

impl CliApp {
    pub async fn run_import_leads(&self) -> Result<()> {
        println!("\n📥 Lead Import");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let path: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("CSV file path")
            .interact_text()?;

        let csv_text = tokio::fs::read_to_string(&path).await?;
        let (headers, mut mapping) = self.engine.importer().preview_mapping(&csv_text);

        if headers.is_empty() {
            println!("❌ File has no header row");
            return Ok(());
        }

        println!("\n📋 Detected columns:");
        for (i, header) in headers.iter().enumerate() {
            let assigned = mapping
                .iter()
                .find(|(_, &idx)| idx == i)
                .map(|(field, _)| field.as_str());
            match assigned {
                Some(field) => println!("  {}. {} → {}", i + 1, header, field),
                None => println!("  {}. {} (unmapped)", i + 1, header),
            }
        }

        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Use this column mapping?")
            .default(true)
            .interact()?
        {
            println!("Enter a column number per field (blank keeps the current assignment, 0 unmaps):");
            for field in MAPPABLE_FIELDS {
                let current = mapping
                    .get(*field)
                    .map(|&idx| format!("{}", idx + 1))
                    .unwrap_or_else(|| "-".to_string());
                let answer: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("{} [{}]", field, current))
                    .allow_empty(true)
                    .interact_text()?;
                let answer = answer.trim();
                if answer.is_empty() {
                    continue;
                }
                match answer.parse::<usize>() {
                    Ok(0) => {
                        mapping.remove(*field);
                    }
                    Ok(n) if n <= headers.len() => {
                        mapping.insert(field.to_string(), n - 1);
                    }
                    _ => println!("  ⚠️ '{}' is not a valid column number, keeping previous", answer),
                }
            }
        }

        // Optional segment for every imported lead
        let segments = self.engine.segments().list_with_counts().await?;
        let mut segment_options = vec!["(no segment)".to_string()];
        segment_options.extend(
            segments
                .iter()
                .map(|(s, count)| format!("{} ({} leads)", s.name, count)),
        );
        let segment_choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Assign imported leads to a segment?")
            .default(0)
            .items(&segment_options)
            .interact()?;
        let segment_id = if segment_choice == 0 {
            None
        } else {
            Some(segments[segment_choice - 1].0.id.clone())
        };

        let data_rows = csv_text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .count()
            .saturating_sub(1);

        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Import {} data rows from '{}'?", data_rows, path))
            .interact()?
        {
            return Ok(());
        }

        debug!("Starting import of '{}'", path);
        let file_name = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());

        match self
            .engine
            .import_csv(&file_name, &csv_text, &mapping, segment_id.as_deref())
            .await
        {
            Ok(summary) => {
                println!("\n🎉 Import complete!");
                println!("✅ Succeeded: {}", summary.succeeded);
                println!("❌ Failed: {}", summary.failed);
                if !summary.errors.is_empty() {
                    println!("\n⚠️ Row errors:");
                    for error in summary.errors.iter().take(10) {
                        println!("   {}", error);
                    }
                    if summary.errors.len() > 10 {
                        println!("   ... and {} more", summary.errors.len() - 10);
                    }
                }
            }
            Err(e) => {
                println!("❌ Import rejected: {}", e);
            }
        }

        Ok(())
    }
}
