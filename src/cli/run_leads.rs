// src/cli/run_leads.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::database;
use crate::models::{CliApp, Lead, LeadOrigin, LeadStatus};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn run_leads(&self) -> Result<()> {
        loop {
            println!("\n👥 Leads");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

            let options = vec![
                "📋 List recent leads",
                "➕ Add lead manually",
                "🔄 Change lead status",
                "🏷️  Assign lead to segment",
                "🗑️  Delete lead",
                "⬅️  Back",
            ];
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Lead action")
                .default(0)
                .items(&options)
                .interact()?;

            let outcome = match selection {
                0 => self.list_recent_leads().await,
                1 => self.add_lead_manually().await,
                2 => self.change_lead_status().await,
                3 => self.assign_lead_segment().await,
                4 => self.delete_lead_flow().await,
                _ => break,
            };

            if let Err(e) = outcome {
                println!("❌ {}", e);
            }
        }
        Ok(())
    }

    async fn list_recent_leads(&self) -> Result<()> {
        let leads =
            database::list_leads(&self.db_pool, self.engine.workspace_id(), 25, 0).await?;
        if leads.is_empty() {
            println!("📭 No leads yet — import a CSV or add one manually");
            return Ok(());
        }
        for lead in &leads {
            let company = lead.company.as_deref().unwrap_or("-");
            println!(
                "  {} <{}> [{}] {} ({})",
                lead.name,
                lead.email,
                lead.status.as_str(),
                company,
                lead.origin.as_str()
            );
        }
        let total = database::count_leads(&self.db_pool, self.engine.workspace_id()).await?;
        if total > leads.len() as i64 {
            println!("  ... {} leads total", total);
        }
        Ok(())
    }

    async fn add_lead_manually(&self) -> Result<()> {
        let name: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Name")
            .interact_text()?;
        let email: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Email")
            .interact_text()?;
        let company: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Company (optional)")
            .allow_empty(true)
            .interact_text()?;

        if name.trim().is_empty() || email.trim().is_empty() {
            println!("❌ Name and email are required");
            return Ok(());
        }
        if !email.contains('@') {
            println!("❌ '{}' does not look like an email address", email);
            return Ok(());
        }

        let existing =
            database::get_lead_by_email(&self.db_pool, self.engine.workspace_id(), email.trim())
                .await?;
        if existing.is_some() {
            println!("ℹ️ A lead with this email already exists — its fields will be updated");
        }

        let mut lead = Lead::new(
            self.engine.workspace_id(),
            name.trim(),
            email.trim(),
            LeadOrigin::Manual,
        );
        if !company.trim().is_empty() {
            lead.company = Some(company.trim().to_string());
        }

        database::upsert_lead(&self.db_pool, &lead).await?;
        println!("✅ Lead '{}' saved", name.trim());
        Ok(())
    }

    async fn pick_lead(&self) -> Result<Option<Lead>> {
        let leads =
            database::list_leads(&self.db_pool, self.engine.workspace_id(), 50, 0).await?;
        if leads.is_empty() {
            println!("📭 No leads yet");
            return Ok(None);
        }
        let labels: Vec<String> = leads
            .iter()
            .map(|l| format!("{} <{}> [{}]", l.name, l.email, l.status.as_str()))
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Which lead?")
            .items(&labels)
            .interact()?;
        Ok(Some(leads[selection].clone()))
    }

    async fn change_lead_status(&self) -> Result<()> {
        let Some(lead) = self.pick_lead().await? else {
            return Ok(());
        };

        let statuses = [
            LeadStatus::New,
            LeadStatus::Contacted,
            LeadStatus::Responded,
            LeadStatus::Qualified,
            LeadStatus::Converted,
            LeadStatus::Dead,
        ];
        let labels: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("New status")
            .items(&labels)
            .interact()?;

        database::update_lead_status(&self.db_pool, &lead.id, statuses[selection]).await?;
        println!("✅ {} is now {}", lead.email, statuses[selection].as_str());
        Ok(())
    }

    async fn assign_lead_segment(&self) -> Result<()> {
        let Some(lead) = self.pick_lead().await? else {
            return Ok(());
        };

        let segments = self.engine.segments().list_with_counts().await?;
        let mut options = vec!["(no segment)".to_string()];
        options.extend(segments.iter().map(|(s, _)| s.name.clone()));
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Segment")
            .default(0)
            .items(&options)
            .interact()?;

        let segment_id = if selection == 0 {
            None
        } else {
            Some(segments[selection - 1].0.id.as_str())
        };
        self.engine
            .segments()
            .assign_lead(&lead.id, segment_id)
            .await?;
        println!("✅ {} reassigned", lead.email);
        Ok(())
    }

    async fn delete_lead_flow(&self) -> Result<()> {
        let Some(lead) = self.pick_lead().await? else {
            return Ok(());
        };

        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete '{}'? Messages already generated keep their history with the lead \
                 reference cleared",
                lead.email
            ))
            .interact()?
        {
            return Ok(());
        }

        database::delete_lead(&self.db_pool, &lead.id).await?;
        println!("✅ Lead deleted");
        Ok(())
    }
}
