// src/cli/run_segments.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::models::CliApp;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn run_segments(&self) -> Result<()> {
        loop {
            println!("\n🏷️  Segments");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

            let options = vec![
                "📋 List segments",
                "➕ Create segment",
                "🗑️  Delete segment",
                "⬅️  Back",
            ];
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Segment action")
                .default(0)
                .items(&options)
                .interact()?;

            match selection {
                0 => self.list_segments().await?,
                1 => self.create_segment().await?,
                2 => self.delete_segment().await?,
                _ => break,
            }
        }
        Ok(())
    }

    async fn list_segments(&self) -> Result<()> {
        let segments = self.engine.segments().list_with_counts().await?;
        if segments.is_empty() {
            println!("📭 No segments yet");
            return Ok(());
        }
        for (segment, count) in &segments {
            let description = segment.description.as_deref().unwrap_or("-");
            println!(
                "  {} {} — {} leads ({})",
                segment.color, segment.name, count, description
            );
        }
        Ok(())
    }

    async fn create_segment(&self) -> Result<()> {
        let name: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Segment name")
            .interact_text()?;
        let description: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Description (optional)")
            .allow_empty(true)
            .interact_text()?;
        let color: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Color")
            .default("#2563eb".to_string())
            .interact_text()?;

        let description = if description.trim().is_empty() {
            None
        } else {
            Some(description.as_str())
        };

        match self
            .engine
            .segments()
            .create(&name, description, &color)
            .await
        {
            Ok(segment) => println!("✅ Segment '{}' created", segment.name),
            Err(e) => println!("❌ {}", e),
        }
        Ok(())
    }

    async fn delete_segment(&self) -> Result<()> {
        let segments = self.engine.segments().list_with_counts().await?;
        if segments.is_empty() {
            println!("📭 No segments to delete");
            return Ok(());
        }

        let names: Vec<String> = segments
            .iter()
            .map(|(s, count)| format!("{} ({} leads)", s.name, count))
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete which segment?")
            .items(&names)
            .interact()?;

        let (segment, members) = &segments[selection];
        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete '{}'? {} leads will be unassigned (not deleted)",
                segment.name, members
            ))
            .interact()?
        {
            return Ok(());
        }

        self.engine.segments().delete(&segment.id).await?;
        println!("✅ Segment '{}' deleted", segment.name);
        Ok(())
    }
}
