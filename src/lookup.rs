//! Registry inspection for the `lookup` subcommand.

use crate::registry::{Registry, RunRecord};
use anyhow::Result;
use clap::ValueEnum;

/// Closed set of projectable columns. Unknown names die at argument-parse
/// time, not at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Field {
    Name,
    Commit,
    Config,
    Script,
    Image,
    Container,
    Volume,
    Description,
    Created,
}

impl Field {
    fn project(self, rec: &RunRecord) -> String {
        match self {
            Field::Name => rec.name.clone(),
            Field::Commit => rec.commit_hash.clone(),
            Field::Config => rec.config.clone().unwrap_or_default(),
            Field::Script => rec.config_script.clone().unwrap_or_default(),
            Field::Image => rec.image_id.clone(),
            Field::Container => rec.container_id.clone(),
            Field::Volume => rec.volume.clone(),
            Field::Description => rec.description.clone(),
            Field::Created => rec.created_at.to_rfc3339(),
        }
    }
}

/// Query and print matching rows: one field per line, a JSON array, or a
/// human table.
pub fn lookup(
    registry: &Registry,
    pattern: Option<&str>,
    field: Option<Field>,
    json: bool,
) -> Result<()> {
    let pattern = pattern.unwrap_or("%");
    let rows = registry.find_by_name_pattern(pattern)?;

    if rows.is_empty() {
        println!("No runs match pattern {}", pattern);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    match field {
        Some(field) => {
            for rec in &rows {
                println!("{}", field.project(rec));
            }
        }
        None => {
            println!(
                "{:<20} | {:<14} | {:<14} | {:<20} | Description",
                "Name", "Container", "Volume", "Created"
            );
            println!(
                "{:-<20}-|-{:-<14}-|-{:-<14}-|-{:-<20}-|-{:-<30}",
                "", "", "", "", ""
            );
            for rec in &rows {
                let short_id: String = rec.container_id.chars().take(12).collect();
                println!(
                    "{:<20} | {:<14} | {:<14} | {:<20} | {}",
                    rec.name,
                    short_id,
                    rec.volume,
                    rec.created_at.format("%Y-%m-%d %H:%M:%S"),
                    rec.description
                );
            }
        }
    }

    Ok(())
}
