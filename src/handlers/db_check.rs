//! `codebox db-check`: read one table as a connectivity smoke test.

use anyhow::{bail, Result};

use crate::{config::Config, external::supabase::DbClient};

pub async fn run(cfg: &Config, table: Option<String>) -> Result<()> {
    let table = table
        .or_else(|| cfg.get("SUPABASE_TABLE"))
        .unwrap_or_else(|| "sites".into());

    match check(cfg, &table).await {
        Ok(rows) => {
            println!("Supabase connection successful!");
            println!("{} table query result:", capitalize(&table));
            println!("{}", serde_json::to_string_pretty(&rows).unwrap_or_else(|_| rows.to_string()));
            Ok(())
        }
        Err(e) => {
            println!("Error connecting to Supabase: {:#}", e);
            println!("\nTo fix this:");
            println!("1. Create a .env file in the project root");
            println!("2. Add your Supabase URL and service role key:");
            println!("   SUPABASE_URL=https://your-project-id.supabase.co");
            println!("   SUPABASE_SERVICE_ROLE_KEY=your_service_role_key_here");
            bail!("database check failed")
        }
    }
}

async fn check(cfg: &Config, table: &str) -> Result<serde_json::Value> {
    let client = DbClient::from_config(cfg)?;
    client.select_all(table).await
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_heading_is_capitalized() {
        assert_eq!(capitalize("sites"), "Sites");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn missing_config_fails_without_network() {
        let err = check(&Config::with_defaults(), "sites").await.unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }
}
