//! The `gradebook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradebook.toml").exists() {
        println!("gradebook.toml already exists, skipping.");
    } else {
        std::fs::write("gradebook.toml", SAMPLE_CONFIG)?;
        println!("Created gradebook.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set GRADEBOOK_API_TOKEN or edit gradebook.toml with your API token");
    println!("  2. Run: gradebook policy");
    println!("  3. Run: gradebook roster --classroom <id> --subject <name>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradebook configuration

[api]
base_url = "http://localhost:8000/api"
token = "${GRADEBOOK_API_TOKEN}"
timeout_secs = 30
page_size = 100
"#;
