use kasa_core::{Config, Paths};

pub fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    paths.ensure_base()?;
    Config::default().save(&config_path)?;

    println!("Wrote {}", config_path.display());
    println!("Next steps:");
    println!("  - set providers.gemini.apiKey (or export GEMINI_API_KEY)");
    println!("  - set tools.search.apiKey and tools.search.cx for weather search");
    println!("    (or export GOOGLE_SEARCH_API_KEY / GOOGLE_SEARCH_CX)");

    Ok(())
}
