//! Initialize command.

use console::style;

use crate::config::Settings;

/// Create the data directories and the database schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    println!(
        "  {} Database: {}",
        style("✓").green(),
        settings.database_path().display()
    );
    println!(
        "  {} Uploads: {}",
        style("✓").green(),
        settings.uploads_dir.display()
    );
    println!(
        "{} Initialized LigaBairro in {}",
        style("✓").green(),
        settings.data_dir.display()
    );

    Ok(())
}
