use console::style;

use crate::config::Settings;
use crate::services::ServiceContext;

pub async fn cmd_sessions_purge(settings: &Settings) -> anyhow::Result<()> {
    let ctx = ServiceContext::new(settings.clone());
    ctx.db.init_schema().await?;
    let purged = ctx.auth().purge_expired().await?;
    println!("{} Purged {} expired sessions", style("✓").green(), purged);
    Ok(())
}
