//! User moderation commands.

use console::style;

use crate::config::Settings;
use crate::models::{AccountView, Role};
use crate::services::ServiceContext;

async fn context(settings: &Settings) -> anyhow::Result<ServiceContext> {
    let ctx = ServiceContext::new(settings.clone());
    ctx.db.init_schema().await?;
    Ok(ctx)
}

fn report(action: &str, account: &AccountView) {
    println!(
        "{} {} {} ({})",
        style("✓").green(),
        action,
        style(&account.public.name).bold(),
        account.email
    );
}

pub async fn cmd_promote(settings: &Settings, email: &str) -> anyhow::Result<()> {
    let ctx = context(settings).await?;
    let account = ctx.admin().set_role_by_email(email, Role::Admin).await?;
    report("Promoted", &account);
    Ok(())
}

pub async fn cmd_demote(settings: &Settings, email: &str) -> anyhow::Result<()> {
    let ctx = context(settings).await?;
    let account = ctx.admin().set_role_by_email(email, Role::User).await?;
    report("Demoted", &account);
    Ok(())
}

pub async fn cmd_ban(settings: &Settings, email: &str, banned: bool) -> anyhow::Result<()> {
    let ctx = context(settings).await?;
    let account = ctx.admin().set_banned_by_email(email, banned).await?;
    report(if banned { "Banned" } else { "Unbanned" }, &account);
    Ok(())
}
