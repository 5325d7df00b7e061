//! Platform statistics command.

use console::style;

use crate::config::Settings;
use crate::services::ServiceContext;

pub async fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let ctx = ServiceContext::new(settings.clone());
    ctx.db.init_schema().await?;
    let stats = ctx.admin().stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{}", style("LigaBairro Statistics").bold());
    println!("{}", "-".repeat(40));
    println!(
        "{:<22} {} ({} admins, {} banned, {} this week)",
        "Users:", stats.users.total, stats.users.admins, stats.users.banned, stats.users.new_since
    );
    println!("{:<22} {}", "Requests:", stats.requests.total);
    for (status, count) in &stats.requests.by_status {
        println!("  {:<20} {}", status, count);
    }
    println!("{:<22} {}", "Applications:", stats.applications);
    println!("{:<22} {}", "Messages:", stats.messages);
    let average = stats
        .reviews
        .average_rating
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<22} {} (average {})",
        "Reviews:", stats.reviews.total, average
    );

    let open_reports = if stats.open_reports > 0 {
        style(stats.open_reports.to_string()).yellow().to_string()
    } else {
        stats.open_reports.to_string()
    };
    println!("{:<22} {}", "Open reports:", open_reports);

    Ok(())
}
