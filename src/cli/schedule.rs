use super::ui;
use crate::scheduler::RateScheduler;
use anyhow::{Context, Result};

/// Starts the scheduler and keeps it running until Ctrl-C.
pub async fn run_until_interrupted(scheduler: &RateScheduler) -> Result<()> {
    if !scheduler.start().await {
        anyhow::bail!("Scheduler is already running");
    }
    println!(
        "{} every {} minute(s). Press Ctrl-C to stop.",
        ui::style_text("Updating rates", ui::StyleType::Label),
        scheduler.interval().as_secs() / 60
    );

    let interrupted = tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C");

    println!("{}", ui::style_text("Stopping scheduler...", ui::StyleType::Subtle));
    scheduler.stop().await;
    interrupted
}
