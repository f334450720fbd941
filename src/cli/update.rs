use super::ui;
use crate::core::UpdateResult;
use crate::updater::RatesUpdater;
use anyhow::{Result, bail};

/// Runs one manual update and reports the outcome.
pub async fn update_rates(updater: &RatesUpdater, source: Option<&str>) -> Result<()> {
    let label = source.map_or_else(
        || "Fetching rates from all sources...".to_string(),
        |s| format!("Fetching rates from {s}..."),
    );
    let spinner = ui::new_spinner(&label);
    let outcome = updater.run_update(source).await;
    spinner.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{}", ui::style_text("Rates update failed:", ui::StyleType::Error));
            for error in e.source_errors() {
                eprintln!("  - {error}");
            }
            return Err(e.into());
        }
    };
    println!("{}", render_update_result(&result));

    if !result.success {
        bail!("Rates update failed: {}", result.errors.join("; "));
    }
    Ok(())
}

pub fn render_update_result(result: &UpdateResult) -> String {
    let mut output = String::new();

    if result.success {
        output.push_str(&ui::style_text("Rates updated", ui::StyleType::Success));
        output.push_str(&format!(
            "\n  Fetched: {}\n  Stored pairs: {}\n  Last refresh: {}",
            result.rates_count,
            result.pairs_stored,
            result.last_refresh.as_deref().unwrap_or("unknown"),
        ));
        if !result.errors.is_empty() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text("Some sources failed:", ui::StyleType::Warning)
            ));
        }
    } else {
        output.push_str(&ui::style_text("Rates update failed:", ui::StyleType::Error));
    }

    for error in &result.errors {
        output.push_str(&format!("\n  - {error}"));
    }
    output
}
