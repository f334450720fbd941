use super::ui;
use crate::core::currency::{CurrencyRegistry, normalize_code};
use crate::core::rates::split_pair;
use crate::core::{PairRate, RateError, RateTable, check_freshness};
use crate::lookup::{RateLookup, RateQuote};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;

const REFRESH_HINT: &str = "Run `ratehub update-rates` to refresh the cache.";

/// Prints the stored rate table, optionally filtered to one currency or the top crypto rates.
pub fn show_rates(lookup: &RateLookup, currency: Option<&str>, top: Option<usize>) -> Result<()> {
    let table = lookup.current_table();
    if table.pairs.is_empty() {
        println!("No rates stored yet. {REFRESH_HINT}");
        return Ok(());
    }

    let filter = currency.map(normalize_code).transpose()?;
    if let Some(info) = filter
        .as_deref()
        .and_then(|code| lookup.registry().get(code).ok())
        .map(|c| c.display_info())
    {
        println!("{}\n", ui::style_text(&info, ui::StyleType::Title));
    }

    let rows = select_pairs(
        &table,
        filter.as_deref(),
        top,
        lookup.registry(),
        lookup.base_currency(),
    );
    if rows.is_empty() {
        println!("No stored pairs match.");
    } else {
        println!("{}", render_rates_table(&rows));
    }
    println!(
        "\n{}",
        render_refresh_status(&table, lookup.ttl_seconds(), Utc::now())
    );
    Ok(())
}

/// Prints one freshness-checked rate and its inverse.
pub fn get_rate(lookup: &RateLookup, from: &str, to: &str) -> Result<()> {
    match lookup.get_rate(from, to) {
        Ok(quote) => {
            println!("{}", render_quote(&quote));
            Ok(())
        }
        Err(e @ RateError::Stale { .. }) => {
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            eprintln!("{REFRESH_HINT}");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Pairs to display, in key order unless `top` asks for the highest crypto rates against `base`.
pub fn select_pairs<'a>(
    table: &'a RateTable,
    filter: Option<&str>,
    top: Option<usize>,
    registry: &CurrencyRegistry,
    base: &str,
) -> Vec<(&'a str, &'a PairRate)> {
    let mut rows: Vec<(&str, &PairRate)> = table
        .pairs
        .iter()
        .map(|(pair, rate)| (pair.as_str(), rate))
        .filter(|(pair, _)| match filter {
            Some(code) => split_pair(pair).is_some_and(|(from, to)| from == code || to == code),
            None => true,
        })
        .collect();

    if let Some(n) = top {
        rows.retain(|(pair, _)| {
            split_pair(pair).is_some_and(|(from, to)| {
                to == base && registry.get(from).is_ok_and(|c| c.is_crypto())
            })
        });
        rows.sort_by(|a, b| b.1.rate.total_cmp(&a.1.rate));
        rows.truncate(n);
    }
    rows
}

pub fn render_rates_table(rows: &[(&str, &PairRate)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Updated"),
        ui::header_cell("Source"),
    ]);

    for (pair, rate) in rows {
        table.add_row(vec![
            Cell::new(pair.replace('_', "/")),
            ui::rate_cell(rate.rate),
            Cell::new(&rate.updated_at),
            ui::source_cell(&rate.source),
        ]);
    }
    table.to_string()
}

pub fn render_refresh_status(table: &RateTable, ttl_seconds: u64, now: DateTime<Utc>) -> String {
    let Some(last_refresh) = table.last_refresh.as_deref() else {
        return ui::style_text("Last refresh: never", ui::StyleType::Warning);
    };

    match check_freshness(Some(last_refresh), ttl_seconds, now) {
        Ok(()) => format!(
            "{} {} {}",
            ui::style_text("Last refresh:", ui::StyleType::Label),
            last_refresh,
            ui::style_text(&format!("(fresh, TTL {ttl_seconds}s)"), ui::StyleType::Subtle)
        ),
        Err(e) => format!(
            "{}\n{}",
            ui::style_text(&e.to_string(), ui::StyleType::Warning),
            REFRESH_HINT
        ),
    }
}

pub fn render_quote(quote: &RateQuote) -> String {
    format!(
        "1 {from} = {rate} {to}\n1 {to} = {inverse} {from}\n{} {}\n{} {}",
        ui::style_text("Updated:", ui::StyleType::Label),
        quote.updated_at,
        ui::style_text("Source:", ui::StyleType::Label),
        quote.source,
        from = quote.from,
        to = quote.to,
        rate = ui::format_rate(quote.rate),
        inverse = ui::format_rate(quote.inverse_rate),
    )
}
