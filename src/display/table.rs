/// Fixed-width terminal tables for the futures dashboards
use std::collections::HashMap;

use chrono::Utc;
use chrono_tz::Asia::Kolkata;

use crate::types::{CategorizedContract, CategorizedContracts, ExpiryBucket, LiveQuote};

const RULE_WIDTH: usize = 140;
const MAX_ROWS_PER_BUCKET: usize = 50;
const SYMBOL_WIDTH: usize = 20;

pub fn clear_screen() {
    print!("\x1b[2J\x1b[1;1H");
}

/// One-shot dashboard: every bucket as a table, live fields zero when no
/// quote is available for a contract.
pub fn render_dashboard(contracts: &CategorizedContracts, live: &HashMap<u64, LiveQuote>) {
    let now = Utc::now().with_timezone(&Kolkata);

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("KITE NEAR FUTURE - {}", now.format("%d-%m-%Y %H:%M:%S"));
    println!("{}", "=".repeat(RULE_WIDTH));

    render_buckets(contracts, live);

    println!();
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Live contracts tracked: {}", live.len());
    println!("{}", "=".repeat(RULE_WIDTH));
}

/// Continuous dashboard frame with refresh counter.
pub fn render_live_dashboard(
    contracts: &CategorizedContracts,
    live: &HashMap<u64, LiveQuote>,
    refresh_count: u64,
    refresh_interval_secs: u64,
) {
    let now = Utc::now().with_timezone(&Kolkata);

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("KITE NEAR FUTURE - LIVE MODE - {}", now.format("%d-%m-%Y %H:%M:%S"));
    println!(
        "Refresh #{} | auto-refresh every {}s | Ctrl+C to stop",
        refresh_count, refresh_interval_secs
    );
    println!("{}", "=".repeat(RULE_WIDTH));

    render_buckets(contracts, live);

    println!();
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Live contracts tracked: {}", live.len());
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn render_buckets(contracts: &CategorizedContracts, live: &HashMap<u64, LiveQuote>) {
    for bucket in ExpiryBucket::ALL {
        let rows = contracts.bucket(bucket);
        if rows.is_empty() {
            continue;
        }

        println!();
        println!(
            "{} CATEGORY ({} contracts)",
            bucket.as_str().to_uppercase(),
            rows.len()
        );
        println!("{}", "-".repeat(RULE_WIDTH));
        println!(
            "{:<22} {:<10} {:<10} {:<10} {:<10} {:<10} {:<12} {:<8} {:<12} {:<6}",
            "Symbol", "LTP", "Change", "Change%", "Bid", "Ask", "Volume", "Lot", "Expiry", "Days"
        );
        println!("{}", "-".repeat(RULE_WIDTH));

        for contract in rows.iter().take(MAX_ROWS_PER_BUCKET) {
            println!("{}", format_row(contract, live.get(&contract.instrument_token)));
        }
        if rows.len() > MAX_ROWS_PER_BUCKET {
            println!("... and {} more contracts", rows.len() - MAX_ROWS_PER_BUCKET);
        }
    }
}

fn format_row(contract: &CategorizedContract, quote: Option<&LiveQuote>) -> String {
    let ltp = quote.map(|q| q.ltp).unwrap_or(0.0);
    let change = quote.map(|q| q.change).unwrap_or(0.0);
    let change_pct = quote.map(|q| q.change_percent).unwrap_or(0.0);
    let bid = quote.map(|q| q.bid).unwrap_or(0.0);
    let ask = quote.map(|q| q.ask).unwrap_or(0.0);
    let volume = quote.map(|q| q.volume).unwrap_or(0);

    format!(
        "{:<22} {:<10.2} {:<10} {:<10} {:<10.2} {:<10.2} {:<12} {:<8} {:<12} {:<6}",
        truncate(&contract.symbol, SYMBOL_WIDTH),
        ltp,
        signed(change),
        format!("{}%", signed(change_pct)),
        bid,
        ask,
        volume,
        contract.lot_size,
        contract.expiry_formatted,
        contract.days_to_expiry,
    )
}

fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}

// Truncates to `max` characters, never splitting a codepoint.
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_formatting() {
        assert_eq!(signed(10.0), "+10.00");
        assert_eq!(signed(-2.5), "-2.50");
        assert_eq!(signed(0.0), "0.00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("RELIANCE25SEPFUT", 20), "RELIANCE25SEPFUT");
        assert_eq!(truncate("AVERYLONGSYMBOLNAME25SEPFUT", 20), "AVERYLONGSYMBOLNAME2");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("₹₹₹₹₹", 3), "₹₹₹");
        assert_eq!(truncate("₹₹", 4), "₹₹");
    }

    #[test]
    fn test_format_row_without_quote() {
        let contract = CategorizedContract {
            symbol: "RELIANCE25SEPFUT".to_string(),
            name: "RELIANCE".to_string(),
            instrument_token: 1,
            expiry: "2026-09-24".to_string(),
            expiry_formatted: "24/09/2026".to_string(),
            days_to_expiry: 23,
            lot_size: 500,
            tick_size: 0.05,
            category: ExpiryBucket::Current,
            exchange: "NFO".to_string(),
        };

        let row = format_row(&contract, None);
        assert!(row.starts_with("RELIANCE25SEPFUT"));
        assert!(row.contains("24/09/2026"));
        assert!(row.contains("0.00"));
    }
}
