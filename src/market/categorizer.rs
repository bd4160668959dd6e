/// Expiry-bucket categorization of the futures universe
use chrono::NaiveDate;
use tracing::debug;

use crate::types::{
    CategorizeOutcome, CategorizedContract, CategorizedContracts, ExpiryBucket, Instrument,
    SkipCounts,
};

pub const CURRENT_MAX_DAYS: i64 = 30;
pub const NEAR_MAX_DAYS: i64 = 60;
pub const FAR_MAX_DAYS: i64 = 90;

/// Kite instrument master expiry format.
const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Bucket for a whole-day distance to expiry. Expired contracts and
/// contracts more than 90 days out fall outside every bucket.
pub fn bucket_for_days(days: i64) -> Option<ExpiryBucket> {
    match days {
        d if d < 0 => None,
        d if d <= CURRENT_MAX_DAYS => Some(ExpiryBucket::Current),
        d if d <= NEAR_MAX_DAYS => Some(ExpiryBucket::Near),
        d if d <= FAR_MAX_DAYS => Some(ExpiryBucket::Far),
        _ => None,
    }
}

/// Partition the instrument universe into expiry buckets.
///
/// Pure over `(instruments, reference)`: re-running on the same input and
/// reference date yields identical buckets. Instruments that are not
/// futures, lack a usable expiry or token, or fall outside the 90-day
/// window are dropped and counted by reason.
pub fn categorize_futures(instruments: &[Instrument], reference: NaiveDate) -> CategorizeOutcome {
    let mut contracts = CategorizedContracts::default();
    let mut skipped = SkipCounts::default();

    for inst in instruments {
        if inst.instrument_type != "FUT" {
            skipped.not_future += 1;
            continue;
        }

        let expiry = inst.expiry.trim();
        if expiry.is_empty() || expiry == "0" || expiry.eq_ignore_ascii_case("none") {
            skipped.missing_expiry += 1;
            continue;
        }

        if inst.instrument_token == 0 {
            skipped.missing_token += 1;
            continue;
        }

        let Ok(expiry_date) = NaiveDate::parse_from_str(expiry, EXPIRY_FORMAT) else {
            skipped.unparsable_expiry += 1;
            continue;
        };

        let days = (expiry_date - reference).num_days();
        let Some(category) = bucket_for_days(days) else {
            if days < 0 {
                skipped.expired += 1;
            } else {
                skipped.beyond_window += 1;
            }
            continue;
        };

        contracts.bucket_mut(category).push(CategorizedContract {
            symbol: inst.tradingsymbol.to_uppercase(),
            name: inst.name.to_uppercase(),
            instrument_token: inst.instrument_token,
            expiry: expiry.to_string(),
            expiry_formatted: expiry_date.format("%d/%m/%Y").to_string(),
            days_to_expiry: days,
            lot_size: inst.lot_size,
            tick_size: inst.tick_size,
            category,
            exchange: inst.exchange.clone(),
        });
    }

    for bucket in ExpiryBucket::ALL {
        contracts.bucket_mut(bucket).sort_by(|a, b| a.symbol.cmp(&b.symbol));
    }

    debug!(
        "Categorized {} contracts (current {}, near {}, far {}), skipped {}",
        contracts.total(),
        contracts.current.len(),
        contracts.near.len(),
        contracts.far.len(),
        skipped.total()
    );

    CategorizeOutcome { contracts, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn future(symbol: &str, token: u64, expiry: &str) -> Instrument {
        Instrument {
            instrument_token: token,
            tradingsymbol: symbol.to_string(),
            name: symbol.to_string(),
            expiry: expiry.to_string(),
            strike: 0.0,
            lot_size: 500,
            tick_size: 0.05,
            instrument_type: "FUT".to_string(),
            segment: "NFO-FUT".to_string(),
            exchange: "NFO".to_string(),
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket_for_days(0), Some(ExpiryBucket::Current));
        assert_eq!(bucket_for_days(30), Some(ExpiryBucket::Current));
        assert_eq!(bucket_for_days(31), Some(ExpiryBucket::Near));
        assert_eq!(bucket_for_days(60), Some(ExpiryBucket::Near));
        assert_eq!(bucket_for_days(61), Some(ExpiryBucket::Far));
        assert_eq!(bucket_for_days(90), Some(ExpiryBucket::Far));
        assert_eq!(bucket_for_days(91), None);
        assert_eq!(bucket_for_days(-1), None);
    }

    #[test]
    fn test_boundary_days_land_in_expected_buckets() {
        // Reference 2026-09-01: +30d = 10-01, +31d = 10-02, +60d = 10-31,
        // +61d = 11-01, +90d = 11-30, +91d = 12-01.
        let instruments = vec![
            future("DAY30", 1, "2026-10-01"),
            future("DAY31", 2, "2026-10-02"),
            future("DAY60", 3, "2026-10-31"),
            future("DAY61", 4, "2026-11-01"),
            future("DAY90", 5, "2026-11-30"),
            future("DAY91", 6, "2026-12-01"),
        ];

        let outcome = categorize_futures(&instruments, reference());
        let symbols = |bucket: ExpiryBucket| -> Vec<String> {
            outcome.contracts.bucket(bucket).iter().map(|c| c.symbol.clone()).collect()
        };

        assert_eq!(symbols(ExpiryBucket::Current), vec!["DAY30"]);
        assert_eq!(symbols(ExpiryBucket::Near), vec!["DAY31", "DAY60"]);
        assert_eq!(symbols(ExpiryBucket::Far), vec!["DAY61", "DAY90"]);
        assert_eq!(outcome.skipped.beyond_window, 1);
    }

    #[test]
    fn test_expired_contracts_are_omitted() {
        let instruments = vec![future("GONE", 1, "2026-08-31")];
        let outcome = categorize_futures(&instruments, reference());

        assert!(outcome.contracts.is_empty());
        assert_eq!(outcome.skipped.expired, 1);
    }

    #[test]
    fn test_non_futures_never_bucketed() {
        let mut option = future("TCS25SEP3600CE", 7, "2026-09-24");
        option.instrument_type = "CE".to_string();
        let mut equity = future("RELIANCE", 8, "");
        equity.instrument_type = "EQ".to_string();

        let outcome = categorize_futures(&[option, equity], reference());
        assert!(outcome.contracts.is_empty());
        assert_eq!(outcome.skipped.not_future, 2);
    }

    #[test]
    fn test_unusable_expiry_skipped_by_reason() {
        let instruments = vec![
            future("EMPTY", 1, ""),
            future("ZERO", 2, "0"),
            future("NONE", 3, "None"),
            future("GARBAGE", 4, "24SEP2026"),
        ];

        let outcome = categorize_futures(&instruments, reference());
        assert!(outcome.contracts.is_empty());
        assert_eq!(outcome.skipped.missing_expiry, 3);
        assert_eq!(outcome.skipped.unparsable_expiry, 1);
        assert_eq!(outcome.skipped.total(), 4);
    }

    #[test]
    fn test_missing_token_skipped() {
        let outcome = categorize_futures(&[future("NOTOKEN", 0, "2026-09-24")], reference());
        assert!(outcome.contracts.is_empty());
        assert_eq!(outcome.skipped.missing_token, 1);
    }

    #[test]
    fn test_buckets_sorted_by_symbol() {
        let instruments = vec![
            future("ZEE25SEPFUT", 1, "2026-09-24"),
            future("ACC25SEPFUT", 2, "2026-09-24"),
            future("MARUTI25SEPFUT", 3, "2026-09-24"),
        ];

        let outcome = categorize_futures(&instruments, reference());
        let symbols: Vec<_> = outcome.contracts.current.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ACC25SEPFUT", "MARUTI25SEPFUT", "ZEE25SEPFUT"]);
    }

    #[test]
    fn test_idempotent_over_same_input() {
        let instruments = vec![
            future("RELIANCE25SEPFUT", 1, "2026-09-24"),
            future("TCS25OCTFUT", 2, "2026-10-29"),
            future("INFY25NOVFUT", 3, "2026-11-26"),
        ];

        let first = categorize_futures(&instruments, reference());
        let second = categorize_futures(&instruments, reference());
        assert_eq!(first, second);
    }

    #[test]
    fn test_contract_carries_derived_fields() {
        let outcome = categorize_futures(&[future("reliance25sepfut", 9, "2026-09-24")], reference());
        let contract = &outcome.contracts.current[0];

        assert_eq!(contract.symbol, "RELIANCE25SEPFUT");
        assert_eq!(contract.days_to_expiry, 23);
        assert_eq!(contract.expiry_formatted, "24/09/2026");
        assert_eq!(contract.lot_size, 500);
        assert_eq!(contract.category, ExpiryBucket::Current);
        assert_eq!(contract.exchange, "NFO");
    }
}
