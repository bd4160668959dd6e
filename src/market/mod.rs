pub mod categorizer;
pub mod reconciler;

pub use categorizer::{bucket_for_days, categorize_futures};
pub use reconciler::{
    fetch_full_quotes, fetch_live_quotes, fetch_ltp_quotes, QuoteSource, QUOTE_BATCH_SIZE,
};
