pub mod kite;
pub mod session;

pub use kite::{FullQuote, KiteClient, LtpQuote, OrderParams, Profile};
pub use session::{exchange_request_token, login_url, save_access_token, Session};
