pub mod table;

pub use table::{clear_screen, render_dashboard, render_live_dashboard};
