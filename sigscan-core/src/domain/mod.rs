//! Domain types for SigScan

pub mod bar;
pub mod window;

pub use bar::{Bar, Symbol};
pub use window::{Dataset, SeriesWindow};
