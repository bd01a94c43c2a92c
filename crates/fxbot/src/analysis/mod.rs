//! Rate-series analysis: peaks, trend and charts

pub mod chart;
pub mod peaks;
pub mod series;

pub use chart::{ChartOptions, caption, render_chart};
pub use peaks::find_peaks;
pub use series::{RateSeries, Trend};
