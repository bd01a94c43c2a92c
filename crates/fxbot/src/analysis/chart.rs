//! PNG line charts of a rate series

use super::series::{RateSeries, Trend};
use crate::error::{BotError, Result};
use crate::models::CurrencyPair;
use plotters::prelude::*;
use std::path::Path;

/// Chart dimensions and title
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Exchange Rate".to_string(),
        }
    }
}

/// Render `series` as PNG bytes with `peaks` (indices into the series) circled
pub fn render_chart(
    pair: &CurrencyPair,
    series: &RateSeries,
    peaks: &[usize],
    options: &ChartOptions,
) -> Result<Vec<u8>> {
    if series.is_empty() {
        return Err(BotError::EmptyDataset);
    }

    let file = tempfile::Builder::new()
        .prefix("fxbot-chart-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| BotError::ChartError(format!("Failed to create chart file: {e}")))?;

    draw(file.path(), series, peaks, options)?;

    let bytes = std::fs::read(file.path())
        .map_err(|e| BotError::ChartError(format!("Failed to read chart file: {e}")))?;
    tracing::debug!(%pair, points = series.len(), size = bytes.len(), "Rendered chart");
    Ok(bytes)
}

/// Trend sentence followed by the current rate of `pair`
pub fn caption(pair: &CurrencyPair, series: &RateSeries) -> Result<String> {
    let trend = Trend::of(&series.rates())?;
    let (_, current) = series.latest().ok_or(BotError::EmptyDataset)?;
    Ok(format!(
        "{}\nCurrent rate of {pair} is 1 {} - {current:.4} {}",
        trend.caption(),
        pair.from,
        pair.to
    ))
}

/// Axis description spanning the first and last dates
fn x_description(series: &RateSeries) -> String {
    match (series.first(), series.latest()) {
        (Some((first, _)), Some((last, _))) => format!("{first}  -->  {last}"),
        _ => String::new(),
    }
}

/// Value range padded so the line never touches the frame
fn value_range(rates: &[f64]) -> (f64, f64) {
    let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
    let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let padding = if max > min { (max - min) * 0.1 } else { min.abs() * 0.01 + 0.01 };
    (min - padding, max + padding)
}

fn chart_err(step: &str, e: impl std::fmt::Display) -> BotError {
    BotError::ChartError(format!("Failed to {step}: {e}"))
}

fn draw(path: &Path, series: &RateSeries, peaks: &[usize], options: &ChartOptions) -> Result<()> {
    let rates = series.rates();
    let points: Vec<(f64, f64)> = rates
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, *r))
        .collect();
    let last_x = (rates.len().saturating_sub(1)) as f64;
    let (min_y, max_y) = value_range(&rates);

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| chart_err("fill background", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..last_x + 0.5, min_y..max_y)
        .map_err(|e| chart_err("build chart", e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .x_desc(x_description(series))
        .y_desc("Price ($)")
        .draw()
        .map_err(|e| chart_err("configure mesh", e))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(|e| chart_err("draw rate line", e))?;

    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))
        .map_err(|e| chart_err("draw markers", e))?;

    chart
        .draw_series(
            peaks
                .iter()
                .filter_map(|&i| points.get(i))
                .map(|&p| Circle::new(p, 8, GREEN.stroke_width(2))),
        )
        .map_err(|e| chart_err("draw peaks", e))?;

    if let Some(&(x, y)) = points.last() {
        chart
            .draw_series(std::iter::once(Circle::new((x, y), 6, RED.filled())))
            .map_err(|e| chart_err("draw latest point", e))?;

        // Label sits a couple of points to the left so it stays inside the plot
        let label_x = (x - 2.0).max(0.0);
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{y:.3}"),
                (label_x, y),
                ("sans-serif", 16).into_font().color(&RED),
            )))
            .map_err(|e| chart_err("draw latest label", e))?;
    }

    root.present()
        .map_err(|e| chart_err("present chart", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_series() -> RateSeries {
        [1.10, 1.15, 1.12, 1.18, 1.16, 1.20]
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Days::new(6 * i as u64);
                (date, r)
            })
            .collect()
    }

    #[test]
    fn test_caption() {
        let pair = CurrencyPair::new("SGD", "USD");
        let text = caption(&pair, &sample_series()).unwrap();
        assert_eq!(
            text,
            "Rates have a rising trend 💹\nCurrent rate of SGD-USD is 1 SGD - 1.2000 USD"
        );
        assert!(caption(&pair, &RateSeries::new()).is_err());
    }

    #[test]
    fn test_x_description() {
        assert_eq!(x_description(&sample_series()), "2024-01-01  -->  2024-01-31");
        assert_eq!(x_description(&RateSeries::new()), "");
    }

    #[test]
    fn test_value_range() {
        let (lo, hi) = value_range(&[1.0, 2.0]);
        assert!(lo < 1.0 && hi > 2.0);

        let (lo, hi) = value_range(&[5.0]);
        assert!(lo < 5.0 && hi > 5.0);
    }

    #[test]
    fn test_empty_series_rejected() {
        let result = render_chart(
            &CurrencyPair::new("SGD", "USD"),
            &RateSeries::new(),
            &[],
            &ChartOptions::default(),
        );
        assert!(matches!(result, Err(BotError::EmptyDataset)));
    }

    #[test]
    #[ignore] // Requires system fonts for text rendering
    fn test_render_png() {
        let series = sample_series();
        let peaks = crate::analysis::find_peaks(&series.rates(), 5).unwrap();
        let bytes = render_chart(
            &CurrencyPair::new("SGD", "USD"),
            &series,
            &peaks,
            &ChartOptions::default(),
        )
        .unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
