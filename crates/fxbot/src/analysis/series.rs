//! Dated rate series and trend classification

use crate::error::{BotError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// Rates keyed by calendar day, ascending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl RateSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `rate` for `date`, replacing any earlier value for that day
    pub fn insert(&mut self, date: NaiveDate, rate: f64) {
        self.points.insert(date, rate);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.keys().copied().collect()
    }

    pub fn rates(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.points.first_key_value().map(|(d, r)| (*d, *r))
    }

    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points.last_key_value().map(|(d, r)| (*d, *r))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, r)| (*d, *r))
    }

    pub fn trend(&self) -> Result<Trend> {
        Trend::of(&self.rates())
    }
}

impl FromIterator<(NaiveDate, f64)> for RateSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Direction of a series from its first to its last point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Flat,
    Falling,
}

impl Trend {
    /// Compare the first and last rates
    pub fn of(rates: &[f64]) -> Result<Self> {
        let (Some(first), Some(last)) = (rates.first(), rates.last()) else {
            return Err(BotError::EmptyDataset);
        };

        Ok(if first < last {
            Self::Rising
        } else if first == last {
            Self::Flat
        } else {
            Self::Falling
        })
    }

    pub fn caption(self) -> &'static str {
        match self {
            Self::Rising => "Rates have a rising trend 💹",
            Self::Flat => "Rates have a flat trend.",
            Self::Falling => "Rates have a falling trend. 📉",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caption())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_trend_of() {
        assert_eq!(Trend::of(&[1.0, 2.0, 3.0]).unwrap(), Trend::Rising);
        assert_eq!(Trend::of(&[3.0, 2.0, 1.0]).unwrap(), Trend::Falling);
        assert_eq!(Trend::of(&[5.0, 1.0, 5.0]).unwrap(), Trend::Flat);
        assert_eq!(Trend::of(&[4.2]).unwrap(), Trend::Flat);
        assert!(matches!(Trend::of(&[]), Err(BotError::EmptyDataset)));
    }

    #[test]
    fn test_trend_caption() {
        assert_eq!(Trend::Rising.caption(), "Rates have a rising trend 💹");
        assert_eq!(Trend::Flat.to_string(), "Rates have a flat trend.");
        assert_eq!(Trend::Falling.caption(), "Rates have a falling trend. 📉");
    }

    #[test]
    fn test_series_is_ordered_by_date() {
        let series: RateSeries = [(day(3), 1.3), (day(1), 1.1), (day(2), 1.2)]
            .into_iter()
            .collect();

        assert_eq!(series.dates(), vec![day(1), day(2), day(3)]);
        assert_eq!(series.rates(), vec![1.1, 1.2, 1.3]);
        assert_eq!(series.first(), Some((day(1), 1.1)));
        assert_eq!(series.latest(), Some((day(3), 1.3)));
        assert_eq!(series.trend().unwrap(), Trend::Rising);
    }

    #[test]
    fn test_insert_replaces_same_day() {
        let mut series = RateSeries::new();
        assert!(series.is_empty());
        series.insert(day(1), 1.0);
        series.insert(day(1), 2.0);
        assert_eq!(series.len(), 1);
        assert_eq!(series.latest(), Some((day(1), 2.0)));
        assert!(RateSeries::new().trend().is_err());
    }
}
