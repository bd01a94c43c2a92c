//! Pure GST/service-charge arithmetic

use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which charges appear on the receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptType {
    GstOnly,
    ServiceChargeOnly,
    GstAndServiceCharge,
}

impl ReceiptType {
    pub const ALL: [ReceiptType; 3] = [
        ReceiptType::GstOnly,
        ReceiptType::ServiceChargeOnly,
        ReceiptType::GstAndServiceCharge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReceiptType::GstOnly => "GST Only",
            ReceiptType::ServiceChargeOnly => "Service Charge Only",
            ReceiptType::GstAndServiceCharge => "GST and Service Charge",
        }
    }

    /// Whether the conversation needs a service-charge rate
    pub fn has_service_charge(self) -> bool {
        !matches!(self, ReceiptType::GstOnly)
    }
}

impl FromStr for ReceiptType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| BotError::InvalidCommand(format!("Unknown receipt type: {s}")))
    }
}

impl fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Forwards computes the charge from a base cost, Reverse recovers the base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forwards,
    Reverse,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Forwards, Direction::Reverse];

    pub fn label(self) -> &'static str {
        match self {
            Direction::Forwards => "Forwards",
            Direction::Reverse => "Reverse",
        }
    }
}

impl FromStr for Direction {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| BotError::InvalidCommand(format!("Unknown direction: {s}")))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed calculation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calculator {
    pub receipt_type: ReceiptType,
    pub direction: Direction,
    /// GST rate as a fraction
    pub gst_rate: f64,
    /// Service-charge rate as a fraction
    pub svc_charge_rate: f64,
}

impl Calculator {
    pub fn new(
        receipt_type: ReceiptType,
        direction: Direction,
        gst_rate: f64,
        svc_charge_rate: f64,
    ) -> Self {
        Self {
            receipt_type,
            direction,
            gst_rate,
            svc_charge_rate,
        }
    }

    /// Rate applied to the cost for this receipt type
    ///
    /// The combined receipt multiplies both rates together.
    pub fn factor(&self) -> f64 {
        match self.receipt_type {
            ReceiptType::GstOnly => self.gst_rate,
            ReceiptType::ServiceChargeOnly => self.svc_charge_rate,
            ReceiptType::GstAndServiceCharge => self.gst_rate * self.svc_charge_rate,
        }
    }

    pub fn calculate(&self, cost: f64) -> f64 {
        match self.direction {
            Direction::Forwards => cost * self.factor(),
            Direction::Reverse => cost / self.factor(),
        }
    }
}

/// Parse a non-negative cost
pub fn parse_cost(input: &str) -> Result<f64> {
    match input.trim().trim_start_matches('$').parse::<f64>() {
        Ok(cost) if cost.is_finite() && cost >= 0.0 => Ok(cost),
        _ => Err(BotError::InvalidNumericInput(
            "Please enter a valid cost, e.g. 25.50 (must not be negative).".to_string(),
        )),
    }
}

/// Parse a service-charge percentage in (0, 100] into a fraction
pub fn parse_service_charge(input: &str, default_rate: f64) -> Result<f64> {
    let input = input.trim().trim_end_matches('%').trim();
    if input.eq_ignore_ascii_case("default") {
        return Ok(default_rate);
    }

    match input.parse::<f64>() {
        Ok(percent) if percent > 0.0 && percent <= 100.0 => Ok(percent / 100.0),
        _ => Err(BotError::InvalidNumericInput(
            "Please enter a service charge between 0 and 100 percent, or \"default\".".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_gst_only() {
        let forwards = Calculator::new(ReceiptType::GstOnly, Direction::Forwards, 0.09, 0.1);
        assert!(approx(forwards.calculate(100.0), 9.0));

        let reverse = Calculator::new(ReceiptType::GstOnly, Direction::Reverse, 0.09, 0.1);
        assert!(approx(reverse.calculate(9.0), 100.0));
    }

    #[test]
    fn test_service_charge_only() {
        let calc = Calculator::new(ReceiptType::ServiceChargeOnly, Direction::Forwards, 0.09, 0.1);
        assert!(approx(calc.calculate(50.0), 5.0));

        let calc = Calculator { direction: Direction::Reverse, ..calc };
        assert!(approx(calc.calculate(5.0), 50.0));
    }

    #[test]
    fn test_combined_uses_product_of_rates() {
        let calc = Calculator::new(
            ReceiptType::GstAndServiceCharge,
            Direction::Forwards,
            0.09,
            0.1,
        );
        assert!(approx(calc.factor(), 0.009));
        assert!(approx(calc.calculate(1000.0), 9.0));

        let calc = Calculator { direction: Direction::Reverse, ..calc };
        assert!(approx(calc.calculate(9.0), 1000.0));
    }

    #[test]
    fn test_labels_round_trip_case_insensitive() {
        assert_eq!("gst only".parse::<ReceiptType>().unwrap(), ReceiptType::GstOnly);
        assert_eq!(
            "GST and Service Charge".parse::<ReceiptType>().unwrap(),
            ReceiptType::GstAndServiceCharge
        );
        assert_eq!(" reverse ".parse::<Direction>().unwrap(), Direction::Reverse);
        assert!("sideways".parse::<Direction>().is_err());
        assert!("VAT".parse::<ReceiptType>().is_err());
    }

    #[test]
    fn test_parse_cost() {
        assert_eq!(parse_cost("100").unwrap(), 100.0);
        assert_eq!(parse_cost(" $12.5 ").unwrap(), 12.5);
        assert_eq!(parse_cost("0").unwrap(), 0.0);
        assert!(matches!(parse_cost("-1"), Err(BotError::InvalidNumericInput(_))));
        assert!(parse_cost("abc").is_err());
        assert!(parse_cost("inf").is_err());
        assert!(parse_cost("NaN").is_err());
    }

    #[test]
    fn test_parse_service_charge() {
        assert!(approx(parse_service_charge("10", 0.1).unwrap(), 0.1));
        assert!(approx(parse_service_charge("12.5%", 0.1).unwrap(), 0.125));
        assert!(approx(parse_service_charge("100", 0.1).unwrap(), 1.0));
        assert!(approx(parse_service_charge("Default", 0.15).unwrap(), 0.15));
        assert!(parse_service_charge("0", 0.1).is_err());
        assert!(parse_service_charge("101", 0.1).is_err());
        assert!(parse_service_charge("ten", 0.1).is_err());
    }
}
