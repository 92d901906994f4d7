//! Shared column-formatting helpers used across the tabular writers.

use crate::stats::{Representation, TestResult};

/// Zero-padded three-digit-then-decimal percentage string, e.g. `0.45`
/// -> `"045.00"`.
pub fn format_coverage(fraction: f64) -> String {
    format!("{:06.2}", fraction * 100.0)
}

pub const NOT_AVAILABLE: &str = "N/A";

pub fn representation_str(result: &Option<TestResult>) -> &'static str {
    match result.as_ref().map(|r| r.representation()) {
        Some(Representation::Enriched) => "enriched",
        Some(Representation::Depleted) => "depleted",
        Some(Representation::Equal) => "equal",
        None => NOT_AVAILABLE,
    }
}

pub fn log2_mean_str(result: &Option<TestResult>) -> String {
    match result {
        Some(r) => format!("{:.6}", r.log2_mean),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn pvalue_str(result: &Option<TestResult>) -> String {
    match result {
        Some(r) => format!("{:.6e}", r.p_value),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_is_zero_padded() {
        assert_eq!(format_coverage(0.45), "045.00");
        assert_eq!(format_coverage(1.0), "100.00");
        assert_eq!(format_coverage(0.0), "000.00");
    }
}
