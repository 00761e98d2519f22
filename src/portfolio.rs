//! Portfolio Aggregation
//!
//! Reduces a token list to a single USD total formatted with two decimals.

use crate::types::TokenBalance;

/// Sum of all known USD values, formatted as `"123.45"`.
///
/// Unknown (`None`) and non-finite values are skipped. Values are summed in
/// input order, then rounded half-up on the shortest decimal form of the sum,
/// so `10.005` becomes `"10.01"`.
pub fn aggregate(tokens: &[TokenBalance]) -> String {
    let total = tokens
        .iter()
        .filter_map(|t| t.usd_value)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |sum, v| sum + v);

    format_usd(total)
}

/// Format a USD amount with two decimals, rounding half away from zero
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "0.00".to_string();
    }

    // f64 Display is the shortest round-trip decimal and never uses exponents
    let repr = amount.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let cents = int_part.parse::<u128>().ok().and_then(|whole| {
        let mut digits = frac_part.bytes().map(|b| u128::from(b - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().unwrap_or(0) >= 5;
        whole
            .checked_mul(100)?
            .checked_add(tenths * 10 + hundredths + u128::from(round_up))
    });

    let Some(cents) = cents else {
        return format!("{:.2}", amount);
    };

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}
