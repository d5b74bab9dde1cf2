use rust_decimal::{Decimal, RoundingStrategy};

/// Format a decimal with exactly `places` fractional digits, rounding half away from zero.
///
/// e.g. `format_fixed(dec!(1.2345), 2)` => `"1.23"`, `format_fixed(dec!(5), 3)` => `"5.000"`
pub fn format_fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::format_fixed;

    #[rstest]
    #[case(dec!(1.2345), 2, "1.23")]
    #[case(dec!(1.235), 2, "1.24")]
    #[case(dec!(5), 3, "5.000")]
    #[case(dec!(0.0005), 1, "0.0")]
    #[case(dec!(710.1), 1, "710.1")]
    fn format(#[case] value: Decimal, #[case] places: u32, #[case] expected_result: &str) {
        assert_eq!(format_fixed(value, places), expected_result);
    }
}
