//! Utility functions and helpers.

pub mod http;

/// Format an integer price with thousands separators ("550000" -> "550,000").
pub fn format_price(price: i64) -> String {
    let digits = price.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(1_000), "1,000");
        assert_eq!(format_price(550_000), "550,000");
        assert_eq!(format_price(1_234_567), "1,234,567");
        assert_eq!(format_price(-45_000), "-45,000");
    }
}
