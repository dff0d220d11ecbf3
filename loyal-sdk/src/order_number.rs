//! Order number checksum.

/// Check that `number` is a non-empty string of ASCII digits whose Luhn
/// checksum is valid.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (position, c) in number.chars().rev().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        let value = if position % 2 == 1 {
            let doubled = digit * 2;
            if doubled > 9 { doubled - 9 } else { doubled }
        } else {
            digit
        };
        sum += value;
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn() {
        let cases = [
            ("1111", false),
            ("1234567812345670", true),
            ("1111222233334444", true),
            ("1111222233334441", false),
            ("49927398716", true),
            ("49927398717", false),
            ("1234567812345678", false),
            ("79927398710", false),
            ("79927398713", true),
            ("79927398719", false),
            ("8", false),
            ("0", true),
            ("", false),
            ("letter", false),
            ("4992 7398 716", false),
            ("١٢٣", false),
        ];
        for (number, expected) in cases {
            assert_eq!(is_valid(number), expected, "{number}");
        }
    }
}
