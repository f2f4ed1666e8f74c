//! Card identifier handling
//!
//! The RFID reader (or a cashier typing) delivers a bare numeric string. The
//! core, not the reader, decides whether that string is a usable card number.

use super::error::PosError;

/// Number of digits on a student card in this system
pub const CARD_DIGITS: usize = 10;

/// A syntactically valid card identifier
///
/// Holding a `CardId` only proves the format is right; whether a cardholder
/// exists for it is decided by the card validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardId(String);

impl CardId {
    /// Parse a card identifier of exactly `digits` ASCII digits
    ///
    /// # Errors
    ///
    /// Returns `PosError::InvalidCardFormat` for any other input, including
    /// inputs with surrounding whitespace.
    pub fn parse_with_digits(input: &str, digits: usize) -> Result<Self, PosError> {
        if input.len() == digits && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(CardId(input.to_string()))
        } else {
            Err(PosError::invalid_card_format(input, digits))
        }
    }

    /// Parse a card identifier using the default length ([`CARD_DIGITS`])
    pub fn parse(input: &str) -> Result<Self, PosError> {
        Self::parse_with_digits(input, CARD_DIGITS)
    }

    /// Clean up raw scanner or keyboard input the way the card field does:
    /// drop every non-digit and keep at most `digits` characters
    pub fn sanitize(raw: &str, digits: usize) -> String {
        raw.chars()
            .filter(|c| c.is_ascii_digit())
            .take(digits)
            .collect()
    }

    /// The identifier as stored in `id_number`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ten_digits("0123456789", true)]
    #[case::nine_digits("012345678", false)]
    #[case::eleven_digits("01234567890", false)]
    #[case::letters("01234abcde", false)]
    #[case::whitespace(" 0123456789", false)]
    #[case::empty("", false)]
    fn test_parse(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(CardId::parse(input).is_ok(), valid);
    }

    #[rstest]
    #[case::strips_non_digits("01-23 45ab6789", "0123456789")]
    #[case::truncates("012345678901234", "0123456789")]
    #[case::short("123", "123")]
    fn test_sanitize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(CardId::sanitize(raw, CARD_DIGITS), expected);
    }

    #[test]
    fn test_invalid_card_error_carries_input() {
        let err = CardId::parse("12").unwrap_err();
        assert_eq!(err, PosError::invalid_card_format("12", CARD_DIGITS));
    }
}
