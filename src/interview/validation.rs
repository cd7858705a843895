//! Input gate for interview answers.

use std::collections::HashMap;

use crate::error::InputRejection;

/// Longest accepted answer, in characters.
pub const MAX_ANSWER_CHARS: usize = 4000;

/// Messages at or below this length skip the repetition check.
const REPETITION_MIN_CHARS: usize = 10;

/// Check an answer before it may touch session state.
///
/// Works on the trimmed text. Rejects blank text, text over
/// [`MAX_ANSWER_CHARS`] characters, and text longer than ten characters where
/// a single character makes up more than 80% of it.
pub fn validate_answer(text: &str) -> Result<(), InputRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputRejection::Empty);
    }

    let length = trimmed.chars().count();
    if length > MAX_ANSWER_CHARS {
        return Err(InputRejection::TooLong {
            length,
            max: MAX_ANSWER_CHARS,
        });
    }

    if length > REPETITION_MIN_CHARS {
        let mut counts: HashMap<char, usize> = HashMap::new();
        for c in trimmed.chars() {
            *counts.entry(c).or_default() += 1;
        }
        let most_frequent = counts.values().copied().max().unwrap_or(0);
        if most_frequent * 10 > length * 8 {
            return Err(InputRejection::Repetitive);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_answers() {
        assert!(validate_answer("I grew up in a small town near the river.").is_ok());
        assert!(validate_answer("yes").is_ok());
        // Short strings are never repetitive.
        assert!(validate_answer("aaaaaaaaaa").is_ok());
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(validate_answer("   \n\t"), Err(InputRejection::Empty));
    }

    #[test]
    fn rejects_too_long() {
        let long = "word ".repeat(1000);
        assert_eq!(
            validate_answer(&long),
            Err(InputRejection::TooLong {
                length: 5000,
                max: MAX_ANSWER_CHARS
            })
        );
        assert!(validate_answer(&"ab".repeat(2000)).is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 3000 Cyrillic characters are 6000 bytes.
        let answer = "да".repeat(1500);
        assert!(validate_answer(&answer).is_ok());
    }

    #[test]
    fn rejects_repetitive_spam() {
        assert_eq!(validate_answer("aaaaaaaaaaaa"), Err(InputRejection::Repetitive));
        // The dominant character need not come first.
        assert_eq!(validate_answer("b!!!!!!!!!!!!!"), Err(InputRejection::Repetitive));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(validate_answer("ok         ").is_ok());
        assert!(validate_answer("\n\n   fine, thanks   \n").is_ok());

        let padded = format!("{}\n\n\n", "ab".repeat(2000));
        assert!(validate_answer(&padded).is_ok());
        let padded = format!("   {}   ", "a".repeat(12));
        assert_eq!(validate_answer(&padded), Err(InputRejection::Repetitive));
    }

    #[test]
    fn exactly_eighty_percent_is_allowed() {
        // 16 of 20 characters.
        let text = format!("{}{}", "x".repeat(16), "abcd");
        assert!(validate_answer(&text).is_ok());
    }
}
