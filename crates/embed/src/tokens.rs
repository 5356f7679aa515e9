//! Query length estimation.
//!
//! The embedding backend does not expose its tokenizer, so the limit check
//! runs against a subword estimate: every punctuation mark is one token and
//! every alphanumeric run costs one token per started group of
//! `CHARS_PER_TOKEN` characters.

const CHARS_PER_TOKEN: usize = 8;

/// Estimate how many model tokens `text` occupies
pub fn approximate_token_count(text: &str) -> usize {
    let mut tokens = 0;
    let mut run = 0usize;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            run += 1;
            continue;
        }
        tokens += run_tokens(run);
        run = 0;
        if !ch.is_whitespace() {
            tokens += 1;
        }
    }

    tokens + run_tokens(run)
}

fn run_tokens(run: usize) -> usize {
    run.div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(approximate_token_count(""), 0);
        assert_eq!(approximate_token_count("   \n\t"), 0);
    }

    #[test]
    fn test_words_and_punctuation() {
        assert_eq!(approximate_token_count("open world"), 2);
        assert_eq!(approximate_token_count("co-op, 4 players!"), 7);
    }

    #[test]
    fn test_long_words_cost_more() {
        // 16 characters -> two groups
        assert_eq!(approximate_token_count("abcdefghijklmnop"), 2);
        assert_eq!(approximate_token_count("abcdefghijklmnopq"), 3);
    }
}
