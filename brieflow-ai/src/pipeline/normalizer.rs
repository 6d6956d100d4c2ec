//! Query text normalization
//!
//! Always: collapse whitespace and ensure terminal punctuation.
//! With grammar correction: also capitalize the first letter and the
//! pronoun "i", and drop duplicated adjacent words ("the the").

/// Normalized query text plus what changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// Text differs from the raw input
    pub normalization_applied: bool,
    /// A grammar repair (duplicate word, capitalization) changed the text
    pub grammar_corrected: bool,
}

pub fn normalize_query(raw: &str, grammar_correction: bool) -> NormalizedText {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let mut grammar_corrected = false;

    let mut kept: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        if grammar_correction {
            if let Some(prev) = kept.last() {
                if is_duplicate(prev, word) {
                    grammar_corrected = true;
                    continue;
                }
            }
            if word == "i" || word.starts_with("i'") {
                grammar_corrected = true;
                kept.push(format!("I{}", &word[1..]));
                continue;
            }
        }
        kept.push(word.to_string());
    }

    let mut text = kept.join(" ");

    if grammar_correction {
        if let Some(first) = text.chars().next() {
            if first.is_lowercase() {
                let upper: String = first.to_uppercase().collect();
                text.replace_range(..first.len_utf8(), &upper);
                grammar_corrected = true;
            }
        }
    }

    if let Some(last) = text.chars().last() {
        if !matches!(last, '.' | '!' | '?') {
            text.push('.');
        }
    }

    NormalizedText {
        normalization_applied: text != raw,
        grammar_corrected,
        text,
    }
}

/// Adjacent repeated alphabetic word, compared case-insensitively
fn is_duplicate(prev: &str, word: &str) -> bool {
    if !prev.chars().all(char::is_alphabetic) || !word.chars().all(char::is_alphabetic) {
        return false;
    }
    prev.eq_ignore_ascii_case(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_and_punctuation() {
        let n = normalize_query("  make   a\tteaser  ", false);
        assert_eq!(n.text, "make a teaser.");
        assert!(n.normalization_applied);
        assert!(!n.grammar_corrected);
    }

    #[test]
    fn test_grammar_repairs() {
        let n = normalize_query("make the the video i'm planning", true);
        assert_eq!(n.text, "Make the video I'm planning.");
        assert!(n.grammar_corrected);
    }

    #[test]
    fn test_already_clean_text() {
        let n = normalize_query("Make a poster.", true);
        assert_eq!(n.text, "Make a poster.");
        assert!(!n.normalization_applied);
        assert!(!n.grammar_corrected);
    }

    #[test]
    fn test_punctuation_only_is_not_grammar() {
        let n = normalize_query("Make a poster", true);
        assert_eq!(n.text, "Make a poster.");
        assert!(n.normalization_applied);
        assert!(!n.grammar_corrected);
    }

    #[test]
    fn test_numbers_are_not_deduplicated() {
        let n = normalize_query("Render 10 10 second clips!", true);
        assert_eq!(n.text, "Render 10 10 second clips!");
    }

    #[test]
    fn test_scenario_query() {
        let n = normalize_query("make a 30s product teaser, 16:9, energetic mood", true);
        assert_eq!(n.text, "Make a 30s product teaser, 16:9, energetic mood.");
        assert!(n.grammar_corrected);
    }

    #[test]
    fn test_empty_input() {
        let n = normalize_query("   ", true);
        assert_eq!(n.text, "");
        assert!(n.normalization_applied);
    }
}
