use once_cell::sync::Lazy;
use regex::Regex;

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?(```|$)").expect("Invalid regex pattern"));
static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("Invalid regex pattern"));
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("Invalid regex pattern"));
static LINE_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(#{1,6}|>|[-*+]|\d+\.)\s+").expect("Invalid regex pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

const CODE_PLACEHOLDER: &str = " (code example shown on screen) ";

/// Strip a reply down to what a speech engine should read aloud: code
/// blocks, markdown markup, links and symbols such as emoji are removed.
pub fn sanitize_for_speech(text: &str) -> String {
    let text = CODE_BLOCK.replace_all(text, CODE_PLACEHOLDER);
    let text = MARKDOWN_LINK.replace_all(&text, "$1");
    let text = URL.replace_all(&text, "");
    let text = LINE_MARKERS.replace_all(&text, "");

    let filtered: String = text
        .chars()
        .map(|c| match c {
            '_' | '\n' | '\t' => ' ',
            _ => c,
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || is_spoken_punctuation(*c))
        .collect();

    WHITESPACE.replace_all(filtered.trim(), " ").into_owned()
}

fn is_spoken_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '(' | ')' | '-' | '%' | '/' | '&' | '+' | '='
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_and_emoji() {
        let reply = "## Let's Dig In 🤓\n**Regression** predicts a *number*. See [the docs](https://scikit-learn.org).";
        assert_eq!(
            sanitize_for_speech(reply),
            "Let's Dig In Regression predicts a number. See the docs."
        );
    }

    #[test]
    fn test_replaces_code_blocks() {
        let reply = "Try this:\n```python\nimport pandas as pd\n```\nFilters like magic!";
        let spoken = sanitize_for_speech(reply);
        assert!(!spoken.contains("import"));
        assert!(spoken.contains("code example shown on screen"));
        assert!(spoken.ends_with("Filters like magic!"));
    }

    #[test]
    fn test_unterminated_code_block() {
        let spoken = sanitize_for_speech("Here:\n```python\nprint(1)");
        assert_eq!(spoken, "Here: (code example shown on screen)");
    }

    #[test]
    fn test_list_markers_and_underscores() {
        let spoken = sanitize_for_speech("- use train_test_split\n- then fit\n1. score it");
        assert_eq!(spoken, "use train test split then fit score it");
    }

    #[test]
    fn test_only_symbols_becomes_empty() {
        assert_eq!(sanitize_for_speech("🎉 ✨ ***"), "");
    }
}
