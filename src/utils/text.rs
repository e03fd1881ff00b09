// Text processing utilities

use pulldown_cmark::{Event, Parser, TagEnd};

/// Markdown processing utilities
pub mod markdown {
    use super::*;

    /// Extract plain text from markdown, one space between blocks
    pub fn to_plain_text(markdown: &str) -> String {
        let mut output = String::new();

        for event in Parser::new(markdown) {
            match event {
                Event::Text(text) | Event::Code(text) => output.push_str(&text),
                Event::SoftBreak | Event::HardBreak => output.push(' '),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::CodeBlock) => output.push(' '),
                _ => {}
            }
        }

        super::formatting::normalize_whitespace(&output)
    }
}

/// Text formatting utilities
pub mod formatting {
    /// Truncate text to at most `max_chars` characters with an ellipsis
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        if max_chars <= 3 {
            return "...".to_string();
        }

        let kept: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", kept.trim_end())
    }

    /// Collapse runs of whitespace into single spaces
    pub fn normalize_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::formatting::*;
    use super::markdown::*;

    #[test]
    fn test_markdown_to_plain_text() {
        let plain = to_plain_text("# Title\n\nSome **bold** and `code`.\n\n- one\n- two");
        assert_eq!(plain, "Title Some bold and code. one two");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }
}
