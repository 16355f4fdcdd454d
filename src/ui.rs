use chrono::NaiveDate;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════";

/// A piece of a reply: prose, or a fenced code block.
#[derive(Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Prose(&'a str),
    Code {
        language: Option<&'a str>,
        body: &'a str,
    },
}

/// Split a reply on ``` fences. Every odd piece is code; an unterminated
/// fence runs to the end of the reply.
pub fn split_segments(text: &str) -> Vec<Segment<'_>> {
    text.split("```")
        .enumerate()
        .filter_map(|(i, part)| {
            if i % 2 == 0 {
                let prose = part.trim_matches('\n');
                (!prose.trim().is_empty()).then_some(Segment::Prose(prose))
            } else {
                Some(code_segment(part))
            }
        })
        .collect()
}

fn code_segment(part: &str) -> Segment<'_> {
    let (first, rest) = part.split_once('\n').unwrap_or(("", part));
    let first = first.trim();
    let is_language = !first.is_empty() && first.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-');

    if is_language {
        Segment::Code {
            language: Some(first),
            body: rest.trim_end_matches('\n'),
        }
    } else {
        Segment::Code {
            language: None,
            body: part.trim_matches('\n'),
        }
    }
}

/// Terminal rendering of a reply with code set apart from the prose.
pub fn render_reply(text: &str) -> String {
    let mut out = String::new();
    for segment in split_segments(text) {
        if !out.is_empty() {
            out.push('\n');
        }
        match segment {
            Segment::Prose(prose) => {
                out.push_str(prose);
                out.push('\n');
            }
            Segment::Code { language, body } => {
                out.push_str(&format!("  ┌─ {}\n", language.unwrap_or("code")));
                for line in body.lines() {
                    out.push_str("  │ ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("  └─\n");
            }
        }
    }
    out
}

pub fn banner(tutor_name: &str, today: NaiveDate) -> String {
    format!(
        "📊 {tutor_name}\n📅 Today is {}\nType a question, /help for commands, /quit to leave.\n{RULE}",
        today.format("%B %d, %Y")
    )
}

pub fn display_reply(speaker: &str, text: &str) {
    println!("\n🤓 {speaker}>");
    print!("{}", render_reply(text));
    println!();
}

pub fn display_stream_chunk(chunk: &str) {
    print!("{chunk}");
    io::stdout().flush().ok();
}

pub fn prompt(label: &str) -> io::Result<()> {
    print!("{label}");
    io::stdout().flush()
}

pub fn rule() -> &'static str {
    RULE
}

pub const HELP: &str = "\
Commands:
  /reset            start over from the greeting
  /tip              show a random data science tip
  /replay           play the last spoken reply again
  /upload PATH      use a CSV, PDF or TXT file as context
  /forget           drop the uploaded file
  /listen PATH      ask a question recorded in an audio file
  /explain on|off   detailed explanations
  /code on|off      Python code examples
  /filter on|off    keep questions on data science
  /speak on|off     read replies aloud
  /stats            token usage, cost and timing
  /save             save this conversation
  /export PATH      write the conversation to .md or .json
  /help             this list
  /quit             leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_prose_and_code() {
        let reply = "Try this:\n```python\nimport pandas as pd\nprint(1)\n```\nNeat!";
        assert_eq!(
            split_segments(reply),
            vec![
                Segment::Prose("Try this:"),
                Segment::Code {
                    language: Some("python"),
                    body: "import pandas as pd\nprint(1)",
                },
                Segment::Prose("Neat!"),
            ]
        );
    }

    #[test]
    fn test_plain_reply_is_one_segment() {
        assert_eq!(split_segments("Just prose."), vec![Segment::Prose("Just prose.")]);
        assert!(split_segments("").is_empty());
    }

    #[test]
    fn test_unlabelled_and_unterminated_code() {
        let segments = split_segments("See:\n```\nx = 1\n```\n```python\ny = 2");
        assert_eq!(
            segments[1],
            Segment::Code {
                language: None,
                body: "x = 1",
            }
        );
        assert_eq!(
            segments[2],
            Segment::Code {
                language: Some("python"),
                body: "y = 2",
            }
        );
    }

    #[test]
    fn test_render_sets_code_apart() {
        let rendered = render_reply("Look:\n```python\nprint('hi')\n```");
        assert!(rendered.starts_with("Look:\n"));
        assert!(rendered.contains("  ┌─ python\n  │ print('hi')\n  └─"));
    }

    #[test]
    fn test_banner_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let banner = banner("Data Science Tutor", date);
        assert!(banner.contains("Today is March 07, 2024"));
        assert!(banner.starts_with("📊 Data Science Tutor"));
    }
}
