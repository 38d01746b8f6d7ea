use super::{LanguageDefinition, Rgb, ThemeDefinition, TokenKind};
use colored::Colorize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedLine {
    /// 1-based.
    pub number: usize,
    pub segments: Vec<Segment>,
    pub emphasized: bool,
}

impl HighlightedLine {
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A whole file rendered at once, as kept in the rendered-content cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub language: String,
    pub theme: String,
    /// Zero-based emphasized line.
    pub highlight_line: Option<usize>,
    pub lines: Vec<HighlightedLine>,
}

impl RenderedDocument {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Line tokenizer for the small language definitions in the catalog:
/// keywords, numbers, quoted strings and line comments.
pub struct Highlighter<'a> {
    language: &'a LanguageDefinition,
    theme: &'a ThemeDefinition,
    keywords: HashSet<&'a str>,
}

impl<'a> Highlighter<'a> {
    pub fn new(language: &'a LanguageDefinition, theme: &'a ThemeDefinition) -> Self {
        Self {
            language,
            theme,
            keywords: language.keywords.iter().map(String::as_str).collect(),
        }
    }

    pub fn theme(&self) -> &ThemeDefinition {
        self.theme
    }

    pub fn tokenize(&self, line: &str) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        let mut push = |text: &str, kind: TokenKind| {
            if text.is_empty() {
                return;
            }
            match segments.last_mut() {
                Some(last) if last.kind == kind && kind == TokenKind::Plain => last.text.push_str(text),
                _ => segments.push(Segment {
                    text: text.to_string(),
                    kind,
                }),
            }
        };

        let mut rest = line;
        while let Some(c) = rest.chars().next() {
            if let Some(comment) = &self.language.line_comment {
                if rest.starts_with(comment.as_str()) {
                    push(rest, TokenKind::Comment);
                    break;
                }
            }

            let len = if self.language.string_quotes.contains(&c) {
                let end = string_end(rest, c);
                push(&rest[..end], TokenKind::String);
                end
            } else if c.is_alphanumeric() || c == '_' {
                let end = rest
                    .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len());
                let word = &rest[..end];
                let kind = if c.is_ascii_digit() {
                    TokenKind::Number
                } else if self.keywords.contains(word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Plain
                };
                push(word, kind);
                end
            } else if c.is_whitespace() {
                push(&rest[..c.len_utf8()], TokenKind::Plain);
                c.len_utf8()
            } else {
                push(&rest[..c.len_utf8()], TokenKind::Punctuation);
                c.len_utf8()
            };
            rest = &rest[len..];
        }
        segments
    }

    pub fn highlight_line(&self, number: usize, line: &str, emphasized: bool) -> HighlightedLine {
        HighlightedLine {
            number,
            segments: self.tokenize(line),
            emphasized,
        }
    }

    pub fn render_document(&self, text: &str, highlight_line: Option<usize>) -> RenderedDocument {
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| self.highlight_line(index + 1, line, Some(index) == highlight_line))
            .collect();
        RenderedDocument {
            language: self.language.id.clone(),
            theme: self.theme.id.clone(),
            highlight_line,
            lines,
        }
    }

    /// Terminal rendering with a line-number gutter.
    pub fn to_ansi(&self, line: &HighlightedLine) -> String {
        let mut out = format!("{:>6} │ ", line.number).dimmed().to_string();
        for segment in &line.segments {
            let Rgb(r, g, b) = self.theme.color(segment.kind);
            let mut styled = segment.text.truecolor(r, g, b);
            if line.emphasized {
                let Rgb(r, g, b) = self.theme.emphasis;
                styled = styled.on_truecolor(r, g, b);
            }
            if segment.kind == TokenKind::Keyword {
                styled = styled.bold();
            }
            out.push_str(&styled.to_string());
        }
        out
    }
}

/// Byte length of the quoted string starting at `rest[0]`, including both
/// quotes; runs to the end of the line when unterminated.
fn string_end(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (offset, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return offset + c.len_utf8();
        }
    }
    rest.len()
}
