//! Command-line tokenizer
//!
//! Splits typed input into [`Argument`]s. Each argument keeps every source
//! character it covers (leading whitespace, quotes, raw text and, for the
//! last argument, trailing whitespace) so that concatenating
//! [`Argument::source`] over the result reproduces the input exactly and
//! any cursor offset can be mapped back to an argument.
//!
//! ## Rules
//!
//! - Whitespace separates tokens and is attached to the *following* token
//! - `"..."` and `'...'` group text; an unterminated quote runs to the end
//! - `\\`, `\"`, `\'`, `\ `, `\t`, `\n` are escapes
//! - Malformed escapes degrade to literal text, never to an error

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not},
    character::complete::{char, multispace0, none_of, one_of},
    combinator::{consumed, map, opt, value},
    IResult,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// Lexical classification of an argument
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Bare text
    Word,
    /// Text inside (possibly unterminated) quotes
    Quoted,
    /// Bare text spelled like an option (`--name`, `-n`)
    Flag,
    /// Whitespace-only input, no text at all
    Blank,
}

/// Which part of an argument a source character belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgPart {
    Leading,
    Quote,
    Text,
    Trailing,
}

/// A lexical unit of the typed input with its source span
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Whitespace preceding the token
    pub leading: String,
    pub open_quote: Option<char>,
    /// Source text between the quotes, escapes intact
    pub raw: String,
    /// Unescaped text
    pub text: String,
    pub close_quote: Option<char>,
    /// Whitespace after the token (only ever set on the last argument)
    pub trailing: String,
    /// Char offset of the first character of `leading`
    pub start: usize,
    pub kind: TokenKind,
}

impl Argument {
    /// A synthetic empty argument at `start`
    pub fn blank(start: usize) -> Self {
        Self {
            leading: String::new(),
            open_quote: None,
            raw: String::new(),
            text: String::new(),
            close_quote: None,
            trailing: String::new(),
            start,
            kind: TokenKind::Blank,
        }
    }

    /// True when nothing but whitespace was typed for this argument.
    /// An explicit `""` is not blank.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.open_quote.is_none()
    }

    pub fn is_flag(&self) -> bool {
        self.kind == TokenKind::Flag
    }

    /// Exact source text covered by this argument
    pub fn source(&self) -> String {
        let mut s = String::with_capacity(self.leading.len() + self.raw.len() + 2);
        s.push_str(&self.leading);
        if let Some(q) = self.open_quote {
            s.push(q);
        }
        s.push_str(&self.raw);
        if let Some(q) = self.close_quote {
            s.push(q);
        }
        s.push_str(&self.trailing);
        s
    }

    /// Source text without the surrounding whitespace
    pub fn token_source(&self) -> String {
        let mut s = String::new();
        if let Some(q) = self.open_quote {
            s.push(q);
        }
        s.push_str(&self.raw);
        if let Some(q) = self.close_quote {
            s.push(q);
        }
        s
    }

    /// Number of source chars covered
    pub fn char_len(&self) -> usize {
        self.leading.chars().count()
            + self.raw.chars().count()
            + self.trailing.chars().count()
            + self.open_quote.map_or(0, |_| 1)
            + self.close_quote.map_or(0, |_| 1)
    }

    /// Char offset one past the last covered character
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }

    /// Char offset where the token itself (quote or text) begins
    pub fn token_start(&self) -> usize {
        self.start + self.leading.chars().count()
    }

    /// Part of the argument for every covered source char, in order
    pub fn char_parts(&self) -> Vec<ArgPart> {
        let mut parts = Vec::with_capacity(self.char_len());
        parts.extend(std::iter::repeat(ArgPart::Leading).take(self.leading.chars().count()));
        if self.open_quote.is_some() {
            parts.push(ArgPart::Quote);
        }
        parts.extend(std::iter::repeat(ArgPart::Text).take(self.raw.chars().count()));
        if self.close_quote.is_some() {
            parts.push(ArgPart::Quote);
        }
        parts.extend(std::iter::repeat(ArgPart::Trailing).take(self.trailing.chars().count()));
        parts
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Split `input` into arguments.
///
/// Empty input gives no arguments; whitespace-only input gives a single
/// blank argument. Never fails.
pub fn tokenize(input: &str) -> Vec<Argument> {
    let mut args: Vec<Argument> = Vec::new();
    if input.is_empty() {
        return args;
    }

    let mut rest = input;
    let mut offset = 0usize;

    loop {
        let (after_ws, leading) = whitespace(rest);

        if after_ws.is_empty() {
            match args.last_mut() {
                Some(last) => last.trailing = leading.to_string(),
                None => {
                    let mut arg = Argument::blank(offset);
                    arg.leading = leading.to_string();
                    args.push(arg);
                }
            }
            break;
        }

        let (remaining, token) = match raw_token(after_ws) {
            Ok(parsed) => parsed,
            // Unreachable in practice: a bare token always consumes at least
            // one non-space char. Treat the remainder as literal text.
            Err(_) => (
                "",
                RawToken {
                    open: None,
                    raw: after_ws,
                    text: after_ws.to_string(),
                    close: None,
                },
            ),
        };

        let arg = token.into_argument(leading, offset);
        offset = arg.end();
        args.push(arg);
        rest = remaining;

        if rest.is_empty() {
            break;
        }
    }

    args
}

// ============================================================================
// Internal Parsers
// ============================================================================

struct RawToken<'a> {
    open: Option<char>,
    raw: &'a str,
    text: String,
    close: Option<char>,
}

impl RawToken<'_> {
    fn into_argument(self, leading: &str, start: usize) -> Argument {
        let kind = if self.open.is_some() {
            TokenKind::Quoted
        } else if looks_like_flag(self.raw) {
            TokenKind::Flag
        } else {
            TokenKind::Word
        };

        Argument {
            leading: leading.to_string(),
            open_quote: self.open,
            raw: self.raw.to_string(),
            text: self.text,
            close_quote: self.close,
            trailing: String::new(),
            start,
            kind,
        }
    }
}

fn whitespace(input: &str) -> (&str, &str) {
    multispace0::<_, nom::error::Error<&str>>(input).unwrap_or((input, ""))
}

fn raw_token(input: &str) -> IResult<&str, RawToken<'_>> {
    alt((double_quoted, single_quoted, bare))(input)
}

fn double_quoted(input: &str) -> IResult<&str, RawToken<'_>> {
    quoted('"', input)
}

fn single_quoted(input: &str) -> IResult<&str, RawToken<'_>> {
    quoted('\'', input)
}

fn escape(input: &str) -> IResult<&str, char> {
    alt((
        value('\\', char('\\')),
        value('"', char('"')),
        value('\'', char('\'')),
        value(' ', char(' ')),
        value('\t', char('t')),
        value('\n', char('n')),
    ))(input)
}

fn bare(input: &str) -> IResult<&str, RawToken<'_>> {
    let (rest, (raw, text)) = consumed(alt((
        escaped_transform(none_of(" \t\r\n\\"), '\\', escape),
        // Malformed escape: keep the token as literal text
        map(is_not(" \t\r\n"), |s: &str| s.to_string()),
    )))(input)?;

    Ok((
        rest,
        RawToken {
            open: None,
            raw,
            text,
            close: None,
        },
    ))
}

fn quoted(quote: char, input: &str) -> IResult<&str, RawToken<'_>> {
    let (normal, closing): (&'static str, &'static str) = if quote == '"' {
        ("\"\\", "\"")
    } else {
        ("'\\", "'")
    };

    let (input, open) = one_of(closing)(input)?;
    let (input, (raw, text)) = consumed(opt(alt((
        escaped_transform(none_of(normal), '\\', escape),
        map(is_not(closing), |s: &str| s.to_string()),
    ))))(input)?;
    let (input, close) = opt(char(quote))(input)?;

    Ok((
        input,
        RawToken {
            open: Some(open),
            raw,
            text: text.unwrap_or_default(),
            close,
        },
    ))
}

/// `--name` or `-n`: a dash run followed by a letter
fn looks_like_flag(raw: &str) -> bool {
    let body = raw
        .strip_prefix("--")
        .or_else(|| raw.strip_prefix('-'))
        .unwrap_or("");
    body.chars().next().is_some_and(|c| c.is_alphabetic())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|a| a.text).collect()
    }

    fn rebuild(input: &str) -> String {
        tokenize(input).iter().map(Argument::source).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_whitespace_only_is_single_blank() {
        let args = tokenize("   ");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].kind, TokenKind::Blank);
        assert_eq!(args[0].leading, "   ");
        assert!(args[0].is_blank());
        assert_eq!(args[0].end(), 3);
    }

    #[test]
    fn test_simple_split_with_spans() {
        let args = tokenize("tsv  option1 x");
        assert_eq!(texts("tsv  option1 x"), vec!["tsv", "option1", "x"]);
        assert_eq!(args[0].start, 0);
        assert_eq!(args[1].start, 3);
        assert_eq!(args[1].leading, "  ");
        assert_eq!(args[1].token_start(), 5);
        assert_eq!(args[2].start, 12);
        assert_eq!(args[2].end(), 14);
    }

    #[test]
    fn test_trailing_whitespace_attaches_to_last() {
        let args = tokenize("tslong  ");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].trailing, "  ");
        assert_eq!(args[0].end(), 8);
    }

    #[test]
    fn test_quoted_tokens() {
        let args = tokenize(r#"echo "hello world" 'it is'"#);
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].text, "hello world");
        assert_eq!(args[1].kind, TokenKind::Quoted);
        assert_eq!(args[1].close_quote, Some('"'));
        assert_eq!(args[2].text, "it is");
    }

    #[test]
    fn test_empty_quotes_are_not_blank() {
        let args = tokenize(r#"echo """#);
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].text, "");
        assert!(!args[1].is_blank());
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let args = tokenize(r#"echo "abc def"#);
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].text, "abc def");
        assert_eq!(args[1].close_quote, None);
    }

    #[test]
    fn test_lone_quote_at_end_is_empty_token() {
        let args = tokenize("echo \"");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].text, "");
        assert_eq!(args[1].open_quote, Some('"'));
        assert_eq!(args[1].end(), 6);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(texts(r"a\ b c"), vec!["a b", "c"]);
        assert_eq!(texts(r#""say \"hi\"""#), vec![r#"say "hi""#]);
        assert_eq!(texts(r"tab\there"), vec!["tab\there"]);
    }

    #[test]
    fn test_malformed_escape_degrades_to_literal() {
        assert_eq!(texts(r"abc\"), vec![r"abc\"]);
        assert_eq!(texts(r"a\qb"), vec![r"a\qb"]);
    }

    #[test]
    fn test_flag_classification() {
        let args = tokenize("tslong --num -n -4 - --");
        assert_eq!(args[1].kind, TokenKind::Flag);
        assert_eq!(args[2].kind, TokenKind::Flag);
        assert_eq!(args[3].kind, TokenKind::Word);
        assert_eq!(args[4].kind, TokenKind::Word);
        assert_eq!(args[5].kind, TokenKind::Word);
    }

    #[test]
    fn test_source_round_trip() {
        for input in [
            "",
            " ",
            "tsv option1",
            "  tsv   option1  ",
            r#"echo "a b" 'c"#,
            r"x\ y\",
            "über straße",
        ] {
            assert_eq!(rebuild(input), input, "round trip for {:?}", input);
        }
    }

    #[test]
    fn test_offsets_are_chars_not_bytes() {
        let args = tokenize("über x");
        assert_eq!(args[0].end(), 4);
        assert_eq!(args[1].start, 4);
        assert_eq!(args[1].token_start(), 5);
    }

    #[test]
    fn test_char_parts() {
        let args = tokenize(r#"a "b" "#);
        assert_eq!(
            args[1].char_parts(),
            vec![
                ArgPart::Leading,
                ArgPart::Quote,
                ArgPart::Text,
                ArgPart::Quote,
                ArgPart::Trailing
            ]
        );
    }
}
