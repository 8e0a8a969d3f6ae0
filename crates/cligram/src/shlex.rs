//! The shell-quoting tokenizer behind the `sh_lex` node.
//!
//! Splits a command line on blanks, honouring double and single quotes.
//! Inside double quotes (and outside any quote) `\"` and `\\` escape to
//! `"` and `\`; any other `\x` stays literal. Single-quoted sections are
//! taken verbatim. A `#` outside quotes starts a comment running to the
//! end of the input.

use crate::error::GrammarError;

/// How to treat the end of the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexMode {
    /// Parsing: an unterminated quote is an error, trailing separators
    /// are dropped.
    Strict,
    /// Completion: an unterminated quote is recorded and the partial
    /// token kept; a trailing separator (or an empty line) produces one
    /// empty token so the next position can be completed.
    Trailing,
}

/// A tokenized command line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LexedLine {
    pub(crate) tokens: Vec<String>,
    /// The quote character left open at the end of the line, if any.
    /// Only set in [`LexMode::Trailing`].
    pub(crate) missing_quote: Option<char>,
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

fn is_end(c: char) -> bool {
    matches!(c, '#' | '\n' | '\r')
}

pub(crate) fn tokenize(input: &str, mode: LexMode) -> Result<LexedLine, GrammarError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut missing_quote = None;
    let mut pos = 0;
    // Position right after the last token read; trailing blanks or a
    // comment leave a gap to the end of the line.
    let mut consumed = 0;

    loop {
        while pos < len && is_blank(chars[pos]) {
            pos += 1;
        }
        if pos >= len || is_end(chars[pos]) {
            break;
        }

        let mut token = String::new();
        let mut quote: Option<char> = None;
        while pos < len {
            let c = chars[pos];
            match quote {
                None => {
                    if is_blank(c) || is_end(c) {
                        break;
                    }
                    if c == '\\' && matches!(chars.get(pos + 1), Some('"' | '\\')) {
                        token.push(chars[pos + 1]);
                        pos += 2;
                        continue;
                    }
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                        pos += 1;
                        continue;
                    }
                    token.push(c);
                    pos += 1;
                }
                Some('\'') => {
                    if c == '\'' {
                        quote = None;
                    } else {
                        token.push(c);
                    }
                    pos += 1;
                }
                Some(_) => {
                    if c == '"' {
                        quote = None;
                        pos += 1;
                        continue;
                    }
                    if c == '\\' && matches!(chars.get(pos + 1), Some('"' | '\\')) {
                        token.push(chars[pos + 1]);
                        pos += 2;
                        continue;
                    }
                    token.push(c);
                    pos += 1;
                }
            }
        }

        if let Some(q) = quote {
            match mode {
                LexMode::Strict => return Err(GrammarError::UnterminatedQuote),
                LexMode::Trailing => missing_quote = Some(q),
            }
        }

        tokens.push(token);
        consumed = pos;
    }

    // A trailing separator, a comment or an empty line means the next
    // token has not been started yet: complete from an empty one.
    if mode == LexMode::Trailing && (consumed != len || len == 0) {
        tokens.push(String::new());
    }

    Ok(LexedLine {
        tokens,
        missing_quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict(input: &str) -> Vec<String> {
        tokenize(input, LexMode::Strict)
            .expect("tokenize")
            .tokens
    }

    fn trailing(input: &str) -> LexedLine {
        tokenize(input, LexMode::Trailing).expect("tokenize")
    }

    #[test]
    fn splits_on_blanks() {
        assert_eq!(strict("foo bar"), ["foo", "bar"]);
        assert_eq!(strict("  foo \t bar "), ["foo", "bar"]);
        assert_eq!(strict(""), Vec::<String>::new());
    }

    #[test]
    fn removes_quotes() {
        assert_eq!(strict("  'foo' \"bar\""), ["foo", "bar"]);
        assert_eq!(strict("'f'oo 'toto' bar"), ["foo", "toto", "bar"]);
        assert_eq!(strict("\"foo \" x"), ["foo ", "x"]);
    }

    #[test]
    fn escapes_inside_and_outside_double_quotes() {
        assert_eq!(strict(r#"a\"b"#), [r#"a"b"#]);
        assert_eq!(strict(r#""a\\b""#), [r"a\b"]);
        assert_eq!(strict(r"a\xb"), [r"a\xb"]);
    }

    #[test]
    fn comment_runs_to_end_of_input() {
        assert_eq!(strict("foo #bar baz"), ["foo"]);
        assert_eq!(strict("'#quoted' x"), ["#quoted", "x"]);
    }

    #[test]
    fn strict_mode_rejects_unterminated_quotes() {
        assert!(matches!(
            tokenize("foo bar'", LexMode::Strict),
            Err(GrammarError::UnterminatedQuote)
        ));
        assert!(matches!(
            tokenize("\"foo ", LexMode::Strict),
            Err(GrammarError::UnterminatedQuote)
        ));
    }

    #[test]
    fn trailing_mode_keeps_partial_quotes() {
        let line = trailing("foo 'b");
        assert_eq!(line.tokens, ["foo", "b"]);
        assert_eq!(line.missing_quote, Some('\''));

        let line = trailing("foo \"b");
        assert_eq!(line.tokens, ["foo", "b"]);
        assert_eq!(line.missing_quote, Some('"'));
    }

    #[test]
    fn trailing_mode_appends_an_empty_token_after_a_separator() {
        assert_eq!(trailing("foo ").tokens, ["foo", ""]);
        assert_eq!(trailing("foo").tokens, ["foo"]);
        assert_eq!(trailing("").tokens, [""]);
        assert_eq!(trailing(" ").tokens, [""]);
        assert_eq!(trailing("foo #c").tokens, ["foo", ""]);
    }
}
