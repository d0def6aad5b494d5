//! Splits script text into tokens.
//!
//! Whitespace only separates tokens, so `position(1,2,3)` and
//! `position( 1 , 2 , 3 )` tokenize identically.

/// What a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of letters, digits, `_`, or a number such as `-1.5`.
    Word,
    /// A double-quoted string; the token text is the unescaped content.
    Quoted,
    /// Any other single character.
    Punct,
}

/// One token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Token text (quote-stripped for [`TokenKind::Quoted`]).
    pub text: String,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Token {
    /// Whether this token is the literal `literal`, ignoring ASCII case.
    pub fn is_literal(&self, literal: &str) -> bool {
        self.kind != TokenKind::Quoted && self.text.eq_ignore_ascii_case(literal)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize `input`.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut end = input.len();
            while let Some((i, c)) = chars.next() {
                if c == '"' {
                    // `""` inside a string is an escaped quote
                    if chars.peek().is_some_and(|&(_, next)| next == '"') {
                        chars.next();
                        text.push('"');
                        continue;
                    }
                    end = i + 1;
                    break;
                }
                text.push(c);
            }
            tokens.push(Token {
                kind: TokenKind::Quoted,
                text,
                start,
                end,
            });
            continue;
        }

        let follows_word = tokens
            .last()
            .is_some_and(|t: &Token| t.end == start && t.kind == TokenKind::Word);
        let starts_number = c == '-'
            && !follows_word
            && input[start + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit());

        if is_word_char(c) || starts_number {
            chars.next();
            let mut end = start + c.len_utf8();
            while let Some(&(i, c)) = chars.peek() {
                let decimal_point = c == '.'
                    && input[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|n| n.is_ascii_digit());
                if !is_word_char(c) && !decimal_point {
                    break;
                }
                chars.next();
                end = i + c.len_utf8();
            }
            tokens.push(Token {
                kind: TokenKind::Word,
                text: input[start..end].to_owned(),
                start,
                end,
            });
            continue;
        }

        chars.next();
        tokens.push(Token {
            kind: TokenKind::Punct,
            text: c.to_string(),
            start,
            end: start + c.len_utf8(),
        });
    }

    tokens
}
