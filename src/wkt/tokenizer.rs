use crate::error::{Result, WkError};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Token<'a> {
    Word(&'a str),
    Number(f64),
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Equals,
    Eof,
}

impl Token<'_> {
    /// The numeric value of a number token, or of a word such as `nan` or `inf`.
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Token::Number(value) => Some(*value),
            Token::Word(word) => word.parse::<f64>().ok(),
            _ => None,
        }
    }

    pub(crate) fn is_word(&self, expected: &str) -> bool {
        matches!(self, Token::Word(word) if word.eq_ignore_ascii_case(expected))
    }
}

/// Lexer over one feature's text.
///
/// Cheap to clone, which is how the reader looks ahead.
#[derive(Clone, Debug)]
pub(crate) struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn error<S: Into<String>>(&self, message: S) -> WkError {
        WkError::malformed(message, self.position())
    }

    pub(crate) fn peek(&self) -> Result<Token<'a>> {
        self.clone().next_token()
    }

    pub(crate) fn next_token(&mut self) -> Result<Token<'a>> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let Some(&c) = bytes.get(self.pos) else {
            return Ok(Token::Eof);
        };

        let single = match c {
            b'(' => Some(Token::LeftParen),
            b')' => Some(Token::RightParen),
            b',' => Some(Token::Comma),
            b';' => Some(Token::Semicolon),
            b'=' => Some(Token::Equals),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        let start = self.pos;
        if c.is_ascii_alphabetic() {
            self.pos = self.scan(|b| b.is_ascii_alphanumeric() || b == b'_');
            return Ok(Token::Word(&self.text[start..self.pos]));
        }

        if c.is_ascii_digit() || matches!(c, b'-' | b'+' | b'.') {
            // Letters are kept so that `-inf` and `1e-5` lex as one token.
            let end = self.scan(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.'));
            let text = &self.text[start..end];
            return match text.parse::<f64>() {
                Ok(value) => {
                    self.pos = end;
                    Ok(Token::Number(value))
                }
                Err(_) => Err(self.error(format!("invalid number '{text}'"))),
            };
        }

        let ch = self.text[start..].chars().next().unwrap_or('?');
        Err(self.error(format!("unexpected character '{ch}'")))
    }

    fn scan<F: Fn(u8) -> bool>(&self, accept: F) -> usize {
        let bytes = self.text.as_bytes();
        let mut end = self.pos;
        while end < bytes.len() && accept(bytes[end]) {
            end += 1;
        }
        end
    }
}
