//! Streaming lexer over raw source bytes.
//!
//! [`Scanner`] is an iterator of `Result<Token>`.  A lexing error is yielded
//! in place and scanning resumes after the offending byte, so one pass reports
//! every bad character.  Exactly one `EOF` token ends the stream.

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    src: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next unread byte; `src.len() + 1` once `EOF` has been emitted.
    curr: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    /// Scan the whole input, separating tokens from lexing errors.
    pub fn scan_all(self) -> (Vec<Token>, Vec<LoxError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<LoxError> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!("Scanned {} tokens with {} errors", tokens.len(), errors.len());

        (tokens, errors)
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Byte `offset` positions ahead, or `0` past the end.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.src.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.peek_at(0);
        self.curr += 1;
        b
    }

    /// `long` if the next byte is `second` (consuming it), else `short`.
    fn either(&mut self, second: u8, long: TokenType, short: TokenType) -> TokenType {
        if self.peek_at(0) == second {
            self.curr += 1;
            long
        } else {
            short
        }
    }

    fn lexeme(&self) -> String {
        String::from_utf8_lossy(&self.src[self.start..self.curr]).into_owned()
    }

    /// Scan from `start`.  `Ok(None)` means whitespace or a comment was
    /// skipped.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.peek_at(0) == b'/' => {
                // Stop on the newline itself so the line count sees it.
                self.curr = match memchr(b'\n', &self.src[self.curr..]) {
                    Some(pos) => self.curr + pos,
                    None => self.src.len(),
                };
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),
            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Strings may span lines; the token reports the line it ends on.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek_at(0) != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.curr += 1;

        let contents = &self.src[self.start + 1..self.curr - 1];

        Ok(TokenType::STRING(String::from_utf8_lossy(contents).into_owned()))
    }

    fn number(&mut self) -> TokenType {
        while self.peek_at(0).is_ascii_digit() {
            self.curr += 1;
        }

        // A trailing `.` without digits is left for the next token.
        if self.peek_at(0) == b'.' && self.peek_at(1).is_ascii_digit() {
            self.curr += 1;

            while self.peek_at(0).is_ascii_digit() {
                self.curr += 1;
            }
        }

        // Digits with at most one interior dot always parse.
        TokenType::NUMBER(self.lexeme().parse().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek_at(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.curr > self.src.len() {
                return None;
            }

            if self.is_at_end() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
