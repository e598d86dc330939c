//! Token kinds and the owned `Token` handed from the scanner to the parser.

use std::fmt;
use std::mem;

/// Declares the payload-free token kinds once, so the enum and the names
/// printed by `tokenize` cannot drift apart.
macro_rules! token_types {
    ($($kind:ident),* $(,)?) => {
        /// Kind of a scanned token.  Only literals carry a payload.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone)]
        pub enum TokenType {
            /// String literal contents, quotes stripped.
            STRING(String),
            NUMBER(f64),
            $($kind,)*
        }

        impl TokenType {
            /// Upper-case kind name without payload.
            pub fn name(&self) -> &'static str {
                match self {
                    TokenType::STRING(_) => "STRING",
                    TokenType::NUMBER(_) => "NUMBER",
                    $(TokenType::$kind => stringify!($kind),)*
                }
            }
        }
    };
}

token_types! {
    // punctuation
    LEFT_PAREN, RIGHT_PAREN, LEFT_BRACE, RIGHT_BRACE,
    COMMA, DOT, MINUS, PLUS, SEMICOLON, SLASH, STAR,

    // one or two characters
    BANG, BANG_EQUAL, EQUAL, EQUAL_EQUAL,
    GREATER, GREATER_EQUAL, LESS, LESS_EQUAL,

    IDENTIFIER,

    // keywords
    AND, CLASS, ELSE, FALSE, FUN, FOR, IF, NIL, OR,
    PRINT, RETURN, SUPER, THIS, TRUE, VAR, WHILE,

    EOF,
}

// Kinds compare by variant alone; `NUMBER(1.0) == NUMBER(2.0)`.
impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A token with its source text and line.  The lexeme is owned so that AST
/// nodes and the closures built from them outlive the source buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            line,
        }
    }

    /// Identifier that never appeared in the source, e.g. `this` looked up by
    /// name at runtime.
    pub fn identifier<S: Into<String>>(name: S, line: usize) -> Self {
        Self::new(TokenType::IDENTIFIER, name, line)
    }
}

/// `KIND lexeme literal`, with `null` for tokens without a literal.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.token_type.name();

        match &self.token_type {
            TokenType::STRING(text) => write!(f, "{} {} {}", kind, self.lexeme, text),
            // Integral literals keep one fractional digit: `42` prints `42.0`.
            TokenType::NUMBER(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                let mut digits = itoa::Buffer::new();
                write!(f, "{} {} {}.0", kind, self.lexeme, digits.format(*n as i64))
            }
            TokenType::NUMBER(n) => write!(f, "{} {} {}", kind, self.lexeme, n),
            _ => write!(f, "{} {} null", kind, self.lexeme),
        }
    }
}
