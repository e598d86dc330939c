#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token, LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_keywords_and_identifiers() {
        assert_token_sequence(
            "class Point < Base { init() { this.x = super.y; } }",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Point"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Base"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_comments_are_skipped() {
        assert_token_sequence(
            "var a = 1; // trailing comment\n// whole line\nprint a;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::EQUAL, "="),
                (TokenType::NUMBER(1.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::PRINT, "print"),
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_operators_and_trailing_dot() {
        assert_token_sequence(
            "!= ! == = <= < >= > / 12. x",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EQUAL, "="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::GREATER, ">"),
                (TokenType::SLASH, "/"),
                (TokenType::NUMBER(12.0), "12"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_literal_display() {
        let tokens: Vec<Token> = Scanner::new(b"42 3.5 \"hi\"")
            .filter_map(Result::ok)
            .collect();

        let rendered: Vec<String> = tokens.iter().map(Token::to_string).collect();

        assert_eq!(
            rendered,
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.5 3.5",
                "STRING \"hi\" hi",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_multiline_string_advances_line() {
        let tokens: Vec<Token> = Scanner::new(b"\"a\nb\" x").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let results: Vec<_> = Scanner::new(b"\"open").collect();

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(errors, vec!["[line 1] Error: Unterminated string."]);
        assert_token_matches(&results[results.len() - 1], TokenType::EOF, "");
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }
    }
}
