#[cfg(test)]
mod scanner_tests {
    use treelox as lox;

    use lox::scanner::Scanner;
    use lox::token::TokenType;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn symbols() {
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
    fn compound_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_token_sequence(
            "class klass fun funny var variable",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "klass"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "funny"),
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "variable"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn number_literals() {
        let scanner = Scanner::new(b"12 3.14 0.5" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let numbers: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.token_type {
                TokenType::NUMBER(n) => Some(n),
                _ => None,
            })
            .collect();

        assert_eq!(numbers, vec![12.0, 3.14, 0.5]);
    }

    #[test]
    fn string_literal_strips_quotes() {
        let scanner = Scanner::new(b"\"hello\"" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 2); // STRING + EOF
        assert_eq!(tokens[0].lexeme, "\"hello\"");

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello"),
            other => panic!("expected STRING, got {:?}", other),
        }
    }

    #[test]
    fn multiline_string_counts_lines() {
        let source = "\"a\nb\"\nident";
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        // The string opens on line 1; the identifier after it sits on line 3.
        assert_eq!(tokens[0].line, 2); // token emitted after the embedded newline
        assert_eq!(tokens[1].lexeme, "ident");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_token_sequence(
            "var x; // trailing comment\n// whole-line comment\nprint x;",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::PRINT, "print"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn unexpected_characters_accumulate() {
        let source = ",.$(#";
        let scanner = Scanner::new(source.as_bytes());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6);

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "expected one error per bad character");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "unexpected message: {}",
                err
            );
        }

        // Scanning continued after the errors.
        let last = results.last().unwrap().as_ref().unwrap();
        assert_eq!(last.token_type, TokenType::EOF);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let scanner = Scanner::new(b"\"oops" as &[u8]);
        let results: Vec<_> = scanner.collect();

        let err = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("expected a lexical error");

        assert!(err.to_string().contains("Unterminated string"));
    }
}
