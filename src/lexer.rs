use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

/// Number of leading spaces per indentation level.
pub const INDENT_WIDTH: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated string literal at position {position}")]
    UnterminatedString { position: usize },
    #[error("Unknown escape sequence '\\{character}' at position {position}")]
    UnknownEscape { character: char, position: usize },
    #[error("Invalid integer literal '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("Tabs are not supported for indentation at position {position}")]
    TabIndentation { position: usize },
}

pub type LexResult<T> = Result<T, LexError>;

/// Indentation-sensitive tokenizer with a single token of lookahead.
///
/// The stream starts at the first real token (leading blank and comment
/// lines are skipped, a non-zero first-line indent produces no `Indent`),
/// emits at most one `Newline` per logical line, and synthesizes `Indent`
/// and `Dedent` tokens from the leading-space count of each line. Open
/// indentation levels are closed with one `Dedent` each before `Eof`.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    current_indent: usize,
    at_line_start: bool,
    empty_line: bool,
    pending: Vec<Token>,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> LexResult<Self> {
        let mut lexer = Self {
            input,
            pos: 0,
            current_indent: 0,
            at_line_start: true,
            empty_line: true,
            pending: Vec::new(),
            current: Token::new(TokenKind::Eof, Span::default()),
        };
        lexer.skip_leading_trivia();
        lexer.current = lexer.produce_token()?;
        Ok(lexer)
    }

    /// The most recently produced token.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Advances the stream and returns the new current token.
    pub fn next_token(&mut self) -> LexResult<&Token> {
        self.current = self.produce_token()?;
        Ok(&self.current)
    }

    fn produce_token(&mut self) -> LexResult<Token> {
        loop {
            if let Some(token) = self.pending.pop() {
                return Ok(token);
            }

            if self.at_line_start {
                self.handle_line_start()?;
                continue;
            }

            self.skip_spaces();
            let start = self.pos;
            let Some(ch) = self.peek_char() else {
                return Ok(self.produce_at_eof());
            };

            match ch {
                '\n' => {
                    self.consume_char();
                    self.at_line_start = true;
                    if !self.empty_line {
                        self.empty_line = true;
                        return Ok(Token::new(
                            TokenKind::Newline,
                            Span {
                                start,
                                end: start + 1,
                            },
                        ));
                    }
                }
                '#' => self.skip_comment(),
                _ => {
                    self.empty_line = false;
                    return match ch {
                        c if c.is_ascii_digit() => self.read_number(start),
                        c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start)),
                        '\'' | '"' => self.read_string(ch, start),
                        _ => Ok(self.read_operator(ch, start)),
                    };
                }
            }
        }
    }

    fn handle_line_start(&mut self) -> LexResult<()> {
        let spaces = self.count_indentation()?;
        self.at_line_start = false;

        let level = spaces / INDENT_WIDTH;
        let index = self.pos;
        let span = Span {
            start: index,
            end: index,
        };
        while level > self.current_indent {
            self.current_indent += 1;
            self.pending.push(Token::new(TokenKind::Indent, span));
        }
        while level < self.current_indent {
            self.current_indent -= 1;
            self.pending.push(Token::new(TokenKind::Dedent, span));
        }
        Ok(())
    }

    /// Counts the leading spaces of the next logical line. Blank and
    /// comment-only lines are consumed here and reset the counter, so they
    /// never change indentation depth; the same applies when the input ends
    /// before a real token shows up.
    fn count_indentation(&mut self) -> LexResult<usize> {
        let mut spaces = 0;
        loop {
            match self.peek_char() {
                Some(' ') => {
                    self.consume_char();
                    spaces += 1;
                }
                Some('\t') => {
                    return Err(LexError::TabIndentation { position: self.pos });
                }
                Some('\n') => {
                    self.consume_char();
                    spaces = 0;
                }
                Some('#') => {
                    self.skip_comment();
                }
                Some(_) => return Ok(spaces),
                None => return Ok(self.current_indent * INDENT_WIDTH),
            }
        }
    }

    fn produce_at_eof(&mut self) -> Token {
        let index = self.pos;
        let span = Span {
            start: index,
            end: index,
        };
        if !self.empty_line {
            self.empty_line = true;
            self.at_line_start = true;
            return Token::new(TokenKind::Newline, span);
        }
        if self.current_indent > 0 {
            self.current_indent -= 1;
            return Token::new(TokenKind::Dedent, span);
        }
        Token::new(TokenKind::Eof, span)
    }

    fn skip_leading_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\n') => {
                    self.consume_char();
                }
                Some('#') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek_char() == Some(' ') {
            self.consume_char();
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek_char() {
            if !ch.is_alphanumeric() && ch != '_' {
                break;
            }
            self.consume_char();
        }
        let ident = &self.input[start..self.pos];

        let kind = match ident {
            "class" => TokenKind::Class,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "def" => TokenKind::Def,
            "print" => TokenKind::Print,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => TokenKind::Id(ident.to_string()),
        };
        Token::new(
            kind,
            Span {
                start,
                end: self.pos,
            },
        )
    }

    fn read_number(&mut self, start: usize) -> LexResult<Token> {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
        let literal = &self.input[start..self.pos];

        let mut value: i64 = 0;
        for ch in literal.bytes() {
            let digit = i64::from(ch - b'0');
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| LexError::InvalidNumber {
                    literal: literal.to_string(),
                    position: start,
                })?;
        }
        Ok(Token::new(
            TokenKind::Number(value),
            Span {
                start,
                end: self.pos,
            },
        ))
    }

    fn read_string(&mut self, quote: char, start: usize) -> LexResult<Token> {
        self.consume_char(); // opening quote

        let mut value = String::new();
        loop {
            match self.consume_char() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString { position: start });
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escape_position = self.pos;
                    match self.consume_char() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some(other) => {
                            return Err(LexError::UnknownEscape {
                                character: other,
                                position: escape_position,
                            });
                        }
                        None => {
                            return Err(LexError::UnterminatedString { position: start });
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }
        Ok(Token::new(
            TokenKind::String(value),
            Span {
                start,
                end: self.pos,
            },
        ))
    }

    fn read_operator(&mut self, first: char, start: usize) -> Token {
        self.consume_char();
        let kind = match (first, self.peek_char()) {
            ('=', Some('=')) => {
                self.consume_char();
                TokenKind::Eq
            }
            ('!', Some('=')) => {
                self.consume_char();
                TokenKind::NotEq
            }
            ('<', Some('=')) => {
                self.consume_char();
                TokenKind::LessOrEq
            }
            ('>', Some('=')) => {
                self.consume_char();
                TokenKind::GreaterOrEq
            }
            _ => TokenKind::Char(first),
        };
        Token::new(
            kind,
            Span {
                start,
                end: self.pos,
            },
        )
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

/// Collects the whole token stream, `Eof` included.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input)?;
    let mut tokens = vec![lexer.current().clone()];
    while !matches!(tokens.last().map(Token::kind), Some(TokenKind::Eof)) {
        tokens.push(lexer.next_token()?.clone());
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn balances_indent_and_dedent_around_a_block() {
        let input = "if x:\n  print 1\nprint 2\n";
        let expected = vec![
            TokenKind::If,
            TokenKind::Id("x".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Print,
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Print,
            TokenKind::Number(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn collapses_comments_and_blank_lines() {
        let input = "\n# hi\nx = 1\n\n\n";
        let expected = vec![
            TokenKind::Id("x".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn closes_several_levels_with_one_dedent_each() {
        let input = indoc! {"
            if a:
              if b:
                x = 1
            y = 2
        "};
        let expected = vec![
            TokenKind::If,
            TokenKind::Id("a".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::If,
            TokenKind::Id("b".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Id("x".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Dedent,
            TokenKind::Id("y".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn synthesizes_newline_and_dedent_at_eof() {
        let input = "if x:\n  y = 1";
        let expected = vec![
            TokenKind::If,
            TokenKind::Id("x".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Id("y".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn ignores_indentation_of_the_first_line() {
        let input = "    x = 1\n";
        let expected = vec![
            TokenKind::Id("x".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn space_only_lines_do_not_change_indentation() {
        let input = "if x:\n  a = 1\n   \n  b = 2\n";
        let expected = vec![
            TokenKind::If,
            TokenKind::Id("x".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Id("a".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Id("b".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(2),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn comment_only_lines_do_not_change_indentation() {
        let input = "if x:\n  a = 1\n    # deep comment\n  b = 2\n";
        let expected = vec![
            TokenKind::If,
            TokenKind::Id("x".to_string()),
            TokenKind::Char(':'),
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Id("a".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(1),
            TokenKind::Newline,
            TokenKind::Id("b".to_string()),
            TokenKind::Char('='),
            TokenKind::Number(2),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn recognizes_keywords_and_operators() {
        let input = "class def return if else print and or not None True False\n";
        let expected = vec![
            TokenKind::Class,
            TokenKind::Def,
            TokenKind::Return,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Print,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::None,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);

        let input = "a == b != c <= d >= e < f > g\n";
        let expected = vec![
            TokenKind::Id("a".to_string()),
            TokenKind::Eq,
            TokenKind::Id("b".to_string()),
            TokenKind::NotEq,
            TokenKind::Id("c".to_string()),
            TokenKind::LessOrEq,
            TokenKind::Id("d".to_string()),
            TokenKind::GreaterOrEq,
            TokenKind::Id("e".to_string()),
            TokenKind::Char('<'),
            TokenKind::Id("f".to_string()),
            TokenKind::Char('>'),
            TokenKind::Id("g".to_string()),
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn reads_string_literals_with_escapes() {
        let input = "a = 'it\\'s'\nb = \"tab\\there\\nand \\\\ quote \\\"q\\\"\"\n";
        let tokens = kinds(input);
        assert_eq!(tokens[2], TokenKind::String("it's".to_string()));
        assert_eq!(
            tokens[6],
            TokenKind::String("tab\there\nand \\ quote \"q\"".to_string())
        );
    }

    #[test]
    fn errors_on_unknown_escape() {
        let err = tokenize("x = \"bad \\q\"\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnknownEscape {
                character: 'q',
                position: 10,
            }
        );
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("x = \"abc").expect_err("expected unterminated string failure");
        assert_eq!(err, LexError::UnterminatedString { position: 4 });

        let err = tokenize("x = \"abc\ny = 1\n").expect_err("expected unterminated string failure");
        assert_eq!(err, LexError::UnterminatedString { position: 4 });
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err =
            tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow failure");
        assert!(matches!(err, LexError::InvalidNumber { .. }));
        assert!(err.to_string().contains("Invalid integer literal"));
    }

    #[test]
    fn errors_on_tab_indentation() {
        let err = tokenize("x = 1\n\ty = 2\n").expect_err("expected tab indentation failure");
        assert_eq!(err, LexError::TabIndentation { position: 6 });
    }

    #[test]
    fn exposes_a_single_token_of_lookahead() {
        let mut lexer = Lexer::new("x = 1\n").expect("lexer should start");
        assert_eq!(lexer.current().kind, TokenKind::Id("x".to_string()));
        assert_eq!(lexer.current().kind, TokenKind::Id("x".to_string()));
        assert_eq!(lexer.next_token().expect("next").kind, TokenKind::Char('='));
        assert_eq!(lexer.current().kind, TokenKind::Char('='));
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("\n\n# only comments\n"), vec![TokenKind::Eof]);
    }
}
