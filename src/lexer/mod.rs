use crate::errors::{CompileError, ErrorCode};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Int,
    Float,
    Bool,
    Str,
    Struct,
    Fn,
    Return,
    True,
    False,

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Identifiers
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Bang,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Question,
    Colon,
    At,
    Dot,
    Arrow,

    Eof,
}

impl Token {
    fn keyword(word: &str) -> Option<Token> {
        match word {
            "int" => Some(Token::Int),
            "float" => Some(Token::Float),
            "bool" => Some(Token::Bool),
            "string" => Some(Token::Str),
            "struct" => Some(Token::Struct),
            "fn" => Some(Token::Fn),
            "return" => Some(Token::Return),
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    pub errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.next();
        if let Some(c) = ch {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn peek(&mut self) -> Option<&char> {
        self.input.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(&ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self, line: usize, column: usize) -> Token {
        let mut result = String::new();
        loop {
            match self.peek() {
                Some(&'"') => {
                    self.advance();
                    break;
                }
                Some(&'\\') => {
                    self.advance();
                    if let Some(&escaped) = self.peek() {
                        match escaped {
                            'n' => result.push('\n'),
                            't' => result.push('\t'),
                            'r' => result.push('\r'),
                            '\\' => result.push('\\'),
                            '"' => result.push('"'),
                            '0' => result.push('\0'),
                            _ => result.push(escaped),
                        }
                        self.advance();
                    }
                }
                Some(&ch) => {
                    if ch == '\n' {
                        self.errors.push(
                            CompileError::new(
                                ErrorCode::MissingQuote,
                                "string literal is missing a closing quote",
                            )
                            .with_location(crate::errors::SourceLocation::new(
                                "", line, column, "",
                            )),
                        );
                        break;
                    }
                    result.push(ch);
                    self.advance();
                }
                None => {
                    self.errors.push(
                        CompileError::new(
                            ErrorCode::MissingQuote,
                            "string literal is missing a closing quote",
                        )
                        .with_location(crate::errors::SourceLocation::new("", line, column, "")),
                    );
                    break;
                }
            }
        }
        Token::StringLiteral(result)
    }

    fn read_number(&mut self, first: char, line: usize, column: usize) -> Token {
        let mut num = String::from(first);
        let mut is_float = false;

        while let Some(&ch) = self.peek() {
            if ch.is_ascii_digit() {
                num.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                // Only a float if a digit follows the dot; `p.x` keeps its dot.
                let mut lookahead = self.input.clone();
                lookahead.next();
                match lookahead.peek() {
                    Some(next) if next.is_ascii_digit() => {
                        is_float = true;
                        num.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }

        if is_float {
            match num.parse::<f64>() {
                Ok(f) => Token::FloatLiteral(f),
                Err(_) => {
                    self.errors.push(
                        CompileError::new(
                            ErrorCode::InvalidFloatLiteral,
                            &format!("invalid float literal '{}'", num),
                        )
                        .with_location(crate::errors::SourceLocation::new("", line, column, "")),
                    );
                    Token::FloatLiteral(0.0)
                }
            }
        } else {
            match num.parse::<i64>() {
                Ok(n) => Token::IntLiteral(n),
                Err(_) => {
                    self.errors.push(
                        CompileError::new(
                            ErrorCode::InvalidExpression,
                            &format!("integer literal '{}' is out of range", num),
                        )
                        .with_location(crate::errors::SourceLocation::new("", line, column, "")),
                    );
                    Token::IntLiteral(0)
                }
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some(&ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::keyword(&word).unwrap_or(Token::Identifier(word))
    }

    pub fn tokenize(&mut self) -> Vec<TokenInfo> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            let line = self.line;
            let column = self.column;

            let ch = match self.advance() {
                Some(c) => c,
                None => break,
            };

            let token = match ch {
                '/' if self.peek() == Some(&'/') => {
                    self.skip_line_comment();
                    continue;
                }
                '"' => self.read_string(line, column),
                c if c.is_ascii_digit() => self.read_number(c, line, column),
                c if c.is_alphabetic() || c == '_' => self.read_identifier(c),
                '+' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::PlusAssign
                    }
                    Some(&'+') => {
                        self.advance();
                        Token::PlusPlus
                    }
                    _ => Token::Plus,
                },
                '-' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::MinusAssign
                    }
                    Some(&'-') => {
                        self.advance();
                        Token::MinusMinus
                    }
                    Some(&'>') => {
                        self.advance();
                        Token::Arrow
                    }
                    _ => Token::Minus,
                },
                '*' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::StarAssign
                    }
                    _ => Token::Star,
                },
                '/' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::SlashAssign
                    }
                    _ => Token::Slash,
                },
                '%' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::PercentAssign
                    }
                    _ => Token::Percent,
                },
                '=' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::EqEq
                    }
                    _ => Token::Assign,
                },
                '!' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::NotEq
                    }
                    _ => Token::Bang,
                },
                '<' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::LessEq
                    }
                    _ => Token::Less,
                },
                '>' => match self.peek() {
                    Some(&'=') => {
                        self.advance();
                        Token::GreaterEq
                    }
                    _ => Token::Greater,
                },
                '&' if self.peek() == Some(&'&') => {
                    self.advance();
                    Token::AndAnd
                }
                '|' if self.peek() == Some(&'|') => {
                    self.advance();
                    Token::OrOr
                }
                '(' => Token::LParen,
                ')' => Token::RParen,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                ',' => Token::Comma,
                ';' => Token::Semicolon,
                '?' => Token::Question,
                ':' => Token::Colon,
                '@' => Token::At,
                '.' => Token::Dot,
                other => {
                    self.errors.push(
                        CompileError::new(
                            ErrorCode::UnexpectedToken,
                            &format!("unexpected character '{}'", other),
                        )
                        .with_location(crate::errors::SourceLocation::new("", line, column, "")),
                    );
                    continue;
                }
            };

            tokens.push(TokenInfo { token, line, column });
        }

        tokens.push(TokenInfo {
            token: Token::Eof,
            line: self.line,
            column: self.column,
        });
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        assert!(lexer.errors.is_empty(), "unexpected lex errors: {:?}", lexer.errors);
        tokens.into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_declaration() {
        let tokens = lex("int x = 5;");
        assert_eq!(
            tokens,
            vec![
                Token::Int,
                Token::Identifier("x".to_string()),
                Token::Assign,
                Token::IntLiteral(5),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_loop_and_compound_assign() {
        let tokens = lex("@ i > 0 { i -= 1; }");
        assert_eq!(tokens[0], Token::At);
        assert!(tokens.contains(&Token::Greater));
        assert!(tokens.contains(&Token::MinusAssign));
    }

    #[test]
    fn test_float_vs_member_dot() {
        let tokens = lex("float a = 3.0; p.x");
        assert!(tokens.contains(&Token::FloatLiteral(3.0)));
        assert!(tokens.contains(&Token::Dot));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = lex("\"hi\\n\"");
        assert_eq!(tokens[0], Token::StringLiteral("hi\n".to_string()));
    }

    #[test]
    fn test_arrow_and_operators() {
        let tokens = lex("fn add(int a, int b) -> int { return a + b; }");
        assert!(tokens.contains(&Token::Arrow));
        assert!(tokens.contains(&Token::Fn));
    }

    #[test]
    fn test_missing_quote_reported() {
        let mut lexer = Lexer::new("string s = \"oops;");
        let _ = lexer.tokenize();
        assert!(lexer
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::MissingQuote));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = lex("int x = 1; // trailing\n// full line\nx++;");
        assert!(tokens.contains(&Token::PlusPlus));
        assert!(!tokens.iter().any(|t| matches!(t, Token::Identifier(s) if s == "trailing")));
    }
}
