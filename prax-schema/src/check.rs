//! Parser for the CHECK-expression mini-language.
//!
//! Declared `check` strings use a small JS-like boolean expression
//! grammar (see [`parse`]) rather than raw SQL, so that default/check
//! authors don't need to know PostgreSQL operator spelling. The parser
//! is a straightforward recursive-descent implementation over a
//! hand-rolled tokenizer; there is no AST reuse with a general SQL
//! dialect since the supported grammar is deliberately tiny and closed.

use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    True,
    False,
    Null,
    And,
    Or,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            pos: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' => {
                    self.bump();
                }
                '(' => {
                    self.bump();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    self.bump();
                    tokens.push(Token::RParen);
                }
                '[' => {
                    self.bump();
                    tokens.push(Token::LBracket);
                }
                ']' => {
                    self.bump();
                    tokens.push(Token::RBracket);
                }
                ',' => {
                    self.bump();
                    tokens.push(Token::Comma);
                }
                '+' => {
                    self.bump();
                    tokens.push(Token::Plus);
                }
                '-' if !self.is_number_start_next() => {
                    self.bump();
                    tokens.push(Token::Minus);
                }
                '*' => {
                    self.bump();
                    tokens.push(Token::Star);
                }
                '/' => {
                    self.bump();
                    tokens.push(Token::Slash);
                }
                '!' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('=') => {
                            self.bump();
                            if self.chars.peek() == Some(&'=') {
                                self.bump();
                            }
                            tokens.push(Token::NotEq);
                        }
                        _ => tokens.push(Token::Not),
                    }
                }
                '=' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('=') => {
                            self.bump();
                            if self.chars.peek() == Some(&'=') {
                                self.bump();
                            }
                            tokens.push(Token::Eq);
                        }
                        _ => return Err("unexpected character '='".to_string()),
                    }
                }
                '<' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        tokens.push(Token::LtEq);
                    } else {
                        tokens.push(Token::Lt);
                    }
                }
                '>' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        tokens.push(Token::GtEq);
                    } else {
                        tokens.push(Token::Gt);
                    }
                }
                '&' => {
                    self.bump();
                    if self.chars.peek() == Some(&'&') {
                        self.bump();
                        tokens.push(Token::AndAnd);
                    } else {
                        return Err("unexpected character '&'".to_string());
                    }
                }
                '|' => {
                    self.bump();
                    if self.chars.peek() == Some(&'|') {
                        self.bump();
                        tokens.push(Token::OrOr);
                    } else {
                        return Err("unexpected character '|'".to_string());
                    }
                }
                '\'' | '"' => {
                    let quote = c;
                    self.bump();
                    let mut s = String::new();
                    loop {
                        match self.bump() {
                            Some('\\') => match self.bump() {
                                Some(escaped) => s.push(escaped),
                                None => return Err("unterminated string".to_string()),
                            },
                            Some(ch) if ch == quote => break,
                            Some(ch) => s.push(ch),
                            None => return Err("unterminated string".to_string()),
                        }
                    }
                    tokens.push(Token::Str(s));
                }
                c if c.is_ascii_digit() || c == '-' => {
                    let mut s = String::new();
                    if c == '-' {
                        s.push(c);
                        self.bump();
                    }
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_digit() || c == '.' {
                            s.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Number(s));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut s = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            s.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    tokens.push(match s.to_uppercase().as_str() {
                        "TRUE" => Token::True,
                        "FALSE" => Token::False,
                        "NULL" => Token::Null,
                        "AND" => Token::And,
                        "OR" => Token::Or,
                        _ => Token::Ident(s),
                    });
                }
                other => return Err(format!("unexpected character '{other}'")),
            }
        }
        Ok(tokens)
    }

    fn is_number_start_next(&self) -> bool {
        // Only treat '-' as a sign when followed immediately by a digit;
        // otherwise it is the subtraction operator.
        let mut clone = self.chars.clone();
        clone.next(); // skip the '-'
        matches!(clone.peek(), Some(c) if c.is_ascii_digit())
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<String, String> {
        let expr = self.parse_or()?;
        if self.pos != self.tokens.len() {
            return Err("trailing input after expression".to_string());
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<String, String> {
        let mut left = self.parse_and()?;
        loop {
            match self.peek() {
                Some(Token::OrOr) | Some(Token::Or) => {
                    self.bump();
                    let right = self.parse_and()?;
                    left = format!("({left} OR {right})");
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<String, String> {
        let mut left = self.parse_not()?;
        loop {
            match self.peek() {
                Some(Token::AndAnd) | Some(Token::And) => {
                    self.bump();
                    let right = self.parse_not()?;
                    left = format!("({left} AND {right})");
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<String, String> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.bump();
            let inner = self.parse_not()?;
            return Ok(format!("NOT ({inner})"));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<String, String> {
        let left = self.parse_add_sub()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some("="),
            Some(Token::NotEq) => Some("<>"),
            Some(Token::Lt) => Some("<"),
            Some(Token::LtEq) => Some("<="),
            Some(Token::Gt) => Some(">"),
            Some(Token::GtEq) => Some(">="),
            _ => None,
        };
        match op {
            Some(op) => {
                self.bump();
                let right = self.parse_add_sub()?;
                Ok(format!("({left} {op} {right})"))
            }
            None => Ok(left),
        }
    }

    fn parse_add_sub(&mut self) -> Result<String, String> {
        let mut left = self.parse_mul_div()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => "+",
                Some(Token::Minus) => "-",
                _ => break,
            };
            self.bump();
            let right = self.parse_mul_div()?;
            left = format!("({left} {op} {right})");
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<String, String> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => "*",
                Some(Token::Slash) => "/",
                _ => break,
            };
            self.bump();
            let right = self.parse_primary()?;
            left = format!("({left} {op} {right})");
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Str(s)) => Ok(format!("'{}'", s.replace('\'', "''"))),
            Some(Token::True) => Ok("TRUE".to_string()),
            Some(Token::False) => Ok("FALSE".to_string()),
            Some(Token::Null) => Ok("NULL".to_string()),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.bump();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_or()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    match self.bump() {
                        Some(Token::RParen) => {}
                        _ => return Err("unbalanced parentheses".to_string()),
                    }
                    Ok(format!("{name}({})", args.join(", ")))
                } else {
                    Ok(name)
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(format!("({inner})")),
                    _ => Err("unbalanced parentheses".to_string()),
                }
            }
            Some(Token::LBracket) => {
                let mut elems = Vec::new();
                if !matches!(self.peek(), Some(Token::RBracket)) {
                    loop {
                        elems.push(self.parse_or()?);
                        if matches!(self.peek(), Some(Token::Comma)) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                match self.bump() {
                    Some(Token::RBracket) => Ok(format!("ARRAY[{}]", elems.join(", "))),
                    _ => Err("unbalanced brackets".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Parse a CHECK mini-language expression, emitting an equivalent SQL
/// boolean expression. Identifiers pass through unquoted; the caller is
/// responsible for validating they reference declared columns.
pub fn parse(src: &str) -> Result<String, String> {
    let tokens = Lexer::new(src).tokenize()?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    Parser::new(tokens).parse_expr()
}

/// Parse a CHECK expression for a specific model/column, wrapping any
/// failure in [`SchemaError::CheckSyntax`].
pub fn parse_for_column(model: &str, column: &str, src: &str) -> Result<String, SchemaError> {
    parse(src).map_err(|message| SchemaError::check_syntax(model, column, message))
}

/// Normalize SQL text for idempotence comparisons: lowercase and
/// whitespace-collapsed.
pub fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_comparison() {
        assert_eq!(parse("age >= 18").unwrap(), "(age >= 18)");
    }

    #[test]
    fn combined_logical_and_comparison_s5() {
        let sql = parse("age >= 18 && (role === 'ADMIN' || role === 'STUDENT')").unwrap();
        assert_eq!(
            sql,
            "((age >= 18) AND ((role = 'ADMIN') OR (role = 'STUDENT')))"
        );
    }

    #[test]
    fn and_or_keywords_are_synonyms() {
        let a = parse("a AND b").unwrap();
        let b = parse("a && b").unwrap();
        assert_eq!(a, b);
        let a = parse("a OR b").unwrap();
        let b = parse("a || b").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negation_wraps_not() {
        assert_eq!(parse("!active").unwrap(), "NOT (active)");
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(parse("1 + 2 * 3").unwrap(), "(1 + (2 * 3))");
    }

    #[test]
    fn array_literal() {
        assert_eq!(parse("[1, 2, 3]").unwrap(), "ARRAY[1, 2, 3]");
    }

    #[test]
    fn function_call_passthrough() {
        assert_eq!(parse("length(name) > 0").unwrap(), "(length(name) > 0)");
    }

    #[test]
    fn string_escaping() {
        assert_eq!(parse("name == 'O\\'Brien'").unwrap(), "(name = 'O''Brien')");
    }

    #[test]
    fn literals_map_to_sql_keywords() {
        assert_eq!(parse("active == true").unwrap(), "(active = TRUE)");
        assert_eq!(parse("x == null").unwrap(), "(x = NULL)");
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(parse("name == 'oops").is_err());
    }

    #[test]
    fn unbalanced_parens_fail() {
        assert!(parse("(a && b").is_err());
        assert!(parse("a && b)").is_err());
    }

    #[test]
    fn trailing_input_fails() {
        assert!(parse("a && b c").is_err());
    }

    #[test]
    fn normalize_is_stable_under_reparse_whitespace_and_case() {
        let sql = parse("a>=1&&b<=2").unwrap();
        let again = parse("a >= 1 && b <= 2").unwrap();
        assert_eq!(normalize(&sql), normalize(&again));
    }

    #[test]
    fn negative_number_literal() {
        assert_eq!(parse("balance >= -5").unwrap(), "(balance >= -5)");
    }
}
