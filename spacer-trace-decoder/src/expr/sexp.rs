//! S-expression representation and parsing
//!
//! Solver expressions and CHC input files are both SMT-LIB, which is built on
//! S-expressions. The reader works directly on the input string and reports
//! byte positions in its errors.

use crate::types::DecoderError;
use std::fmt;

/// An S-expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SExpr {
    /// A symbol (identifier); quoted symbols are stored without their bars
    Symbol(String),
    /// A keyword (:name)
    Keyword(String),
    /// A numeral
    Numeral(String),
    /// A decimal number
    Decimal(String),
    /// A hexadecimal bitvector (#x...)
    Hexadecimal(String),
    /// A binary bitvector (#b...)
    Binary(String),
    /// A string literal, without quotes
    String(String),
    /// A list of S-expressions
    List(Vec<SExpr>),
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Symbol(s) => {
                if needs_quoting(s) {
                    write!(f, "|{s}|")
                } else {
                    write!(f, "{s}")
                }
            }
            SExpr::Keyword(k) => write!(f, "{k}"),
            SExpr::Numeral(n) => write!(f, "{n}"),
            SExpr::Decimal(d) => write!(f, "{d}"),
            SExpr::Hexadecimal(h) => write!(f, "{h}"),
            SExpr::Binary(b) => write!(f, "{b}"),
            SExpr::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl SExpr {
    /// Check if this is a symbol with the given name
    #[must_use]
    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, SExpr::Symbol(s) if s == name)
    }

    /// Get the symbol name if this is a symbol
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list contents if this is a list
    #[must_use]
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Head symbol of a list, e.g. `and` in `(and a b)`
    #[must_use]
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }
}

/// Symbols that must be printed between bars to read back unchanged
fn needs_quoting(symbol: &str) -> bool {
    symbol.is_empty()
        || symbol.starts_with(|c: char| c.is_ascii_digit())
        || symbol.chars().any(|c| c.is_whitespace() || is_delimiter(c) || c == '|')
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | ';' | '"' | '|')
}

/// Parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Byte position in input (if available)
    pub position: Option<usize>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "Parse error at position {}: {}", pos, self.message)
        } else {
            write!(f, "Parse error: {}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// Create a new parse error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            position: None,
        }
    }

    /// Create a new parse error with position
    #[must_use]
    pub fn with_position(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl From<ParseError> for DecoderError {
    fn from(e: ParseError) -> Self {
        DecoderError::ExpressionParseError(e.to_string())
    }
}

/// S-expression parser
pub struct SExprParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SExprParser<'a> {
    /// Create a new parser for the given input
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        SExprParser { input, pos: 0 }
    }

    /// True once only whitespace and comments remain
    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace_and_comments();
        self.pos >= self.input.len()
    }

    /// Parse a single S-expression
    pub fn parse_sexp(&mut self) -> Result<SExpr, ParseError> {
        self.skip_whitespace_and_comments();
        match self.peek_char() {
            None => Err(ParseError::with_position("Unexpected end of input", self.pos)),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::with_position("Unexpected ')'", self.pos)),
            Some('|') => self.parse_quoted_symbol(),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_atom(),
        }
    }

    /// Parse every remaining S-expression
    pub fn parse_all(&mut self) -> Result<Vec<SExpr>, ParseError> {
        let mut result = Vec::new();
        while !self.is_at_end() {
            result.push(self.parse_sexp()?);
        }
        Ok(result)
    }

    fn parse_list(&mut self) -> Result<SExpr, ParseError> {
        let start = self.pos;
        self.advance(); // consume '('

        let mut items = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek_char() {
                None => {
                    return Err(ParseError::with_position(
                        "Unexpected end of input: unclosed '('",
                        start,
                    ))
                }
                Some(')') => {
                    self.advance();
                    return Ok(SExpr::List(items));
                }
                Some(_) => items.push(self.parse_sexp()?),
            }
        }
    }

    fn parse_quoted_symbol(&mut self) -> Result<SExpr, ParseError> {
        let start = self.pos;
        self.advance(); // consume opening '|'
        let rest = &self.input[self.pos..];
        match rest.find('|') {
            Some(end) => {
                let symbol = rest[..end].to_string();
                self.pos += end + 1;
                Ok(SExpr::Symbol(symbol))
            }
            None => Err(ParseError::with_position("Unterminated quoted symbol", start)),
        }
    }

    fn parse_string(&mut self) -> Result<SExpr, ParseError> {
        let start = self.pos;
        self.advance(); // consume opening '"'
        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == '"' {
                // "" is an escaped quote
                if self.peek_char() == Some('"') {
                    self.advance();
                    value.push('"');
                } else {
                    return Ok(SExpr::String(value));
                }
            } else {
                value.push(c);
            }
        }
        Err(ParseError::with_position("Unterminated string literal", start))
    }

    fn parse_atom(&mut self) -> Result<SExpr, ParseError> {
        let start = self.pos;
        let token = self.read_token();
        if token.is_empty() {
            return Err(ParseError::with_position("Invalid token", start));
        }

        let atom = if let Some(hex) = token.strip_prefix("#x") {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseError::with_position("Invalid hexadecimal literal", start));
            }
            SExpr::Hexadecimal(token.to_string())
        } else if let Some(bin) = token.strip_prefix("#b") {
            if bin.is_empty() || !bin.chars().all(|c| c == '0' || c == '1') {
                return Err(ParseError::with_position("Invalid binary literal", start));
            }
            SExpr::Binary(token.to_string())
        } else if token.starts_with(':') {
            SExpr::Keyword(token.to_string())
        } else if token.chars().all(|c| c.is_ascii_digit()) {
            SExpr::Numeral(token.to_string())
        } else if is_decimal(token) {
            SExpr::Decimal(token.to_string())
        } else {
            SExpr::Symbol(token.to_string())
        };
        Ok(atom)
    }

    fn read_token(&mut self) -> &'a str {
        let rest = &self.input[self.pos..];
        let end = rest
            .find(|c: char| c.is_whitespace() || is_delimiter(c))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else if c == ';' {
                // Comment runs to end of line
                let rest = &self.input[self.pos..];
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn is_decimal(token: &str) -> bool {
    match token.split_once('.') {
        Some((int, frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Parse exactly one S-expression; anything after it is an error
pub fn parse_single(input: &str) -> Result<SExpr, ParseError> {
    let mut parser = SExprParser::new(input);
    let sexp = parser.parse_sexp()?;
    if !parser.is_at_end() {
        return Err(ParseError::with_position(
            "Unexpected input after expression",
            parser.pos,
        ));
    }
    Ok(sexp)
}

/// Parse all S-expressions in the input
pub fn parse_all(input: &str) -> Result<Vec<SExpr>, ParseError> {
    SExprParser::new(input).parse_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> SExpr {
        SExpr::Symbol(s.to_string())
    }

    #[test]
    fn test_parse_nested_list() {
        let sexp = parse_single("(and (<= x 3) (not b))").unwrap();
        assert_eq!(
            sexp,
            SExpr::List(vec![
                sym("and"),
                SExpr::List(vec![sym("<="), sym("x"), SExpr::Numeral("3".to_string())]),
                SExpr::List(vec![sym("not"), sym("b")]),
            ])
        );
        assert_eq!(sexp.head_symbol(), Some("and"));
    }

    #[test]
    fn test_atoms() {
        assert_eq!(parse_single("42").unwrap(), SExpr::Numeral("42".to_string()));
        assert_eq!(parse_single("1.5").unwrap(), SExpr::Decimal("1.5".to_string()));
        assert_eq!(parse_single("#xFF").unwrap(), SExpr::Hexadecimal("#xFF".to_string()));
        assert_eq!(parse_single("#b101").unwrap(), SExpr::Binary("#b101".to_string()));
        assert_eq!(parse_single(":named").unwrap(), SExpr::Keyword(":named".to_string()));
        assert_eq!(parse_single("\"a\"\"b\"").unwrap(), SExpr::String("a\"b".to_string()));
        assert_eq!(parse_single("|main@%x_0_n|").unwrap(), sym("main@%x_0_n"));
    }

    #[test]
    fn test_comments_and_whitespace() {
        let all = parse_all("; header\n(a)\n\n  ; between\n(b c) ; trailing").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].to_string(), "(b c)");
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let err = parse_single("(and (<= x 3)\n(not").unwrap_err();
        assert_eq!(err.position, Some(14));
        assert!(parse_single("").is_err());
        assert!(parse_single("|abc").is_err());
        assert!(parse_single("\"abc").is_err());
    }

    #[test]
    fn test_trailing_input_is_an_error() {
        assert!(parse_single("(a) (b)").is_err());
        assert!(parse_single("(a))").is_err());
        assert!(parse_single("(a) ; comment").is_ok());
    }

    #[test]
    fn test_display_requotes_symbols() {
        let sexp = parse_single("(= |a b| x)").unwrap();
        assert_eq!(sexp.to_string(), "(= |a b| x)");
    }
}
