use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected '{found}' at byte {pos}")]
    UnexpectedChar { found: char, pos: usize },
    #[error("Unterminated string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("Trailing content at byte {0}")]
    TrailingContent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading atom of a list: `segment` in `(segment ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// Everything after the tag.
    pub fn args(&self) -> &[SExp] {
        match self {
            SExp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// First child list tagged `key`.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.args().iter().find(|item| item.tag() == Some(key))
    }

    /// Every child list tagged `key`.
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.args().iter().filter(move |item| item.tag() == Some(key))
    }

    /// Atom argument `index` (0 = first after the tag).
    pub fn atom(&self, index: usize) -> Option<&str> {
        self.args().get(index)?.as_atom()
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        self.atom(index)?.parse().ok()
    }

    /// `(key value ...)` child's first argument as an atom.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.child(key)?.atom(0)
    }

    pub fn value_f64(&self, key: &str) -> Option<f64> {
        self.child(key)?.number(0)
    }

    /// Bare flag atom among the arguments, e.g. `locked`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args().iter().any(|a| a.as_atom() == Some(flag))
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                let bare = !s.is_empty()
                    && !s.chars().any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"');
                if bare {
                    write!(f, "{}", s)
                } else {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                }
            }
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Reader for KiCad's s-expression files.
pub struct SExpParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SExpParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse exactly one expression; anything but whitespace after it is an error.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        let root = self.parse_sexp()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError::TrailingContent(self.pos));
        }
        Ok(root)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedChar { found: ')', pos: self.pos }),
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_symbol()),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof),
                Some(')') => {
                    self.bump();
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.parse_sexp()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let opened = self.pos;
        self.bump();
        let mut s = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '"' => return Ok(SExp::Atom(s)),
                '\\' => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(other) => s.push(other),
                    None => break,
                },
                other => s.push(other),
            }
        }
        Err(ParseError::UnterminatedString(opened))
    }

    fn parse_symbol(&mut self) -> SExp {
        let begin = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.bump();
        }
        SExp::Atom(self.input[begin..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }
}
