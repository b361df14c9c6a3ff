use crate::Result;

use tablet_core::{
    schema::{FieldTy, Model},
    stmt::Record,
    Error,
};

use std::str::FromStr;

/// The fields a read returns.
///
/// `*` stands for every scalar and foreign key field. Relations are only
/// loaded when named, optionally with a nested selection:
///
/// ```text
/// id, name, parent { * }, categories { name }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    all: bool,
    fields: Vec<(String, Option<Selection>)>,
}

impl Selection {
    /// Every scalar and foreign key field.
    pub fn all() -> Selection {
        Selection {
            all: true,
            fields: vec![],
        }
    }

    pub fn parse(src: &str) -> Result<Selection> {
        let mut parser = Parser {
            src,
            tokens: tokenize(src)?,
            pos: 0,
        };

        if parser.tokens.is_empty() {
            return Ok(Selection::all());
        }

        let selection = parser.list()?;

        if let Some(token) = parser.peek() {
            return Err(parser.error(&format!("unexpected `{token}`")));
        }

        Ok(selection)
    }

    /// Adds a field, with a nested selection when it is a relation.
    pub fn field(mut self, name: impl Into<String>, nested: Option<Selection>) -> Selection {
        self.fields.push((name.into(), nested));
        self
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, Option<&Selection>)> {
        self.fields
            .iter()
            .map(|(name, nested)| (name.as_str(), nested.as_ref()))
    }

    /// Selects `*` plus every relation a mutation payload touched, so the
    /// returned row shows what was connected or created.
    pub(crate) fn for_payload(model: &Model, data: &Record) -> Selection {
        let mut selection = Selection::all();

        for (name, value) in data.iter() {
            let Some(field) = model.field(name) else {
                continue;
            };

            let nested = match &field.ty {
                FieldTy::Related(_) => true,
                FieldTy::ForeignKey(_) => value.is_record(),
                FieldTy::Primitive(_) => false,
            };

            if nested {
                selection = selection.field(name, Some(Selection::all()));
            }
        }

        selection
    }
}

impl FromStr for Selection {
    type Err = Error;

    fn from_str(src: &str) -> Result<Selection> {
        Selection::parse(src)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Ident(&'a str),
    Star,
    Comma,
    Open,
    Close,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(ident) => f.write_str(ident),
            Token::Star => f.write_str("*"),
            Token::Comma => f.write_str(","),
            Token::Open => f.write_str("{"),
            Token::Close => f.write_str("}"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = vec![];
    let mut chars = src.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '*' => Token::Star,
            ',' => Token::Comma,
            '{' => Token::Open,
            '}' => Token::Close,
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();

                while let Some(&(index, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    end = index + next.len_utf8();
                    chars.next();
                }

                Token::Ident(&src[start..end])
            }
            c => {
                return Err(Error::invalid_payload(format!(
                    "invalid selection `{src}`: unexpected character `{c}`"
                )))
            }
        };

        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn list(&mut self) -> Result<Selection> {
        let mut selection = Selection::default();

        loop {
            match self.next() {
                Some(Token::Star) => selection.all = true,
                Some(Token::Ident(name)) => {
                    let nested = if self.peek() == Some(&Token::Open) {
                        self.pos += 1;
                        let nested = self.list()?;
                        self.expect(Token::Close)?;
                        Some(nested)
                    } else {
                        None
                    };
                    selection.fields.push((name.to_string(), nested));
                }
                Some(token) => return Err(self.error(&format!("unexpected `{token}`"))),
                None => return Err(self.error("expected a field")),
            }

            if self.peek() != Some(&Token::Comma) {
                return Ok(selection);
            }

            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(&format!("expected `{expected}`, found `{token}`"))),
            None => Err(self.error(&format!("expected `{expected}`"))),
        }
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn error(&self, message: &str) -> Error {
        Error::invalid_payload(format!("invalid selection `{}`: {message}", self.src))
    }
}
