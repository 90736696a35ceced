//! Reads the header of a GraphQL document: operation type, operation name and
//! the first root field with its arguments.
//!
//! Selection sets below the root field are skipped; resolvers always return
//! the full object shape.

use serde_json::{Number, Value};

use crate::{error::OperationError, protocol::Variables};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Variable(String),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub field: String,
    pub arguments: Vec<(String, ArgumentValue)>,
}

impl Operation {
    /// Key under which the root field's result appears in `data`.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field)
    }

    pub fn resolve_arguments(&self, variables: &Variables) -> Result<Variables, OperationError> {
        let mut resolved = Variables::new();
        for (name, value) in &self.arguments {
            let value = match value {
                ArgumentValue::Literal(value) => value.clone(),
                ArgumentValue::Variable(var) => variables
                    .get(var)
                    .cloned()
                    .ok_or_else(|| OperationError::MissingVariable(var.clone()))?,
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }
}

pub fn parse_operation(document: &str) -> Result<Operation, OperationError> {
    let mut cursor = Cursor::new(document);
    cursor.skip_ignored();

    let (kind, name) = match cursor.peek() {
        None => return Err(OperationError::Empty),
        Some('{') => (OperationKind::Query, None),
        Some(_) => {
            let keyword = cursor.name()?;
            let kind = match keyword.as_str() {
                "query" => OperationKind::Query,
                "mutation" => OperationKind::Mutation,
                "subscription" => OperationKind::Subscription,
                _ => return Err(OperationError::UnknownOperationType(keyword)),
            };
            cursor.skip_ignored();
            let name = if cursor.peek().is_some_and(is_name_start) {
                Some(cursor.name()?)
            } else {
                None
            };
            cursor.skip_ignored();
            if cursor.peek() == Some('(') {
                cursor.skip_balanced('(', ')')?;
            }
            cursor.skip_directives()?;
            (kind, name)
        }
    };

    cursor.expect('{')?;
    let first = cursor.name()?;
    cursor.skip_ignored();
    let (alias, field) = if cursor.peek() == Some(':') {
        cursor.bump();
        (Some(first), cursor.name()?)
    } else {
        (None, first)
    };

    let mut arguments = Vec::new();
    cursor.skip_ignored();
    if cursor.peek() == Some('(') {
        cursor.bump();
        loop {
            cursor.skip_ignored();
            if cursor.peek() == Some(')') {
                cursor.bump();
                break;
            }
            let arg = cursor.name()?;
            cursor.expect(':')?;
            let value = cursor.value()?;
            arguments.push((arg, value));
        }
    }

    Ok(Operation {
        kind,
        name,
        alias,
        field,
        arguments,
    })
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn unexpected(&self, found: char) -> OperationError {
        OperationError::Unexpected {
            found,
            offset: self.pos,
        }
    }

    // Commas are insignificant in GraphQL.
    fn skip_ignored(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' || c == '\u{feff}' => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), OperationError> {
        self.skip_ignored();
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(found) => Err(self.unexpected(found)),
            None => Err(OperationError::UnexpectedEnd),
        }
    }

    fn name(&mut self) -> Result<String, OperationError> {
        self.skip_ignored();
        match self.peek() {
            Some(c) if is_name_start(c) => {}
            Some(found) => return Err(self.unexpected(found)),
            None => return Err(OperationError::UnexpectedEnd),
        }
        let start = self.pos;
        while self.peek().is_some_and(is_name_continue) {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), OperationError> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some('"') => {
                    self.string_body()?;
                }
                Some(c) if c == open => depth += 1,
                Some(c) if c == close => depth -= 1,
                Some(_) => {}
                None => return Err(OperationError::UnexpectedEnd),
            }
        }
        Ok(())
    }

    fn skip_directives(&mut self) -> Result<(), OperationError> {
        loop {
            self.skip_ignored();
            if self.peek() != Some('@') {
                return Ok(());
            }
            self.bump();
            self.name()?;
            self.skip_ignored();
            if self.peek() == Some('(') {
                self.skip_balanced('(', ')')?;
            }
        }
    }

    // Called after the opening quote has been consumed.
    fn string_body(&mut self) -> Result<String, OperationError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('u') => {
                        let start = self.pos;
                        for _ in 0..4 {
                            self.bump().ok_or(OperationError::UnterminatedString)?;
                        }
                        let code = u32::from_str_radix(&self.src[start..self.pos], 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or(OperationError::UnterminatedString)?;
                        out.push(code);
                    }
                    Some(c) => out.push(c),
                    None => return Err(OperationError::UnterminatedString),
                },
                Some('\n') | None => return Err(OperationError::UnterminatedString),
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, OperationError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let raw = &self.src[start..self.pos];
        let invalid = || OperationError::InvalidNumber(raw.to_string());
        if raw.contains(['.', 'e', 'E']) {
            let parsed: f64 = raw.parse().map_err(|_| invalid())?;
            Number::from_f64(parsed).map(Value::Number).ok_or_else(invalid)
        } else {
            let parsed: i64 = raw.parse().map_err(|_| invalid())?;
            Ok(Value::Number(parsed.into()))
        }
    }

    fn value(&mut self) -> Result<ArgumentValue, OperationError> {
        self.skip_ignored();
        match self.peek() {
            Some('$') => {
                self.bump();
                Ok(ArgumentValue::Variable(self.name()?))
            }
            Some('"') => {
                self.bump();
                Ok(ArgumentValue::Literal(Value::String(self.string_body()?)))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(ArgumentValue::Literal(self.number()?)),
            Some(c) if is_name_start(c) => {
                let word = self.name()?;
                let value = match word.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ => Value::String(word),
                };
                Ok(ArgumentValue::Literal(value))
            }
            Some(found) => Err(self.unexpected(found)),
            None => Err(OperationError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
#[path = "tests/graphql_tests.rs"]
mod tests;
