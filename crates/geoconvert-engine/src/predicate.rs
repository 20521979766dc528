//! Attribute predicates (`-where` clauses)
//!
//! Supported grammar, keywords case-insensitive:
//!
//! ```text
//! expr       := and_expr ( OR and_expr )*
//! and_expr   := unary ( AND unary )*
//! unary      := NOT unary | '(' expr ')' | comparison
//! comparison := ident op literal
//!             | ident [NOT] IN '(' literal ( ',' literal )* ')'
//!             | ident IS [NOT] NULL
//! op         := = | != | <> | < | <= | > | >=
//! ```
//!
//! The pseudo-field `OGR_GEOMETRY` compares against the feature's geometry
//! type token (`POINT`, `MULTILINESTRING`, ...).

use crate::model::{MemoryFeature, MemoryLayer};
use geoconvert_core::models::FieldValue;
use geoconvert_core::{GeoconvertError, Result};
use std::cmp::Ordering;

const GEOMETRY_FIELD: &str = "OGR_GEOMETRY";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
}

/// A parsed predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare { field: String, op: CompareOp, value: Literal },
    In { field: String, values: Vec<Literal>, negated: bool },
    IsNull { field: String, negated: bool },
}

impl Predicate {
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens: &tokens, pos: 0, input };
        let predicate = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(predicate)
    }

    /// Check that every referenced field exists in the layer
    pub fn validate(&self, layer: &MemoryLayer) -> Result<()> {
        match self {
            Predicate::Or(items) | Predicate::And(items) => {
                items.iter().try_for_each(|p| p.validate(layer))
            }
            Predicate::Not(inner) => inner.validate(layer),
            Predicate::Compare { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNull { field, .. } => {
                if field.eq_ignore_ascii_case(GEOMETRY_FIELD) || layer.field_index(field).is_some() {
                    Ok(())
                } else {
                    Err(GeoconvertError::Engine(format!(
                        "\"{}\" not recognised as an available field of layer {}",
                        field, layer.name
                    )))
                }
            }
        }
    }

    pub fn matches(&self, layer: &MemoryLayer, feature: &MemoryFeature) -> bool {
        match self {
            Predicate::Or(items) => items.iter().any(|p| p.matches(layer, feature)),
            Predicate::And(items) => items.iter().all(|p| p.matches(layer, feature)),
            Predicate::Not(inner) => !inner.matches(layer, feature),
            Predicate::Compare { field, op, value } => match resolve(layer, feature, field) {
                Some(actual) => compare(&actual, value).is_some_and(|o| op.accepts(o)),
                None => false,
            },
            Predicate::In { field, values, negated } => match resolve(layer, feature, field) {
                Some(actual) => {
                    let found = values
                        .iter()
                        .any(|v| compare(&actual, v) == Some(Ordering::Equal));
                    found != *negated
                }
                None => false,
            },
            Predicate::IsNull { field, negated } => {
                resolve(layer, feature, field).is_none() != *negated
            }
        }
    }
}

/// All predicates must hold; used when several `Where` directives apply
pub fn matches_all(predicates: &[Predicate], layer: &MemoryLayer, feature: &MemoryFeature) -> bool {
    predicates.iter().all(|p| p.matches(layer, feature))
}

fn resolve(layer: &MemoryLayer, feature: &MemoryFeature, field: &str) -> Option<Literal> {
    if field.eq_ignore_ascii_case(GEOMETRY_FIELD) {
        return feature
            .geometry
            .as_ref()
            .map(|_| Literal::Str(feature.geometry_kind().predicate_token().to_string()));
    }

    let index = layer.field_index(field)?;
    let value = feature.values.get(index)?.as_ref()?;
    Some(match value {
        FieldValue::Integer(_) | FieldValue::Integer64(_) | FieldValue::Real(_) => {
            Literal::Num(value.as_f64()?)
        }
        other => Literal::Str(other.to_string()),
    })
}

fn compare(actual: &Literal, expected: &Literal) -> Option<Ordering> {
    match (actual, expected) {
        (Literal::Num(a), Literal::Num(b)) => a.partial_cmp(b),
        (Literal::Str(a), Literal::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        (Literal::Str(a), Literal::Num(b)) => a.trim().parse::<f64>().ok()?.partial_cmp(b),
        (Literal::Num(a), Literal::Str(b)) => a.partial_cmp(&b.trim().parse::<f64>().ok()?),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let invalid = |reason: &str| {
        GeoconvertError::Engine(format!("Invalid predicate '{}': {}", input, reason))
    };

    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '<' | '>' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('<', Some('=')) => (CompareOp::Le, 2),
                    ('<', Some('>')) => (CompareOp::Ne, 2),
                    ('<', _) => (CompareOp::Lt, 1),
                    (_, Some('=')) => (CompareOp::Ge, 2),
                    _ => (CompareOp::Gt, 1),
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                        None => return Err(invalid("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '"' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == '"')
                    .map(|offset| start + offset)
                    .ok_or_else(|| invalid("unterminated quoted identifier"))?;
                tokens.push(Token::Ident(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || matches!(chars[i], '.' | 'e' | 'E')
                        || (matches!(chars[i], '-' | '+') && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| invalid("malformed number"))?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(&format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> GeoconvertError {
        GeoconvertError::Engine(format!("Invalid predicate '{}': {}", self.input, reason))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", token)))
        }
    }

    fn expr(&mut self) -> Result<Predicate> {
        let mut items = vec![self.and_expr()?];
        while self.eat_keyword("OR") {
            items.push(self.and_expr()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::Or(items) })
    }

    fn and_expr(&mut self) -> Result<Predicate> {
        let mut items = vec![self.unary()?];
        while self.eat_keyword("AND") {
            items.push(self.unary()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Predicate::And(items) })
    }

    fn unary(&mut self) -> Result<Predicate> {
        if self.eat_keyword("NOT") {
            return Ok(Predicate::Not(Box::new(self.unary()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Predicate> {
        let field = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(self.error("expected a field name")),
        };
        self.pos += 1;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if !self.eat_keyword("NULL") {
                return Err(self.error("expected NULL"));
            }
            return Ok(Predicate::IsNull { field, negated });
        }

        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("IN") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.literal()?);
            }
            self.expect(Token::RParen)?;
            return Ok(Predicate::In { field, values, negated });
        }
        if negated {
            return Err(self.error("expected IN after NOT"));
        }

        let op = match self.peek() {
            Some(Token::Op(op)) => *op,
            _ => return Err(self.error("expected a comparison operator")),
        };
        self.pos += 1;
        let value = self.literal()?;
        Ok(Predicate::Compare { field, op, value })
    }

    fn literal(&mut self) -> Result<Literal> {
        let literal = match self.peek() {
            Some(Token::Str(text)) => Literal::Str(text.clone()),
            Some(Token::Num(number)) => Literal::Num(*number),
            _ => return Err(self.error("expected a literal")),
        };
        self.pos += 1;
        Ok(literal)
    }
}
