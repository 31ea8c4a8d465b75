//! Row filter conditions.
//!
//! A condition is a boolean expression over column names:
//! comparisons (`value > 0`, `name == 'alice'`) joined by `and` / `or`,
//! with `and` binding tighter. No parentheses. Comparing against a null
//! cell is false for every operator except `!=`.

use crate::error::PipelineError;
use crate::table::Table;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub(crate) struct Comparison {
    pub column: String,
    pub op: CmpOp,
    pub literal: serde_json::Value,
}

/// A parsed condition in disjunctive normal form: OR over AND-groups.
#[derive(Debug, Clone)]
pub(crate) struct Condition {
    clauses: Vec<Vec<Comparison>>,
}

/// A condition with column names resolved to indices of one table.
#[derive(Debug, Clone)]
pub(crate) struct BoundCondition {
    clauses: Vec<Vec<(usize, CmpOp, serde_json::Value)>>,
}

impl Condition {
    pub fn parse(input: &str) -> Result<Self, PipelineError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens,
            position: 0,
            input,
        };
        let condition = parser.condition()?;
        if parser.position != parser.tokens.len() {
            return Err(PipelineError::invalid_condition(format!(
                "Trailing input in condition: {input}"
            )));
        }
        Ok(condition)
    }

    /// Resolve column names against a table's columns.
    pub fn bind(&self, table: &Table) -> Result<BoundCondition, PipelineError> {
        let clauses = self
            .clauses
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|cmp| {
                        let index = table
                            .column_index(&cmp.column)
                            .ok_or_else(|| PipelineError::column_not_found(&cmp.column))?;
                        Ok((index, cmp.op, cmp.literal.clone()))
                    })
                    .collect::<Result<Vec<_>, PipelineError>>()
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(BoundCondition { clauses })
    }
}

impl BoundCondition {
    pub fn matches(&self, row: &[serde_json::Value]) -> bool {
        self.clauses.iter().any(|group| {
            group.iter().all(|(index, op, literal)| {
                let cell = row.get(*index).unwrap_or(&serde_json::Value::Null);
                compare(cell, *op, literal)
            })
        })
    }
}

fn compare(cell: &serde_json::Value, op: CmpOp, literal: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (cell, literal) {
        // Null never satisfies a comparison, except inequality.
        (Value::Null, _) | (_, Value::Null) => op == CmpOp::Ne,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(|ord| ord_matches(op, ord)),
            _ => false,
        },
        (Value::String(a), Value::String(b)) => ord_matches(op, a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => false,
        },
        _ => op == CmpOp::Ne,
    }
}

fn ord_matches(op: CmpOp, ord: Ordering) -> bool {
    match op {
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer / parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(serde_json::Value),
    Op(CmpOp),
    And,
    Or,
}

fn tokenize(input: &str) -> Result<Vec<Token>, PipelineError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '>' || c == '<' || c == '=' || c == '!' {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            let (op, len) = match two.as_str() {
                ">=" => (CmpOp::Ge, 2),
                "<=" => (CmpOp::Le, 2),
                "==" => (CmpOp::Eq, 2),
                "!=" => (CmpOp::Ne, 2),
                _ if c == '>' => (CmpOp::Gt, 1),
                _ if c == '<' => (CmpOp::Lt, 1),
                _ => {
                    return Err(PipelineError::invalid_condition(format!(
                        "Unexpected operator at '{two}' in: {input}"
                    )));
                }
            };
            tokens.push(Token::Op(op));
            i += len;
        } else if c == '\'' || c == '"' {
            let quote = c;
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && chars[end] != quote {
                end += 1;
            }
            if end == chars.len() {
                return Err(PipelineError::invalid_condition(format!(
                    "Unterminated string literal in: {input}"
                )));
            }
            let text: String = chars[start..end].iter().collect();
            tokens.push(Token::Literal(serde_json::Value::String(text)));
            i = end + 1;
        } else if c.is_ascii_digit() || c == '-' || c == '.' {
            let start = i;
            i += 1;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || chars[i] == '.'
                    || chars[i] == 'e'
                    || chars[i] == 'E'
                    || ((chars[i] == '-' || chars[i] == '+')
                        && matches!(chars[i - 1], 'e' | 'E')))
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = if let Ok(int) = text.parse::<i64>() {
                serde_json::Value::Number(int.into())
            } else {
                let float = text.parse::<f64>().map_err(|_| {
                    PipelineError::invalid_condition(format!("Bad number '{text}' in: {input}"))
                })?;
                serde_json::Number::from_f64(float)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| {
                        PipelineError::invalid_condition(format!(
                            "Bad number '{text}' in: {input}"
                        ))
                    })?
            };
            tokens.push(Token::Literal(value));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let token = match word.to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "true" => Token::Literal(serde_json::Value::Bool(true)),
                "false" => Token::Literal(serde_json::Value::Bool(false)),
                "null" => Token::Literal(serde_json::Value::Null),
                _ => Token::Ident(word),
            };
            tokens.push(token);
        } else {
            return Err(PipelineError::invalid_condition(format!(
                "Unexpected character '{c}' in: {input}"
            )));
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn condition(&mut self) -> Result<Condition, PipelineError> {
        let mut clauses = vec![self.and_group()?];
        while self.eat(&Token::Or) {
            clauses.push(self.and_group()?);
        }
        Ok(Condition { clauses })
    }

    fn and_group(&mut self) -> Result<Vec<Comparison>, PipelineError> {
        let mut group = vec![self.comparison()?];
        while self.eat(&Token::And) {
            group.push(self.comparison()?);
        }
        Ok(group)
    }

    fn comparison(&mut self) -> Result<Comparison, PipelineError> {
        let column = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => {
                return Err(PipelineError::invalid_condition(format!(
                    "Expected column name in: {}",
                    self.input
                )));
            }
        };
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            _ => {
                return Err(PipelineError::invalid_condition(format!(
                    "Expected comparison operator in: {}",
                    self.input
                )));
            }
        };
        let literal = match self.next() {
            Some(Token::Literal(value)) => value,
            _ => {
                return Err(PipelineError::invalid_condition(format!(
                    "Expected literal value in: {}",
                    self.input
                )));
            }
        };
        Ok(Comparison {
            column,
            op,
            literal,
        })
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.tokens.get(self.position) == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }
}
