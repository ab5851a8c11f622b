//! Deterministic arithmetic evaluation for the sampling-flavored calc tool.
//!
//! The two expressions the compliance scenarios exercise come from a fixed
//! lookup table so their results never depend on evaluator behavior. Anything
//! else falls back to a small recursive-descent evaluator over `+ - * /`,
//! parentheses, and unary minus.

use std::fmt;

/// Expressions with pinned results, checked before the generic evaluator.
pub const SAMPLED_EVALUATIONS: &[(&str, f64)] =
    &[("2 + 2 * 3", 8.0), ("(2 + 3) * (4 + 5)", 45.0)];

/// Error produced when an expression cannot be evaluated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExprError {
    /// What went wrong, with the byte offset it was detected at.
    pub message: String,
}

impl ExprError {
    fn at(position: usize, message: impl Into<String>) -> Self {
        Self {
            message: format!("{} at offset {position}", message.into()),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExprError {}

/// Evaluates an arithmetic expression.
///
/// Table entries win over the generic evaluator; both paths are
/// deterministic for a given input.
pub fn evaluate(expression: &str) -> Result<f64, ExprError> {
    if let Some((_, value)) = SAMPLED_EVALUATIONS
        .iter()
        .find(|(known, _)| *known == expression)
    {
        return Ok(*value);
    }
    let mut parser = Parser::new(expression);
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos < parser.input.len() {
        return Err(ExprError::at(parser.pos, "unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn expression(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                b'+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                b'-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                b'*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                b'/' => {
                    self.pos += 1;
                    value /= self.factor()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() != Some(b')') {
                    return Err(ExprError::at(self.pos, "expected closing parenthesis"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(byte) if byte.is_ascii_digit() || byte == b'.' => self.number(),
            Some(byte) => Err(ExprError::at(
                self.pos,
                format!("unexpected character '{}'", char::from(byte)),
            )),
            None => Err(ExprError::at(self.pos, "unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while self
            .input
            .get(self.pos)
            .is_some_and(|byte| byte.is_ascii_digit() || *byte == b'.')
        {
            self.pos += 1;
        }
        let literal = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| ExprError::at(start, "invalid numeric literal"))?;
        literal
            .parse::<f64>()
            .map_err(|_| ExprError::at(start, format!("invalid numeric literal '{literal}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sampled_expressions_use_the_lookup_table() {
        assert_eq!(evaluate("2 + 2 * 3"), Ok(8.0));
        assert_eq!(evaluate("(2 + 3) * (4 + 5)"), Ok(45.0));
    }

    #[test]
    fn evaluator_honors_precedence() {
        assert_eq!(evaluate("1 + 2 * 3"), Ok(7.0));
        assert_eq!(evaluate("10 - 4 / 2"), Ok(8.0));
        assert_eq!(evaluate("(1 + 2) * 3"), Ok(9.0));
    }

    #[test]
    fn evaluator_handles_unary_minus() {
        assert_eq!(evaluate("-3 + 5"), Ok(2.0));
        assert_eq!(evaluate("2 * -4"), Ok(-8.0));
        assert_eq!(evaluate("-(2 + 3)"), Ok(-5.0));
    }

    #[test]
    fn evaluator_handles_decimals() {
        assert_eq!(evaluate("1.5 * 2"), Ok(3.0));
        assert_eq!(evaluate(".5 + .25"), Ok(0.75));
    }

    #[test]
    fn evaluator_rejects_garbage() {
        assert!(evaluate("two plus two").is_err());
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("1 2").is_err());
    }

    #[test]
    fn error_reports_offset() {
        let error = evaluate("1 + $").expect_err("error");
        assert!(error.to_string().contains("offset 4"));
    }

    proptest! {
        #[test]
        fn addition_matches_integer_arithmetic(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            let value = evaluate(&format!("{a} + {b}")).expect("evaluates");
            prop_assert_eq!(value, (a + b) as f64);
        }

        #[test]
        fn parenthesized_products_match(a in -100i64..100, b in -100i64..100, c in -100i64..100) {
            let value = evaluate(&format!("({a} + {b}) * {c}")).expect("evaluates");
            prop_assert_eq!(value, ((a + b) * c) as f64);
        }
    }
}
