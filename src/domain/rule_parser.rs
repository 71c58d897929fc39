//! Strategy program parser.
//!
//! Recursive descent over the grammar:
//!
//! ```text
//! program    := or_expr EOF
//! or_expr    := and_expr (("or" | "||") and_expr)*
//! and_expr   := not_expr (("and" | "&&") not_expr)*
//! not_expr   := ("not" | "!") not_expr | "(" or_expr ")" | comparison
//! comparison := operand cmp_op operand
//! operand    := number | call
//! call       := ("Indicator" | "IndQuantile") "(" string ("," arg)* "," symbol "," time ")"
//! symbol     := "stock" | string
//! time       := "time" ("-" integer)?
//! ```
//!
//! Errors carry the byte offset where parsing stopped.

use crate::domain::error::ParseError;
use crate::domain::rule::{
    Arg, CallKind, CompareOp, IndicatorCall, Operand, Rule, SymbolRef, TimeRef,
};

const SYMBOL_VAR: &str = "stock";
const TIME_VAR: &str = "time";

/// One comma-separated item inside a call's parentheses, before its role is known.
enum Item {
    Number(f64, usize),
    Text(String, usize),
    Stock(usize),
    Time(usize, usize),
}

impl Item {
    fn position(&self) -> usize {
        match self {
            Item::Number(_, p) | Item::Text(_, p) | Item::Stock(p) | Item::Time(_, p) => *p,
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn describe_next(&self) -> String {
        let word = self.peek_word();
        if word.is_empty() {
            self.peek()
                .map(|c| format!("'{}'", c))
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            format!("'{}'", word)
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!(
                "expected '{}', found {}",
                expected,
                self.describe_next()
            ))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let num_str = &self.input[start..self.pos];
        if num_str.is_empty() {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        if self.peek() != Some('"') {
            return Err(self.error(format!(
                "expected string literal, found {}",
                self.describe_next()
            )));
        }
        self.advance();
        let body_start = self.pos;
        while let Some(ch) = self.advance() {
            if ch == '"' {
                return Ok(self.input[body_start..self.pos - 1].to_string());
            }
        }
        Err(ParseError {
            message: "unterminated string literal".to_string(),
            position: start,
        })
    }

    fn parse_or(&mut self) -> Result<Rule, ParseError> {
        let mut rules = vec![self.parse_and()?];
        loop {
            self.skip_whitespace();
            if self.consume_keyword("or") || self.consume_exact("||") {
                rules.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(if rules.len() == 1 {
            rules.remove(0)
        } else {
            Rule::Or(rules)
        })
    }

    fn parse_and(&mut self) -> Result<Rule, ParseError> {
        let mut rules = vec![self.parse_not()?];
        loop {
            self.skip_whitespace();
            if self.consume_keyword("and") || self.consume_exact("&&") {
                rules.push(self.parse_not()?);
            } else {
                break;
            }
        }
        Ok(if rules.len() == 1 {
            rules.remove(0)
        } else {
            Rule::And(rules)
        })
    }

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();
        if self.consume_keyword("not") {
            return Ok(Rule::Not(Box::new(self.parse_not()?)));
        }
        if self.peek() == Some('!') && !self.remaining().starts_with("!=") {
            self.advance();
            return Ok(Rule::Not(Box::new(self.parse_not()?)));
        }
        if self.peek() == Some('(') {
            self.advance();
            let rule = self.parse_or()?;
            self.expect_char(')')?;
            return Ok(rule);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Rule, ParseError> {
        let left = self.parse_operand()?;
        let op = self.parse_compare_op()?;
        let right = self.parse_operand()?;
        self.skip_whitespace();
        if self.peek_compare_op().is_some() {
            return Err(self.error("comparison operators cannot be chained; combine with 'and'"));
        }
        Ok(Rule::Comparison { op, left, right })
    }

    fn peek_compare_op(&self) -> Option<(CompareOp, usize)> {
        let r = self.remaining();
        [
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ]
        .into_iter()
        .find(|(token, _)| r.starts_with(token))
        .map(|(token, op)| (op, token.len()))
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, ParseError> {
        self.skip_whitespace();
        match self.peek_compare_op() {
            Some((op, len)) => {
                self.pos += len;
                Ok(op)
            }
            None => Err(self.error(format!(
                "expected comparison operator (<, >, <=, >=, ==, !=), found {}",
                self.describe_next()
            ))),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Literal(self.parse_number()?));
        }
        if self.consume_keyword("Indicator") {
            return Ok(Operand::Call(self.parse_call(false)?));
        }
        if self.consume_keyword("IndQuantile") {
            return Ok(Operand::Call(self.parse_call(true)?));
        }
        let word = self.peek_word();
        if word.is_empty() {
            Err(self.error(format!(
                "expected number or indicator call, found {}",
                self.describe_next()
            )))
        } else {
            Err(self.error(format!("unknown identifier '{}'", word)))
        }
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some('"') => Ok(Item::Text(self.parse_string()?, start)),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => {
                Ok(Item::Number(self.parse_number()?, start))
            }
            _ => {
                if self.consume_keyword(SYMBOL_VAR) {
                    return Ok(Item::Stock(start));
                }
                if self.consume_keyword(TIME_VAR) {
                    self.skip_whitespace();
                    let lag = if self.peek() == Some('-') {
                        self.advance();
                        self.parse_integer()?
                    } else {
                        0
                    };
                    return Ok(Item::Time(lag, start));
                }
                let word = self.peek_word();
                if word.is_empty() {
                    Err(self.error(format!(
                        "expected argument, found {}",
                        self.describe_next()
                    )))
                } else {
                    Err(self.error(format!("unknown identifier '{}'", word)))
                }
            }
        }
    }

    fn parse_call(&mut self, quantile: bool) -> Result<IndicatorCall, ParseError> {
        self.expect_char('(')?;
        self.skip_whitespace();
        let name_pos = self.pos;
        let name = self.parse_string()?;
        if name.trim().is_empty() {
            return Err(ParseError {
                message: "indicator name must not be empty".to_string(),
                position: name_pos,
            });
        }

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            items.push(self.parse_item()?);
        }
        let call_end = self.pos;

        let time = match items.pop() {
            Some(Item::Time(lag, _)) => TimeRef { lag },
            other => {
                return Err(ParseError {
                    message: format!("indicator call must end with '{}'", TIME_VAR),
                    position: other.map(|i| i.position()).unwrap_or(call_end),
                });
            }
        };
        let symbol = match items.pop() {
            Some(Item::Stock(_)) => SymbolRef::Current,
            Some(Item::Text(s, _)) => SymbolRef::Named(s),
            other => {
                return Err(ParseError {
                    message: format!(
                        "expected '{}' or a symbol string before '{}'",
                        SYMBOL_VAR, TIME_VAR
                    ),
                    position: other.map(|i| i.position()).unwrap_or(call_end),
                });
            }
        };

        let mut items = items.into_iter();
        let kind = if quantile {
            match items.next() {
                Some(Item::Number(q, _)) => CallKind::Quantile { q },
                Some(Item::Text(s, pos)) => match s.trim().parse::<f64>() {
                    Ok(q) => CallKind::Quantile { q },
                    Err(_) => {
                        return Err(ParseError {
                            message: format!("quantile must be numeric, found \"{}\"", s),
                            position: pos,
                        });
                    }
                },
                Some(other) => {
                    return Err(ParseError {
                        message: "quantile must be numeric".to_string(),
                        position: other.position(),
                    });
                }
                None => {
                    return Err(ParseError {
                        message: "IndQuantile requires a quantile argument".to_string(),
                        position: name_pos,
                    });
                }
            }
        } else {
            CallKind::Point
        };

        let mut args = Vec::new();
        for item in items {
            match item {
                Item::Number(v, _) => args.push(Arg::Number(v)),
                Item::Text(s, _) => args.push(Arg::Text(s)),
                Item::Stock(pos) | Item::Time(_, pos) => {
                    return Err(ParseError {
                        message: format!(
                            "'{}' and '{}' may only appear as the last two arguments",
                            SYMBOL_VAR, TIME_VAR
                        ),
                        position: pos,
                    });
                }
            }
        }

        Ok(IndicatorCall {
            kind,
            name,
            args,
            symbol,
            time,
        })
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Err(self.error("empty program"));
        }
        let rule = self.parse_or()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Parse-only check: true iff `parse` succeeds.
pub fn validate(input: &str) -> bool {
    parse(input).is_ok()
}
