//! A named strategy program and its parsed rule.

use crate::domain::error::ParseError;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub program: String,
    pub rule: Rule,
}

impl Strategy {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Result<Self, ParseError> {
        let program = program.into();
        let rule = rule_parser::parse(&program)?;
        Ok(Self {
            name: name.into(),
            program,
            rule,
        })
    }

    /// Canonical source of the parsed rule.
    pub fn canonical(&self) -> String {
        self.rule.to_string()
    }
}
