//! Strategy program AST.
//!
//! - `Rule`: boolean nodes (comparisons and `and`/`or`/`not` connectives)
//! - `Operand`: numeric leaves, either a literal or an indicator call
//! - `IndicatorCall`: `Indicator(..)` / `IndQuantile(..)` with its symbol and time references
//!
//! `Display` prints a canonical program that parses back to an equal tree.

use std::fmt;

/// Extra argument passed to an indicator call after its name.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    /// `Indicator("name", ...)`
    Point,
    /// `IndQuantile("name", q, ...)`
    Quantile { q: f64 },
}

/// Which symbol's series a call reads.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolRef {
    /// The `stock` variable: the symbol under evaluation.
    Current,
    /// An explicit symbol, aligned to the current one by date.
    Named(String),
}

/// The `time` variable, optionally lagged (`time - 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRef {
    pub lag: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCall {
    pub kind: CallKind,
    pub name: String,
    pub args: Vec<Arg>,
    pub symbol: SymbolRef,
    pub time: TimeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    Call(IndicatorCall),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Comparison {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
}

impl Rule {
    /// Every indicator call in the tree, left to right.
    pub fn calls(&self) -> Vec<&IndicatorCall> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls<'a>(&'a self, out: &mut Vec<&'a IndicatorCall>) {
        match self {
            Rule::Comparison { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Call(call) = operand {
                        out.push(call);
                    }
                }
            }
            Rule::And(rules) | Rule::Or(rules) => {
                for r in rules {
                    r.collect_calls(out);
                }
            }
            Rule::Not(rule) => rule.collect_calls(out),
        }
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }
}

impl IndicatorCall {
    /// Name plus its extra args, e.g. `SMA(20)`.
    pub fn series_key(&self) -> String {
        series_key(&self.name, &self.args)
    }
}

pub fn series_key(name: &str, args: &[Arg]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{}({})", name, rendered.join(","))
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Number(v) => write!(f, "{}", v),
            Arg::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl fmt::Display for IndicatorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallKind::Point => write!(f, "Indicator(\"{}\"", self.name)?,
            CallKind::Quantile { q } => write!(f, "IndQuantile(\"{}\", {}", self.name, q)?,
        }
        for arg in &self.args {
            write!(f, ", {}", arg)?;
        }
        match &self.symbol {
            SymbolRef::Current => write!(f, ", stock")?,
            SymbolRef::Named(s) => write!(f, ", \"{}\"", s)?,
        }
        if self.time.lag == 0 {
            write!(f, ", time)")
        } else {
            write!(f, ", time - {})", self.time.lag)
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Comparison { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Rule::And(rules) => write_joined(f, rules, " and "),
            Rule::Or(rules) => write_joined(f, rules, " or "),
            Rule::Not(rule) => match rule.as_ref() {
                Rule::Comparison { .. } => write!(f, "not {}", rule),
                _ => write!(f, "not ({})", rule),
            },
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, rules: &[Rule], sep: &str) -> fmt::Result {
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match rule {
            Rule::And(_) | Rule::Or(_) => write!(f, "({})", rule)?,
            _ => write!(f, "{}", rule)?,
        }
    }
    Ok(())
}
