//! Restricted expression interpreter for decider rules and alias replacers.
//!
//! Supports numbers, booleans, a caller-supplied set of variables, and the
//! operators `! - + * / % < <= > >= == != === !== && || ?:` with the usual
//! precedence. Values follow loose numeric semantics: booleans coerce to 1/0
//! in arithmetic, and any non-zero number is truthy.

pub mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;

pub use parser::Node;

/// Errors from compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// Input contains text outside the grammar.
    #[error("unexpected character(s) {0:?}")]
    UnexpectedChar(String),
    /// A token appeared where the grammar does not allow it.
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    /// Expression ended early.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A variable outside the allowed set.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    /// Expression was empty.
    #[error("empty expression")]
    Empty,
    /// Parentheses or operators nest too deeply.
    #[error("expression nested too deeply")]
    TooDeep,
}

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// A number.
    Num(f64),
    /// A boolean.
    Bool(bool),
}

impl Value {
    /// Numeric view: `true` is 1, `false` is 0.
    pub fn as_num(self) -> f64 {
        match self {
            Value::Num(n) => n,
            Value::Bool(b) => f64::from(u8::from(b)),
        }
    }

    /// Truthiness: non-zero, non-NaN numbers and `true`.
    pub fn truthy(self) -> bool {
        match self {
            Value::Num(n) => n != 0.0 && !n.is_nan(),
            Value::Bool(b) => b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Num(n) => write!(f, "{n}"),
        }
    }
}

/// Variable bindings for evaluation.
pub type Vars = HashMap<String, f64>;

/// A compiled expression, safe to cache and share.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    root: Node,
}

impl CompiledExpr {
    /// The source text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the given bindings. Unbound variables are errors.
    pub fn eval(&self, vars: &Vars) -> Result<Value, ExprError> {
        self.root.eval(vars)
    }

    /// Evaluate and reduce to a boolean.
    pub fn test(&self, vars: &Vars) -> Result<bool, ExprError> {
        self.eval(vars).map(Value::truthy)
    }
}

/// Compile `source`. When `allowed` is given, any other identifier is rejected.
pub fn compile(source: &str, allowed: Option<&[&str]>) -> Result<CompiledExpr, ExprError> {
    let tokens = lexer::lex(source)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let root = parser::parse(tokens)?;
    if let Some(allowed) = allowed {
        let mut idents = Vec::new();
        root.idents(&mut idents);
        if let Some(bad) = idents.into_iter().find(|id| !allowed.contains(&id.as_str())) {
            return Err(ExprError::UnknownVariable(bad));
        }
    }
    Ok(CompiledExpr {
        source: source.to_string(),
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vars(pairs: &[(&str, f64)]) -> Vars {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn eval(src: &str, pairs: &[(&str, f64)]) -> Value {
        compile(src, None).unwrap().eval(&vars(pairs)).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[]), Value::Num(7.0));
        assert_eq!(eval("(1 + 2) * 3", &[]), Value::Num(9.0));
        assert_eq!(eval("7 % 4", &[]), Value::Num(3.0));
        assert_eq!(eval("-2 + 5", &[]), Value::Num(3.0));
    }

    #[test]
    fn comparisons_and_logic() {
        let v = [("roll", 2.0), ("targetValue", 40.0)];
        assert_eq!(eval("roll <= targetValue", &v), Value::Bool(true));
        assert_eq!(eval("roll <= targetValue / 5", &v), Value::Bool(true));
        assert_eq!(eval("roll == 1 || roll == 100", &v), Value::Bool(false));
        assert_eq!(eval("!(roll > 1) && true", &v), Value::Bool(false));
    }

    #[test]
    fn logic_returns_operand() {
        assert_eq!(eval("0 || 5", &[]), Value::Num(5.0));
        assert_eq!(eval("3 && 4", &[]), Value::Num(4.0));
    }

    #[test]
    fn ternary() {
        let v = [("baseValue", 40.0), ("roll", 97.0)];
        assert_eq!(
            eval("baseValue < 50 ? roll > 95 : roll == 100", &v),
            Value::Bool(true)
        );
    }

    #[test]
    fn loose_and_strict_equality() {
        assert_eq!(eval("true == 1", &[]), Value::Bool(true));
        assert_eq!(eval("true === 1", &[]), Value::Bool(false));
        assert_eq!(eval("true !== 1", &[]), Value::Bool(true));
    }

    #[test]
    fn display_integral_numbers() {
        assert_eq!(Value::Num(3.0).to_string(), "3");
        assert_eq!(Value::Num(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn allowed_set_is_enforced() {
        let err = compile("rol > 1", Some(&["roll"])).unwrap_err();
        assert_eq!(err, ExprError::UnknownVariable("rol".into()));
        assert!(compile("roll > 1", Some(&["roll"])).is_ok());
    }

    #[test]
    fn unbound_variable_fails_at_eval() {
        let expr = compile("x + 1", None).unwrap();
        assert!(expr.eval(&Vars::new()).is_err());
    }

    #[test]
    fn malformed_input() {
        assert_eq!(compile("", None), Err(ExprError::Empty));
        assert_eq!(compile("1 +", None), Err(ExprError::UnexpectedEnd));
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(compile(&deep, None), Err(ExprError::TooDeep));
        assert_eq!(compile(&"!".repeat(10_000), None), Err(ExprError::TooDeep));
        assert!(compile("((1 + 2)) * -(-3) > 0 ? 1 : 0", None).is_ok());
        assert!(compile("alert('x')", None).is_err());
    }

    proptest! {
        #[test]
        fn never_panics(src in "[a-z0-9 +*/%<>=!&|?:()-]{0,24}") {
            if let Ok(expr) = compile(&src, None) {
                let _ = expr.eval(&vars(&[("a", 1.0)]));
            }
        }
    }
}
