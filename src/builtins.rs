use std::collections::HashMap;

use crate::{
    eval::{EvalError, Evaluator},
    value::{TypeTag, Value},
};

/// A builtin receives the evaluator and the items after the head, still
/// unevaluated, and decides itself which of them to evaluate.
pub type Builtin = fn(&Evaluator, &[Value]) -> Result<Value, EvalError>;

/// Builtins by name. Lookup is by exact string match.
#[derive(Clone, Default)]
pub struct Builtins {
    table: HashMap<String, Builtin>,
}

impl Builtins {
    /// A table with no builtins at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table: `+`.
    pub fn standard() -> Self {
        let mut builtins = Self::empty();
        builtins.register("+", plus);
        builtins
    }

    /// Add or replace the builtin called `name`.
    pub fn register(&mut self, name: impl Into<String>, builtin: Builtin) -> Option<Builtin> {
        self.table.insert(name.into(), builtin)
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.table.get(name).copied()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// `(+ a b ...)`: the sum of the evaluated arguments, which must all be
/// integers. Stops at the first argument that is not.
pub fn plus(evaluator: &Evaluator, args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() {
        tracing::debug!("`+` called with no arguments");
    }

    let mut sum: i64 = 0;
    for arg in args {
        match evaluator.eval(arg)? {
            Value::Int(n) => {
                sum = sum
                    .checked_add(n)
                    .ok_or_else(|| EvalError::Overflow { op: "+".into() })?;
            }
            found => {
                return Err(EvalError::TypeMismatch {
                    op: "+".into(),
                    expected: TypeTag::Int,
                    found,
                });
            }
        }
    }
    Ok(Value::Int(sum))
}
