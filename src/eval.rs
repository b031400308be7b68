use miette::Diagnostic;
use thiserror::Error;

use crate::{
    builtins::Builtins,
    stack::ensure_sufficient_stack,
    value::{TypeTag, Value},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("cannot evaluate an empty list")]
    #[diagnostic(
        code(eval::empty_list),
        help("`()` has no head to dispatch on; put a name or a list first")
    )]
    EmptyList,

    #[error("Unknown name '{name}'")]
    #[diagnostic(code(eval::unknown_name), help("known names are: {known}"))]
    UnknownName { name: String, known: String },

    #[error("Illegal result type for `{op}`: expected {expected}, got {found} of type {}", type_of(.found))]
    #[diagnostic(code(eval::type_mismatch))]
    TypeMismatch {
        op: String,
        expected: TypeTag,
        found: Value,
    },

    #[error("integer overflow in `{op}`")]
    #[diagnostic(code(eval::overflow))]
    Overflow { op: String },
}

fn type_of(value: &Value) -> TypeTag {
    value.type_tag()
}

impl EvalError {
    /// A stand-in value for this error: `ERR` for a failed dispatch and `0`
    /// for a failed arithmetic builtin.
    ///
    /// Only the error that stopped evaluation is mapped. A failure inside an
    /// argument is not turned into a value the enclosing call then sees, so
    /// `(+ 1 (foo))` maps to `ERR` rather than to the `0` that `+` would give
    /// for a non-integer argument.
    pub fn sentinel(&self) -> Value {
        match self {
            EvalError::EmptyList | EvalError::UnknownName { .. } => Value::String("ERR".into()),
            EvalError::TypeMismatch { .. } | EvalError::Overflow { .. } => Value::Int(0),
        }
    }
}

pub struct Evaluator {
    builtins: Builtins,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Builtins::standard())
    }
}

impl Evaluator {
    pub fn new(builtins: Builtins) -> Self {
        Self { builtins }
    }

    pub fn builtins_mut(&mut self) -> &mut Builtins {
        &mut self.builtins
    }

    /// Evaluate `value`.
    ///
    /// Atoms evaluate to themselves. A list dispatches on its head: a nested
    /// list replaces the whole form with its own result, a name calls the
    /// builtin of that name with the remaining (unevaluated) items, and any
    /// other atom leaves the list as it is.
    pub fn eval(&self, value: &Value) -> Result<Value, EvalError> {
        ensure_sufficient_stack(|| match value {
            Value::List(items) => self.eval_list(value, items),
            Value::Type(_) | Value::Name(_) | Value::String(_) | Value::Int(_) => Ok(value.clone()),
        })
    }

    /// Like [`Evaluator::eval`], but logs a failure and returns the sentinel
    /// of the first error, see [`EvalError::sentinel`].
    pub fn eval_or_sentinel(&self, value: &Value) -> Value {
        self.eval(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "evaluation failed");
            e.sentinel()
        })
    }

    fn eval_list(&self, list: &Value, items: &[Value]) -> Result<Value, EvalError> {
        let Some((head, args)) = items.split_first() else {
            return Err(EvalError::EmptyList);
        };

        match head {
            Value::List(_) => self.eval(head),
            Value::Name(name) => {
                let Some(builtin) = self.builtins.get(name) else {
                    return Err(EvalError::UnknownName {
                        name: name.clone(),
                        known: self.builtins.names().join(", "),
                    });
                };
                tracing::trace!(name = %name, args = args.len(), "calling builtin");
                builtin(self, args)
            }
            Value::Type(_) | Value::String(_) | Value::Int(_) => Ok(list.clone()),
        }
    }
}
