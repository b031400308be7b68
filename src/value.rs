use std::fmt::Display;

use crate::stack::ensure_sufficient_stack;

/// The type of a [`Value`]. Every value carries exactly one of these,
/// determined by its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Type,
    Name,
    String,
    Int,
    List,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Type => "type",
            TypeTag::Name => "name",
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::List => "list",
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the tree built by the parser, or a result of evaluation.
///
/// A `List` owns its children outright, so the tree has no sharing and no
/// cycles. Dropping a value releases its whole subtree.
pub enum Value {
    /// A type descriptor.
    Type(TypeTag),
    Name(String),
    /// Text payload. The lexer never produces one.
    String(String),
    Int(i64),
    List(Vec<Value>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Type(_) => TypeTag::Type,
            Value::Name(_) => TypeTag::Name,
            Value::String(_) => TypeTag::String,
            Value::Int(_) => TypeTag::Int,
            Value::List(_) => TypeTag::List,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

pub fn name(name: impl Into<String>) -> Value {
    Value::Name(name.into())
}

pub fn int(n: i64) -> Value {
    Value::Int(n)
}

pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
    Value::List(items.into_iter().collect())
}

// The derived drop glue recurses once per nesting level. Flatten the
// subtree onto a heap stack instead so arbitrarily deep trees can be freed.
impl Drop for Value {
    fn drop(&mut self) {
        let Value::List(children) = self else {
            return;
        };
        if !children.iter().any(|child| matches!(child, Value::List(_))) {
            return;
        }
        let mut pending = std::mem::take(children);
        while let Some(mut child) = pending.pop() {
            if let Value::List(grandchildren) = &mut child {
                pending.append(grandchildren);
            }
        }
    }
}

// Clone, equality and debug output walk the whole tree, so they go through
// `ensure_sufficient_stack` at every list level like `Display` does.
impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Type(tag) => Value::Type(*tag),
            Value::Name(name) => Value::Name(name.clone()),
            Value::String(s) => Value::String(s.clone()),
            Value::Int(n) => Value::Int(*n),
            Value::List(items) => ensure_sufficient_stack(|| Value::List(items.clone())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Name(a), Value::Name(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::List(a), Value::List(b)) => ensure_sufficient_stack(|| a == b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Type(tag) => f.debug_tuple("Type").field(tag).finish(),
            Value::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::List(items) => {
                ensure_sufficient_stack(|| f.debug_tuple("List").field(items).finish())
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Type(tag) => write!(f, "SType({tag})"),
            Value::Name(name) => write!(f, "{name}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::List(items) => ensure_sufficient_stack(|| {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }),
        }
    }
}
