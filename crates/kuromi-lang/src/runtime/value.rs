use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::runtime::env::Env;
use crate::syntax::ast::FunctionDecl;

/// Two numbers closer than this compare equal. Both back ends rely on it.
pub const NUMBER_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(Rc<str>),
    Bool(bool),
    Null,
    Array(Rc<Vec<Value>>),
    Function(Rc<Closure>),
    Image(ImageHandle),
}

/// A function declaration paired with the scope it was declared in.
pub struct Closure {
    pub decl: Arc<FunctionDecl>,
    pub env: Env,
}

// scopes can hold the closure that captured them
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({})", self.decl.name)
    }
}

/// Opaque decoded image owned by the host's asset loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub id: u32,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_)   => "number",
            Value::Str(_)      => "string",
            Value::Bool(_)     => "bool",
            Value::Null        => "null",
            Value::Array(_)    => "array",
            Value::Function(_) => "function",
            Value::Image(_)    => "image",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null      => false,
            Value::Bool(b)   => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s)    => !s.is_empty(),
            Value::Array(_) | Value::Function(_) | Value::Image(_) => true,
        }
    }

    /// `==` semantics: numeric tolerance, content equality for strings,
    /// identity for arrays, functions and images. Kinds never mix.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a - b).abs() < NUMBER_TOLERANCE,
            (Value::Str(a), Value::Str(b))       => a == b,
            (Value::Bool(a), Value::Bool(b))     => a == b,
            (Value::Null, Value::Null)           => true,
            (Value::Array(a), Value::Array(b))   => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Image(a), Value::Image(b))   => a.id == b.id,
            _ => false,
        }
    }

    /// String coercion matching the browser's `String(v)`, so `+`, `print`
    /// and `show` produce identical text in both back ends.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Str(s)    => s.to_string(),
            Value::Bool(b)   => b.to_string(),
            Value::Null      => "null".to_string(),
            Value::Array(items) => items.iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Function(c) => format!("function {}", c.decl.name),
            Value::Image(_)    => "[object HTMLImageElement]".to_string(),
        }
    }
}

/// Formats a number the way JavaScript's `Number.prototype.toString` does.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{n}");
    }
    // shortest round-trip digits, JS exponent spelling: 1e+21, 1.5e-7
    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
