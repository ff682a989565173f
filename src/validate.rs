use std::fmt::{self, Display};

use thiserror::Error;

/// The dynamic kind of a state value, as far as the gating validators care.
///
/// This mirrors the value taxonomy of the declarative runtime the state
/// layer serves: union-typed variables can switch kinds at runtime, so the
/// declared acceptance of a property is checked against the kind of every
/// newly assigned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Undefined,
    Null,
    Number,
    Boolean,
    String,
    /// Any structured value, including arrays.
    Object,
    Function,
    Symbol,
    BigInt,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::Function => "function",
            ValueKind::Symbol => "symbol",
            ValueKind::BigInt => "bigint",
        };
        return write!(f, "{}", name);
    }
}

/// Reports which [`ValueKind`] a value currently holds.
///
/// Scalars and strings are simple kinds; application state structs should
/// report [`ValueKind::Object`]. `Option<T>` maps `None` to
/// [`ValueKind::Undefined`], which every acceptance mode allows.
pub trait StateValue {
    fn value_kind(&self) -> ValueKind;
}

macro_rules! impl_state_value {
    ($kind:expr, $($t:ty),*) => {
        $(
            impl StateValue for $t {
                fn value_kind(&self) -> ValueKind {
                    return $kind;
                }
            }
        )*
    };
}

impl_state_value!(ValueKind::Number, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);
impl_state_value!(ValueKind::Boolean, bool);
impl_state_value!(ValueKind::String, String, &str);

impl<T: StateValue> StateValue for Option<T> {
    fn value_kind(&self) -> ValueKind {
        return match self {
            Some(value) => value.value_kind(),
            None => ValueKind::Undefined,
        };
    }
}

impl<T> StateValue for Vec<T> {
    fn value_kind(&self) -> ValueKind {
        return ValueKind::Object;
    }
}

/// The kinds of values a property was declared to hold.
///
/// Fixed at construction. Which mode applies depends on the decorator and
/// the declared variable type; union-typed variables get [`Supported`](Self::Supported).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueAcceptance {
    /// `undefined`, number, boolean or string.
    Simple,
    /// `undefined`, `null` or any object, including arrays.
    ObjectLike,
    /// Anything except functions and the unsupported primitives.
    Supported,
}

impl ValueAcceptance {
    pub(crate) fn allows(&self, kind: ValueKind) -> bool {
        return match self {
            ValueAcceptance::Simple => matches!(
                kind,
                ValueKind::Undefined | ValueKind::Number | ValueKind::Boolean | ValueKind::String
            ),
            ValueAcceptance::ObjectLike => {
                matches!(kind, ValueKind::Undefined | ValueKind::Null | ValueKind::Object)
            }
            ValueAcceptance::Supported => matches!(
                kind,
                ValueKind::Undefined
                    | ValueKind::Null
                    | ValueKind::Number
                    | ValueKind::Boolean
                    | ValueKind::String
                    | ValueKind::Object
            ),
        };
    }

    pub(crate) fn expected(&self) -> &'static str {
        return match self {
            ValueAcceptance::Simple => "undefined, number, boolean, string",
            ValueAcceptance::ObjectLike => {
                "undefined, null, Object including Array and excluding function"
            }
            ValueAcceptance::Supported => {
                "undefined, null, number, boolean, string, or Object but not function"
            }
        };
    }
}

/// An assignment's value did not match the property's declared kind.
///
/// Raised synchronously at assignment time, before the new value is stored,
/// so an invalid assignment never corrupts the dependency ledger or
/// triggers a notification. The host framework surfaces this to the
/// application developer.
#[derive(Debug, Clone, Error)]
#[error(
    "{decorator} '{property}' in {owning_view}: variable value check failed. Expected {expected}, got {actual}"
)]
pub struct ValueCheckError {
    /// Debug identity of the owning view, or a placeholder if unowned.
    pub owning_view: String,
    /// The decorator kind of the variable, e.g. `@State`.
    pub decorator: &'static str,
    /// The variable name.
    pub property: String,
    /// Description of what the declared kind accepts.
    pub expected: &'static str,
    /// The kind of the offending value.
    pub actual: ValueKind,
}
