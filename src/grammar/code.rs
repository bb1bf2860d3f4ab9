//! Actions executed by invoke nodes
//!
//! Every code returns an integer; the invoke node dispatches on it. Codes that
//! only mutate state return `0`.

/// An action run by an invoke node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    /// External C callback `int name(state, p, endp)`.
    Match(String),
    /// `state->field = match`.
    Store(String),
    /// Returns `state->field`.
    Load(String),
    /// `state->field = value`.
    Update(String, i64),
    /// Returns `state->field == value`.
    IsEqual(String, i64),
    /// `state->field |= value`.
    Or(String, i64),
    /// `state->field &= value`.
    And(String, i64),
    /// Returns `(state->field & mask) == mask`.
    Test(String, i64),
    /// `state->field = state->field * base + match`, returning `1` on
    /// overflow of the field width or of `max`.
    MulAdd {
        field: String,
        base: u64,
        max: Option<u64>,
    },
}

impl Code {
    /// The state property this code touches, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Code::Match(_) => None,
            Code::Store(f)
            | Code::Load(f)
            | Code::Update(f, _)
            | Code::IsEqual(f, _)
            | Code::Or(f, _)
            | Code::And(f, _)
            | Code::Test(f, _) => Some(f),
            Code::MulAdd { field, .. } => Some(field),
        }
    }

    /// Whether the generated helper reads the `match` value.
    pub fn uses_match(&self) -> bool {
        matches!(self, Code::Store(_) | Code::MulAdd { .. })
    }

    /// Base name of the generated helper (before de-duplication suffixes).
    pub fn helper_name(&self) -> String {
        match self {
            Code::Match(name) => name.clone(),
            Code::Store(f) => format!("c_store_{}", f),
            Code::Load(f) => format!("c_load_{}", f),
            Code::Update(f, _) => format!("c_update_{}", f),
            Code::IsEqual(f, _) => format!("c_is_equal_{}", f),
            Code::Or(f, _) => format!("c_or_{}", f),
            Code::And(f, _) => format!("c_and_{}", f),
            Code::Test(f, _) => format!("c_test_{}", f),
            Code::MulAdd { field, .. } => format!("c_mul_add_{}", field),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Code::Match(_))
    }
}
