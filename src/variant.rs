//! Build slots and the grammar each one compiles

use crate::rtsp::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two artifacts a run produces. The strict slot lands in the
/// `#if` branch of merged output, the loose slot in the `#else` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Strict,
    Loose,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Strict, Variant::Loose];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Strict => "strict",
            Variant::Loose => "loose",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which grammar mode each slot is built from.
///
/// The identity binding is the normal case. Binding both slots to
/// [`Mode::Strict`] ships the strict parser regardless of the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantBinding {
    pub strict: Mode,
    pub loose: Mode,
}

impl VariantBinding {
    pub fn new(strict: Mode, loose: Mode) -> Self {
        VariantBinding { strict, loose }
    }

    pub fn loose_as_strict() -> Self {
        VariantBinding::new(Mode::Strict, Mode::Strict)
    }

    pub fn mode(&self, variant: Variant) -> Mode {
        match variant {
            Variant::Strict => self.strict,
            Variant::Loose => self.loose,
        }
    }
}

impl Default for VariantBinding {
    fn default() -> Self {
        VariantBinding::new(Mode::Strict, Mode::Loose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binding_is_identity() {
        let binding = VariantBinding::default();
        assert_eq!(binding.mode(Variant::Strict), Mode::Strict);
        assert_eq!(binding.mode(Variant::Loose), Mode::Loose);
    }

    #[test]
    fn test_loose_slot_can_alias_strict() {
        let binding = VariantBinding::loose_as_strict();
        assert_eq!(binding.mode(Variant::Loose), Mode::Strict);
    }
}
