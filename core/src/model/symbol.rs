use serde::{Deserialize, Serialize};

use super::clamp_confidence;

/// Kind of named program entity a [`Symbol`] represents (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    TypeAlias,
    Enum,
    Variable,
    Method,
    Property,
    /// A test-framework call (`describe`/`test`/`it`/`before*`/`after*`)
    /// discoverable by its string label (spec §4.5).
    Test,
}

/// A named program entity together with its defining location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    /// 1-based.
    pub line: u32,
    /// 0-based.
    pub column: u32,
    pub exported: bool,
    pub enclosing_class: Option<String>,
    pub parameters: Option<Vec<String>>,
    pub return_type: Option<String>,
    pub confidence: f64,
    /// Flagged when the function's name matches a type-guard predicate
    /// pattern (`isX`) and confidence analysis is enabled (spec §4.5).
    pub is_type_guard: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            file: file.into(),
            line,
            column,
            exported: false,
            enclosing_class: None,
            parameters: None,
            return_type: None,
            confidence: base_confidence(kind),
            is_type_guard: false,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    pub fn bump_confidence(&mut self, delta: f64) {
        self.confidence = clamp_confidence(self.confidence + delta);
    }
}

/// Base confidence for a freshly-synthesized symbol (spec §4.5: "declarations
/// 0.9, definitions 0.8, method calls 0.7, etc.").
fn base_confidence(kind: SymbolKind) -> f64 {
    match kind {
        SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum | SymbolKind::TypeAlias => {
            0.9
        }
        SymbolKind::Function | SymbolKind::Method => 0.8,
        SymbolKind::Variable | SymbolKind::Property | SymbolKind::Test => 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamped_to_unit_interval() {
        let mut s = Symbol::new("Foo", SymbolKind::Class, "a.ts", 1, 0);
        s.bump_confidence(5.0);
        assert_eq!(s.confidence, 1.0);
    }
}
