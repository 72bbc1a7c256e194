use serde::{Deserialize, Serialize};

/// Kind of type a [`TypeDefinition`] describes (spec §3/§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Primitive,
    Interface,
    Class,
    TypeAlias,
    Enum,
    Union,
    Array,
    ObjectLiteral,
    Intersection,
    FunctionType,
    GenericInstantiation,
    UtilityType,
    Conditional,
    Mapped,
    Keyof,
    Typeof,
    TemplateLiteral,
    Recursive,
    Error,
    Unknown,
}

/// A resolved (or partially resolved) type, produced by the type resolver at
/// whichever tier (basic/generics/full) was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub kind: TypeKind,
    /// The textual form of the type as written (or reconstructed).
    pub text: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Structured detail for kinds that carry it (e.g. conditional branches,
    /// mapped-type key/value, constraint chains).
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub confidence: f64,
}

impl TypeDefinition {
    pub fn new(kind: TypeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            file: None,
            line: None,
            properties: serde_json::Map::new(),
            confidence: 1.0,
        }
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        Self::new(TypeKind::Unknown, text).with_confidence(0.3)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }
}
