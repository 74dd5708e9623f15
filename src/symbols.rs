//! Typed model of the symbol table the remote compiler returns per class.
//!
//! Every collection field defaults to empty so a sparse document still
//! deserializes; a document that fails to deserialize entirely is treated
//! upstream as a missing table, never as a scan failure.

use serde::Deserialize;

/// One line/column citation inside the referencing unit's source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// 1-based column, as supplied by the compiler.
    #[serde(default)]
    pub column: u32,
    /// 1-based line, as supplied by the compiler.
    #[serde(default)]
    pub line: u32,
}

impl Citation {
    /// The fixed display form used throughout reference objects.
    pub fn display(&self) -> String {
        return format!("Line {} Column {}", self.line, self.column);
    }
}

/// A recorded use of another unit: the target name plus every call site,
/// grouped into bare class references, method calls, and variable reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalReference {
    /// Methods of the target that this unit calls.
    #[serde(default)]
    pub methods: Vec<MemberReference>,
    /// Name of the referenced unit.
    pub name: String,
    /// Namespace prefix of the target. Non-empty means the target lives
    /// outside the scanned org and is excluded from the graph.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Call sites that reference the class itself (constructors, type usage).
    #[serde(default)]
    pub references: Vec<Citation>,
    /// Variables of the target that this unit reads.
    #[serde(default)]
    pub variables: Vec<MemberReference>,
}

/// A referenced method or variable of the target, with its call sites.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberReference {
    /// Member name on the target unit.
    pub name: String,
    /// Call sites in the referencing unit's source.
    #[serde(default)]
    pub references: Vec<Citation>,
}

/// A method or property the compiled unit itself declares.
#[derive(Debug, Clone, Deserialize)]
pub struct Symbol {
    /// Declared member name.
    pub name: String,
}

/// The compiler's structured description of one compiled unit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolTable {
    /// Everything this unit references in other units.
    #[serde(default, rename = "externalReferences")]
    pub external_references: Vec<ExternalReference>,
    /// Methods declared by this unit.
    #[serde(default)]
    pub methods: Vec<Symbol>,
    /// Properties declared by this unit.
    #[serde(default)]
    pub properties: Vec<Symbol>,
}
