use flowexpr_ast::Level;
use std::sync::Mutex;

/// What kind of thing a [`Symbol`] names. Carries only what distinguishes
/// the kinds; the fields common to all three (width, level, prereqs, ...)
/// live directly on `Symbol`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Field,
    /// `parent[lo..hi]`, inclusive on both ends, already validated against
    /// the parent's width at registration time.
    Subfield { parent: String, lo: u16, hi: u16 },
    /// The expansion text, stored unparsed until first referenced (§4.1:
    /// "expansion is stored unparsed").
    Predicate { expansion: String },
}

/// A registered symbol table entry. `level` is a lazily-filled cache: set
/// immediately at registration for a Field/Subfield/string symbol (whose
/// level is a pure function of how it was registered), left empty for a
/// Predicate until [`crate::SymbolTable`] infers it on first resolution.
/// `Mutex` rather than `RefCell` so `Symbol` (and `Arc<Symbol>`) stays
/// `Send + Sync`, per SPEC_FULL §3's concurrent-read-sharing requirement.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub width: u16,
    pub is_string: bool,
    pub must_crossproduct: bool,
    pub prereqs: Option<String>,
    pub kind: SymbolKind,
    pub(crate) level: Mutex<Option<Level>>,
}

impl Symbol {
    pub fn is_predicate(&self) -> bool {
        matches!(self.kind, SymbolKind::Predicate { .. })
    }

    /// The level of a non-predicate symbol, which is always known by the
    /// time registration returns. Panics if called on a predicate whose
    /// level has not yet been inferred — callers go through
    /// [`crate::SymbolTable::resolve`] instead, which knows how to fill it.
    pub(crate) fn fixed_level(&self) -> Level {
        self.level.lock().unwrap().expect("non-predicate symbols have their level set at registration")
    }
}
