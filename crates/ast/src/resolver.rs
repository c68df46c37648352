use crate::Level;

/// What the parser (and, later, the annotator and emitter) need to know
/// about a symbol in order to type-check a reference to it. This is
/// deliberately data-only and deliberately thin: it does not carry a
/// predicate's expansion text or a field's external descriptor, so a type
/// implementing this trait can sit *above* the parser in the crate graph
/// (as `flowexpr-symtab` does) without the parser depending back on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub width: u16,
    pub level: Level,
    pub is_string: bool,
    pub must_crossproduct: bool,
    /// True for a predicate symbol (one defined by a boolean expansion
    /// rather than an external field). Gates the bare-reference and
    /// boolean-literal-comparison sugar in the grammar's `cmp` rule, and
    /// later tells the annotator to inline the predicate's prerequisite
    /// and expansion ASTs in place of the reference.
    pub is_predicate: bool,
}

/// The seam between the parser and whatever symbol table it is parsing
/// against. `flowexpr-symtab::SymbolTable` is the production
/// implementation; tests construct small stand-ins directly.
pub trait SymbolResolver {
    fn resolve(&self, name: &str) -> Option<ResolvedSymbol>;
}

/// A resolver with no symbols, useful for exercising the lexer/parser in
/// isolation from a real table.
pub struct EmptyResolver;

impl SymbolResolver for EmptyResolver {
    fn resolve(&self, _name: &str) -> Option<ResolvedSymbol> {
        None
    }
}
