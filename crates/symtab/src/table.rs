use crate::registry::FieldRegistry;
use crate::symbol::{Symbol, SymbolKind};
use flowexpr_ast::{Expr, Level, ResolvedSymbol, SymbolResolver};
use flowexpr_errors::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

/// Registers and resolves the fields, subfields, and predicates a parser
/// run can reference. `Arc`-backed symbol ownership and `RwLock`-backed
/// interior mutability rather than `Rc`/`RefCell`: §5 makes mutation-vs-read
/// serialization the *caller's* responsibility ("must be externally
/// serialized"), but the table and its symbols must still be `Send + Sync`
/// so a read-mostly table can actually be shared across concurrent
/// compilation requests per SPEC_FULL §3, rather than merely claiming to be.
pub struct SymbolTable<'a> {
    registry: &'a dyn FieldRegistry,
    symbols: RwLock<IndexMap<String, Arc<Symbol>>>,
    /// Predicate names currently having their level inferred, guarding
    /// against infinite recursion through a predicate cycle. A name found
    /// already in this set is *not* itself an error here — the lazy
    /// inference is best-effort and falls back to `Level::Boolean` rather
    /// than failing, since [`SymbolResolver::resolve`] has no channel to
    /// report one. [`crate::annotate`] is the authoritative, `Result`-returning
    /// cycle detector (§4.3); this guard only needs to keep `resolve` total.
    computing: RwLock<HashSet<String>>,
}

impl<'a> SymbolTable<'a> {
    pub fn new(registry: &'a dyn FieldRegistry) -> Self {
        SymbolTable { registry, symbols: RwLock::new(IndexMap::new()), computing: RwLock::new(HashSet::new()) }
    }

    /// Registers an integer field symbol backed by an external field
    /// descriptor. Level is Ordinal if the descriptor is maskable, else
    /// Nominal (§4.1).
    pub fn add_field(&self, name: &str, field_id: &str, prereqs: Option<&str>, must_crossproduct: bool) -> Result<()> {
        valid_identifier(name)?;
        self.reject_duplicate(name)?;
        let descriptor = self
            .registry
            .describe(field_id)
            .ok_or_else(|| Error::registration(format!("field `{name}` refers to unknown descriptor `{field_id}`")))?;
        let level = if descriptor.maskable { Level::Ordinal } else { Level::Nominal };
        self.insert(Symbol {
            name: name.to_string(),
            width: descriptor.width,
            is_string: false,
            must_crossproduct,
            prereqs: prereqs.map(str::to_string),
            kind: SymbolKind::Field,
            level: Mutex::new(Some(level)),
        })
    }

    /// Registers a string field symbol. Always Nominal, always width 0
    /// (§3: "string symbols are always Nominal and width 0").
    pub fn add_string(&self, name: &str, field_id: &str, prereqs: Option<&str>) -> Result<()> {
        valid_identifier(name)?;
        self.reject_duplicate(name)?;
        self.registry
            .describe(field_id)
            .ok_or_else(|| Error::registration(format!("string field `{name}` refers to unknown descriptor `{field_id}`")))?;
        self.insert(Symbol {
            name: name.to_string(),
            width: 0,
            is_string: true,
            must_crossproduct: false,
            prereqs: prereqs.map(str::to_string),
            kind: SymbolKind::Field,
            level: Mutex::new(Some(Level::Nominal)),
        })
    }

    /// Registers a subfield: `subfield_ref` is `parent[lo..hi]` or
    /// `parent[bit]`, resolved against an already-registered Ordinal
    /// parent. Fails when the parent is missing, not Ordinal, or the range
    /// is out of bounds or empty (§4.1).
    pub fn add_subfield(&self, name: &str, prereqs: Option<&str>, subfield_ref: &str) -> Result<()> {
        valid_identifier(name)?;
        self.reject_duplicate(name)?;
        let (parent_name, lo, hi) = parse_field_ref(subfield_ref)
            .ok_or_else(|| Error::registration(format!("subfield `{name}` has a malformed reference `{subfield_ref}`")))?;
        let parent = self
            .lookup(parent_name)
            .ok_or_else(|| Error::registration(format!("subfield `{name}` refers to unknown parent `{parent_name}`")))?;
        if parent.is_predicate() || parent.fixed_level() != Level::Ordinal {
            return Err(Error::registration(format!("subfield `{name}` parent `{parent_name}` is not an Ordinal field")));
        }
        if lo > hi || hi >= parent.width {
            return Err(Error::registration(format!(
                "subfield `{name}` range [{lo}..{hi}] is out of bounds for `{parent_name}` (width {})",
                parent.width
            )));
        }
        self.insert(Symbol {
            name: name.to_string(),
            width: hi - lo + 1,
            is_string: false,
            must_crossproduct: parent.must_crossproduct,
            prereqs: prereqs.map(str::to_string),
            kind: SymbolKind::Subfield { parent: parent_name.to_string(), lo, hi },
            level: Mutex::new(Some(Level::Ordinal)),
        })
    }

    /// Registers a predicate. The expansion is stored unparsed; its level
    /// is inferred lazily on first resolution (§4.1).
    pub fn add_predicate(&self, name: &str, expansion: &str) -> Result<()> {
        valid_identifier(name)?;
        self.reject_duplicate(name)?;
        self.insert(Symbol {
            name: name.to_string(),
            width: 1,
            is_string: false,
            must_crossproduct: false,
            prereqs: None,
            kind: SymbolKind::Predicate { expansion: expansion.to_string() },
            level: Mutex::new(None),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Symbol>> {
        self.symbols.read().unwrap().get(name).cloned()
    }

    /// Releases all registered symbols (§4.1).
    pub fn destroy(&self) {
        self.symbols.write().unwrap().clear();
        self.computing.write().unwrap().clear();
    }

    /// Parses and returns a predicate's expansion, memoizing nothing
    /// itself (the parse is cheap relative to level inference, and unlike
    /// level the expansion AST is needed fresh — with its own spans — by
    /// every annotation site that inlines it).
    pub fn expansion_of(&self, name: &str) -> Result<Expr> {
        let symbol = self.lookup(name).ok_or_else(|| Error::internal(format!("`{name}` is not a registered symbol")))?;
        match &symbol.kind {
            SymbolKind::Predicate { expansion } => flowexpr_parser::parse_string(expansion, self),
            _ => Err(Error::internal(format!("`{name}` is not a predicate"))),
        }
    }

    /// The prerequisite text that applies when `name` is referenced,
    /// falling back to the parent field's prerequisites when `name` is an
    /// inline bit-range that was never registered with [`Self::add_subfield`]
    /// (§4.3: prereqs are conjoined "whenever a symbol is referenced", and
    /// an inline subfield reference is still a reference to its parent).
    pub fn prereqs_of(&self, name: &str) -> Option<String> {
        if let Some(symbol) = self.lookup(name) {
            return symbol.prereqs.clone();
        }
        let (base, _, _) = parse_field_ref(name)?;
        self.lookup(base)?.prereqs.clone()
    }

    fn reject_duplicate(&self, name: &str) -> Result<()> {
        if self.symbols.read().unwrap().contains_key(name) {
            Err(Error::registration(format!("symbol `{name}` is already registered")))
        } else {
            Ok(())
        }
    }

    fn insert(&self, symbol: Symbol) -> Result<()> {
        self.symbols.write().unwrap().insert(symbol.name.clone(), Arc::new(symbol));
        Ok(())
    }

    fn resolved_from(&self, symbol: &Arc<Symbol>) -> ResolvedSymbol {
        let is_predicate = symbol.is_predicate();
        let level = if is_predicate { self.predicate_level(symbol) } else { symbol.fixed_level() };
        ResolvedSymbol { width: symbol.width, level, is_string: symbol.is_string, must_crossproduct: symbol.must_crossproduct, is_predicate }
    }

    fn predicate_level(&self, symbol: &Arc<Symbol>) -> Level {
        if let Some(level) = *symbol.level.lock().unwrap() {
            return level;
        }
        if !self.computing.write().unwrap().insert(symbol.name.clone()) {
            return Level::Boolean;
        }
        let level = match self.expansion_of(&symbol.name) {
            Ok(expr) => Level::min_for_predicate(leaf_levels(&expr, self)),
            Err(_) => Level::Boolean,
        };
        self.computing.write().unwrap().remove(&symbol.name);
        *symbol.level.lock().unwrap() = Some(level);
        level
    }
}

fn leaf_levels(expr: &Expr, table: &SymbolTable) -> Vec<Level> {
    match expr {
        Expr::Bool(_) => Vec::new(),
        Expr::Comparison(c) => table.lookup(&c.symbol).map(|s| vec![table.resolved_from(&s).level]).unwrap_or_default(),
        Expr::And(children) | Expr::Or(children) => children.iter().flat_map(|c| leaf_levels(c, table)).collect(),
    }
}

impl<'a> SymbolResolver for SymbolTable<'a> {
    fn resolve(&self, name: &str) -> Option<ResolvedSymbol> {
        if let Some(symbol) = self.lookup(name) {
            return Some(self.resolved_from(&symbol));
        }
        let (base, lo, hi) = parse_field_ref(name)?;
        let parent = self.lookup(base)?;
        if parent.is_predicate() || parent.fixed_level() != Level::Ordinal || lo > hi || hi >= parent.width {
            return None;
        }
        Some(ResolvedSymbol {
            width: hi - lo + 1,
            level: Level::Ordinal,
            is_string: false,
            must_crossproduct: parent.must_crossproduct,
            is_predicate: false,
        })
    }
}

/// Parses `base[lo..hi]` or `base[bit]` into `(base, lo, hi)`, inclusive on
/// both ends. Used both for `add_subfield`'s `subfield_ref` argument and
/// for resolving an inline bit-range expression (`tcp.flags[3..5]`) that
/// was never separately registered with `add_subfield`.
fn parse_field_ref(text: &str) -> Option<(&str, u16, u16)> {
    let open = text.find('[')?;
    if !text.ends_with(']') {
        return None;
    }
    let base = &text[..open];
    let inner = &text[open + 1..text.len() - 1];
    if let Some((lo, hi)) = inner.split_once("..") {
        Some((base, lo.parse().ok()?, hi.parse().ok()?))
    } else {
        let bit: u16 = inner.parse().ok()?;
        Some((base, bit, bit))
    }
}

fn valid_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::registration(format!("`{name}` is not a valid identifier")))
    }
}
