//! Lowers a normalized expression into a set of prioritized classifier
//! matches (§4.6): partitions top-level clauses by the symbols they
//! constrain, collapses same-signature clauses that vary together across
//! an exact cross product of values into a tagged conjunctive-match group,
//! and falls back to one flat match per clause otherwise.

mod group;
mod match_record;

pub use match_record::{ConjunctionTag, EqualityValue, MatchKey, MatchRecord};

use flowexpr_ast::{Expr, SymbolResolver};
use indexmap::IndexMap;

/// Resolves a symbolic port name (a string-typed field's operand) to its
/// numeric value. Implementations back this with whatever external port
/// table the embedding application maintains; a name with no current
/// mapping returns `None`, which silently prunes the containing clause
/// rather than erroring (§7).
pub trait PortResolver {
    fn resolve(&self, symbol: &str, name: &str) -> Option<u128>;
}

/// A resolver with no mappings, for expressions known not to reference any
/// string-typed symbol.
pub struct NoPorts;

impl PortResolver for NoPorts {
    fn resolve(&self, _symbol: &str, _name: &str) -> Option<u128> {
        None
    }
}

/// Lowers `ast` (expected to already be normalized) into classifier
/// matches, hash-consed into `out` by field contents. Returns the number
/// of conjunction ids allocated.
#[tracing::instrument(level = "debug", skip_all)]
pub fn to_matches(
    ast: &Expr,
    resolver: &dyn SymbolResolver,
    ports: &dyn PortResolver,
    out: &mut IndexMap<MatchKey, MatchRecord>,
) -> u32 {
    group::emit(ast, resolver, ports, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowexpr_ast::{Bits, Level, Operand, RelOp, ResolvedSymbol};

    struct TestResolver;
    impl SymbolResolver for TestResolver {
        fn resolve(&self, name: &str) -> Option<ResolvedSymbol> {
            match name {
                "eth.type" => Some(ResolvedSymbol { width: 16, level: Level::Nominal, is_string: false, must_crossproduct: true, is_predicate: false }),
                "ip.proto" => Some(ResolvedSymbol { width: 8, level: Level::Nominal, is_string: false, must_crossproduct: false, is_predicate: false }),
                "tcp.src" | "tcp.dst" => Some(ResolvedSymbol { width: 16, level: Level::Ordinal, is_string: false, must_crossproduct: false, is_predicate: false }),
                "inport" => Some(ResolvedSymbol { width: 16, level: Level::Nominal, is_string: true, must_crossproduct: false, is_predicate: false }),
                _ => None,
            }
        }
    }

    struct FixedPorts;
    impl PortResolver for FixedPorts {
        fn resolve(&self, symbol: &str, name: &str) -> Option<u128> {
            match (symbol, name) {
                ("inport", "eth0") => Some(7),
                _ => None,
            }
        }
    }

    fn eq(symbol: &str, value: u128, width: u16) -> Expr {
        Expr::comparison(symbol, RelOp::Eq, Operand::Bits(Bits::exact(value, width)), flowexpr_span::Span::dummy())
    }

    fn with_prereqs(src_symbol: &str, value: u128) -> Expr {
        Expr::conjunction([eq(src_symbol, value, 16), eq("eth.type", 0x800, 16), eq("ip.proto", 6, 8)])
    }

    #[test]
    fn true_emits_a_single_wildcard() {
        let mut out = IndexMap::new();
        let count = to_matches(&Expr::Bool(true), &TestResolver, &NoPorts, &mut out);
        assert_eq!(count, 0);
        assert_eq!(out.len(), 1);
        assert!(out.values().next().unwrap().fields.is_empty());
    }

    #[test]
    fn false_emits_nothing() {
        let mut out = IndexMap::new();
        let count = to_matches(&Expr::Bool(false), &TestResolver, &NoPorts, &mut out);
        assert_eq!(count, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn single_varying_dimension_does_not_form_a_group() {
        let clauses: Vec<Expr> = (1..=3).map(|i| with_prereqs("tcp.src", i)).collect();
        let ast = Expr::disjunction(clauses);
        let mut out = IndexMap::new();
        let count = to_matches(&ast, &TestResolver, &NoPorts, &mut out);
        assert_eq!(count, 0);
        assert_eq!(out.len(), 3);
        for record in out.values() {
            assert!(record.conjunctions.is_empty());
            assert_eq!(record.fields.len(), 3);
        }
    }

    #[test]
    fn two_varying_dimensions_form_a_conjunction_group() {
        let mut clauses = Vec::new();
        for src in 1..=3u128 {
            for dst in 4..=6u128 {
                clauses.push(Expr::conjunction([
                    eq("tcp.src", src, 16),
                    eq("tcp.dst", dst, 16),
                    eq("eth.type", 0x800, 16),
                    eq("ip.proto", 6, 8),
                ]));
            }
        }
        let ast = Expr::disjunction(clauses);
        let mut out = IndexMap::new();
        let count = to_matches(&ast, &TestResolver, &NoPorts, &mut out);
        assert_eq!(count, 1);
        assert_eq!(out.len(), 6);
        for record in out.values() {
            assert_eq!(record.fields.len(), 3);
            assert_eq!(record.conjunctions.len(), 1);
            assert_eq!(record.conjunctions[0].of, 2);
        }
    }

    #[test]
    fn unresolved_port_name_silently_drops_its_clause() {
        let unresolved = Expr::comparison("inport", RelOp::Eq, Operand::Str("unknown0".into()), flowexpr_span::Span::dummy());
        let resolved = Expr::comparison("inport", RelOp::Eq, Operand::Str("eth0".into()), flowexpr_span::Span::dummy());
        let ast = Expr::disjunction([unresolved, resolved]);
        let mut out = IndexMap::new();
        let count = to_matches(&ast, &TestResolver, &FixedPorts, &mut out);
        assert_eq!(count, 0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn duplicate_match_contents_merge_their_conjunction_tags() {
        let mut out = IndexMap::new();
        let a = eq("eth.type", 0x800, 16);
        let b = eq("eth.type", 0x800, 16);
        let ast = Expr::disjunction([a, b]);
        to_matches(&ast, &TestResolver, &NoPorts, &mut out);
        assert_eq!(out.len(), 1);
    }
}
