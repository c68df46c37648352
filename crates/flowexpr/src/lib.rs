//! Re-exports the full text-to-matches pipeline as one [`compile`] entry
//! point, on top of the layered `flowexpr-*` crates: lex (external to the
//! core, per spec.md §1, but a real scanner is needed to run anything) ->
//! parse -> annotate -> simplify -> normalize -> emit. Also hosts the
//! `flowexpr` CLI binary (`src/cli`) and an in-memory demo
//! [`FieldRegistry`]/[`PortResolver`] pair (`demo`) standing in for the
//! real field-metadata registry and port table an embedding control plane
//! would supply.

pub mod demo;

pub use flowexpr_ast::{
    format, honors_invariants, honors_symbol_invariants, is_normalized, is_simplified, Bits, Comparison, Expr, Level, Operand, RelOp,
    ResolvedSymbol, SymbolResolver,
};
pub use flowexpr_emit::{to_matches, ConjunctionTag, MatchKey, MatchRecord, NoPorts, PortResolver};
pub use flowexpr_errors::{Error, Result};
pub use flowexpr_passes::{annotate, normalize, simplify};
pub use flowexpr_symtab::{parse_assignment, EmptyRegistry, FieldDescriptor, FieldRegistry, SymbolTable};

use indexmap::IndexMap;

/// The output of running every pass over a parsed expression: the tree at
/// each stage (useful for a `check`/diagnostic CLI subcommand that wants
/// to show its work) plus the final emitted match set.
pub struct Compiled {
    pub parsed: Expr,
    pub annotated: Expr,
    pub simplified: Expr,
    pub normalized: Expr,
    pub matches: IndexMap<MatchKey, MatchRecord>,
    pub conjunction_count: u32,
}

/// Runs the entire pipeline described in spec.md §2 over `text`: parse,
/// annotate, simplify, normalize, then emit matches against `symtab` and
/// `ports`. This is the one call an embedding control plane needs to turn
/// a textual match expression into a flow-classifier-ready match set.
#[tracing::instrument(level = "debug", skip_all, fields(len = text.len()))]
pub fn compile(text: &str, symtab: &SymbolTable, ports: &dyn PortResolver) -> Result<Compiled> {
    let parsed = flowexpr_parser::parse_string(text, symtab)?;
    let annotated = annotate(parsed.clone(), symtab)?;
    let simplified = simplify(annotated.clone(), symtab);
    let normalized = normalize(simplified.clone());
    let mut matches = IndexMap::new();
    let conjunction_count = to_matches(&normalized, symtab, ports, &mut matches);
    Ok(Compiled { parsed, annotated, simplified, normalized, matches, conjunction_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{DemoPorts, DemoRegistry};

    fn table() -> SymbolTable<'static> {
        // Leaked once per test process; fine for a `'static` demo table
        // shared by everything a short-lived test needs.
        let registry: &'static DemoRegistry = Box::leak(Box::new(DemoRegistry::new()));
        demo::build_symtab(registry)
    }

    #[test]
    fn true_compiles_to_a_single_wildcard_match() {
        let t = table();
        let compiled = compile("true", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.conjunction_count, 0);
        assert_eq!(compiled.matches.len(), 1);
        assert!(compiled.matches.values().next().unwrap().fields.is_empty());
    }

    #[test]
    fn false_compiles_to_no_matches() {
        let t = table();
        let compiled = compile("false", &t, &DemoPorts::new()).unwrap();
        assert!(compiled.matches.is_empty());
    }

    #[test]
    fn simple_field_equality_emits_one_match() {
        let t = table();
        let compiled = compile("eth.type == 0x800", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.matches.len(), 1);
        let record = compiled.matches.values().next().unwrap();
        assert_eq!(record.fields.get("eth.type").unwrap().value, 0x800);
    }

    #[test]
    fn predicate_inlines_prereqs_on_annotation() {
        let t = table();
        let compiled = compile("tcp.src == 80", &t, &DemoPorts::new()).unwrap();
        assert!(is_simplified(&compiled.simplified));
        assert!(is_normalized(&compiled.normalized));
        let record = compiled.matches.values().next().unwrap();
        assert!(record.fields.contains_key("eth.type"));
        assert!(record.fields.contains_key("ip.proto"));
        assert!(record.fields.contains_key("tcp.src"));
    }

    #[test]
    fn set_membership_produces_one_match_per_value_without_a_conjunction_group() {
        let t = table();
        let compiled = compile("tcp.src == {1, 2, 3}", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.conjunction_count, 0);
        assert_eq!(compiled.matches.len(), 3);
    }

    #[test]
    fn two_varying_dimensions_allocate_one_conjunction_group() {
        let t = table();
        let compiled = compile("tcp.src == {1, 2, 3} && tcp.dst == {4, 5, 6}", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.conjunction_count, 1);
        // One match per value across each of the two varying dimensions
        // (3 + 3), not their cross product — that's the whole point of a
        // conjunctive-match group (spec.md §4.6 / end-to-end scenario 4).
        assert_eq!(compiled.matches.len(), 6);
        for record in compiled.matches.values() {
            assert_eq!(record.conjunctions[0].of, 2);
        }
    }

    #[test]
    fn less_than_lowers_to_a_single_prefix_mask_match() {
        let t = table();
        let compiled = compile("tcp.src < 1024", &t, &DemoPorts::new()).unwrap();
        let record = compiled.matches.values().next().unwrap();
        let bits = record.fields.get("tcp.src").unwrap();
        assert_eq!(bits.value, 0);
        assert_eq!(bits.mask, 0xfc00);
    }

    #[test]
    fn masked_not_equal_on_a_subnet_compiles_to_matches() {
        let t = table();
        // A CIDR subnet-exclusion comparison: only the top 16 bits are
        // masked in, so this must not silently compile to zero matches.
        let compiled = compile("ip4.src != 0x01020000/0xffff0000", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.matches.len(), 16);
    }

    #[test]
    fn negated_equality_expands_at_normalize_time() {
        let t = table();
        let compiled = compile("!(eth.type == 0x800)", &t, &DemoPorts::new()).unwrap();
        // 16-bit symbol: one clause per differing bit.
        assert_eq!(compiled.matches.len(), 16);
    }

    #[test]
    fn format_then_parse_round_trips() {
        let t = table();
        let compiled = compile("tcp.src == {1, 2} && eth.type == 0x800", &t, &DemoPorts::new()).unwrap();
        let rendered = format(&compiled.annotated);
        let reparsed = flowexpr_parser::parse_string(&rendered, &t).unwrap();
        assert_eq!(format(&reparsed), rendered);
    }

    #[test]
    fn unresolved_port_name_drops_its_clause_without_erroring() {
        let t = table();
        let compiled = compile("inport == \"sw0-p1\" || inport == \"nonexistent-port\"", &t, &DemoPorts::new()).unwrap();
        assert_eq!(compiled.matches.len(), 1);
    }
}
