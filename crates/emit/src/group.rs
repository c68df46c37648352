use crate::match_record::{ConjunctionTag, MatchRecord};
use crate::PortResolver;
use flowexpr_ast::{Bits, Expr, Operand, RelOp, SymbolResolver};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// The top-level disjuncts of a normalized expression: each is one
/// conjunctive clause (or the wildcard clause, for `Bool(true)`). A bare
/// `Bool(false)` denotes the empty clause set.
pub(crate) fn top_level_clauses(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Bool(false) => Vec::new(),
        Expr::Or(children) => children.iter().collect(),
        other => vec![other],
    }
}

type Fields = IndexMap<String, Bits>;

/// Resolves one clause to its `symbol -> value` map, or `None` if some
/// comparison in it could not be resolved — an unresolved port name drops
/// the whole clause silently (§4.6/§7), since it can never match a packet.
pub(crate) fn clause_fields(clause: &Expr, resolver: &dyn SymbolResolver, ports: &dyn PortResolver) -> Option<Fields> {
    let mut fields = Fields::new();
    collect_fields(clause, resolver, ports, &mut fields)?;
    Some(fields)
}

fn collect_fields(expr: &Expr, resolver: &dyn SymbolResolver, ports: &dyn PortResolver, fields: &mut Fields) -> Option<()> {
    match expr {
        Expr::Bool(true) => Some(()),
        Expr::Bool(false) => None,
        Expr::Comparison(c) => {
            if c.op != RelOp::Eq {
                // A surviving non-equality comparison has no classifier
                // representation; drop rather than mis-emit.
                return None;
            }
            let bits = match &c.operand {
                Operand::Bits(b) => *b,
                Operand::Str(name) => {
                    let resolved = resolver.resolve(&c.symbol)?;
                    let value = ports.resolve(&c.symbol, name)?;
                    Bits::exact(value, resolved.width)
                }
            };
            fields.insert(c.symbol.clone(), bits);
            Some(())
        }
        Expr::And(children) => {
            for child in children {
                collect_fields(child, resolver, ports, fields)?;
            }
            Some(())
        }
        // A well-formed normalized clause never contains a nested Or; treat
        // one as unresolvable rather than guess at a meaning for it.
        Expr::Or(_) => None,
    }
}

/// Groups `clauses` by their field signature (the sorted set of symbol
/// names they constrain) — only clauses that constrain exactly the same
/// symbols are candidates for conjunctive-match merging, since a symbol's
/// mere presence or absence is itself a difference in "other-symbol
/// constraints" (§4.6 step 1).
fn by_signature(clauses: Vec<Fields>) -> IndexMap<Vec<String>, Vec<Fields>> {
    let mut groups: IndexMap<Vec<String>, Vec<Fields>> = IndexMap::new();
    for fields in clauses {
        let mut signature: Vec<String> = fields.keys().cloned().collect();
        signature.sort();
        groups.entry(signature).or_default().push(fields);
    }
    groups
}

/// Emits every match implied by `ast`, grouping each maximal set of
/// same-signature clauses into a conjunctive-match group when at least two
/// non-`must_crossproduct` symbols vary across it in lockstep (an exact
/// cross product of their value sets); otherwise each clause is emitted as
/// its own flat match. Returns the number of conjunction ids allocated.
pub(crate) fn emit(
    ast: &Expr,
    resolver: &dyn SymbolResolver,
    ports: &dyn PortResolver,
    out: &mut IndexMap<crate::MatchKey, MatchRecord>,
) -> u32 {
    let resolved_clauses: Vec<Fields> = top_level_clauses(ast)
        .into_iter()
        .filter_map(|clause| clause_fields(clause, resolver, ports))
        .collect();

    let mut next_id = 0u32;
    for (_, group) in by_signature(resolved_clauses) {
        emit_group(group, resolver, out, &mut next_id);
    }
    next_id
}

fn emit_group(clauses: Vec<Fields>, resolver: &dyn SymbolResolver, out: &mut IndexMap<crate::MatchKey, MatchRecord>, next_id: &mut u32) {
    if clauses.is_empty() {
        return;
    }
    let symbols: Vec<String> = clauses[0].keys().cloned().collect();

    let mut value_sets: IndexMap<String, IndexSet<Bits>> = IndexMap::new();
    for symbol in &symbols {
        let values: IndexSet<Bits> = clauses.iter().map(|c| c[symbol]).collect();
        value_sets.insert(symbol.clone(), values);
    }

    let dims: Vec<String> = symbols
        .iter()
        .filter(|symbol| {
            let must_crossproduct = resolver.resolve(symbol).map(|r| r.must_crossproduct).unwrap_or(false);
            !must_crossproduct && value_sets[symbol.as_str()].len() > 1
        })
        .cloned()
        .collect();

    let fixed: Vec<String> = symbols.iter().filter(|s| !dims.contains(s)).cloned().collect();
    // Every fixed (non-dimension) symbol's value is copied from `clauses[0]`
    // below, so a group only forms when each one is actually the same value
    // across every clause — otherwise that copy would silently drop values a
    // must_crossproduct symbol takes in other clauses.
    let fixed_is_constant = fixed.iter().all(|f| value_sets[f.as_str()].len() == 1);

    if dims.len() >= 2 && fixed_is_constant && is_exact_cross_product(&clauses, &dims, &value_sets) {
        let id = *next_id;
        *next_id += 1;
        let k = dims.len() as u32;
        for (dim_index, dim) in dims.iter().enumerate() {
            for value in &value_sets[dim.as_str()] {
                let mut fields = Fields::new();
                for f in &fixed {
                    fields.insert(f.clone(), clauses[0][f]);
                }
                fields.insert(dim.clone(), *value);
                let tag = ConjunctionTag { id, dim: dim_index as u32 + 1, of: k };
                insert(out, fields, Some(tag));
            }
        }
    } else {
        for clause in clauses {
            insert(out, clause, None);
        }
    }
}

fn is_exact_cross_product(clauses: &[Fields], dims: &[String], value_sets: &IndexMap<String, IndexSet<Bits>>) -> bool {
    let product: usize = dims.iter().map(|d| value_sets[d.as_str()].len()).product();
    if product != clauses.len() {
        return false;
    }
    let mut seen = HashSet::new();
    clauses.iter().all(|c| {
        let combo: Vec<Bits> = dims.iter().map(|d| c[d.as_str()]).collect();
        seen.insert(combo)
    })
}

fn insert(out: &mut IndexMap<crate::MatchKey, MatchRecord>, fields: Fields, tag: Option<ConjunctionTag>) {
    let record = MatchRecord { fields, conjunctions: tag.into_iter().collect() };
    let key = record.key();
    match out.get_mut(&key) {
        Some(existing) => existing.merge_tags(&record),
        None => {
            out.insert(key, record);
        }
    }
}
