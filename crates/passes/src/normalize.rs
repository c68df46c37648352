use flowexpr_ast::{Bits, Comparison, Expr, Operand, RelOp};
use std::collections::BTreeSet;

/// Rewrites a simplified expression into disjunctive normal form: a flat
/// Disjunction of flat Conjunctions of Comparisons (§4.5). Three rewrites
/// run in sequence: distributing AND over OR, expanding any surviving `!=`
/// on a bit-valued operand into per-bit disjunctions (classifiers have no
/// native "not equal"), and deduplicating/pruning the resulting clauses.
#[tracing::instrument(level = "debug", skip_all)]
pub fn normalize(expr: Expr) -> Expr {
    let distributed = distribute(expr);
    let expanded = expand_ne(distributed);
    dedup_and_prune(expanded)
}

/// Converts to DNF by recursively distributing AND over OR. A Conjunction's
/// children are each expanded to their own list of DNF disjuncts (a single
/// disjunct for anything but an Or), then combined by the Cartesian
/// product of those lists, ANDing one disjunct from each.
fn distribute(expr: Expr) -> Expr {
    match expr {
        Expr::Bool(b) => Expr::Bool(b),
        Expr::Comparison(c) => Expr::Comparison(c),
        Expr::Or(children) => Expr::disjunction(children.into_iter().map(distribute)),
        Expr::And(children) => {
            let disjuncts_per_child: Vec<Vec<Expr>> = children
                .into_iter()
                .map(distribute)
                .map(|child| match child {
                    Expr::Or(disjuncts) => disjuncts,
                    other => vec![other],
                })
                .collect();
            let product = cartesian_and(disjuncts_per_child);
            Expr::disjunction(product)
        }
    }
}

/// The Cartesian product of `disjuncts_per_child`, ANDing one choice from
/// each child's disjunct list into one conjunctive clause per combination.
fn cartesian_and(disjuncts_per_child: Vec<Vec<Expr>>) -> Vec<Expr> {
    let mut clauses = vec![Vec::new()];
    for disjuncts in disjuncts_per_child {
        let mut next = Vec::with_capacity(clauses.len() * disjuncts.len());
        for clause in &clauses {
            for d in &disjuncts {
                let mut extended = clause.clone();
                extended.push(d.clone());
                next.push(extended);
            }
        }
        clauses = next;
    }
    clauses.into_iter().map(Expr::conjunction).collect()
}

/// Expands every surviving `!=` comparison on a bit-valued operand into a
/// disjunction of one-bit-flipped equalities (the classifier representation
/// has no native inequality match): `x != value/mask` becomes the OR, over
/// every bit `i` set in `mask`, of "bit `i` of `x` disagrees with bit `i` of
/// `value`" — a masked `!=` (e.g. a CIDR subnet exclusion) only needs to
/// disagree somewhere within its masked bits, so only those bits contribute
/// a disjunct; an exact `!=` is just the case where every bit is masked in.
/// Runs after [`distribute`] so each new disjunct still needs distributing
/// into its enclosing conjunction; a second `distribute` pass folds that
/// back into flat DNF. String `!=` comparisons have no such expansion and
/// are left as-is (§7: the classifier can't represent a negated string
/// match, so one survives into the emitter, which drops the clause rather
/// than mis-emit it).
fn expand_ne(expr: Expr) -> Expr {
    let expanded = expand_ne_inner(expr);
    distribute(expanded)
}

fn expand_ne_inner(expr: Expr) -> Expr {
    match expr {
        Expr::Bool(b) => Expr::Bool(b),
        Expr::And(children) => Expr::conjunction(children.into_iter().map(expand_ne_inner)),
        Expr::Or(children) => Expr::disjunction(children.into_iter().map(expand_ne_inner)),
        Expr::Comparison(c) => expand_ne_comparison(c),
    }
}

fn expand_ne_comparison(c: Comparison) -> Expr {
    if c.op != RelOp::Ne {
        return Expr::Comparison(c);
    }
    let Operand::Bits(bits) = &c.operand else {
        return Expr::Comparison(c);
    };
    let width = bits.width;
    let disjuncts: Vec<Expr> = (0..width)
        .filter(|i| (bits.mask >> i) & 1 == 1)
        .map(|i| {
            let bit_mask = 1u128 << i;
            let flipped = (bits.value ^ bit_mask) & bit_mask;
            Expr::comparison(c.symbol.clone(), RelOp::Eq, Operand::Bits(Bits::new(flipped, bit_mask, width)), c.span)
        })
        .collect();
    Expr::disjunction(disjuncts)
}

/// Deduplicates identical clauses and drops any clause that is internally
/// contradictory (two comparisons on the same symbol with incompatible
/// constants, following from the same exact-match rule the simplifier
/// applies within a single Conjunction).
fn dedup_and_prune(expr: Expr) -> Expr {
    match expr {
        Expr::Or(children) => {
            let mut seen = BTreeSet::new();
            let mut kept = Vec::new();
            for child in children {
                if is_contradictory(&child) {
                    continue;
                }
                let key = child.to_string();
                if seen.insert(key) {
                    kept.push(child);
                }
            }
            Expr::disjunction(kept)
        }
        Expr::And(_) if is_contradictory(&expr) => Expr::Bool(false),
        other => other,
    }
}

fn clause_comparisons(expr: &Expr) -> Vec<&Comparison> {
    match expr {
        Expr::Comparison(c) => vec![c],
        Expr::And(children) => children.iter().filter_map(|c| match c {
            Expr::Comparison(c) => Some(c),
            _ => None,
        }).collect(),
        _ => Vec::new(),
    }
}

fn is_contradictory(clause: &Expr) -> bool {
    let comparisons = clause_comparisons(clause);
    for i in 0..comparisons.len() {
        for j in (i + 1)..comparisons.len() {
            let (a, b) = (comparisons[i], comparisons[j]);
            if a.symbol != b.symbol || a.op != RelOp::Eq || b.op != RelOp::Eq {
                continue;
            }
            match (&a.operand, &b.operand) {
                (Operand::Bits(ab), Operand::Bits(bb)) if !ab.compatible(bb) => return true,
                (Operand::Str(sa), Operand::Str(sb)) if sa != sb => return true,
                _ => {}
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowexpr_span::Span;

    fn eq(name: &str, value: u128, width: u16) -> Expr {
        Expr::comparison(name, RelOp::Eq, Operand::Bits(Bits::exact(value, width)), Span::dummy())
    }

    #[test]
    fn distributes_and_over_or() {
        let expr = Expr::conjunction([eq("a", 1, 8), Expr::disjunction([eq("b", 1, 8), eq("b", 2, 8)])]);
        let normalized = normalize(expr);
        match normalized {
            Expr::Or(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected a 2-clause Or, got {other:?}"),
        }
    }

    #[test]
    fn expands_ne_into_per_bit_disjunction() {
        let expr = Expr::comparison("a", RelOp::Ne, Operand::Bits(Bits::exact(0, 2)), Span::dummy());
        let normalized = normalize(expr);
        match normalized {
            Expr::Or(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected 2 one-bit-flip disjuncts, got {other:?}"),
        }
    }

    #[test]
    fn masked_not_equal_expands_only_over_masked_bits() {
        // A CIDR-style subnet exclusion: only the top 16 bits are masked in,
        // so the expansion must disjoin over those 16 bit positions, not the
        // symbol's full 32-bit width.
        let masked = Bits::new(0x0102_0000, 0xffff_0000, 32);
        let expr = Expr::comparison("ip4.src", RelOp::Ne, Operand::Bits(masked), Span::dummy());
        let normalized = normalize(expr);
        match normalized {
            Expr::Or(clauses) => {
                assert_eq!(clauses.len(), 16);
                for clause in &clauses {
                    match clause {
                        Expr::Comparison(c) => assert_eq!(c.op, RelOp::Eq),
                        other => panic!("expected an equality comparison, got {other:?}"),
                    }
                }
            }
            other => panic!("expected 16 one-bit-flip disjuncts, got {other:?}"),
        }
    }

    #[test]
    fn dedups_identical_clauses() {
        let expr = Expr::disjunction([eq("a", 1, 8), eq("a", 1, 8)]);
        let normalized = normalize(expr);
        assert_eq!(normalized, eq("a", 1, 8));
    }

    #[test]
    fn drops_contradictory_clause() {
        let contradictory = Expr::conjunction([eq("a", 1, 8), eq("a", 2, 8)]);
        let expr = Expr::disjunction([contradictory, eq("b", 1, 8)]);
        let normalized = normalize(expr);
        assert_eq!(normalized, eq("b", 1, 8));
    }

    #[test]
    fn whole_expression_contradictory_collapses_to_false() {
        let expr = Expr::conjunction([eq("a", 1, 8), eq("a", 2, 8)]);
        assert_eq!(normalize(expr), Expr::Bool(false));
    }

    #[test]
    fn string_not_equal_is_left_untouched() {
        let expr = Expr::comparison("ct.label", RelOp::Ne, Operand::Str("foo".into()), Span::dummy());
        let normalized = normalize(expr.clone());
        assert_eq!(normalized, expr);
    }
}
