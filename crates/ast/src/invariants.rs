use crate::{Comparison, Expr, Operand, RelOp, ResolvedSymbol};

/// Checks structural invariants 1-3 of the data model (no same-type nested
/// connective, every connective has at least two children, every
/// comparison has a nonzero mask with no stray value bits). This is a pure
/// function of the tree alone, as required: it needs no symbol table.
pub fn honors_invariants(expr: &Expr) -> bool {
    match expr {
        Expr::Bool(_) => true,
        Expr::Comparison(c) => comparison_is_well_formed(c),
        Expr::And(children) => {
            children.len() >= 2 && children.iter().all(|c| !matches!(c, Expr::And(_)) && honors_invariants(c))
        }
        Expr::Or(children) => {
            children.len() >= 2 && children.iter().all(|c| !matches!(c, Expr::Or(_)) && honors_invariants(c))
        }
    }
}

fn comparison_is_well_formed(c: &Comparison) -> bool {
    match &c.operand {
        Operand::Str(_) => c.op.is_equality(),
        Operand::Bits(b) => b.mask != 0 && (b.value & !b.mask) == 0,
    }
}

/// Invariant 4 — operand kind matches the referenced symbol's `width == 0`
/// flag — needs a symbol table, so it is a separate entry point rather
/// than folded into [`honors_invariants`]. Returns `false` if any
/// referenced symbol is missing from `resolve`, since that too means the
/// tree cannot be valid against this table.
pub fn honors_symbol_invariants(expr: &Expr, resolve: &dyn Fn(&str) -> Option<ResolvedSymbol>) -> bool {
    match expr {
        Expr::Bool(_) => true,
        Expr::Comparison(c) => match resolve(&c.symbol) {
            Some(sym) => match &c.operand {
                Operand::Str(_) => sym.is_string,
                Operand::Bits(b) => !sym.is_string && b.width == sym.width,
            },
            None => false,
        },
        Expr::And(children) | Expr::Or(children) => children.iter().all(|c| honors_symbol_invariants(c, resolve)),
    }
}

/// Whether `expr` contains no relational operator other than `==`/`!=` —
/// the output invariant of the simplifier (§4.4).
pub fn is_simplified(expr: &Expr) -> bool {
    match expr {
        Expr::Bool(_) => true,
        Expr::Comparison(c) => c.op.is_equality(),
        Expr::And(children) | Expr::Or(children) => children.iter().all(is_simplified),
    }
}

/// Whether `expr` is in disjunctive normal form: a `Bool`, a single
/// equality `Comparison`, a `Conjunction` of equality comparisons, or a
/// `Disjunction` whose every child is one of those — the output invariant
/// of the normalizer (§4.5). `!=` does not count: the normalizer expands
/// it away as a last step.
pub fn is_normalized(expr: &Expr) -> bool {
    fn is_conjunct(expr: &Expr) -> bool {
        match expr {
            Expr::Bool(_) => true,
            // A numeric `!=` cannot survive normalization (it is bit-decomposed
            // into an equality disjunction), but a string `!=` has no bit
            // representation to decompose into, so it is the one inequality
            // still legal in a normalized clause.
            Expr::Comparison(c) => c.op == RelOp::Eq || (c.op == RelOp::Ne && matches!(c.operand, Operand::Str(_))),
            Expr::And(children) => children.len() >= 2 && children.iter().all(is_conjunct),
            Expr::Or(_) => false,
        }
    }

    match expr {
        Expr::Or(children) => children.len() >= 2 && children.iter().all(is_conjunct),
        other => is_conjunct(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bits, Level};
    use flowexpr_span::Span;

    fn eq_cmp(name: &str, width: u16) -> Expr {
        Expr::comparison(name, RelOp::Eq, Operand::Bits(Bits::exact(1, width)), Span::dummy())
    }

    #[test]
    fn rejects_nested_same_type_connective() {
        let bad = Expr::And(vec![Expr::And(vec![eq_cmp("a", 8), eq_cmp("b", 8)]), eq_cmp("c", 8)]);
        assert!(!honors_invariants(&bad));
    }

    #[test]
    fn rejects_connective_with_one_child() {
        let bad = Expr::And(vec![eq_cmp("a", 8)]);
        assert!(!honors_invariants(&bad));
    }

    #[test]
    fn rejects_zero_mask() {
        let bad = Expr::comparison("a", RelOp::Eq, Operand::Bits(Bits::new(1, 0, 8)), Span::dummy());
        assert!(!honors_invariants(&bad));
    }

    #[test]
    fn accepts_well_formed_tree() {
        let ok = Expr::conjunction([eq_cmp("a", 8), eq_cmp("b", 8)]);
        assert!(honors_invariants(&ok));
    }

    #[test]
    fn symbol_invariant_checks_width_and_stringiness() {
        let resolve = |name: &str| -> Option<ResolvedSymbol> {
            match name {
                "a" => Some(ResolvedSymbol { width: 8, level: Level::Ordinal, is_string: false, must_crossproduct: false, is_predicate: false }),
                _ => None,
            }
        };
        assert!(honors_symbol_invariants(&eq_cmp("a", 8), &resolve));
        assert!(!honors_symbol_invariants(&eq_cmp("a", 16), &resolve));
        assert!(!honors_symbol_invariants(&eq_cmp("missing", 8), &resolve));
    }

    #[test]
    fn normalized_rejects_relational_and_nested_or() {
        let lt = Expr::comparison("a", RelOp::Lt, Operand::Bits(Bits::exact(1, 8)), Span::dummy());
        assert!(!is_normalized(&lt));
        let nested_or = Expr::And(vec![Expr::Or(vec![eq_cmp("a", 8), eq_cmp("b", 8)]), eq_cmp("c", 8)]);
        assert!(!is_normalized(&nested_or));
        let dnf = Expr::disjunction([Expr::conjunction([eq_cmp("a", 8), eq_cmp("b", 8)]), eq_cmp("c", 8)]);
        assert!(is_normalized(&dnf));
    }
}
