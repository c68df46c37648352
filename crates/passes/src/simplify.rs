use flowexpr_ast::{width_mask, Bits, Comparison, Expr, Operand, RelOp, SymbolResolver};

/// Applies the simplifier's meaning-preserving rewrites to a fixed point
/// (§4.4): constant folding and connective flattening (handled for free by
/// [`Expr::conjunction`]/[`Expr::disjunction`]), relational lowering to
/// mask/value equality on Ordinal symbols, and intra-node
/// absorption/annihilation. Iterates bottom-up passes until one produces
/// no change, since relational lowering can expose new foldable structure
/// that a single pass would miss.
#[tracing::instrument(level = "debug", skip_all)]
pub fn simplify(expr: Expr, resolver: &dyn SymbolResolver) -> Expr {
    let mut current = expr;
    loop {
        let next = simplify_pass(current.clone(), resolver);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn simplify_pass(expr: Expr, resolver: &dyn SymbolResolver) -> Expr {
    match expr {
        Expr::Bool(b) => Expr::Bool(b),
        Expr::Comparison(c) => lower_comparison(c, resolver),
        Expr::And(children) => {
            let simplified: Vec<Expr> = children.into_iter().map(|c| simplify_pass(c, resolver)).collect();
            if has_conjunction_contradiction(&simplified) {
                Expr::Bool(false)
            } else {
                Expr::conjunction(simplified)
            }
        }
        Expr::Or(children) => {
            let simplified: Vec<Expr> = children.into_iter().map(|c| simplify_pass(c, resolver)).collect();
            if has_disjunction_tautology(&simplified) {
                Expr::Bool(true)
            } else {
                Expr::disjunction(simplified)
            }
        }
    }
}

/// Lowers a single relational comparison on an Ordinal symbol to a
/// disjunction of mask/value equality comparisons covering the same
/// integer range, by longest-prefix decomposition (§4.4 item 3; the
/// technique is OVN's `expr_fill_range` leaf-splitting, see DESIGN.md).
/// Leaves `==`/`!=` comparisons untouched — `!=` is lowered later, by the
/// normalizer, per the implementation-defined choice §9 calls out.
fn lower_comparison(c: Comparison, resolver: &dyn SymbolResolver) -> Expr {
    if c.op.is_equality() {
        return Expr::Comparison(c);
    }
    let Operand::Bits(bits) = &c.operand else {
        // String symbols never carry a non-equality operator past the
        // parser's legality check; defensive no-op if one somehow does.
        return Expr::Comparison(c);
    };
    let Some(resolved) = resolver.resolve(&c.symbol) else {
        // Only reachable if `simplify` runs on a tree that was never
        // annotated against this resolver; skip lowering rather than panic.
        return Expr::Comparison(c);
    };

    let width = resolved.width;
    let full = width_mask(width);
    let cval = bits.value;
    let span = c.span;
    let symbol = c.symbol.clone();

    let (lo, hi, empty) = match c.op {
        RelOp::Lt => {
            if cval == 0 {
                (0, 0, true)
            } else {
                (0, cval - 1, false)
            }
        }
        RelOp::Le => (0, cval, false),
        RelOp::Gt => {
            if cval == full {
                (0, 0, true)
            } else {
                (cval + 1, full, false)
            }
        }
        RelOp::Ge => (cval, full, false),
        RelOp::Eq | RelOp::Ne => unreachable!("equality handled above"),
    };

    if empty {
        return Expr::Bool(false);
    }
    if lo == 0 && hi == full {
        return Expr::Bool(true);
    }

    let pieces = range_to_prefix_bits(lo, hi, width);
    Expr::disjunction(pieces.into_iter().map(|b| Expr::comparison(symbol.clone(), RelOp::Eq, Operand::Bits(b), span)))
}

/// Splits the inclusive range `[lo, hi]` into the minimal set of
/// power-of-two-aligned blocks, each expressed as a `(value, mask)` pair
/// whose mask is a contiguous high-bit prefix. Each iteration picks the
/// largest block that both starts at `lo`'s natural alignment and fits
/// without overshooting `hi` — the standard range-to-CIDR algorithm.
fn range_to_prefix_bits(lo: u128, hi: u128, width: u16) -> Vec<Bits> {
    if lo > hi {
        return Vec::new();
    }
    let mut blocks = Vec::new();
    let mut cur = lo;
    let width_cap = u32::from(width);
    loop {
        let remaining = hi - cur;
        let align = if cur == 0 { width_cap } else { cur.trailing_zeros().min(width_cap) };
        let mut k = align;
        while k > 0 && block_span_minus_one(k) > remaining {
            k -= 1;
        }
        let size = 1u128 << k;
        let mask = width_mask(width) & !(size - 1);
        blocks.push(Bits::new(cur, mask, width));
        if size - 1 >= remaining {
            break;
        }
        cur += size;
    }
    blocks
}

fn block_span_minus_one(k: u32) -> u128 {
    if k >= 128 {
        u128::MAX
    } else {
        (1u128 << k) - 1
    }
}

/// Whether two Comparisons in the same Conjunction directly contradict:
/// same symbol, same equality operator, incompatible constants. Per §9's
/// open question, only *exact* conflicts on identical `(symbol, relop)`
/// tuples are detected — deeper cross-symbol reasoning (e.g. overlapping
/// subfields of the same parent) is explicitly optional and left undone.
fn has_conjunction_contradiction(children: &[Expr]) -> bool {
    for i in 0..children.len() {
        for j in (i + 1)..children.len() {
            if contradicts(&children[i], &children[j]) {
                return true;
            }
        }
    }
    false
}

fn contradicts(a: &Expr, b: &Expr) -> bool {
    let (Expr::Comparison(a), Expr::Comparison(b)) = (a, b) else { return false };
    if a.symbol != b.symbol {
        return false;
    }
    match (&a.operand, &b.operand) {
        (Operand::Bits(ab), Operand::Bits(bb)) => match (a.op, b.op) {
            (RelOp::Eq, RelOp::Eq) => !ab.compatible(bb),
            (RelOp::Eq, RelOp::Ne) | (RelOp::Ne, RelOp::Eq) => ab == bb,
            _ => false,
        },
        (Operand::Str(sa), Operand::Str(sb)) => match (a.op, b.op) {
            (RelOp::Eq, RelOp::Eq) => sa != sb,
            (RelOp::Eq, RelOp::Ne) | (RelOp::Ne, RelOp::Eq) => sa == sb,
            _ => false,
        },
        _ => false,
    }
}

/// Whether two Comparisons in the same Disjunction form a tautology:
/// same symbol, complementary equality operators, identical constant
/// (`x == c || x != c`).
fn has_disjunction_tautology(children: &[Expr]) -> bool {
    for i in 0..children.len() {
        for j in (i + 1)..children.len() {
            if tautologous(&children[i], &children[j]) {
                return true;
            }
        }
    }
    false
}

fn tautologous(a: &Expr, b: &Expr) -> bool {
    let (Expr::Comparison(a), Expr::Comparison(b)) = (a, b) else { return false };
    if a.symbol != b.symbol || a.op == b.op || !a.op.is_equality() || !b.op.is_equality() {
        return false;
    }
    match (&a.operand, &b.operand) {
        (Operand::Bits(ab), Operand::Bits(bb)) => ab == bb,
        (Operand::Str(sa), Operand::Str(sb)) => sa == sb,
        _ => false,
    }
}
