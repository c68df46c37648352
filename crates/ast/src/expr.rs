use crate::{Bits, RelOp};
use flowexpr_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The right-hand side of a [`Comparison`]. A string symbol only ever pairs
/// with `Str`; a numeric symbol only ever pairs with `Bits`. Which variant
/// is legal for a given comparison is enforced by the parser (against the
/// symbol table) and re-checked structurally by
/// [`honors_invariants`](crate::honors_invariants).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Str(String),
    Bits(Bits),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Operand::Bits(b) => write!(f, "{b}"),
        }
    }
}

/// A single `(symbol, relop, operand)` leaf. `symbol` names an entry in
/// whatever [`SymbolResolver`](crate::SymbolResolver) the pipeline was run
/// against — the AST holds the name, not a pointer into the table, so an
/// `Expr` is self-contained and `Clone`/`Send`/`Sync` without lifetimes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub symbol: String,
    pub op: RelOp,
    pub operand: Operand,
    #[serde(skip, default = "Span::dummy")]
    pub span: Span,
}

impl Comparison {
    pub fn new(symbol: impl Into<String>, op: RelOp, operand: Operand, span: Span) -> Self {
        Comparison { symbol: symbol.into(), op, operand, span }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.symbol, self.op, self.operand)
    }
}

/// The expression tree: a Boolean literal, a comparison leaf, or one of the
/// two connectives. Connectives are flat (`Vec<Expr>`, not a binary tree)
/// and, per the structural invariants, never directly nest a child of
/// their own variant and never hold fewer than two children — use the
/// smart constructors [`Expr::conjunction`]/[`Expr::disjunction`] rather
/// than constructing `And`/`Or` directly, since they restore both
/// invariants (flattening, and collapsing a singleton to its one child).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Bool(bool),
    Comparison(Comparison),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn comparison(symbol: impl Into<String>, op: RelOp, operand: Operand, span: Span) -> Self {
        Expr::Comparison(Comparison::new(symbol, op, operand, span))
    }

    /// Builds a Conjunction from `children`, flattening any nested `And`
    /// and collapsing to `Bool(false)`/the sole child/`Bool(true)` as the
    /// child count demands, so the result always honors the structural
    /// invariants without the caller having to reason about edge cases.
    pub fn conjunction(children: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Expr::And(nested) => flat.extend(nested),
                Expr::Bool(true) => {}
                other => flat.push(other),
            }
        }
        if flat.iter().any(|c| matches!(c, Expr::Bool(false))) {
            return Expr::Bool(false);
        }
        match flat.len() {
            0 => Expr::Bool(true),
            1 => flat.into_iter().next().unwrap(),
            _ => Expr::And(flat),
        }
    }

    /// Builds a Disjunction from `children`, the dual of [`Expr::conjunction`].
    pub fn disjunction(children: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Expr::Or(nested) => flat.extend(nested),
                Expr::Bool(false) => {}
                other => flat.push(other),
            }
        }
        if flat.iter().any(|c| matches!(c, Expr::Bool(true))) {
            return Expr::Bool(true);
        }
        match flat.len() {
            0 => Expr::Bool(false),
            1 => flat.into_iter().next().unwrap(),
            _ => Expr::Or(flat),
        }
    }

    /// Pushes a negation to the leaves by De Morgan's laws: a Conjunction
    /// becomes a Disjunction of negated children and vice versa, a
    /// comparison's operator is negated, and a Boolean literal flips.
    /// Involutive — `e.negate().negate()` is structurally `e` — which is
    /// what makes `!!X` collapse to `X` for free. Used by the parser's `!`
    /// desugaring and by the annotator when inlining a predicate referenced
    /// with `== false`.
    pub fn negate(self) -> Expr {
        match self {
            Expr::Bool(b) => Expr::Bool(!b),
            Expr::Comparison(mut c) => {
                c.op = c.op.negate();
                Expr::Comparison(c)
            }
            Expr::And(children) => Expr::disjunction(children.into_iter().map(Expr::negate)),
            Expr::Or(children) => Expr::conjunction(children.into_iter().map(Expr::negate)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Comparison(c) => write!(f, "{c}"),
            Expr::And(children) => write_joined(f, children, " && ", |e| matches!(e, Expr::Or(_))),
            Expr::Or(children) => write_joined(f, children, " || ", |e| matches!(e, Expr::And(_))),
        }
    }
}

/// Joins `children` with `sep`, parenthesizing a child whenever
/// `needs_parens` says the surrounding operator binds tighter than the
/// child's own operator would otherwise suggest.
fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str, needs_parens: impl Fn(&Expr) -> bool) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if needs_parens(child) {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

/// The canonical textual rendering named by the external interface list:
/// parse order preserved through simplify/normalize where possible, so
/// this is just [`Expr`]'s `Display` impl under its own name. Round-trips
/// back through the parser's `parse_string` up to AST equivalence.
pub fn format(expr: &Expr) -> String {
    expr.to_string()
}
