//! The recursive-descent parser: turns a [`Token`](flowexpr_lexer::Token)
//! stream (or raw source text) into a well-formed [`Expr`], resolving every
//! symbol reference against a [`SymbolResolver`] as it goes so that
//! operator legality and operand widths are checked at parse time rather
//! than deferred to a later pass.
//!
//! Grammar, informally:
//!
//! ```text
//! expr   := or
//! or     := and ("||" and)*
//! and    := not ("&&" not)*
//! not    := "!" not | primary
//! primary:= "(" expr ")" | "true" | "false" | cmp
//! cmp    := atom (relop atom (relop atom)?)?
//! atom   := "{" const ("," const)* "}" | term | const
//! term   := ident ("[" int (".." int)? "]")?
//! ```
//!
//! `cmp` with no relop at all is the "bare predicate" sugar; `cmp` with two
//! relops is the `a < x < b` range-chain sugar, legal only when the middle
//! atom names an Ordinal symbol.

mod constant;
mod context;
mod expression;

pub use constant::{decimal, hex, ipv4, ipv6, mac, ConstLit};

use context::ParserContext;
use flowexpr_ast::{Expr, SymbolResolver};
use flowexpr_errors::Result;
use flowexpr_lexer::Token;
use flowexpr_span::Span;

/// Parses an already-tokenized expression, resolving every symbol
/// reference against `resolver`. Fails on a trailing token: a full
/// expression must consume the entire stream.
pub fn parse(tokens: Vec<(Token, Span)>, resolver: &dyn SymbolResolver) -> Result<Expr> {
    let mut ctx = ParserContext::new(tokens, resolver);
    let expr = ctx.parse_expr()?;
    ctx.expect_end()?;
    Ok(expr)
}

/// Tokenizes `text` and parses it in one step.
pub fn parse_string(text: &str, resolver: &dyn SymbolResolver) -> Result<Expr> {
    let tokens = flowexpr_lexer::tokenize(text)?;
    parse(tokens, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowexpr_ast::{Level, ResolvedSymbol};

    struct FixedResolver;

    impl SymbolResolver for FixedResolver {
        fn resolve(&self, name: &str) -> Option<ResolvedSymbol> {
            match name {
                "tcp.dst" => Some(ResolvedSymbol { width: 16, level: Level::Ordinal, is_string: false, must_crossproduct: false, is_predicate: false }),
                "ip.src" => Some(ResolvedSymbol { width: 32, level: Level::Ordinal, is_string: false, must_crossproduct: true, is_predicate: false }),
                "eth.type" => Some(ResolvedSymbol { width: 16, level: Level::Nominal, is_string: false, must_crossproduct: false, is_predicate: false }),
                "inport" => Some(ResolvedSymbol { width: 0, level: Level::Nominal, is_string: true, must_crossproduct: false, is_predicate: false }),
                "is_chassis_resident" => Some(ResolvedSymbol { width: 1, level: Level::Boolean, is_string: false, must_crossproduct: false, is_predicate: true }),
                _ => None,
            }
        }
    }

    fn parse_ok(src: &str) -> Expr {
        parse_string(src, &FixedResolver).unwrap_or_else(|e| panic!("failed to parse `{src}`: {e}"))
    }

    fn parse_err(src: &str) {
        assert!(parse_string(src, &FixedResolver).is_err(), "expected `{src}` to fail to parse");
    }

    #[test]
    fn parses_simple_equality() {
        let expr = parse_ok("tcp.dst == 80");
        assert_eq!(expr.to_string(), "tcp.dst == 0x50");
    }

    #[test]
    fn reversed_comparison_mirrors_operator() {
        let expr = parse_ok("80 == tcp.dst");
        assert_eq!(expr.to_string(), "tcp.dst == 0x50");
        let lt = parse_ok("10 < tcp.dst");
        assert_eq!(lt.to_string(), "tcp.dst > 0xa");
    }

    #[test]
    fn range_chain_desugars_to_conjunction() {
        let expr = parse_ok("10 < tcp.dst < 20");
        assert_eq!(expr.to_string(), "tcp.dst > 0xa && tcp.dst < 0x14");
    }

    #[test]
    fn range_chain_rejects_nominal_symbol() {
        parse_err("1 < eth.type < 2");
    }

    #[test]
    fn set_equality_desugars_to_disjunction() {
        let expr = parse_ok("tcp.dst == {80, 443}");
        assert_eq!(expr.to_string(), "tcp.dst == 0x50 || tcp.dst == 0x1bb");
    }

    #[test]
    fn set_inequality_desugars_to_conjunction() {
        let expr = parse_ok("tcp.dst != {80, 443}");
        assert_eq!(expr.to_string(), "tcp.dst != 0x50 && tcp.dst != 0x1bb");
    }

    #[test]
    fn bare_predicate_reference_is_sugar_for_equality() {
        let expr = parse_ok("is_chassis_resident");
        assert_eq!(expr.to_string(), "is_chassis_resident == 0x1");
    }

    #[test]
    fn predicate_compared_against_boolean_literal() {
        let expr = parse_ok("is_chassis_resident == false");
        assert_eq!(expr.to_string(), "is_chassis_resident != 0x1");
    }

    #[test]
    fn predicate_sentinel_format_then_parse_round_trips() {
        // A bare predicate reference formats as its `0x1` sentinel
        // comparison; re-parsing that text must land back on the same tree,
        // not just the post-annotation one (the bug was only ever exercised
        // post-inlining, where predicates don't appear any more).
        let bare = parse_ok("is_chassis_resident");
        let rendered = bare.to_string();
        assert_eq!(rendered, "is_chassis_resident == 0x1");
        let reparsed = parse_ok(&rendered);
        assert_eq!(reparsed, bare);
        assert_eq!(reparsed.to_string(), rendered);

        let negated = parse_ok("!is_chassis_resident");
        let rendered_negated = negated.to_string();
        assert_eq!(rendered_negated, "is_chassis_resident != 0x1");
        let reparsed_negated = parse_ok(&rendered_negated);
        assert_eq!(reparsed_negated, negated);
    }

    #[test]
    fn bare_reference_rejected_for_non_predicate() {
        parse_err("tcp.dst");
    }

    #[test]
    fn negation_pushes_to_leaves() {
        let expr = parse_ok("!(tcp.dst == 80 && eth.type == 0x800)");
        assert_eq!(expr.to_string(), "tcp.dst != 0x50 || eth.type != 0x800");
    }

    #[test]
    fn double_negation_cancels() {
        let expr = parse_ok("!!(tcp.dst == 80)");
        assert_eq!(expr.to_string(), "tcp.dst == 0x50");
    }

    #[test]
    fn string_operand_on_string_symbol() {
        let expr = parse_ok("inport == \"sw0-p1\"");
        assert_eq!(expr.to_string(), "inport == \"sw0-p1\"");
    }

    #[test]
    fn nominal_symbol_rejects_ordering_operator() {
        parse_err("eth.type < 0x800");
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        parse_err("nonexistent == 1");
    }

    #[test]
    fn bit_range_subfield_is_resolved_by_name() {
        parse_err("tcp.flags[3..5] == 1");
    }

    #[test]
    fn masked_literal_round_trips() {
        let expr = parse_ok("ip.src == 0xc0a80000/0xffff0000");
        assert_eq!(expr.to_string(), "ip.src == 0xc0a80000/0xffff0000");
    }
}
