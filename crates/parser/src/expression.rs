use crate::constant::{self, ConstLit};
use crate::context::ParserContext;
use flowexpr_ast::{Bits, Expr, Operand, RelOp, ResolvedSymbol};
use flowexpr_errors::{Error, Result};
use flowexpr_lexer::Token;
use flowexpr_span::Span;

/// One operand position in a comparison chain, before it is known which
/// position (if any) names a symbol. `cmp := atom (relop atom)(relop atom)?`
/// generalizes the grammar's `term (relop operand)*` so that a reversed
/// comparison (`constant R term`) and a range comparison (`a < x < b`,
/// where the symbol is the middle atom) parse through the same path as the
/// ordinary `term R constant` case; [`ParserContext::build_single`] and
/// [`ParserContext::build_range`] then figure out which atom is the term
/// and mirror operators as needed.
enum Atom {
    Term(String, Span, ResolvedSymbol),
    Const(ConstLit, Span),
    Set(Vec<ConstLit>, Span),
    BoolLit(bool, Span),
}

impl Atom {
    fn span(&self) -> Span {
        match self {
            Atom::Term(_, s, _) | Atom::Const(_, s) | Atom::Set(_, s) | Atom::BoolLit(_, s) => *s,
        }
    }
}

impl<'a> ParserContext<'a> {
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.parse_and()?;
            expr = Expr::disjunction([expr, rhs]);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_not()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.parse_not()?;
            expr = Expr::conjunction([expr, rhs]);
        }
        Ok(expr)
    }

    /// `!X` is desugared immediately via De Morgan rather than represented
    /// as a distinct AST node — the AST has no "Not" variant, so every
    /// negation must be pushed to its leaves before it can be returned.
    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_not()?;
            Ok(inner.negate())
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Token::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::True => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            _ => self.parse_cmp(),
        }
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let first = self.parse_atom()?;
        if !self.at_relop() {
            return bare_atom_to_expr(first);
        }
        let (op1, op1_span) = self.eat_relop();
        let second = self.parse_atom()?;
        if self.at_relop() {
            let (op2, _) = self.eat_relop();
            let third = self.parse_atom()?;
            return self.build_range(first, op1, second, op2, third);
        }
        self.build_single(first, op1, second, op1_span)
    }

    fn at_relop(&self) -> bool {
        matches!(self.peek(), Token::EqEq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq)
    }

    fn eat_relop(&mut self) -> (RelOp, Span) {
        let (tok, span) = self.bump();
        let op = match tok {
            Token::EqEq => RelOp::Eq,
            Token::NotEq => RelOp::Ne,
            Token::Lt => RelOp::Lt,
            Token::LtEq => RelOp::Le,
            Token::Gt => RelOp::Gt,
            Token::GtEq => RelOp::Ge,
            other => unreachable!("eat_relop called without a relop present: {other:?}"),
        };
        (op, span)
    }

    fn parse_atom(&mut self) -> Result<Atom> {
        match self.peek() {
            Token::LBrace => self.parse_set(),
            Token::Ident(_) => self.parse_term(),
            Token::True => {
                let (_, span) = self.bump();
                Ok(Atom::BoolLit(true, span))
            }
            Token::False => {
                let (_, span) = self.bump();
                Ok(Atom::BoolLit(false, span))
            }
            _ => {
                let (lit, span) = self.parse_const_lit()?;
                Ok(Atom::Const(lit, span))
            }
        }
    }

    fn parse_term(&mut self) -> Result<Atom> {
        let (tok, mut span) = self.bump();
        let base = match tok {
            Token::Ident(s) => s,
            other => return Err(Error::syntax(format!("expected an identifier, found `{other}`"), span)),
        };

        let mut full_name = base.clone();
        if self.eat(&Token::LBracket) {
            let lo = self.parse_bit_position()?;
            let hi = if self.eat(&Token::DotDot) { self.parse_bit_position()? } else { lo };
            let rb_span = self.expect(&Token::RBracket)?;
            span = span + rb_span;
            if lo > hi {
                return Err(Error::type_level(format!("empty bit range [{lo}..{hi}] on `{base}`"), span));
            }
            full_name = format!("{base}[{lo}..{hi}]");
        }

        let resolved = self.resolver.resolve(&full_name).ok_or_else(|| Error::unknown_symbol(&full_name, span))?;
        Ok(Atom::Term(full_name, span, resolved))
    }

    fn parse_bit_position(&mut self) -> Result<u16> {
        let (tok, span) = self.bump();
        match tok {
            Token::Int(s) => s.parse::<u16>().map_err(|_| Error::syntax(format!("expected a bit position, found `{s}`"), span)),
            Token::HexInt(s) => u16::from_str_radix(&s, 16).map_err(|_| Error::syntax(format!("expected a bit position, found `0x{s}`"), span)),
            other => Err(Error::syntax(format!("expected a bit position, found `{other}`"), span)),
        }
    }

    fn parse_set(&mut self) -> Result<Atom> {
        let start = self.expect(&Token::LBrace)?;
        let mut items = Vec::new();
        loop {
            let (lit, _) = self.parse_const_lit()?;
            items.push(lit);
            if !self.eat(&Token::Comma) {
                break;
            }
            if matches!(self.peek(), Token::RBrace) {
                break;
            }
        }
        let end = self.expect(&Token::RBrace)?;
        let span = start + end;
        if items.is_empty() {
            return Err(Error::operand("set literal must not be empty", span));
        }
        Ok(Atom::Set(items, span))
    }

    fn parse_const_lit(&mut self) -> Result<(ConstLit, Span)> {
        let (tok, span) = self.bump();
        let mut lit = match tok {
            Token::Int(s) => constant::decimal(&s, span)?,
            Token::HexInt(s) => constant::hex(&s, span)?,
            Token::Ipv4(s) => constant::ipv4(&s, span)?,
            Token::Ipv6(s) => constant::ipv6(&s, span)?,
            Token::Mac(s) => constant::mac(&s, span)?,
            Token::Str(s) => ConstLit::Str(s),
            other => return Err(Error::syntax(format!("expected a constant, found `{other}`"), span)),
        };

        let mut full_span = span;
        if self.eat(&Token::Slash) {
            let (mask_tok, mask_span) = self.bump();
            let mask_value = match mask_tok {
                Token::Int(s) => constant::decimal(&s, mask_span)?,
                Token::HexInt(s) => constant::hex(&s, mask_span)?,
                other => return Err(Error::syntax(format!("expected a mask constant, found `{other}`"), mask_span)),
            };
            match (&mut lit, mask_value) {
                (ConstLit::Number { mask, .. }, ConstLit::Number { value, .. }) => *mask = Some(value),
                _ => return Err(Error::type_level("a mask suffix requires a numeric constant", full_span)),
            }
            full_span = full_span + mask_span;
        }
        Ok((lit, full_span))
    }

    fn literal_to_operand(&self, lit: &ConstLit, resolved: &ResolvedSymbol, span: Span) -> Result<Operand> {
        if resolved.is_string {
            Ok(Operand::Str(lit.to_str(span)?))
        } else {
            Ok(Operand::Bits(lit.to_bits(resolved.width, span)?))
        }
    }

    fn build_single(&mut self, first: Atom, op: RelOp, second: Atom, op_span: Span) -> Result<Expr> {
        match (first, second) {
            (Atom::Term(name, tspan, resolved), operand) => self.build_comparison(name, tspan, &resolved, op, operand, op_span),
            (operand, Atom::Term(name, tspan, resolved)) => self.build_comparison(name, tspan, &resolved, op.mirror(), operand, op_span),
            (a, b) => Err(Error::syntax("a comparison needs exactly one field reference", a.span() + b.span())),
        }
    }

    fn build_comparison(&mut self, name: String, tspan: Span, resolved: &ResolvedSymbol, op: RelOp, operand: Atom, op_span: Span) -> Result<Expr> {
        match operand {
            Atom::Term(_, span, _) => Err(Error::operand("comparing two field references directly is not supported", span)),
            Atom::BoolLit(b, bspan) => {
                if !resolved.is_predicate {
                    return Err(Error::type_level("a boolean-literal operand requires a predicate symbol", bspan));
                }
                if !op.is_equality() {
                    return Err(Error::type_level(format!("operator `{op}` is not legal against a boolean literal"), op_span));
                }
                let want_true = if op == RelOp::Eq { b } else { !b };
                Ok(predicate_sentinel(name, tspan, want_true))
            }
            Atom::Set(items, set_span) => {
                if resolved.is_predicate {
                    return Err(Error::type_level("predicate references cannot use a set operand", set_span));
                }
                if !op.is_equality() {
                    return Err(Error::operand(format!("operator `{op}` cannot be used with a set operand"), set_span));
                }
                let mut eqs = Vec::with_capacity(items.len());
                for item in &items {
                    let operand = self.literal_to_operand(item, resolved, tspan)?;
                    eqs.push((name.clone(), operand));
                }
                if op == RelOp::Eq {
                    Ok(Expr::disjunction(eqs.into_iter().map(|(n, o)| Expr::comparison(n, RelOp::Eq, o, tspan))))
                } else {
                    Ok(Expr::conjunction(eqs.into_iter().map(|(n, o)| Expr::comparison(n, RelOp::Ne, o, tspan))))
                }
            }
            Atom::Const(lit, lit_span) => {
                if resolved.is_predicate {
                    return self.predicate_literal_comparison(name, tspan, op, &lit, lit_span, op_span);
                }
                if !resolved.level.admits(op) {
                    return Err(Error::type_level(format!("operator `{op}` is not legal on a {} symbol", resolved.level), op_span));
                }
                let operand = self.literal_to_operand(&lit, resolved, lit_span)?;
                Ok(Expr::comparison(name, op, operand, tspan + lit_span))
            }
        }
    }

    /// A predicate compared against a plain numeric constant is illegal
    /// except for the one shape `format` itself produces: `0x1`/`0x0`
    /// against `==`/`!=`, the canonical rendering of a bare predicate
    /// reference's `(Eq|Ne, 1/1)` sentinel comparison (see
    /// `predicate_sentinel` and `Comparison`'s `Display` impl). Accepting
    /// it here is what makes `format` then `parse` round-trip for a tree
    /// holding an un-annotated predicate reference — without it, `flowexpr
    /// fmt ip4` prints `ip4 == 0x1`, which would otherwise fail to
    /// re-parse. Any other numeric/string constant against a predicate is
    /// still §4.2's "`==`/`!=` on a Boolean predicate with a non-literal-
    /// Boolean operand is an error" rule, applied uniformly to Nominal
    /// predicates too since a predicate always denotes a whole boolean-
    /// valued expansion when referenced by name (see DESIGN.md).
    fn predicate_literal_comparison(&mut self, name: String, tspan: Span, op: RelOp, lit: &ConstLit, lit_span: Span, op_span: Span) -> Result<Expr> {
        if !op.is_equality() {
            return Err(Error::type_level(format!("operator `{op}` is not legal against a predicate reference"), op_span));
        }
        if let ConstLit::Number { value, mask: None, natural_width: None } = lit {
            if *value == 0 || *value == 1 {
                let literal_true = *value == 1;
                let want_true = if op == RelOp::Eq { literal_true } else { !literal_true };
                return Ok(predicate_sentinel(name, tspan, want_true));
            }
        }
        Err(Error::type_level("a predicate reference only accepts a bare use or a comparison against `true`/`false` (or its `0x1`/`0x0` sentinel rendering)", lit_span))
    }

    fn build_range(&mut self, first: Atom, op1: RelOp, second: Atom, op2: RelOp, third: Atom) -> Result<Expr> {
        let span = first.span() + third.span();
        let (name, tspan, resolved) = match second {
            Atom::Term(n, s, r) => (n, s, r),
            _ => return Err(Error::syntax("a range comparison needs the field in the middle, e.g. `a < x < b`", span)),
        };
        let (lo_lit, lo_span) = match first {
            Atom::Const(lit, s) => (lit, s),
            _ => return Err(Error::syntax("a range comparison needs constant bounds", span)),
        };
        let (hi_lit, hi_span) = match third {
            Atom::Const(lit, s) => (lit, s),
            _ => return Err(Error::syntax("a range comparison needs constant bounds", span)),
        };
        if resolved.is_predicate || resolved.is_string {
            return Err(Error::type_level("a range comparison requires an ordinal numeric symbol", tspan));
        }
        let op1m = op1.mirror();
        if !resolved.level.admits(op1m) || !resolved.level.admits(op2) {
            return Err(Error::type_level(format!("a range comparison is not legal on a {} symbol", resolved.level), span));
        }
        let lo_operand = self.literal_to_operand(&lo_lit, &resolved, lo_span)?;
        let hi_operand = self.literal_to_operand(&hi_lit, &resolved, hi_span)?;
        let left = Expr::comparison(name.clone(), op1m, lo_operand, tspan + lo_span);
        let right = Expr::comparison(name, op2, hi_operand, tspan + hi_span);
        Ok(Expr::conjunction([left, right]))
    }
}

fn bare_atom_to_expr(atom: Atom) -> Result<Expr> {
    match atom {
        Atom::Term(name, span, resolved) => {
            if !resolved.is_predicate {
                return Err(Error::type_level("a bare symbol reference is only legal for a predicate", span));
            }
            Ok(predicate_sentinel(name, span, true))
        }
        other => Err(Error::syntax("expected a comparison", other.span())),
    }
}

fn predicate_sentinel(name: String, span: Span, want_true: bool) -> Expr {
    let op = if want_true { RelOp::Eq } else { RelOp::Ne };
    Expr::comparison(name, op, Operand::Bits(Bits::exact(1, 1)), span)
}
