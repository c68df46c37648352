use crate::table::SymbolTable;
use flowexpr_ast::Expr;
use flowexpr_errors::{Error, Result};
use flowexpr_lexer::Token;
use flowexpr_span::Span;

/// The parser entry point for action-assignment compilation (§6: "this
/// spec treats the action encoder as external and only commits to
/// delivering the prerequisite expression tree"). Accepts a minimal
/// `dest = value` token stream — `dest` a registered symbol, `value` a
/// constant literal sized to `dest`'s width, or a bare identifier resolved
/// through `resolve_port` for a string (port) destination — and returns
/// the value's raw big-endian bytes alongside `dest`'s immediate prereqs,
/// parsed (but not annotated: inlining `dest`'s own prerequisite further is
/// the caller's job, via the ordinary [`crate::annotate`] pipeline, not
/// this entry point's).
pub fn parse_assignment(tokens: Vec<(Token, Span)>, symtab: &SymbolTable, resolve_port: &dyn Fn(&str) -> Option<u32>) -> Result<(Vec<u8>, Expr)> {
    let mut pos = 0usize;
    let next = |pos: &mut usize| -> (Token, Span) {
        let entry = tokens.get(*pos).cloned().unwrap_or((Token::Eof, Span::dummy()));
        if *pos + 1 < tokens.len() {
            *pos += 1;
        }
        entry
    };

    let (dest_tok, dest_span) = next(&mut pos);
    let dest_name = match dest_tok {
        Token::Ident(s) => s,
        other => return Err(Error::syntax(format!("expected a destination symbol, found `{other}`"), dest_span)),
    };
    let symbol = symtab.lookup(&dest_name).ok_or_else(|| Error::unknown_symbol(&dest_name, dest_span))?;
    let resolved = symtab.resolve(&dest_name).ok_or_else(|| Error::unknown_symbol(&dest_name, dest_span))?;
    if resolved.is_predicate {
        return Err(Error::type_level(format!("`{dest_name}` is a predicate and cannot be an assignment destination"), dest_span));
    }

    let (eq_tok, eq_span) = next(&mut pos);
    if eq_tok != Token::Eq {
        return Err(Error::syntax(format!("expected `=`, found `{eq_tok}`"), eq_span));
    }

    let (rhs_tok, rhs_span) = next(&mut pos);
    let bytes = if resolved.is_string {
        match rhs_tok {
            Token::Str(s) => s.into_bytes(),
            Token::Ident(name) => {
                let port = resolve_port(&name).ok_or_else(|| Error::operand(format!("unknown port `{name}`"), rhs_span))?;
                port.to_be_bytes().to_vec()
            }
            other => return Err(Error::type_level(format!("expected a string or port name, found `{other}`"), rhs_span)),
        }
    } else {
        let lit = match rhs_tok {
            Token::Int(s) => flowexpr_parser::decimal(&s, rhs_span)?,
            Token::HexInt(s) => flowexpr_parser::hex(&s, rhs_span)?,
            Token::Ipv4(s) => flowexpr_parser::ipv4(&s, rhs_span)?,
            Token::Ipv6(s) => flowexpr_parser::ipv6(&s, rhs_span)?,
            Token::Mac(s) => flowexpr_parser::mac(&s, rhs_span)?,
            other => return Err(Error::type_level(format!("expected a numeric constant, found `{other}`"), rhs_span)),
        };
        let bits = lit.to_bits(resolved.width, rhs_span)?;
        value_bytes(bits.value, resolved.width)
    };

    let (trailing, trailing_span) = next(&mut pos);
    if !matches!(trailing, Token::Eof) {
        return Err(Error::syntax(format!("unexpected trailing token `{trailing}`"), trailing_span));
    }

    let prereqs_ast = match &symbol.prereqs {
        Some(text) => flowexpr_parser::parse_string(text, symtab)?,
        None => Expr::Bool(true),
    };

    Ok((bytes, prereqs_ast))
}

fn value_bytes(value: u128, width: u16) -> Vec<u8> {
    let n = (usize::from(width) + 7) / 8;
    let full = value.to_be_bytes();
    full[16 - n..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDescriptor, FieldRegistry};
    use flowexpr_lexer::tokenize;

    struct TestRegistry;
    impl FieldRegistry for TestRegistry {
        fn describe(&self, field_id: &str) -> Option<FieldDescriptor> {
            match field_id {
                "reg0" => Some(FieldDescriptor { width: 32, maskable: true }),
                "outport" => Some(FieldDescriptor { width: 0, maskable: false }),
                _ => None,
            }
        }
    }

    #[test]
    fn numeric_assignment_encodes_big_endian_bytes() {
        let reg = TestRegistry;
        let t = SymbolTable::new(&reg);
        t.add_field("reg0", "reg0", None, false).unwrap();
        let tokens = tokenize("reg0 = 0x2a").unwrap();
        let (bytes, prereqs) = parse_assignment(tokens, &t, &|_| None).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0x2a]);
        assert_eq!(prereqs, Expr::Bool(true));
    }

    #[test]
    fn port_assignment_resolves_through_callback() {
        let reg = TestRegistry;
        let t = SymbolTable::new(&reg);
        t.add_string("outport", "outport", None).unwrap();
        let tokens = tokenize("outport = sw0_p1").unwrap();
        let (bytes, _) = parse_assignment(tokens, &t, &|name| if name == "sw0_p1" { Some(7) } else { None }).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 7]);
    }

    #[test]
    fn unresolved_port_name_is_an_error() {
        let reg = TestRegistry;
        let t = SymbolTable::new(&reg);
        t.add_string("outport", "outport", None).unwrap();
        let tokens = tokenize("outport = missing").unwrap();
        assert!(parse_assignment(tokens, &t, &|_| None).is_err());
    }
}
