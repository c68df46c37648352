use flowexpr_ast::{Expr, RelOp};
use flowexpr_errors::{Error, Result};
use flowexpr_symtab::SymbolTable;

/// Inlines every predicate reference with its (recursively annotated)
/// expansion and conjoins each referenced symbol's prerequisites at the
/// point of reference (§4.3). Cycle detection walks the *current*
/// expansion chain rather than a global visited set — a predicate
/// referenced twice in sibling branches is not a cycle, only a predicate
/// that expands back into itself along one path is.
#[tracing::instrument(level = "debug", skip_all)]
pub fn annotate(expr: Expr, symtab: &SymbolTable) -> Result<Expr> {
    let mut chain = Vec::new();
    annotate_inner(expr, symtab, &mut chain)
}

fn annotate_inner(expr: Expr, symtab: &SymbolTable, chain: &mut Vec<String>) -> Result<Expr> {
    match expr {
        Expr::Bool(b) => Ok(Expr::Bool(b)),
        Expr::Comparison(c) => annotate_comparison(c, symtab, chain),
        Expr::And(children) => {
            let annotated: Vec<Expr> = children
                .into_iter()
                .map(|c| annotate_inner(c, symtab, chain))
                .collect::<Result<_>>()?;
            Ok(Expr::conjunction(annotated))
        }
        Expr::Or(children) => {
            let annotated: Vec<Expr> = children
                .into_iter()
                .map(|c| annotate_inner(c, symtab, chain))
                .collect::<Result<_>>()?;
            Ok(Expr::disjunction(annotated))
        }
    }
}

fn annotate_comparison(c: flowexpr_ast::Comparison, symtab: &SymbolTable, chain: &mut Vec<String>) -> Result<Expr> {
    let resolved = symtab
        .resolve(&c.symbol)
        .ok_or_else(|| Error::internal(format!("`{}` resolved during parsing but is missing from the table", c.symbol)))?;

    if resolved.is_predicate {
        if chain.iter().any(|n| n == &c.symbol) {
            let mut trail = chain.clone();
            trail.push(c.symbol.clone());
            return Err(Error::predicate_cycle(&trail));
        }
        chain.push(c.symbol.clone());
        let expansion = symtab.expansion_of(&c.symbol)?;
        let annotated = annotate_inner(expansion, symtab, chain)?;
        chain.pop();
        return Ok(match c.op {
            RelOp::Eq => annotated,
            RelOp::Ne => annotated.negate(),
            other => return Err(Error::internal(format!("predicate comparison with non-equality operator `{other}`"))),
        });
    }

    let leaf = Expr::Comparison(c.clone());
    match symtab.prereqs_of(&c.symbol) {
        Some(text) => {
            let prereq_ast = flowexpr_parser::parse_string(&text, symtab)?;
            let annotated_prereq = annotate_inner(prereq_ast, symtab, chain)?;
            Ok(Expr::conjunction([leaf, annotated_prereq]))
        }
        None => Ok(leaf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowexpr_ast::{Bits, Expr, Operand, RelOp};
    use flowexpr_span::Span;
    use flowexpr_symtab::{FieldDescriptor, FieldRegistry};

    struct TestRegistry;
    impl FieldRegistry for TestRegistry {
        fn describe(&self, field_id: &str) -> Option<FieldDescriptor> {
            match field_id {
                "eth_type" => Some(FieldDescriptor { width: 16, maskable: false }),
                "ip_proto" => Some(FieldDescriptor { width: 8, maskable: true }),
                "tp_port" => Some(FieldDescriptor { width: 16, maskable: true }),
                _ => None,
            }
        }
    }

    fn build_table(reg: &TestRegistry) -> SymbolTable<'_> {
        let t = SymbolTable::new(reg);
        t.add_field("eth.type", "eth_type", None, true).unwrap();
        t.add_predicate("ip4", "eth.type == 0x800").unwrap();
        t.add_field("ip.proto", "ip_proto", None, false).unwrap();
        t.add_predicate("tcp", "ip4 && ip.proto == 6").unwrap();
        t.add_field("tcp.src", "tp_port", Some("tcp"), false).unwrap();
        t
    }

    fn eq(name: &str, value: u128, width: u16) -> Expr {
        Expr::comparison(name, RelOp::Eq, Operand::Bits(Bits::exact(value, width)), Span::dummy())
    }

    #[test]
    fn inlines_predicate_chain_and_prereqs() {
        let reg = TestRegistry;
        let table = build_table(&reg);
        let expr = eq("tcp.src", 80, 16);
        let annotated = annotate(expr, &table).unwrap();
        // tcp.src == 80 && (tcp prereq) -> tcp.src == 80 && (ip4 && ip.proto == 6) -> tcp.src == 80 && eth.type == 0x800 && ip.proto == 6
        match &annotated {
            Expr::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected a 3-way conjunction, got {other:?}"),
        }
    }

    #[test]
    fn detects_predicate_cycle() {
        let reg = TestRegistry;
        let table = SymbolTable::new(&reg);
        table.add_predicate("a", "b").unwrap();
        table.add_predicate("b", "a").unwrap();
        let expr = Expr::comparison("a", RelOp::Eq, Operand::Bits(Bits::exact(1, 1)), Span::dummy());
        assert!(annotate(expr, &table).is_err());
    }

    #[test]
    fn predicate_referenced_twice_in_siblings_is_not_a_cycle() {
        let reg = TestRegistry;
        let table = build_table(&reg);
        let expr = Expr::conjunction([
            Expr::comparison("ip4", RelOp::Eq, Operand::Bits(Bits::exact(1, 1)), Span::dummy()),
            Expr::comparison("ip4", RelOp::Eq, Operand::Bits(Bits::exact(1, 1)), Span::dummy()),
        ]);
        assert!(annotate(expr, &table).is_ok());
    }

    #[test]
    fn negated_predicate_reference_negates_expansion() {
        let reg = TestRegistry;
        let table = build_table(&reg);
        let expr = Expr::comparison("ip4", RelOp::Ne, Operand::Bits(Bits::exact(1, 1)), Span::dummy());
        let annotated = annotate(expr, &table).unwrap();
        assert_eq!(annotated.to_string(), "eth.type != 0x800");
    }
}
