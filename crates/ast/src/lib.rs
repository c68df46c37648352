//! The expression AST: a small sum-typed tree (§3 of the design notes),
//! its structural invariants, and the [`SymbolResolver`] seam that lets the
//! parser type-check comparisons without depending on a concrete symbol
//! table.

mod bits;
mod expr;
mod invariants;
mod level;
mod relop;
mod resolver;

pub use bits::{width_mask, Bits};
pub use expr::{format, Comparison, Expr, Operand};
pub use invariants::{honors_invariants, honors_symbol_invariants, is_normalized, is_simplified};
pub use level::Level;
pub use relop::RelOp;
pub use resolver::{EmptyResolver, ResolvedSymbol, SymbolResolver};
