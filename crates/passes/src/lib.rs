//! The three meaning-preserving-then-normalizing rewrite passes that run
//! between parsing and match emission: annotate (§4.3), simplify (§4.4),
//! and normalize (§4.5). Each is a free function over an [`Expr`] rather
//! than a struct with methods — none of them carry state across calls.

mod annotate;
mod normalize;
mod simplify;

pub use annotate::annotate;
pub use normalize::normalize;
pub use simplify::simplify;
