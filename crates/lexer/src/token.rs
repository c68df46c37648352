use serde::{Deserialize, Serialize};
use std::fmt;

/// A lexical token. The core treats tokenization as an external
/// collaborator's job (§1) — this is the smallest hand-rolled scanner that
/// can stand in for one, not a design surface of its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Token {
    /// A dotted identifier, e.g. `tcp.dst` — `[A-Za-z_][A-Za-z0-9_.]*`.
    Ident(String),
    /// Decimal digits with no leading `0x`.
    Int(String),
    /// Hex digits following a `0x` prefix (prefix not included).
    HexInt(String),
    /// A dotted-quad literal, e.g. `192.168.0.1`.
    Ipv4(String),
    /// A colon-separated literal with more than five groups or a `::`,
    /// e.g. `fe80::1`.
    Ipv6(String),
    /// A six-group colon-separated hex literal, e.g. `aa:bb:cc:dd:ee:ff`.
    Mac(String),
    /// The unescaped contents of a double-quoted string literal.
    Str(String),
    True,
    False,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    DotDot,
    /// Separates a value from its mask in a canonical-format numeric
    /// literal (`value/mask`) — not part of the user-facing grammar table
    /// in isolation, but accepted so that `format()`'s mask-bearing output
    /// round-trips through `parse` (see DESIGN.md).
    Slash,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::Int(s) => write!(f, "{s}"),
            Token::HexInt(s) => write!(f, "0x{s}"),
            Token::Ipv4(s) | Token::Ipv6(s) | Token::Mac(s) => write!(f, "{s}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::DotDot => write!(f, ".."),
            Token::Slash => write!(f, "/"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}
