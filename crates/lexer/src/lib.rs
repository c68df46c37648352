//! A minimal hand-rolled tokenizer standing in for the "pre-existing token
//! stream" the spec treats as an external collaborator. Its only job is to
//! turn source text into the [`Token`] stream `flowexpr-parser` consumes.

mod token;

pub use token::Token;

use flowexpr_errors::{Error, Result};
use flowexpr_span::Span;
use std::iter::Peekable;
use std::str::CharIndices;

pub fn tokenize(src: &str) -> Result<Vec<(Token, Span)>> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, chars: src.char_indices().peekable(), line: 1, col: 1 }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        next
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.src.len())
    }

    fn span(&self, lo: usize, hi: usize, line: u32, col: u32) -> Span {
        Span::new(lo as u32, hi as u32, line, col)
    }

    fn run(mut self) -> Result<Vec<(Token, Span)>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start_line = self.line;
            let start_col = self.col;
            let Some(&(start, c)) = self.chars.peek() else {
                tokens.push((Token::Eof, self.span(self.src.len(), self.src.len(), start_line, start_col)));
                break;
            };

            let tok = if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == '_' || c.is_ascii_alphabetic() {
                self.lex_ident_like()?
            } else if c == ':' {
                self.lex_colon_literal()?
            } else if c == '"' {
                self.lex_string()?
            } else {
                self.lex_operator()?
            };
            let end = self.pos();
            tokens.push((tok, self.span(start, end, start_line, start_col)));
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_operator(&mut self) -> Result<Token> {
        let (pos, c) = self.bump().expect("checked by caller");
        let line = self.line;
        let col = self.col;
        let two = |this: &mut Self, second: char, one: Token, two: Token| -> Token {
            if this.peek_char() == Some(second) {
                this.bump();
                two
            } else {
                one
            }
        };
        Ok(match c {
            '=' if self.peek_char() == Some('=') => {
                self.bump();
                Token::EqEq
            }
            '=' => Token::Eq,
            '!' => two(self, '=', Token::Bang, Token::NotEq),
            '<' => two(self, '=', Token::Lt, Token::LtEq),
            '>' => two(self, '=', Token::Gt, Token::GtEq),
            '&' if self.peek_char() == Some('&') => {
                self.bump();
                Token::AndAnd
            }
            '|' if self.peek_char() == Some('|') => {
                self.bump();
                Token::OrOr
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '/' => Token::Slash,
            '.' if self.peek_char() == Some('.') => {
                self.bump();
                Token::DotDot
            }
            other => {
                return Err(Error::lexical(format!("unexpected character `{other}`"), self.span(pos, pos + 1, line, col)));
            }
        })
    }

    fn lex_string(&mut self) -> Result<Token> {
        let (pos, _) = self.bump().expect("checked by caller");
        let line = self.line;
        let col = self.col;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some((_, '"')) => return Ok(Token::Str(out)),
                Some((_, '\\')) => match self.bump() {
                    Some((_, '"')) => out.push('"'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, other)) => out.push(other),
                    None => return Err(Error::lexical("unterminated string literal", self.span(pos, pos + 1, line, col))),
                },
                Some((_, c)) => out.push(c),
                None => return Err(Error::lexical("unterminated string literal", self.span(pos, pos + 1, line, col))),
            }
        }
    }

    /// Identifiers, keywords (`true`/`false`), and MAC/IPv6 literals that
    /// happen to start with a hex letter (`aa:bb:cc:dd:ee:ff`) all begin
    /// the same way: a run of `[A-Za-z0-9_.]`. We scan that run first and
    /// then, if a `:` immediately follows and the run so far looks like
    /// hex groups, hand off to the colon-literal scanner.
    fn lex_ident_like(&mut self) -> Result<Token> {
        let (start, _) = self.bump().expect("checked by caller");
        let line = self.line;
        let col = self.col;
        let mut end = start + 1;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.bump();
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.src[start..end];

        if self.peek_char() == Some(':') && text.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.lex_colon_literal_continue(start, line, col);
        }

        Ok(match text {
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(text.to_string()),
        })
    }

    /// Handles both a literal beginning with `:` (IPv6 shorthand, `::1`)
    /// and the continuation path from [`Self::lex_ident_like`].
    fn lex_colon_literal(&mut self) -> Result<Token> {
        let (start, _) = self.chars.peek().copied().expect("checked by caller");
        let line = self.line;
        let col = self.col;
        self.lex_colon_literal_continue(start, line, col)
    }

    fn lex_colon_literal_continue(&mut self, start: usize, _line: u32, _col: u32) -> Result<Token> {
        let mut end = start;
        let mut groups = 0usize;
        loop {
            while let Some(&(i, c)) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    self.bump();
                    end = i + 1;
                } else {
                    break;
                }
            }
            if self.peek_char() == Some(':') {
                self.bump();
                end += 1;
                groups += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..end];
        if groups == 5 && !text.contains("::") {
            Ok(Token::Mac(text.to_string()))
        } else {
            Ok(Token::Ipv6(text.to_string()))
        }
    }

    fn lex_number(&mut self) -> Result<Token> {
        let (start, first) = self.bump().expect("checked by caller");
        let mut end = start + 1;

        if first == '0' && self.peek_char() == Some('x') {
            self.bump();
            let hex_start = self.pos();
            let mut hex_end = hex_start;
            while let Some(&(i, c)) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    self.bump();
                    hex_end = i + 1;
                } else {
                    break;
                }
            }
            return Ok(Token::HexInt(self.src[hex_start..hex_end].to_string()));
        }

        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.bump();
                end = i + 1;
            } else {
                break;
            }
        }

        if self.peek_char() == Some('.') {
            // Lookahead: only treat as dotted-quad if followed by a digit,
            // so `1..2` (a bit-range) is not swallowed as an IPv4 literal.
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                while self.peek_char() == Some('.') {
                    self.bump();
                    end += 1;
                    while let Some(&(i, c)) = self.chars.peek() {
                        if c.is_ascii_digit() {
                            self.bump();
                            end = i + 1;
                        } else {
                            break;
                        }
                    }
                }
                return Ok(Token::Ipv4(self.src[start..end].to_string()));
            }
        }

        if self.peek_char() == Some(':') {
            return self.lex_colon_literal_continue(start, self.line, self.col);
        }

        Ok(Token::Int(self.src[start..end].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lexes_identifier_with_dots() {
        assert_eq!(toks("tcp.dst"), vec![Token::Ident("tcp.dst".into()), Token::Eof]);
    }

    #[test]
    fn lexes_operators() {
        assert_eq!(
            toks("== != < <= > && || ! ( ) { } [ ] , .."),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Lt,
                Token::LtEq,
                Token::Gt,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
                Token::LParen,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::Comma,
                Token::DotDot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_hex_and_decimal() {
        assert_eq!(toks("0x800 1024"), vec![Token::HexInt("800".into()), Token::Int("1024".into()), Token::Eof]);
    }

    #[test]
    fn lexes_ipv4() {
        assert_eq!(toks("192.168.1.1"), vec![Token::Ipv4("192.168.1.1".into()), Token::Eof]);
    }

    #[test]
    fn lexes_mac_and_ipv6() {
        assert_eq!(toks("aa:bb:cc:dd:ee:ff"), vec![Token::Mac("aa:bb:cc:dd:ee:ff".into()), Token::Eof]);
        assert_eq!(toks("fe80::1"), vec![Token::Ipv6("fe80::1".into()), Token::Eof]);
    }

    #[test]
    fn lexes_bit_range_after_identifier() {
        assert_eq!(
            toks("tcp.flags[3..5]"),
            vec![
                Token::Ident("tcp.flags".into()),
                Token::LBracket,
                Token::Int("3".into()),
                Token::DotDot,
                Token::Int("5".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_literal_with_escapes() {
        assert_eq!(toks("\"a\\\"b\""), vec![Token::Str("a\"b".into()), Token::Eof]);
    }

    #[test]
    fn lexes_keywords() {
        assert_eq!(toks("true false"), vec![Token::True, Token::False, Token::Eof]);
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(tokenize("@").is_err());
    }
}
