use flowexpr_ast::SymbolResolver;
use flowexpr_errors::{Error, Result};
use flowexpr_lexer::Token;
use flowexpr_span::Span;

pub struct ParserContext<'a> {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    pub(crate) resolver: &'a dyn SymbolResolver,
}

impl<'a> ParserContext<'a> {
    pub fn new(tokens: Vec<(Token, Span)>, resolver: &'a dyn SymbolResolver) -> Self {
        ParserContext { tokens, pos: 0, resolver }
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub(crate) fn span(&self) -> Span {
        self.tokens[self.pos].1
    }

    pub(crate) fn bump(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, tok: &Token) -> Result<Span> {
        if self.peek() == tok {
            Ok(self.bump().1)
        } else {
            Err(Error::syntax(format!("expected `{tok}`, found `{}`", self.peek()), self.span()))
        }
    }

    pub(crate) fn expect_end(&mut self) -> Result<()> {
        if matches!(self.peek(), Token::Eof) {
            Ok(())
        } else {
            Err(Error::syntax(format!("unexpected trailing token `{}`", self.peek()), self.span()))
        }
    }
}
