//! Boolean query language: tokenizer, parser and algebraic simplifier.
//!
//! Queries are infix Boolean expressions over words:
//!
//! ```text
//! or      ::= and ("OR" and)*
//! and     ::= not ("AND" not)*
//! not     ::= "NOT" not | primary
//! primary ::= "(" or ")" | WORD
//! ```
//!
//! Precedence low to high: `OR` < `AND` < `NOT` < primary; the binary
//! operators are left-associative. The parser is a plain recursive
//! descent over the token list; errors carry the offending token index.

mod ast;
mod simplify;
mod token;
#[cfg(test)]
mod tests;

pub use ast::{and, not, or, word, QueryNode};
pub use simplify::Simplifier;
pub use token::{tokenize, QueryToken};

use common::{EngineError, EngineResult};

/// Tokenize and parse a query string.
pub fn parse_query(input: &str) -> EngineResult<QueryNode> {
    let tokens = tokenize(input)?;
    parse(&tokens)
}

/// Parse a token list. End of input must follow a complete expression.
pub fn parse(tokens: &[QueryToken]) -> EngineResult<QueryNode> {
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_or()?;
    match parser.peek() {
        QueryToken::Eof => Ok(node),
        other => Err(parser.unexpected(other)),
    }
}

struct Parser<'a> {
    tokens: &'a [QueryToken],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &QueryToken {
        self.tokens.get(self.pos).unwrap_or(&QueryToken::Eof)
    }

    fn advance(&mut self) -> QueryToken {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &QueryToken) -> EngineResult<()> {
        if self.peek() == expected {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(self.peek()))
        }
    }

    fn unexpected(&self, token: &QueryToken) -> EngineError {
        EngineError::parse(self.pos, format!("unexpected token '{token}'"))
    }

    fn parse_or(&mut self) -> EngineResult<QueryNode> {
        let mut node = self.parse_and()?;
        while *self.peek() == QueryToken::Or {
            self.advance();
            let rhs = self.parse_and()?;
            node = or(node, rhs);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> EngineResult<QueryNode> {
        let mut node = self.parse_not()?;
        while *self.peek() == QueryToken::And {
            self.advance();
            let rhs = self.parse_not()?;
            node = and(node, rhs);
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> EngineResult<QueryNode> {
        if *self.peek() == QueryToken::Not {
            self.advance();
            let child = self.parse_not()?;
            Ok(not(child))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> EngineResult<QueryNode> {
        match self.peek().clone() {
            QueryToken::LParen => {
                self.advance();
                let node = self.parse_or()?;
                self.expect(&QueryToken::RParen)?;
                Ok(node)
            }
            QueryToken::Word(value) => {
                self.advance();
                Ok(QueryNode::Word(value))
            }
            other => Err(self.unexpected(&other)),
        }
    }
}
