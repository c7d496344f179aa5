//! Token stream with small lookahead.
//!
//! Wraps the lexer with a two-token buffer, the `match`-style conditional
//! consumers the parser is written against, and conversion of lexer-fatal
//! errors into sink diagnostics (the stream then ends).

use super::lexer::Lexer;
use super::token::{Keyword, Span, Token, TokenKind};
use crate::error::{ErrorSink, Location};

pub struct Tokenizer<'a> {
    lexer: Lexer<'a>,
    lookahead: Vec<Token>,
    end: usize,
    errors: &'a dyn ErrorSink,
    failed: bool,
    depth: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, errors: &'a dyn ErrorSink) -> Self {
        Self {
            lexer: Lexer::new(source),
            lookahead: Vec::with_capacity(2),
            end: source.len(),
            errors,
            failed: false,
            depth: 0,
        }
    }

    /// Net parenthesis depth of everything consumed so far. The parser uses
    /// it to skip a malformed field to its closing paren.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn eof_token(&self) -> Token {
        Token::new(
            TokenKind::Eof,
            Span {
                start: self.end,
                end: self.end,
                line: 0,
                column: 0,
            },
        )
    }

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            if self.failed {
                self.lookahead.push(self.eof_token());
                continue;
            }
            match self.lexer.next() {
                Some(Ok(token)) => self.lookahead.push(token),
                Some(Err(e)) => {
                    self.errors
                        .on_error(Location::new(e.span.start, e.span.end), &e.message);
                    self.failed = true;
                }
                None => {
                    self.failed = true;
                }
            }
        }
    }

    /// The next token, unconsumed. `peek_at(1)` is the one after it.
    pub fn peek(&mut self) -> &Token {
        self.peek_at(0)
    }

    pub fn peek_at(&mut self, n: usize) -> &Token {
        debug_assert!(n < 2, "lookahead is limited to two tokens");
        self.fill(n);
        &self.lookahead[n]
    }

    pub fn read(&mut self) -> Token {
        self.fill(0);
        let token = self.lookahead.remove(0);
        match token.kind {
            TokenKind::Lpar => self.depth += 1,
            TokenKind::Rpar => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        token
    }

    /// The location of the next token, for diagnostics.
    pub fn location(&mut self) -> Location {
        self.peek().location()
    }

    // ------------------------------------------------------------------
    // Conditional consumers
    // ------------------------------------------------------------------

    pub fn match_lpar(&mut self) -> Option<Token> {
        matches!(self.peek().kind, TokenKind::Lpar).then(|| self.read())
    }

    pub fn match_rpar(&mut self) -> Option<Token> {
        matches!(self.peek().kind, TokenKind::Rpar).then(|| self.read())
    }

    pub fn match_keyword(&mut self, keyword: Keyword) -> Option<Token> {
        matches!(self.peek().kind, TokenKind::Keyword(k) if k == keyword).then(|| self.read())
    }

    /// Consumes `(` plus the given keyword in one step, iff both match.
    pub fn match_lpar_keyword(&mut self, keyword: Keyword) -> Option<Span> {
        let is_lpar = matches!(self.peek().kind, TokenKind::Lpar);
        let head = matches!(self.peek_at(1).kind, TokenKind::Keyword(k) if k == keyword);
        if is_lpar && head {
            let lpar = self.read();
            self.read();
            Some(lpar.span)
        } else {
            None
        }
    }

    pub fn match_id(&mut self) -> Option<(String, Span)> {
        if matches!(self.peek().kind, TokenKind::Id(_)) {
            let token = self.read();
            match token.kind {
                TokenKind::Id(name) => Some((name, token.span)),
                _ => unreachable!(),
            }
        } else {
            None
        }
    }

    pub fn match_text(&mut self) -> Option<(Vec<u8>, Span)> {
        if matches!(self.peek().kind, TokenKind::Text(_)) {
            let token = self.read();
            match token.kind {
                TokenKind::Text(bytes) => Some((bytes, token.span)),
                _ => unreachable!(),
            }
        } else {
            None
        }
    }

    /// Whether the next token is `(` followed by the given keyword.
    pub fn peek_lpar_keyword(&mut self, keyword: Keyword) -> bool {
        matches!(self.peek().kind, TokenKind::Lpar)
            && matches!(self.peek_at(1).kind, TokenKind::Keyword(k) if k == keyword)
    }
}
