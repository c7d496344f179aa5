//! Byte-level lexer for the text format.
//!
//! One pass over UTF-8 source, producing classified tokens with spans.
//! Comments (`;; …` to end of line, nestable `(; … ;)`) and whitespace are
//! discarded. Numeric literals are validated for shape (digits, underscores,
//! exponents) but not converted; conversion happens in [`super::numeric`]
//! once the target type is known. Malformed words lex as `Reserved` tokens
//! so the parser can report them with grammar context; only unterminated
//! strings and comments are lexer-fatal.

use super::cursor::{Cursor, Position};
use super::token::{Base, Literal, LiteralInfo, LiteralKind, Sign, Span, Token, TokenKind};
use thiserror::Error;

/// A lexer-fatal error: the input cannot be tokenised past this point.
#[derive(Debug, Clone, Error)]
#[error("{span}: {message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Tokenises the entire source, returning all tokens or the first fatal
    /// error.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source).collect()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_trivia() {
            return Some(Err(e));
        }
        if self.cursor.is_eof() {
            return None;
        }

        let start = self.cursor.position();
        let kind = match self.lex_token(start) {
            Ok(kind) => kind,
            Err(e) => return Some(Err(e)),
        };
        let span = start.until(&self.cursor.position());
        Some(Ok(Token::new(kind, span)))
    }
}

impl<'a> Lexer<'a> {
    fn lex_token(&mut self, start: Position) -> Result<TokenKind, LexError> {
        match self.cursor.peek().unwrap() {
            '(' => {
                self.cursor.advance();
                Ok(TokenKind::Lpar)
            }
            ')' => {
                self.cursor.advance();
                Ok(TokenKind::Rpar)
            }
            '"' => self.lex_string(start),
            '$' => {
                self.cursor.advance();
                let name = self.cursor.take_while(is_idchar);
                if name.is_empty() {
                    Ok(TokenKind::Reserved("$".to_string()))
                } else {
                    Ok(TokenKind::Id(name.to_string()))
                }
            }
            c if is_idchar(c) => {
                let word = self.cursor.take_while(is_idchar);
                Ok(classify(word))
            }
            c => {
                self.cursor.advance();
                Ok(TokenKind::Reserved(c.to_string()))
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.cursor.skip_while(|c| c.is_ascii_whitespace());
            match (self.cursor.peek(), self.cursor.peek_second()) {
                (Some(';'), Some(';')) => {
                    self.cursor.skip_while(|c| c != '\n');
                }
                (Some('('), Some(';')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.cursor.position();
        self.cursor.advance();
        self.cursor.advance();
        let mut depth = 1u32;
        while depth > 0 {
            match (self.cursor.peek(), self.cursor.peek_second()) {
                (None, _) => {
                    return Err(LexError::new(
                        "unterminated block comment",
                        start.until(&self.cursor.position()),
                    ));
                }
                (Some('('), Some(';')) => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth += 1;
                }
                (Some(';'), Some(')')) => {
                    self.cursor.advance();
                    self.cursor.advance();
                    depth -= 1;
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
        Ok(())
    }

    fn lex_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.cursor.advance();
        let mut bytes = Vec::new();
        loop {
            match self.cursor.peek() {
                None => {
                    return Err(LexError::new(
                        "unterminated string literal",
                        start.until(&self.cursor.position()),
                    ));
                }
                Some('"') => {
                    self.cursor.advance();
                    return Ok(TokenKind::Text(bytes));
                }
                Some('\\') => {
                    self.cursor.advance();
                    self.lex_escape(&mut bytes)?;
                }
                Some(c) => {
                    self.cursor.advance();
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
    }

    fn lex_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), LexError> {
        let pos = self.cursor.position();
        let c = self
            .cursor
            .advance()
            .ok_or_else(|| LexError::new("unterminated escape sequence", pos.here()))?;
        match c {
            't' => bytes.push(0x09),
            'n' => bytes.push(0x0a),
            'r' => bytes.push(0x0d),
            '"' => bytes.push(0x22),
            '\'' => bytes.push(0x27),
            '\\' => bytes.push(0x5c),
            'u' => self.lex_unicode_escape(bytes)?,
            c if c.is_ascii_hexdigit() => {
                let high = c.to_digit(16).unwrap() as u8;
                let low_pos = self.cursor.position();
                let low = self
                    .cursor
                    .advance()
                    .and_then(|c| c.to_digit(16))
                    .ok_or_else(|| LexError::new("invalid hex escape", low_pos.here()))?;
                bytes.push((high << 4) | low as u8);
            }
            c => {
                return Err(LexError::new(
                    format!("invalid escape sequence: \\{}", c),
                    pos.here(),
                ));
            }
        }
        Ok(())
    }

    fn lex_unicode_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), LexError> {
        let pos = self.cursor.position();
        if self.cursor.advance() != Some('{') {
            return Err(LexError::new("expected '{' after \\u", pos.here()));
        }
        let digits = self.cursor.take_while(|c| c.is_ascii_hexdigit());
        if digits.is_empty() {
            return Err(LexError::new("empty unicode escape", pos.here()));
        }
        let code_point = u32::from_str_radix(digits, 16)
            .map_err(|_| LexError::new("unicode escape out of range", pos.here()))?;
        if self.cursor.advance() != Some('}') {
            return Err(LexError::new("expected '}' in unicode escape", pos.here()));
        }
        let c = char::from_u32(code_point).ok_or_else(|| {
            LexError::new(
                format!("invalid unicode code point: U+{:X}", code_point),
                pos.here(),
            )
        })?;
        let mut buf = [0u8; 4];
        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }
}

/// The identifier character class of the text grammar.
fn is_idchar(c: char) -> bool {
    matches!(
        c,
        '0'..='9'
            | 'a'..='z'
            | 'A'..='Z'
            | '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '/'
            | ':' | '<' | '=' | '>' | '?' | '@' | '\\' | '^' | '_' | '`' | '|' | '~'
    )
}

/// Classifies a bare word: number first, then keyword table.
fn classify(word: &str) -> TokenKind {
    if let Some(kind) = classify_number(word) {
        return kind;
    }
    TokenKind::classify_word(word)
}

/// Recognises numeric literals, returning `None` for words that are not
/// number-shaped at all (so keyword classification can have them) and
/// `Reserved` for number-shaped words that are malformed.
fn classify_number(word: &str) -> Option<TokenKind> {
    let (sign, rest) = match word.as_bytes().first() {
        Some(b'+') => (Sign::Plus, &word[1..]),
        Some(b'-') => (Sign::Minus, &word[1..]),
        _ => (Sign::None, word),
    };

    let literal = |kind, base| {
        TokenKind::Float(Literal {
            text: word.to_string(),
            info: LiteralInfo {
                sign,
                kind,
                base,
                has_underscores: word.contains('_'),
            },
        })
    };

    if rest == "inf" {
        return Some(literal(LiteralKind::Infinity, Base::Decimal));
    }
    if rest == "nan" {
        return Some(literal(LiteralKind::Nan, Base::Decimal));
    }
    if let Some(payload) = rest.strip_prefix("nan:0x") {
        if !payload.is_empty()
            && payload.chars().all(|c| c.is_ascii_hexdigit() || c == '_')
            && underscores_ok(payload, true)
        {
            return Some(literal(LiteralKind::NanPayload, Base::Hex));
        }
        return Some(TokenKind::Reserved(word.to_string()));
    }

    // Everything else must start with a digit to be a number; a sign not
    // followed by one is an ordinary word.
    if !rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let (base, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(stripped) => (Base::Hex, stripped),
        None => (Base::Decimal, rest),
    };

    let shape = match base {
        Base::Hex => hex_number_shape(digits),
        Base::Decimal => decimal_number_shape(digits),
    };
    let Some(is_float) = shape else {
        return Some(TokenKind::Reserved(word.to_string()));
    };
    if !underscores_ok(digits, base == Base::Hex) {
        return Some(TokenKind::Reserved(word.to_string()));
    }

    let info = LiteralInfo {
        sign,
        kind: LiteralKind::Normal,
        base,
        has_underscores: word.contains('_'),
    };
    let lit = Literal {
        text: word.to_string(),
        info,
    };
    Some(if is_float {
        TokenKind::Float(lit)
    } else if sign == Sign::None {
        TokenKind::Nat(lit)
    } else {
        TokenKind::Int(lit)
    })
}

/// Validates a hex literal body (after `0x`). Returns `Some(is_float)`.
fn hex_number_shape(s: &str) -> Option<bool> {
    let mut chars = s.chars().peekable();
    let mut int_digits = 0usize;
    let mut frac_digits = 0usize;
    let mut is_float = false;

    while matches!(chars.peek(), Some(c) if c.is_ascii_hexdigit() || *c == '_') {
        if chars.next().unwrap() != '_' {
            int_digits += 1;
        }
    }
    if chars.peek() == Some(&'.') {
        is_float = true;
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_ascii_hexdigit() || *c == '_') {
            if chars.next().unwrap() != '_' {
                frac_digits += 1;
            }
        }
    }
    if matches!(chars.peek(), Some('p') | Some('P')) {
        is_float = true;
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut exp_digits = 0usize;
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == '_') {
            if chars.next().unwrap() != '_' {
                exp_digits += 1;
            }
        }
        if exp_digits == 0 {
            return None;
        }
    }
    if chars.next().is_some() || int_digits + frac_digits == 0 {
        return None;
    }
    Some(is_float)
}

/// Validates a decimal literal body. Returns `Some(is_float)`.
fn decimal_number_shape(s: &str) -> Option<bool> {
    let mut chars = s.chars().peekable();
    let mut int_digits = 0usize;
    let mut is_float = false;

    while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == '_') {
        if chars.next().unwrap() != '_' {
            int_digits += 1;
        }
    }
    if int_digits == 0 {
        return None;
    }
    if chars.peek() == Some(&'.') {
        is_float = true;
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == '_') {
            chars.next();
        }
    }
    if matches!(chars.peek(), Some('e') | Some('E')) {
        is_float = true;
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut exp_digits = 0usize;
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == '_') {
            if chars.next().unwrap() != '_' {
                exp_digits += 1;
            }
        }
        if exp_digits == 0 {
            return None;
        }
    }
    if chars.next().is_some() {
        return None;
    }
    Some(is_float)
}

/// Underscores may only sit between two digits.
fn underscores_ok(s: &str, hex: bool) -> bool {
    let bytes = s.as_bytes();
    let digit = |b: u8| {
        if hex {
            b.is_ascii_hexdigit()
        } else {
            b.is_ascii_digit()
        }
    };
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' {
            if i == 0 || i + 1 == bytes.len() {
                return false;
            }
            if !digit(bytes[i - 1]) || !digit(bytes[i + 1]) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::opcode::Opcode;
    use crate::text::token::Keyword;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn nat(text: &str) -> TokenKind {
        TokenKind::Nat(Literal {
            text: text.to_string(),
            info: LiteralInfo {
                sign: Sign::None,
                kind: LiteralKind::Normal,
                base: if text.starts_with("0x") {
                    Base::Hex
                } else {
                    Base::Decimal
                },
                has_underscores: text.contains('_'),
            },
        })
    }

    #[test]
    fn empty_and_parens() {
        assert_eq!(kinds(""), vec![]);
        assert_eq!(kinds("( )"), vec![TokenKind::Lpar, TokenKind::Rpar]);
    }

    #[test]
    fn keywords_and_instructions() {
        assert_eq!(
            kinds("module func i32.add"),
            vec![
                TokenKind::Keyword(Keyword::Module),
                TokenKind::Keyword(Keyword::Func),
                TokenKind::PlainInstr(Opcode::I32Add),
            ]
        );
    }

    #[test]
    fn identifiers() {
        assert_eq!(
            kinds("$foo $a.b/c"),
            vec![
                TokenKind::Id("foo".to_string()),
                TokenKind::Id("a.b/c".to_string()),
            ]
        );
    }

    #[test]
    fn bare_dollar_is_reserved() {
        assert_eq!(kinds("$"), vec![TokenKind::Reserved("$".to_string())]);
    }

    #[test]
    fn naturals_and_integers() {
        assert_eq!(kinds("0 42 0xff"), vec![nat("0"), nat("42"), nat("0xff")]);
        match &kinds("-7")[0] {
            TokenKind::Int(lit) => {
                assert_eq!(lit.text, "-7");
                assert_eq!(lit.info.sign, Sign::Minus);
            }
            other => panic!("unexpected token: {:?}", other),
        }
        match &kinds("+0x10")[0] {
            TokenKind::Int(lit) => {
                assert_eq!(lit.info.sign, Sign::Plus);
                assert_eq!(lit.info.base, Base::Hex);
            }
            other => panic!("unexpected token: {:?}", other),
        }
    }

    #[test]
    fn floats() {
        for (text, kind) in [
            ("3.14", LiteralKind::Normal),
            ("1e10", LiteralKind::Normal),
            ("0x1.8p1", LiteralKind::Normal),
            ("inf", LiteralKind::Infinity),
            ("-inf", LiteralKind::Infinity),
            ("nan", LiteralKind::Nan),
            ("nan:0x7fc0", LiteralKind::NanPayload),
        ] {
            match &kinds(text)[0] {
                TokenKind::Float(lit) => assert_eq!(lit.info.kind, kind, "for {}", text),
                other => panic!("{} lexed as {:?}", text, other),
            }
        }
    }

    #[test]
    fn underscore_rules() {
        assert_eq!(kinds("1_000"), vec![nat("1_000")]);
        assert!(matches!(kinds("1__2")[0], TokenKind::Reserved(_)));
        assert!(matches!(kinds("0x_1")[0], TokenKind::Reserved(_)));
        assert!(matches!(kinds("1_")[0], TokenKind::Reserved(_)));
    }

    #[test]
    fn malformed_numbers_are_reserved() {
        assert!(matches!(kinds("0x")[0], TokenKind::Reserved(_)));
        assert!(matches!(kinds("1x")[0], TokenKind::Reserved(_)));
        assert!(matches!(kinds("nan:0x")[0], TokenKind::Reserved(_)));
        assert!(matches!(kinds("1e")[0], TokenKind::Reserved(_)));
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(kinds(r#""""#), vec![TokenKind::Text(vec![])]);
        assert_eq!(
            kinds(r#""a\n\00""#),
            vec![TokenKind::Text(vec![b'a', 0x0a, 0x00])]
        );
        assert_eq!(
            kinds(r#""\u{1F600}""#),
            vec![TokenKind::Text("\u{1F600}".as_bytes().to_vec())]
        );
    }

    #[test]
    fn unterminated_string_is_fatal() {
        assert!(Lexer::tokenize(r#""abc"#).is_err());
    }

    #[test]
    fn comments() {
        assert_eq!(
            kinds("a ;; line\nb (; block (; nested ;) ;) c"),
            vec![
                TokenKind::Reserved("a".to_string()),
                TokenKind::Reserved("b".to_string()),
                TokenKind::Reserved("c".to_string()),
            ]
        );
        assert!(Lexer::tokenize("(; open").is_err());
    }

    #[test]
    fn signed_words_are_not_numbers() {
        // A sign followed by idchars is an (unknown) keyword, not a number.
        assert!(matches!(kinds("+-")[0], TokenKind::Reserved(_)));
    }

    #[test]
    fn spans_cover_tokens() {
        let tokens = Lexer::tokenize("(module)").unwrap();
        assert_eq!((tokens[0].span.start, tokens[0].span.end), (0, 1));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (1, 7));
        assert_eq!((tokens[2].span.start, tokens[2].span.end), (7, 8));
        assert_eq!(tokens[1].span.column, 2);
    }

    #[test]
    fn align_offset_tokens() {
        let tokens = kinds("align=4 offset=0x20");
        assert!(matches!(tokens[0], TokenKind::AlignEqNat(_)));
        assert!(matches!(tokens[1], TokenKind::OffsetEqNat(_)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Spans are well-formed and within bounds on arbitrary input.
        #[test]
        fn spans_are_valid(source in "\\PC{0,200}") {
            for result in Lexer::new(&source) {
                if let Ok(token) = result {
                    prop_assert!(token.span.start <= token.span.end);
                    prop_assert!(token.span.end <= source.len());
                }
            }
        }

        /// Tokens never overlap.
        #[test]
        fn tokens_do_not_overlap(source in "\\PC{0,200}") {
            let tokens: Vec<_> = Lexer::new(&source).filter_map(Result::ok).collect();
            for pair in tokens.windows(2) {
                prop_assert!(pair[0].span.end <= pair[1].span.start);
            }
        }

        /// The lexer never panics.
        #[test]
        fn never_panics(source in "\\PC{0,500}") {
            for result in Lexer::new(&source) {
                let _ = result;
            }
        }

        /// Valid decimal naturals always lex as a single Nat token.
        #[test]
        fn decimal_nats_lex(value in any::<u64>()) {
            let source = value.to_string();
            let tokens = Lexer::tokenize(&source).unwrap();
            prop_assert_eq!(tokens.len(), 1);
            prop_assert!(matches!(tokens[0].kind, TokenKind::Nat(_)));
        }
    }
}
