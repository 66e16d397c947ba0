use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    text: &'a str,
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { text: source, source: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    /// Best-effort tokenization. The token vector always ends with exactly one
    /// `Eof`; diagnostics for skipped input are returned alongside it.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Error>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(Some(tok)) => tokens.push(tok),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(code = e.code.as_str(), line = e.line, column = e.column, "{}", e.message);
                    errors.push(e);
                }
            }
        }

        (tokens, errors)
    }

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        let start = self.pos;
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'%' => TokenKind::Percent,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            b'/' => {
                if self.peek() == b'/' { self.skip_line(); return Ok(None); }
                else if self.peek() == b'*' { self.skip_block_comment(); return Ok(None); }
                else { TokenKind::Slash }
            }
            b'#' => { self.skip_line(); return Ok(None); }
            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Bang }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }
            b'&' if self.peek() == b'&' => { self.advance(); TokenKind::AmpAmp }
            b'|' if self.peek() == b'|' => { self.advance(); TokenKind::PipePipe }

            b'"' => match self.read_string(start) {
                Some(s) => TokenKind::Str(s),
                None => {
                    return Err(Error::new(ErrorCode::L002, line, col,
                        "unterminated string literal"));
                }
            },
            b'0'..=b'9' => TokenKind::Number(self.read_number(start)),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_ident(self.read_ident(start)),

            _ => {
                let other = self.text[start..].chars().next().unwrap_or(ch as char);
                // skip the remaining bytes of a multi-byte character
                for _ in 1..other.len_utf8() { self.advance(); }
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{other}`")));
            }
        };

        Ok(Some(Token::new(kind, &self.text[start..self.pos], line, col)))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        // UTF-8 continuation bytes belong to the previous column
        else if ch & 0xC0 != 0x80 { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // consume *
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance(); // *
                self.advance(); // /
                break;
            }
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Reads up to the closing quote. Strings have no escapes and may span
    /// lines. Returns `None` after consuming the rest of input when the
    /// closing quote is missing.
    fn read_string(&mut self, start: usize) -> Option<String> {
        while !self.is_at_end() {
            if self.advance() == b'"' {
                return Some(self.text[start + 1..self.pos - 1].to_string());
            }
        }
        None
    }

    fn read_number(&mut self, start: usize) -> f64 {
        while self.peek().is_ascii_digit() { self.advance(); }
        // a fractional part needs at least one digit after the point
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() { self.advance(); }
        }
        self.text[start..self.pos].parse().unwrap_or(f64::INFINITY)
    }

    fn read_ident(&mut self, start: usize) -> String {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }
        self.text[start..self.pos].to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::token::TokenClass;
    use pretty_assertions::assert_eq;

    fn lex(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(src).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:#?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> (Vec<TokenKind>, Vec<Error>) {
        let (tokens, errors) = Lexer::new(src).tokenize();
        (tokens.into_iter().map(|t| t.kind).collect(), errors)
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_and_decimal() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
        assert_eq!(lex("3.25"), vec![TokenKind::Number(3.25), TokenKind::Eof]);
    }

    #[test]
    fn minus_is_separate_token() {
        assert_eq!(lex("-5"), vec![TokenKind::Minus, TokenKind::Number(5.0), TokenKind::Eof]);
    }

    #[test]
    fn trailing_dot_not_consumed_by_number() {
        let (kinds, errors) = lex_err("5.");
        assert_eq!(kinds, vec![TokenKind::Number(5.0), TokenKind::Eof]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::L001);
    }

    #[test]
    fn keywords() {
        assert_eq!(lex("let"),  vec![TokenKind::Let,  TokenKind::Eof]);
        assert_eq!(lex("fn"),   vec![TokenKind::Fn,   TokenKind::Eof]);
        assert_eq!(lex("game"), vec![TokenKind::Game, TokenKind::Eof]);
        assert_eq!(lex("draw"), vec![TokenKind::Draw, TokenKind::Eof]);
        assert_eq!(lex("wait"), vec![TokenKind::Wait, TokenKind::Eof]);
        assert_eq!(lex("null"), vec![TokenKind::Null, TokenKind::Eof]);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(lex("Let"), vec![TokenKind::Ident("Let".into()), TokenKind::Eof]);
        assert_eq!(lex("TRUE"), vec![TokenKind::Ident("TRUE".into()), TokenKind::Eof]);
    }

    #[test]
    fn shape_words_are_identifiers() {
        assert_eq!(lex("circle"), vec![TokenKind::Ident("circle".into()), TokenKind::Eof]);
    }

    #[test]
    fn bool_literals() {
        assert_eq!(lex("true"),  vec![TokenKind::Bool(true),  TokenKind::Eof]);
        assert_eq!(lex("false"), vec![TokenKind::Bool(false), TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(lex("=="), vec![TokenKind::EqEq,     TokenKind::Eof]);
        assert_eq!(lex("!="), vec![TokenKind::BangEq,   TokenKind::Eof]);
        assert_eq!(lex("<="), vec![TokenKind::LtEq,     TokenKind::Eof]);
        assert_eq!(lex(">="), vec![TokenKind::GtEq,     TokenKind::Eof]);
        assert_eq!(lex("&&"), vec![TokenKind::AmpAmp,   TokenKind::Eof]);
        assert_eq!(lex("||"), vec![TokenKind::PipePipe, TokenKind::Eof]);
    }

    #[test]
    fn single_char_operators() {
        assert_eq!(
            lex("= ! < >"),
            vec![TokenKind::Eq, TokenKind::Bang, TokenKind::Lt, TokenKind::Gt, TokenKind::Eof]
        );
    }

    #[test]
    fn lone_ampersand_is_error() {
        let (kinds, errors) = lex_err("a & b");
        assert_eq!(kinds, vec![TokenKind::Ident("a".into()), TokenKind::Ident("b".into()), TokenKind::Eof]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::L001);
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(lex("// comment\n42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
        assert_eq!(lex("# note\n42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
        assert_eq!(lex("/* a\nb */42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
    }

    #[test]
    fn string_literal_keeps_backslashes() {
        assert_eq!(lex(r#""a\nb""#), vec![TokenKind::Str(r"a\nb".into()), TokenKind::Eof]);
    }

    #[test]
    fn string_may_span_lines() {
        let (tokens, _) = Lexer::new("\"a\nb\" x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Str("a\nb".into()));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 4));
    }

    #[test]
    fn unterminated_string_consumes_rest() {
        let (kinds, errors) = lex_err("let s = \"oops\nlet y = 1");
        assert_eq!(kinds, vec![TokenKind::Let, TokenKind::Ident("s".into()), TokenKind::Eq, TokenKind::Eof]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::L002);
        assert_eq!(errors[0].line, 1);
    }

    #[test]
    fn unknown_character_skipped() {
        let (kinds, errors) = lex_err("x @ y é");
        assert_eq!(kinds, vec![TokenKind::Ident("x".into()), TokenKind::Ident("y".into()), TokenKind::Eof]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains('@'));
        assert!(errors[1].message.contains('é'));
    }

    #[test]
    fn lexeme_and_position() {
        let (tokens, _) = Lexer::new("let name = \"hi\"\n  draw").tokenize();
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["let", "name", "=", "\"hi\"", "draw", ""]);
        assert_eq!((tokens[4].line, tokens[4].column), (2, 3));
    }

    #[test]
    fn exactly_one_eof() {
        let (tokens, _) = Lexer::new("\"never closed").tokenize();
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Eof).count(), 1);
        assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }

    #[test]
    fn relexing_is_idempotent() {
        let src = "game 800 600 {\n let x = 2 + 3 * 4\n if x >= 14 && not false { print \"ok\" }\n}";
        let (a, ea) = Lexer::new(src).tokenize();
        let (b, eb) = Lexer::new(src).tokenize();
        assert_eq!(a, b);
        assert_eq!(ea.len(), eb.len());
    }

    #[test]
    fn draw_statement() {
        assert_eq!(
            lex("draw circle 10 10 5 \"red\""),
            vec![
                TokenKind::Draw,
                TokenKind::Ident("circle".into()),
                TokenKind::Number(10.0),
                TokenKind::Number(10.0),
                TokenKind::Number(5.0),
                TokenKind::Str("red".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn token_classes() {
        assert_eq!(TokenKind::Number(1.0).class(), TokenClass::Literal);
        assert_eq!(TokenKind::Null.class(), TokenClass::Literal);
        assert_eq!(TokenKind::Ident("x".into()).class(), TokenClass::Identifier);
        assert_eq!(TokenKind::While.class(), TokenClass::Keyword);
        assert_eq!(TokenKind::BangEq.class(), TokenClass::Operator);
        assert_eq!(TokenKind::LBracket.class(), TokenClass::Punctuation);
        assert_eq!(TokenKind::Eof.class(), TokenClass::EndOfInput);
    }
}
