use std::sync::Arc;

use crate::syntax::ast::*;
use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<Error>,
    juxtaposed: bool,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self { tokens, pos: 0, errors: Vec::new(), juxtaposed: false }
    }

    pub fn parse(self) -> Result<Program, Vec<Error>> {
        let (program, errors) = self.parse_recovering();
        if errors.is_empty() { Ok(program) } else { Err(errors) }
    }

    /// Parses as much as possible. Statements before and after a syntax
    /// error are kept; every error is returned alongside the program.
    pub fn parse_recovering(mut self) -> (Program, Vec<Error>) {
        let mut statements = Vec::new();

        if self.check(&TokenKind::Game) {
            let start = self.pos;
            match self.parse_scene() {
                Ok(scene) => statements.push(Stmt::Scene(scene)),
                Err(e) => { self.report(e); self.recover(start); }
            }
        }

        while !self.is_at_end() {
            let start = self.pos;

            if self.check(&TokenKind::RBrace) {
                let e = self.unexpected("statement");
                self.report(e);
                self.advance();
                continue;
            }

            match self.parse_stmt() {
                Ok(s) => statements.push(s),
                Err(e) => { self.report(e); self.recover(start); }
            }

            // guarantee progress
            if self.pos == start {
                self.advance();
            }
        }

        (Program { statements }, self.errors)
    }

    // ─── Scene ───────────────────────────────────────────────────────────────

    fn parse_scene(&mut self) -> Result<SceneBlock, Error> {
        let span = self.span();
        self.expect(TokenKind::Game, "`game`")?;
        let width = self.expect_scene_size("width")?;
        let height = self.expect_scene_size("height")?;
        let body = self.parse_block()?;
        Ok(SceneBlock { width, height, body, span })
    }

    fn expect_scene_size(&mut self, what: &str) -> Result<f64, Error> {
        match self.peek_kind() {
            TokenKind::Number(n) => { self.advance(); Ok(n) }
            _ => {
                let tok = self.peek();
                Err(Error::new(ErrorCode::P003, tok.line, tok.column,
                    format!("expected scene {what} as a number, found {}", describe(tok))))
            }
        }
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let start = self.pos;
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => { self.report(e); self.recover(start); }
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close block")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Let    => self.parse_let(),
            TokenKind::Fn     => self.parse_fn(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If     => self.parse_if(),
            TokenKind::While  => self.parse_while(),
            TokenKind::For    => self.parse_for(),
            TokenKind::Load   => self.parse_load(),
            TokenKind::Draw   => self.parse_draw(),
            TokenKind::Show   => self.parse_show(),
            TokenKind::Play   => self.parse_play(),
            TokenKind::Print  => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Print(self.parse_expr()?, span))
            }
            TokenKind::Wait   => {
                let span = self.span();
                self.advance();
                Ok(Stmt::Wait(self.parse_expr()?, span))
            }
            TokenKind::LBrace => {
                let span = self.span();
                Ok(Stmt::Block(self.parse_block()?, span))
            }
            TokenKind::Game => {
                let tok = self.peek();
                Err(Error::new(ErrorCode::P003, tok.line, tok.column,
                    "a `game` scene block is only allowed as the first statement"))
            }

            // ident `=` → assignment; anything else → expr stmt
            TokenKind::Ident(_) if self.peek_next_is(&TokenKind::Eq) => self.parse_assign(),

            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Let, "`let`")?;
        let name = self.expect_ident("variable name after `let`")?;
        self.expect(TokenKind::Eq, "`=` after variable name")?;
        let init = self.parse_expr()?;
        Ok(Stmt::Let { name, init, span })
    }

    fn parse_assign(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let name = self.expect_ident("assignment target")?;
        self.expect(TokenKind::Eq, "`=`")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Assign { name, value, span })
    }

    fn parse_fn(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Fn, "`fn`")?;
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen, "`(` after function name")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.expect_ident("parameter name")?);
            if !self.matches(&TokenKind::Comma) { break; }
        }
        self.expect(TokenKind::RParen, "`)` after parameters")?;
        let body = self.parse_block()?;
        Ok(Stmt::Function(Arc::new(FunctionDecl { name, params, body, span })))
    }

    /// A bare `return` is one followed by `}`, end of input or the start of
    /// another statement.
    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return, "`return`")?;
        let kind = self.peek_kind();
        let value = if kind == TokenKind::RBrace || kind == TokenKind::Eof || kind.starts_statement() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        Ok(Stmt::Return(value, span))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If, "`if`")?;
        let condition = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.matches(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If(IfStmt { condition, then_block, else_block, span }))
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While, "`while`")?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { condition, body, span })
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For, "`for`")?;
        let var = self.expect_ident("loop variable after `for`")?;
        self.expect(TokenKind::In, "`in` after loop variable")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::ForEach { var, iterable, body, span })
    }

    fn parse_load(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Load, "`load`")?;
        let name = self.expect_ident("image name after `load`")?;
        let path = self.expect_string("image path")?;
        Ok(Stmt::Load { name, path, span })
    }

    fn parse_play(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Play, "`play`")?;
        let path = self.expect_string("sound path")?;
        Ok(Stmt::Play { path, span })
    }

    fn parse_draw(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Draw, "`draw`")?;
        let tok = self.peek().clone();
        let shape_word = self.expect_ident("shape after `draw`")?;
        let shape = match shape_word.as_str() {
            "rect" | "rectangle" => DrawShape::Rect {
                x: self.parse_operand()?,
                y: self.parse_operand()?,
                w: self.parse_operand()?,
                h: self.parse_operand()?,
                color: self.parse_operand()?,
            },
            "circle" => DrawShape::Circle {
                x: self.parse_operand()?,
                y: self.parse_operand()?,
                r: self.parse_operand()?,
                color: self.parse_operand()?,
            },
            "line" => DrawShape::Line {
                x1: self.parse_operand()?,
                y1: self.parse_operand()?,
                x2: self.parse_operand()?,
                y2: self.parse_operand()?,
                color: self.parse_operand()?,
            },
            "triangle" => DrawShape::Triangle {
                x1: self.parse_operand()?,
                y1: self.parse_operand()?,
                x2: self.parse_operand()?,
                y2: self.parse_operand()?,
                x3: self.parse_operand()?,
                y3: self.parse_operand()?,
                color: self.parse_operand()?,
            },
            "image" => DrawShape::Image {
                image: self.parse_operand()?,
                x: self.parse_operand()?,
                y: self.parse_operand()?,
            },
            other => {
                return Err(Error::new(ErrorCode::P001, tok.line, tok.column, format!(
                    "unknown shape `{other}`, expected rect, circle, line, triangle or image"
                )));
            }
        };
        Ok(Stmt::Draw(shape, span))
    }

    fn parse_show(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Show, "`show`")?;
        let align = match self.alignment_ahead() {
            Some(align) => {
                self.advance(); // (
                self.advance(); // word
                self.advance(); // )
                align
            }
            None => Align::Left,
        };
        let text = self.parse_operand()?;
        let x = self.parse_operand()?;
        let y = self.parse_operand()?;
        Ok(Stmt::Show { text, x, y, align, span })
    }

    /// `( left|center|centered|right )` directly after `show`.
    fn alignment_ahead(&self) -> Option<Align> {
        if !self.check(&TokenKind::LParen) { return None; }
        let word = match self.tokens.get(self.pos + 1).map(|t| &t.kind) {
            Some(TokenKind::Ident(w)) => w,
            _ => return None,
        };
        let closed = matches!(self.tokens.get(self.pos + 2), Some(t) if t.kind == TokenKind::RParen);
        if closed { Align::from_word(word) } else { None }
    }

    /// Draw and show operands are separated by whitespace alone, so `(` or `[`
    /// continues an operand only when written directly against it.
    fn parse_operand(&mut self) -> Result<Expr, Error> {
        self.juxtaposed = true;
        let result = self.parse_expr();
        self.juxtaposed = false;
        result
    }

    /// Inside brackets whitespace no longer separates operands.
    fn parse_nested(&mut self) -> Result<Expr, Error> {
        let outer = std::mem::replace(&mut self.juxtaposed, false);
        let result = self.parse_expr();
        self.juxtaposed = outer;
        result
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) || self.check(&TokenKind::PipePipe) {
            let span = left.span();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::And) || self.check(&TokenKind::AmpAmp) {
            let span = left.span();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary { left: Box::new(left), op: BinOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        if self.matches(&TokenKind::Not) || self.matches(&TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Not, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.juxtaposed && !self.touches_previous() {
                break;
            }
            match self.peek_kind() {
                // call: expr(args)
                TokenKind::LParen => {
                    let span = expr.span();
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                        args.push(self.parse_nested()?);
                        if !self.matches(&TokenKind::Comma) { break; }
                    }
                    self.expect(TokenKind::RParen, "`)` after arguments")?;
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }

                // index: expr[i]
                TokenKind::LBracket => {
                    let span = expr.span();
                    self.advance();
                    let index = self.parse_nested()?;
                    self.expect(TokenKind::RBracket, "`]` after index")?;
                    expr = Expr::Index { target: Box::new(expr), index: Box::new(index), span };
                }

                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Number(v) => { self.advance(); Ok(Expr::Literal(Literal::Number(v), span)) }
            TokenKind::Str(s)    => { self.advance(); Ok(Expr::Literal(Literal::Str(s), span)) }
            TokenKind::Bool(v)   => { self.advance(); Ok(Expr::Literal(Literal::Bool(v), span)) }
            TokenKind::Null      => { self.advance(); Ok(Expr::Literal(Literal::Null, span)) }
            TokenKind::Ident(name) => { self.advance(); Ok(Expr::Variable(name, span)) }

            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_nested()?;
                self.expect(TokenKind::RParen, "`)` to close group")?;
                Ok(expr)
            }

            // array literal
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
                    items.push(self.parse_nested()?);
                    if !self.matches(&TokenKind::Comma) { break; }
                }
                self.expect(TokenKind::RBracket, "`]` to close array")?;
                Ok(Expr::Array(items, span))
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_is(&self, kind: &TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == *kind)
    }

    fn touches_previous(&self) -> bool {
        let Some(prev) = self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) else {
            return false;
        };
        let cur = self.peek();
        prev.line == cur.line && prev.column + prev.lexeme.chars().count() == cur.column
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.tokens[self.pos].kind == *kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {what}, found {}", describe(tok)),
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, Error> {
        match self.peek_kind() {
            TokenKind::Ident(s) => { self.advance(); Ok(s) }
            _ => Err(self.missing(what)),
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String, Error> {
        match self.peek_kind() {
            TokenKind::Str(s) => { self.advance(); Ok(s) }
            _ => Err(self.missing(&format!("{what} string"))),
        }
    }

    fn is_at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn missing(&self, what: &str) -> Error {
        let tok = self.peek();
        Error::new(ErrorCode::P002, tok.line, tok.column,
            format!("expected {what}, found {}", describe(tok)))
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(ErrorCode::P001, tok.line, tok.column,
            format!("expected {expected}, found {}", describe(tok)))
    }

    fn report(&mut self, e: Error) {
        tracing::error!(code = e.code.as_str(), line = e.line, column = e.column, "{}", e.message);
        self.errors.push(e);
    }

    /// Skip tokens until something that starts a new statement, a closing
    /// brace, or end of input. Always moves past the statement's first token.
    fn recover(&mut self, start: usize) {
        if self.pos == start && !self.is_at_end() {
            self.advance();
        }
        loop {
            let kind = self.peek_kind();
            if kind == TokenKind::Eof || kind == TokenKind::RBrace || kind.starts_statement() {
                break;
            }
            self.advance();
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Eof => "end of input".to_string(),
        _ => format!("`{}`", tok.lexeme),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn tokens(src: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(src).tokenize();
        assert!(errors.is_empty(), "lex failed: {errors:#?}");
        tokens
    }

    fn parse(src: &str) -> Program {
        Parser::new(tokens(src)).parse().expect("parse failed")
    }

    fn parse_expr_src(src: &str) -> Expr {
        let mut p = Parser::new(tokens(src));
        p.parse_expr().expect("parse_expr failed")
    }

    fn parse_err(src: &str) -> (Program, Vec<Error>) {
        let (program, errors) = Parser::new(tokens(src)).parse_recovering();
        assert!(!errors.is_empty(), "expected parse error");
        (program, errors)
    }

    fn num(e: &Expr) -> f64 {
        match e {
            Expr::Literal(Literal::Number(n), _) => *n,
            other => panic!("expected number literal, got {other:?}"),
        }
    }

    // ── scene ────────────────────────────────────────────────────────────────

    #[test]
    fn scene_block() {
        let p = parse("game 800 600 { print 1 }");
        assert_eq!(p.scene(), Some((800.0, 600.0)));
        match &p.statements[0] {
            Stmt::Scene(s) => assert_eq!(s.body.len(), 1),
            other => panic!("expected scene, got {other:?}"),
        }
    }

    #[test]
    fn scene_followed_by_statements() {
        let p = parse("game 320 200 { }\nprint 1");
        assert_eq!(p.statements.len(), 2);
    }

    #[test]
    fn no_scene() {
        assert_eq!(parse("print 1").scene(), None);
    }

    #[test]
    fn scene_not_first_is_error() {
        let (p, errs) = parse_err("print 1\ngame 10 10 { print 2 }");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::P003);
        // the body is still recovered as a plain block
        assert_eq!(p.statements.len(), 2);
        assert!(matches!(p.statements[1], Stmt::Block(..)));
    }

    #[test]
    fn scene_size_must_be_numeric() {
        let (_, errs) = parse_err("game w 600 { }");
        assert_eq!(errs[0].code, ErrorCode::P003);
    }

    // ── variables ────────────────────────────────────────────────────────────

    #[test]
    fn let_decl() {
        let p = parse("let x = 3.5");
        match &p.statements[0] {
            Stmt::Let { name, init, .. } => {
                assert_eq!(name, "x");
                assert_eq!(num(init), 3.5);
            }
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn assignment() {
        let p = parse("x = x + 1");
        match &p.statements[0] {
            Stmt::Assign { name, value, .. } => {
                assert_eq!(name, "x");
                assert!(matches!(value, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn equality_is_not_assignment() {
        let p = parse("x == 1");
        assert!(matches!(&p.statements[0], Stmt::Expr(Expr::Binary { op: BinOp::Eq, .. })));
    }

    // ── functions ────────────────────────────────────────────────────────────

    #[test]
    fn fn_decl() {
        let p = parse("fn add(a, b) { return a + b }");
        match &p.statements[0] {
            Stmt::Function(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params, vec!["a", "b"]);
                assert!(matches!(f.body[0], Stmt::Return(Some(_), _)));
            }
            other => panic!("expected fn, got {other:?}"),
        }
    }

    #[test]
    fn fn_no_params() {
        let p = parse("fn tick() { }");
        match &p.statements[0] {
            Stmt::Function(f) => assert!(f.params.is_empty() && f.body.is_empty()),
            other => panic!("expected fn, got {other:?}"),
        }
    }

    #[test]
    fn return_bare() {
        let p = parse("fn f() { return }");
        match &p.statements[0] {
            Stmt::Function(f) => assert!(matches!(f.body[0], Stmt::Return(None, _))),
            other => panic!("expected fn, got {other:?}"),
        }
    }

    #[test]
    fn return_bare_before_statement() {
        let p = parse("fn f() { if true { return\nprint 1 } }");
        let Stmt::Function(f) = &p.statements[0] else { panic!("expected fn") };
        let Stmt::If(i) = &f.body[0] else { panic!("expected if") };
        assert!(matches!(i.then_block[0], Stmt::Return(None, _)));
        assert!(matches!(i.then_block[1], Stmt::Print(..)));
    }

    // ── control flow ─────────────────────────────────────────────────────────

    #[test]
    fn if_else() {
        let p = parse("if x > 1 { print 1 } else { print 2 }");
        match &p.statements[0] {
            Stmt::If(i) => {
                assert_eq!(i.then_block.len(), 1);
                assert_eq!(i.else_block.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn else_if_chain() {
        let p = parse("if a { } else if b { } else { print 3 }");
        let Stmt::If(outer) = &p.statements[0] else { panic!("expected if") };
        let else_block = outer.else_block.as_ref().expect("else");
        let Stmt::If(inner) = &else_block[0] else { panic!("expected nested if") };
        assert_eq!(inner.else_block.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn parenthesised_condition() {
        let p = parse("while (i < 3) { i = i + 1 }");
        assert!(matches!(&p.statements[0], Stmt::While { body, .. } if body.len() == 1));
    }

    #[test]
    fn for_each() {
        let p = parse("for item in [1, 2] { print item }");
        match &p.statements[0] {
            Stmt::ForEach { var, iterable, body, .. } => {
                assert_eq!(var, "item");
                assert!(matches!(iterable, Expr::Array(items, _) if items.len() == 2));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn nested_block() {
        let p = parse("{ let x = 1 { print x } }");
        assert!(matches!(&p.statements[0], Stmt::Block(b, _) if b.len() == 2));
    }

    // ── side effects ─────────────────────────────────────────────────────────

    #[test]
    fn draw_shapes() {
        let p = parse(
            "draw rect 1 2 3 4 \"red\"\n\
             draw rectangle 1 2 3 4 \"red\"\n\
             draw circle 10 10 5 c\n\
             draw line 0 0 (-5) 5 \"blue\"\n\
             draw triangle 0 0 10 0 5 5 \"green\"\n\
             draw image hero x y",
        );
        let names: Vec<&str> = p.statements.iter().map(|s| match s {
            Stmt::Draw(shape, _) => shape.name(),
            other => panic!("expected draw, got {other:?}"),
        }).collect();
        assert_eq!(names, vec!["rect", "rect", "circle", "line", "triangle", "image"]);
    }

    #[test]
    fn draw_args_are_expressions() {
        let p = parse("draw circle x + 1 y * 2 r \"red\"");
        match &p.statements[0] {
            Stmt::Draw(DrawShape::Circle { x, y, .. }, _) => {
                assert!(matches!(x, Expr::Binary { op: BinOp::Add, .. }));
                assert!(matches!(y, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn parenthesised_operand_is_not_a_call() {
        let p = parse("draw line x 0 (-5) 5 \"blue\"");
        match &p.statements[0] {
            Stmt::Draw(DrawShape::Line { x1, x2, .. }, _) => {
                assert!(matches!(x1, Expr::Variable(..)));
                assert!(matches!(x2, Expr::Unary { op: UnOp::Neg, .. }));
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_call_in_operand() {
        let p = parse("draw circle pick(1) xs[0] 3 \"red\"");
        match &p.statements[0] {
            Stmt::Draw(DrawShape::Circle { x, y, .. }, _) => {
                assert!(matches!(x, Expr::Call { .. }));
                assert!(matches!(y, Expr::Index { .. }));
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn spacing_inside_brackets_is_free() {
        let p = parse("draw circle pick( xs [0] ) 1 2 \"red\"");
        match &p.statements[0] {
            Stmt::Draw(DrawShape::Circle { x: Expr::Call { args, .. }, .. }, _) => {
                assert!(matches!(args[0], Expr::Index { .. }));
            }
            other => panic!("expected circle with call, got {other:?}"),
        }
    }

    #[test]
    fn unknown_shape_is_error() {
        let (_, errs) = parse_err("draw hexagon 1 2 3");
        assert_eq!(errs[0].code, ErrorCode::P001);
        assert!(errs[0].message.contains("hexagon"));
    }

    #[test]
    fn show_default_alignment() {
        let p = parse("show \"hi\" 10 20");
        assert!(matches!(&p.statements[0], Stmt::Show { align: Align::Left, .. }));
    }

    #[test]
    fn show_with_alignment() {
        let p = parse("show (centered) \"hi\" 10 20\nshow (right) \"hi\" 10 20");
        assert!(matches!(&p.statements[0], Stmt::Show { align: Align::Center, .. }));
        assert!(matches!(&p.statements[1], Stmt::Show { align: Align::Right, .. }));
    }

    #[test]
    fn show_parenthesised_text_is_not_alignment() {
        let p = parse("show (\"a\" + b) 1 2");
        match &p.statements[0] {
            Stmt::Show { text, align, .. } => {
                assert_eq!(*align, Align::Left);
                assert!(matches!(text, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected show, got {other:?}"),
        }
    }

    #[test]
    fn load_play_print_wait() {
        let p = parse("load hero \"hero.bmp\"\nplay \"jump.wav\"\nprint hero\nwait 100");
        assert!(matches!(&p.statements[0], Stmt::Load { name, path, .. } if name == "hero" && path == "hero.bmp"));
        assert!(matches!(&p.statements[1], Stmt::Play { path, .. } if path == "jump.wav"));
        assert!(matches!(&p.statements[2], Stmt::Print(..)));
        assert!(matches!(&p.statements[3], Stmt::Wait(..)));
    }

    #[test]
    fn load_requires_string_path() {
        let (_, errs) = parse_err("load hero path");
        assert_eq!(errs[0].code, ErrorCode::P002);
    }

    // ── expressions ──────────────────────────────────────────────────────────

    #[test]
    fn mul_binds_tighter_than_add() {
        let e = parse_expr_src("2 + 3 * 4");
        match e {
            Expr::Binary { op: BinOp::Add, left, right, .. } => {
                assert_eq!(num(&left), 2.0);
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn comparison_binds_tighter_than_logical() {
        let e = parse_expr_src("a < 1 or b > 2 and c");
        match e {
            Expr::Binary { op: BinOp::Or, left, right, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Lt, .. }));
                assert!(matches!(*right, Expr::Binary { op: BinOp::And, .. }));
            }
            other => panic!("expected or, got {other:?}"),
        }
    }

    #[test]
    fn symbolic_logical_operators() {
        assert!(matches!(parse_expr_src("a && b"), Expr::Binary { op: BinOp::And, .. }));
        assert!(matches!(parse_expr_src("a || b"), Expr::Binary { op: BinOp::Or, .. }));
        assert!(matches!(parse_expr_src("!a"), Expr::Unary { op: UnOp::Not, .. }));
    }

    #[test]
    fn left_associative_subtraction() {
        match parse_expr_src("10 - 4 - 3") {
            Expr::Binary { op: BinOp::Sub, left, right, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Sub, .. }));
                assert_eq!(num(&right), 3.0);
            }
            other => panic!("expected sub, got {other:?}"),
        }
    }

    #[test]
    fn unary_chain() {
        match parse_expr_src("not -x") {
            Expr::Unary { op: UnOp::Not, operand, .. } => {
                assert!(matches!(*operand, Expr::Unary { op: UnOp::Neg, .. }));
            }
            other => panic!("expected not, got {other:?}"),
        }
    }

    #[test]
    fn call_and_index_chain() {
        match parse_expr_src("f(1, 2)[0](x)") {
            Expr::Call { callee, args, .. } => {
                assert_eq!(args.len(), 1);
                match *callee {
                    Expr::Index { target, .. } => {
                        assert!(matches!(*target, Expr::Call { ref args, .. } if args.len() == 2));
                    }
                    other => panic!("expected index, got {other:?}"),
                }
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn literals() {
        assert!(matches!(parse_expr_src("\"s\""), Expr::Literal(Literal::Str(_), _)));
        assert!(matches!(parse_expr_src("true"), Expr::Literal(Literal::Bool(true), _)));
        assert!(matches!(parse_expr_src("null"), Expr::Literal(Literal::Null, _)));
        assert!(matches!(parse_expr_src("[]"), Expr::Array(items, _) if items.is_empty()));
    }

    #[test]
    fn grouping() {
        match parse_expr_src("(2 + 3) * 4") {
            Expr::Binary { op: BinOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected mul, got {other:?}"),
        }
    }

    // ── error recovery ───────────────────────────────────────────────────────

    #[test]
    fn let_without_name_reports_once_and_resumes() {
        let (p, errs) = parse_err("let = 5\nprint 1");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::P002);
        assert!(errs[0].message.contains("`=`"));
        assert_eq!(p.statements.len(), 1);
        assert!(matches!(p.statements[0], Stmt::Print(..)));
    }

    #[test]
    fn recovery_inside_block_keeps_siblings() {
        let (p, errs) = parse_err("fn f() {\n print 1\n let = 2\n print 3\n}\nprint 4");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 3);
        assert_eq!(p.statements.len(), 2);
        let Stmt::Function(f) = &p.statements[0] else { panic!("expected fn") };
        assert_eq!(f.body.len(), 2);
    }

    #[test]
    fn incomplete_draw_keeps_next_statement() {
        let (p, errs) = parse_err("draw circle 1 2\nlet y = 2");
        assert_eq!(errs.len(), 1);
        assert!(matches!(&p.statements[..], [Stmt::Let { .. }]));
    }

    #[test]
    fn multiple_errors_collected() {
        let (p, errs) = parse_err("let = 1\nprint )\nlet ok = 3\n}");
        assert_eq!(errs.len(), 3);
        assert!(matches!(&p.statements[..], [Stmt::Let { name, .. }] if name == "ok"));
    }

    #[test]
    fn missing_closing_brace() {
        let (_, errs) = parse_err("while x { print 1 ");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::P002);
        assert!(errs[0].message.contains("end of input"));
    }

    #[test]
    fn missing_closing_paren() {
        let (_, errs) = parse_err("fn f(a { return a }");
        assert!(!errs.is_empty());
    }

    #[test]
    fn parser_appends_missing_eof() {
        let p = Parser::new(Vec::new()).parse().expect("empty program");
        assert!(p.statements.is_empty());
    }
}
