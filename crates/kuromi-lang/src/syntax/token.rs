#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),

    // Keywords
    Let,
    Fn,
    Return,
    If,
    Else,
    While,
    For,
    In,
    Game,
    Load,
    Draw,
    Show,
    Play,
    Print,
    Wait,
    And,
    Or,
    Not,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Eq,         // =
    EqEq,       // ==
    Bang,       // !
    BangEq,     // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    AmpAmp,     // &&
    PipePipe,   // ||

    // Punctuation
    Comma,      // ,
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]

    Eof,
}

/// Coarse classification of a token, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Literal,
    Identifier,
    Keyword,
    Operator,
    Punctuation,
    EndOfInput,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Str(_) | Self::Bool(_) | Self::Null)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Let | Self::Fn | Self::Return | Self::If | Self::Else | Self::While | Self::For
            | Self::In | Self::Game | Self::Load | Self::Draw | Self::Show | Self::Play
            | Self::Print | Self::Wait | Self::And | Self::Or | Self::Not
        )
    }

    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Self::Plus | Self::Minus | Self::Star | Self::Slash | Self::Percent | Self::Eq
            | Self::EqEq | Self::Bang | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt
            | Self::GtEq | Self::AmpAmp | Self::PipePipe
        )
    }

    pub fn class(&self) -> TokenClass {
        match self {
            Self::Ident(_) => TokenClass::Identifier,
            Self::Eof => TokenClass::EndOfInput,
            k if k.is_literal() => TokenClass::Literal,
            k if k.is_keyword() => TokenClass::Keyword,
            k if k.is_operator() => TokenClass::Operator,
            _ => TokenClass::Punctuation,
        }
    }

    /// Tokens that can begin a statement. The parser resynchronises on these.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Self::Let | Self::Fn | Self::Return | Self::If | Self::While | Self::For
            | Self::Load | Self::Draw | Self::Show | Self::Play | Self::Print | Self::Wait
            | Self::Game | Self::LBrace
        )
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "let"    => TokenKind::Let,
        "fn"     => TokenKind::Fn,
        "return" => TokenKind::Return,
        "if"     => TokenKind::If,
        "else"   => TokenKind::Else,
        "while"  => TokenKind::While,
        "for"    => TokenKind::For,
        "in"     => TokenKind::In,
        "game"   => TokenKind::Game,
        "load"   => TokenKind::Load,
        "draw"   => TokenKind::Draw,
        "show"   => TokenKind::Show,
        "play"   => TokenKind::Play,
        "print"  => TokenKind::Print,
        "wait"   => TokenKind::Wait,
        "and"    => TokenKind::And,
        "or"     => TokenKind::Or,
        "not"    => TokenKind::Not,
        "true"   => TokenKind::Bool(true),
        "false"  => TokenKind::Bool(false),
        "null"   => TokenKind::Null,
        _        => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, lexeme: lexeme.into(), line, column }
    }

    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }
}
