use crate::{Date, Decimal};
use logos::Logos;

/// Raw lexemes. Their meaning depends on the lexical mode and is decided by
/// [`Lexer`](super::Lexer).
#[derive(Debug, PartialEq, Logos, Clone, Copy)]
pub enum RawToken {
    #[regex(r"[ \f\r\t\v]+")]
    WhiteSpace,

    #[token("\n")]
    NewLine,

    #[regex(r"[0-9][0-9][0-9][0-9]+[\-/][0-9]+[\-/][0-9]+")]
    Date,

    #[regex(r"-[0-9][0-9,]*(\.[0-9]*)?")]
    #[regex(r"-\.[0-9]+")]
    SignedNumber,

    #[regex(r"[\w,:\.]+")]
    Word,

    #[regex(r#""([^\\"]|\\.)*""#)]
    Quoted,

    #[regex(r"(;|//)[ \f\r\t\v]+")]
    Comment,

    #[token("@")]
    At,

    #[token("!")]
    Bang,

    #[token("*")]
    Asterisk,

    #[token("|")]
    Pipe,

    #[token("+")]
    Plus,

    #[token(">")]
    Gt,

    #[error]
    Error,
}

/// Reserved words that start a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Open,
    Close,
    Commodity,
    Balance,
    Pad,
    Option,
    Note,
    Event,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "open" => Keyword::Open,
            "close" => Keyword::Close,
            "commodity" => Keyword::Commodity,
            "balance" => Keyword::Balance,
            "pad" => Keyword::Pad,
            "option" => Keyword::Option,
            "note" => Keyword::Note,
            "event" => Keyword::Event,
            _ => return None,
        };
        Some(keyword)
    }

    /// Key-value directives take a key and then the rest of the line as value.
    pub fn is_key_value(&self) -> bool {
        matches!(self, Keyword::Option | Keyword::Note | Keyword::Event)
    }
}

/// Tokens consumed by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word inside a transaction, e.g. an account or a currency.
    Name(String),
    /// A number inside a transaction.
    Amount(Decimal),
    /// A number outside a transaction, e.g. in `balance`.
    Number(Decimal),
    Date(Date),
    /// A bare word outside a transaction, or any quoted string.
    String(String),
    /// `;` or `//` followed by whitespace.
    Comment,
    Keyword(Keyword),
    At,
    Bang,
    Asterisk,
    Pipe,
    Plus,
    Gt,
}
