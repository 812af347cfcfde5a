use super::token::{Keyword, RawToken, Token};
use crate::utils::{parse_decimal, today};
use crate::{Date, Error, ErrorLevel, ErrorType, Location, Source};
use chrono::{Datelike, Duration};
use logos::{Lexer as LogosLexer, Logos};

/// Dates relative to today, only recognized at the very start of the input.
const RELATIVE_DATES: [(&str, i64); 6] = [
    ("dby", -2),
    ("yesterday", -1),
    ("ytd", -1),
    ("tomorrow", 1),
    ("tmr", 1),
    ("dat", 2),
];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Lexical modes. Inclusive modes use the general rules with extra
/// classification on top; exclusive modes replace the general rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Words are strings, numbers are amounts and start a transaction.
    General,
    /// Exclusive. Words are names, numbers are amounts.
    Transaction,
    /// Inclusive. Entered after `open`, `close`, `commodity`, `balance` and
    /// `pad`; numbers stay numbers.
    Const,
    /// Inclusive. Entered after `option`, `note` and `event`; the next word
    /// is the key.
    KvKey,
    /// Exclusive. The rest of the line, unless quoted, is one string.
    AnyValue,
    /// Exclusive. The rest of the line is one string.
    Comment,
}

impl Mode {
    fn takes_rest_of_line(self) -> bool {
        matches!(self, Mode::AnyValue | Mode::Comment)
    }
}

enum Transition {
    Stay,
    Push(Mode),
    /// Replaces the current mode.
    Begin(Mode),
}

/// A token together with its text and position.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme<'source> {
    pub token: Token,
    pub text: &'source str,
    pub src: Source,
}

pub struct Lexer<'source> {
    src: &'source str,
    llex: LogosLexer<'source, RawToken>,
    modes: Vec<Mode>,
    line: usize,
    line_start: usize,
    peeked: Option<Lexeme<'source>>,
    last_token_end: Location,
    diagnostics: Vec<Error>,
}

impl<'source> Lexer<'source> {
    pub fn new(src: &'source str) -> Self {
        let mut lexer = Lexer {
            src,
            llex: RawToken::lexer(src),
            modes: vec![Mode::General],
            line: 1,
            line_start: 0,
            peeked: None,
            last_token_end: (1, 1).into(),
            diagnostics: Vec::new(),
        };
        let trimmed = src.trim_start_matches(|c: char| c == ' ' || c == '\t');
        let offset = src.len() - trimmed.len();
        if let Some((date, len)) = leading_date(trimmed) {
            lexer.llex.bump(offset + len);
            lexer.peeked = Some(Lexeme {
                token: Token::Date(date),
                text: &src[offset..offset + len],
                src: lexer.source(offset, offset + len),
            });
        } else {
            lexer.advance();
        }
        lexer
    }

    pub fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::General)
    }

    /// Warnings about skipped characters.
    pub fn into_diagnostics(self) -> Vec<Error> {
        self.diagnostics
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peeked.as_ref().map(|lexeme| &lexeme.token)
    }

    #[inline]
    pub fn consume(&mut self) {
        let _ = self.take();
    }

    /// Returns the next lexeme, or a syntax error at the end of input.
    pub fn take(&mut self) -> Result<Lexeme<'source>, Error> {
        match self.peeked.take() {
            Some(lexeme) => {
                self.last_token_end = lexeme.src.end;
                self.advance();
                Ok(lexeme)
            }
            None => Err(Error {
                msg: "Unexpected end of input.".to_string(),
                src: Source {
                    start: self.last_token_end,
                    end: self.last_token_end,
                },
                r#type: ErrorType::Syntax,
                level: ErrorLevel::Error,
            }),
        }
    }

    fn location_at(&self, offset: usize) -> Location {
        Location {
            line: self.line,
            col: self.src[self.line_start..offset].chars().count() + 1,
        }
    }

    fn source(&self, start: usize, end: usize) -> Source {
        Source {
            start: self.location_at(start),
            end: self.location_at(end),
        }
    }

    fn advance(&mut self) {
        loop {
            if self.mode().takes_rest_of_line() {
                if let Some(lexeme) = self.lex_rest_of_line() {
                    self.peeked = Some(lexeme);
                    return;
                }
            }
            let raw = match self.llex.next() {
                Some(raw) => raw,
                None => return,
            };
            let span = self.llex.span();
            let text = self.llex.slice();
            match raw {
                RawToken::WhiteSpace => {}
                RawToken::NewLine => {
                    self.line += 1;
                    self.line_start = span.end;
                }
                RawToken::Error => self.skip_illegal(span.start),
                _ => {
                    if let Some(token) = self.classify(raw, text, span.start) {
                        self.peeked = Some(Lexeme {
                            token,
                            text,
                            src: self.source(span.start, span.end),
                        });
                        return;
                    }
                }
            }
        }
    }

    /// Lexes the remainder of the current line as one string. Returns `None`
    /// if the line is empty or, in [`Mode::AnyValue`], starts with a quote.
    fn lex_rest_of_line(&mut self) -> Option<Lexeme<'source>> {
        let src: &'source str = self.src;
        let start = self.llex.span().end;
        let line = src[start..].split('\n').next().unwrap_or("");
        let skipped = match self.mode() {
            Mode::AnyValue => {
                line.len() - line.trim_start_matches(|c: char| c == ' ' || c == '\t').len()
            }
            _ => 0,
        };
        let rest = &line[skipped..];
        let value = rest.strip_suffix('\r').unwrap_or(rest);
        if value.is_empty() || (self.mode() == Mode::AnyValue && value.starts_with('"')) {
            return None;
        }
        self.llex.bump(line.len());
        let value_start = start + skipped;
        Some(Lexeme {
            token: Token::String(value.to_string()),
            text: value,
            src: self.source(value_start, value_start + value.len()),
        })
    }

    fn classify(&mut self, raw: RawToken, text: &'source str, offset: usize) -> Option<Token> {
        let mode = self.mode();
        let (token, transition) = match (mode, raw) {
            (_, RawToken::At) => (Token::At, Transition::Stay),
            (_, RawToken::Bang) => (Token::Bang, Transition::Stay),
            (_, RawToken::Asterisk) => (Token::Asterisk, Transition::Stay),
            (_, RawToken::Plus) => (Token::Plus, Transition::Stay),
            (_, RawToken::Gt) => (Token::Gt, Transition::Stay),
            (_, RawToken::Pipe) => (Token::Pipe, Transition::Begin(Mode::Transaction)),
            (Mode::KvKey, RawToken::Quoted) => {
                (Token::String(unquote(text)), Transition::Push(Mode::AnyValue))
            }
            (_, RawToken::Quoted) => (Token::String(unquote(text)), Transition::Stay),
            (Mode::Transaction, RawToken::Comment) => {
                self.skip_illegal(offset);
                return None;
            }
            (Mode::Transaction, _) => match parse_decimal(text) {
                Some(number) => (Token::Amount(number), Transition::Stay),
                None => (Token::Name(text.to_string()), Transition::Stay),
            },
            (_, RawToken::Comment) => (Token::Comment, Transition::Begin(Mode::Comment)),
            (Mode::KvKey, _) => (Token::String(text.to_string()), Transition::Push(Mode::AnyValue)),
            (_, RawToken::Date) => match parse_date(text) {
                Some(date) => (Token::Date(date), Transition::Stay),
                None => {
                    self.warn(format!("Invalid date {}.", text), offset, text.len());
                    (Token::String(text.to_string()), Transition::Stay)
                }
            },
            (_, _) => {
                if let Some(keyword) = Keyword::from_word(text) {
                    let next = if keyword.is_key_value() {
                        Mode::KvKey
                    } else {
                        Mode::Const
                    };
                    (Token::Keyword(keyword), Transition::Push(next))
                } else {
                    match (mode, parse_decimal(text)) {
                        (Mode::General, Some(number)) => {
                            (Token::Amount(number), Transition::Push(Mode::Transaction))
                        }
                        (_, Some(number)) => (Token::Number(number), Transition::Stay),
                        (_, None) => (Token::String(text.to_string()), Transition::Stay),
                    }
                }
            }
        };
        match transition {
            Transition::Stay => {}
            Transition::Push(mode) => self.modes.push(mode),
            Transition::Begin(mode) => match self.modes.last_mut() {
                Some(top) => *top = mode,
                None => self.modes.push(mode),
            },
        }
        Some(token)
    }

    /// Skips exactly one character at `offset` and records a warning.
    fn skip_illegal(&mut self, offset: usize) {
        let ch = self.src[offset..].chars().next().unwrap_or(' ');
        let resume = offset + ch.len_utf8();
        if self.llex.span().end != resume {
            self.llex = RawToken::lexer(self.src);
            self.llex.bump(resume);
        }
        self.warn(format!("Illegal character {:?}.", ch), offset, ch.len_utf8());
    }

    fn warn(&mut self, msg: String, offset: usize, len: usize) {
        let src = self.source(offset, offset + len);
        log::warn!("{} ({})", msg, src);
        self.diagnostics.push(Error {
            msg,
            src,
            r#type: ErrorType::IllegalChar,
            level: ErrorLevel::Warning,
        });
    }
}

fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            _ => result.push(c),
        }
    }
    result
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse_from_str(&text.replace('/', "-"), "%Y-%m-%d").ok()
}

/// Recognizes a relative date like `ytd` or a month-day date like `Jan 1`.
fn leading_date(text: &str) -> Option<(Date, usize)> {
    let word_len = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let word = &text[..word_len];
    if let Some((_, days)) = RELATIVE_DATES.iter().find(|(abbr, _)| *abbr == word) {
        return Some((today() + Duration::days(*days), word_len));
    }
    month_day(text)
}

fn month_day(text: &str) -> Option<(Date, usize)> {
    let month = MONTHS.iter().position(|m| text.starts_with(m))? as u32 + 1;
    let mut pos = 3;
    if text[pos..].starts_with(|c: char| c == ' ' || c == '\t') {
        pos += 1;
    }
    let digits = text[pos..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 2 {
        return None;
    }
    let end = pos + digits;
    let continues_word = text[end..]
        .chars()
        .next()
        .map_or(false, |c| c.is_alphanumeric() || matches!(c, '_' | ',' | ':' | '.'));
    if continues_word {
        return None;
    }
    let day = text[pos..end].parse::<u32>().ok()?;
    let date = Date::from_ymd_opt(today().year(), month, day)?;
    Some((date, end))
}
