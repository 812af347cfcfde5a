use crate::utils::today;
pub use chrono::NaiveDate as Date;
use getset::Getters;
pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::convert::From;
use std::fmt;

/// Representing a location, line number and column number, in the input text.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl From<(usize, usize)> for Location {
    fn from(tuple: (usize, usize)) -> Self {
        Location {
            line: tuple.0,
            col: tuple.1,
        }
    }
}

/// Represents a range in the input text, used for locating errors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Source {
    pub start: Location,
    pub end: Location,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.col)
    }
}

/// Kinds of errors that `costflow` encountered while interpreting input text.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A character that no lexical rule accepts. It is skipped.
    IllegalChar,
    /// The token sequence cannot be reduced to an entry.
    Syntax,
    /// A formula template failed to render.
    Template,
    /// Filling in amounts exceeded the range of [`Decimal`].
    Overflow,
}

/// The level of an error.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    Warning,
    Error,
}

/// Contains the full information of an error.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub msg: String,
    pub src: Source,
    pub r#type: ErrorType,
    pub level: ErrorLevel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}\n  {}", self.level, self.msg, self.src)
    }
}

impl std::error::Error for Error {}

pub type Currency = String;

/// Writes a string for use between double quotes.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.chars() {
            if c == '"' || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "\"")
    }
}

/// The display name of a payee. May be empty.
pub type Payee = String;

/// The flag of a [`Transaction`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxnFlag {
    /// transactions flagged by `*`.
    Posted,
    /// transactions flagged by `!`.
    Pending,
}

impl Default for TxnFlag {
    fn default() -> Self {
        TxnFlag::Posted
    }
}

impl fmt::Display for TxnFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnFlag::Posted => write!(f, "*"),
            TxnFlag::Pending => write!(f, "!"),
        }
    }
}

/// The header of a transaction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Narration {
    pub payee: Payee,
    pub desc: String,
    pub flag: TxnFlag,
    pub date: Option<Date>,
}

impl Narration {
    pub fn new(payee: impl Into<Payee>, desc: impl Into<String>) -> Self {
        Narration {
            payee: payee.into(),
            desc: desc.into(),
            flag: TxnFlag::Posted,
            date: None,
        }
    }

    pub fn with_flag(mut self, flag: TxnFlag) -> Self {
        self.flag = flag;
        self
    }

    pub fn with_date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }
}

/// A posting like `bofa -100 USD` inside a [`Transaction`]. The amount and the
/// currency may be left out and are filled in by [`Transaction::finalize`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: String,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
}

impl Posting {
    pub fn new(account: impl Into<String>) -> Self {
        Posting {
            account: account.into(),
            amount: None,
            currency: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<Currency>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t{}", self.account)?;
        if let Some(amount) = self.amount {
            let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
            write!(f, "\t{:.2}", rounded)?;
            if let Some(currency) = &self.currency {
                write!(f, " {}", currency)?;
            }
        }
        Ok(())
    }
}

/// Represents a transaction. Postings are kept in the order they were written.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Transaction {
    /// Returns the header of this transaction.
    #[getset(get = "pub")]
    pub(crate) narration: Narration,

    /// Returns the postings of this transaction.
    #[getset(get = "pub")]
    pub(crate) postings: Vec<Posting>,
}

impl Transaction {
    pub fn new(narration: Narration, postings: Vec<Posting>) -> Self {
        Transaction {
            narration,
            postings,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.narration.date.unwrap_or_else(today);
        write!(
            f,
            "{} {} {} {}",
            date,
            self.narration.flag,
            Quoted(&self.narration.payee),
            Quoted(&self.narration.desc)
        )?;
        for posting in self.postings.iter() {
            write!(f, "\n{}", posting)?;
        }
        Ok(())
    }
}

/// Directives taking a single operand.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryDirective {
    Open,
    Close,
    Commodity,
}

impl fmt::Display for UnaryDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryDirective::Open => write!(f, "open"),
            UnaryDirective::Close => write!(f, "close"),
            UnaryDirective::Commodity => write!(f, "commodity"),
        }
    }
}

/// Represents an `open`, `close` or `commodity` directive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryEntry {
    pub directive: UnaryDirective,
    pub content: String,
    pub date: Option<Date>,
}

impl fmt::Display for UnaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.unwrap_or_else(today);
        write!(f, "{} {} {}", date, self.directive, self.content)
    }
}

/// Dated key-value directives.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvDirective {
    /// `note <account> <text>`
    Note,
    /// `event <name> <value>`
    Event,
}

impl fmt::Display for KvDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvDirective::Note => write!(f, "note"),
            KvDirective::Event => write!(f, "event"),
        }
    }
}

/// Represents a `note` or an `event` directive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub directive: KvDirective,
    pub key: String,
    pub value: String,
    pub date: Option<Date>,
}

impl fmt::Display for KvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.unwrap_or_else(today);
        match self.directive {
            // The key of a note is an account.
            KvDirective::Note => write!(
                f,
                "{} {} {} {}",
                date,
                self.directive,
                self.key,
                Quoted(&self.value)
            ),
            KvDirective::Event => write!(
                f,
                "{} {} {} {}",
                date,
                self.directive,
                Quoted(&self.key),
                Quoted(&self.value)
            ),
        }
    }
}

/// Represents an `option` directive. Options are never dated.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub key: String,
    pub value: String,
}

impl fmt::Display for OptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option {} {}", Quoted(&self.key), Quoted(&self.value))
    }
}

/// Represents a `balance` directive. A missing currency is filled with the
/// default currency on finalize.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub account: String,
    pub amount: Decimal,
    pub currency: Option<Currency>,
    pub date: Option<Date>,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.unwrap_or_else(today);
        write!(f, "{} balance {} {}", date, self.account, self.amount)?;
        if let Some(currency) = &self.currency {
            write!(f, " {}", currency)?;
        }
        Ok(())
    }
}

/// Represents a `pad` directive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pad {
    pub account: String,
    pub to_account: String,
    pub date: Option<Date>,
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.unwrap_or_else(today);
        write!(f, "{} pad {} {}", date, self.account, self.to_account)
    }
}

/// One interpreted statement.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Transaction(Transaction),
    Unary(UnaryEntry),
    Kv(KvEntry),
    Option(OptionEntry),
    Balance(Balance),
    Pad(Pad),
    /// A comment line. Also the result for input that cannot be interpreted.
    Comment(String),
}

impl Entry {
    /// Fills in everything the input left out. Called once, right after the
    /// entry is parsed.
    ///
    /// Account names are accepted as written; directives other than
    /// transactions and balances have nothing to fill.
    pub fn finalize(&mut self, default_currency: &str) -> Result<(), Error> {
        match self {
            Entry::Transaction(txn) => txn.finalize(default_currency)?,
            Entry::Balance(balance) => {
                if balance.currency.is_none() {
                    balance.currency = Some(default_currency.to_string());
                }
            }
            Entry::Unary(_) | Entry::Kv(_) | Entry::Option(_) | Entry::Pad(_) | Entry::Comment(_) => {}
        }
        Ok(())
    }

    /// Renders the entry as beancount text. Undated entries use today's date.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Transaction(txn) => write!(f, "{}", txn),
            Entry::Unary(entry) => write!(f, "{}", entry),
            Entry::Kv(entry) => write!(f, "{}", entry),
            Entry::Option(entry) => write!(f, "{}", entry),
            Entry::Balance(entry) => write!(f, "{}", entry),
            Entry::Pad(entry) => write!(f, "{}", entry),
            Entry::Comment(content) => write!(f, "; {}", content),
        }
    }
}
