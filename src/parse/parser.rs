use super::lexer::{Lexeme, Lexer};
use super::token::{Keyword, Token};
use crate::{
    Balance, Date, Decimal, Entry, Error, ErrorLevel, ErrorType, KvDirective, KvEntry, Narration,
    OptionEntry, Pad, Payee, Posting, Transaction, TxnFlag, UnaryDirective, UnaryEntry,
};

/// Builds one [`Entry`] from costflow syntax.
///
/// ```text
/// entry       : COMMENT STRING
///             | OPTION STRING STRING+
///             | DATE* directive
///             | narration postings
/// narration   : (DATE | '*' | '!')* ('@' STRING [STRING] | STRING [STRING])
/// postings    : (rev_postings | '|' posting) ('>' rev_postings | '|' posting)*
/// posting     : NAME [NAME] AMOUNT | NAME AMOUNT NAME
/// rev_postings: rev_posting ('+' rev_posting)*
/// rev_posting : [AMOUNT] [NAME] NAME
/// ```
pub struct Parser<'source> {
    lexer: Lexer<'source>,
}

impl<'source> Parser<'source> {
    pub fn new(src: &'source str) -> Self {
        Parser {
            lexer: Lexer::new(src),
        }
    }

    /// Parses `src` as exactly one entry and finalizes it. The second value
    /// holds the lexer warnings, which never abort parsing.
    pub fn parse(src: &str, default_currency: &str) -> (Result<Entry, Error>, Vec<Error>) {
        let mut parser = Parser::new(src);
        let result = parser.parse_entry().and_then(|mut entry| {
            entry.finalize(default_currency)?;
            Ok(entry)
        });
        (result, parser.lexer.into_diagnostics())
    }

    fn unexpected<T>(&self, lexeme: &Lexeme) -> Result<T, Error> {
        Err(Error {
            level: ErrorLevel::Error,
            r#type: ErrorType::Syntax,
            msg: format!("Unexpected token {:?}({}).", lexeme.token, lexeme.text),
            src: lexeme.src,
        })
    }

    fn parse_entry(&mut self) -> Result<Entry, Error> {
        let entry = match self.lexer.peek() {
            Some(Token::Comment) => self.parse_comment()?,
            Some(Token::Keyword(Keyword::Option)) => self.parse_option()?,
            _ => self.parse_dated_entry()?,
        };
        match self.lexer.take() {
            Ok(lexeme) => self.unexpected(&lexeme),
            Err(_) => Ok(entry),
        }
    }

    fn parse_comment(&mut self) -> Result<Entry, Error> {
        self.lexer.take()?;
        let content = self.take_string()?;
        Ok(Entry::Comment(content))
    }

    fn parse_option(&mut self) -> Result<Entry, Error> {
        self.lexer.take()?;
        let key = self.take_string()?;
        let value = self.parse_words()?.join(" ");
        Ok(Entry::Option(OptionEntry { key, value }))
    }

    /// The first of several leading dates wins.
    fn parse_dates(&mut self) -> Option<Date> {
        let mut date = None;
        while let Some(Token::Date(d)) = self.lexer.peek() {
            date = date.or(Some(*d));
            self.lexer.consume();
        }
        date
    }

    fn parse_dated_entry(&mut self) -> Result<Entry, Error> {
        let date = self.parse_dates();
        let keyword = match self.lexer.peek() {
            Some(Token::Keyword(keyword)) => *keyword,
            _ => {
                let narration = self.parse_narration(date)?;
                return self.parse_transaction(narration).map(Entry::Transaction);
            }
        };
        match keyword {
            Keyword::Open => self.parse_unary(UnaryDirective::Open, date),
            Keyword::Close => self.parse_unary(UnaryDirective::Close, date),
            Keyword::Commodity => self.parse_unary(UnaryDirective::Commodity, date),
            Keyword::Note => self.parse_kv(KvDirective::Note, date),
            Keyword::Event => self.parse_kv(KvDirective::Event, date),
            Keyword::Balance => self.parse_balance(date),
            Keyword::Pad => self.parse_pad(date),
            // options are never dated
            Keyword::Option => {
                let lexeme = self.lexer.take()?;
                self.unexpected(&lexeme)
            }
        }
    }

    fn parse_unary(&mut self, directive: UnaryDirective, date: Option<Date>) -> Result<Entry, Error> {
        self.lexer.take()?;
        let content = self.parse_words()?.join(" ");
        Ok(Entry::Unary(UnaryEntry {
            directive,
            content,
            date,
        }))
    }

    fn parse_kv(&mut self, directive: KvDirective, date: Option<Date>) -> Result<Entry, Error> {
        self.lexer.take()?;
        let key = self.take_string()?;
        let value = self.parse_words()?.join(" ");
        Ok(Entry::Kv(KvEntry {
            directive,
            key,
            value,
            date,
        }))
    }

    fn parse_balance(&mut self, date: Option<Date>) -> Result<Entry, Error> {
        self.lexer.take()?;
        let account = self.take_string()?;
        let amount = self.take_number()?;
        let currency = self.optional_string()?;
        Ok(Entry::Balance(Balance {
            account,
            amount,
            currency,
            date,
        }))
    }

    fn parse_pad(&mut self, date: Option<Date>) -> Result<Entry, Error> {
        self.lexer.take()?;
        let account = self.take_string()?;
        let to_account = self.take_string()?;
        Ok(Entry::Pad(Pad {
            account,
            to_account,
            date,
        }))
    }

    fn parse_narration(&mut self, date: Option<Date>) -> Result<Narration, Error> {
        let mut date = date;
        let mut flag = None;
        loop {
            match self.lexer.peek() {
                Some(Token::Date(d)) => date = date.or(Some(*d)),
                Some(Token::Asterisk) => flag = flag.or(Some(TxnFlag::Posted)),
                Some(Token::Bang) => flag = flag.or(Some(TxnFlag::Pending)),
                _ => break,
            }
            self.lexer.consume();
        }

        let (payee, desc): (Payee, String) = match self.lexer.peek() {
            Some(Token::At) => {
                self.lexer.consume();
                let payee = self.take_string()?;
                (payee, self.optional_string()?.unwrap_or_default())
            }
            Some(Token::String(_)) => {
                let first = self.take_string()?;
                match self.optional_string()? {
                    Some(desc) => (first, desc),
                    None => (Payee::new(), first),
                }
            }
            // A bare number, e.g. from a formula like `{{ pre }} bofa > visa`.
            Some(Token::Amount(_)) => {
                let lexeme = self.lexer.take()?;
                (Payee::new(), lexeme.text.to_string())
            }
            _ => {
                let lexeme = self.lexer.take()?;
                return self.unexpected(&lexeme);
            }
        };
        Ok(Narration {
            payee,
            desc,
            flag: flag.unwrap_or_default(),
            date,
        })
    }

    fn parse_transaction(&mut self, narration: Narration) -> Result<Transaction, Error> {
        let mut postings = match self.lexer.peek() {
            Some(Token::Pipe) => {
                self.lexer.consume();
                vec![self.parse_posting()?]
            }
            _ => self.parse_rev_postings()?,
        };
        loop {
            match self.lexer.peek() {
                Some(Token::Gt) => {
                    self.lexer.consume();
                    postings.extend(self.parse_rev_postings()?);
                }
                Some(Token::Pipe) => {
                    self.lexer.consume();
                    postings.push(self.parse_posting()?);
                }
                _ => break,
            }
        }
        Ok(Transaction::new(narration, postings))
    }

    /// A posting after `|`, account first.
    fn parse_posting(&mut self) -> Result<Posting, Error> {
        let first = self.take_name()?;
        if let Some(Token::Amount(_)) = self.lexer.peek() {
            let amount = self.take_amount()?;
            let currency = match self.lexer.peek() {
                Some(Token::Name(_)) => Some(self.take_name()?),
                _ => None,
            };
            return Ok(Posting {
                account: first,
                amount: Some(amount),
                currency,
            });
        }
        let second = self.take_name()?;
        let amount = self.take_amount()?;
        let (account, currency) = if looks_like_currency(&first) && !looks_like_currency(&second) {
            (second, first)
        } else {
            (first, second)
        };
        Ok(Posting {
            account,
            amount: Some(amount),
            currency: Some(currency),
        })
    }

    fn parse_rev_postings(&mut self) -> Result<Vec<Posting>, Error> {
        let mut postings = vec![self.parse_rev_posting()?];
        while let Some(Token::Plus) = self.lexer.peek() {
            self.lexer.consume();
            postings.push(self.parse_rev_posting()?);
        }
        Ok(postings)
    }

    /// A posting with the amount first: `[AMOUNT] [CURRENCY] ACCOUNT`.
    fn parse_rev_posting(&mut self) -> Result<Posting, Error> {
        let amount = match self.lexer.peek() {
            Some(Token::Amount(_)) => Some(self.take_amount()?),
            _ => None,
        };
        let first = self.take_name()?;
        let (account, currency) = match self.lexer.peek() {
            Some(Token::Name(_)) => (self.take_name()?, Some(first)),
            _ => (first, None),
        };
        Ok(Posting {
            account,
            amount,
            currency,
        })
    }

    /// One or more strings, e.g. an unquoted value with spaces.
    fn parse_words(&mut self) -> Result<Vec<String>, Error> {
        let mut words = vec![self.take_word()?];
        while let Some(Token::String(_)) | Some(Token::Number(_)) = self.lexer.peek() {
            words.push(self.take_word()?);
        }
        Ok(words)
    }

    fn take_word(&mut self) -> Result<String, Error> {
        let lexeme = self.lexer.take()?;
        match &lexeme.token {
            Token::String(s) => Ok(s.clone()),
            Token::Number(_) => Ok(lexeme.text.to_string()),
            _ => self.unexpected(&lexeme),
        }
    }

    fn take_string(&mut self) -> Result<String, Error> {
        let lexeme = self.lexer.take()?;
        match &lexeme.token {
            Token::String(s) => Ok(s.clone()),
            _ => self.unexpected(&lexeme),
        }
    }

    fn optional_string(&mut self) -> Result<Option<String>, Error> {
        match self.lexer.peek() {
            Some(Token::String(_)) => self.take_string().map(Some),
            _ => Ok(None),
        }
    }

    fn take_name(&mut self) -> Result<String, Error> {
        let lexeme = self.lexer.take()?;
        match &lexeme.token {
            Token::Name(s) => Ok(s.clone()),
            _ => self.unexpected(&lexeme),
        }
    }

    fn take_amount(&mut self) -> Result<Decimal, Error> {
        let lexeme = self.lexer.take()?;
        match lexeme.token {
            Token::Amount(number) => Ok(number),
            _ => self.unexpected(&lexeme),
        }
    }

    fn take_number(&mut self) -> Result<Decimal, Error> {
        let lexeme = self.lexer.take()?;
        match lexeme.token {
            Token::Number(number) => Ok(number),
            _ => self.unexpected(&lexeme),
        }
    }
}

/// Uppercase names like `USD` or `VBMPX` are taken for currencies.
fn looks_like_currency(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '\'' | '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::today;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn parse(src: &str) -> Result<Entry, Error> {
        Parser::parse(src, "CNY").0
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn posting(account: &str, amount: Decimal, currency: &str) -> Posting {
        Posting::new(account)
            .with_amount(amount)
            .with_currency(currency)
    }

    fn narration_of(src: &str) -> Narration {
        match parse(src) {
            Ok(Entry::Transaction(txn)) => txn.narration().clone(),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn narrations() {
        let cases = [
            ("desc | a 1", Narration::new("", "desc")),
            ("@payee | a 1", Narration::new("payee", "")),
            ("@payee desc | a 1", Narration::new("payee", "desc")),
            ("payee desc | a 1", Narration::new("payee", "desc")),
            (
                "* \"payee payee\" \"desc desc\" | a 1",
                Narration::new("payee payee", "desc desc"),
            ),
            (
                "2021-09-24 ! \"payee payee\" \"desc desc\" | a 1",
                Narration::new("payee payee", "desc desc")
                    .with_flag(TxnFlag::Pending)
                    .with_date(date(2021, 9, 24)),
            ),
            (
                "ytd Dinner 10 bofa > food",
                Narration::new("", "Dinner").with_date(today() - Duration::days(1)),
            ),
        ];
        for (src, expected) in cases.iter() {
            assert_eq!(&narration_of(src), expected, "{}", src);
        }
    }

    #[test]
    fn reverse_posting_groups() {
        let entry = parse("! @abc \"def ghi\" -100 USD from + 300 CNY from2 > USD to1 + CNY to2")
            .unwrap();
        let expected = Transaction::new(
            Narration::new("abc", "def ghi").with_flag(TxnFlag::Pending),
            vec![
                posting("from", dec!(-100), "USD"),
                posting("from2", dec!(300), "CNY"),
                posting("to1", dec!(100), "USD"),
                posting("to2", dec!(-300), "CNY"),
            ],
        );
        assert_eq!(entry, Entry::Transaction(expected));
    }

    #[test]
    fn pipe_postings_across_lines() {
        let entry = parse("2021-09-24 麦当劳 汉堡\n| from 24\n| to1 -18\n| to2 -6").unwrap();
        let expected = Transaction::new(
            Narration::new("麦当劳", "汉堡").with_date(date(2021, 9, 24)),
            vec![
                posting("from", dec!(24), "CNY"),
                posting("to1", dec!(-18), "CNY"),
                posting("to2", dec!(-6), "CNY"),
            ],
        );
        assert_eq!(entry, Entry::Transaction(expected));
    }

    #[test]
    fn pipe_posting_currency_forms() {
        let entry = parse("2021-09-24 麦当劳 汉堡\n| from 24 USD | to1 -18\n| to2 -6").unwrap();
        match entry {
            Entry::Transaction(txn) => assert_eq!(
                txn.postings(),
                &vec![
                    posting("from", dec!(24), "USD"),
                    posting("to1", dec!(-18), "USD"),
                    posting("to2", dec!(-6), "USD"),
                ]
            ),
            other => panic!("{:?}", other),
        }
        let entry = parse("Dinner | bofa USD 180 | EUR rx -60").unwrap();
        match entry {
            Entry::Transaction(txn) => assert_eq!(
                txn.postings(),
                &vec![posting("bofa", dec!(180), "USD"), posting("rx", dec!(-60), "EUR")]
            ),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn pipe_posting_two_names_without_one_currency() {
        let postings = |src| match parse(src) {
            Ok(Entry::Transaction(txn)) => txn.postings().clone(),
            other => panic!("{:?}", other),
        };
        // neither looks like a currency: account first
        assert_eq!(
            postings("x | bofa usd 10 | visa usd -10"),
            vec![posting("bofa", dec!(10), "usd"), posting("visa", dec!(-10), "usd")]
        );
        // both look like currencies: account first
        assert_eq!(
            postings("x | BOFA USD 10 | VISA USD -10"),
            vec![posting("BOFA", dec!(10), "USD"), posting("VISA", dec!(-10), "USD")]
        );
        // only the first does: it is the currency
        assert_eq!(
            postings("x | USD bofa 10 | visa -10"),
            vec![posting("bofa", dec!(10), "USD"), posting("visa", dec!(-10), "USD")]
        );
    }

    #[test]
    fn split_among_omitted_accounts() {
        let entry = parse("Dinner 180 CNY bofa > rx + ry + food").unwrap();
        match entry {
            Entry::Transaction(txn) => assert_eq!(
                txn.postings(),
                &vec![
                    posting("bofa", dec!(180), "CNY"),
                    posting("rx", dec!(-60), "CNY"),
                    posting("ry", dec!(-60), "CNY"),
                    posting("food", dec!(-60), "CNY"),
                ]
            ),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn comments() {
        for src in [";      hi hi hi hello", "//\thi hi hi hello"] {
            assert_eq!(parse(src).unwrap(), Entry::Comment("hi hi hi hello".to_string()));
        }
    }

    #[test]
    fn unary_directives() {
        let unary = |directive, content: &str, date| {
            Entry::Unary(UnaryEntry {
                directive,
                content: content.to_string(),
                date,
            })
        };
        assert_eq!(
            parse("open Assets:Bank").unwrap(),
            unary(UnaryDirective::Open, "Assets:Bank", None)
        );
        assert_eq!(
            parse("2021-01-01 close Assets:Bank").unwrap(),
            unary(UnaryDirective::Close, "Assets:Bank", Some(date(2021, 1, 1)))
        );
        assert_eq!(
            parse("1867-01-01 commodity CAD").unwrap(),
            unary(UnaryDirective::Commodity, "CAD", Some(date(1867, 1, 1)))
        );
        assert_eq!(
            parse("open Assets:Bank USD,CNY").unwrap(),
            unary(UnaryDirective::Open, "Assets:Bank USD,CNY", None)
        );
    }

    #[test]
    fn options() {
        let option = |key: &str, value: &str| {
            Entry::Option(OptionEntry {
                key: key.to_string(),
                value: value.to_string(),
            })
        };
        assert_eq!(
            parse("option title Example Costflow file").unwrap(),
            option("title", "Example Costflow file")
        );
        assert_eq!(
            parse("option operating_currency CNY").unwrap(),
            option("operating_currency", "CNY")
        );
        assert_eq!(
            parse("option \"conversion_currency\" \"NOTHING\"").unwrap(),
            option("conversion_currency", "NOTHING")
        );
        assert!(parse("2021-01-01 option title x").is_err());
    }

    #[test]
    fn events_and_notes() {
        let kv = |directive, key: &str, value: &str, date| {
            Entry::Kv(KvEntry {
                directive,
                key: key.to_string(),
                value: value.to_string(),
                date,
            })
        };
        let cases = [
            (
                "2017-01-02 event \"location\" \"Paris, France\"",
                kv(KvDirective::Event, "location", "Paris, France", Some(date(2017, 1, 2))),
            ),
            (
                "event location Paris, France",
                kv(KvDirective::Event, "location", "Paris, France", None),
            ),
            (
                "2019-07-01 note bofa Called about fraudulent card.",
                kv(
                    KvDirective::Note,
                    "bofa",
                    "Called about fraudulent card.",
                    Some(date(2019, 7, 1)),
                ),
            ),
            (
                "note bofa Called about fraudulent card.",
                kv(KvDirective::Note, "bofa", "Called about fraudulent card.", None),
            ),
        ];
        for (src, expected) in cases.iter() {
            assert_eq!(&parse(src).unwrap(), expected, "{}", src);
        }
    }

    #[test]
    fn balances() {
        assert_eq!(
            parse("2017-01-01 balance Assets:BofA 360 USD").unwrap(),
            Entry::Balance(Balance {
                account: "Assets:BofA".to_string(),
                amount: dec!(360),
                currency: Some("USD".to_string()),
                date: Some(date(2017, 1, 1)),
            })
        );
        assert_eq!(
            parse("balance BofA 1024").unwrap(),
            Entry::Balance(Balance {
                account: "BofA".to_string(),
                amount: dec!(1024),
                currency: Some("CNY".to_string()),
                date: None,
            })
        );
    }

    #[test]
    fn pads() {
        let pad = |d| {
            Entry::Pad(Pad {
                account: "bofa".to_string(),
                to_account: "eob".to_string(),
                date: d,
            })
        };
        assert_eq!(parse("2017-01-01 pad bofa eob").unwrap(), pad(Some(date(2017, 1, 1))));
        assert_eq!(parse("pad bofa eob").unwrap(), pad(None));
    }

    #[test]
    fn bare_number_narration() {
        match parse("123 bofa > visa").unwrap() {
            Entry::Transaction(txn) => {
                assert_eq!(txn.narration(), &Narration::new("", "123"));
                assert_eq!(
                    txn.postings(),
                    &vec![posting("bofa", dec!(0), "CNY"), posting("visa", dec!(0), "CNY")]
                );
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn syntax_errors() {
        for src in ["", "loop", "abcdefghijk", "@payee", "balance BofA", "pad bofa", "desc | a", "x 1 a > "] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.r#type, ErrorType::Syntax, "{}", src);
        }
    }

    #[test]
    fn overflow_is_reported() {
        let err = parse("x 79228162514264337593543950335 a + 79228162514264337593543950335 b > c")
            .unwrap_err();
        assert_eq!(err.r#type, ErrorType::Overflow);
    }

    #[test]
    fn illegal_characters_do_not_abort() {
        let (result, diagnostics) = Parser::parse("Dinner # 100 bofa > food", "CNY");
        assert!(matches!(result, Ok(Entry::Transaction(_))));
        assert_eq!(diagnostics.len(), 1);
    }
}
