use crate::parse::Parser;
use crate::template::{Binding, TemplateEngine, TeraEngine};
use crate::{Config, Entry, Error, ErrorType};
use std::collections::HashMap;

/// Interprets costflow input, falling back to formulas and finally to a
/// comment.
///
/// Each instance owns its [`Config`], so instances with different settings
/// can be used side by side.
#[derive(Debug, Clone)]
pub struct Costflow<E = TeraEngine> {
    config: Config,
    engine: E,
}

impl Costflow<TeraEngine> {
    pub fn new(config: Config) -> Self {
        Costflow {
            config,
            engine: TeraEngine,
        }
    }
}

impl<E: TemplateEngine> Costflow<E> {
    pub fn with_engine(config: Config, engine: E) -> Self {
        Costflow { config, engine }
    }

    /// Interprets `input` as one entry. Never fails: input that is neither
    /// costflow syntax nor a formula call becomes an [`Entry::Comment`].
    ///
    /// The stages are tried in order:
    /// 1. `f <formula> <args>...` expands the formula directly.
    /// 2. `input` is parsed as costflow syntax.
    /// 3. `<formula> <args>...` expands the formula named by the first word.
    pub fn interpret(&self, input: &str) -> Entry {
        match self.try_interpret(input) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                log::debug!("no interpretation for {:?}, keeping it as a comment", input);
                Entry::Comment(input.to_string())
            }
            Err(e) => {
                log::error!("{}", e);
                Entry::Comment(input.to_string())
            }
        }
    }

    fn try_interpret(&self, input: &str) -> Result<Option<Entry>, Error> {
        let words = input.split_whitespace().collect::<Vec<_>>();
        if let ["f", name, args @ ..] = words.as_slice() {
            if let Some(entry) = self.expand(name, args)? {
                return Ok(Some(entry));
            }
        }
        if let Some(entry) = self.parse_literal(input)? {
            return Ok(Some(entry));
        }
        if let [name, args @ ..] = words.as_slice() {
            return self.expand(name, args);
        }
        Ok(None)
    }

    /// Parses `src` as costflow syntax. A syntax error, or amounts too large
    /// to balance, yield `Ok(None)`.
    pub fn parse_literal(&self, src: &str) -> Result<Option<Entry>, Error> {
        let (result, _) = Parser::parse(src, &self.config.default_currency);
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if matches!(e.r#type, ErrorType::Syntax | ErrorType::Overflow) => {
                log::debug!("{:?} is not costflow syntax: {}", src, e.msg);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Expands formula `name` and parses the result. The expansion is parsed
    /// as costflow syntax only, never expanded again.
    fn expand(&self, name: &str, args: &[&str]) -> Result<Option<Entry>, Error> {
        let template = self.config.formula(name);
        if template.is_empty() {
            return Ok(None);
        }
        let text = match self.compile_template(template, args) {
            Ok(text) => text,
            Err(e) if e.r#type == ErrorType::Template => {
                log::warn!("formula {}: {}", name, e.msg);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        log::debug!("formula {} expanded to {:?}", name, text);
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.parse_literal(&text)
    }

    /// Renders `template` with `args`. If the template uses `amount`, the
    /// first argument is bound to `amount` and the rest, joined by spaces, to
    /// `pre`; otherwise all arguments go to `pre`. `pre` is always text.
    pub fn compile_template(&self, template: &str, args: &[&str]) -> Result<String, Error> {
        let (amount, pre) = if self.engine.variables(template).contains("amount") {
            match args.split_first() {
                Some((first, rest)) => (Binding::numeric(first), rest.join(" ")),
                None => (Binding::Text(String::new()), String::new()),
            }
        } else {
            (Binding::Text(String::new()), args.join(" "))
        };
        let mut bindings = HashMap::new();
        bindings.insert("amount".to_string(), amount);
        bindings.insert("pre".to_string(), Binding::Text(pre));
        self.engine.render(template, &bindings)
    }
}
