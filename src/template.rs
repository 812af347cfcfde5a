//! Formula templates.

use crate::utils::parse_decimal;
use crate::{Decimal, Error, ErrorLevel, ErrorType, Source};
use rust_decimal::prelude::ToPrimitive;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tera::{Context, Tera};

/// A value bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Spliced into the output as written.
    Text(String),
    /// Usable in arithmetic, e.g. `{{ amount * 2 }}`.
    Number(Decimal),
}

impl Binding {
    /// A number if `value` reads as one, text otherwise.
    pub fn numeric(value: &str) -> Self {
        match parse_decimal(value) {
            Some(number) => Binding::Number(number),
            None => Binding::Text(value.to_string()),
        }
    }
}

/// Renders formula templates.
pub trait TemplateEngine {
    /// Returns the names of the variables referenced by `template`.
    fn variables(&self, template: &str) -> HashSet<String>;

    fn render(&self, template: &str, bindings: &HashMap<String, Binding>) -> Result<String, Error>;
}

/// A [`TemplateEngine`] backed by [`tera`], with Jinja2-like syntax such as
/// `@{{ pre }} {{ amount * 2 }} visa > coffee`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraEngine;

impl TemplateEngine for TeraEngine {
    fn variables(&self, template: &str) -> HashSet<String> {
        let mut variables = HashSet::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let close = match &rest[open..] {
                tag if tag.starts_with("{{") => "}}",
                tag if tag.starts_with("{%") => "%}",
                _ => {
                    rest = &rest[open + 1..];
                    continue;
                }
            };
            let body_start = open + 2;
            let body_end = rest[body_start..]
                .find(close)
                .map_or(rest.len(), |end| body_start + end);
            collect_identifiers(&rest[body_start..body_end], &mut variables);
            rest = &rest[(body_end + close.len()).min(rest.len())..];
        }
        variables
    }

    fn render(&self, template: &str, bindings: &HashMap<String, Binding>) -> Result<String, Error> {
        let mut context = Context::new();
        for (key, value) in bindings {
            match value {
                Binding::Text(text) => context.insert(key.as_str(), text),
                Binding::Number(number) => insert_number(&mut context, key, *number),
            }
        }
        let text = Tera::one_off(template, &context, false).map_err(|e| Error {
            msg: format!("Cannot render formula {:?}: {}", template, e),
            src: Source::default(),
            r#type: ErrorType::Template,
            level: ErrorLevel::Error,
        })?;
        Ok(clean_floats(&text))
    }
}

/// Integers are inserted as integers so that integer arithmetic stays exact.
fn insert_number(context: &mut Context, key: &str, number: Decimal) {
    if number.fract().is_zero() {
        if let Some(int) = number.to_i64() {
            return context.insert(key, &int);
        }
    }
    match number.to_f64() {
        Some(float) => context.insert(key, &float),
        None => context.insert(key, &number.to_string()),
    }
}

/// Significant digits an `f64` holds exactly.
const F64_DIGITS: u32 = 15;

/// Rewrites words like `3.3000000000000003`, left by binary floating point
/// arithmetic, to the shortest decimal within `f64` precision.
fn clean_floats(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        let word_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, tail) = rest.split_at(word_len);
        result.push_str(&clean_float(word).unwrap_or_else(|| word.to_string()));
        let space_len = tail.find(|c: char| !c.is_whitespace()).unwrap_or(tail.len());
        result.push_str(&tail[..space_len]);
        rest = &tail[space_len..];
    }
    result
}

fn clean_float(word: &str) -> Option<String> {
    let digits = word.trim_start_matches('-');
    let (int_part, frac_part) = digits.split_once('.')?;
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    let significant = digits
        .trim_start_matches(|c: char| c == '0' || c == '.')
        .bytes()
        .filter(u8::is_ascii_digit)
        .count();
    if significant <= F64_DIGITS as usize {
        return None;
    }
    let number = Decimal::from_str(word).ok()?.round_sf(F64_DIGITS)?;
    Some(number.normalize().to_string())
}

const KEYWORDS: [&str; 16] = [
    "and", "or", "not", "in", "is", "if", "elif", "else", "endif", "for", "endfor", "set",
    "true", "false", "True", "False",
];

/// Collects the identifiers of an expression, skipping string literals,
/// attributes (`a.b`) and filters (`a | upper`).
fn collect_identifiers(expr: &str, variables: &mut HashSet<String>) {
    let mut chars = expr.char_indices().peekable();
    let mut previous = ' ';
    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            for (_, d) in chars.by_ref() {
                if d == c {
                    break;
                }
            }
            previous = c;
        } else if c.is_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some(&(i, d)) = chars.peek() {
                if !(d.is_alphanumeric() || d == '_') {
                    break;
                }
                end = i + d.len_utf8();
                chars.next();
            }
            let ident = &expr[start..end];
            if previous != '.' && previous != '|' && !KEYWORDS.contains(&ident) {
                variables.insert(ident.to_string());
            }
            previous = 'a';
        } else if !c.is_whitespace() {
            previous = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(amount: &str, pre: &str) -> HashMap<String, Binding> {
        let mut bindings = HashMap::new();
        bindings.insert("amount".to_string(), Binding::numeric(amount));
        bindings.insert("pre".to_string(), Binding::Text(pre.to_string()));
        bindings
    }

    #[test]
    fn finds_variables() {
        let engine = TeraEngine;
        let vars = engine.variables("@{{ pre }} ☕️ {{ amount*2 }} visa > coffee");
        assert_eq!(
            vars,
            ["pre", "amount"].iter().map(|s| s.to_string()).collect()
        );
        let vars = engine.variables("{{ pre | upper }} {{ \"amount\" }} {% if x.amount %}y{% endif %}");
        assert_eq!(vars, ["pre", "x"].iter().map(|s| s.to_string()).collect());
        assert!(engine.variables("loop").is_empty());
    }

    #[test]
    fn renders_with_numeric_bindings() {
        let engine = TeraEngine;
        let text = engine
            .render(
                "@{{ pre }} {{ amount*2 }} visa > coffee",
                &bindings("10.24", "Leplay's"),
            )
            .unwrap();
        assert_eq!(text, "@Leplay's 20.48 visa > coffee");
        let text = engine
            .render("tmr balance {{pre}}", &bindings("", "123.40 CNY"))
            .unwrap();
        assert_eq!(text, "tmr balance 123.40 CNY");
    }

    #[test]
    fn text_is_kept_verbatim() {
        let text = TeraEngine
            .render("{{ pre }} bofa > visa", &bindings("", "007 +5"))
            .unwrap();
        assert_eq!(text, "007 +5 bofa > visa");
    }

    #[test]
    fn arithmetic_has_no_float_noise() {
        let text = TeraEngine
            .render("{{ amount * 3 }} a > b", &bindings("1.1", ""))
            .unwrap();
        assert_eq!(text, "3.3 a > b");
        let text = TeraEngine
            .render("{{ amount * 2 }}", &bindings("1024", ""))
            .unwrap();
        assert_eq!(text, "2048");
    }

    #[test]
    fn long_decimals_are_rounded_to_f64_precision() {
        assert_eq!(clean_floats("x  0.30000000000000004\t-2.2"), "x  0.3\t-2.2");
        assert_eq!(clean_floats("1.25 bofa"), "1.25 bofa");
        assert_eq!(clean_floats("a.b 1. .5"), "a.b 1. .5");
    }

    #[test]
    fn render_errors_are_template_errors() {
        let err = TeraEngine
            .render("{{ pre", &bindings("", "x"))
            .unwrap_err();
        assert_eq!(err.r#type, ErrorType::Template);
    }
}
