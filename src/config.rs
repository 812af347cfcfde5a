use std::collections::HashMap;

/// Settings for one [`Costflow`](crate::Costflow) instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Used whenever no currency can be inferred from the input.
    pub default_currency: String,
    /// Formula name to template source.
    pub formulas: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_currency: "CNY".to_string(),
            formulas: HashMap::new(),
        }
    }
}

impl Config {
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_formula(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.formulas.insert(name.into(), template.into());
        self
    }

    /// Returns the template of formula `name`, or `""` if there is none.
    pub fn formula(&self, name: &str) -> &str {
        self.formulas.get(name).map_or("", String::as_str)
    }
}
