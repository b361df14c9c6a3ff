use heck::{ToLowerCamelCase, ToUpperCamelCase};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Pluralization rules used to derive relation names.
///
/// Passed into schema construction by value; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Naming {
    #[serde(default)]
    pub style: NamingStyle,

    /// Explicit singular to plural forms. Checked before any other rule.
    #[serde(default)]
    pub forms: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingStyle {
    /// `category` becomes `categories`
    #[default]
    Plural,

    /// `category` becomes `categoryList`
    List,
}

impl Naming {
    pub fn new() -> Naming {
        Naming {
            style: NamingStyle::Plural,
            forms: IndexMap::from([("child".to_string(), "children".to_string())]),
        }
    }

    pub fn style(mut self, style: NamingStyle) -> Naming {
        self.style = style;
        self
    }

    pub fn form(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Naming {
        self.forms.insert(singular.into(), plural.into());
        self
    }

    /// Pluralizes a `lowerCamelCase` name.
    pub fn pluralize(&self, name: &str) -> String {
        if let Some(plural) = self.forms.get(name) {
            return plural.clone();
        }

        if self.style == NamingStyle::List {
            return format!("{name}List");
        }

        for (singular, plural) in &self.forms {
            if let Some(prefix) = name.strip_suffix(singular.as_str()) {
                return format!("{prefix}{plural}");
            }

            if let Some(prefix) = name.strip_suffix(upper_first(singular).as_str()) {
                return format!("{prefix}{}", upper_first(plural));
            }
        }

        // Only the last word of a camel-cased name is inflected
        let split = name
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_uppercase())
            .map(|(i, _)| i)
            .unwrap_or(0);
        let (prefix, word) = name.split_at(split);

        let plural = pluralizer::pluralize(&word.to_lowercase(), 2, false);

        if split > 0 {
            format!("{prefix}{}", upper_first(&plural))
        } else {
            plural
        }
    }
}

impl Default for Naming {
    fn default() -> Self {
        Self::new()
    }
}

/// `order_item` to `OrderItem`
pub fn model_name(table: &str) -> String {
    table.to_upper_camel_case()
}

/// `first_name` to `firstName`
pub fn field_name(column: &str) -> String {
    column.to_lower_camel_case()
}

/// `first_post_id` to `firstPost`
pub fn foreign_key_name(column: &str) -> String {
    let stem = column
        .strip_suffix("_id")
        .or_else(|| column.strip_suffix("Id"))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(column);
    stem.to_lower_camel_case()
}

/// `OrderItem` to `orderItem`
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
