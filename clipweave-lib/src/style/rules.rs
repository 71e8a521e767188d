//! Fully-owned flat CSS rule model.
//!
//! Every downstream stage (variable resolution, routing, embed
//! emission) works on these owned copies; nothing holds references
//! into the source CSS text.

use std::fmt;

/// A fully-owned flat rule list, one entry per style rule. Rules that
/// appeared inside a one-level `@media` block carry the serialized
/// media condition.
#[derive(Debug, Default)]
pub struct OwnedStylesheet {
    pub rules: Vec<CssRule>,
}

/// One style rule with a single serialized selector.
///
/// lightningcss selector lists (`.a, .b { .. }`) are split into one
/// `CssRule` per selector so routing decisions stay per-selector.
#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    /// e.g. ".hero", ".hero:hover", "div > span", ":root"
    pub selector: String,
    /// Ordered `property => value` pairs, source order preserved.
    pub declarations: Vec<Declaration>,
    /// Serialized media condition, e.g. "(max-width: 767px)".
    pub media_condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl CssRule {
    /// Flattened declaration text, `prop:value;prop:value` with no
    /// trailing separator. This is the `styleLess` form native styles
    /// carry.
    pub fn declaration_text(&self) -> String {
        self.declarations
            .iter()
            .map(|d| format!("{}:{}", d.property, d.value))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// The rule as standalone CSS text, suitable for embed emission.
    /// A media condition re-wraps the rule in its `@media` block.
    pub fn to_css_text(&self) -> String {
        let body = self
            .declarations
            .iter()
            .map(|d| format!("{}: {};", d.property, d.value))
            .collect::<Vec<_>>()
            .join(" ");
        let rule = format!("{} {{ {} }}", self.selector, body);
        match &self.media_condition {
            Some(cond) => format!("@media {} {{ {} }}", cond, rule),
            None => rule,
        }
    }
}

impl fmt::Display for CssRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_css_text())
    }
}

/// The fixed variant vocabulary of the target format: one supported
/// pseudo-class plus three responsive buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKey {
    Hover,
    Medium,
    Small,
    Tiny,
}

impl VariantKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKey::Hover => "hover",
            VariantKey::Medium => "medium",
            VariantKey::Small => "small",
            VariantKey::Tiny => "tiny",
        }
    }

    pub fn from_str(key: &str) -> Option<Self> {
        match key {
            "hover" => Some(VariantKey::Hover),
            "medium" => Some(VariantKey::Medium),
            "small" => Some(VariantKey::Small),
            "tiny" => Some(VariantKey::Tiny),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_text_rewraps_media_condition() {
        let rule = CssRule {
            selector: ".card".into(),
            declarations: vec![Declaration {
                property: "padding".into(),
                value: "8px".into(),
            }],
            media_condition: Some("(max-width: 767px)".into()),
        };
        assert_eq!(
            rule.to_css_text(),
            "@media (max-width: 767px) { .card { padding: 8px; } }"
        );
    }

    #[test]
    fn declaration_text_preserves_order() {
        let rule = CssRule {
            selector: ".x".into(),
            declarations: vec![
                Declaration {
                    property: "color".into(),
                    value: "red".into(),
                },
                Declaration {
                    property: "margin".into(),
                    value: "0".into(),
                },
            ],
            media_condition: None,
        };
        assert_eq!(rule.declaration_text(), "color:red;margin:0");
    }
}
