//! Native-vs-embed style routing.
//!
//! Every parsed rule ends up either as a native `StyleClass`
//! (± variants) or inside an embed block keyed by its originating
//! selector. The decision order is fixed: pseudo-elements first, then
//! complex selector shapes, then variant-eligible rules (supported
//! pseudo-class or snapped breakpoint), then base merges. Nothing is
//! dropped: what the target format cannot express natively is
//! preserved as raw CSS.

use crate::style::gradients;
use crate::style::rules::{CssRule, Declaration, VariantKey};
use crate::style::selector::{self, Pseudo, SelectorKind};
use crate::style::variables::{self, VariableTable};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// One native target-format style object. One `StyleClass` per
/// distinct class selector; pseudo-class and breakpoint rules merge
/// into `variants` on the same object.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleClass {
    /// The CSS class name, without the leading dot.
    pub name: String,
    /// Flattened, resolved, normalized base declarations.
    pub style_less: String,
    /// Variant key → declaration text. Keys come from the fixed
    /// breakpoint/pseudo-class vocabulary only.
    pub variants: BTreeMap<String, String>,
}

/// Raw CSS preserved for the escape hatch, grouped by originating
/// selector (or at-rule prelude).
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedBlock {
    pub selector: String,
    pub css_text: String,
}

/// Routing output for one section's rules.
#[derive(Debug, Default)]
pub struct Routed {
    pub native: Vec<StyleClass>,
    pub embeds: Vec<EmbedBlock>,
    pub warnings: Vec<String>,
}

/// Source `max-width` thresholds snap to the nearest of the three
/// fixed target breakpoints; anything above the widest is desktop
/// base.
const BREAKPOINTS: &[(f64, VariantKey)] = &[
    (479.0, VariantKey::Tiny),
    (767.0, VariantKey::Small),
    (991.0, VariantKey::Medium),
];

pub fn route(rules: &[CssRule], raw_at_rules: &[String], table: &VariableTable) -> Routed {
    let mut router = Router::default();
    for rule in rules {
        router.route_rule(rule, table);
    }
    for raw in raw_at_rules {
        let key = raw
            .split('{')
            .next()
            .unwrap_or(raw)
            .trim()
            .to_string();
        router.push_embed(&key, raw.clone());
    }
    router.finish()
}

#[derive(Default)]
struct Router {
    native: Vec<StyleClass>,
    native_index: HashMap<String, usize>,
    embeds: Vec<EmbedBlock>,
    embed_index: HashMap<String, usize>,
    /// transition/animation declarations stripped from native text,
    /// kept around in case the selector also has embed output.
    stripped_motion: Vec<(String, Declaration)>,
    warnings: Vec<String>,
}

impl Router {
    fn route_rule(&mut self, rule: &CssRule, table: &VariableTable) {
        let resolved = self.resolve_declarations(rule, table);
        match selector::classify(&rule.selector) {
            SelectorKind::Root => {
                // Custom properties were consumed into the variable
                // table; only leftover concrete declarations need the
                // escape hatch.
                let leftover: Vec<Declaration> = resolved
                    .into_iter()
                    .filter(|d| !d.property.starts_with("--"))
                    .collect();
                if !leftover.is_empty() {
                    self.embed_rule(rule, leftover);
                }
            }
            SelectorKind::Tag { .. } | SelectorKind::Complex => {
                self.embed_rule(rule, resolved);
            }
            SelectorKind::Class { name, pseudo } => {
                self.route_class_rule(rule, &name, pseudo, resolved);
            }
        }
    }

    fn route_class_rule(
        &mut self,
        rule: &CssRule,
        name: &str,
        pseudo: Option<Pseudo>,
        resolved: Vec<Declaration>,
    ) {
        match pseudo {
            // The target has no native pseudo-element concept.
            Some(Pseudo::Element(_)) => self.embed_rule(rule, resolved),
            Some(Pseudo::Class(pc)) => {
                if pc == "hover" && rule.media_condition.is_none() {
                    let kept = self.keep_native(name, &resolved);
                    self.merge_variant(name, VariantKey::Hover, kept);
                } else {
                    // Unsupported pseudo-class, or a pseudo under a
                    // media condition (the variant map has no
                    // combined keys).
                    self.embed_rule(rule, resolved);
                }
            }
            None => match &rule.media_condition {
                None => {
                    let kept = self.keep_native(name, &resolved);
                    self.merge_base(name, kept);
                }
                Some(cond) => match snap_breakpoint(cond) {
                    BreakpointMatch::Bucket(key, source_px) => {
                        if !BREAKPOINTS.iter().any(|(px, _)| *px == source_px) {
                            self.warnings.push(format!(
                                "breakpoint max-width {}px snapped to \"{}\"",
                                source_px,
                                key.as_str()
                            ));
                        }
                        let kept = self.keep_native(name, &resolved);
                        self.merge_variant(name, key, kept);
                    }
                    BreakpointMatch::DesktopBase => {
                        let kept = self.keep_native(name, &resolved);
                        self.merge_base(name, kept);
                    }
                    BreakpointMatch::Unsupported => self.embed_rule(rule, resolved),
                },
            },
        }
    }

    /// Variable-resolve and gradient-normalize a rule's declarations,
    /// accumulating warnings.
    fn resolve_declarations(&mut self, rule: &CssRule, table: &VariableTable) -> Vec<Declaration> {
        rule.declarations
            .iter()
            .map(|decl| {
                let resolved = variables::resolve(&decl.value, table);
                self.warnings.extend(resolved.warnings);
                let normalized = gradients::normalize_value(&resolved.value);
                self.warnings.extend(normalized.warnings);
                Declaration {
                    property: decl.property.clone(),
                    value: normalized.value,
                }
            })
            .collect()
    }

    /// Filter declarations down to what native style text may carry.
    /// transition/animation declarations are remembered per selector
    /// so they can ride along in embed output later.
    fn keep_native(&mut self, class_name: &str, decls: &[Declaration]) -> Vec<Declaration> {
        let mut kept = Vec::with_capacity(decls.len());
        for decl in decls {
            if is_motion_property(&decl.property) {
                debug!(
                    "stripping {} from native style .{}",
                    decl.property, class_name
                );
                self.stripped_motion
                    .push((format!(".{}", class_name), decl.clone()));
            } else if decl.property.starts_with("--") {
                debug!(
                    "stripping custom property {} from native style .{}",
                    decl.property, class_name
                );
            } else {
                kept.push(decl.clone());
            }
        }
        kept
    }

    fn merge_base(&mut self, name: &str, decls: Vec<Declaration>) {
        let idx = self.class_index(name);
        let text = declaration_text(&decls);
        append_text(&mut self.native[idx].style_less, &text);
    }

    fn merge_variant(&mut self, name: &str, key: VariantKey, decls: Vec<Declaration>) {
        let idx = self.class_index(name);
        let text = declaration_text(&decls);
        let slot = self.native[idx]
            .variants
            .entry(key.as_str().to_string())
            .or_default();
        append_text(slot, &text);
    }

    fn class_index(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.native_index.get(name) {
            return idx;
        }
        let idx = self.native.len();
        self.native.push(StyleClass {
            name: name.to_string(),
            style_less: String::new(),
            variants: BTreeMap::new(),
        });
        self.native_index.insert(name.to_string(), idx);
        idx
    }

    fn embed_rule(&mut self, rule: &CssRule, decls: Vec<Declaration>) {
        let routed = CssRule {
            selector: rule.selector.clone(),
            declarations: decls,
            media_condition: rule.media_condition.clone(),
        };
        let key = embed_group_key(&rule.selector);
        self.push_embed(&key, routed.to_css_text());
    }

    fn push_embed(&mut self, key: &str, css_text: String) {
        if let Some(&idx) = self.embed_index.get(key) {
            let block = &mut self.embeds[idx];
            block.css_text.push('\n');
            block.css_text.push_str(&css_text);
        } else {
            let idx = self.embeds.len();
            self.embeds.push(EmbedBlock {
                selector: key.to_string(),
                css_text,
            });
            self.embed_index.insert(key.to_string(), idx);
        }
    }

    /// Flush stripped transition/animation declarations for selectors
    /// that ended up with embed output, then return the result.
    fn finish(mut self) -> Routed {
        let stripped = std::mem::take(&mut self.stripped_motion);
        for (selector, decl) in stripped {
            if self.embed_index.contains_key(&selector) {
                let rule = CssRule {
                    selector: selector.clone(),
                    declarations: vec![decl],
                    media_condition: None,
                };
                self.push_embed(&selector, rule.to_css_text());
            } else {
                debug!("dropped motion declaration for {}", selector);
            }
        }
        Routed {
            native: self.native,
            embeds: self.embeds,
            warnings: self.warnings,
        }
    }
}

/// The target format has no declarative transition/animation support;
/// these are stripped from native style text. Vendor prefixes count.
fn is_motion_property(property: &str) -> bool {
    let base = property
        .strip_prefix("-webkit-")
        .or_else(|| property.strip_prefix("-moz-"))
        .or_else(|| property.strip_prefix("-o-"))
        .or_else(|| property.strip_prefix("-ms-"))
        .unwrap_or(property);
    base == "transition"
        || base.starts_with("transition-")
        || base == "animation"
        || base.starts_with("animation-")
}

/// Embed blocks group under the owning selector: `.hero::before`
/// belongs to `.hero`, so a class's embed-routed rules (and any
/// stripped transition/animation declarations) land in one block.
fn embed_group_key(selector: &str) -> String {
    match selector::classify(selector) {
        SelectorKind::Class { name, .. } => format!(".{}", name),
        SelectorKind::Root => ":root".to_string(),
        SelectorKind::Tag { name } => name,
        SelectorKind::Complex => selector.to_string(),
    }
}

fn declaration_text(decls: &[Declaration]) -> String {
    decls
        .iter()
        .map(|d| format!("{}:{}", d.property, d.value))
        .collect::<Vec<_>>()
        .join(";")
}

fn append_text(slot: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !slot.is_empty() {
        slot.push(';');
    }
    slot.push_str(text);
}

/// Outcome of matching a media condition against the breakpoint table.
#[derive(Debug, PartialEq)]
enum BreakpointMatch {
    Bucket(VariantKey, f64),
    /// max-width above the widest bucket: merge into desktop base.
    DesktopBase,
    /// No usable max-width (min-width ranges, print, etc.).
    Unsupported,
}

/// Extract a `max-width` threshold in px from a serialized media
/// condition and bucket it. Conditions carrying `min-width` or no
/// pixel `max-width` at all cannot be represented as a variant.
fn snap_breakpoint(condition: &str) -> BreakpointMatch {
    if condition.contains("min-width") {
        return BreakpointMatch::Unsupported;
    }
    let Some(px) = extract_max_width_px(condition) else {
        return BreakpointMatch::Unsupported;
    };
    for (limit, key) in BREAKPOINTS {
        if px <= *limit {
            return BreakpointMatch::Bucket(*key, px);
        }
    }
    BreakpointMatch::DesktopBase
}

fn extract_max_width_px(condition: &str) -> Option<f64> {
    let at = condition.find("max-width")?;
    let tail = &condition[at + "max-width".len()..];
    let tail = tail.trim_start().strip_prefix(':')?.trim_start();
    let end = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    if !tail[end..].trim_start().starts_with("px") {
        return None;
    }
    tail[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::weave_css;
    use pretty_assertions::assert_eq;

    fn route_css(css: &str) -> Routed {
        let parsed = weave_css::parse_css(css).unwrap();
        let table = VariableTable::from_rules(&parsed.sheet.rules);
        route(&parsed.sheet.rules, &parsed.raw_at_rules, &table)
    }

    #[test]
    fn base_rule_goes_native() {
        let routed = route_css(".hero { color: red; }");
        assert_eq!(routed.native.len(), 1);
        assert_eq!(routed.native[0].name, "hero");
        assert!(routed.native[0].style_less.starts_with("color:"));
        assert!(routed.embeds.is_empty());
    }

    #[test]
    fn pseudo_element_never_reaches_native() {
        let routed = route_css(".hero { color: red; } .hero::before { content: \"\"; }");
        assert_eq!(routed.native.len(), 1);
        assert_eq!(routed.native[0].name, "hero");
        assert_eq!(routed.embeds.len(), 1);
        assert_eq!(routed.embeds[0].selector, ".hero");
        assert!(routed.embeds[0].css_text.contains("::before"));
        assert!(routed.embeds[0].css_text.contains("content"));
    }

    #[test]
    fn hover_merges_as_variant() {
        let routed = route_css(".btn { color: red; } .btn:hover { color: blue; }");
        assert_eq!(routed.native.len(), 1);
        let hover = routed.native[0].variants.get("hover").unwrap();
        assert!(hover.starts_with("color:"));
    }

    #[test]
    fn media_768_snaps_to_medium() {
        let routed = route_css("@media (max-width: 768px) { .card { padding: 8px; } }");
        assert_eq!(routed.native.len(), 1);
        let medium = routed.native[0].variants.get("medium").unwrap();
        assert_eq!(medium, "padding:8px");
        assert!(routed
            .warnings
            .iter()
            .any(|w| w.contains("snapped")), "warnings: {:?}", routed.warnings);
    }

    #[test]
    fn exact_767_is_small_without_snap_warning() {
        let routed = route_css("@media (max-width: 767px) { .card { padding: 8px; } }");
        assert_eq!(
            routed.native[0].variants.get("small").map(|s| s.as_str()),
            Some("padding:8px")
        );
        assert!(routed.warnings.is_empty());
    }

    #[test]
    fn wide_max_width_merges_into_base() {
        let routed = route_css("@media (max-width: 1200px) { .card { padding: 8px; } }");
        assert_eq!(routed.native[0].style_less, "padding:8px");
        assert!(routed.native[0].variants.is_empty());
    }

    #[test]
    fn min_width_range_goes_to_embed() {
        let routed =
            route_css("@media (min-width: 480px) and (max-width: 767px) { .card { padding: 8px; } }");
        assert!(routed.native.is_empty());
        assert_eq!(routed.embeds.len(), 1);
        assert!(routed.embeds[0].css_text.contains("@media"));
    }

    #[test]
    fn descendant_selector_goes_to_embed() {
        let routed = route_css(".nav .item { color: red; }");
        assert!(routed.native.is_empty());
        assert_eq!(routed.embeds.len(), 1);
    }

    #[test]
    fn motion_stripped_from_native_kept_in_embed_when_present() {
        // .a::after groups under .a, so the stripped transition rides
        // along in that embed block.
        let routed = route_css(
            ".a { color: red; transition: all 0.3s; } .a::after { content: \"\"; }",
        );
        assert!(!routed.native[0].style_less.contains("transition"));
        assert_eq!(routed.embeds.len(), 1);
        assert_eq!(routed.embeds[0].selector, ".a");
        assert!(routed.embeds[0].css_text.contains("transition"));

        // No embed output for .b anywhere: the declaration is dropped.
        let routed = route_css(".b { transition: all 0.3s; color: red; }");
        assert!(!routed.native[0].style_less.contains("transition"));
        assert!(routed.embeds.is_empty());
    }

    #[test]
    fn snapped_variant_keys_only() {
        let routed = route_css(
            ".x { color: red; } .x:hover { color: blue; } @media (max-width: 479px) { .x { margin: 0; } }",
        );
        let keys: Vec<&str> = routed.native[0]
            .variants
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["hover", "tiny"]);
    }
}
