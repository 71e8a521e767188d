//! CSS rule extraction via lightningcss.
//!
//! Parses a raw CSS string into the fully-owned flat rule model in
//! `rules.rs`. One level of `@media` nesting is flattened with the
//! serialized media condition retained on each contained rule. At-rules
//! the target format cannot represent (`@font-face`, `@keyframes`,
//! unknown at-rules, nested non-style media content) are serialized
//! verbatim so the router can send them to the embed escape hatch;
//! nothing is silently discarded.

use crate::style::rules::{CssRule, Declaration, OwnedStylesheet};
use lightningcss::error::{Error as LcssError, ParserError};
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::{style::StyleRule, CssRule as LcssRule};
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;
use std::sync::{Arc, RwLock};

/// Outcome of parsing one CSS input.
#[derive(Debug, Default)]
pub struct ParsedCss {
    pub sheet: OwnedStylesheet,
    /// At-rule blocks serialized verbatim; always embed-routed.
    pub raw_at_rules: Vec<String>,
    /// Recovered parse errors, surfaced as warnings downstream.
    pub warnings: Vec<String>,
}

/// Parse a raw CSS string and convert it to owned flat rules.
///
/// Parse errors are recovered (the offending rule is skipped and
/// reported as a warning) rather than failing the whole sheet; only a
/// completely unparseable input returns `Err`.
pub fn parse_css(css_text: &str) -> Result<ParsedCss, String> {
    let warnings: Arc<RwLock<Vec<LcssError<ParserError>>>> = Arc::new(RwLock::new(Vec::new()));
    let parser_opts = ParserOptions {
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };

    let sheet = LightningStyleSheet::parse(css_text, parser_opts)
        .map_err(|e: LcssError<ParserError<'_>>| e.to_string())?;

    let mut parsed = ParsedCss::default();

    for rule in &sheet.rules.0 {
        match rule {
            LcssRule::Style(style_rule) => {
                convert_style_rule(style_rule, None, &mut parsed.sheet.rules);
            }
            LcssRule::Media(media_rule) => {
                // One level of @media nesting is flattened; the
                // serialized condition travels with each inner rule.
                let condition = media_rule
                    .query
                    .to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                for inner_rule in &media_rule.rules.0 {
                    if let LcssRule::Style(sr) = inner_rule {
                        convert_style_rule(sr, Some(condition.clone()), &mut parsed.sheet.rules);
                    } else if let Ok(raw) = inner_rule.to_css_string(PrinterOptions::default()) {
                        parsed
                            .raw_at_rules
                            .push(format!("@media {} {{ {} }}", condition, raw));
                    }
                }
            }
            LcssRule::Ignored => {}
            other => {
                // @font-face, @keyframes, @supports, unknown at-rules:
                // keep verbatim for the embed escape hatch.
                if let Ok(raw) = other.to_css_string(PrinterOptions::default()) {
                    if !raw.is_empty() {
                        parsed.raw_at_rules.push(raw);
                    }
                }
            }
        }
    }

    if let Ok(recovered) = warnings.read() {
        for err in recovered.iter() {
            parsed.warnings.push(format!("css parse: {}", err));
        }
    }

    Ok(parsed)
}

/// Copy a single StyleRule's selectors + declarations into owned rules,
/// one `CssRule` per selector so routing stays per-selector.
fn convert_style_rule<'a>(
    style_rule: &StyleRule<'a>,
    media_condition: Option<String>,
    out: &mut Vec<CssRule>,
) {
    let mut selectors_vec = Vec::new();
    for selector in &style_rule.selectors.0 {
        if let Ok(sel_str) = selector.to_css_string(Default::default()) {
            selectors_vec.push(sel_str);
        }
    }

    let block = &style_rule.declarations;

    // Normal + !important declarations combined, source order kept
    // within each group. The target format has no importance concept,
    // so the flattening is cascade-unaware by design.
    let mut decls_vec = Vec::new();
    for property in block.declarations.iter().chain(&block.important_declarations) {
        let property_name = property.property_id().name().to_string();
        let Ok(property_value) = property.value_to_css_string(PrinterOptions::default()) else {
            continue;
        };
        decls_vec.push(Declaration {
            property: property_name,
            value: property_value,
        });
    }

    for selector in selectors_vec {
        out.push(CssRule {
            selector,
            declarations: decls_vec.clone(),
            media_condition: media_condition.clone(),
        });
    }
}
