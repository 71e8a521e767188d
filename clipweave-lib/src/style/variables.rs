//! Custom-property resolution.
//!
//! The table flattens every `--name: value` declaration found in
//! `:root` / `html` blocks, last write wins (cascade-unaware).
//! `resolve` substitutes `var(--name[, fallback])` references
//! recursively with a fixed iteration cap so cyclic definitions
//! terminate with a warning instead of looping.

use crate::style::rules::CssRule;
use std::collections::HashMap;

/// Maximum substitution passes before giving up on a value.
const MAX_RESOLVE_PASSES: usize = 10;

#[derive(Debug, Default)]
pub struct VariableTable {
    map: HashMap<String, String>,
}

impl VariableTable {
    /// Build the table from all `:root` / `html` blocks in the rule
    /// list. A name declared twice keeps its last value.
    pub fn from_rules(rules: &[CssRule]) -> Self {
        let mut map = HashMap::new();
        for rule in rules {
            let selector = rule.selector.trim();
            if selector != ":root" && selector != "html" {
                continue;
            }
            for decl in &rule.declarations {
                if let Some(stripped) = decl.property.strip_prefix("--") {
                    map.insert(stripped.to_string(), decl.value.trim().to_string());
                }
            }
        }
        VariableTable { map }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Result of resolving one declaration value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: String,
    pub warnings: Vec<String>,
}

/// Replace every `var(--name[, fallback])` occurrence in `value`.
///
/// A reference with no table entry takes its fallback; with neither,
/// the literal `var(...)` token stays in place and an "unresolved"
/// warning is recorded. Resolution repeats while substitutions keep
/// happening, capped at [`MAX_RESOLVE_PASSES`]; hitting the cap keeps
/// the partially-resolved value and warns.
pub fn resolve(value: &str, table: &VariableTable) -> Resolved {
    let mut current = value.to_string();
    let mut warnings = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();

    for pass in 0..=MAX_RESOLVE_PASSES {
        if !current.contains("var(") {
            break;
        }
        if pass == MAX_RESOLVE_PASSES {
            warnings.push(format!(
                "variable resolution did not settle after {} passes (cyclic var()?): {}",
                MAX_RESOLVE_PASSES, value
            ));
            break;
        }
        let (next, changed) = substitute_once(&current, table, &mut unresolved);
        if !changed {
            break;
        }
        current = next;
    }

    unresolved.sort();
    unresolved.dedup();
    for name in unresolved {
        warnings.push(format!("unresolved css variable --{}", name));
    }

    Resolved {
        value: current,
        warnings,
    }
}

/// One left-to-right substitution pass. Returns the rewritten value and
/// whether anything changed. Unresolvable references are copied through
/// verbatim and their names recorded.
fn substitute_once(
    value: &str,
    table: &VariableTable,
    unresolved: &mut Vec<String>,
) -> (String, bool) {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    let mut changed = false;
    let mut i = 0;

    while i < bytes.len() {
        if value[i..].starts_with("var(") && !prev_is_ident(bytes, i) {
            if let Some((name, fallback, end)) = parse_var_call(value, i) {
                if let Some(resolved) = table.get(&name) {
                    out.push_str(resolved);
                    changed = true;
                } else if let Some(fb) = fallback {
                    out.push_str(fb.trim());
                    changed = true;
                } else {
                    // Leave the literal token; signal for warnings.
                    out.push_str(&value[i..end]);
                    unresolved.push(name);
                }
                i = end;
                continue;
            }
        }
        let ch = value[i..].chars().next().unwrap_or('\0');
        out.push(ch);
        i += ch.len_utf8();
    }

    (out, changed)
}

fn prev_is_ident(bytes: &[u8], pos: usize) -> bool {
    if pos == 0 {
        return false;
    }
    let prev = bytes[pos - 1] as char;
    prev.is_alphanumeric() || prev == '-' || prev == '_'
}

/// Parse a `var(...)` call starting at `start`. Returns
/// `(name-without-dashes, fallback, end-index-past-close-paren)`.
/// Fallbacks may themselves contain balanced parentheses.
fn parse_var_call(value: &str, start: usize) -> Option<(String, Option<&str>, usize)> {
    let inner_start = start + "var(".len();
    let mut depth = 1usize;
    let mut split = None; // first top-level comma
    let mut end = None;

    for (offset, ch) in value[inner_start..].char_indices() {
        let pos = inner_start + offset;
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(pos);
                    break;
                }
            }
            ',' if depth == 1 && split.is_none() => split = Some(pos),
            _ => {}
        }
    }

    let end = end?;
    let (raw_name, fallback) = match split {
        Some(comma) => (&value[inner_start..comma], Some(&value[comma + 1..end])),
        None => (&value[inner_start..end], None),
    };
    let name = raw_name.trim().strip_prefix("--")?.to_string();
    Some((name, fallback, end + 1))
}
