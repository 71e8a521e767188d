//! Selector shape classification.
//!
//! The style router only needs to know which of a handful of shapes a
//! selector takes; everything outside those shapes is embed-routed.
//! The scanner walks the selector text once with a peekable char
//! iterator, the same way the compound-selector parsing works in the
//! matcher this was derived from.

/// Pseudo suffix attached to a class selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pseudo {
    /// `:hover`, `:focus`, ... (name without the colon)
    Class(String),
    /// `::before`, `::after`, ... (name without the colons). Legacy
    /// single-colon spellings of the CSS2 pseudo-elements classify
    /// here too.
    Element(String),
}

/// The selector shapes the router distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorKind {
    /// `:root`, the custom-property source block.
    Root,
    /// A single class selector with at most one pseudo suffix.
    Class { name: String, pseudo: Option<Pseudo> },
    /// A bare tag selector, e.g. `html`, `p`.
    Tag { name: String },
    /// Anything else: combinator chains, attribute selectors, ids,
    /// multiple classes or pseudos, `*`. Always embed-routed.
    Complex,
}

/// Pseudo-element names that may appear with a single leading colon.
const LEGACY_PSEUDO_ELEMENTS: &[&str] = &[
    "before",
    "after",
    "first-line",
    "first-letter",
    "selection",
    "placeholder",
];

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

/// Classify one selector string. Never fails: unrecognized shapes are
/// `Complex`, which downstream means "preserve via embed".
pub fn classify(selector: &str) -> SelectorKind {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return SelectorKind::Complex;
    }
    if trimmed == ":root" {
        return SelectorKind::Root;
    }

    let mut chars = trimmed.chars().peekable();
    let mut buffer = String::new();

    match chars.peek() {
        Some('.') => {
            chars.next();
            while let Some(&ch) = chars.peek() {
                if !is_ident_char(ch) {
                    break;
                }
                buffer.push(ch);
                chars.next();
            }
            if buffer.is_empty() {
                return SelectorKind::Complex;
            }
            let name = buffer;
            match chars.peek() {
                None => SelectorKind::Class { name, pseudo: None },
                Some(':') => match parse_pseudo_suffix(&mut chars) {
                    Some(pseudo) => SelectorKind::Class {
                        name,
                        pseudo: Some(pseudo),
                    },
                    None => SelectorKind::Complex,
                },
                // '.x.y', '.x > y', '.x[attr]', '.x#id' and friends.
                Some(_) => SelectorKind::Complex,
            }
        }
        Some(ch) if ch.is_alphabetic() => {
            while let Some(&ch) = chars.peek() {
                if !is_ident_char(ch) {
                    break;
                }
                buffer.push(ch);
                chars.next();
            }
            if chars.peek().is_none() {
                SelectorKind::Tag { name: buffer }
            } else {
                SelectorKind::Complex
            }
        }
        _ => SelectorKind::Complex,
    }
}

/// Parse a trailing pseudo suffix starting at the first ':'. Returns
/// `None` when more than one pseudo follows or trailing junk remains,
/// which the caller treats as a complex shape.
fn parse_pseudo_suffix(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<Pseudo> {
    chars.next(); // first ':'
    let element_form = matches!(chars.peek(), Some(':'));
    if element_form {
        chars.next();
    }

    let mut name = String::new();
    while let Some(&ch) = chars.peek() {
        if !is_ident_char(ch) {
            break;
        }
        name.push(ch);
        chars.next();
    }
    if name.is_empty() || chars.peek().is_some() {
        // A second pseudo, functional arguments, or a combinator tail.
        return None;
    }

    if element_form || LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
        Some(Pseudo::Element(name))
    } else {
        Some(Pseudo::Class(name))
    }
}
