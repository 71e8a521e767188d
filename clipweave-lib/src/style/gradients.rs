//! Gradient and color canonicalization.
//!
//! Runs on declaration values that already went through variable
//! resolution. Percentage stops are rounded to whole percents and
//! `rgb()/rgba()/hsl()/hsla()` color tokens become `#rrggbb`. The
//! alpha channel is dropped in the conversion, a documented lossy
//! step. Hex and named colors pass through unchanged. Gradient kinds
//! the target may not render (`conic-*`, `repeating-*`) still pass
//! through normalized, with a warning.

/// Result of normalizing one declaration value.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: String,
    pub warnings: Vec<String>,
}

const COLOR_FUNCTIONS: &[&str] = &["rgba", "rgb", "hsla", "hsl"];

/// Normalize a declaration value. Values without a gradient function
/// pass through untouched.
pub fn normalize_value(value: &str) -> Normalized {
    if !value.contains("gradient(") {
        return Normalized {
            value: value.to_string(),
            warnings: Vec::new(),
        };
    }

    let mut warnings = Vec::new();
    if value.contains("conic-gradient(") {
        warnings.push("conic-gradient may not be fully supported by the target".to_string());
    }
    if value.contains("repeating-") {
        warnings.push("repeating gradients may not be fully supported by the target".to_string());
    }

    Normalized {
        value: rewrite_tokens(value),
        warnings,
    }
}

/// Single pass over the value: converts color function calls anywhere,
/// rounds percentages that sit directly inside the gradient's argument
/// list (depth 1). Percentages nested deeper, e.g. inside `calc()`,
/// stay verbatim.
fn rewrite_tokens(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut i = 0;
    let bytes = value.as_bytes();

    while i < bytes.len() {
        let rest = &value[i..];

        if !prev_is_ident(bytes, i) {
            if let Some((converted, consumed)) = try_convert_color(rest) {
                out.push_str(&converted);
                i += consumed;
                continue;
            }
        }

        let ch = rest.chars().next().unwrap_or('\0');
        if depth == 1 && (ch.is_ascii_digit() || (ch == '.' && next_is_digit(bytes, i + 1))) {
            let (token, consumed) = read_number(rest);
            if rest[consumed..].starts_with('%') {
                let rounded = token.parse::<f64>().map(|n| n.round()).unwrap_or(0.0);
                out.push_str(&format!("{}%", rounded as i64));
                i += consumed + 1;
            } else {
                out.push_str(&token);
                i += consumed;
            }
            continue;
        }

        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

fn prev_is_ident(bytes: &[u8], pos: usize) -> bool {
    if pos == 0 {
        return false;
    }
    let prev = bytes[pos - 1] as char;
    prev.is_alphanumeric() || prev == '-' || prev == '_'
}

fn next_is_digit(bytes: &[u8], pos: usize) -> bool {
    pos < bytes.len() && (bytes[pos] as char).is_ascii_digit()
}

fn read_number(rest: &str) -> (String, usize) {
    let mut token = String::new();
    for ch in rest.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            token.push(ch);
        } else {
            break;
        }
    }
    let len = token.len();
    (token, len)
}

/// If `rest` starts with a color function call, convert it. Returns the
/// hex form plus the number of bytes consumed. A call that fails to
/// parse is left for verbatim copy-through.
fn try_convert_color(rest: &str) -> Option<(String, usize)> {
    let name = COLOR_FUNCTIONS
        .iter()
        .find(|n| rest.starts_with(**n) && rest[n.len()..].starts_with('('))?;
    let inner_start = name.len() + 1;
    let close = find_balanced_close(rest, inner_start)?;
    let inner = &rest[inner_start..close];
    let hex = if name.starts_with("rgb") {
        rgb_to_hex(inner)?
    } else {
        hsl_to_hex(inner)?
    };
    Some((hex, close + 1))
}

fn find_balanced_close(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, ch) in text[from..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split color function arguments on commas, or on whitespace for the
/// modern space-separated syntax. A `/ alpha` suffix is split off
/// first; the alpha channel is dropped.
fn color_components(inner: &str) -> Vec<String> {
    let body = inner.split('/').next().unwrap_or(inner);
    let parts: Vec<String> = if body.contains(',') {
        body.split(',').map(|p| p.trim().to_string()).collect()
    } else {
        body.split_whitespace().map(|p| p.to_string()).collect()
    };
    parts
}

fn channel_to_u8(token: &str) -> Option<u8> {
    let token = token.trim();
    let value = if let Some(pct) = token.strip_suffix('%') {
        pct.trim().parse::<f64>().ok()? * 255.0 / 100.0
    } else {
        token.parse::<f64>().ok()?
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn rgb_to_hex(inner: &str) -> Option<String> {
    let parts = color_components(inner);
    if parts.len() < 3 {
        return None;
    }
    let r = channel_to_u8(&parts[0])?;
    let g = channel_to_u8(&parts[1])?;
    let b = channel_to_u8(&parts[2])?;
    Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
}

fn hsl_to_hex(inner: &str) -> Option<String> {
    let parts = color_components(inner);
    if parts.len() < 3 {
        return None;
    }
    let h = parts[0]
        .trim()
        .trim_end_matches("deg")
        .parse::<f64>()
        .ok()?
        .rem_euclid(360.0);
    let s = parts[1].trim().strip_suffix('%')?.parse::<f64>().ok()? / 100.0;
    let l = parts[2].trim().strip_suffix('%')?.parse::<f64>().ok()? / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r1, g1, b1) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(format!(
        "#{:02x}{:02x}{:02x}",
        to_byte(r1),
        to_byte(g1),
        to_byte(b1)
    ))
}
