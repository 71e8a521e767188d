//! Embed CSS minification.
//!
//! Single-pass state machine over the raw text. Comments are removed,
//! whitespace runs outside string literals collapse to at most one
//! space, spaces around structural delimiters go away, and the space
//! after commas is dropped inside `rgb()`/`rgba()` calls. `calc()` and
//! `clamp()` bodies are copied verbatim, whitespace included: their
//! internal expression spacing is load-bearing for some parsers.
//! Minifying already-minified text returns the same string.

/// Paren contexts the pass distinguishes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParenContext {
    /// `rgb(` / `rgba(`, where comma spacing is tightened.
    Rgb,
    /// Any other function call or grouping paren.
    Other,
}

pub fn minify(css_text: &str) -> String {
    let chars: Vec<char> = css_text.chars().collect();
    let mut out = String::with_capacity(css_text.len());
    let mut stack: Vec<ParenContext> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        // Whitespace and comments both separate tokens; a run of
        // either collapses to at most one space, decided against the
        // first real character after the run.
        if ch.is_whitespace() || (ch == '/' && chars.get(i + 1) == Some(&'*')) {
            let j = skip_separators(&chars, i);
            if keep_space(out.chars().last(), chars.get(j).copied(), &stack) {
                out.push(' ');
            }
            i = j;
            continue;
        }

        // String literal: verbatim, escapes included.
        if ch == '"' || ch == '\'' {
            i = copy_string(&chars, i, &mut out);
            continue;
        }

        if ch == '(' {
            let name = trailing_ident(&out);
            if name.eq_ignore_ascii_case("calc") || name.eq_ignore_ascii_case("clamp") {
                i = copy_verbatim_call(&chars, i, &mut out);
                continue;
            }
            let context = if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba")
            {
                ParenContext::Rgb
            } else {
                ParenContext::Other
            };
            stack.push(context);
            out.push('(');
            i += 1;
            continue;
        }

        if ch == ')' {
            stack.pop();
        }

        out.push(ch);
        i += 1;
    }

    out
}

/// Whether a whitespace run between `prev` (last emitted char) and
/// `next` survives as a single space.
fn keep_space(prev: Option<char>, next: Option<char>, stack: &[ParenContext]) -> bool {
    let prev = match prev {
        Some(p) => p,
        None => return false, // leading whitespace
    };
    let next = match next {
        Some(n) => n,
        None => return false, // trailing whitespace
    };
    if matches!(prev, '{' | '}' | ';' | ':' | '(') {
        return false;
    }
    // A space before ':' can separate a descendant selector from a
    // pseudo (".a :hover"); dropping it would change meaning.
    if matches!(next, '{' | '}' | ';' | ',' | ')') {
        return false;
    }
    if prev == ',' {
        // Tightened at the sheet level and inside rgb()/rgba(); kept
        // inside other function calls.
        return !matches!(stack.last(), None | Some(ParenContext::Rgb));
    }
    true
}

/// Index past a run of consecutive whitespace and comments starting at
/// `start`.
fn skip_separators(chars: &[char], start: usize) -> usize {
    let mut i = start;
    loop {
        if i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        } else if chars.get(i) == Some(&'/') && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                i += 1;
            }
        } else {
            return i;
        }
    }
}

/// Copy a quoted string literal verbatim, returning the index past its
/// closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let ch = chars[i];
        out.push(ch);
        i += 1;
        if ch == '\\' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
            continue;
        }
        if ch == quote {
            break;
        }
    }
    i
}

/// Copy a balanced `(...)` call verbatim starting at the open paren.
fn copy_verbatim_call(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        let ch = chars[i];
        out.push(ch);
        i += 1;
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    i
}

/// The identifier immediately preceding the current output position.
fn trailing_ident(out: &str) -> String {
    out.chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_comments_and_whitespace() {
        let css = "/* header */\n.hero {\n  color: red;  /* loud */\n  margin: 0 auto;\n}\n";
        assert_eq!(minify(css), ".hero{color:red;margin:0 auto;}");
    }

    #[test]
    fn rgb_commas_tightened_calc_preserved() {
        let css = ".x { width: calc(100% - 20px); color: rgb(10, 20, 30); }";
        assert_eq!(
            minify(css),
            ".x{width:calc(100% - 20px);color:rgb(10,20,30);}"
        );
    }

    #[test]
    fn clamp_spacing_untouched() {
        let css = ".x { font-size: clamp(1rem, 2.5vw, 2rem); }";
        assert_eq!(minify(css), ".x{font-size:clamp(1rem, 2.5vw, 2rem);}");
    }

    #[test]
    fn other_function_commas_keep_one_space() {
        let css = ".x { transform: translate(10px,   20px); }";
        assert_eq!(minify(css), ".x{transform:translate(10px, 20px);}");
    }

    #[test]
    fn string_literals_verbatim() {
        let css = ".q::before { content: \"a  {b}  c\"; }";
        assert_eq!(minify(css), ".q::before{content:\"a  {b}  c\";}");
    }

    #[test]
    fn descendant_pseudo_space_survives() {
        let css = ".a :hover { color: red; }";
        assert_eq!(minify(css), ".a :hover{color:red;}");
    }

    #[test]
    fn selector_list_commas_tightened() {
        let css = ".a ,  .b { margin: 0; }";
        assert_eq!(minify(css), ".a,.b{margin:0;}");
    }

    #[test]
    fn comment_inside_value_leaves_one_space() {
        let css = ".x { margin: 0 /* c */ auto; }";
        let once = minify(css);
        assert_eq!(once, ".x{margin:0 auto;}");
        assert_eq!(minify(&once), once);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "/* c */ .hero { color: red; margin: 0 auto; }",
            ".x { margin: 0 /* c */ auto; }",
            ".x { color: red /* c */ ; }",
            ".x { width: calc(100% - 20px); color: rgba(1, 2, 3, 0.5); }",
            "@media (max-width: 767px) { .card { padding: 8px; } }",
            ".q::before { content: \"  { } ; \"; }",
            ".x { transform: translate(10px, 20px); }",
        ];
        for input in inputs {
            let once = minify(input);
            assert_eq!(minify(&once), once, "input {:?}", input);
        }
    }
}
