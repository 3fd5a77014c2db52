use std::sync::OnceLock;

use regex::Regex;

/// Name the owning event is bound to inside compiled expressions.
pub const EVENT_BINDING: &str = "__ev";
pub const VARIABLES_BINDING: &str = "__vars";
pub const SWITCHES_BINDING: &str = "__switches";
pub const SELF_SWITCHES_BINDING: &str = "__self_switches";

// Longest prefix first: `switches.value(` is a suffix of the self switch form.
const INDEXED_READS: [(&str, &str); 3] = [
    ("self_switches.value(", SELF_SWITCHES_BINDING),
    ("variables.value(", VARIABLES_BINDING),
    ("switches.value(", SWITCHES_BINDING),
];

/// Rewrites host accessor calls into direct indexed storage reads and binds
/// `this.` to the explicit event parameter.
///
/// `variables.value(i)` becomes `__vars[i]`, `switches.value(i)` becomes
/// `__switches[i]` and `self_switches.value(k)` becomes `__self_switches[k]`.
/// Index expressions may nest further accessors. An accessor without a
/// matching `)` is left as written.
pub fn rewrite_expression(source: &str) -> String {
    let bound = self_token_regex().replace_all(source, |captures: &regex::Captures<'_>| {
        format!("{}{}.", &captures[1], EVENT_BINDING)
    });
    rewrite_indexed_reads(&bound)
}

fn rewrite_indexed_reads(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut copied = 0usize;
    let mut cursor = 0usize;

    while let Some(ch) = source[cursor..].chars().next() {
        let left = source[..cursor].chars().next_back();
        let matched = if is_left_boundary(left) {
            INDEXED_READS
                .iter()
                .find(|(prefix, _)| source[cursor..].starts_with(prefix))
        } else {
            None
        };

        if let Some((prefix, binding)) = matched {
            let inner_start = cursor + prefix.len();
            if let Some(close) = find_matching_paren(source, inner_start) {
                out.push_str(&source[copied..cursor]);
                out.push_str(binding);
                out.push('[');
                out.push_str(&rewrite_indexed_reads(&source[inner_start..close]));
                out.push(']');
                cursor = close + 1;
                copied = cursor;
                continue;
            }
        }

        cursor += ch.len_utf8();
    }

    out.push_str(&source[copied..]);
    out
}

/// Byte offset of the `)` closing a group whose `(` sits just before `start`.
fn find_matching_paren(source: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, ch) in source[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn self_token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(^|[^A-Za-z0-9_$.])this\.").expect("self token regex"))
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '$' || ch == '_'
}

fn is_left_boundary(left: Option<char>) -> bool {
    match left {
        None => true,
        Some(ch) => !is_identifier_char(ch) && ch != '.',
    }
}
