use std::sync::OnceLock;

use regex::Regex;

static FIELD_REF_RE: OnceLock<Regex> = OnceLock::new();

/// Rewrite the small `field OP value` DSL into CloudWatch's native filter
/// pattern syntax: wrap the whole expression in `{ ... }` and prefix every
/// identifier that sits directly in front of a comparison or membership
/// operator with `$.`. The identifier must follow start-of-string,
/// whitespace, or `(` so operator text elsewhere is left alone.
///
/// This is a surface substitution, not a parser. Parenthesis balance,
/// operator validity, and value types are not checked.
pub fn translate(expr: Option<&str>) -> Option<String> {
    let expr = expr?;
    if expr.is_empty() {
        return None;
    }
    let re = FIELD_REF_RE
        .get_or_init(|| Regex::new(r"( |^|\()(\w+)\s?(=|!=|<|>|<=|>=| IS| NOT)").unwrap());
    Some(format!("{{ {} }}", re.replace_all(expr, "${1}$$.${2}${3}")))
}
