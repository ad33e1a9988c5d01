//! Coercion rules for schema-less record values
//!
//! Query parameters always arrive as strings while record fields hold any
//! JSON value. Every comparison the query pipeline makes goes through this
//! module so that filtering, sorting and embedding agree on one contract:
//!
//! - **Numeric first**: if both sides are numeric (a JSON number, or a string
//!   that parses as a finite number) they compare by value.
//! - **Text otherwise**: both sides are rendered with [`value_text`] and
//!   compared as strings.
//! - **Missing fields** never equal anything and fail every ordering check.
//! - **Null** renders as the text `null`, so `?x=null` matches a JSON `null`
//!   field. Plain JavaScript `==` would not equate `null` with `"null"`.

use std::cmp::Ordering;

use serde_json::Value;

/// Render a JSON value as the text used by loose comparisons.
///
/// Strings are returned verbatim, numbers the way JavaScript prints them
/// (`3`, not `3.0`; exponent form such as `1e+21` or `1.5e-7` outside
/// `[1e-6, 1e21)`), booleans and null by keyword, composites as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => format_f64(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_f64(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&f.abs()) {
        // Display is shortest round-trip without exponent and no trailing `.0`
        return f.to_string();
    }

    let text = format!("{:e}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// Parse a string as a finite number, ignoring surrounding whitespace.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric view of a value: JSON numbers and numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Loose equality between a record field and a query string.
pub fn loose_eq(field: Option<&Value>, query: &str) -> bool {
    match field {
        None => false,
        Some(value) => loose_cmp(value, query) == Ordering::Equal,
    }
}

/// Ordering between a present record field and a query string.
pub fn loose_cmp(value: &Value, query: &str) -> Ordering {
    match (as_number(value), parse_number(query)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => value_text(value).as_str().cmp(query),
    }
}

/// Strict equality used for embed keys: same JSON type and value, numbers
/// compared by value so `1` and `1.0` match. Two absent fields are equal.
pub fn strict_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Sort rank: numbers, then scalar text, then composites, then null/missing.
fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 3,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 2,
        Some(v) if as_number(v).is_some() => 0,
        Some(_) => 1,
    }
}

/// Total order over optional field values for `_sort`.
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (rank_a, rank_b) = (sort_rank(a), sort_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Some(x), Some(y)) if rank_a == 0 => match (as_number(x), as_number(y)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        (Some(x), Some(y)) if rank_a < 3 => value_text(x).cmp(&value_text(y)),
        _ => Ordering::Equal,
    }
}

/// Integer parsing with `parseInt` semantics: leading whitespace, optional
/// sign, then the longest run of decimal digits. `None` when no digit leads.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut seen = false;
    let mut acc: i64 = 0;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        acc = acc.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -acc } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ============================================================================
    // Text Rendering
    // ============================================================================

    #[test]
    fn test_value_text_scalars() {
        assert_eq!(value_text(&json!("abc")), "abc");
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&json!(3.0)), "3");
        assert_eq!(value_text(&json!(2.5)), "2.5");
        assert_eq!(value_text(&json!(true)), "true");
        assert_eq!(value_text(&Value::Null), "null");
    }

    #[test]
    fn test_value_text_float_exponents() {
        assert_eq!(value_text(&json!(1e20)), "100000000000000000000");
        assert_eq!(value_text(&json!(1e21)), "1e+21");
        assert_eq!(value_text(&json!(-2.5e30)), "-2.5e+30");
        assert_eq!(value_text(&json!(0.000001)), "0.000001");
        assert_eq!(value_text(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(value_text(&json!(-0.0)), "0");
    }

    #[test]
    fn test_loose_eq_large_float_and_null() {
        assert!(loose_cmp(&json!(1e21), "1e+21").is_eq());
        assert!(loose_eq(Some(&Value::Null), "null"));
    }

    #[test]
    fn test_value_text_composites() {
        assert_eq!(value_text(&json!([1, 2])), "[1,2]");
        assert_eq!(value_text(&json!({"a": 1})), r#"{"a":1}"#);
    }

    // ============================================================================
    // Loose Equality
    // ============================================================================

    #[test]
    fn test_loose_eq_number_and_string() {
        assert!(loose_eq(Some(&json!(5)), "5"));
        assert!(loose_eq(Some(&json!(5)), "5.0"));
        assert!(loose_eq(Some(&json!("5")), "5"));
        assert!(!loose_eq(Some(&json!(5)), "6"));
    }

    #[test]
    fn test_loose_eq_bool_by_text() {
        assert!(loose_eq(Some(&json!(true)), "true"));
        assert!(!loose_eq(Some(&json!(false)), "true"));
    }

    #[test]
    fn test_loose_eq_missing_field() {
        assert!(!loose_eq(None, "anything"));
        assert!(!loose_eq(None, ""));
    }

    // ============================================================================
    // Ordering
    // ============================================================================

    #[test]
    fn test_loose_cmp_numeric_not_lexicographic() {
        assert_eq!(loose_cmp(&json!(10), "9"), Ordering::Greater);
        assert_eq!(loose_cmp(&json!("10"), "9"), Ordering::Greater);
    }

    #[test]
    fn test_loose_cmp_falls_back_to_text() {
        assert_eq!(loose_cmp(&json!("apple"), "banana"), Ordering::Less);
        assert_eq!(loose_cmp(&json!(10), "abc"), Ordering::Less);
    }

    #[test]
    fn test_sort_cmp_ranks() {
        assert_eq!(sort_cmp(Some(&json!(100)), Some(&json!("a"))), Ordering::Less);
        assert_eq!(sort_cmp(Some(&json!("z")), Some(&json!([1]))), Ordering::Less);
        assert_eq!(sort_cmp(Some(&json!({})), None), Ordering::Less);
        assert_eq!(sort_cmp(None, Some(&Value::Null)), Ordering::Equal);
    }

    #[test]
    fn test_sort_cmp_within_rank() {
        assert_eq!(sort_cmp(Some(&json!(2)), Some(&json!("10"))), Ordering::Less);
        assert_eq!(sort_cmp(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(sort_cmp(Some(&json!(1)), Some(&json!(1.0))), Ordering::Equal);
    }

    // ============================================================================
    // Strict Equality
    // ============================================================================

    #[test]
    fn test_strict_eq() {
        assert!(strict_eq(Some(&json!(1)), Some(&json!(1.0))));
        assert!(!strict_eq(Some(&json!(1)), Some(&json!("1"))));
        assert!(strict_eq(None, None));
        assert!(!strict_eq(Some(&json!(1)), None));
    }

    // ============================================================================
    // parseInt
    // ============================================================================

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  7"), Some(7));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("+8"), Some(8));
        assert_eq!(parse_int("12abc"), Some(12));
        assert_eq!(parse_int("2.9"), Some(2));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }
}
