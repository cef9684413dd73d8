//! Decodes the limited FHIRPath subset allowed inside a `forEach` /
//! `forEachOrNull` string: a dotted member chain, an optional trailing
//! `[n]` index, and an optional trailing `.where(...)` predicate.
//!
//! This is deliberately not a general FHIRPath parse: `forEach` strings are
//! restricted to plain member access plus the one trailing predicate, so a
//! dedicated small parser avoids round-tripping through the full grammar.

use crate::error::Error;
use crate::view_definition::known_foreach_array_fields;

/// A single segment of a decoded `forEach` path.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachSegment {
    /// The JSON path text this segment contributes, e.g. `"telecom"` or
    /// `"telecom[0]"` when an index has been distributed onto it.
    pub name: String,
    /// Whether this segment names a known FHIR array field and therefore
    /// marks a boundary where a new `OPENJSON` hop must open.
    pub is_array: bool,
}

/// The trailing predicate peeled off a `forEach` path, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    /// The literal string `"false"`, short-circuited to `1 = 0` rather
    /// than compiled through the FHIRPath visitor.
    False,
    /// A FHIRPath predicate to be lowered with a synthetic
    /// `iterationContext = "value"` (the `OPENJSON` default column).
    Expr(String),
}

/// The decoded form of a `forEach`/`forEachOrNull` string.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachPath {
    pub segments: Vec<ForEachSegment>,
    /// Retained separately when the path is a single segment carrying a
    /// trailing `[n]`: rendered as `WHERE [key] = 'n'` on the sole hop
    /// rather than embedded in the JSON path text.
    pub single_segment_index: Option<String>,
    pub where_condition: Option<WhereCondition>,
}

/// Parse a raw `forEach`/`forEachOrNull` string into its decoded form.
pub fn parse_foreach_path(raw: &str) -> Result<ForEachPath, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(
            "forEach/forEachOrNull path must not be empty".to_string(),
        ));
    }

    let (body, where_condition) = peel_where_tail(trimmed);
    let (body, trailing_index) = split_trailing_index(body);

    let raw_segments: Vec<&str> = body.split('.').filter(|s| !s.is_empty()).collect();
    if raw_segments.is_empty() {
        return Err(Error::Validation(format!(
            "forEach path \"{raw}\" has no member segments"
        )));
    }

    let multi_segment = raw_segments.len() > 1;
    let known = known_foreach_array_fields();
    let mut segments = Vec::with_capacity(raw_segments.len());
    for seg in &raw_segments {
        let is_array = known.contains(seg);
        let name = match (&trailing_index, multi_segment, is_array) {
            (Some(idx), true, true) => format!("{seg}[{idx}]"),
            _ => seg.to_string(),
        };
        segments.push(ForEachSegment { name, is_array });
    }

    let single_segment_index = if multi_segment { None } else { trailing_index };

    Ok(ForEachPath {
        segments,
        single_segment_index,
        where_condition,
    })
}

/// Peel a trailing `.where(...)` call off `s`, matching parentheses by
/// depth so a predicate containing nested calls is not mis-split.
fn peel_where_tail(s: &str) -> (&str, Option<WhereCondition>) {
    if !s.ends_with(')') {
        return (s, None);
    }
    let mut depth = 0i32;
    let mut open_idx = None;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth -= 1;
                if depth == 0 {
                    open_idx = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(open_idx) = open_idx else {
        return (s, None);
    };
    let prefix = &s[..open_idx];
    let Some(base) = prefix.strip_suffix(".where") else {
        return (s, None);
    };
    let cond = &s[open_idx + 1..s.len() - 1];
    let condition = if cond.trim() == "false" {
        WhereCondition::False
    } else {
        WhereCondition::Expr(cond.to_string())
    };
    (base, Some(condition))
}

/// Split a trailing numeric `[n]` index off `s`.
fn split_trailing_index(s: &str) -> (&str, Option<String>) {
    if let Some(stripped) = s.strip_suffix(']') {
        if let Some(pos) = stripped.rfind('[') {
            let idx = &stripped[pos + 1..];
            if !idx.is_empty() && idx.chars().all(|c| c.is_ascii_digit()) {
                return (&s[..pos], Some(idx.to_string()));
            }
        }
    }
    (s, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_segment() {
        let p = parse_foreach_path("name").unwrap();
        assert_eq!(p.segments, vec![ForEachSegment { name: "name".into(), is_array: true }]);
        assert_eq!(p.single_segment_index, None);
        assert_eq!(p.where_condition, None);
    }

    #[test]
    fn distributes_index_across_multi_segment_array_fields() {
        let p = parse_foreach_path("contact.telecom[0]").unwrap();
        assert_eq!(
            p.segments,
            vec![
                ForEachSegment { name: "contact[0]".into(), is_array: true },
                ForEachSegment { name: "telecom[0]".into(), is_array: true },
            ]
        );
        assert_eq!(p.single_segment_index, None);
    }

    #[test]
    fn retains_single_segment_index_separately() {
        let p = parse_foreach_path("name[0]").unwrap();
        assert_eq!(p.segments, vec![ForEachSegment { name: "name".into(), is_array: true }]);
        assert_eq!(p.single_segment_index, Some("0".to_string()));
    }

    #[test]
    fn peels_where_tail_and_compiles_later() {
        let p = parse_foreach_path("telecom.where(system = 'phone')").unwrap();
        assert_eq!(p.segments, vec![ForEachSegment { name: "telecom".into(), is_array: true }]);
        assert_eq!(
            p.where_condition,
            Some(WhereCondition::Expr("system = 'phone'".to_string()))
        );
    }

    #[test]
    fn short_circuits_false_predicate() {
        let p = parse_foreach_path("telecom.where(false)").unwrap();
        assert_eq!(p.where_condition, Some(WhereCondition::False));
    }

    #[test]
    fn non_array_field_does_not_open_new_hop_boundary() {
        let p = parse_foreach_path("contact.name").unwrap();
        assert_eq!(
            p.segments,
            vec![
                ForEachSegment { name: "contact".into(), is_array: true },
                ForEachSegment { name: "name".into(), is_array: true },
            ]
        );
    }
}
