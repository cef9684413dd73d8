//! Repeat Processor: compiles a `repeat[]` select into a recursive CTE that
//! walks a tree-shaped FHIR structure (e.g. `Questionnaire.item`,
//! `List.entry.item`) to an unbounded — but depth-capped — depth.

use crate::combination::ResolvedSelect;
use crate::error::Error;

/// A compiled `repeat_<n>` recursive CTE: its name, and everything that
/// follows it — the column list and the `AS (anchor UNION ALL arms)` body.
pub struct RepeatCte {
    pub name: String,
    pub body: String,
}

/// Build the recursive CTE for a `repeat[]` select.
///
/// The anchor member seeds from `repeat[0]` only; one `UNION ALL` arm is
/// emitted per entry in `repeat[]`, each hopping through every dotted
/// segment of its path (unlike the forEach processor, every segment opens a
/// new `CROSS APPLY` here — the specification does not carve out an
/// array-field exception for `repeat` paths). `depth` starts at `0` and is
/// capped by `@max_recursion` in every recursive arm's `WHERE`.
pub fn build_repeat_cte(
    select: &ResolvedSelect,
    name: impl Into<String>,
    table_ref: &str,
) -> Result<RepeatCte, Error> {
    if select.repeat.is_empty() {
        return Err(Error::Internal(
            "build_repeat_cte called on a select with no repeat paths".to_string(),
        ));
    }
    let name = name.into();

    let anchor_path = &select.repeat[0];
    let anchor = format!(
        "SELECT r.id AS resource_id, anchor.value AS item_json, 0 AS depth \
         FROM {table_ref} AS r \
         CROSS APPLY OPENJSON(r.json, '$.{anchor_path}') AS anchor \
         WHERE r.resource_type = @resourceType"
    );

    let mut arms = Vec::with_capacity(select.repeat.len());
    for (arm_idx, path) in select.repeat.iter().enumerate() {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(Error::Validation(format!(
                "repeat path \"{path}\" has no member segments"
            )));
        }

        let mut from_clauses = Vec::with_capacity(segments.len());
        let mut src = format!("{name}.item_json");
        let mut last_alias = String::new();
        for (seg_idx, segment) in segments.iter().enumerate() {
            let alias = if seg_idx + 1 == segments.len() {
                format!("arm{arm_idx}")
            } else {
                format!("arm{arm_idx}_hop{seg_idx}")
            };
            from_clauses.push(format!(
                "CROSS APPLY OPENJSON({src}, '$.{segment}') AS {alias}"
            ));
            src = format!("{alias}.value");
            last_alias = alias;
        }

        arms.push(format!(
            "SELECT {name}.resource_id, {last_alias}.value AS item_json, {name}.depth + 1 AS depth \
             FROM {name} \
             {from} \
             WHERE {name}.depth < @maxRecursion",
            from = from_clauses.join(" ")
        ));
    }

    let body = format!(
        "(resource_id, item_json, depth) AS ({anchor} UNION ALL {recursive})",
        anchor = anchor,
        recursive = arms.join(" UNION ALL "),
    );

    Ok(RepeatCte { name, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_definition::Column;

    fn select_with_repeat(paths: &[&str]) -> ResolvedSelect {
        ResolvedSelect {
            column: vec![Column {
                name: "linkId".to_string(),
                path: "linkId".to_string(),
                collection: None,
                col_type: Some("string".to_string()),
                description: None,
                tag: Vec::new(),
            }],
            nested: Vec::new(),
            for_each: None,
            for_each_or_null: None,
            repeat: paths.iter().map(|s| s.to_string()).collect(),
            where_: Vec::new(),
            union_choice: -1,
        }
    }

    #[test]
    fn anchor_seeds_only_from_first_repeat_path() {
        let select = select_with_repeat(&["item", "answer.item"]);
        let cte = build_repeat_cte(&select, "repeat_0", "[dbo].[fhir_resources]").unwrap();
        assert_eq!(cte.name, "repeat_0");
        assert!(cte.body.contains("OPENJSON(r.json, '$.item') AS anchor"));
        assert!(!cte.body.contains("'$.answer'"));
    }

    #[test]
    fn emits_one_union_all_arm_per_repeat_path() {
        let select = select_with_repeat(&["item", "answer.item"]);
        let cte = build_repeat_cte(&select, "repeat_0", "[dbo].[fhir_resources]").unwrap();
        assert_eq!(cte.body.matches("UNION ALL").count(), 2);
    }

    #[test]
    fn multi_segment_arm_hops_every_segment() {
        let select = select_with_repeat(&["item", "answer.item"]);
        let cte = build_repeat_cte(&select, "repeat_0", "[dbo].[fhir_resources]").unwrap();
        assert!(cte
            .body
            .contains("CROSS APPLY OPENJSON(repeat_0.item_json, '$.answer') AS arm1_hop0"));
        assert!(cte
            .body
            .contains("CROSS APPLY OPENJSON(arm1_hop0.value, '$.item') AS arm1"));
    }

    #[test]
    fn depth_guard_present_in_every_recursive_arm() {
        let select = select_with_repeat(&["item", "answer.item"]);
        let cte = build_repeat_cte(&select, "repeat_0", "[dbo].[fhir_resources]").unwrap();
        assert_eq!(cte.body.matches("depth < @maxRecursion").count(), 2);
    }
}
