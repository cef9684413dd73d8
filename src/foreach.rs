//! ForEach Processor and Repeat Processor.
//!
//! Walks a [`ResolvedSelect`] tree (one [`crate::combination::PlanVariant`]),
//! assigning a `forEach_<n>` alias and `TranspilerContext` to every
//! iterating node, and builds the CROSS/OUTER APPLY text each needs — one
//! hop per array-flattening boundary, the final hop wrapped in a `WHERE`
//! when a trailing index or `.where(...)` predicate applies.

use crate::combination::ResolvedSelect;
use crate::error::Error;
use crate::fhirpath::ir::{self, SqlExpr};
use crate::fhirpath::{lower, TranspilerContext};
use crate::path_parser::{self, ForEachSegment, WhereCondition};

/// A resolved select paired with the context its own columns must be lowered
/// against, and its nested children in declared order.
pub struct SelectPlan<'a> {
    pub select: &'a ResolvedSelect,
    pub ctx: TranspilerContext,
    pub nested: Vec<SelectPlan<'a>>,
    /// `repeat_<n>` when this select carries `repeat[]`; its columns (and
    /// its nested selects') resolve against `<alias>.item_json`.
    pub repeat_alias: Option<String>,
}

/// The fully planned form of one plan variant: a context-annotated mirror of
/// its select tree, plus every `CROSS`/`OUTER APPLY` clause text the
/// iterators in it need, in final FROM-clause emission order.
pub struct VariantPlan<'a> {
    pub plans: Vec<SelectPlan<'a>>,
    pub applies: Vec<String>,
}

/// Plan every iterator in `variant`, rooted at `resource_alias`.
///
/// Top-level entries of `variant` are mutually independent (each reads
/// either from the resource row directly or from its own private subtree),
/// so their APPLY clauses are safe to reorder; per the specification's
/// reverse-declaration-order rule, they are emitted in reverse. Hops within
/// a single iterator's own chain, and a nested iterator's dependency on its
/// parent's alias, are never reordered — reversing those would reference an
/// alias before it is declared.
pub fn build_variant_plan<'a>(
    variant: &'a [ResolvedSelect],
    resource_alias: &str,
    base_ctx: &TranspilerContext,
    repeat_alias_prefix: &str,
) -> Result<VariantPlan<'a>, Error> {
    let mut counter = 0usize;
    let mut repeat_counter = 0usize;
    let mut groups = Vec::with_capacity(variant.len());
    for select in variant {
        let mut local_applies = Vec::new();
        let plan = plan_select(
            select,
            resource_alias,
            base_ctx,
            &mut counter,
            &mut repeat_counter,
            repeat_alias_prefix,
            &mut local_applies,
        )?;
        groups.push((plan, local_applies));
    }

    let mut applies = Vec::new();
    for (_, local) in groups.iter().rev() {
        applies.extend(local.iter().cloned());
    }
    let plans = groups.into_iter().map(|(p, _)| p).collect();

    Ok(VariantPlan { plans, applies })
}

#[allow(clippy::too_many_arguments)]
fn plan_select<'a>(
    select: &'a ResolvedSelect,
    resource_alias: &str,
    parent_ctx: &TranspilerContext,
    counter: &mut usize,
    repeat_counter: &mut usize,
    repeat_alias_prefix: &str,
    applies: &mut Vec<String>,
) -> Result<SelectPlan<'a>, Error> {
    let ctx = if select.iterates() {
        let idx = *counter;
        *counter += 1;
        build_iterator(select, idx, resource_alias, parent_ctx, applies)?
    } else {
        parent_ctx.clone()
    };

    let repeat_alias = if !select.repeat.is_empty() {
        Some(format!("{repeat_alias_prefix}repeat_{}", *repeat_counter))
    } else {
        None
    };
    *repeat_counter += repeat_alias.is_some() as usize;

    let ctx = match &repeat_alias {
        Some(alias) => ctx.with_iteration_context(SqlExpr::raw(format!("{alias}.item_json"))),
        None => ctx,
    };

    let mut nested = Vec::with_capacity(select.nested.len());
    for child in &select.nested {
        nested.push(plan_select(
            child,
            resource_alias,
            &ctx,
            counter,
            repeat_counter,
            repeat_alias_prefix,
            applies,
        )?);
    }

    Ok(SelectPlan { select, ctx, nested, repeat_alias })
}

/// Build one iterator's APPLY chain, appending its hop clauses to `applies`
/// and returning the context its own columns (and any deeper iterators
/// nested under it) must lower against.
fn build_iterator(
    select: &ResolvedSelect,
    idx: usize,
    resource_alias: &str,
    parent_ctx: &TranspilerContext,
    applies: &mut Vec<String>,
) -> Result<TranspilerContext, Error> {
    let (raw_path, is_nullable) = match (&select.for_each, &select.for_each_or_null) {
        (Some(p), None) => (p.as_str(), false),
        (None, Some(p)) => (p.as_str(), true),
        _ => {
            return Err(Error::Internal(
                "build_iterator called on a non-iterating select".to_string(),
            ))
        }
    };
    let join_kw = if is_nullable { "OUTER APPLY" } else { "CROSS APPLY" };

    let parsed = path_parser::parse_foreach_path(raw_path)?;
    let hops = group_hops(&parsed.segments);
    let alias = format!("forEach_{idx}");
    tracing::trace!(alias = %alias, path = raw_path, nullable = is_nullable, "allocated forEach alias");

    let mut src = parent_ctx
        .iteration_context
        .clone()
        .map(|e| e.render())
        .unwrap_or_else(|| format!("{resource_alias}.json"));

    for (hop_idx, hop_segments) in hops.iter().enumerate() {
        let is_last = hop_idx == hops.len() - 1;
        let hop_alias = if is_last {
            alias.clone()
        } else {
            format!("{alias}_hop{hop_idx}")
        };
        let path_text = hop_segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".");

        let clause = if is_last {
            build_final_hop(&src, &path_text, &parsed, &hop_alias, join_kw, parent_ctx)?
        } else {
            format!("{join_kw} OPENJSON({src}, '$.{path_text}') AS {hop_alias}")
        };
        applies.push(clause);
        src = format!("{hop_alias}.value");
    }

    Ok(parent_ctx.with_iteration_context(SqlExpr::raw(format!("{alias}.value"))))
}

/// Render the final hop of an iterator's chain, wrapping it as a filtered
/// derived table when a trailing `[n]` index or `.where(...)` predicate
/// applies to it.
fn build_final_hop(
    src: &str,
    path_text: &str,
    parsed: &path_parser::ForEachPath,
    alias: &str,
    join_kw: &str,
    base_ctx: &TranspilerContext,
) -> Result<String, Error> {
    let mut predicate: Option<String> = parsed
        .single_segment_index
        .as_ref()
        .map(|idx| format!("[key] = '{idx}'"));

    if let Some(cond) = &parsed.where_condition {
        let cond_sql = match cond {
            WhereCondition::False => "1 = 0".to_string(),
            WhereCondition::Expr(expr) => {
                let item_ctx = base_ctx.with_iteration_context(SqlExpr::raw("value"));
                let lowered = lower(expr, &item_ctx)?;
                ir::as_predicate(&lowered)
            }
        };
        predicate = Some(match predicate {
            Some(p) => format!("{p} AND {cond_sql}"),
            None => cond_sql,
        });
    }

    Ok(match predicate {
        Some(p) => format!(
            "{join_kw} (SELECT * FROM OPENJSON({src}, '$.{path_text}') WHERE {p}) AS {alias}"
        ),
        None => format!("{join_kw} OPENJSON({src}, '$.{path_text}') AS {alias}"),
    })
}

/// Group decoded segments into hops: a new hop opens whenever two
/// consecutive segments both name known FHIR array fields, matching the
/// path parser's array-flattening rule.
fn group_hops(segments: &[ForEachSegment]) -> Vec<Vec<ForEachSegment>> {
    let mut hops: Vec<Vec<ForEachSegment>> = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        let start_new = i == 0 || (segments[i - 1].is_array && seg.is_array);
        if start_new {
            hops.push(vec![seg.clone()]);
        } else {
            hops.last_mut().expect("first segment always opens a hop").push(seg.clone());
        }
    }
    hops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_definition::Column;

    fn ctx() -> TranspilerContext {
        TranspilerContext::new("r")
    }

    fn select_with_foreach(path: &str) -> ResolvedSelect {
        ResolvedSelect {
            column: vec![Column {
                name: "given".to_string(),
                path: "$this".to_string(),
                collection: None,
                col_type: Some("string".to_string()),
                description: None,
                tag: Vec::new(),
            }],
            nested: Vec::new(),
            for_each: Some(path.to_string()),
            for_each_or_null: None,
            repeat: Vec::new(),
            where_: Vec::new(),
            union_choice: -1,
        }
    }

    #[test]
    fn single_hop_foreach_matches_seed_scenario() {
        let select = select_with_foreach("name.given");
        let variant = vec![select];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(plan.applies, vec!["CROSS APPLY OPENJSON(r.json, '$.name.given') AS forEach_0".to_string()]);
        assert_eq!(
            plan.plans[0].ctx.iteration_context,
            Some(SqlExpr::raw("forEach_0.value"))
        );
    }

    #[test]
    fn foreach_or_null_uses_outer_apply() {
        let mut select = select_with_foreach("telecom");
        select.for_each = None;
        select.for_each_or_null = Some("telecom".to_string());
        let variant = vec![select];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(plan.applies, vec!["OUTER APPLY OPENJSON(r.json, '$.telecom') AS forEach_0".to_string()]);
    }

    #[test]
    fn array_flattening_opens_nested_hops() {
        let select = select_with_foreach("contact.telecom");
        let variant = vec![select];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(
            plan.applies,
            vec![
                "CROSS APPLY OPENJSON(r.json, '$.contact') AS forEach_0_hop0".to_string(),
                "CROSS APPLY OPENJSON(forEach_0_hop0.value, '$.telecom') AS forEach_0".to_string(),
            ]
        );
    }

    #[test]
    fn single_segment_index_becomes_key_filter() {
        let select = select_with_foreach("name[1]");
        let variant = vec![select];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(
            plan.applies,
            vec!["CROSS APPLY (SELECT * FROM OPENJSON(r.json, '$.name') WHERE [key] = '1') AS forEach_0".to_string()]
        );
    }

    #[test]
    fn where_tail_compiles_against_bare_value() {
        let select = select_with_foreach("telecom.where(system = 'phone')");
        let variant = vec![select];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(
            plan.applies,
            vec![
                "CROSS APPLY (SELECT * FROM OPENJSON(r.json, '$.telecom') WHERE (JSON_VALUE(value, '$.system') = 'phone')) AS forEach_0".to_string()
            ]
        );
    }

    #[test]
    fn nested_iterator_reads_from_parent_value() {
        let mut outer = select_with_foreach("contact");
        outer.column = Vec::new();
        outer.nested = vec![select_with_foreach("telecom")];
        let variant = vec![outer];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(
            plan.applies,
            vec![
                "CROSS APPLY OPENJSON(r.json, '$.contact') AS forEach_0".to_string(),
                "CROSS APPLY OPENJSON(forEach_0.value, '$.telecom') AS forEach_1".to_string(),
            ]
        );
    }

    #[test]
    fn independent_top_level_iterators_emit_in_reverse_order() {
        let variant = vec![select_with_foreach("name"), select_with_foreach("telecom")];
        let plan = build_variant_plan(&variant, "r", &ctx(), "").unwrap();
        assert_eq!(
            plan.applies,
            vec![
                "CROSS APPLY OPENJSON(r.json, '$.telecom') AS forEach_1".to_string(),
                "CROSS APPLY OPENJSON(r.json, '$.name') AS forEach_0".to_string(),
            ]
        );
    }
}
