//! Combination Expander — unfolds every `unionAll` in a ViewDefinition's
//! select tree into a flat list of plan variants (the Cartesian product of
//! all encountered `unionAll` choices), depth-first, with no deduplication.

use crate::view_definition::{Select, Tag, ViewDefinition, WhereClause};

/// A `unionAll`-free select node: the shape every downstream stage (the
/// ForEach/Repeat processor, the column builder) consumes. Produced by
/// resolving every `unionAll` in a [`Select`] to one concrete branch.
#[derive(Debug, Clone)]
pub struct ResolvedSelect {
    pub column: Vec<crate::view_definition::Column>,
    pub nested: Vec<ResolvedSelect>,
    pub for_each: Option<String>,
    pub for_each_or_null: Option<String>,
    pub repeat: Vec<String>,
    pub where_: Vec<WhereClause>,
    /// The index of the `unionAll` branch this node resolves, or `-1` if
    /// this node did not come from a `unionAll`. Mirrors the `unionChoices`
    /// entry in the specification's `PlanVariant` data model.
    pub union_choice: i64,
}

impl ResolvedSelect {
    pub fn iterates(&self) -> bool {
        self.for_each.is_some() || self.for_each_or_null.is_some()
    }
}

#[allow(dead_code)]
pub fn tag_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.name == name).map(|t| t.value.as_str())
}

/// One compiled plan variant: a resolved, `unionAll`-free form of every
/// top-level select, in declared order.
#[derive(Debug, Clone)]
pub struct PlanVariant {
    pub selects: Vec<ResolvedSelect>,
}

/// Expand a ViewDefinition's `select[]` into every plan variant implied by
/// the Cartesian product of all `unionAll` choices encountered anywhere in
/// the tree. A ViewDefinition with no `unionAll` produces exactly one
/// variant.
pub fn expand_view(view: &ViewDefinition) -> Vec<PlanVariant> {
    let per_top_select: Vec<Vec<ResolvedSelect>> =
        view.select.iter().map(expand_select).collect();
    cartesian(per_top_select)
        .into_iter()
        .map(|selects| PlanVariant { selects })
        .collect()
}

/// Expand a single [`Select`] node into every variant it can resolve to.
/// A `unionAll` node contributes one variant per branch (not a cross
/// product within itself — branches are alternatives, not simultaneous
/// choices); a plain node contributes the Cartesian product across its
/// nested `select[]` positions.
fn expand_select(select: &Select) -> Vec<ResolvedSelect> {
    if let Some(branches) = &select.union_all {
        return branches
            .iter()
            .enumerate()
            .flat_map(|(idx, branch)| {
                expand_select(branch).into_iter().map(move |mut resolved| {
                    // A nested `unionAll` inside the chosen branch keeps its
                    // own `union_choice`; only mark this branch's own choice
                    // when the branch itself wasn't already resolved from a
                    // deeper `unionAll`.
                    if resolved.union_choice < 0 {
                        resolved.union_choice = idx as i64;
                    }
                    resolved
                })
            })
            .collect();
    }

    let nested_variants: Vec<Vec<ResolvedSelect>> =
        select.select.iter().map(expand_select).collect();
    cartesian(nested_variants)
        .into_iter()
        .map(|nested| ResolvedSelect {
            column: select.column.clone().unwrap_or_default(),
            nested,
            for_each: select.for_each.clone(),
            for_each_or_null: select.for_each_or_null.clone(),
            repeat: select.repeat.clone(),
            where_: select.where_.clone(),
            union_choice: -1,
        })
        .collect()
}

/// The Cartesian product of a list of option-lists, preserving order and
/// performing no deduplication. Folding from an empty combination means
/// zero input positions (an empty `select[]`) yields exactly one — empty —
/// combination, not zero.
fn cartesian<T: Clone>(lists: Vec<Vec<T>>) -> Vec<Vec<T>> {
    lists.into_iter().fold(vec![Vec::new()], |acc, options| {
        let mut result = Vec::with_capacity(acc.len() * options.len().max(1));
        for prefix in &acc {
            for option in &options {
                let mut combo = prefix.clone();
                combo.push(option.clone());
                result.push(combo);
            }
        }
        result
    })
}
