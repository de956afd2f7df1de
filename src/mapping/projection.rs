//! Column Projector: configuration-driven column exclusion and renaming.
//!
//! The defect flag is asymmetric by design: the exclusion set comes from
//! rules whose classification does NOT match the requested view (a normal
//! view drops defect columns and vice versa), while the rename map comes
//! from the rules that DO match it. All keys are compared lower-cased.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::database::WarehouseStore;
use crate::error::DwhResult;
use crate::models::{ColumnRule, ResultRow, TableIdentity};

/// Computed column view for one table family: which columns to drop and
/// what to call the ones that stay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnProjection {
    exclude: HashSet<String>,
    rename: HashMap<String, String>,
}

impl ColumnProjection {
    /// Projection that filters and renames nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the two rule sets: `exclusion_rules` supply the columns to
    /// drop, `rename_rules` the display names for the columns that remain.
    pub fn from_rules(exclusion_rules: &[ColumnRule], rename_rules: &[ColumnRule]) -> Self {
        let exclude = exclusion_rules
            .iter()
            .map(|rule| rule.column.to_lowercase())
            .collect();
        let rename = rename_rules
            .iter()
            .map(|rule| (rule.column.to_lowercase(), rule.view_name.clone()))
            .collect();
        Self { exclude, rename }
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.rename.is_empty()
    }

    pub fn excludes(&self, column: &str) -> bool {
        self.exclude.contains(&column.to_lowercase())
    }

    pub fn display_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.rename
            .get(&column.to_lowercase())
            .map(String::as_str)
            .unwrap_or(column)
    }

    /// Drop excluded columns, then rename what remains. A column in the
    /// exclusion set never survives, rename entry or not.
    pub fn apply(&self, row: &ResultRow) -> ResultRow {
        row.iter()
            .filter(|(name, _)| !self.excludes(name))
            .map(|(name, value)| (self.display_name(name).to_string(), value.clone()))
            .collect()
    }

    pub fn apply_all(&self, rows: &[ResultRow]) -> Vec<ResultRow> {
        rows.iter().map(|row| self.apply(row)).collect()
    }
}

pub struct ColumnProjector {
    store: Arc<dyn WarehouseStore>,
}

impl ColumnProjector {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    /// Compute the projection for one resolved table identity and view flag.
    /// Identities without a full (product, process, department) key get the
    /// empty projection: rows pass through unchanged.
    pub async fn compute_projection(
        &self,
        identity: &TableIdentity,
        want_defect: bool,
    ) -> DwhResult<ColumnProjection> {
        let (Some(product_code), Some(process_code), Some(department)) = (
            identity.product_code.as_deref(),
            identity.process_code.as_deref(),
            identity.department.as_deref(),
        ) else {
            return Ok(ColumnProjection::empty());
        };

        let exclusion_rules = self
            .store
            .list_column_rules(product_code, process_code, department, !want_defect)
            .await?;
        let rename_rules = self
            .store
            .list_column_rules(product_code, process_code, department, want_defect)
            .await?;

        Ok(ColumnProjection::from_rules(
            &exclusion_rules,
            &rename_rules,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use proptest::prelude::*;

    fn rule(column: &str, view: &str, is_defect: bool) -> ColumnRule {
        ColumnRule {
            product_code: "PAC".into(),
            department: "MT900".into(),
            process_code: "Racking".into(),
            column: column.into(),
            view_name: view.into(),
            is_defect,
        }
    }

    fn row(names: &[&str]) -> ResultRow {
        names
            .iter()
            .map(|n| (n.to_string(), CellValue::Int(1)))
            .collect()
    }

    #[test]
    fn excludes_case_insensitively() {
        let projection = ColumnProjection::from_rules(&[rule("Reject_Code", "Reject", true)], &[]);
        let out = projection.apply(&row(&["lotno", "REJECT_CODE", "qty"]));
        assert!(!out.contains_column("REJECT_CODE"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn renames_remaining_columns() {
        let projection = ColumnProjection::from_rules(
            &[rule("reject_code", "Reject", true)],
            &[rule("qty", "Quantity", false)],
        );
        let out = projection.apply(&row(&["lotno", "qty", "reject_code"]));
        assert!(out.contains_column("Quantity"));
        assert!(out.contains_column("lotno"));
        assert!(!out.contains_column("qty"));
        assert!(!out.contains_column("reject_code"));
    }

    #[test]
    fn exclusion_wins_over_rename() {
        // The same physical column tagged in both rule sets must disappear.
        let projection = ColumnProjection::from_rules(
            &[rule("reject_code", "Reject", true)],
            &[rule("reject_code", "Reject", true)],
        );
        let out = projection.apply(&row(&["reject_code", "lotno"]));
        assert!(!out.contains_column("reject_code"));
        assert!(!out.contains_column("Reject"));
        assert!(out.contains_column("lotno"));
    }

    #[test]
    fn empty_projection_passes_rows_through() {
        let projection = ColumnProjection::empty();
        let input = row(&["lotno", "qty"]);
        assert_eq!(projection.apply(&input), input);
        assert!(projection.is_empty());
    }

    #[test]
    fn apply_preserves_column_order() {
        let projection =
            ColumnProjection::from_rules(&[rule("b", "x", true)], &[rule("c", "C2", false)]);
        let out = projection.apply(&row(&["a", "b", "c", "d"]));
        let names: Vec<&str> = out.column_names().collect();
        assert_eq!(names, vec!["a", "C2", "d"]);
    }

    proptest! {
        #[test]
        fn excluded_columns_never_survive(
            columns in proptest::collection::vec("[a-z_]{1,8}", 1..8),
            excluded_idx in 0usize..8,
            view in "[A-Z][a-z]{0,6}",
        ) {
            let excluded = columns[excluded_idx % columns.len()].clone();
            let projection = ColumnProjection::from_rules(
                &[rule(&excluded, "dropped", true)],
                &[rule(&excluded, &view, false)],
            );
            let out = projection.apply(&row(&columns.iter().map(String::as_str).collect::<Vec<_>>()));
            prop_assert!(!out.contains_column(&excluded));
            prop_assert!(out.column_names().all(|n| n != excluded));
        }
    }
}
