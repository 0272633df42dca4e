//! Fluent query builder: composes the operators in a fixed order.

use crate::{
    Aggregated, Filter, GroupBy, Join, JoinKind, OrderBy, Projection, SharedRecordSet, SortKey,
};
use common::EngineResult;
use expr::Expr;
use std::rc::Rc;

struct JoinClause {
    other: SharedRecordSet,
    left_key: Option<Expr>,
    right_key: Option<Expr>,
    condition: Option<Expr>,
    kind: JoinKind,
}

/// Assembles a query over a source record set. [`Select::execute`]
/// applies the stages in a fixed order: joins (left to right), filter,
/// group/aggregate, projection, ordering.
pub struct Select {
    source: SharedRecordSet,
    projections: Vec<Expr>,
    predicate: Option<Expr>,
    aggregations: Vec<Expr>,
    group_keys: Vec<Expr>,
    joins: Vec<JoinClause>,
    orderings: Vec<SortKey>,
}

/// Start a query over `source`.
pub fn select_from(source: SharedRecordSet) -> Select {
    Select {
        source,
        projections: Vec::new(),
        predicate: None,
        aggregations: Vec::new(),
        group_keys: Vec::new(),
        joins: Vec::new(),
        orderings: Vec::new(),
    }
}

impl Select {
    /// Set the projected columns.
    pub fn columns(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.projections = exprs.into_iter().collect();
        self
    }

    /// Set the row predicate (the `where` stage).
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Set the grouping keys.
    pub fn group_by(mut self, keys: impl IntoIterator<Item = Expr>) -> Self {
        self.group_keys = keys.into_iter().collect();
        self
    }

    /// Set the aggregations.
    pub fn aggregate(mut self, aggregations: impl IntoIterator<Item = Expr>) -> Self {
        self.aggregations = aggregations.into_iter().collect();
        self
    }

    /// Equi-join against `other` with the given flavor.
    pub fn join_with(
        mut self,
        other: SharedRecordSet,
        left_key: Expr,
        right_key: Expr,
        kind: JoinKind,
    ) -> Self {
        self.joins.push(JoinClause {
            other,
            left_key: Some(left_key),
            right_key: Some(right_key),
            condition: None,
            kind,
        });
        self
    }

    /// Inner equi-join against `other`.
    pub fn join(self, other: SharedRecordSet, left_key: Expr, right_key: Expr) -> Self {
        self.join_with(other, left_key, right_key, JoinKind::Inner)
    }

    pub fn left_join(self, other: SharedRecordSet, left_key: Expr, right_key: Expr) -> Self {
        self.join_with(other, left_key, right_key, JoinKind::Left)
    }

    pub fn right_join(self, other: SharedRecordSet, left_key: Expr, right_key: Expr) -> Self {
        self.join_with(other, left_key, right_key, JoinKind::Right)
    }

    pub fn full_join(self, other: SharedRecordSet, left_key: Expr, right_key: Expr) -> Self {
        self.join_with(other, left_key, right_key, JoinKind::Full)
    }

    /// Conditional join: nested-loops scan with `condition` over the
    /// merged candidate row.
    pub fn join_on_with(
        mut self,
        other: SharedRecordSet,
        condition: Expr,
        kind: JoinKind,
    ) -> Self {
        self.joins.push(JoinClause {
            other,
            left_key: None,
            right_key: None,
            condition: Some(condition),
            kind,
        });
        self
    }

    /// Inner conditional join.
    pub fn join_on(self, other: SharedRecordSet, condition: Expr) -> Self {
        self.join_on_with(other, condition, JoinKind::Inner)
    }

    /// Cartesian product with `other`.
    pub fn cross_join(mut self, other: SharedRecordSet) -> Self {
        self.joins.push(JoinClause {
            other,
            left_key: None,
            right_key: None,
            condition: None,
            kind: JoinKind::Cross,
        });
        self
    }

    /// Set the orderings.
    pub fn order_by(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.orderings = keys.into_iter().collect();
        self
    }

    /// Compose the operator pipeline. This is the only place the stage
    /// order is decided.
    pub fn execute(self) -> EngineResult<SharedRecordSet> {
        let mut result = self.source;

        for clause in self.joins {
            result = Rc::new(Join::new(
                result,
                clause.other,
                clause.left_key,
                clause.right_key,
                clause.condition,
                clause.kind,
            )?);
        }

        if let Some(predicate) = self.predicate {
            result = Rc::new(Filter::new(result, predicate)?);
        }

        if !self.aggregations.is_empty() {
            if self.group_keys.is_empty() {
                result = Rc::new(Aggregated::new(result, self.aggregations)?);
            } else {
                let grouped =
                    GroupBy::new(result, self.group_keys).aggregate(self.aggregations)?;
                result = Rc::new(grouped);
            }
        }

        if !self.projections.is_empty() {
            result = Rc::new(Projection::new(result, self.projections));
        }

        if !self.orderings.is_empty() {
            result = Rc::new(OrderBy::new(result, self.orderings)?);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{field, ints};
    use crate::{desc, RecordSetExt};
    use expr::{raw, sum};
    use types::Value;

    #[test]
    fn full_pipeline_runs_in_fixed_order() {
        let orders = ints(
            &["customer", "amount"],
            &[&[1, 10], &[2, 20], &[1, 30], &[2, 40], &[3, 5]],
        );
        let customers = ints(&["id", "active"], &[&[1, 1], &[2, 1], &[3, 0]]);

        let result = select_from(orders)
            .join(customers, raw("customer"), raw("id"))
            .filter(raw("active").eq(1))
            .group_by([raw("customer")])
            .aggregate([sum(raw("amount")).alias("total")])
            .columns([raw("customer"), (raw("total") * 2).alias("double")])
            .order_by([desc(raw("double"))])
            .execute()
            .unwrap();

        let out = result.collect().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(field(&out[0], "customer"), Value::Int(2));
        assert_eq!(field(&out[0], "double"), Value::Int(120));
        assert_eq!(field(&out[1], "customer"), Value::Int(1));
        assert_eq!(field(&out[1], "double"), Value::Int(80));
    }

    #[test]
    fn aggregate_without_group_keys_collapses_to_one_row() {
        let source = ints(&["a"], &[&[1], &[2], &[3]]);
        let result = select_from(source)
            .aggregate([sum(raw("a")).alias("total")])
            .execute()
            .unwrap();
        let out = result.collect().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0], "total"), Value::Int(6));
    }

    #[test]
    fn bare_select_returns_the_source() {
        let source = ints(&["a"], &[&[1], &[2]]);
        let result = select_from(source).execute().unwrap();
        assert_eq!(result.collect().unwrap().len(), 2);
    }

    #[test]
    fn filter_references_are_checked_during_execute() {
        let source = ints(&["a"], &[&[1]]);
        let err = select_from(source)
            .filter(raw("nope").gt(0))
            .execute()
            .unwrap_err();
        assert!(matches!(err, common::EngineError::SchemaMismatch(_)));
    }

    #[test]
    fn joins_chain_left_to_right() {
        let a = ints(&["x"], &[&[1], &[2]]);
        let b = ints(&["y"], &[&[1], &[2]]);
        let c = ints(&["z"], &[&[2]]);

        let result = select_from(a)
            .join(b, raw("x"), raw("y"))
            .join(c, raw("x"), raw("z"))
            .execute()
            .unwrap();
        let out = result.collect().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0], "x"), Value::Int(2));
        assert_eq!(field(&out[0], "y"), Value::Int(2));
        assert_eq!(field(&out[0], "z"), Value::Int(2));
    }

    #[test]
    fn cross_join_through_the_builder() {
        let a = ints(&["x"], &[&[1], &[2]]);
        let b = ints(&["y"], &[&[7]]);
        let result = select_from(a).cross_join(b).execute().unwrap();
        assert_eq!(result.collect().unwrap().len(), 2);
    }
}
