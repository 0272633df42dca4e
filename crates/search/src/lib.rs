//! Physical planning and execution of Boolean queries over an inverted
//! index.
//!
//! The planner lowers a (simplified) query tree to a [`PlanNode`]; the
//! executor evaluates the plan bottom-up, each node producing the set of
//! page URLs it selects.

mod index;
mod plan;

pub use index::{InMemoryPageIndex, InMemoryTokenIndex, PageIndex, Token, TokenIndex};
pub use plan::{difference, intersect, plan, union, PlanNode};

use std::collections::HashSet;

/// Evaluates plans against a token index and a page index.
pub struct PlanExecutor<'a> {
    token_index: &'a dyn TokenIndex,
    page_index: &'a dyn PageIndex,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(token_index: &'a dyn TokenIndex, page_index: &'a dyn PageIndex) -> Self {
        PlanExecutor {
            token_index,
            page_index,
        }
    }

    /// The set of page URLs the plan selects.
    pub fn execute(&self, plan: &PlanNode) -> HashSet<String> {
        match plan {
            PlanNode::SequentialScan => self.page_index.all_page_urls().into_iter().collect(),
            PlanNode::IndexScan(value) => self
                .token_index
                .page_urls_by_token(&Token::new(value.clone()))
                .into_iter()
                .collect(),
            PlanNode::Intersect(lhs, rhs) => {
                let left = self.execute(lhs);
                let right = self.execute(rhs);
                left.intersection(&right).cloned().collect()
            }
            PlanNode::Union(lhs, rhs) => {
                let left = self.execute(lhs);
                let right = self.execute(rhs);
                left.union(&right).cloned().collect()
            }
            PlanNode::Difference(lhs, rhs) => {
                let left = self.execute(lhs);
                let right = self.execute(rhs);
                left.difference(&right).cloned().collect()
            }
            PlanNode::Noop => HashSet::new(),
        }
    }
}
