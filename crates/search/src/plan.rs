use query::QueryNode;
use std::fmt;

/// Physical plan over the inverted index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanNode {
    /// Every page known to the page index.
    SequentialScan,
    /// Pages carrying one token.
    IndexScan(String),
    Intersect(Box<PlanNode>, Box<PlanNode>),
    Union(Box<PlanNode>, Box<PlanNode>),
    Difference(Box<PlanNode>, Box<PlanNode>),
    /// The empty result.
    Noop,
}

pub fn intersect(lhs: PlanNode, rhs: PlanNode) -> PlanNode {
    PlanNode::Intersect(Box::new(lhs), Box::new(rhs))
}

pub fn union(lhs: PlanNode, rhs: PlanNode) -> PlanNode {
    PlanNode::Union(Box::new(lhs), Box::new(rhs))
}

pub fn difference(lhs: PlanNode, rhs: PlanNode) -> PlanNode {
    PlanNode::Difference(Box::new(lhs), Box::new(rhs))
}

/// Lower a simplified query tree to a physical plan.
///
/// `And` is negation-aware: one negated side becomes a set difference
/// anchored on the positive side; two negated sides stay an intersection
/// of their (sequential-scan-backed) plans.
pub fn plan(node: &QueryNode) -> PlanNode {
    match node {
        QueryNode::Word(value) => PlanNode::IndexScan(value.clone()),
        QueryNode::And(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
            (QueryNode::Not(_), QueryNode::Not(_)) => intersect(plan(lhs), plan(rhs)),
            (QueryNode::Not(negated), _) => difference(plan(rhs), plan(negated)),
            (_, QueryNode::Not(negated)) => difference(plan(lhs), plan(negated)),
            _ => intersect(plan(lhs), plan(rhs)),
        },
        QueryNode::Or(lhs, rhs) => union(plan(lhs), plan(rhs)),
        QueryNode::Not(child) => difference(PlanNode::SequentialScan, plan(child)),
        QueryNode::Empty => PlanNode::Noop,
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(node: &PlanNode, indent: usize, out: &mut fmt::Formatter<'_>) -> fmt::Result {
            let pad = "  ".repeat(indent);
            match node {
                PlanNode::SequentialScan => write!(out, "{pad}Sequential scan"),
                PlanNode::IndexScan(value) => write!(out, "{pad}Index scan for '{value}'"),
                PlanNode::Intersect(l, r) => {
                    writeln!(out, "{pad}Intersection(")?;
                    walk(l, indent + 1, out)?;
                    writeln!(out, ",")?;
                    walk(r, indent + 1, out)?;
                    write!(out, "\n{pad})")
                }
                PlanNode::Union(l, r) => {
                    writeln!(out, "{pad}Union(")?;
                    walk(l, indent + 1, out)?;
                    writeln!(out, ",")?;
                    walk(r, indent + 1, out)?;
                    write!(out, "\n{pad})")
                }
                PlanNode::Difference(l, r) => {
                    writeln!(out, "{pad}Difference(")?;
                    walk(l, indent + 1, out)?;
                    writeln!(out, ",")?;
                    walk(r, indent + 1, out)?;
                    write!(out, "\n{pad})")
                }
                PlanNode::Noop => write!(out, "{pad}Noop"),
            }
        }
        walk(self, 0, f)
    }
}
