use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Boolean query parse tree.
///
/// Equality treats `And` and `Or` as unordered pairs (commutativity) and
/// the hash is order-insensitive to match.
#[derive(Clone, Debug)]
pub enum QueryNode {
    Word(String),
    And(Box<QueryNode>, Box<QueryNode>),
    Or(Box<QueryNode>, Box<QueryNode>),
    Not(Box<QueryNode>),
    Empty,
}

/// A word leaf.
pub fn word(value: impl Into<String>) -> QueryNode {
    QueryNode::Word(value.into())
}

pub fn and(lhs: QueryNode, rhs: QueryNode) -> QueryNode {
    QueryNode::And(Box::new(lhs), Box::new(rhs))
}

pub fn or(lhs: QueryNode, rhs: QueryNode) -> QueryNode {
    QueryNode::Or(Box::new(lhs), Box::new(rhs))
}

pub fn not(child: QueryNode) -> QueryNode {
    QueryNode::Not(Box::new(child))
}

impl QueryNode {
    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            QueryNode::Word(_) | QueryNode::Empty => 1,
            QueryNode::And(l, r) | QueryNode::Or(l, r) => l.node_count() + r.node_count() + 1,
            QueryNode::Not(c) => c.node_count() + 1,
        }
    }

    /// Longest root-to-leaf edge count.
    pub fn height(&self) -> usize {
        match self {
            QueryNode::Word(_) | QueryNode::Empty => 0,
            QueryNode::And(l, r) | QueryNode::Or(l, r) => l.height().max(r.height()) + 1,
            QueryNode::Not(c) => c.height() + 1,
        }
    }

    fn commutative_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            QueryNode::Word(v) => {
                1u8.hash(&mut hasher);
                v.hash(&mut hasher);
            }
            QueryNode::And(l, r) => {
                2u8.hash(&mut hasher);
                // Order-insensitive combine keeps hash compatible with
                // the commutative equality.
                hasher.write_u64(l.commutative_hash().wrapping_add(r.commutative_hash()));
            }
            QueryNode::Or(l, r) => {
                3u8.hash(&mut hasher);
                hasher.write_u64(l.commutative_hash().wrapping_add(r.commutative_hash()));
            }
            QueryNode::Not(c) => {
                4u8.hash(&mut hasher);
                hasher.write_u64(c.commutative_hash());
            }
            QueryNode::Empty => {
                5u8.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Indented multi-line rendering, for diagnostics.
    pub fn pretty(&self) -> String {
        fn walk(node: &QueryNode, indent: usize, out: &mut String) {
            let pad = "  ".repeat(indent);
            match node {
                QueryNode::Word(v) => out.push_str(&format!("{pad}WORD({v})")),
                QueryNode::And(l, r) => {
                    out.push_str(&format!("{pad}AND(\n"));
                    walk(l, indent + 1, out);
                    out.push('\n');
                    walk(r, indent + 1, out);
                    out.push_str(&format!("\n{pad})"));
                }
                QueryNode::Or(l, r) => {
                    out.push_str(&format!("{pad}OR(\n"));
                    walk(l, indent + 1, out);
                    out.push('\n');
                    walk(r, indent + 1, out);
                    out.push_str(&format!("\n{pad})"));
                }
                QueryNode::Not(c) => {
                    out.push_str(&format!("{pad}NOT(\n"));
                    walk(c, indent + 1, out);
                    out.push_str(&format!("\n{pad})"));
                }
                QueryNode::Empty => out.push_str(&format!("{pad}EMPTY")),
            }
        }
        let mut out = String::new();
        walk(self, 0, &mut out);
        out
    }
}

impl PartialEq for QueryNode {
    fn eq(&self, other: &QueryNode) -> bool {
        match (self, other) {
            (QueryNode::Word(a), QueryNode::Word(b)) => a == b,
            (QueryNode::And(l1, r1), QueryNode::And(l2, r2))
            | (QueryNode::Or(l1, r1), QueryNode::Or(l2, r2)) => {
                (l1 == l2 && r1 == r2) || (l1 == r2 && r1 == l2)
            }
            (QueryNode::Not(a), QueryNode::Not(b)) => a == b,
            (QueryNode::Empty, QueryNode::Empty) => true,
            _ => false,
        }
    }
}

impl Eq for QueryNode {}

impl Hash for QueryNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.commutative_hash());
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Word(v) => write!(f, "{v}"),
            QueryNode::And(l, r) => write!(f, "({l} AND {r})"),
            QueryNode::Or(l, r) => write!(f, "({l} OR {r})"),
            QueryNode::Not(c) => write!(f, "NOT {c}"),
            QueryNode::Empty => write!(f, "EMPTY"),
        }
    }
}
