//! Boolean-algebra simplifier.
//!
//! Eight deterministic laws shrink a tree; three probabilistic
//! reordering laws (commutativity, associativity, De Morgan) surface
//! structurally different but equivalent trees that the deterministic
//! laws can then reduce. The search keeps a frontier of the smallest
//! candidates and stops when the best tree stops improving.
//!
//! The PRNG is owned by the simplifier and seedable, so a seeded run is
//! fully deterministic: variant deduplication preserves first-seen order
//! and the size sort is stable.

use crate::ast::{and, not, or, QueryNode};
use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

pub struct Simplifier {
    rng: RefCell<StdRng>,
    max_attempts: usize,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    /// Entropy-seeded simplifier with the default attempt budget.
    pub fn new() -> Self {
        Simplifier {
            rng: RefCell::new(StdRng::from_entropy()),
            max_attempts: 1,
        }
    }

    /// Deterministic simplifier for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Simplifier {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            max_attempts: 1,
        }
    }

    /// How many non-improving rounds to tolerate before answering.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Simplify a tree. The result is never larger than the input.
    pub fn simplify(&self, node: &QueryNode) -> QueryNode {
        let tree_size = node.node_count();
        let reorder_iterations = tree_size;
        let simplify_iterations = tree_size;
        let max_frontier = reorder_iterations * simplify_iterations;

        let mut rng = self.rng.borrow_mut();
        let mut frontier = vec![node.clone()];
        let mut best = apply_simplification_to_fixpoint(node, simplify_iterations);
        let mut attempts = 0;

        for _ in 0..tree_size {
            let mut reordered = Vec::new();
            for tree in &frontier {
                for _ in 0..reorder_iterations {
                    reordered.push(apply_reordering(tree, &mut rng));
                }
            }
            let reordered = dedup_in_order(reordered);

            let simplified: Vec<QueryNode> = reordered
                .iter()
                .map(|tree| apply_simplification_to_fixpoint(tree, simplify_iterations))
                .collect();
            let variant_count = simplified.len();

            let mut next_frontier = dedup_in_order(simplified);
            next_frontier.sort_by_key(QueryNode::node_count);
            next_frontier.truncate(max_frontier);

            let best_new = next_frontier[0].clone();
            if best_new == best {
                attempts += 1;
                if attempts >= self.max_attempts {
                    return best;
                }
            }
            best = best_new;
            frontier = next_frontier;

            if variant_count == 1 {
                break;
            }
        }

        best
    }
}

fn dedup_in_order(trees: Vec<QueryNode>) -> Vec<QueryNode> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for tree in trees {
        if seen.insert(tree.clone()) {
            unique.push(tree);
        }
    }
    unique
}

fn apply_simplification_to_fixpoint(node: &QueryNode, budget: usize) -> QueryNode {
    let mut current = node.clone();
    for _ in 0..budget {
        let next = apply_simplification(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn apply_simplification(node: &QueryNode) -> QueryNode {
    let mut result = rewrite(node, &identity_law);
    result = rewrite(&result, &domination_law);
    result = rewrite(&result, &idempotent_law);
    result = rewrite(&result, &complement_law);
    result = rewrite(&result, &involution_law);
    result = rewrite(&result, &distributive_law);
    result = rewrite(&result, &absorption_law);
    result = rewrite(&result, &reduction_law);
    result
}

fn apply_reordering(node: &QueryNode, rng: &mut StdRng) -> QueryNode {
    let mut result = rewrite_mut(node, &mut |n| commutative_law(n, rng));
    result = rewrite_mut(&result, &mut |n| associative_law(n, rng));
    result = rewrite_mut(&result, &mut |n| de_morgan_law(n, rng));
    result
}

/// Rebuild the tree bottom-up, applying `law` at every node.
fn rewrite(node: &QueryNode, law: &impl Fn(QueryNode) -> QueryNode) -> QueryNode {
    let rebuilt = match node {
        QueryNode::And(l, r) => and(rewrite(l, law), rewrite(r, law)),
        QueryNode::Or(l, r) => or(rewrite(l, law), rewrite(r, law)),
        QueryNode::Not(c) => not(rewrite(c, law)),
        leaf => leaf.clone(),
    };
    law(rebuilt)
}

fn rewrite_mut(node: &QueryNode, law: &mut impl FnMut(QueryNode) -> QueryNode) -> QueryNode {
    let rebuilt = match node {
        QueryNode::And(l, r) => and(rewrite_mut(l, law), rewrite_mut(r, law)),
        QueryNode::Or(l, r) => or(rewrite_mut(l, law), rewrite_mut(r, law)),
        QueryNode::Not(c) => not(rewrite_mut(c, law)),
        leaf => leaf.clone(),
    };
    law(rebuilt)
}

// Empty OR A = A, A OR Empty = A
fn identity_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Or(l, r) if matches!(*l, QueryNode::Empty) => *r,
        QueryNode::Or(l, r) if matches!(*r, QueryNode::Empty) => *l,
        other => other,
    }
}

// A AND Empty = Empty, Empty AND A = Empty
fn domination_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r)
            if matches!(*l, QueryNode::Empty) || matches!(*r, QueryNode::Empty) =>
        {
            QueryNode::Empty
        }
        other => other,
    }
}

// A AND A = A, A OR A = A
fn idempotent_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r) | QueryNode::Or(l, r) if l == r => *l,
        other => other,
    }
}

// NOT A AND A = Empty, NOT A OR A = A
fn complement_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r) => match (&*l, &*r) {
            (QueryNode::Not(c), other) if **c == *other => QueryNode::Empty,
            (other, QueryNode::Not(c)) if **c == *other => QueryNode::Empty,
            _ => QueryNode::And(l, r),
        },
        QueryNode::Or(l, r) => match (&*l, &*r) {
            (QueryNode::Not(c), other) if **c == *other => other.clone(),
            (other, QueryNode::Not(c)) if **c == *other => other.clone(),
            _ => QueryNode::Or(l, r),
        },
        other => other,
    }
}

// NOT NOT A = A; NOT Empty = Empty (the algebra has no complement of the
// empty result set, so negating it stays empty).
fn involution_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Not(c) => match *c {
            QueryNode::Empty => QueryNode::Empty,
            QueryNode::Not(inner) => *inner,
            child => not(child),
        },
        other => other,
    }
}

/// Factor a shared subtree out of `(X op1 Y) op2 (X op1 Z)` patterns.
/// Returns `(shared, leftover_lhs, leftover_rhs)` when a pairing exists.
fn shared_factor<'a>(
    l1: &'a QueryNode,
    r1: &'a QueryNode,
    l2: &'a QueryNode,
    r2: &'a QueryNode,
) -> Option<(&'a QueryNode, &'a QueryNode, &'a QueryNode)> {
    if l1 == l2 {
        Some((l1, r1, r2))
    } else if l1 == r2 {
        Some((l1, r1, l2))
    } else if r1 == l2 {
        Some((r1, l1, r2))
    } else if r1 == r2 {
        Some((r1, l1, l2))
    } else {
        None
    }
}

// (A OR B) AND (A OR C) = A OR (B AND C) and the other three polarity
// combinations, each over every commutative pairing.
fn distributive_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            if let (QueryNode::Or(l1, r1), QueryNode::Or(l2, r2)) = (&*l, &*r) {
                if let Some((shared, x, y)) = shared_factor(l1, r1, l2, r2) {
                    return or(shared.clone(), and(x.clone(), y.clone()));
                }
            }
            if let (QueryNode::And(l1, r1), QueryNode::And(l2, r2)) = (&*l, &*r) {
                if let Some((shared, x, y)) = shared_factor(l1, r1, l2, r2) {
                    return and(shared.clone(), and(x.clone(), y.clone()));
                }
            }
            QueryNode::And(l, r)
        }
        QueryNode::Or(l, r) => {
            if let (QueryNode::And(l1, r1), QueryNode::And(l2, r2)) = (&*l, &*r) {
                if let Some((shared, x, y)) = shared_factor(l1, r1, l2, r2) {
                    return and(shared.clone(), or(x.clone(), y.clone()));
                }
            }
            if let (QueryNode::Or(l1, r1), QueryNode::Or(l2, r2)) = (&*l, &*r) {
                if let Some((shared, x, y)) = shared_factor(l1, r1, l2, r2) {
                    return or(shared.clone(), or(x.clone(), y.clone()));
                }
            }
            QueryNode::Or(l, r)
        }
        other => other,
    }
}

// A AND (A OR B) = A and its dual.
fn absorption_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            if let QueryNode::Or(x, y) = &*r {
                if *l == **x || *l == **y {
                    return *l;
                }
            }
            if let QueryNode::Or(x, y) = &*l {
                if *r == **x || *r == **y {
                    return *r;
                }
            }
            QueryNode::And(l, r)
        }
        QueryNode::Or(l, r) => {
            if let QueryNode::And(x, y) = &*r {
                if *l == **x || *l == **y {
                    return *l;
                }
            }
            if let QueryNode::And(x, y) = &*l {
                if *r == **x || *r == **y {
                    return *r;
                }
            }
            QueryNode::Or(l, r)
        }
        other => other,
    }
}

fn complementary(a: &QueryNode, b: &QueryNode) -> bool {
    matches!(a, QueryNode::Not(c) if **c == *b) || matches!(b, QueryNode::Not(c) if **c == *a)
}

// (A OR B) AND (A OR NOT B) = A and its dual, over every symmetric
// pairing of the shared term.
fn reduction_law(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            if let (QueryNode::Or(l1, r1), QueryNode::Or(l2, r2)) = (&*l, &*r) {
                if let Some(shared) = reduction_match(l1, r1, l2, r2) {
                    return shared;
                }
            }
            QueryNode::And(l, r)
        }
        QueryNode::Or(l, r) => {
            if let (QueryNode::And(l1, r1), QueryNode::And(l2, r2)) = (&*l, &*r) {
                if let Some(shared) = reduction_match(l1, r1, l2, r2) {
                    return shared;
                }
            }
            QueryNode::Or(l, r)
        }
        other => other,
    }
}

fn reduction_match(
    l1: &QueryNode,
    r1: &QueryNode,
    l2: &QueryNode,
    r2: &QueryNode,
) -> Option<QueryNode> {
    if l1 == l2 && complementary(r1, r2) {
        return Some(l1.clone());
    }
    if l1 == r2 && complementary(r1, l2) {
        return Some(l1.clone());
    }
    if r1 == l2 && complementary(l1, r2) {
        return Some(r1.clone());
    }
    if r1 == r2 && complementary(l1, l2) {
        return Some(r1.clone());
    }
    None
}

// A AND B = B AND A, with a coin toss deciding the order.
fn commutative_law(node: QueryNode, rng: &mut StdRng) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            if rng.gen_bool(0.5) {
                QueryNode::And(l, r)
            } else {
                QueryNode::And(r, l)
            }
        }
        QueryNode::Or(l, r) => {
            if rng.gen_bool(0.5) {
                QueryNode::Or(l, r)
            } else {
                QueryNode::Or(r, l)
            }
        }
        other => other,
    }
}

// (A AND B) AND C = A AND (B AND C), rebracketed half the time.
fn associative_law(node: QueryNode, rng: &mut StdRng) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            let rotatable =
                matches!(*l, QueryNode::And(..)) || matches!(*r, QueryNode::And(..));
            if !rotatable || rng.gen_bool(0.5) {
                return QueryNode::And(l, r);
            }
            match (*l, *r) {
                (QueryNode::And(ll, lr), rhs) => and(*ll, and(*lr, rhs)),
                (lhs, QueryNode::And(rl, rr)) => and(and(lhs, *rl), *rr),
                (lhs, rhs) => and(lhs, rhs),
            }
        }
        QueryNode::Or(l, r) => {
            let rotatable = matches!(*l, QueryNode::Or(..)) || matches!(*r, QueryNode::Or(..));
            if !rotatable || rng.gen_bool(0.5) {
                return QueryNode::Or(l, r);
            }
            match (*l, *r) {
                (QueryNode::Or(ll, lr), rhs) => or(*ll, or(*lr, rhs)),
                (lhs, QueryNode::Or(rl, rr)) => or(or(lhs, *rl), *rr),
                (lhs, rhs) => or(lhs, rhs),
            }
        }
        other => other,
    }
}

// NOT A AND NOT B = NOT (A OR B) and the three related rewrites, each
// taken half the time in either direction.
fn de_morgan_law(node: QueryNode, rng: &mut StdRng) -> QueryNode {
    match node {
        QueryNode::And(l, r) => {
            if let (QueryNode::Not(a), QueryNode::Not(b)) = (&*l, &*r) {
                if rng.gen_bool(0.5) {
                    return not(or((**a).clone(), (**b).clone()));
                }
            }
            QueryNode::And(l, r)
        }
        QueryNode::Or(l, r) => {
            if let (QueryNode::Not(a), QueryNode::Not(b)) = (&*l, &*r) {
                if rng.gen_bool(0.5) {
                    return not(and((**a).clone(), (**b).clone()));
                }
            }
            QueryNode::Or(l, r)
        }
        QueryNode::Not(c) => match &*c {
            QueryNode::And(a, b) => {
                if rng.gen_bool(0.5) {
                    or(not((**a).clone()), not((**b).clone()))
                } else {
                    QueryNode::Not(c)
                }
            }
            QueryNode::Or(a, b) => {
                if rng.gen_bool(0.5) {
                    and(not((**a).clone()), not((**b).clone()))
                } else {
                    QueryNode::Not(c)
                }
            }
            _ => QueryNode::Not(c),
        },
        other => other,
    }
}
