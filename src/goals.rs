//! # Goal decomposition
//!
//! A goal formula is decomposed once per planning call into a tree of
//! sub-goals: pick this up, clear that stack, make room over there. The
//! tree is arena-owned; nodes refer to their parents by index, which keeps
//! upward heuristic composition cheap and cycle-free. The high-level search
//! asks the tree which sub-goals are currently pursuable (`frontier`), and
//! the low-level search evaluates one leaf at a time through its fulfilment
//! check and heuristic.

use crate::ambiguity;
use crate::formula::{DnfFormula, Literal};
use crate::physics;
use crate::relation::Relation;
use crate::world::{ObjectId, ObjectSpec, Scene, World, FLOOR};

pub type GoalId = usize;

////////////////////////////////////////////////////////////////////////////////
// Stack predicates

/// A column test for directional placement, kept as data so goal nodes
/// stay comparable and printable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackPred {
    /// Columns strictly left of the named object's column.
    LeftOf(ObjectId),
    /// Columns strictly right of the named object's column.
    RightOf(ObjectId),
    /// Columns adjacent to the named object's column.
    Beside(ObjectId),
    /// Any column at all.
    Anywhere,
}

impl StackPred {
    pub fn eval<S: Scene>(&self, s: &S, col: usize) -> bool {
        match self {
            StackPred::LeftOf(g) => {
                s.column(g).map(|cg| col < cg).unwrap_or(false)
            }
            StackPred::RightOf(g) => {
                s.column(g).map(|cg| col > cg).unwrap_or(false)
            }
            StackPred::Beside(g) => s
                .column(g)
                .map(|cg| col.abs_diff(cg) == 1)
                .unwrap_or(false),
            StackPred::Anywhere => true,
        }
    }

    fn phrase(&self, world: &World) -> String {
        match self {
            StackPred::LeftOf(g) => {
                format!("left of {}", ambiguity::noun_phrase(world, g))
            }
            StackPred::RightOf(g) => {
                format!("right of {}", ambiguity::noun_phrase(world, g))
            }
            StackPred::Beside(g) => {
                format!("beside {}", ambiguity::noun_phrase(world, g))
            }
            StackPred::Anywhere => "somewhere".to_owned(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Goal kinds

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalKind {
    /// Root: fulfilled when any conjunction child is.
    Dnf,
    /// Fulfilled when every literal child is.
    Conjunction,
    /// Chain: clear the stack above the object, then hold it.
    PickUp(ObjectId),
    Holding(ObjectId),
    ClearStack(ObjectId),
    /// Either move one object relative to the other, or vice versa.
    MoveBidirectional,
    /// Chain: make a receiving column, hold the item, place it there.
    MoveToStack(ObjectId),
    /// Chain: expose the goal, hold the item, stack it directly on.
    MoveOnTop(ObjectId, ObjectId),
    /// Chain: make the goal's stack able to carry the item, then stack.
    MoveAbove(ObjectId, ObjectId),
    WidenStack(ObjectId, ObjectId),
    ClearOnStack(ObjectId, StackPred),
    OnStack(ObjectId, StackPred),
    SameStack(ObjectId, Relation, ObjectId),
    /// Check-only leaf for literals with no constructive decomposition.
    Satisfy(Literal),
    /// Synthetic terminal the high-level search steps onto.
    Final,
}

struct GoalNode {
    kind: GoalKind,
    parent: Option<GoalId>,
    children: Vec<GoalId>,
    /// Children form a precondition chain and must go in order.
    chain: bool,
}

////////////////////////////////////////////////////////////////////////////////
// The arena

pub struct GoalTree {
    nodes: Vec<GoalNode>,
    pub root: GoalId,
    pub final_id: GoalId,
}

impl GoalTree {
    pub fn build(formula: &DnfFormula) -> GoalTree {
        let mut tree = GoalTree {
            nodes: vec![],
            root: 0,
            final_id: 0,
        };
        tree.root = tree.push(GoalKind::Dnf, None, false);
        for conj in &formula.0 {
            let c =
                tree.push(GoalKind::Conjunction, Some(tree.root), false);
            for lit in &conj.0 {
                tree.literal_goal(c, lit);
            }
        }
        // The terminal is deliberately parentless so the root's
        // any-child-fulfilled test never sees it.
        tree.final_id = tree.push(GoalKind::Final, None, false);
        tree
    }

    fn push(
        &mut self,
        kind: GoalKind,
        parent: Option<GoalId>,
        chain: bool,
    ) -> GoalId {
        let id = self.nodes.len();
        self.nodes.push(GoalNode {
            kind,
            parent,
            children: vec![],
            chain,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn kind(&self, id: GoalId) -> &GoalKind {
        &self.nodes[id].kind
    }

    fn literal_goal(&mut self, parent: GoalId, lit: &Literal) {
        if !lit.polarity {
            self.push(
                GoalKind::Satisfy(lit.clone()),
                Some(parent),
                false,
            );
            return;
        }
        let a = lit.subject().to_owned();
        match lit.relation {
            Relation::Holding => {
                self.pickup(parent, a);
            }
            Relation::OnTop | Relation::Inside => {
                self.move_ontop(parent, a, lit.object().to_owned());
            }
            Relation::Above => {
                self.move_above(parent, a, lit.object().to_owned());
            }
            // An under-goal is planned as the reversed above-goal; the
            // literal itself keeps its original argument order.
            Relation::Under => {
                self.move_above(parent, lit.object().to_owned(), a);
            }
            Relation::LeftOf => {
                let b = lit.object().to_owned();
                self.bidirectional(
                    parent,
                    a.clone(),
                    b.clone(),
                    StackPred::LeftOf(b),
                    StackPred::RightOf(a),
                );
            }
            Relation::RightOf => {
                let b = lit.object().to_owned();
                self.bidirectional(
                    parent,
                    a.clone(),
                    b.clone(),
                    StackPred::RightOf(b),
                    StackPred::LeftOf(a),
                );
            }
            Relation::Beside => {
                let b = lit.object().to_owned();
                self.bidirectional(
                    parent,
                    a.clone(),
                    b.clone(),
                    StackPred::Beside(b),
                    StackPred::Beside(a),
                );
            }
            Relation::AnyLocation => {
                self.push(
                    GoalKind::Satisfy(lit.clone()),
                    Some(parent),
                    false,
                );
            }
        }
    }

    fn pickup(&mut self, parent: GoalId, x: ObjectId) -> GoalId {
        let p = self.push(GoalKind::PickUp(x.clone()), Some(parent), true);
        self.push(GoalKind::ClearStack(x.clone()), Some(p), false);
        self.push(GoalKind::Holding(x), Some(p), false);
        p
    }

    fn move_ontop(
        &mut self,
        parent: GoalId,
        item: ObjectId,
        goal: ObjectId,
    ) {
        let m = self.push(
            GoalKind::MoveOnTop(item.clone(), goal.clone()),
            Some(parent),
            true,
        );
        self.push(GoalKind::ClearStack(goal.clone()), Some(m), false);
        self.pickup(m, item.clone());
        self.push(
            GoalKind::SameStack(item, Relation::OnTop, goal),
            Some(m),
            false,
        );
    }

    fn move_above(
        &mut self,
        parent: GoalId,
        item: ObjectId,
        goal: ObjectId,
    ) {
        let m = self.push(
            GoalKind::MoveAbove(item.clone(), goal.clone()),
            Some(parent),
            true,
        );
        self.push(
            GoalKind::WidenStack(item.clone(), goal.clone()),
            Some(m),
            false,
        );
        self.pickup(m, item.clone());
        self.push(
            GoalKind::SameStack(item, Relation::Above, goal),
            Some(m),
            false,
        );
    }

    fn bidirectional(
        &mut self,
        parent: GoalId,
        a: ObjectId,
        b: ObjectId,
        pred_a: StackPred,
        pred_b: StackPred,
    ) {
        let m =
            self.push(GoalKind::MoveBidirectional, Some(parent), false);
        self.move_to_stack(m, a, pred_a);
        self.move_to_stack(m, b, pred_b);
    }

    fn move_to_stack(
        &mut self,
        parent: GoalId,
        item: ObjectId,
        pred: StackPred,
    ) {
        let m = self.push(
            GoalKind::MoveToStack(item.clone()),
            Some(parent),
            true,
        );
        self.push(
            GoalKind::ClearOnStack(item.clone(), pred.clone()),
            Some(m),
            false,
        );
        self.pickup(m, item.clone());
        self.push(GoalKind::OnStack(item, pred), Some(m), false);
    }

    ////////////////////////////////////////////////////////////////////////
    // Fulfilment

    pub fn fulfilled<S: Scene>(&self, id: GoalId, s: &S) -> bool {
        let node = &self.nodes[id];
        match &node.kind {
            GoalKind::Dnf | GoalKind::MoveBidirectional => node
                .children
                .iter()
                .any(|&c| self.fulfilled(c, s)),
            GoalKind::Conjunction => node
                .children
                .iter()
                .all(|&c| self.fulfilled(c, s)),
            GoalKind::PickUp(_)
            | GoalKind::MoveToStack(_)
            | GoalKind::MoveOnTop(_, _)
            | GoalKind::MoveAbove(_, _) => match node.children.last() {
                Some(&last) => self.fulfilled(last, s),
                None => true,
            },
            GoalKind::Holding(x) => {
                s.held().map(|h| h.as_str()) == Some(x.as_str())
            }
            // The preparation goals also demand an empty hand: whatever
            // was lifted out of the way must be parked before the next
            // step of the chain, or the pick that follows could start
            // from a state with no legal drop left.
            GoalKind::ClearStack(x) => {
                if s.held().is_some() {
                    false
                } else if x == FLOOR {
                    (0..s.stack_count()).any(|c| s.height(c) == 0)
                } else {
                    match s.position(x) {
                        Some((col, idx)) => idx + 1 == s.height(col),
                        None => false,
                    }
                }
            }
            GoalKind::ClearOnStack(item, pred) => {
                if s.held().is_some() {
                    return false;
                }
                match s.spec(item) {
                    Some(spec) => {
                        let spec = *spec;
                        (0..s.stack_count()).any(|c| {
                            pred.eval(s, c) && s.accepts(c, &spec)
                        })
                    }
                    None => false,
                }
            }
            GoalKind::OnStack(item, pred) => match s.column(item) {
                Some(col) => pred.eval(s, col),
                None => false,
            },
            GoalKind::SameStack(item, rel, goal) => {
                self.same_stack(s, item, *rel, goal)
            }
            GoalKind::WidenStack(item, goal) => {
                if s.held().is_some() {
                    return false;
                }
                if goal == FLOOR {
                    return true;
                }
                match (s.spec(item), s.column(goal)) {
                    (Some(spec), Some(col)) => {
                        let spec = *spec;
                        s.accepts(col, &spec)
                    }
                    _ => false,
                }
            }
            GoalKind::Satisfy(lit) => lit.satisfied(s),
            GoalKind::Final => true,
        }
    }

    fn same_stack<S: Scene>(
        &self,
        s: &S,
        item: &str,
        rel: Relation,
        goal: &str,
    ) -> bool {
        if goal == FLOOR {
            return match rel {
                Relation::OnTop => {
                    matches!(s.position(item), Some((_, 0)))
                }
                _ => s.position(item).is_some(),
            };
        }
        match (s.position(item), s.position(goal)) {
            (Some((ci, ii)), Some((cg, ig))) => {
                ci == cg
                    && match rel {
                        Relation::OnTop => ii == ig + 1,
                        _ => ii > ig,
                    }
            }
            _ => false,
        }
    }

    ////////////////////////////////////////////////////////////////////////
    // Heuristics

    fn distance(a: usize, b: usize) -> f64 {
        a.abs_diff(b) as f64
    }

    /// A node's own cost guess, before composition with its ancestors.
    fn own_heuristic<S: Scene>(&self, id: GoalId, s: &S) -> f64 {
        let node = &self.nodes[id];
        match &node.kind {
            GoalKind::Dnf
            | GoalKind::Conjunction
            | GoalKind::MoveBidirectional
            | GoalKind::Satisfy(_)
            | GoalKind::Final => 0.0,
            // Chains borrow the guess of their fulfilment leaf.
            GoalKind::PickUp(_)
            | GoalKind::MoveToStack(_)
            | GoalKind::MoveOnTop(_, _)
            | GoalKind::MoveAbove(_, _) => match node.children.last() {
                Some(&last) => self.own_heuristic(last, s),
                None => 0.0,
            },
            GoalKind::Holding(x) => {
                if s.held().map(|h| h.as_str()) == Some(x.as_str()) {
                    return 0.0;
                }
                let base = match s.column(x) {
                    Some(col) => Self::distance(s.arm(), col),
                    None => 0.0,
                };
                base + if s.held().is_some() { 1.0 } else { 0.0 }
            }
            GoalKind::ClearStack(x) => {
                let burden = if s.held().is_some() { 1.0 } else { 0.0 };
                if x == FLOOR {
                    (0..s.stack_count())
                        .map(|c| {
                            Self::distance(s.arm(), c)
                                + s.height(c) as f64
                        })
                        .fold(f64::INFINITY, f64::min)
                        + burden
                } else {
                    match s.position(x) {
                        Some((col, idx)) => {
                            Self::distance(s.arm(), col)
                                + (s.height(col) - 1 - idx) as f64
                                + burden
                        }
                        None => 1.0,
                    }
                }
            }
            GoalKind::ClearOnStack(item, pred) => {
                let spec = match s.spec(item) {
                    Some(spec) => *spec,
                    None => return f64::INFINITY,
                };
                (0..s.stack_count())
                    .filter(|&c| pred.eval(s, c))
                    .map(|c| {
                        Self::removals_to_receive(s, c, &spec) as f64
                            + Self::distance(s.arm(), c)
                    })
                    .fold(f64::INFINITY, f64::min)
            }
            GoalKind::OnStack(item, pred) => {
                let base = s.column(item).unwrap_or_else(|| s.arm());
                (0..s.stack_count())
                    .filter(|&c| pred.eval(s, c))
                    .map(|c| Self::distance(base, c))
                    .fold(f64::INFINITY, f64::min)
            }
            GoalKind::SameStack(item, _, goal) => {
                let base = s.column(item).unwrap_or_else(|| s.arm());
                if goal == FLOOR {
                    (0..s.stack_count())
                        .map(|c| {
                            Self::distance(base, c)
                                + s.height(c) as f64
                        })
                        .fold(f64::INFINITY, f64::min)
                } else {
                    match s.column(goal) {
                        Some(col) => Self::distance(base, col),
                        None => 1.0,
                    }
                }
            }
            GoalKind::WidenStack(item, goal) => {
                if self.fulfilled(id, s) {
                    return 0.0;
                }
                match (s.spec(item), s.column(goal)) {
                    (Some(spec), Some(col)) => {
                        let spec = *spec;
                        Self::intermediates(s, col, &spec)
                    }
                    _ => 1.0,
                }
            }
        }
    }

    /// How many items must leave column `col` before it can receive an
    /// object with spec `spec`.
    fn removals_to_receive<S: Scene>(
        s: &S,
        col: usize,
        spec: &ObjectSpec,
    ) -> usize {
        let height = s.height(col);
        for removed in 0..height {
            let exposed = s.item(col, height - 1 - removed);
            if let Some(below) =
                exposed.and_then(|id| s.spec(id)).copied()
            {
                if physics::can_place(spec, &below) {
                    return removed;
                }
            }
        }
        // Strip the whole column; the floor accepts everything.
        height
    }

    /// Roughly how many objects must be piled on column `col` before its
    /// top accepts `spec`, capped at 10.
    fn intermediates<S: Scene>(
        s: &S,
        col: usize,
        spec: &ObjectSpec,
    ) -> f64 {
        let mut current = match s.top(col).and_then(|id| s.spec(id)) {
            Some(top) => *top,
            None => return 0.0,
        };
        let mut count = 0u32;
        while !physics::can_place(spec, &current) && count < 10 {
            let next = s.catalogue().values().find(|o| {
                physics::can_place(o, &current)
                    && physics::can_stack_above(spec, o)
            });
            match next {
                Some(o) => current = *o,
                None => return 10.0,
            }
            count += 1;
        }
        count as f64
    }

    /// The heuristic actually handed to the search: half the node's own
    /// guess plus half the composed guess of its ancestry, folded from the
    /// root down.
    pub fn effective_heuristic<S: Scene>(
        &self,
        id: GoalId,
        s: &S,
    ) -> f64 {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            path.push(parent);
            current = parent;
        }
        let mut effective = 0.0;
        for &node in path.iter().rev() {
            effective = (self.own_heuristic(node, s) + effective) / 2.0;
        }
        effective
    }

    ////////////////////////////////////////////////////////////////////////
    // Traversal

    /// The sub-goals worth pursuing next from this node. A fulfilled root
    /// yields the synthetic terminal; precondition chains yield only their
    /// first unfulfilled step; disjunctive nodes yield every branch.
    pub fn frontier<S: Scene>(&self, id: GoalId, s: &S) -> Vec<GoalId> {
        if self.fulfilled(id, s) {
            return if id == self.root {
                vec![self.final_id]
            } else {
                vec![]
            };
        }
        let node = &self.nodes[id];
        if node.children.is_empty() {
            return vec![id];
        }
        if node.chain {
            for &child in &node.children {
                if !self.fulfilled(child, s) {
                    return self.frontier(child, s);
                }
            }
            return vec![];
        }
        node.children
            .iter()
            .flat_map(|&c| self.frontier(c, s))
            .collect()
    }

    ////////////////////////////////////////////////////////////////////////
    // Descriptions

    /// The human annotation emitted ahead of a sub-goal's primitives. A
    /// leading `#` marks it silent.
    pub fn describe(&self, id: GoalId, world: &World) -> String {
        let np = |x: &str| ambiguity::noun_phrase(world, x);
        match &self.nodes[id].kind {
            GoalKind::Holding(x) => format!("picking up {}", np(x)),
            GoalKind::ClearStack(x) => {
                if x == FLOOR {
                    "clearing a column".to_owned()
                } else {
                    format!("clearing what is above {}", np(x))
                }
            }
            GoalKind::ClearOnStack(item, pred) => format!(
                "making room for {} {}",
                np(item),
                pred.phrase(world)
            ),
            GoalKind::OnStack(item, pred) => {
                format!("moving {} {}", np(item), pred.phrase(world))
            }
            GoalKind::SameStack(item, Relation::OnTop, goal) => {
                if goal == FLOOR {
                    format!("putting {} on the floor", np(item))
                } else if world
                    .objects
                    .get(goal)
                    .map(|o| o.form == crate::world::Form::Box)
                    .unwrap_or(false)
                {
                    format!("putting {} inside {}", np(item), np(goal))
                } else {
                    format!("putting {} on top of {}", np(item), np(goal))
                }
            }
            GoalKind::SameStack(item, _, goal) => {
                format!("putting {} above {}", np(item), np(goal))
            }
            GoalKind::WidenStack(item, goal) => format!(
                "building up the stack of {} to carry {}",
                np(goal),
                np(item)
            ),
            GoalKind::Satisfy(lit) => format!("# ensuring {}", lit),
            // The frontier only ever hands leaves to the planner.
            GoalKind::Dnf
            | GoalKind::Conjunction
            | GoalKind::PickUp(_)
            | GoalKind::MoveBidirectional
            | GoalKind::MoveToStack(_)
            | GoalKind::MoveOnTop(_, _)
            | GoalKind::MoveAbove(_, _)
            | GoalKind::Final => unreachable!(),
        }
    }

    /// A termtree rendering for the debug log.
    pub fn pretty(&self) -> termtree::Tree<String> {
        self.subtree(self.root)
    }

    fn subtree(&self, id: GoalId) -> termtree::Tree<String> {
        use ansi_term::Color::*;

        let node = &self.nodes[id];
        let label = if node.children.is_empty() {
            Cyan.paint(format!("{:?}", node.kind)).to_string()
        } else {
            format!("{:?}", node.kind)
        };
        let mut t = termtree::Tree::new(label);
        for &child in &node.children {
            t.push(self.subtree(child));
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowlevel::{LowNode, Snapshot};
    use crate::parse;
    use crate::world::Preset;

    fn tree_for(src: &str) -> GoalTree {
        GoalTree::build(&parse::dnf(src).unwrap())
    }

    #[test]
    fn satisfied_roots_step_to_the_terminal() {
        let preset = Preset::named("small").unwrap();
        let node = LowNode::from_world(&preset.world);
        let s = Snapshot {
            node: &node,
            world: &preset.world,
        };
        let tree = tree_for("ontop(e,floor)");
        assert!(tree.fulfilled(tree.root, &s));
        assert_eq!(tree.frontier(tree.root, &s), vec![tree.final_id]);
    }

    #[test]
    fn chains_expose_their_first_unfulfilled_step() {
        let preset = Preset::named("small").unwrap();
        let node = LowNode::from_world(&preset.world);
        let s = Snapshot {
            node: &node,
            world: &preset.world,
        };
        // Taking the ball buried inside two boxes: its stack must be
        // cleared before anything else, so the frontier is the holding
        // leaf's precondition only once the stack is clear. The ball f
        // is on top, so holding is next directly.
        let tree = tree_for("holding(f)");
        let frontier = tree.frontier(tree.root, &s);
        assert_eq!(frontier.len(), 1);
        assert!(matches!(
            tree.kind(frontier[0]),
            GoalKind::Holding(x) if x == "f"
        ));
    }

    #[test]
    fn buried_objects_need_clearing_first() {
        let preset = Preset::named("small").unwrap();
        let node = LowNode::from_world(&preset.world);
        let s = Snapshot {
            node: &node,
            world: &preset.world,
        };
        let tree = tree_for("holding(m)");
        let frontier = tree.frontier(tree.root, &s);
        assert_eq!(frontier.len(), 1);
        assert!(matches!(
            tree.kind(frontier[0]),
            GoalKind::ClearStack(x) if x == "m"
        ));
    }

    #[test]
    fn bidirectional_goals_offer_both_branches() {
        let preset = Preset::named("small").unwrap();
        let node = LowNode::from_world(&preset.world);
        let s = Snapshot {
            node: &node,
            world: &preset.world,
        };
        let tree = tree_for("leftof(f,e)");
        let frontier = tree.frontier(tree.root, &s);
        assert_eq!(frontier.len(), 2);
    }

    #[test]
    fn heuristics_reflect_remaining_work() {
        let preset = Preset::named("small").unwrap();
        let node = LowNode::from_world(&preset.world);
        let s = Snapshot {
            node: &node,
            world: &preset.world,
        };
        let tree = tree_for("holding(e)");
        let frontier = tree.frontier(tree.root, &s);
        let h = tree.effective_heuristic(frontier[0], &s);
        // e tops the arm's own column, so only the pick remains.
        assert!(h < 1.0, "{}", h);
    }

    #[test]
    fn under_plans_as_reversed_above() {
        let tree = tree_for("under(k,f)");
        // The conjunction child is a MoveAbove of f over k.
        let mut found = false;
        for id in 0..tree.nodes.len() {
            if let GoalKind::SameStack(item, Relation::Above, goal) =
                tree.kind(id)
            {
                assert_eq!(item, "f");
                assert_eq!(goal, "k");
                found = true;
            }
        }
        assert!(found);
    }
}
