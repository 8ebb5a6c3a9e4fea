//! # Planning
//!
//! Two nested best-first searches. The low level walks the arm-primitive
//! state graph until one goal-tree leaf is fulfilled. The high level walks
//! (goal cursor, snapshot) pairs: each candidate leaf from the goal tree's
//! frontier is evaluated by an inner low-level search, and a successful
//! evaluation becomes one high-level edge whose tokens are a human
//! annotation followed by the primitive letters, and whose cost is the
//! inner path cost.

use crate::formula::DnfFormula;
use crate::goals::{GoalId, GoalTree};
use crate::lowlevel::{LowNode, Snapshot};
use crate::search::{astar, Edge, SearchOutcome, SearchProblem, Timer};
use crate::world::{Primitive, World};

use log::debug;

////////////////////////////////////////////////////////////////////////////////
// Low level

struct LowProblem<'a> {
    tree: &'a GoalTree,
    leaf: GoalId,
    world: &'a World,
}

const PRIMITIVES: [Primitive; 4] = [
    Primitive::Left,
    Primitive::Right,
    Primitive::Pick,
    Primitive::Drop,
];

impl SearchProblem for LowProblem<'_> {
    type Node = LowNode;
    type Action = Primitive;

    fn node_id(&self, node: &LowNode) -> String {
        node.id()
    }

    fn successors(
        &self,
        node: &LowNode,
    ) -> Vec<Edge<Primitive, LowNode>> {
        PRIMITIVES
            .iter()
            .filter_map(|&p| {
                node.apply(p, self.world).map(|target| Edge {
                    action: p,
                    cost: 1,
                    target,
                })
            })
            .collect()
    }

    fn is_goal(&self, node: &LowNode) -> bool {
        let snapshot = Snapshot {
            node,
            world: self.world,
        };
        self.tree.fulfilled(self.leaf, &snapshot)
    }

    fn heuristic(&self, node: &LowNode) -> f64 {
        let snapshot = Snapshot {
            node,
            world: self.world,
        };
        self.tree.effective_heuristic(self.leaf, &snapshot)
    }
}

////////////////////////////////////////////////////////////////////////////////
// High level

/// A goal-tree cursor paired with the snapshot it was reached in.
#[derive(Debug, Clone)]
pub struct HighNode {
    pub goal: GoalId,
    pub state: LowNode,
}

struct HighProblem<'a> {
    tree: &'a GoalTree,
    world: &'a World,
    timer: &'a Timer,
}

impl SearchProblem for HighProblem<'_> {
    type Node = HighNode;
    type Action = Vec<String>;

    fn node_id(&self, node: &HighNode) -> String {
        format!("{}:{}", node.goal, node.state.id())
    }

    fn successors(
        &self,
        node: &HighNode,
    ) -> Vec<Edge<Vec<String>, HighNode>> {
        let snapshot = Snapshot {
            node: &node.state,
            world: self.world,
        };
        let mut edges = vec![];
        for leaf in self.tree.frontier(self.tree.root, &snapshot) {
            if leaf == self.tree.final_id {
                continue;
            }
            let inner = LowProblem {
                tree: self.tree,
                leaf,
                world: self.world,
            };
            match astar(&inner, node.state.clone(), self.timer) {
                SearchOutcome::Found(path) => {
                    let end = match path.edges.last() {
                        Some(edge) => edge.target.clone(),
                        None => continue,
                    };
                    debug!(
                        "sub-goal '{}' solved in {} step(s)",
                        self.tree.describe(leaf, self.world).trim(),
                        path.cost
                    );
                    let mut tokens =
                        vec![self.tree.describe(leaf, self.world)];
                    tokens.extend(
                        path.edges
                            .iter()
                            .map(|e| e.action.token().to_owned()),
                    );
                    edges.push(Edge {
                        action: tokens,
                        cost: path.cost,
                        target: HighNode {
                            goal: leaf,
                            state: end,
                        },
                    });
                }
                SearchOutcome::Timeout => break,
                SearchOutcome::Exhausted => continue,
            }
        }
        edges
    }

    fn is_goal(&self, node: &HighNode) -> bool {
        let snapshot = Snapshot {
            node: &node.state,
            world: self.world,
        };
        self.tree.fulfilled(self.tree.root, &snapshot)
    }

    fn heuristic(&self, node: &HighNode) -> f64 {
        let snapshot = Snapshot {
            node: &node.state,
            world: self.world,
        };
        let leaves: Vec<GoalId> = self
            .tree
            .frontier(self.tree.root, &snapshot)
            .into_iter()
            .filter(|&leaf| leaf != self.tree.final_id)
            .collect();
        if leaves.is_empty() {
            return 0.0;
        }
        leaves
            .into_iter()
            .map(|leaf| self.tree.effective_heuristic(leaf, &snapshot))
            .fold(f64::INFINITY, f64::min)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Entry point

/// A finished plan: annotation and primitive tokens in execution order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Plan {
    pub tokens: Vec<String>,
    pub cost: usize,
}

#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Plan(Plan),
    /// The world already satisfies the formula; nothing to do.
    AlreadySatisfied,
    Timeout,
    NoPlan,
}

/// Plan a primitive sequence that drives the world into a state
/// satisfying the formula.
pub fn plan(
    formula: &DnfFormula,
    world: &World,
    timer: &Timer,
) -> PlanOutcome {
    let pruned = formula.pruned();
    if pruned.0.is_empty() {
        return PlanOutcome::NoPlan;
    }
    if pruned.satisfied(world) {
        return PlanOutcome::AlreadySatisfied;
    }
    let tree = GoalTree::build(&pruned);
    debug!("planning {}\n{}", pruned, tree.pretty());

    let start = HighNode {
        goal: tree.root,
        state: LowNode::from_world(world),
    };
    let problem = HighProblem {
        tree: &tree,
        world,
        timer,
    };
    match astar(&problem, start, timer) {
        SearchOutcome::Found(path) => {
            debug!(
                "plan of cost {} found after {} frontier insertions",
                path.cost, path.frontier_insertions
            );
            let mut tokens = vec![];
            for edge in path.edges {
                tokens.extend(edge.action);
            }
            PlanOutcome::Plan(Plan {
                tokens,
                cost: path.cost,
            })
        }
        SearchOutcome::Timeout => PlanOutcome::Timeout,
        SearchOutcome::Exhausted => PlanOutcome::NoPlan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::world::Preset;
    use std::collections::{HashSet, VecDeque};

    fn planned(world: &World, src: &str) -> Plan {
        match plan(
            &parse::dnf(src).unwrap(),
            world,
            &Timer::infinite(),
        ) {
            PlanOutcome::Plan(p) => p,
            other => panic!("expected a plan, got {:?}", other),
        }
    }

    fn primitive_count(plan: &Plan) -> usize {
        plan.tokens
            .iter()
            .filter(|t| Primitive::from_token(t).is_some())
            .count()
    }

    /// Brute-force breadth-first search over the same state graph, for
    /// checking optimality of a single low-level goal.
    fn bfs_cost<F: Fn(&Snapshot) -> bool>(
        world: &World,
        done: F,
    ) -> Option<usize> {
        let start = LowNode::from_world(world);
        let mut queue = VecDeque::from([(start.clone(), 0usize)]);
        let mut seen = HashSet::from([start.id()]);
        while let Some((node, depth)) = queue.pop_front() {
            let snapshot = Snapshot {
                node: &node,
                world,
            };
            if done(&snapshot) {
                return Some(depth);
            }
            for p in PRIMITIVES {
                if let Some(next) = node.apply(p, world) {
                    if seen.insert(next.id()) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }
        None
    }

    #[test]
    fn trivial_take_is_one_pick() {
        let w = Preset::named("test").unwrap().world;
        let p = planned(&w, "holding(l)");
        assert_eq!(p.cost, 1);
        assert_eq!(p.tokens.last().map(|s| s.as_str()), Some("p"));
    }

    #[test]
    fn satisfied_formulas_plan_nothing() {
        let w = Preset::named("small").unwrap().world;
        assert!(matches!(
            plan(
                &parse::dnf("ontop(e,floor)").unwrap(),
                &w,
                &Timer::infinite()
            ),
            PlanOutcome::AlreadySatisfied
        ));
    }

    #[test]
    fn self_referential_conjunctions_are_unplannable() {
        let w = Preset::named("small").unwrap().world;
        assert!(matches!(
            plan(
                &parse::dnf("beside(e,e)").unwrap(),
                &w,
                &Timer::infinite()
            ),
            PlanOutcome::NoPlan
        ));
    }

    #[test]
    fn low_level_cost_matches_brute_force() {
        let w = Preset::named("test").unwrap().world;
        // Ball into the box: the planner's total primitive count must
        // match an exhaustive search for the same end condition.
        let p = planned(&w, "inside(l,k)");
        assert_eq!(p.cost, primitive_count(&p));
        let brute = bfs_cost(&w, |s| {
            crate::relation::inside(s, "l", "k")
        })
        .unwrap();
        assert_eq!(p.cost, brute);
    }

    #[test]
    fn plans_execute_to_satisfaction() {
        let preset = Preset::named("test").unwrap();
        let formula = parse::dnf("inside(l,k)").unwrap();
        let p = planned(&preset.world, "inside(l,k)");
        let mut w = preset.world.clone();
        w.execute(&p.tokens).unwrap();
        assert!(formula.satisfied(&w));
    }

    #[test]
    fn disjunctions_pick_the_cheap_branch() {
        let w = Preset::named("test").unwrap().world;
        // Holding the ball costs 1; holding the buried box bottom costs
        // more, so the disjunction resolves to the ball.
        let p = planned(&w, "holding(l) | holding(k)");
        assert_eq!(p.cost, 1);
        let mut world = w.clone();
        world.execute(&p.tokens).unwrap();
        assert_eq!(world.holding.as_deref(), Some("l"));
    }

    #[test]
    fn timeout_is_surfaced() {
        let w = Preset::named("medium").unwrap().world;
        let timer = Timer::finite(instant::Duration::from_millis(0));
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(matches!(
            plan(&parse::dnf("inside(e,k)").unwrap(), &w, &timer),
            PlanOutcome::Timeout
        ));
    }
}
