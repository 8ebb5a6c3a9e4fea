//! # Goal formulas
//!
//! The interpretation target: a disjunction of conjunctions of ground
//! relational literals. The textual form round-trips through the `dnf`
//! escape-hatch grammar: conjunctions are separated by `|`, literals by
//! `&`, and a literal reads `ontop(a,floor)` or `-holding(b)`.

use crate::relation::{self, Relation};
use crate::world::{ObjectId, Scene};

use serde::Serialize;
use std::fmt;

/// An atomic relational claim over one or two object identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Literal {
    pub relation: Relation,
    pub args: Vec<ObjectId>,
    pub polarity: bool,
}

impl Literal {
    pub fn positive(relation: Relation, args: Vec<ObjectId>) -> Literal {
        Literal {
            relation,
            args,
            polarity: true,
        }
    }

    pub fn subject(&self) -> &str {
        &self.args[0]
    }

    /// The second argument, for binary relations.
    pub fn object(&self) -> &str {
        &self.args[1]
    }

    /// Whether both arguments name the same object. Such literals can
    /// never be made true and poison their whole conjunction.
    pub fn self_referential(&self) -> bool {
        self.args.len() == 2 && self.args[0] == self.args[1]
    }

    pub fn satisfied<S: Scene>(&self, s: &S) -> bool {
        let b = self.args.get(1).map(|x| x.as_str()).unwrap_or("");
        let held = relation::test(s, self.relation, self.subject(), b);
        held == self.polarity
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.polarity {
            write!(f, "-")?;
        }
        write!(f, "{}({})", self.relation, self.args.join(","))
    }
}

/// A set of literals that must all hold at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conjunction(pub Vec<Literal>);

impl Conjunction {
    pub fn satisfied<S: Scene>(&self, s: &S) -> bool {
        self.0.iter().all(|lit| lit.satisfied(s))
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> =
            self.0.iter().map(|l| l.to_string()).collect();
        write!(f, "{}", parts.join(" & "))
    }
}

/// An ordered disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnfFormula(pub Vec<Conjunction>);

impl DnfFormula {
    pub fn satisfied<S: Scene>(&self, s: &S) -> bool {
        self.0.iter().any(|conj| conj.satisfied(s))
    }

    /// Drop conjunctions that are empty or contain a self-referential
    /// literal. The planner runs on the result.
    pub fn pruned(&self) -> DnfFormula {
        DnfFormula(
            self.0
                .iter()
                .filter(|conj| {
                    !conj.0.is_empty()
                        && !conj.0.iter().any(|l| l.self_referential())
                })
                .cloned()
                .collect(),
        )
    }
}

impl fmt::Display for DnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> =
            self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Preset;

    fn lit(rel: Relation, args: &[&str]) -> Literal {
        Literal::positive(
            rel,
            args.iter().map(|a| (*a).to_owned()).collect(),
        )
    }

    #[test]
    fn satisfaction_follows_the_world() {
        let w = Preset::named("small").unwrap().world;
        assert!(lit(Relation::OnTop, &["e", "floor"]).satisfied(&w));
        assert!(lit(Relation::Inside, &["m", "k"]).satisfied(&w));
        assert!(!lit(Relation::Holding, &["e"]).satisfied(&w));
        let neg = Literal {
            polarity: false,
            ..lit(Relation::Holding, &["e"])
        };
        assert!(neg.satisfied(&w));
    }

    #[test]
    fn pruning_discards_poisoned_conjunctions() {
        let f = DnfFormula(vec![
            Conjunction(vec![lit(Relation::Beside, &["e", "e"])]),
            Conjunction(vec![]),
            Conjunction(vec![lit(Relation::OnTop, &["e", "floor"])]),
        ]);
        let p = f.pruned();
        assert_eq!(p.0.len(), 1);
        assert_eq!(p.to_string(), "ontop(e,floor)");
    }

    #[test]
    fn display_round_trip_shape() {
        let f = DnfFormula(vec![
            Conjunction(vec![
                lit(Relation::OnTop, &["a", "floor"]),
                lit(Relation::OnTop, &["b", "a"]),
            ]),
            Conjunction(vec![lit(Relation::Holding, &["c"])]),
        ]);
        assert_eq!(
            f.to_string(),
            "ontop(a,floor) & ontop(b,a) | holding(c)"
        );
    }
}
