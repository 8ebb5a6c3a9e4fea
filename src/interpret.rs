//! # Interpretation
//!
//! Turning command parses into goal formulas. Noun phrases are resolved
//! against the current world into sets of ground identifiers; quantifiers
//! decide whether those sets contribute disjunctively or conjunctively; and
//! every generated literal must survive the physical validity filter. The
//! result for an utterance is one formula per surviving parse, a
//! clarification question, or a failure message.

use crate::ambiguity;
use crate::formula::{Conjunction, DnfFormula, Literal};
use crate::grammar::{Command, Entity, Location, Object, Quantifier};
use crate::physics;
use crate::relation::Relation;
use crate::util::cartesian_product;
use crate::world::{Color, Form, ObjectId, Scene, Size, World, FLOOR};

use indexmap::IndexSet;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// Outcomes and errors

/// One reading of an utterance, paired with the parse it came from.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub command: Command,
    pub formula: DnfFormula,
}

/// The interpreter's verdict on a whole utterance.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// One goal formula per surviving parse, in parse order.
    Formulas(Vec<Interpretation>),
    /// A definite reference needs the user's help; ask this question.
    NeedsClarification(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    Ambiguous(String),
    Failure(String),
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Ambiguous(q) => write!(f, "{}", q),
            InterpretError::Failure(m) => write!(f, "{}", m),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Object resolution

fn matches_simple(
    spec: &crate::world::ObjectSpec,
    size: Size,
    color: Color,
    form: Form,
) -> bool {
    (form == Form::AnyForm || spec.form == form)
        && (size == Size::Unspecified || spec.size == size)
        && (color == Color::Unspecified || spec.color == color)
}

/// All identifiers whose current situation matches the (possibly relative)
/// noun-phrase body. The floor matches only when asked for by form; the
/// wildcard form never pulls it in.
pub fn resolve_object(world: &World, obj: &Object) -> IndexSet<ObjectId> {
    match obj {
        Object::Simple { size, color, form } => {
            if *form == Form::Floor {
                return IndexSet::from([FLOOR.to_owned()]);
            }
            world
                .objects
                .iter()
                .filter(|(_, spec)| {
                    matches_simple(spec, *size, *color, *form)
                })
                .map(|(id, _)| id.clone())
                .collect()
        }
        Object::Relative { object, location } => {
            let base = resolve_object(world, object);
            match location.as_ref() {
                Location::Anywhere => base,
                Location::Held => base
                    .into_iter()
                    .filter(|id| {
                        world.holding.as_deref() == Some(id.as_str())
                    })
                    .collect(),
                Location::Relative { relation, entity } => {
                    let inner = resolve_object(world, &entity.object);
                    base.into_iter()
                        .filter(|a| match entity.quantifier {
                            Quantifier::All => inner.iter().all(|b| {
                                crate::relation::test(
                                    world, *relation, a, b,
                                )
                            }),
                            _ => inner.iter().any(|b| {
                                crate::relation::test(
                                    world, *relation, a, b,
                                )
                            }),
                        })
                        .collect()
                }
            }
        }
    }
}

fn describe_filter(obj: &Object) -> String {
    match obj {
        Object::Simple { size, color, form } => {
            let mut words = vec![];
            if *size != Size::Unspecified {
                words.push(size.to_string());
            }
            if *color != Color::Unspecified {
                words.push(color.to_string());
            }
            words.push(form.to_string());
            words.join(" ")
        }
        Object::Relative { object, location } => match location.as_ref() {
            Location::Anywhere => describe_filter(object),
            Location::Held => {
                format!("{} being held", describe_filter(object))
            }
            Location::Relative { relation, entity } => format!(
                "{} {} {}",
                describe_filter(object),
                relation,
                describe_filter(&entity.object),
            ),
        },
    }
}

////////////////////////////////////////////////////////////////////////////////
// Literal validity

/// Whether a goal literal is physically meaningful: distinct arguments,
/// the floor only ever as a destination, and placement relations that the
/// feasibility rules could ever make true.
pub fn valid_literal(world: &World, lit: &Literal) -> bool {
    if lit.args.len() != lit.relation.arity() {
        return false;
    }
    if lit.subject() == FLOOR {
        return false;
    }
    if lit.relation.arity() == 1 {
        return true;
    }
    if lit.self_referential() {
        return false;
    }
    // Negated claims only need to be well-formed.
    if !lit.polarity {
        return true;
    }
    let a = match world.spec(lit.subject()) {
        Some(s) => *s,
        None => return false,
    };
    let b = match world.spec(lit.object()) {
        Some(s) => *s,
        None => return false,
    };
    let to_floor = lit.object() == FLOOR;
    match lit.relation {
        Relation::Inside => {
            b.form == Form::Box && physics::can_place(&a, &b)
        }
        Relation::OnTop => {
            to_floor
                || (b.form != Form::Box && physics::can_place(&a, &b))
        }
        Relation::Above => to_floor || physics::can_stack_above(&a, &b),
        Relation::Under => !to_floor && physics::can_stack_above(&b, &a),
        Relation::LeftOf | Relation::RightOf | Relation::Beside => {
            !to_floor
        }
        Relation::Holding | Relation::AnyLocation => true,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Entity resolution and formula assembly

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Conjunctive,
    Disjunctive,
}

struct Interpreter<'a> {
    world: &'a World,
    clarifications: VecDeque<Vec<Entity>>,
    memo: HashMap<Entity, (Mode, Vec<ObjectId>)>,
}

impl<'a> Interpreter<'a> {
    fn new(
        world: &'a World,
        clarifications: VecDeque<Vec<Entity>>,
    ) -> Self {
        Interpreter {
            world,
            clarifications,
            memo: HashMap::new(),
        }
    }

    fn resolve_entity(
        &mut self,
        ent: &Entity,
    ) -> Result<(Mode, Vec<ObjectId>), InterpretError> {
        if let Some(hit) = self.memo.get(ent) {
            return Ok(hit.clone());
        }
        let candidates: Vec<ObjectId> =
            resolve_object(self.world, &ent.object)
                .into_iter()
                .collect();
        if candidates.is_empty() {
            return Err(InterpretError::Failure(format!(
                "I cannot see any {} here",
                describe_filter(&ent.object),
            )));
        }
        let resolved = match ent.quantifier {
            Quantifier::Any => (Mode::Disjunctive, candidates),
            Quantifier::All => (Mode::Conjunctive, candidates),
            Quantifier::The => {
                let one = if candidates.len() == 1 {
                    candidates.into_iter().next().unwrap_or_default()
                } else {
                    ambiguity::the_one(
                        self.world,
                        candidates,
                        &mut self.clarifications,
                    )?
                };
                (Mode::Conjunctive, vec![one])
            }
        };
        self.memo.insert(ent.clone(), resolved.clone());
        Ok(resolved)
    }

    fn literal(
        &self,
        relation: Relation,
        a: &str,
        b: &str,
    ) -> Option<Literal> {
        if a == b {
            return None;
        }
        let lit = Literal::positive(
            relation,
            vec![a.to_owned(), b.to_owned()],
        );
        if valid_literal(self.world, &lit) {
            Some(lit)
        } else {
            None
        }
    }

    fn unary(&self, relation: Relation, a: &str) -> Option<Literal> {
        let lit = Literal::positive(relation, vec![a.to_owned()]);
        if valid_literal(self.world, &lit) {
            Some(lit)
        } else {
            None
        }
    }

    /// The four quantifier shapes for a binary goal relation.
    fn combine(
        &self,
        relation: Relation,
        (entity_mode, entity_ids): &(Mode, Vec<ObjectId>),
        (location_mode, location_ids): &(Mode, Vec<ObjectId>),
    ) -> Vec<Conjunction> {
        let conjunctions = match (entity_mode, location_mode) {
            (Mode::Conjunctive, Mode::Conjunctive) => {
                vec![Conjunction(
                    entity_ids
                        .iter()
                        .flat_map(|e| {
                            location_ids.iter().filter_map(|l| {
                                self.literal(relation, e, l)
                            })
                        })
                        .collect(),
                )]
            }
            (Mode::Disjunctive, Mode::Conjunctive) => entity_ids
                .iter()
                .map(|e| {
                    Conjunction(
                        location_ids
                            .iter()
                            .filter_map(|l| self.literal(relation, e, l))
                            .collect(),
                    )
                })
                .collect(),
            (Mode::Conjunctive, Mode::Disjunctive) => {
                let per_entity =
                    vec![location_ids.clone(); entity_ids.len()];
                cartesian_product(&per_entity)
                    .into_iter()
                    .map(|chosen| {
                        Conjunction(
                            entity_ids
                                .iter()
                                .zip(chosen.iter())
                                .filter_map(|(e, l)| {
                                    self.literal(relation, e, l)
                                })
                                .collect(),
                        )
                    })
                    .collect()
            }
            (Mode::Disjunctive, Mode::Disjunctive) => entity_ids
                .iter()
                .flat_map(|e| {
                    location_ids.iter().filter_map(|l| {
                        self.literal(relation, e, l)
                            .map(|lit| Conjunction(vec![lit]))
                    })
                })
                .collect(),
        };
        conjunctions
            .into_iter()
            .filter(|c| !c.0.is_empty())
            .collect()
    }

    /// A location-less shape over a unary relation.
    fn combine_unary(
        &self,
        relation: Relation,
        (entity_mode, entity_ids): &(Mode, Vec<ObjectId>),
    ) -> Vec<Conjunction> {
        let conjunctions: Vec<Conjunction> = match entity_mode {
            Mode::Conjunctive => vec![Conjunction(
                entity_ids
                    .iter()
                    .filter_map(|e| self.unary(relation, e))
                    .collect(),
            )],
            Mode::Disjunctive => entity_ids
                .iter()
                .filter_map(|e| {
                    self.unary(relation, e)
                        .map(|lit| Conjunction(vec![lit]))
                })
                .collect(),
        };
        conjunctions
            .into_iter()
            .filter(|c| !c.0.is_empty())
            .collect()
    }

    fn placement(
        &mut self,
        entity: (Mode, Vec<ObjectId>),
        location: &Location,
    ) -> Result<Vec<Conjunction>, InterpretError> {
        match location {
            Location::Anywhere => {
                Ok(self.combine_unary(Relation::AnyLocation, &entity))
            }
            Location::Held => {
                if entity.1.len() > 1
                    && entity.0 == Mode::Conjunctive
                {
                    return Err(InterpretError::Failure(
                        "I can only hold one object at a time"
                            .to_owned(),
                    ));
                }
                Ok(self.combine_unary(Relation::Holding, &entity))
            }
            Location::Relative { relation, entity: loc_ent } => {
                let resolved_location =
                    self.resolve_entity(loc_ent)?;
                Ok(self.combine(*relation, &entity, &resolved_location))
            }
        }
    }

    fn command(
        &mut self,
        cmd: &Command,
    ) -> Result<DnfFormula, InterpretError> {
        let conjunctions = match cmd {
            Command::Take(ent) => {
                let resolved = self.resolve_entity(ent)?;
                if ent.quantifier == Quantifier::All
                    && resolved.1.len() > 1
                {
                    return Err(InterpretError::Failure(
                        "I can only hold one object at a time"
                            .to_owned(),
                    ));
                }
                self.combine_unary(Relation::Holding, &resolved)
            }
            Command::Drop(location) => {
                let held = match &self.world.holding {
                    Some(id) => id.clone(),
                    None => {
                        return Err(InterpretError::Failure(
                            "I am not holding anything".to_owned(),
                        ))
                    }
                };
                self.placement(
                    (Mode::Conjunctive, vec![held]),
                    location,
                )?
            }
            Command::Move(ent, location) => {
                let resolved = self.resolve_entity(ent)?;
                self.placement(resolved, location)?
            }
            Command::Clarify(_) => {
                return Err(InterpretError::Failure(
                    "there is nothing to clarify".to_owned(),
                ))
            }
        };
        if conjunctions.is_empty() {
            return Err(InterpretError::Failure(
                "that is physically impossible".to_owned(),
            ));
        }
        Ok(DnfFormula(conjunctions))
    }
}

/// Interpret every parse of one utterance against the world, consulting a
/// snapshot of the pending clarification queue per parse.
pub fn utterance(
    parses: &[Command],
    world: &World,
    clarifications: &VecDeque<Vec<Entity>>,
) -> Outcome {
    let mut formulas: Vec<Interpretation> = vec![];
    let mut ambiguous: Option<String> = None;
    let mut failures: Vec<String> = vec![];

    for cmd in parses {
        if matches!(cmd, Command::Clarify(_)) {
            continue;
        }
        let mut interpreter =
            Interpreter::new(world, clarifications.clone());
        match interpreter.command(cmd) {
            Ok(formula) => {
                debug!("interpreted '{}' as {}", cmd, formula);
                formulas.push(Interpretation {
                    command: cmd.clone(),
                    formula,
                });
            }
            Err(InterpretError::Ambiguous(q)) => {
                ambiguous.get_or_insert(q);
            }
            Err(InterpretError::Failure(m)) => {
                if !failures.contains(&m) {
                    failures.push(m);
                }
            }
        }
    }

    if !formulas.is_empty() {
        Outcome::Formulas(formulas)
    } else if let Some(q) = ambiguous {
        Outcome::NeedsClarification(q)
    } else if failures.is_empty() {
        Outcome::Failure("I do not understand that".to_owned())
    } else {
        Outcome::Failure(failures.join("; "))
    }
}
