//! # Dialogue sessions
//!
//! The driver-side state machine gluing parse, interpretation and
//! planning together. A session owns the world and the pending-command
//! state: a definite reference that could not be resolved parks the
//! command and routes the next utterance in as clarification parses; any
//! committed command clears the clarification buffer.

use crate::formula::DnfFormula;
use crate::grammar::{Command, Entity};
use crate::interpret::{self, Outcome};
use crate::parse;
use crate::planner::{self, Plan, PlanOutcome};
use crate::search::Timer;
use crate::world::{World, FLOOR};

use instant::Duration;
use log::debug;
use std::collections::VecDeque;

/// What the driver should do with one line of input.
#[derive(Debug, Clone)]
pub enum Response {
    /// Execute and show this plan.
    Plan(Plan),
    /// Ask the user this and feed their answer back in.
    Question(String),
    Error(String),
}

enum DialogState {
    AwaitingCommand,
    AwaitingClarification {
        parses: Vec<Command>,
        clarifications: VecDeque<Vec<Entity>>,
    },
}

pub struct Session {
    pub world: World,
    state: DialogState,
    timeout: Duration,
}

impl Session {
    pub fn new(world: World, timeout: Duration) -> Session {
        Session {
            world,
            state: DialogState::AwaitingCommand,
            timeout,
        }
    }

    /// Handle one utterance, action string, or `dnf` formula. The world
    /// is not mutated here; the driver executes returned plans.
    pub fn handle(&mut self, input: &str) -> Response {
        let trimmed = input.trim();

        if let Some(rest) = trimmed.strip_prefix("dnf ") {
            self.state = DialogState::AwaitingCommand;
            return match parse::dnf(rest) {
                Ok(formula) => match self.check_formula(&formula) {
                    Ok(()) => self.plan_best(&[formula]),
                    Err(message) => Response::Error(message),
                },
                Err(report) => Response::Error(report),
            };
        }

        if let Some(tokens) = parse::action_tokens(trimmed) {
            self.state = DialogState::AwaitingCommand;
            return Response::Plan(Plan {
                cost: tokens.len(),
                tokens,
            });
        }

        if let DialogState::AwaitingClarification {
            parses,
            clarifications,
        } = &mut self.state
        {
            let replies = parse::clarifications(trimmed);
            if !replies.is_empty() {
                clarifications.push_back(replies);
                let parses = parses.clone();
                let clarifications = clarifications.clone();
                return self.interpret_and_plan(&parses, &clarifications);
            }
            // Not a clarification after all; the pending command is
            // abandoned and the input starts over as a command.
            self.state = DialogState::AwaitingCommand;
        }

        let parses = parse::commands(trimmed);
        if parses.is_empty() {
            return Response::Error(
                "I do not understand that".to_owned(),
            );
        }
        if parses
            .iter()
            .all(|c| matches!(c, Command::Clarify(_)))
        {
            return Response::Error(
                "there is no pending command to clarify".to_owned(),
            );
        }
        debug!("{} parse(s) for '{}'", parses.len(), trimmed);
        self.interpret_and_plan(&parses, &VecDeque::new())
    }

    fn interpret_and_plan(
        &mut self,
        parses: &[Command],
        clarifications: &VecDeque<Vec<Entity>>,
    ) -> Response {
        match interpret::utterance(parses, &self.world, clarifications)
        {
            Outcome::NeedsClarification(question) => {
                self.state = DialogState::AwaitingClarification {
                    parses: parses.to_vec(),
                    clarifications: clarifications.clone(),
                };
                Response::Question(question)
            }
            Outcome::Failure(message) => {
                self.state = DialogState::AwaitingCommand;
                Response::Error(message)
            }
            Outcome::Formulas(interpretations) => {
                self.state = DialogState::AwaitingCommand;
                let formulas: Vec<DnfFormula> = interpretations
                    .into_iter()
                    .map(|i| i.formula)
                    .collect();
                self.plan_best(&formulas)
            }
        }
    }

    /// Ground-check a directly entered formula: every argument must name
    /// an object, and the floor may only be a destination for stacking
    /// relations.
    fn check_formula(&self, formula: &DnfFormula) -> Result<(), String> {
        use crate::relation::Relation;
        for conj in &formula.0 {
            for lit in &conj.0 {
                if lit.subject() == FLOOR {
                    return Err(
                        "the floor cannot be moved".to_owned()
                    );
                }
                for arg in &lit.args {
                    if arg != FLOOR
                        && !self.world.objects.contains_key(arg)
                    {
                        return Err(format!(
                            "unknown object '{}'",
                            arg
                        ));
                    }
                }
                if lit.args.get(1).map(|a| a.as_str()) == Some(FLOOR)
                    && !matches!(
                        lit.relation,
                        Relation::OnTop
                            | Relation::Above
                            | Relation::Inside
                    )
                {
                    return Err(format!(
                        "'{}' cannot relate to the floor",
                        lit.relation
                    ));
                }
            }
        }
        Ok(())
    }

    /// Plan every interpretation and keep the shortest plan; ties go to
    /// the earlier interpretation.
    fn plan_best(&self, formulas: &[DnfFormula]) -> Response {
        let mut best: Option<Plan> = None;
        let mut timed_out = false;
        let mut reasons: Vec<String> = vec![];

        for formula in formulas {
            let timer = Timer::finite(self.timeout);
            let outcome = planner::plan(formula, &self.world, &timer);
            match outcome {
                PlanOutcome::Plan(p) => {
                    let better = best
                        .as_ref()
                        .map(|b| p.cost < b.cost)
                        .unwrap_or(true);
                    if better {
                        best = Some(p);
                    }
                }
                PlanOutcome::AlreadySatisfied => {
                    let p = Plan {
                        tokens: vec!["already true".to_owned()],
                        cost: 0,
                    };
                    if best.as_ref().map(|b| b.cost > 0).unwrap_or(true)
                    {
                        best = Some(p);
                    }
                }
                PlanOutcome::Timeout => timed_out = true,
                PlanOutcome::NoPlan => reasons.push(format!(
                    "nothing I can do satisfies {}",
                    formula
                )),
            }
        }

        match best {
            Some(plan) => Response::Plan(plan),
            None if timed_out => Response::Error(
                "I could not plan that in time".to_owned(),
            ),
            None if !reasons.is_empty() => {
                Response::Error(reasons.join("; "))
            }
            None => Response::Error(
                "I cannot see how to do that".to_owned(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Preset, Scene};

    fn session(name: &str) -> Session {
        Session::new(
            Preset::named(name).unwrap().world,
            Duration::from_secs(10),
        )
    }

    fn expect_plan(session: &mut Session, input: &str) -> Plan {
        match session.handle(input) {
            Response::Plan(p) => p,
            other => panic!("expected a plan, got {:?}", other),
        }
    }

    #[test]
    fn clarification_dialogue_round_trip() {
        let mut s = session("small");
        let question = match s.handle("take the ball") {
            Response::Question(q) => q,
            other => panic!("expected a question, got {:?}", other),
        };
        assert!(question.starts_with("Did you mean"));
        let plan = expect_plan(&mut s, "the black one");
        s.world.execute(&plan.tokens).unwrap();
        assert_eq!(s.world.holding.as_deref(), Some("f"));
    }

    #[test]
    fn clarification_without_pending_command_is_rejected() {
        let mut s = session("small");
        match s.handle("the black one") {
            Response::Error(m) => {
                assert!(m.contains("pending"), "{}", m)
            }
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn direct_formulas_bypass_interpretation() {
        let mut s = session("small");
        let plan = expect_plan(&mut s, "dnf holding(f)");
        let formula = parse::dnf("holding(f)").unwrap();
        s.world.execute(&plan.tokens).unwrap();
        assert!(formula.satisfied(&s.world));
    }

    #[test]
    fn action_strings_pass_straight_through() {
        let mut s = session("small");
        let plan = expect_plan(&mut s, "r p");
        assert_eq!(plan.tokens, vec!["r", "p"]);
        s.world.execute(&plan.tokens).unwrap();
        assert_eq!(s.world.holding.as_deref(), Some("l"));
    }

    #[test]
    fn direct_formulas_are_ground_checked() {
        let mut s = session("small");
        match s.handle("dnf ontop(zzz,floor)") {
            Response::Error(m) => {
                assert!(m.contains("unknown object"), "{}", m)
            }
            other => panic!("expected an error, got {:?}", other),
        }
        match s.handle("dnf beside(e,floor)") {
            Response::Error(m) => assert!(m.contains("floor"), "{}", m),
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn satisfied_commands_answer_already_true() {
        let mut s = session("small");
        let plan = expect_plan(&mut s, "dnf ontop(e,floor)");
        assert_eq!(plan.cost, 0);
        assert_eq!(plan.tokens, vec!["already true"]);
    }

    #[test]
    fn a_new_command_abandons_the_pending_one() {
        let mut s = session("small");
        match s.handle("take the ball") {
            Response::Question(_) => (),
            other => panic!("expected a question, got {:?}", other),
        }
        let plan = expect_plan(&mut s, "take the white ball");
        s.world.execute(&plan.tokens).unwrap();
        assert_eq!(s.world.holding.as_deref(), Some("e"));
    }

    #[test]
    fn ambiguous_attachment_takes_the_shortest_plan() {
        let mut s = session("small");
        let plan =
            expect_plan(&mut s, "put a ball in a box on the floor");
        // Dropping the black ball onto an empty column beats digging
        // out a path into the large box.
        s.world.execute(&plan.tokens).unwrap();
        assert_eq!(s.world.position("f").map(|p| p.1), Some(0));
    }
}
