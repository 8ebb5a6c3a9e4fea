//! # Referential ambiguity
//!
//! Resolving a definite noun phrase ("the ball") that matches several
//! objects. Pending clarification replies are consumed first; if more than
//! one candidate survives, a disambiguation question is synthesized that
//! describes each candidate by its form and its relation to whatever lies
//! directly beneath it.

use crate::grammar::Entity;
use crate::interpret::{resolve_object, InterpretError};
use crate::relation::Relation;
use crate::world::{Form, ObjectId, Scene, Size, World, FLOOR};

use std::collections::VecDeque;

/// A noun phrase for `id` from its specified attributes: "the small white
/// ball". Unspecified attributes are omitted.
pub fn noun_phrase(world: &World, id: &str) -> String {
    if id == FLOOR {
        return "the floor".to_owned();
    }
    let spec = match world.objects.get(id) {
        Some(spec) => spec,
        None => return format!("the object '{}'", id),
    };
    let mut words = vec!["the".to_owned()];
    if spec.size != Size::Unspecified {
        words.push(spec.size.to_string());
    }
    if spec.color != crate::world::Color::Unspecified {
        words.push(spec.color.to_string());
    }
    words.push(spec.form.to_string());
    words.join(" ")
}

/// The English phrase for a relation, as used in questions and in plan
/// annotations.
pub fn relation_phrase(rel: Relation) -> &'static str {
    match rel {
        Relation::LeftOf => "left of",
        Relation::RightOf => "right of",
        Relation::Inside => "inside",
        Relation::OnTop => "on top of",
        Relation::Under => "under",
        Relation::Beside => "beside",
        Relation::Above => "above",
        Relation::Holding => "held",
        Relation::AnyLocation => "anywhere",
    }
}

/// Describe one candidate by its form plus where it currently sits.
fn situated(world: &World, id: &str) -> String {
    let form = world
        .objects
        .get(id)
        .map(|s| s.form.to_string())
        .unwrap_or_else(|| "object".to_owned());
    if world.holding.as_deref() == Some(id) {
        return format!("the {} that I am holding", form);
    }
    match world.position(id) {
        Some((_, 0)) => format!("the {} that is on the floor", form),
        Some((col, idx)) => {
            let below = &world.stacks[col][idx - 1];
            let below_is_box = world
                .objects
                .get(below)
                .map(|s| s.form == Form::Box)
                .unwrap_or(false);
            format!(
                "the {} that is {} {}",
                form,
                if below_is_box { "inside" } else { "on top of" },
                noun_phrase(world, below),
            )
        }
        None => format!("the {}", form),
    }
}

fn question(world: &World, candidates: &[ObjectId]) -> String {
    let descriptions: Vec<String> =
        candidates.iter().map(|c| situated(world, c)).collect();
    format!("Did you mean {}?", descriptions.join(" or "))
}

/// Narrow a definite reference down to one object.
///
/// Each pending clarification is a set of alternative noun-phrase parses of
/// one reply; a candidate survives if any parse matches it. An empty cut is
/// a user error; several survivors with no clarifications left raise the
/// question to ask.
pub fn the_one(
    world: &World,
    candidates: Vec<ObjectId>,
    clarifications: &mut VecDeque<Vec<Entity>>,
) -> Result<ObjectId, InterpretError> {
    let mut candidates = candidates;
    while candidates.len() > 1 {
        let clarification = match clarifications.pop_front() {
            Some(c) => c,
            None => break,
        };
        let kept: Vec<ObjectId> = candidates
            .iter()
            .filter(|c| {
                clarification.iter().any(|ent| {
                    resolve_object(world, &ent.object)
                        .contains(c.as_str())
                })
            })
            .cloned()
            .collect();
        if kept.is_empty() {
            return Err(InterpretError::Failure(
                "no candidate matches that clarification".to_owned(),
            ));
        }
        candidates = kept;
    }
    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        _ => Err(InterpretError::Ambiguous(question(world, &candidates))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::world::Preset;

    #[test]
    fn noun_phrases_carry_attributes() {
        let w = Preset::named("small").unwrap().world;
        assert_eq!(noun_phrase(&w, "e"), "the large white ball");
        assert_eq!(noun_phrase(&w, "m"), "the small blue box");
        assert_eq!(noun_phrase(&w, FLOOR), "the floor");
    }

    #[test]
    fn questions_describe_candidates_by_their_support() {
        let w = Preset::named("small").unwrap().world;
        // Two balls: e on the floor, f inside the small blue box.
        let q = question(&w, &["e".to_owned(), "f".to_owned()]);
        assert!(q.starts_with("Did you mean"));
        assert!(q.contains("the ball that is on the floor"));
        assert!(q.contains("the ball that is inside the small blue box"));
    }

    #[test]
    fn clarifications_narrow_candidates() {
        let w = Preset::named("small").unwrap().world;
        let mut clars = VecDeque::from([parse::clarifications(
            "the black one",
        )]);
        let got = the_one(
            &w,
            vec!["e".to_owned(), "f".to_owned()],
            &mut clars,
        )
        .unwrap();
        assert_eq!(got, "f");
    }

    #[test]
    fn unmatched_clarification_is_an_error() {
        let w = Preset::named("small").unwrap().world;
        let mut clars =
            VecDeque::from([parse::clarifications("the green one")]);
        let got = the_one(
            &w,
            vec!["e".to_owned(), "f".to_owned()],
            &mut clars,
        );
        assert!(matches!(got, Err(InterpretError::Failure(_))));
    }
}
