//! # Utterance syntax
//!
//! The data types produced by the utterance parser and consumed by the
//! interpreter. An utterance either issues a command over quantified noun
//! phrases or clarifies an earlier one; noun phrases may nest relative
//! locations to arbitrary depth ("a ball in a box on the floor").

use crate::relation::Relation;
use crate::world::{Color, Form, Size};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    Any,
    The,
    All,
}

/// A quantified noun phrase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    pub quantifier: Quantifier,
    pub object: Object,
}

/// A noun phrase body: either a bare attribute filter or a filter refined
/// by a relative location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Object {
    Simple {
        size: Size,
        color: Color,
        form: Form,
    },
    Relative {
        object: Box<Object>,
        location: Box<Location>,
    },
}

impl Object {
    pub fn simple(size: Size, color: Color, form: Form) -> Object {
        Object::Simple { size, color, form }
    }

    pub fn relative(object: Object, location: Location) -> Object {
        Object::Relative {
            object: Box::new(object),
            location: Box::new(location),
        }
    }
}

/// Where something should go (or be found).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Location {
    Relative { relation: Relation, entity: Entity },
    Anywhere,
    Held,
}

/// One parse of an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Command {
    /// take/grasp/pick up ⟨entity⟩
    Take(Entity),
    /// move/put/drop it ⟨location⟩
    Drop(Location),
    /// move/put/drop ⟨entity⟩ ⟨location⟩
    Move(Entity, Location),
    /// a bare noun phrase answering a disambiguation question
    Clarify(Entity),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Take(_) => write!(f, "take"),
            Command::Drop(_) => write!(f, "drop"),
            Command::Move(_, _) => write!(f, "move"),
            Command::Clarify(_) => write!(f, "clarify"),
        }
    }
}
