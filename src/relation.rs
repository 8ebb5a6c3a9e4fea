//! # Spatial relations
//!
//! Pure tests for the spatial relations between placed objects, plus
//! `holding` and the trivial any-location relation. All tests run against a
//! [`Scene`], so they apply equally to the live world and to search
//! snapshots. A held object is at no column, which makes every
//! column-dependent relation involving it false.

use crate::world::{Form, Scene, FLOOR};

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    LeftOf,
    RightOf,
    Inside,
    OnTop,
    Under,
    Beside,
    Above,
    Holding,
    AnyLocation,
}

impl Relation {
    pub const ALL: [Relation; 9] = [
        Relation::LeftOf,
        Relation::RightOf,
        Relation::Inside,
        Relation::OnTop,
        Relation::Under,
        Relation::Beside,
        Relation::Above,
        Relation::Holding,
        Relation::AnyLocation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Relation::LeftOf => "leftof",
            Relation::RightOf => "rightof",
            Relation::Inside => "inside",
            Relation::OnTop => "ontop",
            Relation::Under => "under",
            Relation::Beside => "beside",
            Relation::Above => "above",
            Relation::Holding => "holding",
            Relation::AnyLocation => "anywhere",
        }
    }

    pub fn from_name(name: &str) -> Option<Relation> {
        match name {
            "leftof" => Some(Relation::LeftOf),
            "rightof" => Some(Relation::RightOf),
            "inside" => Some(Relation::Inside),
            "ontop" => Some(Relation::OnTop),
            "under" => Some(Relation::Under),
            "beside" => Some(Relation::Beside),
            "above" => Some(Relation::Above),
            "holding" => Some(Relation::Holding),
            "anywhere" => Some(Relation::AnyLocation),
            _ => None,
        }
    }

    /// How many object arguments a literal over this relation takes.
    pub fn arity(&self) -> usize {
        match self {
            Relation::Holding | Relation::AnyLocation => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for Relation {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests over scenes

pub fn leftof<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    match (s.column(a), s.column(b)) {
        (Some(ca), Some(cb)) => ca < cb,
        _ => false,
    }
}

pub fn rightof<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    leftof(s, b, a)
}

pub fn beside<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    match (s.column(a), s.column(b)) {
        (Some(ca), Some(cb)) => ca.abs_diff(cb) == 1,
        _ => false,
    }
}

pub fn inside<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    directly_over(s, a, b)
        && s.spec(b).map(|sp| sp.form) == Some(Form::Box)
}

pub fn ontop<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    if b == FLOOR {
        return matches!(s.position(a), Some((_, 0)));
    }
    directly_over(s, a, b)
        && s.spec(b).map(|sp| sp.form) != Some(Form::Box)
}

pub fn under<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    above(s, b, a)
}

pub fn above<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    if b == FLOOR {
        return s.position(a).is_some();
    }
    match (s.position(a), s.position(b)) {
        (Some((ca, ia)), Some((cb, ib))) => ca == cb && ia > ib,
        _ => false,
    }
}

pub fn holding<S: Scene>(s: &S, a: &str) -> bool {
    s.held().map(|x| x.as_str()) == Some(a)
}

fn directly_over<S: Scene>(s: &S, a: &str, b: &str) -> bool {
    match (s.position(a), s.position(b)) {
        (Some((ca, ia)), Some((cb, ib))) => ca == cb && ia == ib + 1,
        _ => false,
    }
}

/// Dispatch on a relation name. One-argument relations ignore `b`.
pub fn test<S: Scene>(s: &S, rel: Relation, a: &str, b: &str) -> bool {
    match rel {
        Relation::LeftOf => leftof(s, a, b),
        Relation::RightOf => rightof(s, a, b),
        Relation::Inside => inside(s, a, b),
        Relation::OnTop => ontop(s, a, b),
        Relation::Under => under(s, a, b),
        Relation::Beside => beside(s, a, b),
        Relation::Above => above(s, a, b),
        Relation::Holding => holding(s, a),
        Relation::AnyLocation => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Preset, Primitive};

    // small: [[e], [g l], [], [k m f], []]

    #[test]
    fn column_relations() {
        let w = Preset::named("small").unwrap().world;
        assert!(leftof(&w, "e", "g"));
        assert!(rightof(&w, "f", "l"));
        assert!(!leftof(&w, "g", "e"));
        assert!(beside(&w, "e", "l"));
        assert!(!beside(&w, "e", "f"));
    }

    #[test]
    fn stack_relations() {
        let w = Preset::named("small").unwrap().world;
        assert!(ontop(&w, "e", "floor"));
        assert!(!ontop(&w, "l", "floor"));
        assert!(ontop(&w, "l", "g"));
        assert!(inside(&w, "m", "k"));
        assert!(inside(&w, "f", "m"));
        assert!(!ontop(&w, "m", "k"), "directly over a box is inside");
        assert!(above(&w, "f", "k"));
        assert!(above(&w, "f", "floor"));
        assert!(under(&w, "k", "f"));
        assert!(!under(&w, "f", "k"));
    }

    #[test]
    fn held_objects_are_nowhere() {
        let mut w = Preset::named("small").unwrap().world;
        w.apply(Primitive::Pick).unwrap();
        assert!(holding(&w, "e"));
        assert!(!holding(&w, "f"));
        assert!(!leftof(&w, "e", "g"));
        assert!(!beside(&w, "e", "l"));
        assert!(!ontop(&w, "e", "floor"));
        assert!(!above(&w, "e", "floor"));
    }
}
