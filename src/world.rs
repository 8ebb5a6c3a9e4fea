//! # Block world model
//!
//! This module defines the shared world state: columns of stacked objects, a
//! robot arm that is either empty or holding one object, and the catalogue of
//! object attributes. It also defines the four arm primitives and the
//! executor that applies them, plus the compiled-in preset worlds used by the
//! command-line driver.

use crate::physics;

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// Object attributes

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    Brick,
    Plank,
    Ball,
    Pyramid,
    Box,
    Table,
    Floor,
    AnyForm,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Form::Brick => "brick",
            Form::Plank => "plank",
            Form::Ball => "ball",
            Form::Pyramid => "pyramid",
            Form::Box => "box",
            Form::Table => "table",
            Form::Floor => "floor",
            Form::AnyForm => "object",
        };
        write!(f, "{}", word)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Large,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Blue,
    Green,
    Yellow,
    White,
    Unspecified,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Size::Small => "small",
            Size::Large => "large",
            Size::Unspecified => "",
        };
        write!(f, "{}", word)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Color::Red => "red",
            Color::Black => "black",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::White => "white",
            Color::Unspecified => "",
        };
        write!(f, "{}", word)
    }
}

/// The attributes of one object in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectSpec {
    pub form: Form,
    pub size: Size,
    pub color: Color,
}

impl ObjectSpec {
    pub const fn new(size: Size, color: Color, form: Form) -> Self {
        ObjectSpec { form, size, color }
    }
}

/// Objects are referred to by short identifiers; the pseudo-object `floor`
/// has a fixed identifier and never appears in any stack.
pub type ObjectId = String;

pub const FLOOR: &str = "floor";

pub(crate) const FLOOR_SPEC: ObjectSpec = ObjectSpec {
    form: Form::Floor,
    size: Size::Unspecified,
    color: Color::Unspecified,
};

////////////////////////////////////////////////////////////////////////////////
// Scenes

/// Read access to an arrangement of stacks, an arm, and an object catalogue.
///
/// Both the live [`World`] and the snapshots branched by the planner expose
/// this view, so the relation predicates and goal checks can run against
/// either without copying.
pub trait Scene {
    fn stack_count(&self) -> usize;
    fn height(&self, col: usize) -> usize;
    fn item(&self, col: usize, idx: usize) -> Option<&ObjectId>;
    fn held(&self) -> Option<&ObjectId>;
    fn arm(&self) -> usize;
    fn catalogue(&self) -> &IndexMap<ObjectId, ObjectSpec>;

    /// The attributes of `id`, with `floor` resolving to its fixed spec.
    fn spec(&self, id: &str) -> Option<&ObjectSpec> {
        if id == FLOOR {
            Some(&FLOOR_SPEC)
        } else {
            self.catalogue().get(id)
        }
    }

    /// Column and stack index of a placed object. A held object is at no
    /// position, and `floor` never has one.
    fn position(&self, id: &str) -> Option<(usize, usize)> {
        for col in 0..self.stack_count() {
            for idx in 0..self.height(col) {
                if self.item(col, idx).map(|x| x.as_str()) == Some(id) {
                    return Some((col, idx));
                }
            }
        }
        None
    }

    fn column(&self, id: &str) -> Option<usize> {
        self.position(id).map(|(col, _)| col)
    }

    fn top(&self, col: usize) -> Option<&ObjectId> {
        let h = self.height(col);
        if h == 0 {
            None
        } else {
            self.item(col, h - 1)
        }
    }

    /// Whether an object with spec `spec` may be released over column `col`
    /// in this scene (onto the top object, or onto the floor if empty).
    fn accepts(&self, col: usize, spec: &ObjectSpec) -> bool {
        match self.top(col).and_then(|id| self.spec(id)) {
            Some(below) => physics::can_place(spec, below),
            None => true,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// World state

/// The full mutable world. Shared read-only through interpretation and
/// planning; mutated only by the executor applying a finished plan.
#[derive(Debug, Clone, Serialize)]
pub struct World {
    /// Bottom-first stacks, one per column.
    pub stacks: Vec<Vec<ObjectId>>,
    pub holding: Option<ObjectId>,
    pub arm: usize,
    pub objects: IndexMap<ObjectId, ObjectSpec>,
}

impl Scene for World {
    fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    fn height(&self, col: usize) -> usize {
        self.stacks.get(col).map(|s| s.len()).unwrap_or(0)
    }

    fn item(&self, col: usize, idx: usize) -> Option<&ObjectId> {
        self.stacks.get(col)?.get(idx)
    }

    fn held(&self) -> Option<&ObjectId> {
        self.holding.as_ref()
    }

    fn arm(&self) -> usize {
        self.arm
    }

    fn catalogue(&self) -> &IndexMap<ObjectId, ObjectSpec> {
        &self.objects
    }
}

////////////////////////////////////////////////////////////////////////////////
// Arm primitives and the executor

/// The four arm primitives, emitted as the single-letter tokens
/// `l`, `r`, `p`, `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Left,
    Right,
    Pick,
    Drop,
}

impl Primitive {
    pub fn token(&self) -> &'static str {
        match self {
            Primitive::Left => "l",
            Primitive::Right => "r",
            Primitive::Pick => "p",
            Primitive::Drop => "d",
        }
    }

    pub fn from_token(tok: &str) -> Option<Primitive> {
        match tok {
            "l" => Some(Primitive::Left),
            "r" => Some(Primitive::Right),
            "p" => Some(Primitive::Pick),
            "d" => Some(Primitive::Drop),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// An action token was illegal in the current world. Fatal to the plan
/// being executed; the world is left as it was before the bad token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecError {
    pub message: String,
}

impl ExecError {
    fn new(message: impl Into<String>) -> Self {
        ExecError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExecError {}

impl World {
    /// Apply one arm primitive, checking legality.
    pub fn apply(&mut self, p: Primitive) -> Result<(), ExecError> {
        match p {
            Primitive::Left => {
                if self.arm == 0 {
                    return Err(ExecError::new(
                        "the arm is already at the leftmost column",
                    ));
                }
                self.arm -= 1;
            }
            Primitive::Right => {
                if self.arm + 1 >= self.stacks.len() {
                    return Err(ExecError::new(
                        "the arm is already at the rightmost column",
                    ));
                }
                self.arm += 1;
            }
            Primitive::Pick => {
                if self.holding.is_some() {
                    return Err(ExecError::new(
                        "the arm is already holding something",
                    ));
                }
                match self.stacks[self.arm].pop() {
                    Some(id) => self.holding = Some(id),
                    None => {
                        return Err(ExecError::new(
                            "there is nothing to pick up here",
                        ))
                    }
                }
            }
            Primitive::Drop => {
                let held = match self.holding.clone() {
                    Some(id) => id,
                    None => {
                        return Err(ExecError::new(
                            "the arm is not holding anything",
                        ))
                    }
                };
                let spec = match self.spec(&held) {
                    Some(s) => *s,
                    None => {
                        return Err(ExecError::new(format!(
                            "unknown object '{}'",
                            held
                        )))
                    }
                };
                if !self.accepts(self.arm, &spec) {
                    return Err(ExecError::new(format!(
                        "cannot drop the {} here",
                        spec.form
                    )));
                }
                self.stacks[self.arm].push(held);
                self.holding = None;
            }
        }
        Ok(())
    }

    /// Apply every primitive token of a plan in order, ignoring annotation
    /// tokens. Stops at the first illegal primitive.
    pub fn execute(&mut self, tokens: &[String]) -> Result<(), ExecError> {
        for tok in tokens {
            if let Some(p) = Primitive::from_token(tok) {
                self.apply(p)?;
            }
        }
        Ok(())
    }

    /// A one-line-per-column rendering for the text driver.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (col, stack) in self.stacks.iter().enumerate() {
            let marker = if col == self.arm { "*" } else { " " };
            out.push_str(&format!(
                "{}{:>2}: {}\n",
                marker,
                col,
                stack.join(" ")
            ));
        }
        match &self.holding {
            Some(id) => out.push_str(&format!("holding: {}\n", id)),
            None => out.push_str("holding: -\n"),
        }
        out
    }
}

////////////////////////////////////////////////////////////////////////////////
// Preset worlds

/// A compiled-in world together with example utterances addressable by
/// index from the command line.
pub struct Preset {
    pub world: World,
    pub examples: Vec<&'static str>,
}

fn standard_catalogue() -> IndexMap<ObjectId, ObjectSpec> {
    use Color::*;
    use Form::*;
    use Size::*;

    IndexMap::from([
        ("a".to_owned(), ObjectSpec::new(Large, Green, Brick)),
        ("b".to_owned(), ObjectSpec::new(Small, White, Brick)),
        ("c".to_owned(), ObjectSpec::new(Large, Red, Plank)),
        ("d".to_owned(), ObjectSpec::new(Small, Green, Plank)),
        ("e".to_owned(), ObjectSpec::new(Large, White, Ball)),
        ("f".to_owned(), ObjectSpec::new(Small, Black, Ball)),
        ("g".to_owned(), ObjectSpec::new(Large, Blue, Table)),
        ("h".to_owned(), ObjectSpec::new(Small, Red, Table)),
        ("i".to_owned(), ObjectSpec::new(Large, Yellow, Pyramid)),
        ("j".to_owned(), ObjectSpec::new(Small, Red, Pyramid)),
        ("k".to_owned(), ObjectSpec::new(Large, Yellow, Box)),
        ("l".to_owned(), ObjectSpec::new(Large, Red, Box)),
        ("m".to_owned(), ObjectSpec::new(Small, Blue, Box)),
    ])
}

fn stacks(spec: &[&[&str]]) -> Vec<Vec<ObjectId>> {
    spec.iter()
        .map(|col| col.iter().map(|id| (*id).to_owned()).collect())
        .collect()
}

impl Preset {
    /// Look up a preset world by name.
    pub fn named(name: &str) -> Option<Preset> {
        match name {
            "small" => Some(Preset {
                world: World {
                    stacks: stacks(&[
                        &["e"],
                        &["g", "l"],
                        &[],
                        &["k", "m", "f"],
                        &[],
                    ]),
                    holding: None,
                    arm: 0,
                    objects: standard_catalogue(),
                },
                examples: vec![
                    "take the white ball",
                    "put the black ball in a box on the floor",
                    "put all balls on the floor",
                    "move the large box under a pyramid",
                    "take a blue object",
                ],
            }),
            "medium" => Some(Preset {
                world: World {
                    stacks: stacks(&[
                        &["e"],
                        &["a", "l"],
                        &[],
                        &[],
                        &["i", "h", "j"],
                        &[],
                        &[],
                        &["k", "g", "c", "b"],
                        &[],
                        &["d", "m", "f"],
                    ]),
                    holding: None,
                    arm: 0,
                    objects: standard_catalogue(),
                },
                examples: vec![
                    "put the brick that is to the left of a pyramid in a box",
                    "put the white ball in a box on the floor",
                    "move the large ball inside a yellow box on the floor",
                    "take the yellow pyramid",
                    "put a small object beside a large object",
                ],
            }),
            "test" => {
                use Color::*;
                use Form::*;
                use Size::*;
                Some(Preset {
                    world: World {
                        stacks: stacks(&[
                            &["e", "l"],
                            &["g", "m"],
                            &["k", "j"],
                        ]),
                        holding: None,
                        arm: 0,
                        objects: IndexMap::from([
                            (
                                "e".to_owned(),
                                ObjectSpec::new(Large, Green, Brick),
                            ),
                            (
                                "l".to_owned(),
                                ObjectSpec::new(Small, White, Ball),
                            ),
                            (
                                "g".to_owned(),
                                ObjectSpec::new(Large, Blue, Table),
                            ),
                            (
                                "m".to_owned(),
                                ObjectSpec::new(Small, Red, Pyramid),
                            ),
                            (
                                "k".to_owned(),
                                ObjectSpec::new(Large, Yellow, Box),
                            ),
                            (
                                "j".to_owned(),
                                ObjectSpec::new(Small, Yellow, Pyramid),
                            ),
                        ]),
                    },
                    examples: vec![
                        "take the white ball",
                        "put the white ball in a box",
                        "put it beside the yellow pyramid",
                    ],
                })
            }
            _ => None,
        }
    }

    pub fn names() -> &'static [&'static str] {
        &["small", "medium", "test"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_well_formed() {
        for name in Preset::names() {
            let p = Preset::named(name).unwrap();
            let w = &p.world;
            assert!(w.arm < w.stacks.len());
            let mut seen = std::collections::HashSet::new();
            for stack in &w.stacks {
                for id in stack {
                    assert!(w.objects.contains_key(id), "{} unknown", id);
                    assert!(seen.insert(id.clone()), "{} duplicated", id);
                    assert_ne!(id, FLOOR);
                }
            }
        }
    }

    #[test]
    fn pick_and_drop_round_trip() {
        let mut w = Preset::named("small").unwrap().world;
        w.apply(Primitive::Pick).unwrap();
        assert_eq!(w.holding.as_deref(), Some("e"));
        assert!(w.stacks[0].is_empty());
        w.apply(Primitive::Drop).unwrap();
        assert_eq!(w.holding, None);
        assert_eq!(w.stacks[0], vec!["e".to_owned()]);
    }

    #[test]
    fn illegal_moves_are_rejected() {
        let mut w = Preset::named("small").unwrap().world;
        assert!(w.apply(Primitive::Left).is_err());
        assert!(w.apply(Primitive::Drop).is_err());
        w.apply(Primitive::Pick).unwrap();
        assert!(w.apply(Primitive::Pick).is_err());
        // A held ball may not be dropped onto another ball.
        for _ in 0..3 {
            w.apply(Primitive::Right).unwrap();
        }
        assert!(w.apply(Primitive::Drop).is_err());
    }
}
