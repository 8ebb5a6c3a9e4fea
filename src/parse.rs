//! # Parsing
//!
//! Two very different surfaces live here. Utterances are parsed by a small
//! list-of-successes grammar over lowercased word tokens: the grammar is
//! deliberately ambiguous (relative clauses may attach to the noun phrase or
//! to the target location), and every parse is returned so the interpreter
//! can weigh them all. The `dnf` escape-hatch formula grammar is
//! unambiguous and parsed with chumsky, with ariadne rendering its errors.

use crate::formula::{Conjunction, DnfFormula, Literal};
use crate::grammar::{Command, Entity, Location, Object, Quantifier};
use crate::relation::Relation;
use crate::world::{Color, Form, Size};

use chumsky::prelude::*;

////////////////////////////////////////////////////////////////////////////////
// Tokenization

/// Lowercase the input and strip every non-word character.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.to_owned())
        .collect()
}

/// Recognize a whitespace-separated sequence of primitive tokens. Any
/// other token disqualifies the whole argument.
pub fn action_tokens(input: &str) -> Option<Vec<String>> {
    let toks: Vec<String> =
        input.split_whitespace().map(|t| t.to_owned()).collect();
    if !toks.is_empty()
        && toks.iter().all(|t| matches!(t.as_str(), "l" | "r" | "p" | "d"))
    {
        Some(toks)
    } else {
        None
    }
}

////////////////////////////////////////////////////////////////////////////////
// Utterance grammar

type Toks<'a> = &'a [String];

fn kw(toks: Toks, i: usize, words: &[&str]) -> Option<usize> {
    if toks.len() < i + words.len() {
        return None;
    }
    if words.iter().zip(&toks[i..]).all(|(w, t)| t == w) {
        Some(i + words.len())
    } else {
        None
    }
}

fn size_word(tok: &str) -> Option<Size> {
    match tok {
        "small" | "tiny" => Some(Size::Small),
        "large" | "big" => Some(Size::Large),
        _ => None,
    }
}

fn color_word(tok: &str) -> Option<Color> {
    match tok {
        "red" => Some(Color::Red),
        "black" => Some(Color::Black),
        "blue" => Some(Color::Blue),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "white" => Some(Color::White),
        _ => None,
    }
}

fn form_word(tok: &str) -> Option<Form> {
    match tok {
        "brick" | "bricks" => Some(Form::Brick),
        "plank" | "planks" => Some(Form::Plank),
        "ball" | "balls" => Some(Form::Ball),
        "pyramid" | "pyramids" => Some(Form::Pyramid),
        "box" | "boxes" => Some(Form::Box),
        "table" | "tables" => Some(Form::Table),
        "object" | "objects" | "thing" | "things" | "form" | "forms"
        | "one" | "ones" => Some(Form::AnyForm),
        _ => None,
    }
}

/// All (size, color, end) readings of the attribute words at `i`.
fn attributes(toks: Toks, i: usize) -> Vec<(Size, Color, usize)> {
    let mut out = vec![(Size::Unspecified, Color::Unspecified, i)];
    if let Some(sz) = toks.get(i).and_then(|t| size_word(t)) {
        out.push((sz, Color::Unspecified, i + 1));
        if let Some(col) = toks.get(i + 1).and_then(|t| color_word(t)) {
            out.push((sz, col, i + 2));
        }
    }
    if let Some(col) = toks.get(i).and_then(|t| color_word(t)) {
        out.push((Size::Unspecified, col, i + 1));
        if let Some(sz) = toks.get(i + 1).and_then(|t| size_word(t)) {
            out.push((sz, col, i + 2));
        }
    }
    out
}

fn objects(toks: Toks, i: usize) -> Vec<(Object, usize)> {
    let mut out = vec![];
    for (size, color, j) in attributes(toks, i) {
        let form = match toks.get(j).and_then(|t| form_word(t)) {
            Some(form) => form,
            None => continue,
        };
        let base = Object::simple(size, color, form);
        out.push((base.clone(), j + 1));
        let mut starts = vec![j + 1];
        for link in [&["that", "is"][..], &["that", "are"][..]] {
            if let Some(s) = kw(toks, j + 1, link) {
                starts.push(s);
            }
        }
        for s in starts {
            for (loc, m) in locations(toks, s) {
                out.push((Object::relative(base.clone(), loc), m));
            }
        }
    }
    out
}

fn entities(toks: Toks, i: usize) -> Vec<(Entity, usize)> {
    let mut out = vec![];
    if let Some(j) = kw(toks, i, &["the", "floor"]) {
        out.push((
            Entity {
                quantifier: Quantifier::The,
                object: Object::simple(
                    Size::Unspecified,
                    Color::Unspecified,
                    Form::Floor,
                ),
            },
            j,
        ));
    }
    let (quantifier, j) = match toks.get(i).map(|t| t.as_str()) {
        Some("a") | Some("an") | Some("any") => (Quantifier::Any, i + 1),
        Some("the") => (Quantifier::The, i + 1),
        Some("all") | Some("every") => (Quantifier::All, i + 1),
        _ => (Quantifier::Any, i),
    };
    for (object, k) in objects(toks, j) {
        out.push((Entity { quantifier, object }, k));
    }
    out
}

fn relation_heads(toks: Toks, i: usize) -> Vec<(Relation, usize)> {
    let patterns: &[(&[&str], Relation)] = &[
        (&["left", "of"], Relation::LeftOf),
        (&["to", "the", "left", "of"], Relation::LeftOf),
        (&["right", "of"], Relation::RightOf),
        (&["to", "the", "right", "of"], Relation::RightOf),
        (&["inside"], Relation::Inside),
        (&["in"], Relation::Inside),
        (&["into"], Relation::Inside),
        (&["on", "top", "of"], Relation::OnTop),
        (&["on"], Relation::OnTop),
        (&["onto"], Relation::OnTop),
        (&["to"], Relation::OnTop),
        (&["under"], Relation::Under),
        (&["below"], Relation::Under),
        (&["beside"], Relation::Beside),
        (&["next", "to"], Relation::Beside),
        (&["above"], Relation::Above),
    ];
    let mut out = vec![];
    for (words, rel) in patterns {
        if let Some(j) = kw(toks, i, words) {
            out.push((*rel, j));
        }
    }
    out
}

fn locations(toks: Toks, i: usize) -> Vec<(Location, usize)> {
    let mut out = vec![];
    if let Some(j) = kw(toks, i, &["at", "any", "location"]) {
        out.push((Location::Anywhere, j));
    }
    if let Some(j) = kw(toks, i, &["anywhere"]) {
        out.push((Location::Anywhere, j));
    }
    if let Some(j) = kw(toks, i, &["being", "held"]) {
        out.push((Location::Held, j));
    }
    for (relation, j) in relation_heads(toks, i) {
        for (entity, k) in entities(toks, j) {
            out.push((Location::Relative { relation, entity }, k));
        }
    }
    out
}

fn after_politeness(toks: Toks) -> usize {
    let prefixes: &[&[&str]] = &[
        &["please"],
        &["will", "you"],
        &["can", "you"],
        &["could", "you"],
        &["would", "you"],
    ];
    let mut i = 0;
    loop {
        match prefixes.iter().find_map(|p| kw(toks, i, p)) {
            Some(j) => i = j,
            None => return i,
        }
    }
}

fn finished(toks: Toks, i: usize) -> bool {
    i == toks.len() || kw(toks, i, &["please"]) == Some(toks.len())
}

/// Every command parse of an utterance, in grammar order, deduplicated.
pub fn commands(input: &str) -> Vec<Command> {
    let toks = tokenize(input);
    let i = after_politeness(&toks);
    let mut out: Vec<Command> = vec![];
    let mut push = |cmd: Command, out: &mut Vec<Command>| {
        if !out.contains(&cmd) {
            out.push(cmd);
        }
    };

    for verb in [&["take"][..], &["grasp"][..], &["pick", "up"][..]] {
        if let Some(j) = kw(&toks, i, verb) {
            for (ent, k) in entities(&toks, j) {
                if finished(&toks, k) {
                    push(Command::Take(ent), &mut out);
                }
            }
        }
    }
    for verb in [&["move"][..], &["put"][..], &["drop"][..]] {
        if let Some(j) = kw(&toks, i, verb) {
            if let Some(j2) = kw(&toks, j, &["it"]) {
                for (loc, k) in locations(&toks, j2) {
                    if finished(&toks, k) {
                        push(Command::Drop(loc), &mut out);
                    }
                }
            }
            for (ent, k) in entities(&toks, j) {
                for (loc, m) in locations(&toks, k) {
                    if finished(&toks, m) {
                        push(Command::Move(ent.clone(), loc), &mut out);
                    }
                }
            }
        }
    }
    // A bare noun phrase is a clarification of some earlier command.
    if out.is_empty() {
        for ent in clarifications(input) {
            out.push(Command::Clarify(ent));
        }
    }
    out
}

/// Every full-coverage noun-phrase parse of a clarification reply.
pub fn clarifications(input: &str) -> Vec<Entity> {
    let toks = tokenize(input);
    let mut out: Vec<Entity> = vec![];
    for (ent, k) in entities(&toks, 0) {
        if k == toks.len() && !out.contains(&ent) {
            out.push(ent);
        }
    }
    out
}

////////////////////////////////////////////////////////////////////////////////
// The dnf escape-hatch formula grammar

// Shorthand

trait P<T>: Parser<char, T, Error = Simple<char>> {}
impl<S, T> P<T> for S where S: Parser<char, T, Error = Simple<char>> {}

/// Render a formula error as an ariadne report. Literal-level problems
/// (unknown relation, wrong arity) carry their own message; anything else
/// is a shape problem, answered with a reminder of the formula grammar
/// and the relation vocabulary.
fn report(src: &str, err: &Simple<char>) -> String {
    use ariadne::*;
    use chumsky::error::SimpleReason;

    let span = err.span();
    let (label, note) = match err.reason() {
        SimpleReason::Custom(message) => (
            message.clone(),
            "literals are written relation(a) or relation(a,b)"
                .to_owned(),
        ),
        _ => (
            "the formula cannot continue this way".to_owned(),
            format!(
                "a literal reads like ontop(a,floor) and may be negated \
                 with '-'; join literals with '&' and alternative goals \
                 with '|'; the relations are {}",
                Relation::ALL
                    .iter()
                    .map(|r| r.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ),
    };

    let mut buf: Vec<u8> = vec![];
    let written = Report::build(ReportKind::Error, "formula", span.start)
        .with_message("cannot read this goal formula")
        .with_label(
            Label::new(("formula", span))
                .with_message(label.clone())
                .with_color(Color::Red),
        )
        .with_note(note)
        .finish()
        .write(sources(vec![("formula", src)]), &mut buf);
    match written {
        Ok(()) => String::from_utf8(buf).unwrap_or(label),
        Err(_) => label,
    }
}

fn ident() -> impl P<String> {
    filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
        .repeated()
        .at_least(1)
        .collect()
}

fn literal() -> impl P<Literal> {
    just('-')
        .or_not()
        .then(ident())
        .then(
            ident()
                .padded()
                .separated_by(just(','))
                .at_least(1)
                .at_most(2)
                .delimited_by(just('('), just(')')),
        )
        .try_map(|((neg, name), args), span: std::ops::Range<usize>| {
            let relation = Relation::from_name(&name).ok_or_else(|| {
                Simple::custom(
                    span.clone(),
                    format!("unknown relation '{}'", name),
                )
            })?;
            if args.len() != relation.arity() {
                return Err(Simple::custom(
                    span,
                    format!(
                        "'{}' takes {} argument(s), got {}",
                        name,
                        relation.arity(),
                        args.len()
                    ),
                ));
            }
            Ok(Literal {
                relation,
                args,
                polarity: neg.is_none(),
            })
        })
}

fn formula() -> impl P<DnfFormula> {
    literal()
        .padded()
        .separated_by(just('&'))
        .at_least(1)
        .map(Conjunction)
        .separated_by(just('|'))
        .at_least(1)
        .map(DnfFormula)
        .then_ignore(end())
}

/// Parse the textual DNF grammar. The error string is an ariadne report.
pub fn dnf(src: &str) -> Result<DnfFormula, String> {
    formula()
        .parse(src)
        .map_err(|errs| report(src, &errs[0]))
}
