use bricklayer::planner::Plan;
use bricklayer::session::{Response, Session};
use bricklayer::world::{Preset, Primitive};

use clap::Parser;
use instant::Duration;
use serde::Serialize;
use std::io::Write;

/// A natural-language planner for a block world
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The preset world to load (small, medium, test)
    world: String,

    /// Utterances, example indices, or action strings; with none given,
    /// an interactive prompt is started
    inputs: Vec<String>,

    /// Planning timeout in milliseconds
    #[arg(short, long, value_name = "MILLISECONDS", default_value_t = 10_000)]
    timeout: u64,

    /// Print each chosen plan as JSON instead of animating it
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonPlan<'a> {
    input: &'a str,
    plan: &'a Plan,
}

fn show_plan(plan: &Plan) {
    let mut primitives: Vec<&str> = vec![];
    let flush = |primitives: &mut Vec<&str>| {
        if !primitives.is_empty() {
            println!("  {}", primitives.join(" "));
            primitives.clear();
        }
    };
    for token in &plan.tokens {
        if Primitive::from_token(token).is_some() {
            primitives.push(token);
        } else {
            flush(&mut primitives);
            if !token.starts_with('#') {
                println!("{}", token);
            }
        }
    }
    flush(&mut primitives);
}

/// Apply one input line to the session. Returns false when it failed.
fn step(session: &mut Session, input: &str, json: bool) -> bool {
    match session.handle(input) {
        Response::Plan(plan) => {
            if json {
                match serde_json::to_string_pretty(&JsonPlan {
                    input,
                    plan: &plan,
                }) {
                    Ok(s) => println!("{}", s),
                    Err(e) => println!("json error: {}", e),
                }
            } else {
                show_plan(&plan);
            }
            match session.world.execute(&plan.tokens) {
                Ok(()) => {
                    if !json {
                        print!("{}", session.world.render());
                    }
                    true
                }
                Err(e) => {
                    println!(
                        "{} {}",
                        ansi_term::Color::Red.bold().paint("error:"),
                        e
                    );
                    false
                }
            }
        }
        Response::Question(q) => {
            println!("{}", q);
            true
        }
        Response::Error(m) => {
            println!(
                "{} {}",
                ansi_term::Color::Red.bold().paint("error:"),
                m
            );
            false
        }
    }
}

fn repl(session: &mut Session, json: bool) {
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => (),
            Err(_) => return,
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" || line == "quit" || line == "exit" {
            return;
        }
        step(session, line, json);
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let preset = match Preset::named(&cli.world) {
        Some(p) => p,
        None => {
            println!(
                "{} unknown world '{}'; try one of: {}",
                ansi_term::Color::Red.bold().paint("error:"),
                cli.world,
                Preset::names().join(", ")
            );
            std::process::exit(1)
        }
    };

    let examples = preset.examples;
    let mut session = Session::new(
        preset.world,
        Duration::from_millis(cli.timeout),
    );

    if cli.inputs.is_empty() {
        repl(&mut session, cli.json);
        return;
    }

    let mut ok = true;
    for input in &cli.inputs {
        // A bare integer selects one of the world's example utterances.
        let resolved = match input.parse::<usize>() {
            Ok(i) if i < examples.len() => examples[i].to_owned(),
            Ok(i) => {
                println!(
                    "{} example index {} out of range (0..{})",
                    ansi_term::Color::Red.bold().paint("error:"),
                    i,
                    examples.len()
                );
                ok = false;
                continue;
            }
            Err(_) => input.clone(),
        };
        println!("# {}", resolved);
        if !step(&mut session, &resolved, cli.json) {
            ok = false;
        }
    }

    if !ok {
        std::process::exit(1)
    }
}
