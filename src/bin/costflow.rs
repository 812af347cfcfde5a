use clap::{clap_app, ArgMatches};
use costflow::{Config, Costflow};
use std::io::{self, Read};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_from(matches: &ArgMatches) -> Config {
    let mut config = Config::default();
    if let Some(currency) = matches.value_of("currency") {
        config = config.with_default_currency(currency);
    }
    for formula in matches.values_of("formula").into_iter().flatten() {
        match formula.split_once('=') {
            Some((name, template)) => config = config.with_formula(name.trim(), template),
            None => log::warn!("Ignored formula {:?}: expected NAME=TEMPLATE.", formula),
        }
    }
    config
}

/// Blocks of stdin separated by blank lines.
fn stdin_blocks() -> io::Result<Vec<String>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let mut blocks = vec![];
    let mut block = vec![];
    for line in input.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                blocks.push(block.join("\n"));
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        blocks.push(block.join("\n"));
    }
    Ok(blocks)
}

fn main() {
    pretty_env_logger::init();
    let matches = clap_app!(costflow =>
        (version: VERSION)
        (about: "Compiles costflow shorthand into beancount entries")
        (@arg currency: -c --currency +takes_value "Default currency, CNY if not given")
        (@arg formula: -f --formula +takes_value +multiple number_of_values(1) "A formula as NAME=TEMPLATE")
        (@arg INPUT: ... "Inputs to interpret; read from stdin if none")
    )
    .get_matches();
    let costflow = Costflow::new(config_from(&matches));

    let inputs = match matches.values_of("INPUT") {
        Some(values) => values.map(str::to_string).collect(),
        None => match stdin_blocks() {
            Ok(blocks) => blocks,
            Err(e) => {
                eprintln!("Couldn't read stdin: {}", e);
                std::process::exit(1);
            }
        },
    };
    for input in inputs {
        println!("{}\n", costflow.interpret(&input));
    }
}
