mod cli;

use std::io::{self, BufRead, BufReader};

use clap::Parser;
use cli::Cli;
use kword::{
    config,
    script::{read_script, Edit},
    Session,
};
use log::error;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut session = Session::new(config::load(cli.config.as_deref())?)?;

    let mut edits = Vec::new();
    if let Some(input) = &cli.input {
        let reader: Box<dyn BufRead> = match input.as_str() {
            "-" => Box::new(BufReader::new(io::stdin())),
            filename => Box::new(BufReader::new(std::fs::File::open(filename)?)),
        };
        edits.extend(read_script(reader)?);
    }
    for term in &cli.set {
        edits.push(Edit::parse(term)?);
    }

    for edit in &edits {
        match edit.apply(&mut session) {
            Ok(()) if cli.trace => println!("{}\n", session.annotation_text()),
            Ok(()) => {}
            Err(e) => error!("{}={} rejected: {}", edit.control, edit.option, e),
        }
    }

    println!("{}", cli::render(&session, cli.flags));
    Ok(())
}
