use clap::Parser;
use kword::Session;
use std::fmt::Write;

#[derive(Parser)]
#[command(name = "kword")]
#[command(version = "0.1")]
#[command(about = "Packs microcode control selections into K register values", long_about = None)]
pub(crate) struct Cli {
    /// Control configuration file (defaults to the built-in YARC layout)
    #[arg(short, long)]
    pub(crate) config: Option<String>,

    /// Edit script, one `control=option` per line ("-" for stdin)
    #[arg(short, long)]
    pub(crate) input: Option<String>,

    /// Extra edits applied after the script
    #[arg(short, long = "set", value_name = "CONTROL=OPTION")]
    pub(crate) set: Vec<String>,

    /// Print the microcode after every accepted edit
    #[arg(long)]
    pub(crate) trace: bool,

    /// Also print enabled controls and visible arrows
    #[arg(short, long)]
    pub(crate) flags: bool,
}

/// Annotation text, optionally followed by the flag tables.
pub(crate) fn render(session: &Session, flags: bool) -> String {
    let mut out = session.annotation_text();
    if flags {
        out.push_str("\n\nenabled:");
        for (name, enabled) in session.enabled_flags() {
            let _ = write!(out, "\n  {:<16}{}", name, if enabled { "yes" } else { "no" });
        }
        out.push_str("\nvisible:");
        for (name, visible) in session.visible_flags() {
            let _ = write!(out, "\n  {:<16}{}", name, if visible { "yes" } else { "no" });
        }
    }
    out
}
