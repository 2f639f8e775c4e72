use clap::Parser;
use std::env;
use std::io::{self, Write};

mod commands;

use commands::run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "gamefuck", disable_help_flag = true)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("gamefuck"));

    let cli = Cli::parse();

    // Interrupt is the only way out of a blocking read; leave the streams flushed.
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        std::process::exit(130);
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
    }

    let code = commands::run::run(&program, cli.run);
    std::process::exit(code);
}
