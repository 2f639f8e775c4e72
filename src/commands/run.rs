use clap::Args;
use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use gamefuck::cli_util::{print_interpreter_error, print_preprocess_error, print_warning};
use gamefuck::config::{self, Palette};
use gamefuck::{Debugger, HeadlessDisplay, Interpreter, Program};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Source file to run
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Disable colored debugger output (also honored: NO_COLOR)
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Frame rate for ':' in Hz, 0 for unpaced (fallback GAMEFUCK_FPS; default from config or 60)
    #[arg(long = "fps", value_name = "HZ")]
    pub fps: Option<u32>,

    /// Log internal events to stderr; repeat for more detail (fallback GAMEFUCK_LOG)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        file,
        no_color,
        fps,
        verbose,
        ..
    } = args;

    init_logging(verbose);

    let Some(path) = file else {
        eprintln!("{program}: Error: expected source file argument");
        let _ = io::stderr().flush();
        return 1;
    };

    let raw = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{program}: Error: failed to open '{}': {e}", path.display());
            let _ = io::stderr().flush();
            return 1;
        }
    };

    let parsed = match Program::parse(&raw) {
        Ok(p) => p,
        Err(e) => {
            print_preprocess_error(Some(program), &e);
            return 1;
        }
    };
    for warning in parsed.warnings() {
        print_warning(Some(program), warning);
    }

    // Resolve settings: flags -> env -> config file -> defaults
    let settings = config::load();
    let frame_rate = fps
        .or_else(|| env::var("GAMEFUCK_FPS").ok().and_then(|s| s.parse::<u32>().ok()))
        .unwrap_or(settings.frame_rate);
    let palette = if use_color(no_color) { settings.palette } else { Palette::plain() };

    // Kept for error context; the interpreter takes ownership of the program.
    let code = parsed.code().to_vec();
    let mut vm = Interpreter::new(parsed)
        .with_display(HeadlessDisplay::new(frame_rate))
        .with_debugger(Debugger::new(palette, settings.layout));

    let exit_code = match vm.run() {
        Ok(()) => 0,
        Err(err) => {
            print_interpreter_error(Some(program), &code, &err);
            1
        }
    };

    let _ = io::stdout().flush();
    exit_code
}

fn use_color(no_color: bool) -> bool {
    !no_color && env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => env::var("GAMEFUCK_LOG")
            .ok()
            .and_then(|s| s.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Off),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if level == LevelFilter::Off {
        return;
    }
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logging: {e}");
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} [OPTIONS] <FILE>   # Run a program loaded from FILE

Options:
  --no-color       Disable colored debugger output
  --fps <HZ>       Frame rate for ':' (0 = unpaced; default 60)
  --verbose, -v    Log internal events to stderr (-vv for more)
  --help,    -h    Show this help

Instructions:
  + - < > . , [ ]  Brainfuck; the tape grows to the right, '<' at cell 0 is an error
  #                Break into the debugger (step, quit, continue, memory [hex addr])
  p                Print the current cell in hex to stderr
  r l u d          Move the drawing cursor right/left/up/down (wrapping)
  '                Paint the pixel under the cursor with the current cell (gray)
  :                Present the frame
  ;                Store the last pressed key in the current cell (0 if none)
  P                Print the cursor position to stderr

Notes:
- Whitespace and {{ nested {{ comments }} }} are ignored; any other character is a no-op.
- Text after the first '!' is embedded input, read by ',' before stdin.
- On end of input the current cell is set to 0.
- Settings are read from gamefuck.toml in the XDG config directory.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
