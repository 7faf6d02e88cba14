use std::fs::OpenOptions;
use std::io::{self, Read};
use std::process;

use clap::Parser;

use bytepatch::{parse_script, Session};

/// Exit status when the script parses and runs to quit without failure.
const EXIT_OK: i32 = 0;
/// Exit status when an `e` verification found the file not as expected.
const EXIT_EXPECT: i32 = 1;
/// Exit status for every other failure (usage, parse, I/O).
const EXIT_ERROR: i32 = 2;

const COMMAND_SUMMARY: &str = "\
Commands:
  bN        go to byte N of the file
  lN        go to the start of line N (1-indexed)
  p         print 100 bytes from the cursor
  pN        print N bytes from the cursor
  e/str/    compare str to the bytes at the cursor, fail if not equal
  w/str/    write str at the cursor
  q         quit editing (implicit at end of script)
  #         comment out the rest of the line

Example:
  bytepatch greeting.txt <<EOF
  b6        # go to byte 6
  e/world/  # check for string 'world'
  b6
  w/earth/  # write string 'earth'
  q
  EOF
";

/// Scriptable in-place file editor.
///
/// Reads an edit script from stdin (or from -e) and applies it to FILE,
/// seeking, printing, verifying, and overwriting bytes in place.
#[derive(Parser)]
#[command(name = "bytepatch", version, after_help = COMMAND_SUMMARY)]
struct Cli {
    /// File to edit in place (opened read+write, never truncated)
    file: String,

    /// Edit script; when absent the script is read from stdin
    #[arg(short = 'e', long = "script")]
    script: Option<String>,
}

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let source = match cli.script {
        Some(s) => s,
        None => {
            let mut s = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut s) {
                eprintln!("error: failed to read script from stdin: {e}");
                return EXIT_ERROR;
            }
            s
        }
    };

    let program = match parse_script(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_ERROR;
        }
    };

    let file = match OpenOptions::new().read(true).write(true).open(&cli.file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: failed to open {}: {e}", cli.file);
            return EXIT_ERROR;
        }
    };

    let mut session = Session::new(file);
    let mut stdout = io::stdout().lock();
    match session.run(&program, &mut stdout) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_expect_failure() {
                EXIT_EXPECT
            } else {
                EXIT_ERROR
            }
        }
    }
}
