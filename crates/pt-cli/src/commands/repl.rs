use std::io::{self, BufRead, Write};

use colored::Colorize;

use pt_dicecore::command::strip_command_prefix;

use crate::SessionArgs;

use super::Session;

pub async fn run(args: &SessionArgs) -> Result<(), String> {
    let mut session = Session::open(args)?;

    println!("  {} dice session as {}", "Starting".bold(), session.context.username);
    println!("  Type a command such as 'r d100 侦查', 'quit' to exit.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().map_err(|e| e.to_string())?;

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("q") {
            break;
        }

        let text = strip_command_prefix(input).unwrap_or(input);
        match session.execute(text).await {
            Ok(true) => println!(),
            Ok(false) => println!("{}\n", "(no roll)".yellow()),
            Err(e) => println!("{}\n", e.yellow()),
        }
    }

    Ok(())
}
