use std::io::{self, Write};
use upgrade_steps::core::output::Context;

fn main() {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let code = match Context::from_env(&mut stdout, &mut stderr) {
        Ok(mut ctx) => upgrade_steps::main_with_args(std::env::args_os(), &mut ctx),
        Err(e) => {
            eprintln!("error: {}", e);
            upgrade_steps::EXIT_CONTEXT_FAILURE
        }
    };
    let _ = stdout.flush();
    std::process::exit(code);
}
