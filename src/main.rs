// Purpose: Binary entry for the jsc command.
// Inputs/Outputs: Passes process args to the CLI dispatcher and exits with its code.
// Invariants: Argument parsing, logging setup and error printing all live in `cli::run_cli`.
// Gotchas: When a script is run, the exit code is the Java program's own status.

fn main() {
    let code = jsc::cli::run_cli(std::env::args().skip(1));
    std::process::exit(code);
}
