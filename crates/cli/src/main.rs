use std::process::ExitCode;

fn main() -> ExitCode {
    finda_cli::run()
}
