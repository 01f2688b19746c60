use std::process::ExitCode;

fn main() -> ExitCode {
    swapdesk_cli::run()
}
