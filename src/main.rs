use std::process::ExitCode;

fn main() -> ExitCode {
    match basilisk_chat::cli::main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err}");
            ExitCode::FAILURE
        }
    }
}
