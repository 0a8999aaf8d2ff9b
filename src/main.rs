use std::process::ExitCode;

#[cfg(feature = "cli")]
mod cli;

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tanakh-reader: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() -> ExitCode {
    eprintln!("tanakh-reader was built without the `cli` feature; only the library is available.");
    ExitCode::FAILURE
}
