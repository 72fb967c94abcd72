use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Playback runs on Rc-based state, so everything stays on this thread.
    let local = tokio::task::LocalSet::new();
    let result = local.run_until(patternflow::cli::run()).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(patternflow::errors::get_exit_code(&e))
        }
    }
}
