use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match saygenfix::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("saygenfix: {err:#}");
            ExitCode::FAILURE
        }
    }
}
