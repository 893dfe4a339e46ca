use std::process::ExitCode;

use lobbyref::{Cli, LobbyrefError, USAGE, app, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(LobbyrefError::Usage(message)) if message == USAGE => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("lobbyref: {e}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    logging::init(cli.quiet);

    match app::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            ExitCode::FAILURE
        }
    }
}
