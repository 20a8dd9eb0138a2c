use anyhow::Context;
use std::io;
use witty_guess::cli::{CliInterface, InterfaceKind, parse_cli};
use witty_guess::game_state::{Game, game_loop};
use witty_guess::logging::init_logging;
use witty_guess::tui::TuiInterface;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    let logging = init_logging(&cli.log_destination());
    log::debug!("Logging to {:?}", logging);

    // Only fails if the TLS backend cannot initialise.
    let service = cli
        .feedback_client()
        .context("failed to build feedback client")?;
    log::info!("Starting game with {:?} commentary backend", cli.backend);

    let mut game = match cli.seed {
        Some(seed) => Game::seeded(seed),
        None => Game::new(),
    };

    match cli.interface {
        InterfaceKind::Cli => {
            let mut interface = CliInterface::new(io::stdin().lock());
            game_loop(&mut game, &mut interface, &service).await;
        }
        InterfaceKind::Tui => {
            let mut interface = TuiInterface::new().context("failed to set up terminal")?;
            game_loop(&mut game, &mut interface, &service).await;
        }
    }

    Ok(())
}
