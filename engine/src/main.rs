use chatter_engine::console::{self, Command};
use chatter_engine::{init_tracing, AppConfig, AppState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut config = AppConfig::from_env()?;
    if std::env::args().skip(1).any(|a| a == "--ephemeral") {
        config = config.with_ephemeral(true);
    }
    let (state, mut events) = AppState::open(config)?;
    info!(
        build_id = %state.build_id(),
        ephemeral = state.config().ephemeral,
        "starting chatter"
    );

    let session = state.session().clone();
    println!("{}", console::render(&session.view().await));
    println!("(type /help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => command,
                    Err(error) => {
                        println!("{error}");
                        continue;
                    }
                };
                match console::execute(&session, command).await {
                    Ok(Some(feedback)) => println!("{feedback}"),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(error = %format!("{error:#}"), "command failed");
                        println!("error: {error:#}");
                    }
                }
            }
            Some(event) = events.recv() => {
                debug!(?event, "session event");
                println!("\n{}", console::render(&session.view().await));
            }
        }
    }

    info!("bye");
    Ok(())
}
