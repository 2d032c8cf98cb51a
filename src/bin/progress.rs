/**
 * Escape Progress CLI Entry Point
 *
 * Loads and reconciles the saved progress, runs one command against it,
 * waits for the remote writes it triggered and prints a summary.
 */

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use escape_progress::client::command::{render_summary, Command, USAGE};
    use escape_progress::client::{Config, SyncCoordinator};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;
    let mut coordinator = SyncCoordinator::new(&config);
    coordinator.load().await;

    match command {
        Command::Status => {}
        Command::Begin(team) => {
            coordinator.begin(&team).await?;
        }
        Command::Complete(stage) => {
            coordinator.complete_room(stage)?;
        }
        Command::Set(patch) => {
            coordinator.update(&patch);
        }
        Command::Restart => coordinator.restart(),
    }

    coordinator.flush().await;
    print!(
        "{}",
        render_summary(coordinator.record(), coordinator.layout(), chrono::Utc::now())
    );

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("The progress CLI requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin progress --features cli");
    std::process::exit(1);
}
