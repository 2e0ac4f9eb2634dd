use anyhow::Result;
use clap::Parser;
use voice_squads::cli::commands::{show_usage, SimulateCommand, SplitCommand};
use voice_squads::cli::{Cli, Commands};
use voice_squads::{config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?;

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    init_telemetry(log_level, cli.json_logs || config.observability.json_logs)?;

    let result = match cli.command {
        None => show_usage(),
        Some(Commands::Split {
            size,
            seed,
            json,
            names,
        }) => SplitCommand::new(names)
            .with_size(size)
            .with_seed(seed)
            .with_json(json)
            .execute(config),
        Some(Commands::Simulate {
            participants,
            size,
            seed,
            drop_member,
            json,
        }) => {
            // paused clock: the 180s watchdogs finish instantly
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()?
                .block_on(async {
                    SimulateCommand::new(participants)
                        .with_size(size)
                        .with_seed(seed)
                        .with_drop_member(drop_member)
                        .with_json(json)
                        .execute(config)
                        .await
                })
        }
    };

    shutdown_telemetry();
    result
}
