use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "voice-squads")]
#[command(about = "Split a voice lobby into ephemeral squads and bring everyone back")]
#[command(long_about = "voice-squads partitions the people in a shared voice lobby into randomly \
                       shuffled squads, each with its own temporary voice channel, and resets \
                       everything once the squads vote for a replay. Try 'voice-squads simulate' \
                       to watch a full round against an in-memory platform.")]
pub struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, help = "Override the configured log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, help = "Write structured JSON logs to stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition a list of names into squads without touching any platform
    Split {
        /// Target squad size
        #[arg(long, short = 's', help = "Squad size (defaults to the configured group size)")]
        size: Option<usize>,
        /// Seed for a reproducible shuffle
        #[arg(long, help = "Seed the shuffle so the same input gives the same squads")]
        seed: Option<u64>,
        /// Print the partition as JSON
        #[arg(long, help = "Print squads and waiting pool as JSON")]
        json: bool,
        /// Participant display names
        #[arg(required = true, help = "Display names of everyone in the lobby")]
        names: Vec<String>,
    },
    /// Run a full squad round against the in-memory platform
    Simulate {
        /// Number of simulated lobby members
        #[arg(long, short = 'p', default_value = "8", help = "How many participants join the lobby")]
        participants: u64,
        /// Target squad size
        #[arg(long, short = 's', help = "Squad size (defaults to the configured group size)")]
        size: Option<usize>,
        /// Seed for a reproducible shuffle
        #[arg(long, help = "Seed the shuffle so the same run can be replayed")]
        seed: Option<u64>,
        /// Disconnect one member of the first squad to trigger an abandonment notice
        #[arg(long, help = "Have one member of Team A leave before voting starts")]
        drop_member: bool,
        /// Print the reset report as JSON
        #[arg(long, help = "Print the final reset report as JSON")]
        json: bool,
    },
}
