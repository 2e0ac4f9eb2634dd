use crate::partition::Squad;
use crate::types::Participant;
use anyhow::Result;

pub mod simulate;
pub mod split;

pub use simulate::SimulateCommand;
pub use split::SplitCommand;

pub fn show_usage() -> Result<()> {
    println!("🎧 voice-squads - ephemeral voice squads for a shared lobby");
    println!();
    println!("Commands:");
    println!("  🔀 voice-squads split --size 4 ana bo cy di ed   # Preview a partition");
    println!("  🎮 voice-squads simulate --participants 8        # Run a full round in memory");
    println!();
    println!("💡 Add --seed N to either command for a reproducible shuffle.");
    Ok(())
}

pub(crate) fn print_squads(squads: &[Squad], waiting: &[Participant]) {
    for squad in squads {
        println!("  Team {}: {}", squad.label, squad.display_names().join(", "));
    }
    if !waiting.is_empty() {
        let names: Vec<&str> = waiting.iter().map(|p| p.display_name.as_str()).collect();
        println!("  Waiting: {}", names.join(", "));
    }
}
