use super::print_squads;
use crate::config::SquadsConfig;
use crate::partition::{partition, validate, Partition};
use crate::types::Participant;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Dry-run partition of a list of display names
pub struct SplitCommand {
    pub names: Vec<String>,
    pub size: Option<usize>,
    pub seed: Option<u64>,
    pub json: bool,
}

impl SplitCommand {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            size: None,
            seed: None,
            json: false,
        }
    }

    pub fn with_size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn plan(&self, config: &SquadsConfig) -> Result<Partition> {
        let participants: Vec<Participant> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| Participant::new(i as u64 + 1, name.clone()))
            .collect();
        let size = self.size.unwrap_or(config.formation.default_group_size);
        let eligible = validate(
            &participants,
            size,
            config.formation.min_group_size,
            config.formation.max_group_size,
        )?;

        let result = match self.seed {
            Some(seed) => partition(eligible, size, &mut StdRng::seed_from_u64(seed)),
            None => partition(eligible, size, &mut rand::rng()),
        };
        Ok(result)
    }

    pub fn execute(&self, config: &SquadsConfig) -> Result<()> {
        let result = self.plan(config)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        println!(
            "🔀 {} squad(s) from {} participant(s):",
            result.squads.len(),
            self.names.len()
        );
        print_squads(&result.squads, &result.waiting);
        if let Some(seed) = self.seed {
            println!();
            println!("🌱 seed {seed}");
        }
        Ok(())
    }
}
