use crate::errors::ValidationError;
use crate::types::{Participant, ParticipantId, SquadLabel};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// One output group of the partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Squad {
    pub label: SquadLabel,
    pub members: Vec<Participant>,
}

impl Squad {
    pub fn member_ids(&self) -> BTreeSet<ParticipantId> {
        self.members.iter().map(|m| m.id).collect()
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.members.iter().any(|m| m.id == participant)
    }

    pub fn display_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.display_name.as_str()).collect()
    }
}

/// Squads in label order plus the participants left waiting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub squads: Vec<Squad>,
    pub waiting: Vec<Participant>,
}

impl Partition {
    pub fn squad_sizes(&self) -> Vec<usize> {
        self.squads.iter().map(|s| s.members.len()).collect()
    }
}

/// Drop automated participants and repeated ids, keeping first occurrence order
pub fn eligible_participants(participants: &[Participant]) -> Vec<Participant> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|p| !p.is_bot)
        .filter(|p| seen.insert(p.id))
        .cloned()
        .collect()
}

/// Check a request against the configured group size bounds.
///
/// Returns the eligible participants on success so the caller partitions
/// exactly what was validated.
pub fn validate(
    participants: &[Participant],
    group_size: usize,
    min_group_size: usize,
    max_group_size: usize,
) -> Result<Vec<Participant>, ValidationError> {
    let min = min_group_size.max(2);
    if group_size < min || group_size > max_group_size {
        return Err(ValidationError::UnsupportedGroupSize {
            requested: group_size,
            min,
            max: max_group_size,
        });
    }

    let eligible = eligible_participants(participants);
    if eligible.len() < 2 {
        return Err(ValidationError::NotEnoughParticipants {
            eligible: eligible.len(),
        });
    }

    let full = eligible.len() / group_size;
    let remainder = eligible.len() % group_size;
    if full == 0 && !remainder_forms_squad(group_size, remainder) {
        return Err(ValidationError::NoSquadFormed {
            eligible: eligible.len(),
            group_size,
        });
    }

    Ok(eligible)
}

/// Shuffle and split `participants` into squads of `group_size`.
///
/// Leftovers become their own squad only for the two cases below; everything
/// else waits:
/// - size 4 with 3 left over forms a squad of 3
/// - size 3 or more with 2 left over forms a squad of 2
pub fn partition<R: Rng + ?Sized>(
    mut participants: Vec<Participant>,
    group_size: usize,
    rng: &mut R,
) -> Partition {
    if group_size < 2 {
        return Partition {
            squads: Vec::new(),
            waiting: participants,
        };
    }

    participants.shuffle(rng);

    let mut groups: Vec<Vec<Participant>> = Vec::new();
    let mut rest = participants;
    while rest.len() >= group_size {
        let tail = rest.split_off(group_size);
        groups.push(rest);
        rest = tail;
    }

    let waiting = if !rest.is_empty() && remainder_forms_squad(group_size, rest.len()) {
        groups.push(rest);
        Vec::new()
    } else {
        rest
    };

    let squads = groups
        .into_iter()
        .enumerate()
        .map(|(index, members)| Squad {
            label: SquadLabel::from_index(u16::try_from(index).unwrap_or(u16::MAX)),
            members,
        })
        .collect();

    Partition { squads, waiting }
}

fn remainder_forms_squad(group_size: usize, remainder: usize) -> bool {
    (group_size == 4 && remainder == 3) || (group_size >= 3 && remainder == 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster(n: usize) -> Vec<Participant> {
        (1..=n as u64)
            .map(|i| Participant::new(i, format!("player{i}")))
            .collect()
    }

    fn split(n: usize, size: usize) -> Partition {
        let mut rng = StdRng::seed_from_u64(7);
        partition(roster(n), size, &mut rng)
    }

    #[test]
    fn seven_by_four_keeps_the_three() {
        let result = split(7, 4);
        assert_eq!(result.squad_sizes(), vec![4, 3]);
        assert!(result.waiting.is_empty());
    }

    #[test]
    fn eight_by_three_promotes_the_pair() {
        let result = split(8, 3);
        assert_eq!(result.squad_sizes(), vec![3, 3, 2]);
        assert!(result.waiting.is_empty());
    }

    #[test]
    fn five_by_four_leaves_one_waiting() {
        let result = split(5, 4);
        assert_eq!(result.squad_sizes(), vec![4]);
        assert_eq!(result.waiting.len(), 1);
    }

    #[test]
    fn pairs_never_promote_a_single_leftover() {
        let result = split(5, 2);
        assert_eq!(result.squad_sizes(), vec![2, 2]);
        assert_eq!(result.waiting.len(), 1);
    }

    #[test]
    fn three_left_over_from_five_waits() {
        // only size 4 keeps a remainder of 3
        let result = split(8, 5);
        assert_eq!(result.squad_sizes(), vec![5]);
        assert_eq!(result.waiting.len(), 3);
    }

    #[test]
    fn labels_follow_position() {
        let result = split(12, 2);
        let labels: Vec<String> = result.squads.iter().map(|s| s.label.to_string()).collect();
        assert_eq!(labels, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn same_seed_same_partition() {
        let mut first = StdRng::seed_from_u64(99);
        let mut second = StdRng::seed_from_u64(99);
        assert_eq!(
            partition(roster(10), 3, &mut first),
            partition(roster(10), 3, &mut second)
        );
    }

    #[test]
    fn validation_rejects_bad_requests() {
        assert_eq!(
            validate(&roster(6), 1, 2, 8),
            Err(ValidationError::UnsupportedGroupSize {
                requested: 1,
                min: 2,
                max: 8
            })
        );
        assert_eq!(
            validate(&roster(6), 9, 2, 8),
            Err(ValidationError::UnsupportedGroupSize {
                requested: 9,
                min: 2,
                max: 8
            })
        );
        assert_eq!(
            validate(&roster(1), 2, 2, 8),
            Err(ValidationError::NotEnoughParticipants { eligible: 1 })
        );
        assert_eq!(
            validate(&roster(3), 5, 2, 8),
            Err(ValidationError::NoSquadFormed {
                eligible: 3,
                group_size: 5
            })
        );
    }

    #[test]
    fn validation_ignores_bots_and_duplicates() {
        let mut people = roster(2);
        people.push(Participant::bot(50, "music"));
        people.push(Participant::new(1, "player1 again"));

        let eligible = validate(&people, 2, 2, 8).unwrap();
        let ids: Vec<u64> = eligible.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 2]);

        let only_one = vec![Participant::new(1, "solo"), Participant::bot(2, "bot")];
        assert_eq!(
            validate(&only_one, 2, 2, 8),
            Err(ValidationError::NotEnoughParticipants { eligible: 1 })
        );
    }

    proptest! {
        #[test]
        fn every_participant_lands_exactly_once(n in 2usize..80, size in 2usize..=4, seed: u64) {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = partition(roster(n), size, &mut rng);

            let mut seen: Vec<u64> = result
                .squads
                .iter()
                .flat_map(|s| s.members.iter())
                .chain(result.waiting.iter())
                .map(|p| p.id.0)
                .collect();
            seen.sort_unstable();
            let expected: Vec<u64> = (1..=n as u64).collect();
            prop_assert_eq!(seen, expected);

            for squad in &result.squads {
                prop_assert!(squad.members.len() <= size);
                prop_assert!(squad.members.len() >= 2);
            }
            prop_assert!(result.waiting.len() < size);
        }
    }
}
