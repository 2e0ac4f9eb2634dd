use crate::types::SquadLabel;

/// Platform limit on voice channel names, in characters
pub const DEFAULT_NAME_LIMIT: usize = 100;

const ELLIPSIS: char = '…';

/// Build `"Team A: alice, bob"` and shorten it to at most `max_len` characters.
///
/// When the full name does not fit, every member name is cut to the longest
/// common prefix length that fits and an ellipsis is appended. Names too long
/// even at one character each fall back to a hard cut.
pub fn channel_name(label: SquadLabel, names: &[&str], max_len: usize) -> String {
    let prefix = format!("Team {label}: ");
    let full = format!("{prefix}{}", names.join(", "));
    if full.chars().count() <= max_len {
        return full;
    }

    let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    for keep in (1..longest).rev() {
        let shortened: Vec<String> = names.iter().map(|n| abbreviate(n, keep)).collect();
        let candidate = format!("{prefix}{}{ELLIPSIS}", shortened.join(", "));
        if candidate.chars().count() <= max_len {
            return candidate;
        }
    }

    if max_len == 0 {
        return String::new();
    }
    let mut cut: String = full.chars().take(max_len - 1).collect();
    cut.push(ELLIPSIS);
    cut
}

fn abbreviate(name: &str, keep: usize) -> String {
    name.chars().take(keep).collect()
}
