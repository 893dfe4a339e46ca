//! Skip and start votes.

/// Votes required out of `players` at `threshold` (a 0..=1 fraction).
///
/// Always at least one, so a lone player can still pass a vote.
pub fn votes_needed(players: usize, threshold: f64) -> usize {
    let raw = (players as f64 * threshold - 1e-9).ceil();
    (raw.max(1.0)) as usize
}

/// A set of voters, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct VoteBox {
    voters: Vec<String>,
}

impl VoteBox {
    /// Records a vote. Returns `false` if `name` already voted.
    pub fn cast(&mut self, name: &str) -> bool {
        if self.voters.iter().any(|v| v.eq_ignore_ascii_case(name)) {
            return false;
        }
        self.voters.push(name.to_string());
        true
    }

    pub fn withdraw(&mut self, name: &str) {
        self.voters.retain(|v| !v.eq_ignore_ascii_case(name));
    }

    pub fn count(&self) -> usize {
        self.voters.len()
    }

    pub fn clear(&mut self) {
        self.voters.clear();
    }

    /// Whether the votes so far reach the threshold for `players`.
    pub fn passes(&self, players: usize, threshold: f64) -> bool {
        self.count() >= votes_needed(players, threshold)
    }
}
