//! Time-limit win resolution.
//!
//! Last-team-standing is handled inline wherever lives are mutated; this
//! module only decides the clock-expiry case. Teams are ranked by total
//! elimination tokens, with remaining shared lives as the tie-break. A tie on
//! both axes produces no winner.

use blast_core::events::MatchOutcome;
use blast_core::team::Team;

/// One surviving team's standing at clock expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamStanding {
    pub team: Team,
    pub tokens: u32,
    pub lives: u32,
}

/// Resolve the outcome when the clock reaches zero. `standings` holds only
/// teams that still have lives; eliminated teams never place.
pub fn time_limit_outcome(standings: &[TeamStanding]) -> MatchOutcome {
    let Some(max_tokens) = standings.iter().map(|s| s.tokens).max() else {
        return MatchOutcome::NoWinner;
    };
    let leaders: Vec<&TeamStanding> = standings
        .iter()
        .filter(|s| s.tokens == max_tokens)
        .collect();
    if let [single] = leaders.as_slice() {
        return MatchOutcome::Winner(single.team);
    }

    // Token tie: fall back to remaining lives among the tied teams only.
    let max_lives = leaders.iter().map(|s| s.lives).max().unwrap_or(0);
    let mut by_lives = leaders.iter().filter(|s| s.lives == max_lives);
    match (by_lives.next(), by_lives.next()) {
        (Some(single), None) => MatchOutcome::Winner(single.team),
        _ => MatchOutcome::NoWinner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(team: Team, tokens: u32, lives: u32) -> TeamStanding {
        TeamStanding {
            team,
            tokens,
            lives,
        }
    }

    #[test]
    fn highest_token_total_wins_outright() {
        let outcome = time_limit_outcome(&[
            standing(Team::Red, 12, 3),
            standing(Team::Green, 30, 1),
            standing(Team::Blue, 18, 40),
        ]);
        assert_eq!(outcome, MatchOutcome::Winner(Team::Green));
    }

    #[test]
    fn token_tie_breaks_on_lives() {
        let outcome = time_limit_outcome(&[
            standing(Team::Green, 20, 5),
            standing(Team::Blue, 20, 9),
            standing(Team::Red, 11, 80),
        ]);
        assert_eq!(outcome, MatchOutcome::Winner(Team::Blue));
    }

    #[test]
    fn full_tie_has_no_winner() {
        let outcome = time_limit_outcome(&[
            standing(Team::Green, 20, 9),
            standing(Team::Blue, 20, 9),
        ]);
        assert_eq!(outcome, MatchOutcome::NoWinner);
    }

    #[test]
    fn lives_never_outrank_tokens() {
        let outcome = time_limit_outcome(&[
            standing(Team::Red, 1, 80),
            standing(Team::Yellow, 2, 1),
        ]);
        assert_eq!(outcome, MatchOutcome::Winner(Team::Yellow));
    }

    #[test]
    fn no_survivors_means_no_winner() {
        assert_eq!(time_limit_outcome(&[]), MatchOutcome::NoWinner);
    }
}
