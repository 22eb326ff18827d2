// This file is part of swiss-tournament.
//
// swiss-tournament is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// swiss-tournament is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Next round pairings.
//!
//! Players are walked in standings order. The highest ranked unpaired player
//! meets the next highest ranked player they haven't played yet; both leave
//! the queue and the walk starts over from the new leftmost player. With an
//! odd number of players the last ranked one sits the round out with a bye.
//!
//! The walk never backtracks, so it can get stuck even when a legal pairing
//! exists. [`PairingMode::Backtracking`] keeps the same preference order but
//! undoes earlier choices when a later player is left without a partner.

use std::{collections::VecDeque, fmt, str::FromStr};

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    ledger::History,
    player::{Player, PlayerId},
    standings::{Standing, current_round, pairing_standings},
    store::Snapshot,
};

/// How many pairings the backtracking search may undo by default.
pub const BACKTRACK_LIMIT: usize = 100_000;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pairing {
    pub id_1: PlayerId,
    pub name_1: String,
    pub id_2: PlayerId,
    pub name_2: String,
}

impl Pairing {
    fn new(first: &Standing, second: &Standing) -> Self {
        Self {
            id_1: first.id,
            name_1: first.name.clone(),
            id_2: second.id,
            name_2: second.name.clone(),
        }
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.id_1, self.name_1, self.id_2, self.name_2
        )
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Round {
    pub number: u32,
    /// In the order they were formed, strongest first.
    pub pairings: Vec<Pairing>,
    pub bye: Option<Player>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum PairingMode {
    Backtracking,
    #[default]
    Greedy,
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backtracking => write!(f, "backtracking"),
            Self::Greedy => write!(f, "greedy"),
        }
    }
}

impl FromStr for PairingMode {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        match string.to_lowercase().as_str() {
            "backtracking" => Ok(Self::Backtracking),
            "greedy" => Ok(Self::Greedy),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{string}' to a PairingMode!"
            ))),
        }
    }
}

/// Plans the next round of a tournament without writing anything.
///
/// A bye granted after the last reported match belongs to this round and
/// doesn't move its holder up the table.
///
/// # Errors
///
/// If some player can't be given a legal opponent.
pub fn plan_round(
    snapshot: &Snapshot,
    mode: PairingMode,
    limit: usize,
) -> Result<Round, EngineError> {
    let number = current_round(snapshot);
    let mut ranked = pairing_standings(snapshot);

    let bye = if ranked.len() % 2 == 1 {
        ranked.pop()
    } else {
        None
    };

    let history: History = snapshot.matches.iter().collect();
    let pairings = pair(&ranked, &history, mode, limit)?;

    Ok(Round {
        number,
        pairings,
        bye: bye.map(|standing| Player {
            id: standing.id,
            name: standing.name,
        }),
    })
}

/// Pairs an even number of ranked players without rematches.
///
/// # Errors
///
/// If some player can't be given a legal opponent.
pub fn pair(
    ranked: &[Standing],
    history: &History,
    mode: PairingMode,
    limit: usize,
) -> Result<Vec<Pairing>, EngineError> {
    match mode {
        PairingMode::Backtracking => backtracking(ranked, history, limit),
        PairingMode::Greedy => greedy(ranked, history),
    }
}

fn greedy(ranked: &[Standing], history: &History) -> Result<Vec<Pairing>, EngineError> {
    let mut remaining: VecDeque<&Standing> = ranked.iter().collect();
    let mut pairings = Vec::with_capacity(ranked.len() / 2);

    while let Some(first) = remaining.pop_front() {
        let mut cursor = 0;
        while remaining
            .get(cursor)
            .is_some_and(|candidate| history.have_played(first.id, candidate.id))
        {
            cursor += 1;
        }

        let Some(second) = remaining.remove(cursor) else {
            trace!("greedy: no opponent left for {}", first.id);
            return Err(EngineError::Unpairable { player: first.id });
        };

        trace!("greedy: {} {} skipping {cursor}", first.id, second.id);
        pairings.push(Pairing::new(first, second));
    }

    Ok(pairings)
}

fn backtracking(
    ranked: &[Standing],
    history: &History,
    limit: usize,
) -> Result<Vec<Pairing>, EngineError> {
    let mut search = Search {
        ids: ranked.iter().map(|standing| standing.id).collect(),
        history,
        limit,
        steps: 0,
        stuck: None,
    };

    let remaining: Vec<usize> = (0..ranked.len()).collect();
    let mut chosen = Vec::with_capacity(ranked.len() / 2);

    match search.extend(&remaining, &mut chosen) {
        Some(true) => Ok(chosen
            .into_iter()
            .map(|(first, second)| Pairing::new(&ranked[first], &ranked[second]))
            .collect()),
        found => {
            if found.is_none() {
                warn!("backtracking: gave up after undoing {limit} pairings");
            }

            let player = search
                .stuck
                .or_else(|| search.ids.first().copied())
                .unwrap_or_default();

            Err(EngineError::Unpairable { player })
        }
    }
}

struct Search<'a> {
    ids: Vec<PlayerId>,
    history: &'a History,
    limit: usize,
    /// Pairings undone so far.
    steps: usize,
    /// The first player found without a partner, the one the greedy walk
    /// would have stopped on.
    stuck: Option<PlayerId>,
}

impl Search<'_> {
    /// `Some(true)` once everyone in `remaining` is paired, `Some(false)` if
    /// they can't be, and `None` when the limit runs out.
    fn extend(&mut self, remaining: &[usize], chosen: &mut Vec<(usize, usize)>) -> Option<bool> {
        let Some((&first, rest)) = remaining.split_first() else {
            return Some(true);
        };

        for (offset, &second) in rest.iter().enumerate() {
            if self.history.have_played(self.ids[first], self.ids[second]) {
                continue;
            }

            let next: Vec<usize> = rest
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != offset)
                .map(|(_, index)| *index)
                .collect();

            chosen.push((first, second));
            if self.extend(&next, chosen)? {
                return Some(true);
            }
            chosen.pop();

            self.steps += 1;
            if self.steps > self.limit {
                return None;
            }

            trace!(
                "backtracking: undo {} {}",
                self.ids[first], self.ids[second]
            );
        }

        if self.stuck.is_none() {
            self.stuck = Some(self.ids[first]);
        }

        Some(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::standings::tests::snapshot;

    use super::*;

    fn ranked(players: u64) -> Vec<Standing> {
        (1..=players)
            .map(|id| Standing {
                id: PlayerId(id),
                name: format!("P{id}"),
                wins: 0,
                games: 0,
                omw: 0,
            })
            .collect()
    }

    fn history(pairs: &[(u64, u64)]) -> History {
        pairs
            .iter()
            .map(|(a, b)| (PlayerId(*a), PlayerId(*b)))
            .collect()
    }

    fn ids(pairings: &[Pairing]) -> Vec<(u64, u64)> {
        pairings
            .iter()
            .map(|pairing| (pairing.id_1.0, pairing.id_2.0))
            .collect()
    }

    #[test]
    fn neighbours_are_paired() -> anyhow::Result<()> {
        let pairings = pair(&ranked(4), &History::default(), PairingMode::Greedy, 0)?;
        assert_eq!(ids(&pairings), [(1, 2), (3, 4)]);

        Ok(())
    }

    #[test]
    fn rematches_are_skipped() -> anyhow::Result<()> {
        let pairings = pair(&ranked(4), &history(&[(2, 1)]), PairingMode::Greedy, 0)?;
        assert_eq!(ids(&pairings), [(1, 3), (2, 4)]);

        Ok(())
    }

    #[test]
    fn the_walk_restarts_from_the_left() -> anyhow::Result<()> {
        let pairings = pair(
            &ranked(6),
            &history(&[(1, 2), (1, 3)]),
            PairingMode::Greedy,
            0,
        )?;
        assert_eq!(ids(&pairings), [(1, 4), (2, 3), (5, 6)]);

        Ok(())
    }

    #[test]
    fn greedy_gets_stuck() {
        let result = pair(
            &ranked(4),
            &history(&[(1, 2), (2, 4)]),
            PairingMode::Greedy,
            0,
        );

        assert_eq!(
            result,
            Err(EngineError::Unpairable {
                player: PlayerId(2)
            })
        );
    }

    #[test]
    fn backtracking_gets_unstuck() -> anyhow::Result<()> {
        let pairings = pair(
            &ranked(4),
            &history(&[(1, 2), (2, 4)]),
            PairingMode::Backtracking,
            BACKTRACK_LIMIT,
        )?;
        assert_eq!(ids(&pairings), [(1, 4), (2, 3)]);

        Ok(())
    }

    #[test]
    fn backtracking_agrees_with_greedy() -> anyhow::Result<()> {
        let histories = [
            history(&[]),
            history(&[(1, 2)]),
            history(&[(1, 2), (3, 4), (5, 6)]),
            history(&[(1, 2), (1, 3), (2, 3), (4, 5)]),
        ];

        for history in &histories {
            let greedy = pair(&ranked(6), history, PairingMode::Greedy, 0)?;
            let backtracking = pair(&ranked(6), history, PairingMode::Backtracking, BACKTRACK_LIMIT)?;
            assert_eq!(greedy, backtracking);
        }

        Ok(())
    }

    #[test]
    fn nobody_left_to_play() {
        let history = history(&[(1, 2), (1, 3), (1, 4)]);

        for mode in [PairingMode::Greedy, PairingMode::Backtracking] {
            assert_eq!(
                pair(&ranked(4), &history, mode, BACKTRACK_LIMIT),
                Err(EngineError::Unpairable {
                    player: PlayerId(1)
                })
            );
        }
    }

    #[test]
    fn the_limit_counts_undone_pairings() -> anyhow::Result<()> {
        let history = history(&[(1, 2), (2, 4)]);

        assert_eq!(
            pair(&ranked(4), &history, PairingMode::Backtracking, 0),
            Err(EngineError::Unpairable {
                player: PlayerId(2)
            })
        );

        let pairings = pair(&ranked(4), &history, PairingMode::Backtracking, 1)?;
        assert_eq!(ids(&pairings), [(1, 4), (2, 3)]);

        Ok(())
    }

    #[test]
    fn a_zero_limit_still_pairs_what_greedy_pairs() -> anyhow::Result<()> {
        let greedy = pair(&ranked(8), &History::default(), PairingMode::Greedy, 0)?;
        let backtracking = pair(&ranked(8), &History::default(), PairingMode::Backtracking, 0)?;
        assert_eq!(greedy, backtracking);

        Ok(())
    }

    #[test]
    fn the_last_ranked_player_gets_the_bye() -> anyhow::Result<()> {
        let round = plan_round(&snapshot(9, &[], &[]), PairingMode::Greedy, 0)?;

        assert_eq!(round.number, 1);
        assert_eq!(round.pairings.len(), 4);
        assert_eq!(round.bye.map(|player| player.id), Some(PlayerId(9)));

        Ok(())
    }

    #[test]
    fn a_bye_of_the_current_round_is_not_credited() -> anyhow::Result<()> {
        let before = plan_round(&snapshot(9, &[], &[]), PairingMode::Greedy, 0)?;
        let after = plan_round(&snapshot(9, &[], &[(9, 1, 0)]), PairingMode::Greedy, 0)?;

        assert_eq!(before, after);

        Ok(())
    }

    #[test]
    fn the_next_round_credits_earlier_byes() -> anyhow::Result<()> {
        let snapshot = snapshot(
            5,
            &[(1, 2, Some(1)), (3, 4, Some(3))],
            &[(5, 1, 0)],
        );
        let round = plan_round(&snapshot, PairingMode::Greedy, 0)?;

        assert_eq!(round.number, 2);
        assert_eq!(ids(&round.pairings), [(1, 3), (5, 2)]);
        assert_eq!(round.bye.map(|player| player.id), Some(PlayerId(4)));

        Ok(())
    }
}
