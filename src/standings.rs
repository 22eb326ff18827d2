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

//! Ranked standings derived from the ledger.
//!
//! Players are ordered by wins, then by opponent match wins (the sum of the
//! wins of every opponent they have faced), then by enrollment order. A bye
//! counts as a win but not as a game.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{player::PlayerId, store::Snapshot, tournament::Bye};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Standing {
    pub id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub games: u32,
    pub omw: u32,
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.id, self.name, self.wins, self.games, self.omw
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    wins: u32,
    games: u32,
    omw: u32,
}

/// The standings with every bye credited.
#[must_use]
pub fn standings(snapshot: &Snapshot) -> Vec<Standing> {
    rank(snapshot, |_| true)
}

/// The standings the next round is paired from: a bye granted after the last
/// reported match belongs to the round being paired and isn't credited yet.
#[must_use]
pub fn pairing_standings(snapshot: &Snapshot) -> Vec<Standing> {
    let reported = snapshot.matches.len();
    rank(snapshot, |bye| bye.matches_before < reported)
}

/// The first round some enrolled player has neither a result nor a bye for.
///
/// A player who enrolled late is counted as present for the rounds that were
/// already under way.
#[must_use]
pub fn current_round(snapshot: &Snapshot) -> u32 {
    let mut rounds: FxHashMap<PlayerId, u32> = snapshot
        .entries
        .iter()
        .map(|enrolled| {
            (
                enrolled.player.id,
                enrolled.entry.round.saturating_sub(1),
            )
        })
        .collect();

    let players = snapshot
        .matches
        .iter()
        .flat_map(|record| [record.player_1, record.player_2])
        .chain(snapshot.byes.iter().map(|bye| bye.player));

    for player in players {
        if let Some(rounds) = rounds.get_mut(&player) {
            *rounds += 1;
        }
    }

    rounds.values().min().map_or(1, |least| least + 1)
}

fn rank<F: Fn(&Bye) -> bool>(snapshot: &Snapshot, credit: F) -> Vec<Standing> {
    let mut tallies: FxHashMap<PlayerId, Tally> = snapshot
        .entries
        .iter()
        .map(|enrolled| (enrolled.player.id, Tally::default()))
        .collect();

    for record in &snapshot.matches {
        for player in [record.player_1, record.player_2] {
            if let Some(tally) = tallies.get_mut(&player) {
                tally.games += 1;
            }
        }

        if let Some(winner) = record.winner()
            && let Some(tally) = tallies.get_mut(&winner)
        {
            tally.wins += 1;
        }
    }

    for bye in snapshot.byes.iter().filter(|bye| credit(bye)) {
        if let Some(tally) = tallies.get_mut(&bye.player) {
            tally.wins += 1;
        }
    }

    let wins: FxHashMap<PlayerId, u32> = tallies
        .iter()
        .map(|(id, tally)| (*id, tally.wins))
        .collect();

    for record in &snapshot.matches {
        for (player, opponent) in [
            (record.player_1, record.player_2),
            (record.player_2, record.player_1),
        ] {
            if let Some(tally) = tallies.get_mut(&player) {
                tally.omw += wins.get(&opponent).copied().unwrap_or_default();
            }
        }
    }

    let mut standings: Vec<_> = snapshot
        .entries
        .iter()
        .map(|enrolled| {
            let tally = tallies
                .get(&enrolled.player.id)
                .copied()
                .unwrap_or_default();

            Standing {
                id: enrolled.player.id,
                name: enrolled.player.name.clone(),
                wins: tally.wins,
                games: tally.games,
                omw: tally.omw,
            }
        })
        .collect();

    // Entries come in enrollment order and the sort is stable.
    standings.sort_by(|a, b| b.wins.cmp(&a.wins).then(b.omw.cmp(&a.omw)));
    standings
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        ledger::MatchRecord,
        outcome::Outcome,
        player::Player,
        store::Enrolled,
        tournament::{Entry, Tournament, TournamentId},
    };

    use super::*;

    /// Players `1..=players` enrolled in order, with the given results and byes.
    pub(crate) fn snapshot(
        players: u64,
        matches: &[(u64, u64, Option<u64>)],
        byes: &[(u64, u32, usize)],
    ) -> Snapshot {
        let tournament = TournamentId(1);

        Snapshot {
            tournament: Tournament {
                id: tournament,
                name: "Test".to_string(),
            },
            entries: (1..=players)
                .map(|id| Enrolled {
                    entry: Entry {
                        tournament,
                        player: PlayerId(id),
                        sequence: id,
                        round: 1,
                    },
                    player: Player {
                        id: PlayerId(id),
                        name: format!("P{id}"),
                    },
                })
                .collect(),
            matches: matches
                .iter()
                .map(|(a, b, winner)| {
                    MatchRecord::new(
                        tournament,
                        PlayerId(*a),
                        PlayerId(*b),
                        Outcome::from(winner.map(PlayerId)),
                    )
                })
                .collect(),
            byes: byes
                .iter()
                .map(|(player, round, matches_before)| Bye {
                    tournament,
                    player: PlayerId(*player),
                    round: *round,
                    matches_before: *matches_before,
                })
                .collect(),
        }
    }

    fn ids(standings: &[Standing]) -> Vec<u64> {
        standings.iter().map(|standing| standing.id.0).collect()
    }

    #[test]
    fn nobody_has_played() {
        let standings = standings(&snapshot(3, &[], &[]));

        assert_eq!(ids(&standings), [1, 2, 3]);
        assert!(
            standings
                .iter()
                .all(|standing| standing.wins == 0 && standing.games == 0 && standing.omw == 0)
        );
    }

    #[test]
    fn wins_then_enrollment_order() {
        let standings = standings(&snapshot(4, &[(1, 2, Some(1)), (3, 4, Some(3))], &[]));

        assert_eq!(ids(&standings), [1, 3, 2, 4]);
        assert_eq!(standings[0].omw, 0);
        assert_eq!(standings[2].omw, 1);
    }

    #[test]
    fn omw_breaks_ties_before_enrollment_order() {
        // 1, 2 and 4 have a win each, but 1 beat a player who never won.
        let standings = standings(&snapshot(
            5,
            &[(1, 3, Some(1)), (2, 4, Some(4)), (2, 5, Some(2))],
            &[],
        ));

        assert_eq!(ids(&standings), [2, 4, 1, 3, 5]);
        assert_eq!(standings[1].omw, 1);
        assert_eq!(standings[2].omw, 0);
    }

    #[test]
    fn draws_are_games_without_wins() {
        let standings = standings(&snapshot(2, &[(1, 2, None)], &[]));

        for standing in standings {
            assert_eq!(standing.wins, 0);
            assert_eq!(standing.games, 1);
        }
    }

    #[test]
    fn byes_are_wins_without_games() {
        let snapshot = snapshot(3, &[(1, 2, Some(2))], &[(3, 1, 0)]);

        let all = standings(&snapshot);
        assert_eq!(ids(&all), [2, 3, 1]);
        assert_eq!(all[1].wins, 1);
        assert_eq!(all[1].games, 0);
        assert_eq!(pairing_standings(&snapshot), all);
    }

    #[test]
    fn a_bye_after_the_last_match_is_pending() {
        let snapshot = snapshot(3, &[(1, 2, Some(2))], &[(3, 2, 1)]);

        assert_eq!(ids(&standings(&snapshot)), [2, 3, 1]);

        let pairing = pairing_standings(&snapshot);
        assert_eq!(ids(&pairing), [2, 1, 3]);
        assert_eq!(pairing[2].wins, 0);
    }

    #[test]
    fn rounds_follow_the_slowest_player() {
        assert_eq!(current_round(&snapshot(0, &[], &[])), 1);
        assert_eq!(current_round(&snapshot(3, &[], &[])), 1);
        assert_eq!(current_round(&snapshot(3, &[], &[(3, 1, 0)])), 1);
        assert_eq!(current_round(&snapshot(3, &[(1, 2, None)], &[])), 1);
        assert_eq!(current_round(&snapshot(3, &[(1, 2, None)], &[(3, 1, 0)])), 2);
    }

    #[test]
    fn late_entries_keep_the_round() {
        let mut snapshot = snapshot(3, &[(1, 2, None)], &[(3, 1, 0)]);
        snapshot.entries.push(Enrolled {
            entry: Entry {
                tournament: TournamentId(1),
                player: PlayerId(4),
                sequence: 4,
                round: 2,
            },
            player: Player {
                id: PlayerId(4),
                name: "P4".to_string(),
            },
        });

        assert_eq!(current_round(&snapshot), 2);

        let standings = pairing_standings(&snapshot);
        assert_eq!(ids(&standings), [3, 1, 2, 4]);
        assert_eq!(standings[0].wins, 1);
    }
}
