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

//! The persistence seam shared by every engine operation.
//!
//! A [`Store`] owns the relations (players, tournaments, entries, matches and
//! byes) and is the authority on their integrity: each write is checked and
//! applied under a single acquisition of the store, so of two racing writes
//! that would break a uniqueness invariant exactly one succeeds.

use std::{
    fmt,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Conflict, EngineError, Missing},
    ledger::{MatchRecord, PairKey},
    outcome::Outcome,
    player::{Player, PlayerId, clean_name},
    standings::current_round,
    tournament::{Bye, Entry, Tournament, TournamentId},
};

pub trait Store: Send + Sync {
    /// # Errors
    ///
    /// If the name is invalid or the store fails.
    fn insert_player(&self, name: &str) -> Result<Player, EngineError>;

    /// # Errors
    ///
    /// If the name is invalid or the store fails.
    fn insert_tournament(&self, name: &str) -> Result<Tournament, EngineError>;

    /// # Errors
    ///
    /// If either side is missing or the player is already enrolled.
    fn insert_entry(
        &self,
        tournament: TournamentId,
        player: PlayerId,
    ) -> Result<Entry, EngineError>;

    /// # Errors
    ///
    /// If a player is not enrolled or the pair already has a result.
    fn insert_match(&self, record: MatchRecord) -> Result<(), EngineError>;

    /// # Errors
    ///
    /// If the player is not enrolled or already holds a bye.
    fn insert_bye(
        &self,
        tournament: TournamentId,
        player: PlayerId,
        round: u32,
    ) -> Result<Bye, EngineError>;

    /// # Errors
    ///
    /// If the store fails.
    fn player(&self, id: PlayerId) -> Result<Option<Player>, EngineError>;

    /// # Errors
    ///
    /// If the store fails.
    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>, EngineError>;

    /// Everything recorded for one tournament, read under one acquisition.
    ///
    /// # Errors
    ///
    /// If the tournament doesn't exist or the store fails.
    fn snapshot(&self, tournament: TournamentId) -> Result<Snapshot, EngineError>;

    /// # Errors
    ///
    /// If the store fails.
    fn count_players(&self) -> Result<usize, EngineError>;

    /// # Errors
    ///
    /// If the store fails.
    fn count_tournaments(&self) -> Result<usize, EngineError>;

    /// Deletes every row of `table` and of the relations that depend on it.
    ///
    /// # Errors
    ///
    /// If the store fails.
    fn clear(&self, table: Table) -> Result<(), EngineError>;
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Table {
    Players,
    Tournaments,
    Entries,
    Matches,
    Byes,
}

impl Table {
    /// `self` followed by the relations that reference it.
    #[must_use]
    pub fn cleared_with(self) -> &'static [Table] {
        match self {
            Self::Players => &[Self::Players, Self::Entries, Self::Matches, Self::Byes],
            Self::Tournaments => &[Self::Tournaments, Self::Entries, Self::Matches, Self::Byes],
            Self::Entries => &[Self::Entries, Self::Matches, Self::Byes],
            Self::Matches => &[Self::Matches, Self::Byes],
            Self::Byes => &[Self::Byes],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Players => write!(f, "players"),
            Self::Tournaments => write!(f, "tournaments"),
            Self::Entries => write!(f, "entries"),
            Self::Matches => write!(f, "matches"),
            Self::Byes => write!(f, "byes"),
        }
    }
}

impl FromStr for Table {
    type Err = anyhow::Error;

    fn from_str(string: &str) -> anyhow::Result<Self> {
        match string {
            "players" => Ok(Self::Players),
            "tournaments" => Ok(Self::Tournaments),
            "entries" => Ok(Self::Entries),
            "matches" => Ok(Self::Matches),
            "byes" => Ok(Self::Byes),
            _ => Err(anyhow::Error::msg(format!(
                "Error trying to convert '{string}' to a Table!"
            ))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Enrolled {
    pub entry: Entry,
    pub player: Player,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub tournament: Tournament,
    /// In enrollment order.
    pub entries: Vec<Enrolled>,
    pub matches: Vec<MatchRecord>,
    pub byes: Vec<Bye>,
}

/// The last identifiers handed out, kept so a reset never reuses one.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Sequences {
    pub player: u64,
    pub tournament: u64,
    pub entry: u64,
}

/// The relations and their uniqueness indexes, without any locking.
///
/// Writes are split into a check that reads and a commit that can't fail, so
/// a store can persist a row between the two.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    last_player: u64,
    last_tournament: u64,
    last_sequence: u64,
    players: FxHashMap<PlayerId, Player>,
    tournaments: FxHashMap<TournamentId, Tournament>,
    entries: Vec<Entry>,
    enrolled: FxHashSet<(TournamentId, PlayerId)>,
    matches: Vec<MatchRecord>,
    played: FxHashSet<(TournamentId, PairKey)>,
    byes: Vec<Bye>,
    bye_holders: FxHashSet<(TournamentId, PlayerId)>,
}

impl Tables {
    /// # Errors
    ///
    /// If the name is invalid.
    pub fn prepare_player(&self, name: &str) -> Result<Player, EngineError> {
        Ok(Player {
            id: PlayerId(self.last_player + 1),
            name: clean_name(name)?,
        })
    }

    pub fn commit_player(&mut self, player: Player) {
        self.last_player = self.last_player.max(player.id.0);
        self.players.insert(player.id, player);
    }

    /// # Errors
    ///
    /// If the name is invalid.
    pub fn prepare_tournament(&self, name: &str) -> Result<Tournament, EngineError> {
        Ok(Tournament {
            id: TournamentId(self.last_tournament + 1),
            name: clean_name(name)?,
        })
    }

    pub fn commit_tournament(&mut self, tournament: Tournament) {
        self.last_tournament = self.last_tournament.max(tournament.id.0);
        self.tournaments.insert(tournament.id, tournament);
    }

    /// # Errors
    ///
    /// If either side is missing or the player is already enrolled.
    pub fn check_entry(
        &self,
        tournament: TournamentId,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        self.require_tournament(tournament)?;
        self.require_player(player)?;

        if self.enrolled.contains(&(tournament, player)) {
            return Err(EngineError::Conflict(Conflict::Entry { tournament, player }));
        }

        Ok(())
    }

    /// # Errors
    ///
    /// If either side is missing or the player is already enrolled.
    pub fn prepare_entry(
        &self,
        tournament: TournamentId,
        player: PlayerId,
    ) -> Result<Entry, EngineError> {
        self.check_entry(tournament, player)?;

        Ok(Entry {
            tournament,
            player,
            sequence: self.last_sequence + 1,
            round: current_round(&self.snapshot(tournament)?),
        })
    }

    pub fn commit_entry(&mut self, entry: Entry) {
        self.last_sequence = self.last_sequence.max(entry.sequence);
        self.enrolled.insert((entry.tournament, entry.player));
        self.entries.push(entry);
    }

    /// # Errors
    ///
    /// If a player is missing or not enrolled, the winner didn't play, or the
    /// pair already has a result.
    pub fn check_match(&self, record: &MatchRecord) -> Result<(), EngineError> {
        self.require_tournament(record.tournament)?;

        for player in [record.player_1, record.player_2] {
            self.require_player(player)?;
            self.require_enrolled(record.tournament, player)?;
        }

        if record.player_1 == record.player_2 {
            return Err(EngineError::Invalid(format!(
                "player {} can't play against themselves",
                record.player_1
            )));
        }

        if let Outcome::Winner(winner) = record.outcome
            && record.opponent_of(winner).is_none()
        {
            return Err(EngineError::Invalid(format!(
                "the winner {winner} didn't play in the match"
            )));
        }

        if self.played.contains(&(record.tournament, record.pair())) {
            return Err(EngineError::Conflict(Conflict::Match {
                tournament: record.tournament,
                player_1: record.player_1,
                player_2: record.player_2,
            }));
        }

        Ok(())
    }

    pub fn commit_match(&mut self, record: MatchRecord) {
        self.played.insert((record.tournament, record.pair()));
        self.matches.push(record);
    }

    /// # Errors
    ///
    /// If the player is missing, not enrolled, or already holds a bye.
    pub fn check_bye(&self, bye: &Bye) -> Result<(), EngineError> {
        self.require_tournament(bye.tournament)?;
        self.require_player(bye.player)?;
        self.require_enrolled(bye.tournament, bye.player)?;

        if self.bye_holders.contains(&(bye.tournament, bye.player)) {
            return Err(EngineError::Conflict(Conflict::Bye {
                tournament: bye.tournament,
                player: bye.player,
            }));
        }

        Ok(())
    }

    /// # Errors
    ///
    /// If the player is missing, not enrolled, or already holds a bye.
    pub fn prepare_bye(
        &self,
        tournament: TournamentId,
        player: PlayerId,
        round: u32,
    ) -> Result<Bye, EngineError> {
        let bye = Bye {
            tournament,
            player,
            round,
            matches_before: self
                .matches
                .iter()
                .filter(|record| record.tournament == tournament)
                .count(),
        };

        self.check_bye(&bye)?;
        Ok(bye)
    }

    pub fn commit_bye(&mut self, bye: Bye) {
        self.bye_holders.insert((bye.tournament, bye.player));
        self.byes.push(bye);
    }

    #[must_use]
    pub fn sequences(&self) -> Sequences {
        Sequences {
            player: self.last_player,
            tournament: self.last_tournament,
            entry: self.last_sequence,
        }
    }

    pub fn raise_sequences(&mut self, sequences: Sequences) {
        self.last_player = self.last_player.max(sequences.player);
        self.last_tournament = self.last_tournament.max(sequences.tournament);
        self.last_sequence = self.last_sequence.max(sequences.entry);
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.players.get(&id).cloned()
    }

    #[must_use]
    pub fn tournament(&self, id: TournamentId) -> Option<Tournament> {
        self.tournaments.get(&id).cloned()
    }

    #[must_use]
    pub fn count_players(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn count_tournaments(&self) -> usize {
        self.tournaments.len()
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn snapshot(&self, tournament: TournamentId) -> Result<Snapshot, EngineError> {
        let tournament = self.require_tournament(tournament)?.clone();

        let mut entries = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.tournament == tournament.id) {
            entries.push(Enrolled {
                entry: *entry,
                player: self.require_player(entry.player)?.clone(),
            });
        }
        entries.sort_by_key(|enrolled| enrolled.entry.sequence);

        Ok(Snapshot {
            matches: self
                .matches
                .iter()
                .filter(|record| record.tournament == tournament.id)
                .cloned()
                .collect(),
            byes: self
                .byes
                .iter()
                .filter(|bye| bye.tournament == tournament.id)
                .copied()
                .collect(),
            tournament,
            entries,
        })
    }

    /// Clears `table` and the relations that reference it.
    pub fn clear(&mut self, table: Table) {
        for cleared in table.cleared_with() {
            self.clear_only(*cleared);
        }
    }

    /// Clears `table` alone, leaving rows elsewhere that may point into it.
    pub fn clear_only(&mut self, table: Table) {
        match table {
            Table::Players => self.players.clear(),
            Table::Tournaments => self.tournaments.clear(),
            Table::Entries => {
                self.entries.clear();
                self.enrolled.clear();
            }
            Table::Matches => {
                self.matches.clear();
                self.played.clear();
            }
            Table::Byes => {
                self.byes.clear();
                self.bye_holders.clear();
            }
        }
    }

    fn require_player(&self, id: PlayerId) -> Result<&Player, EngineError> {
        self.players
            .get(&id)
            .ok_or(EngineError::NotFound(Missing::Player(id)))
    }

    fn require_tournament(&self, id: TournamentId) -> Result<&Tournament, EngineError> {
        self.tournaments
            .get(&id)
            .ok_or(EngineError::NotFound(Missing::Tournament(id)))
    }

    fn require_enrolled(
        &self,
        tournament: TournamentId,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        if self.enrolled.contains(&(tournament, player)) {
            Ok(())
        } else {
            Err(EngineError::NotRegistered { player, tournament })
        }
    }
}

/// A store that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, EngineError> {
        self.tables.lock().map_err(EngineError::store)
    }
}

impl Store for MemoryStore {
    fn insert_player(&self, name: &str) -> Result<Player, EngineError> {
        let mut tables = self.lock()?;
        let player = tables.prepare_player(name)?;
        tables.commit_player(player.clone());
        Ok(player)
    }

    fn insert_tournament(&self, name: &str) -> Result<Tournament, EngineError> {
        let mut tables = self.lock()?;
        let tournament = tables.prepare_tournament(name)?;
        tables.commit_tournament(tournament.clone());
        Ok(tournament)
    }

    fn insert_entry(
        &self,
        tournament: TournamentId,
        player: PlayerId,
    ) -> Result<Entry, EngineError> {
        let mut tables = self.lock()?;
        let entry = tables.prepare_entry(tournament, player)?;
        tables.commit_entry(entry);
        Ok(entry)
    }

    fn insert_match(&self, record: MatchRecord) -> Result<(), EngineError> {
        let mut tables = self.lock()?;
        tables.check_match(&record)?;
        tables.commit_match(record);
        Ok(())
    }

    fn insert_bye(
        &self,
        tournament: TournamentId,
        player: PlayerId,
        round: u32,
    ) -> Result<Bye, EngineError> {
        let mut tables = self.lock()?;
        let bye = tables.prepare_bye(tournament, player, round)?;
        tables.commit_bye(bye);
        Ok(bye)
    }

    fn player(&self, id: PlayerId) -> Result<Option<Player>, EngineError> {
        Ok(self.lock()?.player(id))
    }

    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>, EngineError> {
        Ok(self.lock()?.tournament(id))
    }

    fn snapshot(&self, tournament: TournamentId) -> Result<Snapshot, EngineError> {
        self.lock()?.snapshot(tournament)
    }

    fn count_players(&self) -> Result<usize, EngineError> {
        Ok(self.lock()?.count_players())
    }

    fn count_tournaments(&self) -> Result<usize, EngineError> {
        Ok(self.lock()?.count_tournaments())
    }

    fn clear(&self, table: Table) -> Result<(), EngineError> {
        self.lock()?.clear(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn two_players() -> anyhow::Result<(MemoryStore, TournamentId, PlayerId, PlayerId)> {
        let store = MemoryStore::new();
        let tournament = store.insert_tournament("Test")?.id;
        let player_1 = store.insert_player("Pencil")?.id;
        let player_2 = store.insert_player("Rubber")?.id;
        store.insert_entry(tournament, player_1)?;
        store.insert_entry(tournament, player_2)?;

        Ok((store, tournament, player_1, player_2))
    }

    #[test]
    fn ids_count_up_from_one() -> anyhow::Result<()> {
        let store = MemoryStore::new();

        assert_eq!(store.insert_player("A")?.id, PlayerId(1));
        assert_eq!(store.insert_player("B")?.id, PlayerId(2));
        assert_eq!(store.insert_tournament("T")?.id, TournamentId(1));

        store.clear(Table::Players)?;
        assert_eq!(store.count_players()?, 0);
        assert_eq!(store.insert_player("C")?.id, PlayerId(3));

        Ok(())
    }

    #[test]
    fn enrolling_twice_conflicts() -> anyhow::Result<()> {
        let (store, tournament, player_1, _) = two_players()?;

        assert_eq!(
            store.insert_entry(tournament, player_1),
            Err(EngineError::Conflict(Conflict::Entry {
                tournament,
                player: player_1
            }))
        );
        assert_eq!(
            store.insert_entry(tournament, PlayerId(99)),
            Err(EngineError::NotFound(Missing::Player(PlayerId(99))))
        );
        assert_eq!(
            store.insert_entry(TournamentId(99), player_1),
            Err(EngineError::NotFound(Missing::Tournament(TournamentId(99))))
        );

        Ok(())
    }

    #[test]
    fn matches_need_entries() -> anyhow::Result<()> {
        let (store, tournament, player_1, _) = two_players()?;
        let outsider = store.insert_player("Outsider")?.id;

        let record = MatchRecord::new(tournament, player_1, outsider, Outcome::Draw);
        assert_eq!(
            store.insert_match(record),
            Err(EngineError::NotRegistered {
                player: outsider,
                tournament
            })
        );

        Ok(())
    }

    #[test]
    fn racing_reports_resolve_to_one_match() -> anyhow::Result<()> {
        let (store, tournament, player_1, player_2) = two_players()?;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let (a, b) = if i % 2 == 0 {
                        (player_1, player_2)
                    } else {
                        (player_2, player_1)
                    };
                    store.insert_match(MatchRecord::new(tournament, a, b, Outcome::Winner(a)))
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            let result = handle
                .join()
                .map_err(|_| anyhow::Error::msg("a reporting thread panicked"))?;

            match result {
                Ok(()) => successes += 1,
                Err(error) => assert!(matches!(error, EngineError::Conflict(_))),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.snapshot(tournament)?.matches.len(), 1);

        Ok(())
    }

    #[test]
    fn clearing_entries_clears_the_ledger() -> anyhow::Result<()> {
        let (store, tournament, player_1, player_2) = two_players()?;
        store.insert_match(MatchRecord::new(
            tournament,
            player_1,
            player_2,
            Outcome::Draw,
        ))?;
        let bye = store.insert_bye(tournament, player_1, 2)?;
        assert_eq!(bye.matches_before, 1);

        store.clear(Table::Entries)?;
        let snapshot = store.snapshot(tournament)?;

        assert!(snapshot.entries.is_empty());
        assert!(snapshot.matches.is_empty());
        assert!(snapshot.byes.is_empty());
        assert_eq!(store.count_players()?, 2);

        Ok(())
    }
}
