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

use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use log::{debug, info};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::EngineError,
    ledger::MatchRecord,
    player::{Player, PlayerId},
    store::{Sequences, Snapshot, Store, Table, Tables},
    tournament::{Bye, Entry, Tournament, TournamentId},
};

const PLAYERS_FILE: &str = "players.ron";
const TOURNAMENTS_FILE: &str = "tournaments.ron";
const ENTRIES_FILE: &str = "entries.ron";
const MATCHES_FILE: &str = "matches.ron";
const BYES_FILE: &str = "byes.ron";
const SEQUENCES_FILE: &str = "sequences.ron";

fn file_name(table: Table) -> &'static str {
    match table {
        Table::Players => PLAYERS_FILE,
        Table::Tournaments => TOURNAMENTS_FILE,
        Table::Entries => ENTRIES_FILE,
        Table::Matches => MATCHES_FILE,
        Table::Byes => BYES_FILE,
    }
}

/// A store that keeps one append-only RON log per relation, one row per line.
///
/// Every write is checked against the in-memory tables, appended to its log,
/// and only then committed, so a failed append leaves no trace in memory.
#[derive(Debug)]
pub struct FileStore {
    folder: PathBuf,
    tables: Mutex<Tables>,
}

impl FileStore {
    /// Replays the logs found in `folder`, creating it if needed.
    ///
    /// # Errors
    ///
    /// If the folder can't be created, a log can't be read or parsed, or the
    /// logs break an invariant of the store.
    pub fn open<P: Into<PathBuf>>(folder: P) -> Result<Self, EngineError> {
        let folder = folder.into();
        fs::create_dir_all(&folder).map_err(EngineError::store)?;

        let mut tables = Tables::default();

        let sequences_file = folder.join(SEQUENCES_FILE);
        match fs::read_to_string(&sequences_file) {
            Ok(string) => match ron::from_str::<Sequences>(&string) {
                Ok(sequences) => tables.raise_sequences(sequences),
                Err(error) => {
                    return Err(EngineError::Store(format!(
                        "RON: {}: {error}",
                        sequences_file.display()
                    )));
                }
            },
            Err(error) => match error.kind() {
                ErrorKind::NotFound => {}
                _ => return Err(EngineError::store(error)),
            },
        }

        for player in read_log::<Player>(&folder, Table::Players)? {
            tables.commit_player(player);
        }
        for tournament in read_log::<Tournament>(&folder, Table::Tournaments)? {
            tables.commit_tournament(tournament);
        }
        for entry in read_log::<Entry>(&folder, Table::Entries)? {
            tables.check_entry(entry.tournament, entry.player)?;
            tables.commit_entry(entry);
        }
        for record in read_log::<MatchRecord>(&folder, Table::Matches)? {
            tables.check_match(&record)?;
            tables.commit_match(record);
        }
        for bye in read_log::<Bye>(&folder, Table::Byes)? {
            tables.check_bye(&bye)?;
            tables.commit_bye(bye);
        }

        info!(
            "loaded {} players and {} tournaments from {}",
            tables.count_players(),
            tables.count_tournaments(),
            folder.display()
        );

        Ok(Self {
            folder,
            tables: Mutex::new(tables),
        })
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, EngineError> {
        self.tables.lock().map_err(EngineError::store)
    }

    fn append<T: Serialize>(&self, table: Table, row: &T) -> Result<(), EngineError> {
        let mut line = ron::ser::to_string(row).map_err(EngineError::store)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.folder.join(file_name(table)))
            .map_err(EngineError::store)?;

        file.write_all(line.as_bytes()).map_err(EngineError::store)
    }
}

fn read_log<T: DeserializeOwned>(folder: &Path, table: Table) -> Result<Vec<T>, EngineError> {
    let path = folder.join(file_name(table));

    let string = match fs::read_to_string(&path) {
        Ok(string) => string,
        Err(error) => match error.kind() {
            ErrorKind::NotFound => {
                debug!("{} not found, starting empty", path.display());
                return Ok(Vec::new());
            }
            _ => return Err(EngineError::store(error)),
        },
    };

    let mut rows = Vec::new();
    for (number, line) in (1..).zip(string.lines()) {
        if line.trim().is_empty() {
            continue;
        }

        match ron::from_str(line) {
            Ok(row) => rows.push(row),
            Err(error) => {
                return Err(EngineError::Store(format!(
                    "RON: {}:{number}: {error}",
                    path.display()
                )));
            }
        }
    }

    Ok(rows)
}

impl Store for FileStore {
    fn insert_player(&self, name: &str) -> Result<Player, EngineError> {
        let mut tables = self.lock()?;
        let player = tables.prepare_player(name)?;
        self.append(Table::Players, &player)?;
        tables.commit_player(player.clone());
        Ok(player)
    }

    fn insert_tournament(&self, name: &str) -> Result<Tournament, EngineError> {
        let mut tables = self.lock()?;
        let tournament = tables.prepare_tournament(name)?;
        self.append(Table::Tournaments, &tournament)?;
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
        self.append(Table::Entries, &entry)?;
        tables.commit_entry(entry);
        Ok(entry)
    }

    fn insert_match(&self, record: MatchRecord) -> Result<(), EngineError> {
        let mut tables = self.lock()?;
        tables.check_match(&record)?;
        self.append(Table::Matches, &record)?;
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
        self.append(Table::Byes, &bye)?;
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
        let mut tables = self.lock()?;

        let sequences = ron::ser::to_string(&tables.sequences()).map_err(EngineError::store)?;
        fs::write(self.folder.join(SEQUENCES_FILE), sequences).map_err(EngineError::store)?;

        // Dependents go first, so a failed truncation leaves memory and the
        // logs agreeing on a consistent prefix of the reset.
        for cleared in table.cleared_with().iter().rev() {
            File::create(self.folder.join(file_name(*cleared))).map_err(EngineError::store)?;
            tables.clear_only(*cleared);
        }

        info!("cleared {table} in {}", self.folder.display());
        Ok(())
    }
}
