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

use std::{borrow::Cow, str::FromStr, sync::Arc};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    directory,
    error::EngineError,
    ledger::{self, History, MatchRecord},
    message::{COMMANDS, Message},
    outcome::Outcome,
    pairing::{BACKTRACK_LIMIT, PairingMode, Round, plan_round},
    player::{Player, PlayerId},
    standings::{self, Standing},
    store::{MemoryStore, Store, Table},
    tournament::{Bye, Tournament, TournamentId},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pairing: PairingMode,
    /// Pairings the backtracking search may undo before giving up.
    pub backtrack_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pairing: PairingMode::default(),
            backtrack_limit: BACKTRACK_LIMIT,
        }
    }
}

/// A handle on a store, cheap to clone and share between connections.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    pub config: EngineConfig,
}

impl Engine {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    /// # Errors
    ///
    /// If the name is empty or holds control characters.
    pub fn register_player(&self, name: &str) -> Result<PlayerId, EngineError> {
        directory::register_player(self.store.as_ref(), name).map(|player| player.id)
    }

    /// # Errors
    ///
    /// If the name is empty or holds control characters.
    pub fn register_tournament(&self, name: &str) -> Result<TournamentId, EngineError> {
        directory::register_tournament(self.store.as_ref(), name).map(|tournament| tournament.id)
    }

    /// # Errors
    ///
    /// If either side doesn't exist or the player is already enrolled.
    pub fn enroll(&self, player: PlayerId, tournament: TournamentId) -> Result<(), EngineError> {
        directory::enroll(self.store.as_ref(), player, tournament).map(|_| ())
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn entries_of(&self, tournament: TournamentId) -> Result<Vec<Player>, EngineError> {
        directory::entries_of(self.store.as_ref(), tournament)
    }

    /// # Errors
    ///
    /// If the player doesn't exist.
    pub fn player(&self, id: PlayerId) -> Result<Player, EngineError> {
        directory::player(self.store.as_ref(), id)
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn tournament(&self, id: TournamentId) -> Result<Tournament, EngineError> {
        directory::tournament(self.store.as_ref(), id)
    }

    /// # Errors
    ///
    /// If the store fails.
    pub fn count_players(&self) -> Result<usize, EngineError> {
        self.store.count_players()
    }

    /// # Errors
    ///
    /// If the store fails.
    pub fn count_tournaments(&self) -> Result<usize, EngineError> {
        self.store.count_tournaments()
    }

    /// # Errors
    ///
    /// If a player is missing or not enrolled, the outcome names someone
    /// else, or the pair already has a result.
    pub fn report_match(
        &self,
        tournament: TournamentId,
        player_1: PlayerId,
        player_2: PlayerId,
        outcome: Outcome,
    ) -> Result<MatchRecord, EngineError> {
        ledger::report_match(self.store.as_ref(), tournament, player_1, player_2, outcome)
    }

    /// Grants a bye for the round in progress.
    ///
    /// # Errors
    ///
    /// If the player isn't enrolled or already holds a bye.
    pub fn grant_bye(&self, tournament: TournamentId, player: PlayerId) -> Result<Bye, EngineError> {
        let round = self.current_round(tournament)?;
        ledger::grant_bye(self.store.as_ref(), tournament, player, round)
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn played_against(
        &self,
        tournament: TournamentId,
        player_1: PlayerId,
        player_2: PlayerId,
    ) -> Result<bool, EngineError> {
        let snapshot = self.store.snapshot(tournament)?;
        let history: History = snapshot.matches.iter().collect();
        Ok(history.have_played(player_1, player_2))
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn current_round(&self, tournament: TournamentId) -> Result<u32, EngineError> {
        let snapshot = self.store.snapshot(tournament)?;
        Ok(standings::current_round(&snapshot))
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn standings(&self, tournament: TournamentId) -> Result<Vec<Standing>, EngineError> {
        let snapshot = self.store.snapshot(tournament)?;
        let standings = standings::standings(&snapshot);
        debug!("standings {tournament}: {}", standings.len());
        Ok(standings)
    }

    /// Pairs the next round and grants its bye, if the player count is odd.
    ///
    /// Nothing is written unless every player could be paired.
    ///
    /// # Errors
    ///
    /// If the tournament doesn't exist, somebody can't be paired, or the
    /// player due the bye already has one.
    pub fn next_round_pairings(&self, tournament: TournamentId) -> Result<Round, EngineError> {
        let snapshot = self.store.snapshot(tournament)?;

        let round = match plan_round(&snapshot, self.config.pairing, self.config.backtrack_limit) {
            Ok(round) => round,
            Err(error) => {
                debug!("next_round_pairings {tournament}: {error}");
                return Err(error);
            }
        };

        if let Some(player) = &round.bye {
            ledger::grant_bye(self.store.as_ref(), tournament, player.id, round.number)?;
        }

        info!(
            "next_round_pairings {tournament} round {}: {} pairings",
            round.number,
            round.pairings.len()
        );

        Ok(round)
    }

    /// # Errors
    ///
    /// If the store fails.
    pub fn clear_players(&self) -> Result<(), EngineError> {
        self.clear(Table::Players)
    }

    /// # Errors
    ///
    /// If the store fails.
    pub fn clear_tournaments(&self) -> Result<(), EngineError> {
        self.clear(Table::Tournaments)
    }

    /// # Errors
    ///
    /// If the store fails.
    pub fn clear_entries(&self) -> Result<(), EngineError> {
        self.clear(Table::Entries)
    }

    /// Clears every match result and, with them, every bye.
    ///
    /// # Errors
    ///
    /// If the store fails.
    pub fn clear_matches(&self) -> Result<(), EngineError> {
        self.clear(Table::Matches)
    }

    fn clear(&self, table: Table) -> Result<(), EngineError> {
        self.store.clear(table)?;
        info!("clear {table}");
        Ok(())
    }

    /// # Errors
    ///
    /// If the command is invalid or fails.
    pub fn read_line(&self, buffer: &str) -> anyhow::Result<Option<String>> {
        let mut buffer = Cow::from(buffer);
        if let Some(comment_offset) = buffer.find('#') {
            buffer.to_mut().replace_range(comment_offset.., "");
        }

        self.update(Message::from_str(buffer.as_ref())?)
    }

    /// # Errors
    ///
    /// If the command fails.
    #[allow(clippy::too_many_lines)]
    pub fn update(&self, message: Message) -> anyhow::Result<Option<String>> {
        match message {
            Message::ClearEntries => {
                self.clear_entries()?;
                Ok(Some(String::new()))
            }
            Message::ClearMatches => {
                self.clear_matches()?;
                Ok(Some(String::new()))
            }
            Message::ClearPlayers => {
                self.clear_players()?;
                Ok(Some(String::new()))
            }
            Message::ClearTournaments => {
                self.clear_tournaments()?;
                Ok(Some(String::new()))
            }
            Message::CountPlayers => Ok(Some(self.count_players()?.to_string())),
            Message::CountTournaments => Ok(Some(self.count_tournaments()?.to_string())),
            Message::Empty => Ok(None),
            Message::Enroll(player, tournament) => {
                self.enroll(player, tournament)?;
                Ok(Some(String::new()))
            }
            Message::Entries(tournament) => {
                Ok(Some(ron::ser::to_string(&self.entries_of(tournament)?)?))
            }
            Message::GrantBye(tournament, player) => {
                let bye = self.grant_bye(tournament, player)?;
                Ok(Some(bye.round.to_string()))
            }
            Message::KnownCommand(command) => {
                if COMMANDS.contains(&command.as_str()) {
                    Ok(Some("true".to_string()))
                } else {
                    Ok(Some("false".to_string()))
                }
            }
            Message::ListCommands => {
                let mut commands = "\n".to_string();
                commands.push_str(&COMMANDS.join("\n"));
                Ok(Some(commands))
            }
            Message::Name => {
                let name = env!("CARGO_PKG_NAME");
                Ok(Some(name.to_string()))
            }
            Message::Pairings(tournament) => Ok(Some(ron::ser::to_string(
                &self.next_round_pairings(tournament)?,
            )?)),
            Message::PlayedAgainst(tournament, player_1, player_2) => Ok(Some(
                self.played_against(tournament, player_1, player_2)?
                    .to_string(),
            )),
            Message::RegisterPlayer(name) => Ok(Some(self.register_player(&name)?.to_string())),
            Message::RegisterTournament(name) => {
                Ok(Some(self.register_tournament(&name)?.to_string()))
            }
            Message::ReportMatch(tournament, player_1, player_2, outcome) => {
                self.report_match(tournament, player_1, player_2, outcome)?;
                Ok(Some(String::new()))
            }
            Message::Round(tournament) => Ok(Some(self.current_round(tournament)?.to_string())),
            Message::Standings(tournament) => {
                Ok(Some(ron::ser::to_string(&self.standings(tournament)?)?))
            }
            Message::Version => {
                let version = env!("CARGO_PKG_VERSION");
                Ok(Some(version.to_string()))
            }
        }
    }
}
