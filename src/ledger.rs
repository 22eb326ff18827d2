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

//! The append-only record of played matches and granted byes.

use std::fmt;

use chrono::Utc;
use log::{debug, info};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    error::EngineError,
    outcome::Outcome,
    player::PlayerId,
    store::Store,
    tournament::{Bye, TournamentId},
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchRecord {
    pub tournament: TournamentId,
    pub player_1: PlayerId,
    pub player_2: PlayerId,
    pub outcome: Outcome,
    /// Non-leap seconds since January 1, 1970 0:00:00 UTC.
    pub recorded_at: i64,
}

impl MatchRecord {
    #[must_use]
    pub fn new(
        tournament: TournamentId,
        player_1: PlayerId,
        player_2: PlayerId,
        outcome: Outcome,
    ) -> Self {
        Self {
            tournament,
            player_1,
            player_2,
            outcome,
            recorded_at: Utc::now().timestamp(),
        }
    }

    #[must_use]
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.player_1, self.player_2)
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.outcome.winner()
    }

    #[must_use]
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        if player == self.player_1 {
            Some(self.player_2)
        } else if player == self.player_2 {
            Some(self.player_1)
        } else {
            None
        }
    }
}

impl fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.tournament, self.player_1, self.player_2, self.outcome
        )
    }
}

/// Two players in no particular order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PairKey(PlayerId, PlayerId);

impl PairKey {
    #[must_use]
    pub fn new(a: PlayerId, b: PlayerId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Who has already played whom in one tournament.
#[derive(Clone, Debug, Default)]
pub struct History(FxHashSet<PairKey>);

impl History {
    #[must_use]
    pub fn have_played(&self, a: PlayerId, b: PlayerId) -> bool {
        self.0.contains(&PairKey::new(a, b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a MatchRecord> for History {
    fn from_iter<I: IntoIterator<Item = &'a MatchRecord>>(matches: I) -> Self {
        Self(matches.into_iter().map(MatchRecord::pair).collect())
    }
}

impl FromIterator<(PlayerId, PlayerId)> for History {
    fn from_iter<I: IntoIterator<Item = (PlayerId, PlayerId)>>(pairs: I) -> Self {
        Self(pairs.into_iter().map(|(a, b)| PairKey::new(a, b)).collect())
    }
}

/// Appends a match result to the ledger.
///
/// # Errors
///
/// If the players are the same, the winner is not one of the players, either
/// player is not enrolled, or the pair already has a result.
pub fn report_match(
    store: &dyn Store,
    tournament: TournamentId,
    player_1: PlayerId,
    player_2: PlayerId,
    outcome: Outcome,
) -> Result<MatchRecord, EngineError> {
    let record = MatchRecord::new(tournament, player_1, player_2, outcome);
    if let Err(error) = store.insert_match(record.clone()) {
        debug!("report_match {record}: {error}");
        return Err(error);
    }

    info!("report_match {record}");
    Ok(record)
}

/// Grants `player` a free win in `round`.
///
/// # Errors
///
/// If the player is not enrolled or already holds a bye in the tournament.
pub fn grant_bye(
    store: &dyn Store,
    tournament: TournamentId,
    player: PlayerId,
    round: u32,
) -> Result<Bye, EngineError> {
    match store.insert_bye(tournament, player, round) {
        Ok(bye) => {
            info!("grant_bye {tournament} {player} {round}");
            Ok(bye)
        }
        Err(error) => {
            debug!("grant_bye {tournament} {player} {round}: {error}");
            Err(error)
        }
    }
}
