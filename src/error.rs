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

use std::fmt;

use thiserror::Error;

use crate::{player::PlayerId, tournament::TournamentId};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EngineError {
    #[error("conflict: {0}")]
    Conflict(Conflict),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(Missing),
    #[error("not registered: player {player} is not enrolled in tournament {tournament}")]
    NotRegistered {
        player: PlayerId,
        tournament: TournamentId,
    },
    #[error("store: {0}")]
    Store(String),
    #[error("unpairable: there is no legal opponent left for player {player}")]
    Unpairable { player: PlayerId },
}

impl EngineError {
    pub(crate) fn store<E: fmt::Display>(error: E) -> Self {
        Self::Store(error.to_string())
    }
}

/// The uniqueness invariant a rejected write would have broken.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Conflict {
    Bye {
        tournament: TournamentId,
        player: PlayerId,
    },
    Entry {
        tournament: TournamentId,
        player: PlayerId,
    },
    Match {
        tournament: TournamentId,
        player_1: PlayerId,
        player_2: PlayerId,
    },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bye { tournament, player } => write!(
                f,
                "player {player} already has a bye in tournament {tournament}"
            ),
            Self::Entry { tournament, player } => write!(
                f,
                "player {player} is already enrolled in tournament {tournament}"
            ),
            Self::Match {
                tournament,
                player_1,
                player_2,
            } => write!(
                f,
                "players {player_1} and {player_2} already played in tournament {tournament}"
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Missing {
    Player(PlayerId),
    Tournament(TournamentId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player {id}"),
            Self::Tournament(id) => write!(f, "tournament {id}"),
        }
    }
}
