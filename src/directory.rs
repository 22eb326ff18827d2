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

//! Who is registered and who is enrolled where.

use log::{debug, info};

use crate::{
    error::{EngineError, Missing},
    player::{Player, PlayerId},
    store::Store,
    tournament::{Entry, Tournament, TournamentId},
};

/// # Errors
///
/// If the name is empty or holds control characters.
pub fn register_player(store: &dyn Store, name: &str) -> Result<Player, EngineError> {
    let player = store.insert_player(name)?;
    info!("register_player {player}");
    Ok(player)
}

/// # Errors
///
/// If the name is empty or holds control characters.
pub fn register_tournament(store: &dyn Store, name: &str) -> Result<Tournament, EngineError> {
    let tournament = store.insert_tournament(name)?;
    info!("register_tournament {tournament}");
    Ok(tournament)
}

/// # Errors
///
/// If the player or the tournament doesn't exist, or the player is already
/// enrolled.
pub fn enroll(
    store: &dyn Store,
    player: PlayerId,
    tournament: TournamentId,
) -> Result<Entry, EngineError> {
    match store.insert_entry(tournament, player) {
        Ok(entry) => {
            info!("enroll {player} {tournament} {}", entry.sequence);
            Ok(entry)
        }
        Err(error) => {
            debug!("enroll {player} {tournament}: {error}");
            Err(error)
        }
    }
}

/// The players enrolled in `tournament`, in enrollment order.
///
/// # Errors
///
/// If the tournament doesn't exist.
pub fn entries_of(store: &dyn Store, tournament: TournamentId) -> Result<Vec<Player>, EngineError> {
    let snapshot = store.snapshot(tournament)?;
    debug!("entries_of {tournament}: {}", snapshot.entries.len());

    Ok(snapshot
        .entries
        .into_iter()
        .map(|enrolled| enrolled.player)
        .collect())
}

/// # Errors
///
/// If the player doesn't exist.
pub fn player(store: &dyn Store, id: PlayerId) -> Result<Player, EngineError> {
    store
        .player(id)?
        .ok_or(EngineError::NotFound(Missing::Player(id)))
}

/// # Errors
///
/// If the tournament doesn't exist.
pub fn tournament(store: &dyn Store, id: TournamentId) -> Result<Tournament, EngineError> {
    store
        .tournament(id)?
        .ok_or(EngineError::NotFound(Missing::Tournament(id)))
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;

    use super::*;

    #[test]
    fn entries_keep_enrollment_order() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let tournament = register_tournament(&store, "Spring Open")?;
        let alice = register_player(&store, "Alice")?;
        let bob = register_player(&store, "Bob")?;
        let carol = register_player(&store, "Carol")?;

        enroll(&store, carol.id, tournament.id)?;
        enroll(&store, alice.id, tournament.id)?;
        enroll(&store, bob.id, tournament.id)?;

        assert_eq!(entries_of(&store, tournament.id)?, [carol, alice, bob]);

        Ok(())
    }

    #[test]
    fn unknown_ids() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let tournament = register_tournament(&store, "Spring Open")?;

        assert_eq!(
            enroll(&store, PlayerId(7), tournament.id),
            Err(EngineError::NotFound(Missing::Player(PlayerId(7))))
        );
        assert_eq!(
            entries_of(&store, TournamentId(9)),
            Err(EngineError::NotFound(Missing::Tournament(TournamentId(9))))
        );
        assert_eq!(
            player(&store, PlayerId(7)),
            Err(EngineError::NotFound(Missing::Player(PlayerId(7))))
        );
        assert_eq!(super::tournament(&store, tournament.id)?.name, "Spring Open");

        Ok(())
    }

    #[test]
    fn names_are_cleaned() -> anyhow::Result<()> {
        let store = MemoryStore::new();

        assert_eq!(register_player(&store, "  Dana  ")?.name, "Dana");
        assert!(matches!(
            register_player(&store, "   "),
            Err(EngineError::Invalid(_))
        ));
        assert!(matches!(
            register_tournament(&store, "bad\u{7}name"),
            Err(EngineError::Invalid(_))
        ));

        Ok(())
    }
}
