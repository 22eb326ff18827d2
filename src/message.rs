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

//! The line oriented text protocol.
//!
//! One command per line, `#` starts a comment and blank lines are ignored. A
//! driver reads `= <payload>` on success and `? <error>` on failure.

use std::str::FromStr;

use crate::{outcome::Outcome, player::PlayerId, tournament::TournamentId};

pub static COMMANDS: [&str; 20] = [
    "clear_entries",
    "clear_matches",
    "clear_players",
    "clear_tournaments",
    "count_players",
    "count_tournaments",
    "enroll",
    "entries",
    "grant_bye",
    "known_command",
    "list_commands",
    "name",
    "pairings",
    "played_against",
    "register_player",
    "register_tournament",
    "report_match",
    "round",
    "standings",
    "version",
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Message {
    ClearEntries,
    ClearMatches,
    ClearPlayers,
    ClearTournaments,
    CountPlayers,
    CountTournaments,
    Empty,
    Enroll(PlayerId, TournamentId),
    Entries(TournamentId),
    GrantBye(TournamentId, PlayerId),
    KnownCommand(String),
    ListCommands,
    Name,
    Pairings(TournamentId),
    PlayedAgainst(TournamentId, PlayerId, PlayerId),
    RegisterPlayer(String),
    RegisterTournament(String),
    ReportMatch(TournamentId, PlayerId, PlayerId, Outcome),
    Round(TournamentId),
    Standings(TournamentId),
    Version,
}

impl FromStr for Message {
    type Err = anyhow::Error;

    fn from_str(message: &str) -> anyhow::Result<Self> {
        let words: Vec<&str> = message.split_ascii_whitespace().collect();

        let Some((command, arguments)) = words.split_first() else {
            return Ok(Self::Empty);
        };

        match (*command, arguments) {
            ("clear_entries", []) => Ok(Self::ClearEntries),
            ("clear_matches", []) => Ok(Self::ClearMatches),
            ("clear_players", []) => Ok(Self::ClearPlayers),
            ("clear_tournaments", []) => Ok(Self::ClearTournaments),
            ("count_players", []) => Ok(Self::CountPlayers),
            ("count_tournaments", []) => Ok(Self::CountTournaments),
            ("enroll", [player, tournament]) => {
                Ok(Self::Enroll(player.parse()?, tournament.parse()?))
            }
            ("entries", [tournament]) => Ok(Self::Entries(tournament.parse()?)),
            ("grant_bye", [tournament, player]) => {
                Ok(Self::GrantBye(tournament.parse()?, player.parse()?))
            }
            ("known_command", [command]) => Ok(Self::KnownCommand((*command).to_string())),
            ("list_commands", []) => Ok(Self::ListCommands),
            ("name", []) => Ok(Self::Name),
            ("pairings", [tournament]) => Ok(Self::Pairings(tournament.parse()?)),
            ("played_against", [tournament, player_1, player_2]) => Ok(Self::PlayedAgainst(
                tournament.parse()?,
                player_1.parse()?,
                player_2.parse()?,
            )),
            ("register_player", [_, ..]) => Ok(Self::RegisterPlayer(arguments.join(" "))),
            ("register_tournament", [_, ..]) => {
                Ok(Self::RegisterTournament(arguments.join(" ")))
            }
            ("report_match", [tournament, player_1, player_2, outcome]) => Ok(Self::ReportMatch(
                tournament.parse()?,
                player_1.parse()?,
                player_2.parse()?,
                outcome.parse()?,
            )),
            ("round", [tournament]) => Ok(Self::Round(tournament.parse()?)),
            ("standings", [tournament]) => Ok(Self::Standings(tournament.parse()?)),
            ("version", []) => Ok(Self::Version),
            (command, _) if COMMANDS.contains(&command) => Err(anyhow::Error::msg(format!(
                "{command}: wrong number of arguments"
            ))),
            (command, _) => Err(anyhow::Error::msg(format!(
                "the command '{command}' is not known"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_messages() -> anyhow::Result<()> {
        assert_eq!(Message::from_str("   ")?, Message::Empty);
        assert_eq!(
            Message::from_str("register_player  Ada   Lovelace")?,
            Message::RegisterPlayer("Ada Lovelace".to_string())
        );
        assert_eq!(
            Message::from_str("report_match 1 2 3 draw")?,
            Message::ReportMatch(TournamentId(1), PlayerId(2), PlayerId(3), Outcome::Draw)
        );
        assert_eq!(
            Message::from_str("report_match 1 2 3 3")?,
            Message::ReportMatch(
                TournamentId(1),
                PlayerId(2),
                PlayerId(3),
                Outcome::Winner(PlayerId(3))
            )
        );
        assert_eq!(
            Message::from_str("enroll 4 1")?,
            Message::Enroll(PlayerId(4), TournamentId(1))
        );

        Ok(())
    }

    #[test]
    fn reject_messages() {
        assert!(Message::from_str("register_player").is_err());
        assert!(Message::from_str("standings one").is_err());
        assert!(Message::from_str("pairings 1 2").is_err());
        assert!(Message::from_str("resign").is_err());
    }

    #[test]
    fn every_command_is_sorted_and_unique() {
        assert!(COMMANDS.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
