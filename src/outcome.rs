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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Outcome {
    #[default]
    Draw,
    Winner(PlayerId),
}

impl Outcome {
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Draw => None,
            Self::Winner(id) => Some(*id),
        }
    }
}

impl From<Option<PlayerId>> for Outcome {
    fn from(winner: Option<PlayerId>) -> Self {
        match winner {
            Some(id) => Self::Winner(id),
            None => Self::Draw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => write!(f, "draw"),
            Self::Winner(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.to_lowercase().as_str() {
            "draw" | "none" | "null" => Ok(Self::Draw),
            id => match PlayerId::from_str(id) {
                Ok(id) => Ok(Self::Winner(id)),
                Err(_) => Err(anyhow::Error::msg(format!("invalid outcome: {value}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_str() -> anyhow::Result<()> {
        assert_eq!(Outcome::from_str("draw")?, Outcome::Draw);
        assert_eq!(Outcome::from_str("None")?, Outcome::Draw);
        assert_eq!(Outcome::from_str("7")?, Outcome::Winner(PlayerId(7)));
        assert!(Outcome::from_str("attacker").is_err());
        Ok(())
    }

    #[test]
    fn outcome_winner() {
        assert_eq!(Outcome::from(Some(PlayerId(3))).winner(), Some(PlayerId(3)));
        assert_eq!(Outcome::from(None).winner(), None);
    }
}
