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
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

/// Settings read from a RON file, all of them optional.
///
/// ```ron
/// (
///     engine: (pairing: Backtracking, backtrack_limit: 10000),
///     data_folder: Some("/var/lib/swiss-tournament"),
/// )
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub data_folder: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration, a missing file is the default configuration.
    ///
    /// # Errors
    ///
    /// If the file can't be read or isn't valid RON.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(string) => ron::from_str(&string).map_err(|error| {
                anyhow::Error::msg(format!("RON: {}: {error}", path.display()))
            }),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pairing::PairingMode;

    use super::*;

    #[test]
    fn partial_configs_fill_in_defaults() -> anyhow::Result<()> {
        let config: Config = ron::from_str("(engine: (pairing: Backtracking))")?;

        assert_eq!(config.engine.pairing, PairingMode::Backtracking);
        assert_eq!(config.engine.backtrack_limit, EngineConfig::default().backtrack_limit);
        assert_eq!(config.data_folder, None);

        Ok(())
    }

    #[test]
    fn a_missing_file_is_the_default() -> anyhow::Result<()> {
        let config = Config::load(Path::new("/nonexistent/swiss-tournament.ron"))?;
        assert_eq!(config, Config::default());

        Ok(())
    }
}
