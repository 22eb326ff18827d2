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

use std::{io::Write as _, path::PathBuf};

use clap::{CommandFactory, Parser};
use swiss_tournament::{COPYRIGHT, LONG_VERSION};

/// Swiss Tournament
///
/// Pairs and ranks Swiss-system tournaments over a line oriented text
/// protocol read from stdin or TCP connections.
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(long_version = LONG_VERSION, about = "Swiss Tournament")]
pub(crate) struct Args {
    /// Whether to log on the debug level
    #[arg(long)]
    pub debug: bool,

    /// Whether the application is being run by systemd
    #[arg(long)]
    pub systemd: bool,

    /// Keep everything in memory, nothing is saved
    #[arg(long)]
    pub memory: bool,

    /// Where to keep the RON logs
    #[arg(long, value_name = "folder")]
    pub data_folder: Option<PathBuf>,

    /// Read settings from a RON file
    #[arg(long, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Undo earlier pairings when a player is left without an opponent
    #[arg(long)]
    pub backtracking: bool,

    /// How many pairings backtracking may undo before giving up
    #[arg(long, value_name = "steps")]
    pub backtrack_limit: Option<usize>,

    /// Listen for connections on host and port instead of reading stdin
    #[arg(long, value_name = "host:port")]
    pub tcp: Option<String>,

    /// Build the manpage
    #[arg(long)]
    pub man: bool,
}

impl Args {
    pub(crate) fn generate_man_page() -> anyhow::Result<()> {
        let mut buffer: Vec<u8> = Vec::default();
        let cmd = Self::command()
            .name("swiss-tournament")
            .long_version(None);
        let man = clap_mangen::Man::new(cmd).date("2026-10-16");

        man.render(&mut buffer)?;
        write!(buffer, "{COPYRIGHT}")?;

        std::fs::write("swiss-tournament.1", buffer)?;
        Ok(())
    }
}
