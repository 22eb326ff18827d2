//! A Swiss-system tournament engine: registration, a match ledger, ranked
//! standings and next round pairings without rematches.
//!
//! ## Feature Flags
//!
//! * bench - enable the `pairing` benchmark
//!
//! ## Text Protocol
//!
//! The `swiss-tournament` binary drives an [`Engine`](engine::Engine) over
//! stdin or TCP with one [`Message`](message::Message) per line.

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

#![deny(clippy::panic)]

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod file_store;
pub mod ledger;
pub mod message;
pub mod outcome;
pub mod pairing;
pub mod player;
pub mod standings;
pub mod store;
pub mod tournament;
pub mod utils;

pub const HOME: &str = "swiss-tournament";

pub const COPYRIGHT: &str = r".SH COPYRIGHT
Copyright (C) 2025-2026 David Lawrence Campbell

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
";

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "
Copyright (c) 2025 David Lawrence Campbell
Licensed under the AGPLv3"
);
