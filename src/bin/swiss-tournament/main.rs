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

#![deny(clippy::expect_used)]
#![deny(clippy::indexing_slicing)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

mod command_line;

use std::{
    io::{self, BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread,
};

use clap::Parser;
use log::{error, info};
use swiss_tournament::{
    config::Config,
    engine::Engine,
    file_store::FileStore,
    pairing::PairingMode,
    store::{MemoryStore, Store},
    utils,
};

use crate::command_line::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::init_logger(args.debug, args.systemd);

    if args.man {
        return Args::generate_man_page();
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if args.backtracking {
        config.engine.pairing = PairingMode::Backtracking;
    }
    if let Some(limit) = args.backtrack_limit {
        config.engine.backtrack_limit = limit;
    }

    let store: Arc<dyn Store> = if args.memory {
        info!("keeping everything in memory");
        Arc::new(MemoryStore::new())
    } else {
        let folder = match args.data_folder.or(config.data_folder) {
            Some(folder) => folder,
            None => utils::data_folder()?,
        };
        Arc::new(FileStore::open(folder)?)
    };

    info!("pairing: {}", config.engine.pairing);
    let engine = Engine::new(store, config.engine);

    if let Some(address) = args.tcp {
        serve_tcp(&engine, &address)
    } else {
        serve(&engine, io::stdin().lock(), io::stdout().lock())
    }
}

fn serve<R: BufRead, W: Write>(engine: &Engine, reader: R, mut writer: W) -> anyhow::Result<()> {
    for line in reader.lines() {
        let line = line?;

        match engine.read_line(&line) {
            Ok(Some(reply)) => writeln!(writer, "= {reply}")?,
            Ok(None) => {}
            Err(error) => writeln!(writer, "? {error}")?,
        }

        writer.flush()?;
    }

    Ok(())
}

fn serve_tcp(engine: &Engine, address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(address)?;
    info!("listening on {address} ...");

    for (index, stream) in (1_usize..).zip(listener.incoming()) {
        let stream = match stream {
            Ok(stream) => stream,
            Err(error) => {
                error!("stream: {error}");
                continue;
            }
        };

        let engine = engine.clone();
        thread::spawn(move || {
            if let Err(error) = handle_connection(&engine, index, stream) {
                error!("{index}: {error}");
            }
        });
    }

    Ok(())
}

fn handle_connection(engine: &Engine, index: usize, stream: TcpStream) -> anyhow::Result<()> {
    let peer_address = stream.peer_addr()?;
    info!("{index} connected from {peer_address}");

    let reader = BufReader::new(stream.try_clone()?);
    serve(engine, reader, stream)?;

    info!("{index} disconnected");
    Ok(())
}
