#[cfg(feature = "bench")]
use std::time::Duration;

#[cfg(feature = "bench")]
use criterion::{Criterion, criterion_group, criterion_main};

#[cfg(feature = "bench")]
use swiss_tournament::{
    directory, ledger,
    outcome::Outcome,
    pairing::{BACKTRACK_LIMIT, PairingMode, plan_round},
    store::{MemoryStore, Snapshot, Store},
};

/// A tournament of `players` after `rounds` rounds where the first player of
/// each pairing wins.
#[cfg(feature = "bench")]
fn played_rounds(players: usize, rounds: u32) -> anyhow::Result<Snapshot> {
    let store = MemoryStore::new();
    let tournament = directory::register_tournament(&store, "Bench")?.id;

    for index in 0..players {
        let player = directory::register_player(&store, &format!("Player {index}"))?.id;
        directory::enroll(&store, player, tournament)?;
    }

    for _ in 0..rounds {
        let round = plan_round(&store.snapshot(tournament)?, PairingMode::Greedy, 0)?;

        if let Some(player) = &round.bye {
            ledger::grant_bye(&store, tournament, player.id, round.number)?;
        }

        for pairing in &round.pairings {
            ledger::report_match(
                &store,
                tournament,
                pairing.id_1,
                pairing.id_2,
                Outcome::Winner(pairing.id_1),
            )?;
        }
    }

    Ok(store.snapshot(tournament)?)
}

#[cfg(feature = "bench")]
fn pairings(c: &mut Criterion) {
    let snapshot = played_rounds(257, 6).unwrap();

    c.bench_function("greedy", |b| {
        b.iter(|| plan_round(&snapshot, PairingMode::Greedy, 0));
    });

    c.bench_function("backtracking", |b| {
        b.iter(|| plan_round(&snapshot, PairingMode::Backtracking, BACKTRACK_LIMIT));
    });
}

#[cfg(feature = "bench")]
criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = pairings
}

#[cfg(feature = "bench")]
criterion_main!(benches);

#[cfg(not(feature = "bench"))]
fn main() {
    eprintln!("You must enable pass `--features=bench`");
}
