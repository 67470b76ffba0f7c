#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mm_types::{Bar, EngineConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const MINUTE_MS: i64 = 60_000;
pub const START_MS: i64 = 1_704_067_200_000; // 2024-01-01 00:00:00 UTC

/// Writes a single-definition manifest.
pub fn write_manifest(dir: &Path, file: &str, body: &serde_json::Value) -> PathBuf {
    let path = dir.join(file);
    let doc = serde_json::json!({ "indicators": [body] });
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

/// Manifest binding `id` to `kernel` with default parameters.
pub fn simple_manifest(dir: &Path, file: &str, id: &str, kernel: &str) -> PathBuf {
    write_manifest(
        dir,
        file,
        &serde_json::json!({"id": id, "display_name": id, "kernel": kernel}),
    )
}

/// Repository plugin directory (`project` or `composite`).
pub fn shipped_plugins(namespace: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../plugins")
        .join(namespace)
}

/// Config with an isolated storage path and no scan directories.
pub fn isolated_config(storage: &Path) -> EngineConfig {
    EngineConfig {
        storage_path: storage.to_path_buf(),
        ..EngineConfig::default()
    }
}

/// Seeded random-walk minute bars.
pub fn random_walk_bars(len: usize, seed: u64) -> Vec<Bar> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    (0..len)
        .map(|i| {
            let open = price;
            price *= 1.0 + rng.gen_range(-0.01..0.01);
            let ts = START_MS + i64::try_from(i).unwrap() * MINUTE_MS;
            Bar::new(
                ts,
                open,
                open.max(price) * 1.001,
                open.min(price) * 0.999,
                price,
                rng.gen_range(1.0..50.0),
            )
        })
        .collect()
}

pub fn end_of(bars: &[Bar]) -> i64 {
    bars.last().map_or(START_MS, |b| b.open_time)
}
