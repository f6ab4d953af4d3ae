//! Performance benchmarks for the hot read path.
//!
//! Run with: `cargo bench -p confstack`

use std::sync::Arc;

use confstack::provider::{ConfigProvider, EnvVarsProvider, InMemoryProvider, MultiProvider};
use confstack::{AbsoluteConfigKey, ConfigReader, ConfigType};

fn main() {
    divan::main();
}

fn in_memory(entries: usize) -> InMemoryProvider {
    let mut provider = InMemoryProvider::new("bench");
    for i in 0..entries {
        provider = provider.with_value(format!("section{}.key{i}", i % 10), format!("value{i}"));
    }
    provider
}

#[divan::bench(args = [16, 256, 4096])]
fn in_memory_hit(bencher: divan::Bencher, entries: usize) {
    let provider = in_memory(entries);
    let key = AbsoluteConfigKey::from("section0.key0");

    bencher.bench(|| provider.value(divan::black_box(&key), ConfigType::String));
}

#[divan::bench]
fn in_memory_miss(bencher: divan::Bencher) {
    let provider = in_memory(256);
    let key = AbsoluteConfigKey::from("absent.key");

    bencher.bench(|| provider.value(divan::black_box(&key), ConfigType::String));
}

#[divan::bench]
fn env_typed_parse(bencher: divan::Bencher) {
    let provider = EnvVarsProvider::with_values([("BENCH_PORT", "8080")]);
    let key = AbsoluteConfigKey::from("bench.port");

    bencher.bench(|| provider.value(divan::black_box(&key), ConfigType::Int));
}

#[divan::bench(args = [2, 4, 8])]
fn multi_fallthrough(bencher: divan::Bencher, layers: usize) {
    // The hit sits in the last layer; every read walks the whole stack.
    let mut providers: Vec<Arc<dyn ConfigProvider>> = Vec::new();
    for i in 0..layers - 1 {
        providers.push(Arc::new(InMemoryProvider::new(format!("empty{i}"))));
    }
    providers.push(Arc::new(
        InMemoryProvider::new("last").with_value("needle", "found"),
    ));
    let multi = MultiProvider::new(providers).unwrap();
    let key = AbsoluteConfigKey::from("needle");

    bencher.bench(|| multi.resolve(divan::black_box(&key), ConfigType::String));
}

#[divan::bench]
fn reader_get_with_conversion(bencher: divan::Bencher) {
    let reader = ConfigReader::new(Arc::new(
        InMemoryProvider::new("bench").with_value("n", 42i64),
    ));

    bencher.bench(|| reader.get::<i64>(divan::black_box("n")));
}

#[divan::bench]
fn key_decode_and_scope(bencher: divan::Bencher) {
    let reader = ConfigReader::new(Arc::new(
        InMemoryProvider::new("bench").with_value("app.db.pool.size", 8i64),
    ))
    .scoped("app")
    .scoped("db");

    bencher.bench(|| reader.get::<i64>(divan::black_box("pool.size")));
}
