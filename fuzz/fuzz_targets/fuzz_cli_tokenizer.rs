#![no_main]

use arbitrary::Arbitrary;
use confstack::provider::{CliArgsProvider, ConfigProvider};
use confstack::{AbsoluteConfigKey, ConfigType};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    args: Vec<String>,
    lookups: Vec<String>,
}

fuzz_target!(|input: FuzzInput| {
    // Tokenization must never panic, whatever the argument vector.
    let provider = CliArgsProvider::with_args(input.args);

    for lookup in input.lookups.iter().take(16) {
        if lookup.is_empty() {
            continue;
        }
        let key = AbsoluteConfigKey::from(lookup.as_str());

        // Every type path must survive arbitrary flag values.
        for ty in [
            ConfigType::String,
            ConfigType::Int,
            ConfigType::Double,
            ConfigType::Bool,
            ConfigType::Bytes,
            ConfigType::StringArray,
            ConfigType::IntArray,
            ConfigType::DoubleArray,
            ConfigType::BoolArray,
            ConfigType::ByteChunkArray,
        ] {
            let _ = provider.value(&key, ty);
        }
    }

    let _ = provider.snapshot();
});
