#![no_main]

use confstack::parser::{EnvFileParser, ParseOptions, SnapshotParser};
use confstack::ConfigType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parser = EnvFileParser::new();

    // Parsing arbitrary bytes must never panic; malformed lines drop.
    let Ok(table) = parser.parse(data, &ParseOptions::default()) else {
        return;
    };

    // Typed lookups over whatever survived must not panic either.
    let keys: Vec<String> = table.keys().take(32).map(str::to_string).collect();
    for key in keys {
        let _ = table.lookup(&key, ConfigType::String);
        let _ = table.lookup(&key, ConfigType::Int);
        let _ = table.lookup(&key, ConfigType::Bool);
        let _ = table.lookup(&key, ConfigType::StringArray);
    }
});
