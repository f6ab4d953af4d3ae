#![no_main]

use confstack::parser::{JsonParser, ParseOptions, SnapshotParser};
use confstack::ConfigType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parser = JsonParser::new();

    let Ok(table) = parser.parse(data, &ParseOptions::default()) else {
        return;
    };

    let keys: Vec<String> = table.keys().take(32).map(str::to_string).collect();
    for key in keys {
        let _ = table.lookup(&key, ConfigType::String);
        let _ = table.lookup(&key, ConfigType::Int);
        let _ = table.lookup(&key, ConfigType::Double);
        let _ = table.lookup(&key, ConfigType::Bytes);
        let _ = table.lookup(&key, ConfigType::IntArray);
    }
});
