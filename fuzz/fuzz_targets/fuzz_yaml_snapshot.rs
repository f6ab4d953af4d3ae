#![no_main]

use confstack::parser::{ParseOptions, SnapshotParser, YamlParser};
use confstack::ConfigType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parser = YamlParser::new();

    let Ok(table) = parser.parse(data, &ParseOptions::default()) else {
        return;
    };

    let keys: Vec<String> = table.keys().take(32).map(str::to_string).collect();
    for key in keys {
        let _ = table.lookup(&key, ConfigType::String);
        let _ = table.lookup(&key, ConfigType::Bool);
        let _ = table.lookup(&key, ConfigType::StringArray);
        let _ = table.lookup(&key, ConfigType::ByteChunkArray);
    }
});
