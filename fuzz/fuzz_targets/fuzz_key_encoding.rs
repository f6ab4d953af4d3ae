#![no_main]

use arbitrary::Arbitrary;
use confstack::{ConfigKey, KeyContext, KeyDecoder, KeyEncoder, KeySyntax};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    components: Vec<String>,
    literal: String,
}

fuzz_target!(|input: FuzzInput| {
    let key = ConfigKey::new(input.components).into_absolute();

    let syntaxes = [
        KeySyntax::DotSeparated,
        KeySyntax::CliFlag,
        KeySyntax::ScreamingSnake,
        KeySyntax::DirectoryFile,
    ];

    for syntax in syntaxes {
        let encoder = KeyEncoder::new(syntax);
        let decoder = KeyDecoder::new(syntax);

        // Encoding and decoding must never panic.
        let encoded = encoder.encode(&key);
        let decoded = decoder.decode(&encoded, KeyContext::new());

        // Decode then re-encode is idempotent on the encoder's image.
        let reencoded = encoder.encode(&decoded.clone().into_absolute());
        let redecoded = decoder.decode(&reencoded, KeyContext::new());
        assert_eq!(
            encoder.encode(&redecoded.into_absolute()),
            reencoded,
            "re-encoding must be stable for syntax {syntax:?}"
        );

        // Arbitrary literals decode without panicking too.
        let _ = decoder.decode(&input.literal, KeyContext::new());
    }

    // Ordering is consistent with itself.
    let other = decoder_smoke(&input.literal);
    let _ = key.as_relative().cmp(&other);
});

fn decoder_smoke(literal: &str) -> ConfigKey {
    KeyDecoder::dot_separated().decode(literal, KeyContext::new())
}
