#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tokenizing never panics, and whatever tokenizes reconstitutes exactly.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(tokens) = stdprop::lexer::tokenize(s) {
            assert_eq!(stdprop::lexer::untokenize(&tokens), s);
        }
    }
});
