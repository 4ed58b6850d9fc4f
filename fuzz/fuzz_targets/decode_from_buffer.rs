#![no_main]

use libfuzzer_sys::fuzz_target;
use sizefit::engine::decode_source;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Any input must come back as an image or an error, never a crash.
    if let Ok(image) = decode_source(data) {
        assert!(image.width() > 0 && image.height() > 0);
    }
});
