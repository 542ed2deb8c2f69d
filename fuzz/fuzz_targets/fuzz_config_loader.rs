#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use skynt_phi::config::loader::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let loader = ConfigLoader::default();

        // Errors are expected; panics are not.
        let _ = loader.load_str(yaml_str, Path::new("fuzz.yaml"));
    }
});
