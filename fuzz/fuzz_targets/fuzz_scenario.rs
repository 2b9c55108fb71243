#![no_main]

use libfuzzer_sys::fuzz_target;

use infrastructure::config::ScenarioConfig;

// Fuzz the scenario parser with arbitrary YAML and JSON input.
//
// Exercises deserialization + ScenarioConfig::validate().
// Must never panic, only return Ok or Err.
fuzz_target!(|data: &[u8]| {
    // Only try UTF-8 valid strings (both formats require valid text)
    if let Ok(text) = std::str::from_utf8(data) {
        // Limit input size to avoid excessive parsing time
        if text.len() <= 64 * 1024 {
            let _ = ScenarioConfig::from_yaml(text);
            let _ = ScenarioConfig::from_json(text);
        }
    }
});
