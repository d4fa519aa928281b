#![no_main]

use crm_security::Action;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let action = Action::normalize(s);
        // Normalizing is idempotent.
        assert_eq!(Action::normalize(action.as_str()), action);
    }
});
