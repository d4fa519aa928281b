#![no_main]

use crm_access::AccessConfig;
use figment::Figment;
use figment::providers::{Format, Yaml};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = Figment::new().merge(Yaml::string(s)).extract::<AccessConfig>() {
            let _ = config.validate().and_then(|()| config.compile_policy());
        }
    }
});
