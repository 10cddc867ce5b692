#![no_main]

use isisdm::subfield::{parse, serialize};
use isisdm::SubfieldKeys;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let all = parse(raw, None);
    assert!(all[0].is_main());
    let _ = serialize(&all);

    // first character picks a key set, the rest is the field
    let mut chars = raw.chars();
    if let Some(first) = chars.next() {
        if let Ok(keys) = SubfieldKeys::new(&first.to_string()) {
            let some = parse(chars.as_str(), Some(&keys));
            assert!(some[0].is_main());
        }
    }
});
