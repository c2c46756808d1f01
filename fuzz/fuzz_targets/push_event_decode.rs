#![no_main]

use libfuzzer_sys::fuzz_target;
use loglens_pipeline::{decode_push_event, encode_push_event};

fuzz_target!(|data: &[u8]| {
    match decode_push_event(data) {
        Ok(event) => {
            let encoded = encode_push_event(&event.record, &event.attributes)
                .expect("decoded record must re-encode");
            let decoded = decode_push_event(&encoded).expect("re-encoded event must decode");
            assert_eq!(decoded.record, event.record);
            assert_eq!(decoded.attributes, event.attributes);
        }
        Err(error) => {
            assert!(!error.reason_code().trim().is_empty());
        }
    }
});
