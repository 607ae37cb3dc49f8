#![no_main]
use libfuzzer_sys::fuzz_target;
use sessionvault::history::truncate_history;
use sessionvault::SessionData;

fuzz_target!(|data: &[u8]| {
    let Ok(session) = serde_json::from_slice::<SessionData>(data) else {
        return;
    };
    let encoded = serde_json::to_string(&session).expect("decoded session re-encodes");
    let again: SessionData = serde_json::from_str(&encoded).expect("re-encoded session decodes");
    assert_eq!(again.id, session.id);
    assert_eq!(again.version, session.version);

    let kept = truncate_history(&session.conversation_history, 1000, 10);
    assert!(kept.len() <= 10);
});
