#![no_main]

use libfuzzer_sys::fuzz_target;
use syncbot_core::{
    decode_from_chat_identifier, decode_from_review_body, encode_for_chat_identifier,
    encode_for_review_body,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    if let Some(token) = decode_from_review_body(&raw) {
        assert!(!token.channel_id.is_empty());
        assert!(token.thread_ts.contains('.'));
        let relinked = encode_for_review_body(&token, "");
        assert_eq!(decode_from_review_body(&relinked), Some(token));
    }

    if let Some(link) = decode_from_chat_identifier(&raw) {
        assert!(link.pr_number > 0);
        let identifier = encode_for_chat_identifier(link.pr_number, &link.repo.as_slug());
        assert_eq!(decode_from_chat_identifier(&identifier), Some(link));
    }
});
