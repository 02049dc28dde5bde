#![no_main]

use libfuzzer_sys::fuzz_target;
use syncbot_github::{parse_github_webhook, verify_sha256_hmac_signature};

fuzz_target!(|data: &[u8]| {
    for event in ["pull_request", "issue_comment", "ping"] {
        if let Ok(Some(parsed)) = parse_github_webhook(event, data) {
            assert!(!parsed.kind().is_empty());
        }
    }

    let header = String::from_utf8_lossy(data);
    let _ = verify_sha256_hmac_signature(b"{}", &header, "fuzz-secret");
});
