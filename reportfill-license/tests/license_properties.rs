//! Property-based tests for activation codes.
//!
//! These verify properties that must always hold:
//! - Issued codes verify and return the claims they were issued with
//! - Any single-character change is rejected by the signature or decoder

mod common;

use common::{NOW, SECS_PER_DAY, parts, test_service};
use proptest::prelude::*;
use reportfill_license::{LicenseErrorKind, MAX_SUBJECT_CHARS};

fn label_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 _\u{4e00}-\u{4e2f}]{0,40}").unwrap()
}

fn code_char_strategy() -> impl Strategy<Value = char> {
    prop::sample::select(
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/"
            .chars()
            .collect::<Vec<_>>(),
    )
}

proptest! {
    #[test]
    fn roundtrip_preserves_claims(
        days in 1u32..3650,
        label in label_strategy(),
        bind in any::<bool>(),
    ) {
        let service = test_service();
        let code = service.issue_at(days, &label, bind, NOW).unwrap();
        let license = service.verify_at(&code, true, NOW).unwrap();

        let expected_label: String = label.chars().take(MAX_SUBJECT_CHARS).collect();
        prop_assert_eq!(license.validity_days, days);
        prop_assert_eq!(license.subject_label, expected_label);
        prop_assert_eq!(license.machine_bound, bind);
        prop_assert_eq!(license.machine_id.is_some(), bind);
        prop_assert_eq!(license.expires_at.timestamp(), NOW + i64::from(days) * SECS_PER_DAY);
        prop_assert_eq!(license.nonce.len(), 8);
    }

    #[test]
    fn single_character_tamper_is_rejected(
        days in 1u32..3650,
        label in label_strategy(),
        position in any::<prop::sample::Index>(),
        replacement in code_char_strategy(),
    ) {
        let service = test_service();
        let code = service.issue_at(days, &label, false, NOW).unwrap();
        let (payload, signature) = parts(&code);
        let mut chars: Vec<char> = format!("{payload}.{signature}").chars().collect();

        // Never touch the separator itself.
        let mut idx = position.index(chars.len());
        if chars[idx] == '.' {
            idx = (idx + 1) % chars.len();
        }
        let original = chars[idx];
        chars[idx] = if replacement != original {
            replacement
        } else if original == 'A' {
            'B'
        } else {
            'A'
        };
        let tampered: String = chars.into_iter().collect();

        let err = service.verify_at(&tampered, true, NOW).unwrap_err();
        prop_assert!(
            matches!(err.kind(), LicenseErrorKind::SignatureError | LicenseErrorKind::DecodeError),
            "unexpected rejection {:?}",
            err
        );
    }
}
