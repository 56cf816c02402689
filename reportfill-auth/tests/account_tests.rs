mod common;

use chrono::TimeDelta;
use common::{EMAIL, FailingStore, PASSWORD, USERNAME, harness};
use pretty_assertions::assert_eq;
use reportfill_auth::{
    AuthConfig, AuthError, AuthErrorKind, AuthenticationService, CredentialStore, PasswordRule,
    ADMIN_ROLE, DEFAULT_ROLE,
};
use std::sync::Arc;

// ── Password complexity ──────────────────────────────────────────

#[test]
fn complexity_rules_apply_in_order() {
    let cases = [
        ("short1!", Err(PasswordRule::MinLength)),
        ("alllowercase1!", Err(PasswordRule::Uppercase)),
        ("ALLUPPERCASE1!", Err(PasswordRule::Lowercase)),
        ("NoDigitsHere!", Err(PasswordRule::Digit)),
        ("NoSpecial123", Err(PasswordRule::Special)),
        ("Valid1Pass!", Ok(())),
    ];
    for (password, expected) in cases {
        assert_eq!(
            AuthenticationService::validate_password_complexity(password),
            expected,
            "password {password:?}"
        );
    }
}

#[test]
fn length_is_checked_before_character_classes() {
    assert_eq!(
        AuthenticationService::validate_password_complexity("abc"),
        Err(PasswordRule::MinLength)
    );
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn register_creates_active_account() {
    let h = harness();
    assert!(h.user.active);
    assert_eq!(h.user.last_login, None);
    assert_eq!(h.user.created_at, common::start());
    assert!(!h.user.is_admin());
}

#[test]
fn register_rejects_weak_password() {
    let h = harness();
    let err = h.service.register("bob", "weak", "bob@example.com", DEFAULT_ROLE).unwrap_err();
    assert_eq!(err, AuthError::ComplexityViolation(PasswordRule::MinLength));
}

#[test]
fn register_checks_complexity_before_duplicates() {
    let h = harness();
    let err = h.service.register(USERNAME, "weak", EMAIL, DEFAULT_ROLE).unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::ComplexityViolation);
}

#[test]
fn register_rejects_duplicate_username_first() {
    let h = harness();
    let err = h.service.register(USERNAME, PASSWORD, EMAIL, DEFAULT_ROLE).unwrap_err();
    assert_eq!(err, AuthError::DuplicateUsername(USERNAME.into()));
}

#[test]
fn register_rejects_duplicate_email() {
    let h = harness();
    let err = h.service.register("bob", PASSWORD, EMAIL, DEFAULT_ROLE).unwrap_err();
    assert_eq!(err, AuthError::DuplicateEmail(EMAIL.into()));
}

#[test]
fn admin_role_is_recognized() {
    let h = harness();
    let admin = h.service.register("root", PASSWORD, "root@example.com", ADMIN_ROLE).unwrap();
    assert!(admin.is_admin());
}

// ── Password change ──────────────────────────────────────────────

#[test]
fn change_password_replaces_credentials() {
    let h = harness();
    h.service.change_password(h.user.id, PASSWORD, "Newer2Pass?").unwrap();
    assert!(h.service.authenticate(USERNAME, PASSWORD).is_err());
    assert!(h.service.authenticate(USERNAME, "Newer2Pass?").is_ok());
}

#[test]
fn change_password_requires_old_password() {
    let h = harness();
    let err = h.service.change_password(h.user.id, "Wrong1Pass!", "Newer2Pass?").unwrap_err();
    assert_eq!(err, AuthError::WrongPassword);
    assert_eq!(err.kind(), AuthErrorKind::InvalidCredentials);
    assert!(!err.to_string().contains("attempts left"));
    assert!(h.service.lockout().record(USERNAME).is_none());
    assert!(h.service.authenticate(USERNAME, PASSWORD).is_ok());
}

#[test]
fn change_password_rejects_weak_new_password() {
    let h = harness();
    let err = h.service.change_password(h.user.id, PASSWORD, "nouppercase1!").unwrap_err();
    assert_eq!(err, AuthError::ComplexityViolation(PasswordRule::Uppercase));
}

#[test]
fn change_password_for_unknown_user_fails() {
    let h = harness();
    let err = h.service.change_password(999, PASSWORD, "Newer2Pass?").unwrap_err();
    assert_eq!(err, AuthError::WrongPassword);
}

// ── Account status ───────────────────────────────────────────────

#[test]
fn toggle_active_flips_status() {
    let h = harness();
    assert!(!h.service.toggle_active(h.user.id).unwrap());
    assert!(h.service.authenticate(USERNAME, PASSWORD).is_err());
    assert!(h.service.toggle_active(h.user.id).unwrap());
    assert!(h.service.authenticate(USERNAME, PASSWORD).is_ok());
}

#[test]
fn toggle_unknown_user_is_not_found() {
    let h = harness();
    assert_eq!(h.service.toggle_active(999), Err(AuthError::NotFound(999)));
    assert_eq!(h.service.set_active(999, true), Err(AuthError::NotFound(999)));
}

#[test]
fn list_users_is_newest_first() {
    let h = harness();
    h.clock.advance(TimeDelta::seconds(10));
    h.service.register("bob", PASSWORD, "bob@example.com", DEFAULT_ROLE).unwrap();
    let names: Vec<String> = h
        .service
        .list_users()
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["bob".to_string(), USERNAME.to_string()]);
}

#[test]
fn store_failure_surfaces_as_unavailable() {
    let service = AuthenticationService::new(Arc::new(FailingStore), AuthConfig::default());
    let err = service.list_users().unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::StoreUnavailable);
    let err = service.register("bob", PASSWORD, "bob@example.com", DEFAULT_ROLE).unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::StoreUnavailable);
}

// ── Permissions ──────────────────────────────────────────────────

#[test]
fn permissions_follow_role() {
    let h = harness();
    h.store.grant_permission(DEFAULT_ROLE, "reports.view").unwrap();
    h.store.grant_permission(ADMIN_ROLE, "users.manage").unwrap();

    assert!(h.service.has_permission(h.user.id, "reports.view").unwrap());
    assert!(!h.service.has_permission(h.user.id, "users.manage").unwrap());
    assert_eq!(h.service.permissions(h.user.id).unwrap().len(), 1);
}

#[test]
fn require_permission_denies_missing_grant() {
    let h = harness();
    h.store.grant_permission(DEFAULT_ROLE, "reports.view").unwrap();
    assert!(h.service.require_permission(h.user.id, "reports.view").is_ok());
    assert_eq!(
        h.service.require_permission(h.user.id, "users.manage"),
        Err(AuthError::PermissionDenied("users.manage".into()))
    );
}

#[test]
fn unknown_user_has_no_permissions() {
    let h = harness();
    h.store.grant_permission(DEFAULT_ROLE, "reports.view").unwrap();
    assert!(h.service.permissions(999).unwrap().is_empty());
}
