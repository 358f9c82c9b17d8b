use super::*;
use crate::state::test_helpers::{FakeBackend, TEST_PASSWORD};

fn form(email: &str) -> RegisterForm {
    RegisterForm {
        email: email.to_owned(),
        password: "hunter22".into(),
        name: "  Ana Pérez ".into(),
        phone: Some("555-0100".into()),
        id_number: Some("   ".into()),
        birthdate: None,
        branch: Some("Caracas".into()),
    }
}

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_trims_and_lowercases() {
    assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
}

#[test]
fn normalize_email_rejects_malformed() {
    for raw in ["", "ana", "@example.com", "ana@", "a@b@c"] {
        assert!(matches!(normalize_email(raw), Err(AccountError::InvalidEmail)), "{raw:?}");
    }
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_returns_role_home() {
    let backend = FakeBackend::new();
    backend.add_user("boss@example.com", Role::Admin);
    backend.add_user("ana@example.com", Role::Customer);

    let admin = login(&backend, &backend, "Boss@example.com", TEST_PASSWORD).await.unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.home, "/admin");

    let customer = login(&backend, &backend, "ana@example.com", TEST_PASSWORD).await.unwrap();
    assert_eq!(customer.home, "/dashboard");
    assert!(backend.token_is_live(&customer.session.access_token));
}

#[tokio::test]
async fn login_wrong_password_is_sign_in_error() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", Role::Customer);
    let err = login(&backend, &backend, "ana@example.com", "nope").await.unwrap_err();
    assert!(matches!(err, AccountError::SignIn(BackendError::Status { status: 400, .. })));
}

#[tokio::test]
async fn login_empty_password_never_calls_backend() {
    let backend = FakeBackend::new();
    backend.set_auth_down(true);
    let err = login(&backend, &backend, "ana@example.com", "").await.unwrap_err();
    assert!(matches!(err, AccountError::EmptyPassword));
}

#[tokio::test]
async fn login_without_profile_fails() {
    let backend = FakeBackend::new();
    let (_, id) = backend.add_user("ana@example.com", Role::Customer);
    backend.remove_profile(id);
    let err = login(&backend, &backend, "ana@example.com", TEST_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AccountError::MissingProfile(missing) if missing == id));
}

#[tokio::test]
async fn login_with_unknown_role_fails() {
    let backend = FakeBackend::new();
    let (_, id) = backend.add_user("ana@example.com", Role::Customer);
    backend.set_unknown_role(id, "courier");
    let err = login(&backend, &backend, "ana@example.com", TEST_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AccountError::Profile(BackendError::UnknownRole(_))));
}

// =============================================================================
// register
// =============================================================================

#[tokio::test]
async fn register_creates_customer_profile() {
    let backend = FakeBackend::new();
    let outcome = register(&backend, &backend, form("New@Example.com")).await.unwrap();
    let RegisterOutcome::SignedIn(session) = outcome else {
        panic!("expected immediate sign-in");
    };

    let profile = backend.profile(session.user.id).expect("profile row");
    assert_eq!(profile.role, Role::Customer);
    assert_eq!(profile.email.as_deref(), Some("new@example.com"));
    assert_eq!(profile.name.as_deref(), Some("Ana Pérez"));
    assert_eq!(profile.phone.as_deref(), Some("555-0100"));
    assert!(profile.id_number.is_none(), "blank fields are dropped");
    assert_eq!(profile.branch.as_deref(), Some("Caracas"));
}

#[tokio::test]
async fn register_pending_confirmation_still_writes_profile() {
    let backend = FakeBackend::new();
    backend.set_require_confirmation(true);
    let outcome = register(&backend, &backend, form("new@example.com")).await.unwrap();
    let RegisterOutcome::PendingVerification(user) = outcome else {
        panic!("expected pending verification");
    };
    assert!(backend.profile(user.id).is_some());
}

#[tokio::test]
async fn register_duplicate_email_is_sign_up_error() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", Role::Customer);
    let err = register(&backend, &backend, form("ana@example.com")).await.unwrap_err();
    assert!(matches!(err, AccountError::SignUp(BackendError::Status { status: 422, .. })));
}

#[tokio::test]
async fn register_requires_name() {
    let backend = FakeBackend::new();
    let mut f = form("new@example.com");
    f.name = "  ".into();
    assert!(matches!(register(&backend, &backend, f).await, Err(AccountError::EmptyName)));
}

// =============================================================================
// current_account
// =============================================================================

#[tokio::test]
async fn current_account_anonymous_is_none() {
    let backend = FakeBackend::new();
    let view = current_account(&backend, &backend, &SessionContext::anonymous()).await.unwrap();
    assert!(view.is_none());
}

#[tokio::test]
async fn current_account_includes_profile() {
    let backend = FakeBackend::new();
    let (token, id) = backend.add_user("ana@example.com", Role::Customer);
    let view = current_account(&backend, &backend, &SessionContext::with_token(token))
        .await
        .unwrap()
        .expect("signed in");
    assert_eq!(view.user.id, id);
    assert_eq!(view.profile.map(|p| p.role), Some(Role::Customer));
}
