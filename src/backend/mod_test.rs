use super::*;
use crate::config::BackendTimeouts;

fn test_config() -> AppConfig {
    AppConfig {
        backend_url: "https://demo.example.co".into(),
        anon_key: "anon-key".into(),
        port: 3000,
        cookie_secure: false,
        timeouts: BackendTimeouts { request_secs: 1, connect_secs: 1 },
    }
}

#[test]
fn urls_join_base_and_path() {
    let client = BackendClient::new(&test_config()).unwrap();
    assert_eq!(client.auth_url("user"), "https://demo.example.co/auth/v1/user");
    assert_eq!(client.rest_url("packages"), "https://demo.example.co/rest/v1/packages");
}

#[test]
fn authorize_prefers_session_token() {
    let client = BackendClient::new(&test_config()).unwrap();
    let req = client
        .authorize(client.http.get("https://demo.example.co/x"), &SessionContext::with_token("user-jwt"))
        .build()
        .unwrap();
    assert_eq!(req.headers()["apikey"], "anon-key");
    assert_eq!(req.headers()["authorization"], "Bearer user-jwt");
}

#[test]
fn authorize_falls_back_to_anon_key() {
    let client = BackendClient::new(&test_config()).unwrap();
    let req = client
        .authorize(client.http.get("https://demo.example.co/x"), &SessionContext::anonymous())
        .build()
        .unwrap();
    assert_eq!(req.headers()["authorization"], "Bearer anon-key");
}

#[test]
fn error_message_reads_known_fields() {
    assert_eq!(
        error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(error_message(r#"{"code":422,"msg":"User already registered"}"#), "User already registered");
    assert_eq!(error_message(r#"{"message":"permission denied for table packages"}"#), "permission denied for table packages");
}

#[test]
fn error_message_falls_back_to_raw_body() {
    assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    assert_eq!(error_message(r#"{"unexpected":true}"#), r#"{"unexpected":true}"#);
}

#[test]
fn status_error_carries_status_and_message() {
    let err = status_error(401, r#"{"msg":"JWT expired"}"#);
    assert!(matches!(err, BackendError::Status { status: 401, ref message } if message == "JWT expired"));
}
