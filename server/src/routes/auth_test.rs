use super::*;

fn input(username: &str, email: &str, password: &str, confirm: Option<&str>) -> RegisterInput {
    RegisterInput {
        username: Some(username.to_owned()),
        email: Some(email.to_owned()),
        password: Some(password.to_owned()),
        confirm_password: confirm.map(str::to_owned),
    }
}

#[test]
fn email_shape_checks() {
    assert!(is_valid_email("alice@example.com"));
    assert!(!is_valid_email("alice@example"));
    assert!(!is_valid_email("alice example@x.com"));
    assert!(!is_valid_email("@example.com"));
}

#[test]
fn normalize_trims_and_lowercases() {
    let req = normalize_registration(input("  alice ", " Alice@Example.COM ", "pw", Some("pw2"))).unwrap();
    assert_eq!(req.username, "alice");
    assert_eq!(req.email, "alice@example.com");
    assert_eq!(req.password, "pw");
    assert_eq!(req.confirm_password, "pw2");
}

#[test]
fn normalize_defaults_confirm_password() {
    let req = normalize_registration(input("alice", "alice@example.com", "pw", None)).unwrap();
    assert_eq!(req.confirm_password, "pw");
    let req = normalize_registration(input("alice", "alice@example.com", "pw", Some(""))).unwrap();
    assert_eq!(req.confirm_password, "pw");
}

#[test]
fn normalize_requires_fields() {
    let err = normalize_registration(input("alice", "", "pw", None)).unwrap_err();
    assert_eq!(err.to_string(), "Username, email, and password are required");
    let err = normalize_registration(RegisterInput::default()).unwrap_err();
    assert!(matches!(err, ProxyError::BadRequest(_)));
}

#[test]
fn normalize_rejects_bad_email() {
    let err = normalize_registration(input("alice", "not-an-email", "pw", None)).unwrap_err();
    assert_eq!(err.to_string(), "Invalid email format");
}

#[test]
fn form_content_type_detection() {
    let mut headers = HeaderMap::new();
    assert!(!is_form(&headers));
    headers.insert(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8".parse().unwrap());
    assert!(is_form(&headers));
}
