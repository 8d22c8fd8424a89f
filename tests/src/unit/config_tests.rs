use pocketbook_core::{ClientSettings, ConfigError, IdentitySettings};
use std::fs;
use tempfile::TempDir;

#[test]
fn loads_an_explicit_config_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("pocketbook.yaml");
    fs::write(
        &path,
        r#"
api:
  url: http://localhost:3333
identity:
  provider: local
  uid: uid-ana
  display_name: Ana
  email: ana@example.com
  token: dev-token
"#,
    )
    .expect("write config");

    let settings = ClientSettings::load(Some(&path)).expect("settings");
    match settings.identity {
        IdentitySettings::Local { profile, token } => {
            assert_eq!(profile.uid, "uid-ana");
            assert_eq!(profile.label(), "Ana");
            assert_eq!(profile.email.as_deref(), Some("ana@example.com"));
            assert_eq!(token.as_deref(), Some("dev-token"));
        }
        other => panic!("expected local identity, got {other:?}"),
    }
}

#[test]
fn oauth_refresh_section_builds_a_provider() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("pocketbook.yml");
    fs::write(
        &path,
        "api:\n  url: http://localhost:3333\nidentity:\n  provider: oauth_refresh\n  uid: uid-ana\n  token_endpoint: http://127.0.0.1:9/token\n  refresh_token: r1\n",
    )
    .expect("write config");

    let settings = ClientSettings::load(Some(&path)).expect("settings");
    assert!(matches!(settings.identity, IdentitySettings::OAuthRefresh { .. }));
    let provider = settings.identity.build_provider();
    assert!(provider.current_identity().is_none());
}

#[test]
fn malformed_yaml_is_reported_with_context() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("pocketbook.yaml");
    fs::write(&path, "api: [unterminated").expect("write config");

    let err = ClientSettings::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.user_message().contains("invalid pocketbook.yaml"));
}

#[test]
fn missing_explicit_file_is_invalid() {
    let dir = TempDir::new().expect("temp dir");
    let err = ClientSettings::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}
