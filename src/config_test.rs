use super::*;

/// # Safety
/// Only `from_env_reads_defaults_then_overrides` touches these variables.
unsafe fn clear_client_env() {
    unsafe {
        std::env::remove_var("SUPPORTDESK_API_URL");
        std::env::remove_var("SUPPORTDESK_TIMEOUT_SECS");
        std::env::remove_var("SUPPORTDESK_STATE_DIR");
    }
}

#[test]
fn from_env_reads_defaults_then_overrides() {
    unsafe { clear_client_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, DEFAULT_API_URL);
    assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    assert!(cfg.state_dir.is_none());

    unsafe {
        std::env::set_var("SUPPORTDESK_API_URL", "https://support.example.test/api/");
        std::env::set_var("SUPPORTDESK_TIMEOUT_SECS", "5");
        std::env::set_var("SUPPORTDESK_STATE_DIR", "/tmp/supportdesk-state");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "https://support.example.test/api");
    assert_eq!(cfg.timeout, Duration::from_secs(5));
    assert_eq!(cfg.state_dir, Some(PathBuf::from("/tmp/supportdesk-state")));

    unsafe { std::env::set_var("SUPPORTDESK_API_URL", "ftp://nope") };
    let err = ClientConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("invalid API base URL"));

    unsafe { clear_client_env() };
}

#[test]
fn normalize_base_url_trims_trailing_slashes() {
    assert_eq!(normalize_base_url("http://localhost:5000/api//").unwrap(), "http://localhost:5000/api");
    assert_eq!(normalize_base_url("  https://x.test  ").unwrap(), "https://x.test");
}

#[test]
fn normalize_base_url_rejects_non_http() {
    assert!(normalize_base_url("localhost:5000").is_err());
    assert!(normalize_base_url("").is_err());
}

#[test]
fn env_parse_u64_falls_back_on_garbage_and_zero() {
    let key = "__TEST_SD_TIMEOUT_GARBAGE_311__";
    unsafe { std::env::set_var(key, "soon") };
    assert_eq!(env_parse_u64(key, 30), 30);
    unsafe { std::env::set_var(key, "0") };
    assert_eq!(env_parse_u64(key, 30), 30);
    unsafe { std::env::set_var(key, " 12 ") };
    assert_eq!(env_parse_u64(key, 30), 12);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn resolve_state_dir_prefers_explicit_dir() {
    let cfg = ClientConfig::default().with_state_dir(PathBuf::from("/var/lib/sd"));
    assert_eq!(cfg.resolve_state_dir().unwrap(), PathBuf::from("/var/lib/sd"));
}
