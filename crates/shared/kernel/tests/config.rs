use lockbox_kernel::config::load_config;

#[derive(Debug, serde::Deserialize)]
struct TestConfig {
    name: String,
    port: u16,
}

#[test]
fn loads_from_toml_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("server.toml");
    std::fs::write(&path, "name = \"lockbox\"\nport = 4242\n").expect("write config");

    let cfg: TestConfig = load_config(Some(&path)).expect("config loads");
    assert_eq!(cfg.name, "lockbox");
    assert_eq!(cfg.port, 4242);
}

#[test]
fn missing_file_is_an_error() {
    let result = load_config::<TestConfig>(Some("does-not-exist"));
    assert!(result.is_err());
}
