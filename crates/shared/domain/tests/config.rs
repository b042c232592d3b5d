use lockbox_domain::config::ApiConfig;

#[test]
fn defaults_are_usable() {
    let cfg: ApiConfig = serde_json::from_str("{}").expect("empty config deserializes");

    assert_eq!(cfg.server.port, 8443);
    assert!(cfg.server.ssl.is_none());
    assert_eq!(cfg.database.url, "mem://");
    assert_eq!(cfg.storage.blobs_dir, std::path::Path::new("blobs"));
    assert_eq!(cfg.security.token.lifespan_seconds, 3600);
    assert_eq!(cfg.security.credentials.username_min_len, 3);
}

#[test]
fn nested_overrides_apply() {
    let cfg: ApiConfig = serde_json::from_str(
        r#"{
            "server": { "port": 9000 },
            "database": { "url": "rocksdb://data/lockbox" },
            "security": { "token": { "lifespan_seconds": 60 } }
        }"#,
    )
    .expect("config deserializes");

    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.database.url, "rocksdb://data/lockbox");
    assert_eq!(cfg.security.token.lifespan_seconds, 60);
    // Untouched sections keep their defaults.
    assert_eq!(cfg.security.credentials.password_min_len, 6);
}
