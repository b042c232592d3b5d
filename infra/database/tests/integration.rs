use lockbox_database::*;

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    db.health().await.expect("health check");
    db.use_ns("test_ns").use_db("test_db").await.expect("session switch");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("first init");

    // Counters exist after bootstrap and survive a second application.
    let mut response = db
        .query("SELECT VALUE value FROM sequences:resources")
        .await
        .expect("counter query")
        .check()
        .map_err(surrealdb::Error::from)
        .expect("counter check");
    let value: Option<i64> = response.take(0).expect("counter value");
    assert_eq!(value, Some(0));
}
