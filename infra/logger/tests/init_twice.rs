use lockbox_logger::{Logger, LoggerError};

#[test]
fn second_init_fails() {
    let _logger = Logger::builder().name("lockbox-test").init().expect("first init succeeds");

    let err = Logger::builder().name("lockbox-test").init().unwrap_err();
    assert!(matches!(err, LoggerError::Subscriber { .. }));
}
