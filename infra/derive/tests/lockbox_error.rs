use lockbox_derive::lockbox_error;
use std::borrow::Cow;

#[lockbox_error]
pub enum SampleError {
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Missing entry{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn missing() -> Result<(), SampleError> {
    Err(SampleError::Missing { message: "entry 42".into(), context: None })
}

#[test]
fn context_is_attached_to_own_error() {
    let err = missing().context("during lookup").unwrap_err();
    assert!(matches!(err, SampleError::Missing { ref context, .. } if context.is_some()));
    assert!(err.to_string().contains("(during lookup)"));
}

#[test]
fn source_errors_convert_via_from() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: SampleError = io.into();
    assert!(matches!(err, SampleError::Io { context: None, .. }));
}

#[test]
fn source_errors_pick_up_context() {
    let result: Result<(), std::io::Error> =
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
    let err = result.context("while flushing").unwrap_err();
    assert!(matches!(err, SampleError::Io { ref context, .. } if context.is_some()));
}

#[test]
fn strings_convert_to_internal() {
    let err: SampleError = "logic violated".into();
    assert!(matches!(err, SampleError::Internal { .. }));

    let err: SampleError = format!("code {}", 7).into();
    assert!(err.to_string().contains("code 7"));
}
