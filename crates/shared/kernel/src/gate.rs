//! One-shot gated values.
//!
//! A [`Gate`] is a write-once cell with an awaitable read: readers suspend
//! until the value is published, the first (and only) write releases them
//! all. The publishing side is a separate [`GateHandle`] whose `set`
//! consumes it, so a second write is a compile-time impossibility.
//!
//! Used to hand long-lived resources (like the database connection) from
//! the lifecycle task to request handlers that may start before the
//! resource is ready. The await inside [`Gate::get`] is an ordinary
//! suspension point, so a caller whose future is dropped stops waiting
//! immediately.

use std::borrow::Cow;
use tokio::sync::watch;

/// Error returned when the gate can never be set anymore.
#[lockbox_derive::lockbox_error]
pub enum GateError {
    /// The publishing side was dropped without setting a value.
    #[error("Gate closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Creates a connected one-shot gate pair.
#[must_use]
pub fn gate<T: Clone + Send + Sync>() -> (GateHandle<T>, Gate<T>) {
    let (tx, rx) = watch::channel(None);
    (GateHandle { tx }, Gate { rx })
}

/// The publishing side of a one-shot gate.
#[derive(Debug)]
pub struct GateHandle<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> GateHandle<T> {
    /// Publishes the value, releasing every current and future reader.
    ///
    /// Consumes the handle: publishing twice does not compile.
    pub fn set(self, value: T) {
        // Send errors only when every reader is gone, in which case there
        // is nobody left to observe the value anyway.
        let _ = self.tx.send(Some(value));
    }
}

/// The reading side of a one-shot gate.
#[derive(Debug, Clone)]
pub struct Gate<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> Gate<T> {
    /// Waits for the value to be published and returns a clone of it.
    ///
    /// # Errors
    /// Returns [`GateError::Closed`] if the [`GateHandle`] was dropped
    /// before publishing.
    pub async fn get(&self) -> Result<T, GateError> {
        let mut rx = self.rx.clone();
        let value = rx.wait_for(Option::is_some).await.map_err(|_| GateError::Closed {
            message: "value was never published".into(),
            context: None,
        })?;
        Ok((*value).clone().expect("guarded by wait_for"))
    }

    /// Returns the value if it has already been published.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn get_waits_for_set() {
        let (handle, gate) = gate::<String>();

        let reader = tokio::spawn({
            let gate = gate.clone();
            async move { gate.get().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.set("ready".to_owned());

        assert_eq!(reader.await.unwrap().unwrap(), "ready");
        assert_eq!(gate.try_get().as_deref(), Some("ready"));
    }

    #[tokio::test]
    async fn dropped_handle_closes_gate() {
        let (handle, gate) = gate::<u32>();
        drop(handle);

        let err = gate.get().await.unwrap_err();
        assert!(matches!(err, GateError::Closed { .. }));
        assert!(gate.try_get().is_none());
    }
}
