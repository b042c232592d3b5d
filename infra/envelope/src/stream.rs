use crate::types::Keystream;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncRead, ReadBuf};

/// An [`AsyncRead`] adapter that applies a keystream to everything read
/// from the inner source.
///
/// Used to encrypt a blob upload on its way into the store and to decrypt
/// a blob download on its way out. The adapter owns the source, so
/// dropping the wrapper releases the underlying handle; wrapping never
/// leaks the original stream.
pub struct CipherReader<R> {
    inner: R,
    stream: Box<dyn Keystream>,
}

impl<R> std::fmt::Debug for CipherReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherReader").finish_non_exhaustive()
    }
}

impl<R> CipherReader<R> {
    /// Wraps `inner`, transforming all bytes read through `stream`.
    pub fn new(inner: R, stream: Box<dyn Keystream>) -> Self {
        Self { inner, stream }
    }

    /// Returns the inner reader, abandoning the keystream position.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CipherReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let already_filled = buf.filled().len();

        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        // Only the bytes this call produced go through the keystream;
        // earlier buffer content has been transformed already.
        this.stream.apply(&mut buf.filled_mut()[already_filled..]);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Cipher;
    use crate::types::{Cfb, Envelope};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reader_roundtrip_matches_eager_encryption() {
        let cipher = Cipher::<Cfb>::new();
        let plaintext = b"stream me through the envelope cipher".to_vec();

        let sealer = cipher.sealer("password", "meta").unwrap();
        let (envelope, keystream) = sealer.into_parts();

        let mut encrypted = Vec::new();
        CipherReader::new(plaintext.as_slice(), keystream)
            .read_to_end(&mut encrypted)
            .await
            .unwrap();
        assert_ne!(encrypted, plaintext);

        let opener = cipher.opener("password", &envelope).unwrap();
        let mut decrypted = Vec::new();
        CipherReader::new(encrypted.as_slice(), opener)
            .read_to_end(&mut decrypted)
            .await
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[tokio::test]
    async fn wrong_password_decrypts_to_garbage() {
        let cipher = Cipher::<Cfb>::new();
        let plaintext = b"the envelope is not authenticated".to_vec();

        let mut sealer = cipher.sealer("right", "meta").unwrap();
        let mut encrypted = plaintext.clone();
        sealer.apply(&mut encrypted);
        let envelope: Envelope = sealer.into_parts().0;

        let opener = cipher.opener("wrong", &envelope).unwrap();
        let mut decrypted = Vec::new();
        CipherReader::new(encrypted.as_slice(), opener)
            .read_to_end(&mut decrypted)
            .await
            .unwrap();
        assert_ne!(decrypted, plaintext);
    }
}
