use lockbox_envelope::{Cfb, Cipher, Envelope, EnvelopeError};

fn seal(cipher: &Cipher, password: &str, meta: &str, content: &mut Vec<u8>) -> String {
    let mut sealer = cipher.sealer(password, meta).expect("sealer");
    sealer.apply(content);
    sealer.envelope().to_json().expect("envelope json")
}

#[test]
fn seal_open_roundtrip() {
    let cipher = Cipher::<Cfb>::new();
    let plaintext = b"4111 1111 1111 1111".to_vec();

    let mut content = plaintext.clone();
    let stored_meta = seal(&cipher, "vault-password", "visa", &mut content);
    assert_ne!(content, plaintext, "content must be ciphertext after sealing");

    let envelope = Envelope::parse(&stored_meta).expect("stored meta parses");
    assert_eq!(envelope.content, "visa");

    cipher.opener("vault-password", &envelope).expect("opener").apply(&mut content);
    assert_eq!(content, plaintext);
}

#[test]
fn wrong_password_yields_garbage_not_error() {
    let cipher = Cipher::<Cfb>::new();
    let plaintext = b"hunter2".to_vec();

    let mut content = plaintext.clone();
    let stored_meta = seal(&cipher, "correct", "m", &mut content);

    let envelope = Envelope::parse(&stored_meta).unwrap();
    cipher.opener("incorrect", &envelope).expect("opening never fails on password").apply(
        &mut content,
    );
    assert_ne!(content, plaintext);
}

#[test]
fn same_content_seals_differently_every_time() {
    let cipher = Cipher::<Cfb>::new();

    let mut first = b"identical".to_vec();
    let mut second = b"identical".to_vec();
    seal(&cipher, "pw", "m", &mut first);
    seal(&cipher, "pw", "m", &mut second);

    assert_ne!(first, second, "fresh salt+IV must randomize ciphertext");
}

#[test]
fn stored_meta_survives_an_untrusted_store() {
    // The envelope round-trips through plain string storage.
    let cipher = Cipher::<Cfb>::new();
    let sealer = cipher.sealer("pw", "account: alice@example.com").unwrap();
    let raw = sealer.envelope().to_json().unwrap();

    let restored = Envelope::parse(&raw).unwrap();
    assert_eq!(&restored, sealer.envelope());
}

#[test]
fn plain_meta_does_not_parse_as_envelope() {
    let err = Envelope::parse("{\"content\": \"missing crypto fields\"}").unwrap_err();
    assert!(matches!(err, EnvelopeError::Malformed { .. }));
}
