//! Enveloped and signed-and-enveloped messages.

mod common;

use common::{payload, rsa_identity, Identity};
use pkcs7_engine::domain::constants::PKCS7_ENVELOPED_VERSION;
use pkcs7_engine::domain::pkcs7::Envelope;
use pkcs7_engine::{
    CipherAlgorithm, CipherSpec, EncryptOptions, EncryptWorkflow, Pkcs7, Pkcs7Error, RecipientKey,
};

fn recipients(n: u32) -> Vec<Identity> {
    (0..n)
        .map(|i| rsa_identity(&format!("Recipient {i}"), 100 + i))
        .collect()
}

fn every_recipient_decrypts(n: u32) {
    let ids = recipients(n);
    let certs: Vec<_> = ids.iter().map(|id| id.cert.clone()).collect();
    let data = payload(5_000);

    let workflow = EncryptWorkflow::default();
    let p7 = workflow
        .encrypt(&certs, &data, None, &EncryptOptions::default())
        .unwrap();
    assert_eq!(p7.recipient_infos().unwrap().len(), n as usize);

    // Wire round trip before decrypting.
    let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
    for (i, id) in ids.iter().enumerate() {
        let info = &parsed.recipient_infos().unwrap()[i];
        assert_eq!(info.serial_number(), id.cert.serial_number());
        assert_eq!(info.encrypted_key().unwrap().len(), 256);
        assert_eq!(workflow.decrypt(&parsed, &id.key, &id.cert).unwrap(), data);
    }
}

#[test]
fn single_recipient() {
    every_recipient_decrypts(1);
}

#[test]
fn three_recipients() {
    every_recipient_decrypts(3);
}

#[test]
fn ten_recipients() {
    every_recipient_decrypts(10);
}

#[test]
fn outsider_is_not_a_recipient() {
    let ids = recipients(2);
    let outsider = rsa_identity("Outsider", 999);
    let certs: Vec<_> = ids.iter().map(|id| id.cert.clone()).collect();
    let p7 = EncryptWorkflow::default()
        .encrypt(&certs, b"secret", None, &EncryptOptions::default())
        .unwrap();

    assert!(matches!(
        EncryptWorkflow::default().decrypt(&p7, &outsider.key, &outsider.cert),
        Err(Pkcs7Error::RecipientNotFound(_))
    ));
}

#[test]
fn incomplete_envelopes_are_rejected() {
    let id = rsa_identity("Recipient", 7);

    let mut no_recipients = Pkcs7::new_enveloped();
    no_recipients
        .set_cipher(CipherSpec::new(CipherAlgorithm::Aes128Cbc))
        .unwrap();
    assert!(matches!(
        no_recipients.data_init(),
        Err(Pkcs7Error::IncompleteMessage(_))
    ));

    let mut no_cipher = Pkcs7::new_enveloped();
    no_cipher.add_recipient(&id.cert).unwrap();
    assert!(matches!(
        no_cipher.data_init(),
        Err(Pkcs7Error::IncompleteMessage(_))
    ));
    assert!(matches!(
        no_cipher.to_der(),
        Err(Pkcs7Error::IncompleteMessage(_))
    ));
}

#[test]
fn every_cipher_round_trips() {
    let id = rsa_identity("Recipient", 8);
    let data = payload(1_000);
    // Single DES lives in OpenSSL 3's legacy provider.
    for alg in CipherAlgorithm::ALL
        .into_iter()
        .filter(|alg| *alg != CipherAlgorithm::DesCbc)
    {
        let p7 = EncryptWorkflow::default()
            .encrypt(
                std::slice::from_ref(&id.cert),
                &data,
                Some(CipherSpec::new(alg)),
                &EncryptOptions::default(),
            )
            .unwrap();
        let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
        let plain = EncryptWorkflow::default()
            .decrypt(&parsed, &id.key, &id.cert)
            .unwrap();
        assert_eq!(plain, data, "{alg}");
    }
}

#[test]
fn explicit_key_material_is_used() {
    let id = rsa_identity("Recipient", 9);
    let key = vec![0x11; 32];
    let iv = vec![0x22; 16];
    let spec = CipherSpec::with_key(CipherAlgorithm::Aes256Cbc, key.clone(), iv.clone()).unwrap();

    let p7 = EncryptWorkflow::default()
        .encrypt(
            std::slice::from_ref(&id.cert),
            b"sixteen byte msg",
            Some(spec),
            &EncryptOptions::default(),
        )
        .unwrap();

    let ciphertext = p7
        .as_enveloped()
        .unwrap()
        .envelope()
        .encrypted_content()
        .ciphertext()
        .unwrap()
        .to_vec();
    let expected = openssl::symm::encrypt(
        openssl::symm::Cipher::aes_256_cbc(),
        &key,
        Some(&iv),
        b"sixteen byte msg",
    )
    .unwrap();
    // Full block of padding appended.
    assert_eq!(ciphertext.len(), 32);
    assert_eq!(ciphertext, expected);
}

#[test]
fn text_mode_adds_and_strips_header() {
    let id = rsa_identity("Recipient", 12);
    let options = EncryptOptions { text: true };
    let workflow = EncryptWorkflow::default();
    let p7 = workflow
        .encrypt(std::slice::from_ref(&id.cert), b"a\nb\n", None, &options)
        .unwrap();

    let raw = workflow.decrypt(&p7, &id.key, &id.cert).unwrap();
    assert!(raw.starts_with(b"Content-Type: text/plain\r\n\r\n"));
    assert_eq!(workflow.decrypt_text(&p7, &id.key, &id.cert).unwrap(), b"a\r\nb\r\n");
}

#[test]
fn streaming_decode_yields_plaintext() {
    let id = rsa_identity("Recipient", 13);
    let data = payload(3_333);
    let mut p7 = Pkcs7::new_enveloped();
    p7.add_recipient(&id.cert).unwrap();
    p7.set_cipher(CipherSpec::new(CipherAlgorithm::DesEde3Cbc))
        .unwrap();

    let mut chain = p7.data_init().unwrap();
    chain.copy_from(&mut data.as_slice(), 64).unwrap();
    p7.data_final(chain).unwrap();

    let mut decode = p7
        .data_decode(Some(RecipientKey::new(&id.key, &id.cert)), None)
        .unwrap();
    let mut out = Vec::new();
    decode.drain_to(&mut out, 100).unwrap();
    assert_eq!(out, data);

    assert!(matches!(
        p7.data_decode(None, None),
        Err(Pkcs7Error::InvalidInput(_))
    ));
}

#[test]
fn envelope_encrypts_standalone() {
    let ids = recipients(2);
    let certs: Vec<_> = ids.iter().map(|id| id.cert.clone()).collect();
    let mut envelope = Envelope::new(PKCS7_ENVELOPED_VERSION);
    envelope
        .encrypt_for(&certs, CipherSpec::new(CipherAlgorithm::Aes192Cbc), b"payload")
        .unwrap();

    assert_eq!(envelope.recipient_infos().len(), 2);
    for id in &ids {
        assert_eq!(envelope.decrypt_with(&id.key, &id.cert).unwrap(), b"payload");
    }
    let outsider = rsa_identity("Outsider", 77);
    assert!(matches!(
        envelope.find_recipient(&outsider.cert),
        Err(Pkcs7Error::RecipientNotFound(_))
    ));
}

#[test]
fn signed_and_enveloped_round_trip() {
    let signer = rsa_identity("Signer", 200);
    let ids = recipients(3);
    let certs: Vec<_> = ids.iter().map(|id| id.cert.clone()).collect();
    let data = payload(2_048);

    let workflow = EncryptWorkflow::default();
    let p7 = workflow
        .sign_and_encrypt(
            &signer.cert,
            signer.key.clone(),
            &certs,
            &data,
            None,
            &EncryptOptions::default(),
        )
        .unwrap();
    assert!(p7.is_signed_and_enveloped());
    assert!(p7.to_der().is_ok());

    let no_lookup: Vec<pkcs7_engine::Certificate> = Vec::new();
    for id in &ids {
        assert_eq!(
            workflow
                .decrypt_and_verify(&p7, &id.key, &id.cert, &no_lookup)
                .unwrap(),
            data
        );
        assert_eq!(workflow.decrypt(&p7, &id.key, &id.cert).unwrap(), data);
    }

    let err = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap_err();
    assert!(matches!(err, Pkcs7Error::UnsupportedOperation { .. }));
}

#[test]
fn signed_and_enveloped_needs_a_signer() {
    let id = rsa_identity("Recipient", 300);
    let mut p7 = Pkcs7::new_signed_and_enveloped();
    p7.add_recipient(&id.cert).unwrap();
    p7.set_cipher(CipherSpec::new(CipherAlgorithm::Aes256Cbc))
        .unwrap();
    assert!(matches!(
        p7.finalize(b"data"),
        Err(Pkcs7Error::IncompleteMessage(_))
    ));
}
