//! Filter chain behaviour across stage combinations.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256, Sha512};

use common::payload;
use pkcs7_engine::domain::crypto::{CipherContext, CipherMode, DigestContext};
use pkcs7_engine::services::bio::{MemBio, NullBio, ReaderBio, WriterBio};
use pkcs7_engine::{BioChain, BioType, CipherAlgorithm, CipherSpec, DigestAlgorithm, Pkcs7Error};

fn keyed(alg: CipherAlgorithm) -> CipherSpec {
    let mut spec = CipherSpec::new(alg);
    spec.ensure_key_material().unwrap();
    spec
}

#[test]
fn digest_stage_matches_reference_for_any_chunking() {
    let data = payload(65_537);
    for chunk in [1, 7, 64, 4096, data.len()] {
        let mut chain = BioChain::new(NullBio)
            .push_digest(DigestContext::new(DigestAlgorithm::Sha256).unwrap())
            .push_digest(DigestContext::new(DigestAlgorithm::Sha512).unwrap());
        for piece in data.chunks(chunk) {
            chain.write_all(piece).unwrap();
        }
        chain.flush().unwrap();

        let sha256 = chain.find_digest(DigestAlgorithm::Sha256).unwrap().digest().unwrap();
        let sha512 = chain.find_digest(DigestAlgorithm::Sha512).unwrap().digest().unwrap();
        assert_eq!(sha256.as_slice(), Sha256::digest(&data).as_slice(), "chunk {chunk}");
        assert_eq!(sha512.as_slice(), Sha512::digest(&data).as_slice(), "chunk {chunk}");
    }
}

#[test]
fn digest_above_base64_sees_plain_bytes() {
    let data = b"The quick brown fox jumps over the lazy dog";
    let mut chain = BioChain::new(MemBio::new())
        .push_base64(64)
        .push_digest(DigestContext::new(DigestAlgorithm::Sha256).unwrap());
    assert_eq!(
        chain.stages(),
        vec![BioType::Digest, BioType::Base64, BioType::Mem]
    );
    for piece in data.chunks(5) {
        chain.write_all(piece).unwrap();
    }
    chain.flush().unwrap();

    let encoded = chain.find_mem().unwrap().contents().to_vec();
    assert_eq!(encoded, format!("{}\n", STANDARD.encode(data)).into_bytes());
    let digest = chain.find_digest(DigestAlgorithm::Sha256).unwrap().digest().unwrap();
    assert_eq!(digest.as_slice(), Sha256::digest(data).as_slice());
}

#[test]
fn digest_below_base64_sees_encoded_bytes() {
    let data = b"The quick brown fox jumps over the lazy dog";
    let mut chain = BioChain::new(MemBio::new())
        .push_digest(DigestContext::new(DigestAlgorithm::Sha256).unwrap())
        .push_base64(64);
    assert_eq!(
        chain.stages(),
        vec![BioType::Base64, BioType::Digest, BioType::Mem]
    );
    chain.write_all(data).unwrap();
    chain.flush().unwrap();

    let encoded = chain.find_mem().unwrap().contents().to_vec();
    assert_eq!(encoded, format!("{}\n", STANDARD.encode(data)).into_bytes());
    let digest = chain.find_digest(DigestAlgorithm::Sha256).unwrap().digest().unwrap();
    assert_eq!(digest.as_slice(), Sha256::digest(&encoded).as_slice());
}

#[test]
fn cipher_then_base64_round_trip() {
    let spec = keyed(CipherAlgorithm::Aes256Cbc);
    let data = payload(10_000);

    let mut encode = BioChain::new(MemBio::new())
        .push_base64(76)
        .push_cipher(CipherContext::new(&spec, CipherMode::Encrypt).unwrap())
        .push_digest(DigestContext::new(DigestAlgorithm::Sha1).unwrap());
    encode.copy_from(&mut data.as_slice(), 333).unwrap();
    encode.flush().unwrap();
    // A second flush must not emit another final block.
    let first = encode.find_mem().unwrap().contents().to_vec();
    encode.flush().unwrap();
    assert_eq!(encode.find_mem().unwrap().contents(), first.as_slice());
    let text = String::from_utf8(first.clone()).unwrap();
    assert!(text.lines().all(|l| l.len() <= 76));

    let mut decode = BioChain::new(MemBio::from_bytes(first))
        .push_base64(76)
        .push_cipher(CipherContext::new(&spec, CipherMode::Decrypt).unwrap())
        .push_digest(DigestContext::new(DigestAlgorithm::Sha1).unwrap());
    let plain = decode.read_to_end(100).unwrap();
    assert_eq!(plain, data);
    assert_eq!(
        decode.find_digest(DigestAlgorithm::Sha1).unwrap().digest().unwrap(),
        encode.find_digest(DigestAlgorithm::Sha1).unwrap().digest().unwrap()
    );
    // End of stream is sticky.
    assert_eq!(decode.read(&mut [0u8; 16]).unwrap(), 0);
}

#[test]
fn truncated_ciphertext_fails_to_finalize() {
    let spec = keyed(CipherAlgorithm::Aes128Cbc);

    let mut encode = BioChain::new(MemBio::new())
        .push_cipher(CipherContext::new(&spec, CipherMode::Encrypt).unwrap());
    encode.write_all(&payload(100)).unwrap();
    encode.flush().unwrap();
    let mut ciphertext = encode.find_mem().unwrap().contents().to_vec();
    assert_eq!(ciphertext.len(), 112);
    ciphertext.pop();

    let mut decode = BioChain::new(MemBio::from_bytes(ciphertext))
        .push_cipher(CipherContext::new(&spec, CipherMode::Decrypt).unwrap());
    assert!(matches!(
        decode.read_to_end(64),
        Err(Pkcs7Error::CryptographicError(_))
    ));
}

#[test]
fn host_reader_and_writer_endpoints() {
    let data = payload(2_000);
    let mut source = BioChain::new(ReaderBio::new(std::io::Cursor::new(data.clone())))
        .push_digest(DigestContext::new(DigestAlgorithm::Sha256).unwrap());
    assert_eq!(source.bio_type(), BioType::Digest);
    let mut sink = BioChain::new(WriterBio::new(Vec::new())).push_base64(0);

    let mut buf = [0u8; 123];
    loop {
        let n = source.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).unwrap();
    }
    sink.flush().unwrap();

    let written = sink.find::<WriterBio<Vec<u8>>>().unwrap().get_ref();
    assert_eq!(written, &format!("{}\n", STANDARD.encode(&data)).into_bytes());
    assert_eq!(
        source.find_digest(DigestAlgorithm::Sha256).unwrap().digest().unwrap().as_slice(),
        Sha256::digest(&data).as_slice()
    );

    assert!(matches!(
        sink.read(&mut buf),
        Err(Pkcs7Error::UnsupportedOperation { .. })
    ));
}

#[test]
fn io_errors_propagate_unchanged() {
    struct Broken;
    impl std::io::Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            ))
        }
    }

    let mut chain = BioChain::new(ReaderBio::new(Broken)).push_base64(64);
    match chain.read_to_end(64) {
        Err(Pkcs7Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn drain_to_writes_everything() {
    let data = payload(9_999);
    let mut chain = BioChain::new(MemBio::from_bytes(data.clone()))
        .push_digest(DigestContext::new(DigestAlgorithm::Md5).unwrap());
    let mut out = Vec::new();
    assert_eq!(chain.drain_to(&mut out, 1000).unwrap(), 9_999);
    assert_eq!(out, data);
}
