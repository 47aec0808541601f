//! DER bridge: encoding, parsing and structural errors.

mod common;

use common::{empty_crl, empty_v1_crl, payload, rsa_identity};
use pkcs7_engine::domain::constants::{OID_PKCS7_DATA, OID_PKCS7_SIGNED, OID_SHA1, OID_SHA256};
use pkcs7_engine::services::codec::decode_signed_and_enveloped;
use pkcs7_engine::{
    CipherAlgorithm, CipherSpec, ContentState, ContentType, DigestAlgorithm, Pkcs7, Pkcs7Error,
};

fn signed_with_extras() -> (Pkcs7, common::Identity) {
    let signer = rsa_identity("Signer", 1);
    let other = rsa_identity("Intermediate", 2);
    let mut p7 = Pkcs7::new_signed();
    p7.add_signature(&signer.cert, signer.key.clone(), DigestAlgorithm::Sha256)
        .unwrap();
    p7.add_signature(&signer.cert, signer.key.clone(), DigestAlgorithm::Sha1)
        .unwrap();
    // Insertion order is kept on the wire, even though `other` would sort first.
    p7.add_certificate(signer.cert.clone()).unwrap();
    p7.add_certificate(other.cert.clone()).unwrap();
    p7.add_crl(empty_crl(&other.cert)).unwrap();
    p7.finalize(&payload(300)).unwrap();
    (p7, signer)
}

#[test]
fn signed_data_is_byte_stable() {
    let (p7, signer) = signed_with_extras();
    let der = p7.to_der().unwrap();

    let parsed = Pkcs7::from_der(&der).unwrap();
    assert_eq!(parsed.state(), ContentState::Populated);
    assert_eq!(parsed.content_type(), ContentType::Signed);
    assert_eq!(parsed.to_der().unwrap(), der);

    assert_eq!(parsed.certificates().unwrap(), p7.certificates().unwrap());
    assert_eq!(parsed.certificates().unwrap()[0], signer.cert);
    assert_eq!(parsed.crls().unwrap().len(), 1);
    assert_eq!(parsed.embedded_content(), Some(payload(300).as_slice()));

    assert_eq!(parsed.as_signed().unwrap().contents().content_type(), OID_PKCS7_DATA);
    let infos = parsed.signer_infos().unwrap();
    assert_eq!(infos[0].digest_algorithm().oid, OID_SHA256);
    assert_eq!(infos[1].digest_algorithm().oid, OID_SHA1);
    assert_eq!(infos[0].serial_number(), signer.cert.serial_number());
    assert!(infos.iter().all(|si| si.signature().is_some()));
}

#[test]
fn v1_and_v2_crls_survive_a_round_trip() {
    let signer = rsa_identity("Signer", 1);
    let issuer = rsa_identity("Revoker", 7);
    let v1 = empty_v1_crl(&issuer.cert);
    let v2 = empty_crl(&issuer.cert);
    assert_eq!(v1.version(), 1);
    assert_eq!(v2.version(), 2);
    assert_eq!(v1.issuer(), issuer.cert.issuer());
    assert_eq!(v1.revoked_count(), 0);
    assert!(v1.next_update().is_none());

    let mut p7 = Pkcs7::new_signed();
    p7.add_signature(&signer.cert, signer.key.clone(), DigestAlgorithm::Sha256)
        .unwrap();
    p7.add_crl(v1.clone()).unwrap();
    p7.add_crl(v2.clone()).unwrap();
    p7.finalize(b"revocation data").unwrap();

    let der = p7.to_der().unwrap();
    let parsed = Pkcs7::from_der(&der).unwrap();
    assert_eq!(parsed.crls().unwrap(), &[v1, v2][..]);
    assert_eq!(parsed.to_der().unwrap(), der);
}

#[test]
fn structured_form_matches_der() {
    let (p7, _) = signed_with_extras();
    let asn1 = p7.as_asn1().unwrap();
    assert_eq!(asn1.content_type, OID_PKCS7_SIGNED);
    assert!(asn1.content.is_some());
    let rebuilt = Pkcs7::from_asn1(asn1).unwrap();
    assert_eq!(rebuilt.to_der().unwrap(), p7.to_der().unwrap());
}

#[test]
fn from_der_as_checks_the_type() {
    let (p7, _) = signed_with_extras();
    let der = p7.to_der().unwrap();

    assert!(Pkcs7::from_der_as(&der, ContentType::Signed).is_ok());
    match Pkcs7::from_der_as(&der, ContentType::Enveloped) {
        Err(Pkcs7Error::TypeMismatch { expected, found }) => {
            assert_eq!(expected, "pkcs7-envelopedData");
            assert_eq!(found, "pkcs7-signedData");
        }
        other => panic!("expected type mismatch, got {other:?}"),
    }
}

#[test]
fn garbage_and_truncation_are_malformed() {
    let (p7, _) = signed_with_extras();
    let der = p7.to_der().unwrap();

    let cases: [&[u8]; 4] = [&der[..der.len() / 2], &[0x30, 0x03, 0x02], &[], b"not der"];
    for bytes in cases {
        assert!(
            matches!(Pkcs7::from_der(bytes), Err(Pkcs7Error::MalformedMessage(_))),
            "{bytes:02x?}"
        );
    }
}

#[test]
fn content_info_without_content_is_malformed() {
    // SEQUENCE { OID signedData }
    let mut der = vec![0x30, 0x0b, 0x06, 0x09];
    der.extend_from_slice(&[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02]);
    assert!(matches!(
        Pkcs7::from_der(&der),
        Err(Pkcs7Error::MalformedMessage(_))
    ));
}

#[test]
fn data_content_type_is_unsupported_at_top_level() {
    // SEQUENCE { OID data, [0] { OCTET STRING "hi" } }
    let der = [
        0x30, 0x11, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01, 0xa0, 0x04,
        0x04, 0x02, b'h', b'i',
    ];
    assert!(matches!(
        Pkcs7::from_der(&der),
        Err(Pkcs7Error::UnsupportedOperation { .. })
    ));
}

#[test]
fn signed_and_enveloped_decodes_structurally_only() {
    let signer = rsa_identity("Signer", 5);
    let recipient = rsa_identity("Recipient", 6);
    let mut p7 = Pkcs7::new_signed_and_enveloped();
    p7.add_signature(&signer.cert, signer.key.clone(), DigestAlgorithm::Sha256)
        .unwrap();
    p7.add_recipient(&recipient.cert).unwrap();
    p7.set_cipher(CipherSpec::new(CipherAlgorithm::Aes128Cbc))
        .unwrap();
    p7.finalize(b"both").unwrap();

    let der = p7.to_der().unwrap();
    assert!(matches!(
        Pkcs7::from_der(&der),
        Err(Pkcs7Error::UnsupportedOperation { .. })
    ));
    let structure = decode_signed_and_enveloped(&der).unwrap();
    assert_eq!(structure.version, 1);
    assert_eq!(structure.recipient_infos.as_slice().len(), 1);
    assert_eq!(structure.signer_infos.as_slice().len(), 1);
    assert!(structure.certificates.is_none());
}

#[test]
fn digested_detached_round_trip() {
    let mut p7 = Pkcs7::new_digested(DigestAlgorithm::Sha512);
    p7.set_detached(true).unwrap();
    p7.finalize(b"external").unwrap();
    assert!(p7.embedded_content().is_none());

    let parsed = Pkcs7::from_der(&p7.to_der().unwrap()).unwrap();
    assert!(parsed.is_detached());
    let digest = parsed.as_digested().unwrap().digest().unwrap().to_vec();
    assert_eq!(digest.len(), 64);

    let mut chain = parsed.data_decode(None, Some(b"external")).unwrap();
    assert_eq!(chain.read_to_end(16).unwrap(), b"external");
    let recomputed = chain.find_digest(DigestAlgorithm::Sha512).unwrap().digest().unwrap();
    assert_eq!(recomputed.as_slice(), digest.as_slice());
}

#[test]
fn pem_round_trip() {
    let (p7, _) = signed_with_extras();
    let pem = p7.to_pem().unwrap();
    assert!(pem.lines().skip(1).all(|line| line.len() <= 64));
    let parsed = Pkcs7::from_pem(&pem).unwrap();
    assert_eq!(parsed.to_der().unwrap(), p7.to_der().unwrap());
}
