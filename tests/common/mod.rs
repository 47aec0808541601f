//! Shared fixtures for integration tests.
//!
//! Keys and self-signed certificates are generated with OpenSSL on demand;
//! nothing is read from disk.

#![allow(dead_code)]

use der::Encode;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder};

use pkcs7_engine::{Certificate, Crl, PrivateKey};

/// Certificate plus the private key it certifies.
pub struct Identity {
    pub cert: Certificate,
    pub key: PrivateKey,
}

fn self_signed(pkey: &PKey<Private>, common_name: &str, serial: u32) -> Certificate {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.append_entry_by_text("O", "pkcs7-engine tests").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.set_pubkey(pkey).unwrap();
    builder.sign(pkey, MessageDigest::sha256()).unwrap();

    Certificate::from_x509(&builder.build()).unwrap()
}

pub fn rsa_identity(common_name: &str, serial: u32) -> Identity {
    let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    Identity {
        cert: self_signed(&pkey, common_name, serial),
        key: PrivateKey::from_pkey(pkey),
    }
}

pub fn ec_identity(common_name: &str, serial: u32) -> Identity {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let pkey = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
    Identity {
        cert: self_signed(&pkey, common_name, serial),
        key: PrivateKey::from_pkey(pkey),
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | bytes.len() as u8);
        out.extend(bytes);
    }
    out.extend_from_slice(content);
    out
}

/// Empty v2 CRL issued by `issuer`. The signature is a placeholder; the
/// engine only carries CRLs, it does not check them.
pub fn empty_crl(issuer: &Certificate) -> Crl {
    Crl::from_der(&crl_der(issuer, true)).unwrap()
}

/// Same list in v1 form, with the version field omitted.
pub fn empty_v1_crl(issuer: &Certificate) -> Crl {
    Crl::from_der(&crl_der(issuer, false)).unwrap()
}

fn crl_der(issuer: &Certificate, with_version: bool) -> Vec<u8> {
    // sha256WithRSAEncryption, NULL params
    let alg = [
        0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b, 0x05, 0x00,
    ];
    let issuer_name = issuer.issuer().to_der().unwrap();
    let this_update = tlv(0x17, b"240101000000Z");

    let mut tbs = Vec::new();
    if with_version {
        tbs.extend_from_slice(&tlv(0x02, &[0x01]));
    }
    tbs.extend_from_slice(&alg);
    tbs.extend_from_slice(&issuer_name);
    tbs.extend_from_slice(&this_update);
    let tbs = tlv(0x30, &tbs);

    let mut list = tbs;
    list.extend_from_slice(&alg);
    list.extend_from_slice(&tlv(0x03, &[0x00, 0x00]));
    tlv(0x30, &list)
}

/// Deterministic pseudo-random payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
