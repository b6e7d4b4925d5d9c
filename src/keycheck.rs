//! PEM checks for RSA key material returned by the master

use crate::error::{Result, SaltError};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

fn parse_block(pem_data: &str, label: &str) -> Result<pem::Pem> {
    let block = pem::parse(pem_data.as_bytes()).map_err(|e| {
        SaltError::InvalidKey(format!(
            "failed to parse PEM block containing the {}: {}",
            label.to_lowercase(),
            e
        ))
    })?;

    if !block.tag().contains(label) {
        return Err(SaltError::InvalidKey(format!(
            "failed to parse PEM block containing the {}: unexpected label {}",
            label.to_lowercase(),
            block.tag()
        )));
    }

    Ok(block)
}

/// Accept only a PKCS#1 RSA private key
pub fn validate_rsa_private_key(private_key_pem: &str) -> Result<()> {
    let block = parse_block(private_key_pem, "PRIVATE KEY")?;
    RsaPrivateKey::from_pkcs1_der(block.contents())
        .map_err(|e| SaltError::InvalidKey(format!("invalid RSA private key: {}", e)))?;
    Ok(())
}

/// Accept only an RSA SubjectPublicKeyInfo public key
pub fn validate_rsa_public_key(public_key_pem: &str) -> Result<()> {
    let block = parse_block(public_key_pem, "PUBLIC KEY")?;
    RsaPublicKey::from_public_key_der(block.contents())
        .map_err(|e| SaltError::InvalidKey(format!("invalid RSA public key: {}", e)))?;
    Ok(())
}
