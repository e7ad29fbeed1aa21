//! Signing and authentication utilities for the CLOB API.
//!
//! Covers what the exchange client needs: deriving the wallet address,
//! signing messages, and building the L1 authentication headers. Order
//! struct signing internals live behind the exchange, not here.

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::error::ExchangeError;

/// Create a signer from a hex-encoded private key.
///
/// The private key can be with or without the "0x" prefix.
pub fn create_signer(private_key: &str) -> Result<PrivateKeySigner, ExchangeError> {
    let key = private_key.strip_prefix("0x").unwrap_or(private_key);
    let bytes = hex::decode(key)
        .map_err(|e| ExchangeError::Signing(format!("Invalid private key hex: {}", e)))?;

    if bytes.len() != 32 {
        return Err(ExchangeError::Signing(format!(
            "Private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&bytes);

    PrivateKeySigner::from_bytes(&key_bytes.into())
        .map_err(|e| ExchangeError::Signing(format!("Failed to create signer: {}", e)))
}

/// Get the wallet address from a private key.
pub fn address_from_private_key(private_key: &str) -> Result<String, ExchangeError> {
    let signer = create_signer(private_key)?;
    Ok(format!("{:?}", signer.address()))
}

/// Sign a message with the private key.
pub async fn sign_message(private_key: &str, message: &[u8]) -> Result<Vec<u8>, ExchangeError> {
    let signer = create_signer(private_key)?;
    let signature = signer
        .sign_message(message)
        .await
        .map_err(|e| ExchangeError::Signing(format!("Failed to sign message: {}", e)))?;
    Ok(signature.as_bytes().to_vec())
}

/// Generate CLOB authentication headers.
///
/// Signs a timestamp to prove key ownership.
pub async fn generate_auth_headers(
    private_key: &str,
) -> Result<Vec<(String, String)>, ExchangeError> {
    let signer = create_signer(private_key)?;
    let address = format!("{:?}", signer.address());

    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let message = format!("polymarket:{}", timestamp);

    let signature = signer
        .sign_message(message.as_bytes())
        .await
        .map_err(|e| ExchangeError::Signing(format!("Failed to sign auth message: {}", e)))?;

    Ok(vec![
        ("POLY_ADDRESS".to_string(), address),
        (
            "POLY_SIGNATURE".to_string(),
            format!("0x{}", hex::encode(signature.as_bytes())),
        ),
        ("POLY_TIMESTAMP".to_string(), timestamp),
        ("POLY_NONCE".to_string(), "0".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn create_signer_valid_key() {
        assert!(create_signer(TEST_KEY).is_ok());
    }

    #[test]
    fn create_signer_without_prefix() {
        let key = TEST_KEY.strip_prefix("0x").unwrap();
        assert!(create_signer(key).is_ok());
    }

    #[test]
    fn create_signer_invalid_hex() {
        assert!(create_signer("0xnot_valid_hex").is_err());
    }

    #[test]
    fn create_signer_wrong_length() {
        assert!(create_signer("0x1234").is_err());
    }

    #[test]
    fn address_from_key() {
        let address = address_from_private_key(TEST_KEY).unwrap();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 42);
    }

    #[tokio::test]
    async fn auth_headers_include_address_and_signature() {
        let headers = generate_auth_headers(TEST_KEY).await.unwrap();
        let keys: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["POLY_ADDRESS", "POLY_SIGNATURE", "POLY_TIMESTAMP", "POLY_NONCE"]
        );
        assert!(headers[1].1.starts_with("0x"));
    }
}
