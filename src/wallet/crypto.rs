use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::Rng;
use solana_sdk::signature::{Keypair, Signer};

use crate::db::models::WalletRecord;
use crate::error::{Result, TokenError};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug)]
pub struct GeneratedWallet {
    pub address: String,
    pub encrypted_key: String,
    pub encryption_nonce: String,
    pub encryption_tag: String,
}

/// Custody of wallet private keys: AES-256-GCM over the 64-byte keypair with
/// a process-wide key from configuration. Decryption exists solely for the
/// chain client's burn signing; nothing here is ever serialized to a client.
#[derive(Clone)]
pub struct KeyVault {
    key: [u8; 32],
}

impl KeyVault {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn generate_wallet(&self) -> Result<GeneratedWallet> {
        let keypair = Keypair::new();
        let address = keypair.pubkey().to_string();

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);

        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), keypair.to_bytes().as_ref())
            .map_err(|_| TokenError::Internal("wallet key encryption failed".to_string()))?;

        // aes-gcm appends the 16-byte tag; stored separately alongside the nonce
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(GeneratedWallet {
            address,
            encrypted_key: hex::encode(sealed),
            encryption_nonce: hex::encode(nonce),
            encryption_tag: hex::encode(tag),
        })
    }

    pub fn decrypt_keypair(&self, wallet: &WalletRecord) -> Result<Keypair> {
        let mut sealed = decode_hex(&wallet.encrypted_key, "encrypted_key")?;
        let nonce = decode_hex(&wallet.encryption_nonce, "encryption_nonce")?;
        let tag = decode_hex(&wallet.encryption_tag, "encryption_tag")?;

        if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(TokenError::Internal(format!(
                "wallet {} has malformed custody material",
                wallet.address
            )));
        }
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .map_err(|_| {
                TokenError::Internal(format!(
                    "wallet {} key decryption failed (wrong custody key or corrupted row)",
                    wallet.address
                ))
            })?;

        Keypair::from_bytes(&plaintext).map_err(|e| {
            TokenError::Internal(format!("wallet {} keypair invalid: {}", wallet.address, e))
        })
    }
}

fn decode_hex(value: &str, field: &str) -> Result<Vec<u8>> {
    hex::decode(value)
        .map_err(|e| TokenError::Internal(format!("wallet {} is not valid hex: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(w: &GeneratedWallet) -> WalletRecord {
        WalletRecord {
            id: 1,
            account_id: "child-1".to_string(),
            address: w.address.clone(),
            encrypted_key: w.encrypted_key.clone(),
            encryption_nonce: w.encryption_nonce.clone(),
            encryption_tag: w.encryption_tag.clone(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn decrypt_round_trips_to_same_address() {
        let vault = KeyVault::new([7u8; 32]);
        let generated = vault.generate_wallet().unwrap();

        let keypair = vault.decrypt_keypair(&record(&generated)).unwrap();
        assert_eq!(keypair.pubkey().to_string(), generated.address);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = KeyVault::new([7u8; 32]);
        let generated = vault.generate_wallet().unwrap();

        let mut tampered = record(&generated);
        // flip one nibble of the tag
        let mut tag = tampered.encryption_tag.clone().into_bytes();
        tag[0] = if tag[0] == b'0' { b'1' } else { b'0' };
        tampered.encryption_tag = String::from_utf8(tag).unwrap();

        assert!(vault.decrypt_keypair(&tampered).is_err());
    }

    #[test]
    fn wrong_custody_key_is_rejected() {
        let vault = KeyVault::new([7u8; 32]);
        let generated = vault.generate_wallet().unwrap();

        let other = KeyVault::new([8u8; 32]);
        assert!(other.decrypt_keypair(&record(&generated)).is_err());
    }
}
