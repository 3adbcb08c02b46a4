use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub internal_api_secret: String,
    // None disables wallet creation; required once profiles start provisioning wallets
    pub wallet_encryption_key: Option<[u8; 32]>,
    // None disables chain mirroring entirely; ledger entries are created with no sync state
    pub chain: Option<ChainConfig>,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub token_mint: String,
    pub payer_keypair_path: String,
    pub explorer_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // treating empty DATABASE_URL as unset because container setups sometimes export ""
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

        let wallet_encryption_key = match env::var("WALLET_ENCRYPTION_KEY") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_encryption_key(raw.trim())?),
            _ => None,
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            database_url,
            internal_api_secret: env::var("INTERNAL_API_SECRET")?,
            wallet_encryption_key,
            chain: ChainConfig::from_env(),
        })
    }

    pub fn chain_enabled(&self) -> bool {
        self.chain.is_some()
    }
}

impl ChainConfig {
    // chain mirroring is opt-in: RPC URL, token mint and payer keypair must all
    // be configured, otherwise the ledger runs off-chain only
    fn from_env() -> Option<Self> {
        let rpc_url = non_empty(env::var("SOLANA_RPC_URL").ok())?;
        let token_mint = non_empty(env::var("TOKEN_MINT_ADDRESS").ok())?;
        let payer_keypair_path = non_empty(env::var("PAYER_KEYPAIR_PATH").ok())?;

        Some(ChainConfig {
            rpc_url,
            token_mint,
            payer_keypair_path,
            explorer_base_url: env::var("EXPLORER_BASE_URL")
                .unwrap_or_else(|_| "https://explorer.solana.com".to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_encryption_key(raw: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(raw)
        .map_err(|e| anyhow::anyhow!("WALLET_ENCRYPTION_KEY is not valid hex: {}", e))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("WALLET_ENCRYPTION_KEY must be 32 bytes (64 hex chars)"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_key_must_be_32_bytes() {
        assert!(parse_encryption_key("deadbeef").is_err());
        assert!(parse_encryption_key("zz").is_err());

        let key = parse_encryption_key(&"ab".repeat(32)).unwrap();
        assert_eq!(key, [0xab; 32]);
    }
}
