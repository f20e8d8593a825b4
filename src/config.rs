use std::{env, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use solana_sdk::pubkey::Pubkey;

use crate::layout::LayoutVariant;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Settings {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub pool: Pubkey,
    pub billboard: Pubkey,
    pub fee: Pubkey,
    pub variant: LayoutVariant,
    pub poll_interval: Duration,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));
        let pubkey = |key: &str| -> anyhow::Result<Pubkey> {
            let value = required(key)?;
            Pubkey::from_str(value.trim()).with_context(|| format!("{key} is not a valid address"))
        };

        let variant = match lookup("LAYOUT_VARIANT") {
            Some(v) => v.parse::<LayoutVariant>().context("LAYOUT_VARIANT")?,
            None => LayoutVariant::CANONICAL,
        };
        let poll_secs = match lookup("POLL_INTERVAL_SECS") {
            Some(v) => v.trim().parse::<u64>().context("POLL_INTERVAL_SECS")?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            rpc_url: normalize_rpc_url(&required("RPC_URL")?),
            program_id: pubkey("PROGRAM_ID")?,
            pool: pubkey("POOL_ADDRESS")?,
            billboard: pubkey("BILLBOARD_ADDRESS")?,
            fee: pubkey("FEE_ADDRESS")?,
            variant,
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

/// Bare hosts are treated as https endpoints.
pub fn normalize_rpc_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(extra: &[(&str, &str)]) -> HashMap<String, String> {
        let key = Pubkey::new_unique().to_string();
        let mut map: HashMap<String, String> = [
            ("RPC_URL", "api.devnet.solana.com"),
            ("PROGRAM_ID", key.as_str()),
            ("POOL_ADDRESS", key.as_str()),
            ("BILLBOARD_ADDRESS", key.as_str()),
            ("FEE_ADDRESS", key.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in extra {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    #[test]
    fn defaults_apply() {
        let map = vars(&[]);
        let settings = Settings::from_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(settings.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(settings.variant, LayoutVariant::Current);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn overrides_are_parsed() {
        let map = vars(&[
            ("RPC_URL", "http://127.0.0.1:8899"),
            ("LAYOUT_VARIANT", "genesis"),
            ("POLL_INTERVAL_SECS", "30"),
        ]);
        let settings = Settings::from_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(settings.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(settings.variant, LayoutVariant::Genesis);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn bad_values_are_reported() {
        let map = vars(&[("LAYOUT_VARIANT", "v9")]);
        assert!(Settings::from_lookup(|k| map.get(k).cloned()).is_err());

        let mut map = vars(&[]);
        map.remove("POOL_ADDRESS");
        let err = Settings::from_lookup(|k| map.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("POOL_ADDRESS"));

        let map = vars(&[("FEE_ADDRESS", "nope")]);
        assert!(Settings::from_lookup(|k| map.get(k).cloned()).is_err());
    }
}
