//! Wallet session boundary
//!
//! The wallet-connect protocol itself lives outside this crate. Front ends
//! hand us a connected address (or nothing) and we derive the thread id and
//! request payload from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

/// An EVM-style account address: `0x` followed by 40 hex digits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| WalletError::InvalidAddress(raw.to_string()))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidAddress(raw.to_string()));
        }

        Ok(Self(format!("0x{}", hex)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…abcd` for headers and status lines
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl PartialEq for WalletAddress {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for WalletAddress {}

impl FromStr for WalletAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlates every message from one user into a single agent thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&WalletAddress> for ThreadId {
    fn from(address: &WalletAddress) -> Self {
        Self(address.as_str().to_string())
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context the agent receives alongside the free-text input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletPayload {
    pub address: String,
    pub message: String,
}

impl WalletPayload {
    pub fn for_address(address: &WalletAddress) -> Self {
        Self {
            address: address.to_string(),
            message: format!("This is the wallet address of the connected user {}", address),
        }
    }

    pub fn to_json(&self) -> String {
        // Two string fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Connection state reported by the wallet integration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    address: Option<WalletAddress>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(address: WalletAddress) -> Self {
        Self {
            address: Some(address),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn address(&self) -> Option<&WalletAddress> {
        self.address.as_ref()
    }

    pub fn connect(&mut self, address: WalletAddress) {
        self.address = Some(address);
    }

    pub fn disconnect(&mut self) {
        self.address = None;
    }

    pub fn thread_id(&self) -> Result<ThreadId, WalletError> {
        self.address
            .as_ref()
            .map(ThreadId::from)
            .ok_or(WalletError::NotConnected)
    }

    pub fn payload(&self) -> Result<WalletPayload, WalletError> {
        self.address
            .as_ref()
            .map(WalletPayload::for_address)
            .ok_or(WalletError::NotConnected)
    }
}

/// Network the wallet modal offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

pub const SEI_TESTNET: Network = Network {
    name: "Sei Testnet",
    chain_id: 1328,
    rpc_url: "https://evm-rpc-testnet.sei-apis.com",
    explorer_url: "https://seitrace.com/?chain=atlantic-2",
};

/// App metadata and network passed to the external wallet-connect provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub project_id: Option<String>,
    pub name: &'static str,
    pub description: &'static str,
    pub url: &'static str,
    pub icon: &'static str,
    pub network: Network,
}

impl WalletConfig {
    pub fn new(project_id: Option<String>) -> Self {
        Self {
            project_id,
            name: "SeiMoney",
            description: "SeiMoney",
            url: "https://seimoney.link",
            icon: "https://avatars.githubusercontent.com/u/179229932",
            network: SEI_TESTNET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";

    #[test]
    fn test_parse_valid_address() {
        let address = WalletAddress::parse(ADDR).unwrap();
        assert_eq!(address.as_str(), ADDR);
        assert_eq!(address.short(), "0xAbCd…EF01");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let address = WalletAddress::parse(&format!("  {}\n", ADDR)).unwrap();
        assert_eq!(address.as_str(), ADDR);
    }

    #[test]
    fn test_parse_rejects_bad_addresses() {
        for bad in ["", "0x", "abcdef", "0x123", &ADDR[2..], "0xZZCdEf0123456789abcdef0123456789ABCDEF01"] {
            assert!(
                matches!(WalletAddress::parse(bad), Err(WalletError::InvalidAddress(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_address_equality_ignores_case() {
        let upper = WalletAddress::parse(ADDR).unwrap();
        let lower = WalletAddress::parse(&ADDR.to_lowercase()).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_session_thread_and_payload() {
        let mut session = WalletSession::disconnected();
        assert!(!session.is_connected());
        assert_eq!(session.thread_id(), Err(WalletError::NotConnected));

        session.connect(WalletAddress::parse(ADDR).unwrap());
        assert!(session.is_connected());
        assert_eq!(session.thread_id().unwrap().as_str(), ADDR);

        let payload = session.payload().unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload.to_json()).unwrap();
        assert_eq!(json["address"], ADDR);
        assert_eq!(
            json["message"],
            format!("This is the wallet address of the connected user {}", ADDR)
        );

        session.disconnect();
        assert!(session.payload().is_err());
    }

    #[test]
    fn test_wallet_config_targets_sei_testnet() {
        let config = WalletConfig::new(Some("project".to_string()));
        assert_eq!(config.network.chain_id, 1328);
        assert_eq!(config.name, "SeiMoney");
    }
}
