//! EIP-712 signing domain for the Crab OTC settlement contract.
//!
//! Every bid signature is scoped to one deployment through its domain:
//! the protocol name and version, the chain id and the address of the
//! verifying (settlement) contract.

use alloy_primitives::{Address, B256, U256};
use serde::Serialize;

use super::schema::{FieldValue, StructSchema, TypedStruct};
use crate::config::ContractConfig;
use crate::{Error, Result};

/// Domain name used by the Crab OTC settlement contract.
pub const CRAB_OTC_DOMAIN_NAME: &str = "CrabOTC";

/// Domain version used by the Crab V2 settlement contract.
pub const CRAB_OTC_DOMAIN_VERSION: &str = "2";

/// Normalize an address string to its EIP-55 form.
///
/// Accepts `0x` followed by 40 hex digits. All-lowercase and all-uppercase
/// input is checksummed; mixed-case input must already carry a valid
/// checksum.
pub fn normalize_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| Error::invalid_address(input))?;

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_address(input));
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(trimmed, None).map_err(|_| Error::invalid_address(input))
    } else {
        digits
            .parse::<Address>()
            .map_err(|_| Error::invalid_address(input))
    }
}

/// Parse an address that must already be in EIP-55 form.
pub fn require_checksummed(input: &str) -> Result<Address> {
    let address = normalize_address(input)?;
    if address.to_checksum(None) != input {
        return Err(Error::invalid_address(input));
    }
    Ok(address)
}

/// EIP-712 domain for bid signing.
///
/// Fields are private so a domain can only be built through a validating
/// constructor; equality compares all four fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    name: String,
    version: String,
    chain_id: u64,
    #[serde(serialize_with = "crate::serde_helpers::checksummed::serialize")]
    verifying_contract: Address,
}

impl Domain {
    /// Build a domain, normalizing the verifying contract address.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: &str,
    ) -> Result<Self> {
        let verifying_contract = normalize_address(verifying_contract)?;
        Ok(Self::with_address(name, version, chain_id, verifying_contract))
    }

    /// Build a domain from an already-parsed contract address.
    pub fn with_address(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// Build a domain bound to the contract described by `contract`.
    pub fn from_contract(
        name: impl Into<String>,
        version: impl Into<String>,
        contract: &ContractConfig,
    ) -> Self {
        Self::with_address(name, version, contract.chain_id(), contract.address())
    }

    /// The Crab V2 OTC domain for the given settlement contract.
    pub fn crab_otc(contract: &ContractConfig) -> Self {
        Self::from_contract(CRAB_OTC_DOMAIN_NAME, CRAB_OTC_DOMAIN_VERSION, contract)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verifying_contract(&self) -> Address {
        self.verifying_contract
    }

    /// EIP-712 domain separator under the standard `EIP712Domain` schema.
    pub fn separator(&self) -> Result<B256> {
        StructSchema::eip712_domain().hash_struct(self)
    }

    /// Whether signatures under this domain are valid for `contract`.
    pub fn is_bound_to(&self, contract: &ContractConfig) -> bool {
        self.chain_id == contract.chain_id() && self.verifying_contract == contract.address()
    }
}

impl TypedStruct for Domain {
    fn field(&self, name: &str) -> Result<Option<FieldValue>> {
        Ok(match name {
            "name" => Some(FieldValue::String(self.name.clone())),
            "version" => Some(FieldValue::String(self.version.clone())),
            "chainId" => Some(FieldValue::Uint(U256::from(self.chain_id))),
            "verifyingContract" => Some(FieldValue::Address(self.verifying_contract)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Chain;

    const SETTLEMENT: &str = "0x3B960E47784150F5a63777201ee2B15253D713e8";

    #[test]
    fn test_normalize_lowercase_address() {
        let address = normalize_address(&SETTLEMENT.to_lowercase()).unwrap();
        assert_eq!(address.to_checksum(None), SETTLEMENT);
    }

    #[test]
    fn test_normalize_uppercase_address() {
        let upper = format!("0x{}", SETTLEMENT[2..].to_uppercase());
        let address = normalize_address(&upper).unwrap();
        assert_eq!(address.to_checksum(None), SETTLEMENT);
    }

    #[test]
    fn test_normalize_rejects_bad_checksum() {
        // Flip the case of one letter in a checksummed address
        let bad = SETTLEMENT.replacen('B', "b", 1);
        let err = normalize_address(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        for input in ["", "0x", "0x1234", "3B960E47784150F5a63777201ee2B15253D713e8", "0xZZ60E47784150F5a63777201ee2B15253D713e8"] {
            assert!(
                matches!(normalize_address(input), Err(Error::InvalidAddress { .. })),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_require_checksummed() {
        assert!(require_checksummed(SETTLEMENT).is_ok());
        assert!(matches!(
            require_checksummed(&SETTLEMENT.to_lowercase()),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_domain_stores_checksummed_contract() {
        let domain = Domain::new("CrabOTC", "2", 1, &SETTLEMENT.to_lowercase()).unwrap();
        assert_eq!(domain.verifying_contract().to_checksum(None), SETTLEMENT);
        assert_eq!(domain.name(), "CrabOTC");
        assert_eq!(domain.version(), "2");
        assert_eq!(domain.chain_id(), 1);
    }

    #[test]
    fn test_domain_rejects_malformed_contract() {
        let result = Domain::new("CrabOTC", "2", 1, "0xnot-an-address");
        assert!(matches!(result, Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_domain_equality_ignores_input_casing() {
        let a = Domain::new("CrabOTC", "2", 1, SETTLEMENT).unwrap();
        let b = Domain::new("CrabOTC", "2", 1, &SETTLEMENT.to_lowercase()).unwrap();
        let c = Domain::new("CrabOTC", "2", 3, SETTLEMENT).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_crab_otc_domain_is_bound_to_contract() {
        let contract = ContractConfig::new(SETTLEMENT, "http://localhost:8545", Chain::Ropsten).unwrap();
        let domain = Domain::crab_otc(&contract);
        assert_eq!(domain.name(), CRAB_OTC_DOMAIN_NAME);
        assert_eq!(domain.version(), CRAB_OTC_DOMAIN_VERSION);
        assert!(domain.is_bound_to(&contract));

        let mainnet = Domain::new("CrabOTC", "2", 1, SETTLEMENT).unwrap();
        assert!(!mainnet.is_bound_to(&contract));
    }

    #[test]
    fn test_separator_depends_on_every_field() {
        let base = Domain::new("CrabOTC", "2", 1, SETTLEMENT).unwrap();
        let renamed = Domain::new("CrabOTC2", "2", 1, SETTLEMENT).unwrap();
        assert_eq!(base.separator().unwrap(), base.clone().separator().unwrap());
        assert_ne!(base.separator().unwrap(), renamed.separator().unwrap());
    }

    #[test]
    fn test_domain_serializes_camel_case() {
        let domain = Domain::new("CrabOTC", "2", 3, SETTLEMENT).unwrap();
        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(json["chainId"], 3);
        assert_eq!(json["verifyingContract"], SETTLEMENT);
    }
}
