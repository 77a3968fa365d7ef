//! # Classifier
//!
//! Selects the pipeline variant from the *first* extension option only.
//! Classification never touches the context or state.
//!
//! | first extension option | variant |
//! |------------------------|---------|
//! | (none) | `Default` (static minimum fee) |
//! | `…vm.v1.ExtensionOptionsEthereumTx` | `Ethereum` |
//! | `…types.v1.ExtensionOptionDynamicFeeTx` | `DynamicFee` |
//! | `…types.v1.ExtensionOptionsWeb3Tx` | `LegacyEip712` when enabled, else rejected |
//! | anything else | rejected with `UnsupportedExtension` |

use super::errors::AdmissionError;
use shared_types::{Transaction, EXT_DYNAMIC_FEE, EXT_ETHEREUM_TX, EXT_WEB3_TX};

/// Pipeline variant a transaction is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnteVariant {
    /// Cosmos-style pipeline against the validator's static minimum gas price.
    Default,
    /// Cosmos-style pipeline priced by the fee market.
    DynamicFee,
    /// Ethereum-style mono-stage.
    Ethereum,
    /// Deprecated EIP-712 signature pipeline.
    LegacyEip712,
}

impl AnteVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnteVariant::Default => "default",
            AnteVariant::DynamicFee => "dynamic_fee",
            AnteVariant::Ethereum => "ethereum",
            AnteVariant::LegacyEip712 => "legacy_eip712",
        }
    }
}

/// Routes transactions by their first extension option.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    legacy_eip712_enabled: bool,
}

impl Classifier {
    pub fn new(legacy_eip712_enabled: bool) -> Self {
        Self {
            legacy_eip712_enabled,
        }
    }

    pub fn classify(&self, tx: &Transaction) -> Result<AnteVariant, AdmissionError> {
        let Some(first) = tx.extension_options().first() else {
            return Ok(AnteVariant::Default);
        };

        match first.type_url.as_str() {
            EXT_ETHEREUM_TX => Ok(AnteVariant::Ethereum),
            EXT_DYNAMIC_FEE => Ok(AnteVariant::DynamicFee),
            EXT_WEB3_TX if self.legacy_eip712_enabled => Ok(AnteVariant::LegacyEip712),
            other => Err(AdmissionError::UnsupportedExtension(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ExtensionOption;

    fn tx_with(type_urls: &[&str]) -> Transaction {
        let mut tx = Transaction::default();
        tx.body.extension_options = type_urls
            .iter()
            .map(|url| ExtensionOption::new(*url, vec![]))
            .collect();
        tx
    }

    #[test]
    fn test_no_options_routes_default() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify(&tx_with(&[])), Ok(AnteVariant::Default));
    }

    #[test]
    fn test_routing_table() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify(&tx_with(&[EXT_ETHEREUM_TX])),
            Ok(AnteVariant::Ethereum)
        );
        assert_eq!(
            classifier.classify(&tx_with(&[EXT_DYNAMIC_FEE])),
            Ok(AnteVariant::DynamicFee)
        );
    }

    #[test]
    fn test_legacy_rejected_unless_enabled() {
        assert_eq!(
            Classifier::new(false).classify(&tx_with(&[EXT_WEB3_TX])),
            Err(AdmissionError::UnsupportedExtension(EXT_WEB3_TX.to_string()))
        );
        assert_eq!(
            Classifier::new(true).classify(&tx_with(&[EXT_WEB3_TX])),
            Ok(AnteVariant::LegacyEip712)
        );
    }

    #[test]
    fn test_unknown_first_option_rejected() {
        assert_eq!(
            Classifier::default().classify(&tx_with(&["/foo.Bar", EXT_DYNAMIC_FEE])),
            Err(AdmissionError::UnsupportedExtension("/foo.Bar".to_string()))
        );
    }

    #[test]
    fn test_only_first_option_consulted() {
        assert_eq!(
            Classifier::default().classify(&tx_with(&[EXT_ETHEREUM_TX, "/foo.Bar"])),
            Ok(AnteVariant::Ethereum)
        );
    }
}
