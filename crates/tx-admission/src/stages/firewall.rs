//! Static message-type firewall.

use super::walk_msgs;
use crate::domain::{AdmissionError, AnteStage, ExecutionContext};
use shared_types::{Msg, Transaction};
use std::collections::HashSet;

/// Rejects disallowed message types at any nesting depth. Outside the
/// Ethereum pipeline it also rejects Ethereum messages, which only that
/// pipeline may process.
pub struct MessageFirewall {
    disallowed: HashSet<String>,
    reject_ethereum: bool,
}

impl MessageFirewall {
    pub fn new(disallowed: impl IntoIterator<Item = String>, reject_ethereum: bool) -> Self {
        Self {
            disallowed: disallowed.into_iter().collect(),
            reject_ethereum,
        }
    }
}

impl AnteStage for MessageFirewall {
    fn name(&self) -> &'static str {
        "MessageFirewall"
    }

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        walk_msgs(tx.msgs(), &mut |msg| {
            if self.reject_ethereum && matches!(msg, Msg::EthereumTx(_)) {
                return Err(AdmissionError::disallowed(
                    msg.type_url(),
                    "ethereum messages require the ethereum extension option",
                ));
            }
            if self.disallowed.contains(msg.type_url()) {
                return Err(AdmissionError::disallowed(msg.type_url(), "blocked by message firewall"));
            }
            Ok(())
        })?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::config::default_disallowed_msg_types;
    use crate::domain::AdmissionMode;
    use crate::stages::testing::{ctx, send, tx_with};
    use shared_types::{type_urls, Coin};

    fn vesting() -> Msg {
        Msg::CreateVestingAccount {
            from: [1; 20],
            to: [2; 20],
            amount: vec![Coin::new("aante", 1u64)],
            end_time: 100,
        }
    }

    fn firewall() -> MessageFirewall {
        MessageFirewall::new(default_disallowed_msg_types(), true)
    }

    #[test]
    fn test_top_level_disallowed_rejected() {
        let store = MemoryStateStore::new();
        let err = firewall()
            .run(ctx(&store, 1, AdmissionMode::Check), &tx_with(vec![send(1), vesting()]))
            .unwrap_err();
        match err {
            AdmissionError::DisallowedMessageType { type_url, .. } => {
                assert_eq!(type_url, type_urls::MSG_CREATE_VESTING_ACCOUNT)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_disallowed_rejected() {
        let store = MemoryStateStore::new();
        let exec = Msg::AuthzExec {
            grantee: [3; 20],
            msgs: vec![vesting()],
        };
        let err = firewall()
            .run(ctx(&store, 1, AdmissionMode::Deliver), &tx_with(vec![exec]))
            .unwrap_err();
        assert!(matches!(err, AdmissionError::DisallowedMessageType { .. }));
    }

    #[test]
    fn test_ordinary_messages_pass() {
        let store = MemoryStateStore::new();
        assert!(firewall()
            .run(ctx(&store, 1, AdmissionMode::Check), &tx_with(vec![send(1)]))
            .is_ok());
    }
}
