//! # Messages
//!
//! The closed set of messages a transaction may carry. Every variant has a
//! fixed type identifier, a signer list and a stateless `validate_basic`.

use crate::coins::{validate_coins, Coin};
use crate::entities::{Address, ZERO_ADDRESS};
use crate::errors::ValidationError;
use crate::ethereum::MsgEthereumTx;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Maximum depth of messages nested inside authorization executions.
pub const MAX_MSG_NESTING: usize = 7;

/// Literal type identifiers of every message variant.
pub mod type_urls {
    pub const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
    pub const MSG_MULTI_SEND: &str = "/cosmos.bank.v1beta1.MsgMultiSend";
    pub const MSG_DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";
    pub const MSG_VOTE: &str = "/cosmos.gov.v1.MsgVote";
    pub const MSG_STORE_CODE: &str = "/cosmwasm.wasm.v1.MsgStoreCode";
    pub const MSG_INSTANTIATE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgInstantiateContract";
    pub const MSG_EXECUTE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
    pub const MSG_MIGRATE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgMigrateContract";
    pub const MSG_CREATE_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.MsgCreateVestingAccount";
    pub const MSG_CREATE_PERIODIC_VESTING_ACCOUNT: &str =
        "/cosmos.vesting.v1beta1.MsgCreatePeriodicVestingAccount";
    pub const MSG_CREATE_PERMANENT_LOCKED_ACCOUNT: &str =
        "/cosmos.vesting.v1beta1.MsgCreatePermanentLockedAccount";
    pub const MSG_EXEC: &str = "/cosmos.authz.v1beta1.MsgExec";
    pub const MSG_RECV_PACKET: &str = "/ibc.core.channel.v1.MsgRecvPacket";
    pub const MSG_ACKNOWLEDGEMENT: &str = "/ibc.core.channel.v1.MsgAcknowledgement";
    pub const MSG_TIMEOUT: &str = "/ibc.core.channel.v1.MsgTimeout";
    pub const MSG_UPDATE_CLIENT: &str = "/ibc.core.client.v1.MsgUpdateClient";
    pub const MSG_ETHEREUM_TX: &str = "/cosmos.evm.vm.v1.MsgEthereumTx";
}

/// Governance vote choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    Yes,
    Abstain,
    No,
    NoWithVeto,
}

/// One side of a multi-send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub address: Address,
    pub coins: Vec<Coin>,
}

/// One unlock period of a periodic vesting schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingPeriod {
    pub length_seconds: u64,
    pub amount: Vec<Coin>,
}

/// A cross-chain packet as carried by relay messages.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub destination_port: String,
    pub destination_channel: String,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

impl Packet {
    fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.sequence == 0 {
            return Err(invalid("packet.sequence", "must be positive"));
        }
        for (field, id) in [
            ("packet.source_port", &self.source_port),
            ("packet.source_channel", &self.source_channel),
            ("packet.destination_port", &self.destination_port),
            ("packet.destination_channel", &self.destination_channel),
        ] {
            if id.is_empty() {
                return Err(invalid(field, "identifier is empty"));
            }
        }
        Ok(())
    }
}

/// Every message a transaction can carry.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    Send {
        from: Address,
        to: Address,
        amount: Vec<Coin>,
    },
    MultiSend {
        inputs: Vec<Transfer>,
        outputs: Vec<Transfer>,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    Vote {
        proposal_id: u64,
        voter: Address,
        option: VoteOption,
    },
    StoreCode {
        sender: Address,
        #[serde_as(as = "Bytes")]
        wasm_byte_code: Vec<u8>,
    },
    InstantiateContract {
        sender: Address,
        code_id: u64,
        label: String,
        #[serde_as(as = "Bytes")]
        msg: Vec<u8>,
        funds: Vec<Coin>,
    },
    ExecuteContract {
        sender: Address,
        contract: Address,
        #[serde_as(as = "Bytes")]
        msg: Vec<u8>,
        funds: Vec<Coin>,
    },
    MigrateContract {
        sender: Address,
        contract: Address,
        code_id: u64,
        #[serde_as(as = "Bytes")]
        msg: Vec<u8>,
    },
    CreateVestingAccount {
        from: Address,
        to: Address,
        amount: Vec<Coin>,
        end_time: i64,
    },
    CreatePeriodicVestingAccount {
        from: Address,
        to: Address,
        start_time: i64,
        periods: Vec<VestingPeriod>,
    },
    CreatePermanentLockedAccount {
        from: Address,
        to: Address,
        amount: Vec<Coin>,
    },
    /// Executes `msgs` on behalf of their signers under an authorization grant.
    AuthzExec {
        grantee: Address,
        msgs: Vec<Msg>,
    },
    RecvPacket {
        packet: Packet,
        signer: Address,
    },
    Acknowledgement {
        packet: Packet,
        signer: Address,
    },
    Timeout {
        packet: Packet,
        signer: Address,
    },
    UpdateClient {
        client_id: String,
        signer: Address,
    },
    EthereumTx(MsgEthereumTx),
}

impl Msg {
    pub fn type_url(&self) -> &'static str {
        use type_urls::*;
        match self {
            Msg::Send { .. } => MSG_SEND,
            Msg::MultiSend { .. } => MSG_MULTI_SEND,
            Msg::Delegate { .. } => MSG_DELEGATE,
            Msg::Vote { .. } => MSG_VOTE,
            Msg::StoreCode { .. } => MSG_STORE_CODE,
            Msg::InstantiateContract { .. } => MSG_INSTANTIATE_CONTRACT,
            Msg::ExecuteContract { .. } => MSG_EXECUTE_CONTRACT,
            Msg::MigrateContract { .. } => MSG_MIGRATE_CONTRACT,
            Msg::CreateVestingAccount { .. } => MSG_CREATE_VESTING_ACCOUNT,
            Msg::CreatePeriodicVestingAccount { .. } => MSG_CREATE_PERIODIC_VESTING_ACCOUNT,
            Msg::CreatePermanentLockedAccount { .. } => MSG_CREATE_PERMANENT_LOCKED_ACCOUNT,
            Msg::AuthzExec { .. } => MSG_EXEC,
            Msg::RecvPacket { .. } => MSG_RECV_PACKET,
            Msg::Acknowledgement { .. } => MSG_ACKNOWLEDGEMENT,
            Msg::Timeout { .. } => MSG_TIMEOUT,
            Msg::UpdateClient { .. } => MSG_UPDATE_CLIENT,
            Msg::EthereumTx(_) => MSG_ETHEREUM_TX,
        }
    }

    /// Addresses whose signatures authorize this message.
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::Send { from, .. }
            | Msg::CreateVestingAccount { from, .. }
            | Msg::CreatePeriodicVestingAccount { from, .. }
            | Msg::CreatePermanentLockedAccount { from, .. } => vec![*from],
            Msg::MultiSend { inputs, .. } => inputs.iter().map(|i| i.address).collect(),
            Msg::Delegate { delegator, .. } => vec![*delegator],
            Msg::Vote { voter, .. } => vec![*voter],
            Msg::StoreCode { sender, .. }
            | Msg::InstantiateContract { sender, .. }
            | Msg::ExecuteContract { sender, .. }
            | Msg::MigrateContract { sender, .. } => vec![*sender],
            Msg::AuthzExec { grantee, .. } => vec![*grantee],
            Msg::RecvPacket { signer, .. }
            | Msg::Acknowledgement { signer, .. }
            | Msg::Timeout { signer, .. }
            | Msg::UpdateClient { signer, .. } => vec![*signer],
            Msg::EthereumTx(msg) => vec![msg.from],
        }
    }

    /// Messages wrapped by an authorization execution; empty otherwise.
    pub fn nested(&self) -> &[Msg] {
        match self {
            Msg::AuthzExec { msgs, .. } => msgs,
            _ => &[],
        }
    }

    /// Contract this message targets, if it targets an existing one.
    pub fn contract_address(&self) -> Option<Address> {
        match self {
            Msg::ExecuteContract { contract, .. } | Msg::MigrateContract { contract, .. } => {
                Some(*contract)
            }
            _ => None,
        }
    }

    /// Packet carried by a relay message (receive, acknowledge or timeout).
    pub fn relay_packet(&self) -> Option<&Packet> {
        match self {
            Msg::RecvPacket { packet, .. }
            | Msg::Acknowledgement { packet, .. }
            | Msg::Timeout { packet, .. } => Some(packet),
            _ => None,
        }
    }

    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        self.validate_at_depth(0)
    }

    fn validate_at_depth(&self, depth: usize) -> Result<(), ValidationError> {
        match self {
            Msg::Send { from, to, amount } => {
                non_zero(from, "from")?;
                non_zero(to, "to")?;
                non_empty_coins(amount)
            }
            Msg::MultiSend { inputs, outputs } => {
                if inputs.len() != 1 {
                    return Err(invalid("inputs", "exactly one input is supported"));
                }
                if outputs.is_empty() {
                    return Err(invalid("outputs", "no outputs"));
                }
                for side in inputs.iter().chain(outputs) {
                    non_zero(&side.address, "address")?;
                    non_empty_coins(&side.coins)?;
                }
                Ok(())
            }
            Msg::Delegate {
                delegator,
                validator,
                amount,
            } => {
                non_zero(delegator, "delegator")?;
                non_zero(validator, "validator")?;
                non_empty_coins(std::slice::from_ref(amount))
            }
            Msg::Vote { voter, .. } => non_zero(voter, "voter"),
            Msg::StoreCode {
                sender,
                wasm_byte_code,
            } => {
                non_zero(sender, "sender")?;
                if wasm_byte_code.is_empty() {
                    return Err(invalid("wasm_byte_code", "empty"));
                }
                Ok(())
            }
            Msg::InstantiateContract {
                sender,
                code_id,
                label,
                funds,
                ..
            } => {
                non_zero(sender, "sender")?;
                if *code_id == 0 {
                    return Err(invalid("code_id", "must be positive"));
                }
                if label.trim().is_empty() {
                    return Err(invalid("label", "empty"));
                }
                validate_coins(funds)
            }
            Msg::ExecuteContract {
                sender,
                contract,
                funds,
                ..
            } => {
                non_zero(sender, "sender")?;
                non_zero(contract, "contract")?;
                validate_coins(funds)
            }
            Msg::MigrateContract {
                sender,
                contract,
                code_id,
                ..
            } => {
                non_zero(sender, "sender")?;
                non_zero(contract, "contract")?;
                if *code_id == 0 {
                    return Err(invalid("code_id", "must be positive"));
                }
                Ok(())
            }
            Msg::CreateVestingAccount {
                from,
                to,
                amount,
                end_time,
            } => {
                non_zero(from, "from")?;
                non_zero(to, "to")?;
                if *end_time <= 0 {
                    return Err(invalid("end_time", "must be positive"));
                }
                non_empty_coins(amount)
            }
            Msg::CreatePeriodicVestingAccount {
                from, to, periods, ..
            } => {
                non_zero(from, "from")?;
                non_zero(to, "to")?;
                if periods.is_empty() {
                    return Err(invalid("periods", "empty schedule"));
                }
                for period in periods {
                    if period.length_seconds == 0 {
                        return Err(invalid("periods", "period length must be positive"));
                    }
                    non_empty_coins(&period.amount)?;
                }
                Ok(())
            }
            Msg::CreatePermanentLockedAccount { from, to, amount } => {
                non_zero(from, "from")?;
                non_zero(to, "to")?;
                non_empty_coins(amount)
            }
            Msg::AuthzExec { grantee, msgs } => {
                non_zero(grantee, "grantee")?;
                if msgs.is_empty() {
                    return Err(invalid("msgs", "no messages to execute"));
                }
                if depth + 1 > MAX_MSG_NESTING {
                    return Err(ValidationError::NestingTooDeep(MAX_MSG_NESTING));
                }
                msgs.iter().try_for_each(|m| m.validate_at_depth(depth + 1))
            }
            Msg::RecvPacket { packet, signer }
            | Msg::Acknowledgement { packet, signer }
            | Msg::Timeout { packet, signer } => {
                non_zero(signer, "signer")?;
                packet.validate_basic()
            }
            Msg::UpdateClient { client_id, signer } => {
                non_zero(signer, "signer")?;
                if client_id.is_empty() {
                    return Err(invalid("client_id", "empty"));
                }
                Ok(())
            }
            Msg::EthereumTx(msg) => msg.validate_basic(),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

fn non_zero(address: &Address, field: &'static str) -> Result<(), ValidationError> {
    if *address == ZERO_ADDRESS {
        Err(ValidationError::EmptyAddress(field))
    } else {
        Ok(())
    }
}

fn non_empty_coins(coins: &[Coin]) -> Result<(), ValidationError> {
    if coins.is_empty() {
        return Err(ValidationError::InvalidCoins("no coins".into()));
    }
    validate_coins(coins)
}
