//! Circuit breaker, transaction counter, contract gas table and relay
//! de-duplication backed by the state view.

use crate::domain::{AdmissionError, GasRegisterTable, StateOverlay, TxCounterRecord};
use crate::ports::{CircuitBreaker, ContractGasHooks, RelayKeeper, TxCounterStore};
use shared_types::{Msg, Packet};

const CIRCUIT_PREFIX: &[u8] = b"circuit/disabled/";
const TX_COUNTER_KEY: &[u8] = b"wasm/tx_counter";
const RELAY_PREFIX: &[u8] = b"relay/processed/";

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCircuitBreaker;

impl MemoryCircuitBreaker {
    pub fn disable(&self, state: &mut StateOverlay<'_>, type_url: &str) {
        state.set(&[CIRCUIT_PREFIX, type_url.as_bytes()].concat(), vec![1]);
    }

    pub fn enable(&self, state: &mut StateOverlay<'_>, type_url: &str) {
        state.delete(&[CIRCUIT_PREFIX, type_url.as_bytes()].concat());
    }
}

impl CircuitBreaker for MemoryCircuitBreaker {
    fn is_allowed(&self, state: &StateOverlay<'_>, type_url: &str) -> Result<bool, AdmissionError> {
        Ok(state
            .get(&[CIRCUIT_PREFIX, type_url.as_bytes()].concat())?
            .is_none())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryTxCounterStore;

impl TxCounterStore for MemoryTxCounterStore {
    fn load(&self, state: &StateOverlay<'_>) -> Result<Option<TxCounterRecord>, AdmissionError> {
        Ok(state.get_typed(TX_COUNTER_KEY)?)
    }

    fn store(
        &self,
        state: &mut StateOverlay<'_>,
        record: TxCounterRecord,
    ) -> Result<(), AdmissionError> {
        Ok(state.set_typed(TX_COUNTER_KEY, &record)?)
    }
}

/// Hands out a fixed gas register table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticContractGasHooks(pub GasRegisterTable);

impl ContractGasHooks for StaticContractGasHooks {
    fn gas_register(&self) -> GasRegisterTable {
        self.0
    }
}

/// Tracks handled packets: receipts by destination, acknowledgements and
/// timeouts by source.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryRelayKeeper;

impl MemoryRelayKeeper {
    fn packet_key(msg: &Msg) -> Option<Vec<u8>> {
        let (kind, port, channel, packet): (&[u8], _, _, &Packet) = match msg {
            Msg::RecvPacket { packet, .. } => (
                b"recv/",
                &packet.destination_port,
                &packet.destination_channel,
                packet,
            ),
            Msg::Acknowledgement { packet, .. } => {
                (b"ack/", &packet.source_port, &packet.source_channel, packet)
            }
            Msg::Timeout { packet, .. } => {
                (b"ack/", &packet.source_port, &packet.source_channel, packet)
            }
            _ => return None,
        };
        Some(
            [
                RELAY_PREFIX,
                kind,
                port.as_bytes(),
                b"/",
                channel.as_bytes(),
                b"/",
                &packet.sequence.to_be_bytes(),
            ]
            .concat(),
        )
    }

    /// Records that `msg`'s packet has been handled.
    pub fn mark_processed(&self, state: &mut StateOverlay<'_>, msg: &Msg) {
        if let Some(key) = Self::packet_key(msg) {
            state.set(&key, vec![1]);
        }
    }
}

impl RelayKeeper for MemoryRelayKeeper {
    fn is_processed(&self, state: &StateOverlay<'_>, msg: &Msg) -> Result<bool, AdmissionError> {
        match Self::packet_key(msg) {
            Some(key) => Ok(state.get(&key)?.is_some()),
            None => Ok(false),
        }
    }
}
