//! # Admission Service
//!
//! Application service layer that implements the `AdmissionApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`AdmissionApi`)
//! - Classifies each transaction and dispatches it to one immutable pipeline
//! - Converts any unexpected fault inside a pipeline into `InternalFault`
//!   so that a single transaction can never take the node down
//!
//! Batch helpers for the mempool (`check_batch`) and the block applier
//! (`deliver_block`) sit on top of `admit`.

use crate::config::PipelineConfig;
use crate::domain::{
    AdmissionError, AdmissionMode, AnteVariant, BlockInfo, Classifier, CommitStore, Event,
    ExecutionContext, StateOverlay, StateStore,
};
use crate::pipelines::PipelineSet;
use crate::ports::AdmissionApi;
use node_telemetry::metrics::HistogramTimer;
use node_telemetry::{
    log_tx_event, metric_inc, metric_observe, ADMISSIONS_TOTAL, ADMISSION_DURATION, GAS_CONSUMED,
    INTERNAL_FAULTS, REJECTIONS_TOTAL,
};
use rayon::prelude::*;
use shared_types::{Hash, Transaction};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, field, info, info_span, warn, Span};

/// Outcome of a successful admission once the context has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: Hash,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub priority: i64,
    pub events: Vec<Event>,
}

impl TxReceipt {
    fn from_context(tx_hash: Hash, ctx: &ExecutionContext<'_>) -> Self {
        Self {
            tx_hash,
            gas_wanted: ctx.gas_wanted,
            gas_used: ctx.gas_meter.consumed(),
            priority: ctx.priority,
            events: ctx.events.clone(),
        }
    }
}

/// Transaction admission service.
///
/// Holds the classifier and the pipelines built once from a
/// `PipelineConfig`. Shared freely across threads: every call branches its
/// own view of the state it is given.
#[derive(Debug)]
pub struct AdmissionService {
    classifier: Classifier,
    pipelines: PipelineSet,
}

impl AdmissionService {
    /// Create a new admission service.
    ///
    /// # Arguments
    /// * `config` - Parameters and collaborator handles, already validated by
    ///   `PipelineConfigBuilder::build`
    pub fn new(config: PipelineConfig) -> Self {
        let classifier = Classifier::new(config.params.enable_legacy_eip712);
        let pipelines = PipelineSet::build(&config);
        info!(
            chain_id = %config.params.chain_id,
            fee_denom = %config.params.fee_denom,
            legacy_eip712 = config.params.enable_legacy_eip712,
            relay_filter = config.relay.is_some(),
            "Admission pipelines built"
        );
        Self {
            classifier,
            pipelines,
        }
    }

    /// Tentatively admit `txs` against the same committed `state`.
    ///
    /// Each transaction runs on its own branch, so results are independent
    /// of one another and of scheduling. Nothing is written to `state`.
    pub fn check_batch(
        &self,
        state: &dyn StateStore,
        block: &BlockInfo,
        txs: &[Transaction],
        mode: AdmissionMode,
    ) -> Vec<Result<TxReceipt, AdmissionError>> {
        txs.par_iter()
            .map(|tx| {
                let tx_hash = tx.hash()?;
                let ctx = self.admit(state, block, tx, mode)?;
                Ok(TxReceipt::from_context(tx_hash, &ctx))
            })
            .collect()
    }

    /// Admit a block's transactions in order, committing each accepted
    /// transaction's writes before the next one runs.
    ///
    /// A rejected transaction leaves `store` untouched and does not stop
    /// the block.
    pub fn deliver_block<S: CommitStore>(
        &self,
        store: &S,
        block: &BlockInfo,
        txs: &[Transaction],
    ) -> Vec<Result<TxReceipt, AdmissionError>> {
        txs.iter()
            .enumerate()
            .map(|(index, tx)| {
                let block = block.clone().with_tx_index(index as u64);
                let tx_hash = tx.hash()?;
                let ctx = self.admit(store, &block, tx, AdmissionMode::Deliver)?;
                let receipt = TxReceipt::from_context(tx_hash, &ctx);
                store.apply(ctx.into_changeset())?;
                Ok(receipt)
            })
            .collect()
    }

    fn dispatch<'a>(
        &self,
        state: &'a dyn StateStore,
        block: &BlockInfo,
        tx: &Transaction,
        mode: AdmissionMode,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let variant = self.classifier.classify(tx)?;
        Span::current().record("variant", variant.as_str());
        let pipeline = self
            .pipelines
            .get(variant)
            .ok_or_else(|| unsupported(tx, variant))?;

        let _timer =
            HistogramTimer::new(&ADMISSION_DURATION.with_label_values(&[variant.as_str()]));
        let ctx = ExecutionContext::new(block.clone(), mode, StateOverlay::new(state));

        match pipeline.run(ctx, tx) {
            Ok(ctx) => {
                metric_inc!(ADMISSIONS_TOTAL, &[variant.as_str(), "accepted"]);
                metric_observe!(GAS_CONSUMED, ctx.gas_meter.consumed() as f64);
                Ok(ctx)
            }
            Err(err) => {
                metric_inc!(ADMISSIONS_TOTAL, &[variant.as_str(), "rejected"]);
                Err(err)
            }
        }
    }
}

impl AdmissionApi for AdmissionService {
    fn admit<'a>(
        &self,
        state: &'a dyn StateStore,
        block: &BlockInfo,
        tx: &Transaction,
        mode: AdmissionMode,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        let span = info_span!(
            "admit",
            variant = field::Empty,
            mode = mode.as_str(),
            height = block.height
        );
        let _enter = span.enter();

        // The overlay is dropped with the unwound frame, so a fault never
        // leaves partial writes behind.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatch(state, block, tx, mode)
        }))
        .unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            metric_inc!(INTERNAL_FAULTS);
            error!(reason = %reason, "Recovered fault during admission");
            Err(AdmissionError::InternalFault(reason))
        });

        if let Err(err) = &result {
            metric_inc!(REJECTIONS_TOTAL, &[err.kind().as_str()]);
            let tx_hash = tx.hash().map(hex::encode).unwrap_or_default();
            log_tx_event!(
                warn,
                "admit",
                "Transaction rejected",
                tx_hash,
                kind = err.kind().as_str()
            );
        }
        result
    }
}

fn unsupported(tx: &Transaction, variant: AnteVariant) -> AdmissionError {
    let type_url = tx
        .extension_options()
        .first()
        .map(|opt| opt.type_url.clone())
        .unwrap_or_default();
    warn!(variant = variant.as_str(), type_url = %type_url, "Pipeline variant is disabled");
    AdmissionError::UnsupportedExtension(type_url)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown fault".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStateStore;
    use crate::ports::CircuitBreaker;
    use crate::stages::testing::{send, tx_with};
    use crate::test_support::full_config;
    use crate::AdmissionConfig;
    use shared_types::{ExtensionOption, EXT_WEB3_TX};
    use std::sync::Arc;

    struct PanickingCircuit;

    impl CircuitBreaker for PanickingCircuit {
        fn is_allowed(
            &self,
            _state: &StateOverlay<'_>,
            _type_url: &str,
        ) -> Result<bool, AdmissionError> {
            panic!("circuit registry unavailable");
        }
    }

    fn service() -> AdmissionService {
        AdmissionService::new(full_config(AdmissionConfig::for_testing(), false))
    }

    fn block() -> BlockInfo {
        BlockInfo::new(5, "ante_9000-1")
    }

    #[test]
    fn test_unknown_extension_rejected_before_any_stage() {
        let store = MemoryStateStore::new();
        let mut tx = tx_with(vec![send(1)]);
        tx.body
            .extension_options
            .push(ExtensionOption::new("/example.Unknown", vec![]));

        let err = service()
            .admit(&store, &block(), &tx, AdmissionMode::Check)
            .unwrap_err();
        assert_eq!(err, AdmissionError::UnsupportedExtension("/example.Unknown".into()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_disabled_legacy_variant_rejected() {
        let store = MemoryStateStore::new();
        let mut tx = tx_with(vec![send(1)]);
        tx.body
            .extension_options
            .push(ExtensionOption::new(EXT_WEB3_TX, vec![]));

        let err = service()
            .admit(&store, &block(), &tx, AdmissionMode::Check)
            .unwrap_err();
        assert_eq!(err, AdmissionError::UnsupportedExtension(EXT_WEB3_TX.into()));
    }

    #[test]
    fn test_panic_in_collaborator_becomes_internal_fault() {
        let mut config = full_config(AdmissionConfig::for_testing(), false);
        config.circuit = Arc::new(PanickingCircuit);
        let service = AdmissionService::new(config);

        let store = MemoryStateStore::new();
        let mut tx = tx_with(vec![send(1)]);
        tx.auth_info.fee.gas_limit = 100_000;

        let before = INTERNAL_FAULTS.get();
        let err = service
            .admit(&store, &block(), &tx, AdmissionMode::Check)
            .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::InternalFault("circuit registry unavailable".into())
        );
        assert!(INTERNAL_FAULTS.get() >= before + 1.0);
        assert!(store.is_empty());

        // The service keeps working after a recovered fault.
        let err = service
            .admit(&store, &block(), &tx_with(vec![send(1)]), AdmissionMode::Check)
            .unwrap_err();
        assert!(matches!(err, AdmissionError::StructuralValidation(_)));
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "unknown fault");
    }

    #[test]
    fn test_check_batch_reports_each_tx() {
        let store = MemoryStateStore::new();
        let mut unknown = tx_with(vec![send(1)]);
        unknown
            .body
            .extension_options
            .push(ExtensionOption::new("/example.Unknown", vec![]));
        let zero_gas = tx_with(vec![send(2)]);

        let results = service().check_batch(
            &store,
            &block(),
            &[unknown, zero_gas],
            AdmissionMode::Check,
        );
        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(AdmissionError::UnsupportedExtension(_))
        ));
        assert!(matches!(
            results[1],
            Err(AdmissionError::StructuralValidation(_))
        ));
    }
}
