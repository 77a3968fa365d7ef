//! # Pipeline
//!
//! An ordered, immutable list of stages built once at startup per variant.
//! Running it is a strict sequential state machine: every stage runs in
//! order and the first error ends the invocation.

use super::classifier::AnteVariant;
use super::context::ExecutionContext;
use super::errors::AdmissionError;
use super::stage::AnteStage;
use shared_types::Transaction;
use tracing::debug_span;

pub struct Pipeline {
    variant: AnteVariant,
    stages: Vec<Box<dyn AnteStage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("variant", &self.variant)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn new(variant: AnteVariant, stages: Vec<Box<dyn AnteStage>>) -> Self {
        Self { variant, stages }
    }

    pub fn variant(&self) -> AnteVariant {
        self.variant
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// On error the context (and its branched state) has already been
    /// dropped; nothing from this invocation can be committed.
    pub fn run<'a>(
        &self,
        mut ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError> {
        for stage in &self.stages {
            let span = debug_span!("ante_stage", stage = stage.name());
            let _enter = span.enter();

            ctx = stage.run(ctx, tx).map_err(|err| {
                let tx_hash = tx.hash().map(hex::encode).unwrap_or_default();
                node_telemetry::log_tx_event!(
                    debug,
                    stage.name(),
                    "Ante stage rejected transaction",
                    tx_hash,
                    variant = self.variant.as_str(),
                    error = %err
                );
                err
            })?;
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::{AdmissionMode, BlockInfo};
    use crate::domain::errors::StateError;
    use crate::domain::state::{StateOverlay, StateStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Empty;

    impl StateStore for Empty {
        fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
            Ok(None)
        }
    }

    /// Writes its name into state, optionally failing afterwards.
    struct Recording {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl AnteStage for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run<'a>(
            &self,
            mut ctx: ExecutionContext<'a>,
            _tx: &Transaction,
        ) -> Result<ExecutionContext<'a>, AdmissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.state.set(self.name.as_bytes(), vec![1]);
            if self.fail {
                return Err(AdmissionError::StructuralValidation(self.name.into()));
            }
            Ok(ctx)
        }
    }

    fn stage(name: &'static str, fail: bool, calls: &Arc<AtomicUsize>) -> Box<dyn AnteStage> {
        Box::new(Recording {
            name,
            fail,
            calls: calls.clone(),
        })
    }

    fn ctx(base: &Empty) -> ExecutionContext<'_> {
        ExecutionContext::new(
            BlockInfo::new(1, "test-1"),
            AdmissionMode::Deliver,
            StateOverlay::new(base),
        )
    }

    #[test]
    fn test_runs_all_stages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(
            AnteVariant::Default,
            vec![stage("a", false, &calls), stage("b", false, &calls)],
        );
        assert_eq!(pipeline.stage_names(), vec!["a", "b"]);

        let base = Empty;
        let out = pipeline.run(ctx(&base), &Transaction::default()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.into_changeset().inserts.len(), 2);
    }

    #[test]
    fn test_short_circuits_on_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(
            AnteVariant::Default,
            vec![
                stage("a", false, &calls),
                stage("b", true, &calls),
                stage("c", false, &calls),
            ],
        );

        let base = Empty;
        let err = pipeline.run(ctx(&base), &Transaction::default()).unwrap_err();
        assert_eq!(err, AdmissionError::StructuralValidation("b".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
