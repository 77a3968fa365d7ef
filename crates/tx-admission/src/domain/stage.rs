//! # Stage Contract
//!
//! One uniform contract for every unit of the pipeline:
//! `(context, transaction) -> context | error`.

use super::context::ExecutionContext;
use super::errors::AdmissionError;
use shared_types::Transaction;

/// An atomic, ordered unit of validation or charging.
///
/// A stage never retries and never panics for control flow: it either hands
/// the (possibly updated) context forward or returns the terminal error.
pub trait AnteStage: Send + Sync {
    /// Stable name used in logs, metrics and ordering checks.
    fn name(&self) -> &'static str;

    fn run<'a>(
        &self,
        ctx: ExecutionContext<'a>,
        tx: &Transaction,
    ) -> Result<ExecutionContext<'a>, AdmissionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl AnteStage for Noop {
        fn name(&self) -> &'static str {
            "Noop"
        }

        fn run<'a>(
            &self,
            ctx: ExecutionContext<'a>,
            _tx: &Transaction,
        ) -> Result<ExecutionContext<'a>, AdmissionError> {
            Ok(ctx)
        }
    }

    #[test]
    fn test_stage_is_object_safe() {
        let stage: Box<dyn AnteStage> = Box::new(Noop);
        assert_eq!(stage.name(), "Noop");
    }
}
