//! # Gas Meter
//!
//! Consumption is monotonic and saturates into an error: a charge that would
//! exceed the limit (or overflow) is rejected and leaves the meter as it was.
//! There is no refund.

use super::errors::AdmissionError;

/// Tracks gas consumed against an optional limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    /// A meter bounded by `limit`.
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    /// A meter without a limit (simulation, genesis, Ethereum wrapper).
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// `u64::MAX` for an infinite meter.
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(u64::MAX)
    }

    pub fn is_infinite(&self) -> bool {
        self.limit.is_none()
    }

    pub fn remaining(&self) -> u64 {
        self.limit().saturating_sub(self.consumed)
    }

    /// Charge `amount` gas for `descriptor`.
    pub fn consume(&mut self, amount: u64, descriptor: &str) -> Result<(), AdmissionError> {
        let next = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| AdmissionError::GasExceeded {
                descriptor: format!("{descriptor} (overflow)"),
                requested: u64::MAX,
                limit: self.limit(),
            })?;

        if let Some(limit) = self.limit {
            if next > limit {
                return Err(AdmissionError::GasExceeded {
                    descriptor: descriptor.to_string(),
                    requested: next,
                    limit,
                });
            }
        }
        self.consumed = next;
        Ok(())
    }

    /// Replace the limit, keeping what was already consumed.
    pub fn set_limit(&mut self, limit: u64, descriptor: &str) -> Result<(), AdmissionError> {
        if self.consumed > limit {
            return Err(AdmissionError::GasExceeded {
                descriptor: descriptor.to_string(),
                requested: self.consumed,
                limit,
            });
        }
        self.limit = Some(limit);
        Ok(())
    }
}

/// Conversion between contract-VM gas and meter gas, installed in the context
/// for smart-contract execution after admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasRegisterTable {
    /// Contract-VM gas units per meter gas unit.
    pub vm_gas_multiplier: u64,
    /// Fixed meter gas charged per contract instance load.
    pub instance_cost: u64,
    /// Meter gas per byte of compiled contract code.
    pub compile_cost_per_byte: u64,
    /// Meter gas per event attribute byte emitted by a contract.
    pub event_attribute_data_cost: u64,
}

impl Default for GasRegisterTable {
    fn default() -> Self {
        Self {
            vm_gas_multiplier: 140_000_000,
            instance_cost: 60_000,
            compile_cost_per_byte: 3,
            event_attribute_data_cost: 1,
        }
    }
}

impl GasRegisterTable {
    /// Meter gas for `vm_gas` units of contract-VM gas, rounded down.
    pub fn from_vm_gas(&self, vm_gas: u64) -> u64 {
        vm_gas / self.vm_gas_multiplier.max(1)
    }

    /// Contract-VM gas purchasable with `gas` meter units.
    pub fn to_vm_gas(&self, gas: u64) -> u64 {
        gas.saturating_mul(self.vm_gas_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_consume_within_limit() {
        let mut meter = GasMeter::new(100);
        meter.consume(40, "a").unwrap();
        meter.consume(60, "b").unwrap();
        assert_eq!(meter.consumed(), 100);
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_consume_over_limit_leaves_meter_untouched() {
        let mut meter = GasMeter::new(100);
        meter.consume(90, "a").unwrap();
        let err = meter.consume(11, "b").unwrap_err();
        assert!(matches!(err, AdmissionError::GasExceeded { requested: 101, limit: 100, .. }));
        assert_eq!(meter.consumed(), 90);
    }

    #[test]
    fn test_infinite_meter_detects_overflow() {
        let mut meter = GasMeter::infinite();
        meter.consume(u64::MAX, "a").unwrap();
        assert!(meter.consume(1, "b").is_err());
    }

    #[test]
    fn test_set_limit_preserves_consumption() {
        let mut meter = GasMeter::infinite();
        meter.consume(500, "setup").unwrap();
        meter.set_limit(1_000, "simulation").unwrap();
        assert_eq!(meter.consumed(), 500);
        assert_eq!(meter.remaining(), 500);
        assert!(meter.set_limit(100, "simulation").is_err());
    }

    #[test]
    fn test_gas_register_conversion() {
        let table = GasRegisterTable::default();
        assert_eq!(table.from_vm_gas(table.to_vm_gas(7)), 7);
    }

    proptest! {
        #[test]
        fn prop_consumption_is_monotonic_and_bounded(
            limit in 0u64..1_000_000,
            charges in proptest::collection::vec(0u64..100_000, 0..32),
        ) {
            let mut meter = GasMeter::new(limit);
            let mut last = 0;
            for charge in charges {
                let _ = meter.consume(charge, "prop");
                prop_assert!(meter.consumed() >= last);
                prop_assert!(meter.consumed() <= limit);
                last = meter.consumed();
            }
        }
    }
}
