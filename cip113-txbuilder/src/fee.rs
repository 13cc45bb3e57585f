//! Fee estimation pieces shared by the assembler

use cip113_primitives::ExUnits;

/// Budget assumed for a redeemer until a real evaluator refines it
pub const DEFAULT_EX_UNITS: ExUnits = ExUnits {
    mem: 10_000_000,
    steps: 1_000_000_000,
};

/// Provisional fee the first balancing round starts from; past the
/// two-byte CBOR boundary so its encoding has the same width as any
/// realistic final fee
pub const PROVISIONAL_FEE: u64 = 200_000;

/// Rounds the fee fixpoint iteration is allowed before giving up
pub const MAX_FEE_ROUNDS: usize = 3;

/// Sums a transaction's redeemer budgets
pub fn total_ex_units<'a>(budgets: impl Iterator<Item = &'a ExUnits>) -> ExUnits {
    budgets.fold(ExUnits { mem: 0, steps: 0 }, |acc, b| ExUnits {
        mem: acc.mem + b.mem,
        steps: acc.steps + b.steps,
    })
}
