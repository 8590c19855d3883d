//! # Compliance Decision
//!
//! Pure and total. A deleted asset cannot be non-compliant, whatever the
//! engine said about its last known state.

use crate::evidence::Violation;

/// Outcome of the compliance decision for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub compliant: bool,
    pub deleted: bool,
}

/// Decide compliance from the extracted violations and the deletion flag.
pub fn decide(violations: &[Violation], deleted: bool) -> Verdict {
    decide_count(violations.len(), deleted)
}

pub(crate) fn decide_count(violation_count: usize, deleted: bool) -> Verdict {
    if deleted {
        return Verdict {
            compliant: true,
            deleted: true,
        };
    }
    Verdict {
        compliant: violation_count == 0,
        deleted: false,
    }
}
