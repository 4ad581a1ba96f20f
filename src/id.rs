//! Process-wide allocator for independent-variable ids.
//!
//! Ids are handed out once and never reused, so a dropped independent
//! [`Variable`](crate::Variable) simply leaves a gap in the sequence.

use std::sync::atomic::{AtomicU32, Ordering};

/// Identifier of an independent variable.
pub type IvId = u32;

/// Reserved id meaning "not independent".
pub const NOT_INDEPENDENT: IvId = 0;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a fresh id. Strictly greater than every id handed out before.
#[inline]
pub fn allocate() -> IvId {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(id, "allocated independent variable id");
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let a = allocate();
        let b = allocate();
        let c = allocate();
        assert!(a > NOT_INDEPENDENT);
        assert!(a < b && b < c);
    }
}
