//! Drives a lookup through its stages.
//!
//! The host calls [`advance`] once to start a lookup and again every time a
//! page it might be waiting on becomes ready. Each call runs steps until one
//! reports `Incomplete` or the lookup finishes.

use crate::event::{Event, EventKind};
use crate::storage::btree::lookup::{LookupError, LookupFsm, LookupStage, Step};
use crate::storage::cache::BlockCache;

/// Run `fsm` as far as it can go.
///
/// `event` is the wake-up that triggered this call, or `None` for the first
/// call. Only disk events can resume a lookup; anything else is a protocol
/// error on the host's side and fails the lookup. Calling this on a complete
/// lookup returns `Complete` again, and on a failed one returns the same
/// error, without touching the cache.
pub fn advance<C: BlockCache + ?Sized>(
    fsm: &mut LookupFsm<'_, C>,
    event: Option<&Event>,
) -> Result<Step, LookupError> {
    if let Some(error) = fsm.error() {
        return Err(error.clone());
    }

    if let Some(event) = event {
        if event.kind() != EventKind::Disk {
            return Err(fsm.fail(LookupError::InvalidEvent(event.kind())));
        }
        tracing::trace!(?event, stage = %fsm.stage(), "resuming lookup");
    }

    let mut step = Step::Continue;

    if fsm.stage() == LookupStage::AcquiringSuperblock {
        step = fsm.step_acquiring_superblock()?;
    }

    if step == Step::Continue && fsm.stage() == LookupStage::AcquiringRoot {
        step = fsm.step_acquiring_root()?;
    }

    while step == Step::Continue && fsm.stage() == LookupStage::AcquiringNode {
        step = fsm.step_acquiring_node()?;
    }

    if fsm.is_complete() {
        return Ok(Step::Complete);
    }
    Ok(step)
}
