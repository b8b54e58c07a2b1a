/// Frame scheduler - the acquire / submit / present cycle over a ring of frame slots.
///
/// Each slot moves through `Idle -> Recording -> Submitted -> Presented` and
/// back to `Idle` once its fence is waited on at the top of the next cycle that
/// selects it. With `MAX_FRAMES_IN_FLIGHT` slots, at most that many frames are
/// queued on the GPU at any time.

use crate::error::Result;
use crate::engine_debug;
use super::backend::{AcquireOutcome, FrameBackend, PresentOutcome};
use super::config::MAX_FRAMES_IN_FLIGHT;

/// Lifecycle state of one frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Recording,
    Submitted,
    Presented,
}

/// A frame that acquired a swapchain image and may be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    pub slot: usize,
    pub image_index: u32,
}

#[derive(Debug)]
pub struct FrameScheduler {
    frame_index: usize,
    slots: [SlotState; MAX_FRAMES_IN_FLIGHT],
    framebuffer_resized: bool,
    recreate_count: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            frame_index: 0,
            slots: [SlotState::Idle; MAX_FRAMES_IN_FLIGHT],
            framebuffer_resized: false,
            recreate_count: 0,
        }
    }

    /// Slot selected by the last acquire
    pub fn current_slot(&self) -> usize {
        self.frame_index
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots[slot % MAX_FRAMES_IN_FLIGHT]
    }

    /// Slots whose work may still be executing on the GPU
    pub fn in_flight_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|state| matches!(state, SlotState::Submitted | SlotState::Presented))
            .count()
    }

    /// Flag an external resize; the swapchain is rebuilt after the next present
    pub fn mark_resized(&mut self) {
        self.framebuffer_resized = true;
    }

    pub fn is_resize_pending(&self) -> bool {
        self.framebuffer_resized
    }

    /// Number of swapchain recreations triggered so far
    pub fn recreate_count(&self) -> u64 {
        self.recreate_count
    }

    /// Advance to the next slot, wait for its previous frame and acquire an image
    ///
    /// Returns `None` when the swapchain was out of date: it has been rebuilt and
    /// this frame must be skipped. The slot's fence stays signaled until `submit`.
    pub fn acquire<B: FrameBackend + ?Sized>(&mut self, backend: &mut B) -> Result<Option<FrameTicket>> {
        self.frame_index = (self.frame_index + 1) % MAX_FRAMES_IN_FLIGHT;
        let slot = self.frame_index;

        backend.wait_for_slot(slot)?;
        self.slots[slot] = SlotState::Idle;

        match backend.acquire_next_image(slot)? {
            AcquireOutcome::OutOfDate => {
                engine_debug!("kokoromi::renderer", "Swapchain out of date on acquire, skipping frame");
                self.recreate(backend)?;
                Ok(None)
            }
            AcquireOutcome::Acquired { image_index, .. } => {
                self.slots[slot] = SlotState::Recording;
                Ok(Some(FrameTicket { slot, image_index }))
            }
        }
    }

    /// Reset the slot's fence and submit its recorded command list
    ///
    /// The fence is reset here rather than at acquire, so a frame whose
    /// recording failed leaves the fence signaled and the slot reusable.
    pub fn submit<B: FrameBackend + ?Sized>(&mut self, backend: &mut B, ticket: FrameTicket) -> Result<()> {
        backend.reset_slot(ticket.slot)?;
        backend.submit(ticket.slot)?;
        self.slots[ticket.slot] = SlotState::Submitted;
        Ok(())
    }

    /// Present `ticket`'s image, rebuilding the swapchain afterwards when it is
    /// stale, suboptimal or a resize was flagged
    pub fn present<B: FrameBackend + ?Sized>(&mut self, backend: &mut B, ticket: FrameTicket) -> Result<PresentOutcome> {
        let outcome = backend.present(ticket.slot, ticket.image_index)?;
        self.slots[ticket.slot] = SlotState::Presented;

        let stale = matches!(outcome, PresentOutcome::Suboptimal | PresentOutcome::OutOfDate);
        if stale || self.framebuffer_resized {
            self.framebuffer_resized = false;
            self.recreate(backend)?;
        }

        Ok(outcome)
    }

    /// Rebuild the swapchain; slot states and the frame index are left untouched
    pub fn recreate<B: FrameBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        backend.recreate_swapchain()?;
        self.recreate_count += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_scheduler_tests.rs"]
mod tests;
