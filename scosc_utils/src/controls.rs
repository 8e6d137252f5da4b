//! The shared control array: indexed `f32` cells read and written by both the
//! runtime and an in-process synthesis engine.

use core::sync::atomic::Ordering;

use atomic_float::AtomicF32;
use atomic_refcell::{AtomicRef, AtomicRefCell};

/// Number of cells allocated at startup.
pub const DEFAULT_SHARED_CONTROLS: usize = 1024;

/// Errors returned when resizing the shared control array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControlsError {
    /// Someone (usually a running engine) holds a borrow of the cells.
    #[error("shared controls are in use")]
    Busy,
    /// The in-process server is running and owns the current cells.
    #[error("can't allocate while internal server is running")]
    EngineRunning,
}

/// Fixed-length array of atomic `f32` cells.
///
/// Each cell is its own atomic, so concurrent reads and writes from the network
/// thread, the runtime and an engine thread are well-defined (relaxed ordering: no
/// cell orders any other). The array as a whole can only be swapped for a new one
/// while nobody holds a [`cells`](Self::cells) borrow.
///
/// Out-of-range reads yield `0.0`, out-of-range writes are ignored.
#[derive(Debug)]
pub struct SharedControls {
    cells: AtomicRefCell<Box<[AtomicF32]>>,
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_CONTROLS)
    }
}

#[inline]
fn zeroed(len: usize) -> Box<[AtomicF32]> {
    core::iter::repeat_with(|| AtomicF32::new(0.)).take(len).collect()
}

impl SharedControls {
    pub fn new(len: usize) -> Self {
        Self {
            cells: AtomicRefCell::new(zeroed(len)),
        }
    }

    /// Number of cells, or zero while the array is being replaced.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.try_borrow().map_or(0, |c| c.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.cells
            .try_borrow()
            .ok()
            .and_then(|c| c.get(index).map(|cell| cell.load(Ordering::Relaxed)))
            .unwrap_or(0.)
    }

    #[inline]
    pub fn set(&self, index: usize, value: f32) {
        if let Ok(cells) = self.cells.try_borrow() {
            if let Some(cell) = cells.get(index) {
                cell.store(value, Ordering::Relaxed);
            }
        }
    }

    /// Borrows the cells, for an engine that reads them directly.
    ///
    /// While any such borrow is alive, [`resize`](Self::resize) fails with
    /// [`ControlsError::Busy`].
    pub fn cells(&self) -> Option<AtomicRef<'_, [AtomicF32]>> {
        self.cells
            .try_borrow()
            .ok()
            .map(|c| AtomicRef::map(c, |b| &**b))
    }

    /// Replaces the array with `len` zeroed cells, dropping the old ones.
    pub fn resize(&self, len: usize) -> Result<(), ControlsError> {
        let mut cells = self.cells.try_borrow_mut().map_err(|_| ControlsError::Busy)?;
        *cells = zeroed(len);
        log::debug!("shared controls resized to {len} cells");
        Ok(())
    }
}
