//! Update batching.
//!
//! State setters don't re-render anything themselves. They mark their component dirty in the [`Root`](`crate::Root`)'s
//! update queue, and the first time a fiber becomes dirty the root's [`Scheduler`] is asked to arrange a
//! [`Root::flush`](`crate::Root::flush`). Further updates to the same fiber before that flush coalesce.

use crate::fiber::FiberId;
use core::cell::{Cell, RefCell};
use hashbrown::HashSet;
use std::rc::Rc;
use tracing::trace;

/// Arranges for [`Root::flush`](`crate::Root::flush`) to be called at the host's next convenient point,
/// for example a microtask.
pub trait Scheduler {
	/// Called once for each fiber that becomes dirty.
	fn schedule(&self);
}

/// A [`Scheduler`] that only counts requests. The host flushes whenever it likes.
#[derive(Debug, Default)]
pub struct ManualScheduler {
	requests: Cell<usize>,
}

impl ManualScheduler {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// How often [`Scheduler::schedule`] was called so far.
	#[must_use]
	pub fn requests(&self) -> usize {
		self.requests.get()
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&self) {
		self.requests.set(self.requests.get() + 1);
	}
}

pub(crate) struct UpdateQueue {
	pending: RefCell<HashSet<FiberId>>,
	queued: RefCell<Vec<FiberId>>,
	scheduler: Rc<dyn Scheduler>,
}

impl UpdateQueue {
	pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
		Self {
			pending: RefCell::default(),
			queued: RefCell::default(),
			scheduler,
		}
	}

	pub fn mark_dirty(&self, fiber: FiberId) {
		if !self.pending.borrow_mut().insert(fiber) {
			return trace!("{:?} is already pending.", fiber);
		}
		self.queued.borrow_mut().push(fiber);
		trace!("Scheduling a flush for {:?}.", fiber);
		self.scheduler.schedule();
	}

	/// Called whenever `fiber` renders or unmounts, which satisfies any pending update.
	pub fn settle(&self, fiber: FiberId) {
		self.pending.borrow_mut().remove(&fiber);
	}

	pub fn is_pending(&self, fiber: FiberId) -> bool {
		self.pending.borrow().contains(&fiber)
	}

	pub fn take_queued(&self) -> Vec<FiberId> {
		std::mem::take(&mut *self.queued.borrow_mut())
	}

	pub fn is_empty(&self) -> bool {
		self.pending.borrow().is_empty()
	}
}
