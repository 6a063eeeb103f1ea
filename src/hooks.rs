//! Order-addressed per-component state.
//!
//! A component receives a [`Hooks`] render context on every invocation. Each `use_*` call claims the next slot in
//! the component's slot array, so components must call the same hooks in the same order on every render:
//!
//! ```
//! use fiber_dom::{create_element, Component, Event, Hooks, Node, Props};
//!
//! fn counter(hooks: &mut Hooks<'_>, _: &Props) -> Node {
//! 	let (count, set_count) = hooks.use_state(|| 0);
//! 	let on_click = move |_: &Event| set_count.update(|count| count + 1);
//! 	create_element("button", Props::new().on("click", on_click), vec![count.into()])
//! }
//!
//! let _ = create_element(Component::new(counter), Props::new(), vec![]);
//! ```
//!
//! Calling a different sequence of hooks than on the previous render of the same fiber panics.

use crate::{
	fiber::FiberId,
	props::{Event, EventHandler, NodeRef},
	scheduler::UpdateQueue,
};
use core::{
	any::{type_name, Any},
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::trace;

/// An effect's cleanup function.
pub type Cleanup = Box<dyn FnOnce()>;

/// What an effect may return: nothing, or a cleanup function to run before the effect runs again or the component
/// unmounts.
pub trait Teardown: 'static {
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl Teardown for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl<F: FnOnce() + 'static> Teardown for F {
	fn into_cleanup(self) -> Option<Cleanup> {
		Some(Box::new(self))
	}
}

pub(crate) enum HookSlot {
	/// An `Rc<RefCell<T>>`.
	State(Box<dyn Any>),
	Effect {
		deps: Option<Box<dyn Any>>,
		cleanup: Option<Cleanup>,
	},
	Ref(Box<dyn Any>),
	Memo {
		/// An `Rc<T>`.
		value: Rc<dyn Any>,
		deps: Option<Box<dyn Any>>,
	},
}

impl HookSlot {
	fn name(&self) -> &'static str {
		match self {
			HookSlot::State(_) => "state",
			HookSlot::Effect { .. } => "effect",
			HookSlot::Ref(_) => "ref",
			HookSlot::Memo { .. } => "memo",
		}
	}
}

/// An effect body queued during render, run after the commit that scheduled it.
pub(crate) struct PendingEffect {
	pub fiber: FiberId,
	pub index: usize,
	pub run: Box<dyn FnOnce() -> Option<Cleanup>>,
}

/// The render context of one component invocation.
///
/// Hooks only exist while a component renders, so calling them outside of a render is impossible.
pub struct Hooks<'a> {
	fiber: FiberId,
	component: &'static str,
	slots: &'a mut Vec<HookSlot>,
	cursor: usize,
	first_render: bool,
	updates: Weak<UpdateQueue>,
	effects: &'a mut Vec<PendingEffect>,
}

impl<'a> Hooks<'a> {
	pub(crate) fn new(
		fiber: FiberId,
		component: &'static str,
		slots: &'a mut Vec<HookSlot>,
		first_render: bool,
		updates: Weak<UpdateQueue>,
		effects: &'a mut Vec<PendingEffect>,
	) -> Self {
		Self {
			fiber,
			component,
			slots,
			cursor: 0,
			first_render,
			updates,
			effects,
		}
	}

	/// Checks that this render called as many hooks as the previous one.
	///
	/// # Panics
	///
	/// Iff it didn't.
	pub(crate) fn finish(self) {
		if !self.first_render && self.cursor != self.slots.len() {
			panic!(
				"{} called {} hook(s), but {} on its previous render. Hooks must be called in the same order on every render.",
				self.component,
				self.cursor,
				self.slots.len()
			)
		}
	}

	/// Claims the next slot, creating it with `init` on the first render.
	fn slot(&mut self, expected: &'static str, init: impl FnOnce() -> HookSlot) -> (usize, &mut HookSlot) {
		let index = self.cursor;
		self.cursor += 1;
		if self.first_render {
			self.slots.push(init());
		}
		let component = self.component;
		let slot = self.slots.get_mut(index).unwrap_or_else(|| panic!("{} called more hooks than on its previous render (hook {} is new)", component, index));
		if slot.name() != expected {
			panic!("Hook {} of {} changed from {} to {} between renders", index, component, slot.name(), expected)
		}
		(index, slot)
	}

	fn mismatch<T>(&self, index: usize) -> ! {
		panic!("Hook {} of {} changed its type to {} between renders", index, self.component, type_name::<T>())
	}

	/// Local state that survives re-renders.
	///
	/// Returns the current value and a setter. The setter applies the new value immediately and schedules a re-render
	/// of this component iff the value changed.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_state<T>(&mut self, initial: impl FnOnce() -> T) -> (T, StateSetter<T>)
	where
		T: Clone + PartialEq + 'static,
	{
		let (index, slot) = self.slot("state", || HookSlot::State(Box::new(Rc::new(RefCell::new(initial())))));
		let value = match slot {
			HookSlot::State(value) => value.downcast_ref::<Rc<RefCell<T>>>().cloned(),
			_ => None,
		};
		let value = value.unwrap_or_else(|| self.mismatch::<T>(index));
		let current = value.borrow().clone();
		(
			current,
			StateSetter {
				value,
				fiber: self.fiber,
				updates: self.updates.clone(),
			},
		)
	}

	/// State updated through a reducer function.
	///
	/// `reducer` may differ between renders. Dispatching always uses the one from the latest render.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_reducer<S, A>(&mut self, reducer: impl Fn(&S, A) -> S + 'static, initial: impl FnOnce() -> S) -> (S, Dispatch<A>)
	where
		S: Clone + PartialEq + 'static,
		A: 'static,
	{
		let (state, setter) = self.use_state(initial);
		let dispatch = Dispatch(Rc::new(move |action: A| setter.update(|state| reducer(state, action))));
		(state, dispatch)
	}

	/// Runs `effect` after every commit of this component.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_effect<R: Teardown>(&mut self, effect: impl FnOnce() -> R + 'static) {
		let fiber = self.fiber;
		let (index, _) = self.slot("effect", || HookSlot::Effect { deps: None, cleanup: None });
		self.effects.push(PendingEffect {
			fiber,
			index,
			run: Box::new(move || effect().into_cleanup()),
		});
	}

	/// Runs `effect` after the commit of the first render and after each commit for which `deps` changed.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_effect_with<D, R>(&mut self, deps: D, effect: impl FnOnce(&D) -> R + 'static)
	where
		D: Clone + PartialEq + 'static,
		R: Teardown,
	{
		let fiber = self.fiber;
		let (index, slot) = self.slot("effect", || HookSlot::Effect { deps: None, cleanup: None });
		let stored = match slot {
			HookSlot::Effect { deps: stored, .. } => stored,
			_ => unreachable!(),
		};
		if let Some(previous) = stored.as_ref().and_then(|previous| previous.downcast_ref::<D>()) {
			if *previous == deps {
				return trace!("Effect dependencies unchanged.");
			}
		}
		*stored = Some(Box::new(deps.clone()));
		self.effects.push(PendingEffect {
			fiber,
			index,
			run: Box::new(move || effect(&deps).into_cleanup()),
		});
	}

	/// A mutable box that survives re-renders. Changing it doesn't schedule anything.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_ref<T: 'static>(&mut self, initial: impl FnOnce() -> T) -> Rc<RefCell<T>> {
		let (index, slot) = self.slot("ref", || HookSlot::Ref(Box::new(Rc::new(RefCell::new(initial())))));
		let value = match slot {
			HookSlot::Ref(value) => value.downcast_ref::<Rc<RefCell<T>>>().cloned(),
			_ => None,
		};
		value.unwrap_or_else(|| self.mismatch::<T>(index))
	}

	/// A [`NodeRef`] that survives re-renders, for use as an element's `ref` property.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_node_ref(&mut self) -> NodeRef {
		let (index, slot) = self.slot("ref", || HookSlot::Ref(Box::new(NodeRef::new())));
		let value = match slot {
			HookSlot::Ref(value) => value.downcast_ref::<NodeRef>().cloned(),
			_ => None,
		};
		value.unwrap_or_else(|| self.mismatch::<NodeRef>(index))
	}

	/// Computes a value once and again only when `deps` changes.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_memo<D, T>(&mut self, deps: D, compute: impl FnOnce(&D) -> T) -> Rc<T>
	where
		D: PartialEq + 'static,
		T: 'static,
	{
		let (index, slot) = self.slot("memo", || HookSlot::Memo {
			value: Rc::new(()),
			deps: None,
		});
		let (value, stored) = match slot {
			HookSlot::Memo { value, deps } => (value, deps),
			_ => unreachable!(),
		};
		if let Some(previous) = stored.as_ref().and_then(|previous| previous.downcast_ref::<D>()) {
			if *previous == deps {
				let value = Rc::clone(value).downcast::<T>();
				return value.unwrap_or_else(|_| self.mismatch::<T>(index));
			}
		}
		let computed = Rc::new(compute(&deps));
		*value = Rc::clone(&computed) as Rc<dyn Any>;
		*stored = Some(Box::new(deps));
		computed
	}

	/// An [`EventHandler`] that keeps its identity while `deps` stays the same, so patching doesn't re-bind it.
	///
	/// # Panics
	///
	/// Iff the hook order changed since the previous render.
	pub fn use_callback<D>(&mut self, deps: D, callback: impl Fn(&Event) + 'static) -> EventHandler
	where
		D: PartialEq + 'static,
	{
		EventHandler::clone(&self.use_memo(deps, move |_| EventHandler::new(callback)))
	}
}

impl Debug for Hooks<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks")
			.field("fiber", &self.fiber)
			.field("component", &self.component)
			.field("cursor", &self.cursor)
			.finish()
	}
}

/// Setter returned by [`Hooks::use_state`].
pub struct StateSetter<T> {
	value: Rc<RefCell<T>>,
	fiber: FiberId,
	updates: Weak<UpdateQueue>,
}

impl<T: PartialEq> StateSetter<T> {
	/// Stores `value` and schedules a re-render iff it differs from the current value.
	pub fn set(&self, value: T) {
		if *self.value.borrow() == value {
			return trace!("State unchanged.");
		}
		*self.value.borrow_mut() = value;
		match self.updates.upgrade() {
			Some(updates) => updates.mark_dirty(self.fiber),
			None => trace!("State set on a detached component."),
		}
	}
}

impl<T: Clone + PartialEq> StateSetter<T> {
	/// Computes the next value from the current one, then [`set`](`StateSetter::set`)s it.
	///
	/// Successive updates within one turn see each other's results. `next` works on a copy, so it may use this
	/// setter too. Its result still wins.
	pub fn update(&self, next: impl FnOnce(&T) -> T) {
		let current = self.get();
		self.set(next(&current));
	}
}

impl<T: Clone> StateSetter<T> {
	/// The latest stored value, which may be newer than the one the current render saw.
	#[must_use]
	pub fn get(&self) -> T {
		self.value.borrow().clone()
	}
}

impl<T> Clone for StateSetter<T> {
	fn clone(&self) -> Self {
		Self {
			value: Rc::clone(&self.value),
			fiber: self.fiber,
			updates: self.updates.clone(),
		}
	}
}

impl<T> Debug for StateSetter<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateSetter").field("fiber", &self.fiber).finish()
	}
}

/// Dispatcher returned by [`Hooks::use_reducer`].
pub struct Dispatch<A>(Rc<dyn Fn(A)>);

impl<A> Dispatch<A> {
	pub fn dispatch(&self, action: A) {
		(self.0)(action)
	}
}

impl<A> Clone for Dispatch<A> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<A> Debug for Dispatch<A> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("Dispatch")
	}
}
