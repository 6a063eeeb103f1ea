use fiber_dom::{create_element, fragment, Component, Document as _, Event, Hooks, MemoryNode, Node, Props, StateSetter};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

use memory_::fixture;

type Slot<T> = Rc<RefCell<Option<StateSetter<T>>>>;
type Log = Rc<RefCell<Vec<String>>>;

fn take<T>(slot: &Slot<T>) -> StateSetter<T> {
	slot.borrow().clone().expect("component didn't render")
}

/// A counter that exposes its setter and logs renders, effects and cleanups.
fn counter(setter: &Slot<i32>, log: &Log) -> Component {
	let (setter, log) = (Rc::clone(setter), Rc::clone(log));
	Component::new(move |hooks, _| {
		let (count, set_count) = hooks.use_state(|| 0);
		*setter.borrow_mut() = Some(set_count);
		log.borrow_mut().push(format!("render {}", count));

		let log = Rc::clone(&log);
		hooks.use_effect(move || {
			log.borrow_mut().push(format!("effect {}", count));
			move || log.borrow_mut().push(format!("cleanup {}", count))
		});
		create_element("span", Props::new(), vec![count.into()])
	})
}

#[test]
fn updates_are_batched() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));
	let span = f.single();

	let set_count = take(&setter);
	set_count.update(|count| count + 1);
	set_count.update(|count| count + 1);
	assert_eq!(set_count.get(), 2);
	assert_eq!(f.scheduler.requests(), 1);
	assert!(f.root.has_pending_updates());
	assert_eq!(f.html(), "<span>0</span>");

	assert_eq!(f.root.flush(), 1);
	assert!(!f.root.has_pending_updates());
	assert_eq!(f.html(), "<span>2</span>");
	assert_eq!(f.single(), span);
	assert_eq!(log.borrow().iter().filter(|entry| entry.starts_with("render")).count(), 2);
}

#[test]
fn update_closures_may_use_their_setter() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));

	let set_count = take(&setter);
	let inner = set_count.clone();
	set_count.update(move |count| {
		inner.set(10);
		assert_eq!(inner.get(), 10);
		count + 1
	});
	assert_eq!(set_count.get(), 1);
	assert_eq!(f.scheduler.requests(), 1);

	f.root.flush();
	assert_eq!(f.html(), "<span>1</span>");
}

#[test]
fn setting_an_equal_value_is_a_no_op() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));

	take(&setter).set(0);
	assert_eq!(f.scheduler.requests(), 0);
	assert!(!f.root.has_pending_updates());
	assert_eq!(f.root.flush(), 0);
}

#[test]
fn effects_run_after_commit_and_clean_up() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	let document = f.document.clone();
	let container = f.container;
	let observed = Rc::new(RefCell::new(String::new()));
	let probe = {
		let observed = Rc::clone(&observed);
		Component::new(move |hooks, _| {
			let (document, observed) = (document.clone(), Rc::clone(&observed));
			hooks.use_effect(move || *observed.borrow_mut() = document.inner_html(container));
			Node::Null
		})
	};

	f.root.render(vec![create_element(counter(&setter, &log), Props::new(), vec![]), create_element(probe, Props::new(), vec![])]);
	assert_eq!(*log.borrow(), ["render 0", "effect 0"]);
	assert_eq!(*observed.borrow(), "<span>0</span>");

	take(&setter).set(1);
	f.root.flush();
	assert_eq!(*log.borrow(), ["render 0", "effect 0", "render 1", "cleanup 0", "effect 1"]);

	f.root.render(Node::Null);
	assert_eq!(log.borrow().last().map(String::as_str), Some("cleanup 1"));
}

#[test]
fn effects_with_dependencies() {
	let mut f = fixture();
	let log = Log::default();
	let component = |n: i32| {
		let log = Rc::clone(&log);
		create_element(
			Component::new(move |hooks, props| {
				let n = props.get_number("n").unwrap_or_default();
				let log = Rc::clone(&log);
				hooks.use_effect_with(n, move |n| log.borrow_mut().push(format!("effect {}", n)));
				Node::Null
			}),
			Props::new().with("n", n),
			vec![],
		)
	};

	f.root.render(component(1));
	f.root.render(component(1));
	f.root.render(component(2));
	assert_eq!(*log.borrow(), ["effect 1", "effect 2"]);
}

#[test]
fn refs_and_memos_persist() {
	let mut f = fixture();
	let computations = Rc::new(Cell::new(0));
	let component = |n: i32| {
		let computations = Rc::clone(&computations);
		create_element(
			Component::new(move |hooks, props| {
				let renders = hooks.use_ref(|| 0);
				*renders.borrow_mut() += 1;
				let computations = Rc::clone(&computations);
				let n = props.get_number("n").unwrap_or_default();
				let doubled = hooks.use_memo(n, move |n| {
					computations.set(computations.get() + 1);
					n * 2.
				});
				let text = format!("{} {}", doubled, renders.borrow());
				text.into()
			}),
			Props::new().with("n", n),
			vec![],
		)
	};

	f.root.render(component(2));
	f.root.render(component(2));
	assert_eq!(f.html(), "4 2");
	f.root.render(component(3));
	assert_eq!(f.html(), "6 3");
	assert_eq!(computations.get(), 2);
}

#[test]
fn stable_callbacks_are_not_rebound() {
	let mut f = fixture();
	let clicks = Rc::new(Cell::new(0));
	let button = || {
		let clicks = Rc::clone(&clicks);
		create_element(
			Component::new(move |hooks, _| {
				let clicks = Rc::clone(&clicks);
				let on_click = hooks.use_callback((), move |_: &Event| clicks.set(clicks.get() + 1));
				create_element("button", Props::new().on("click", on_click), vec!["+".into()])
			}),
			Props::new(),
			vec![],
		)
	};

	f.root.render(button());
	f.document.clear_mutations();
	f.root.render(button());
	assert_eq!(f.document.take_mutations(), []);

	assert_eq!(f.document.dispatch(f.single(), &Event::new("click")), 1);
	assert_eq!(clicks.get(), 1);
}

#[test]
fn node_refs_are_attached_before_effects() {
	let mut f = fixture();
	let seen = Rc::new(Cell::new(None));
	let component = {
		let seen = Rc::clone(&seen);
		Component::new(move |hooks, _| {
			let input = hooks.use_node_ref();
			let (seen, node_ref) = (Rc::clone(&seen), input.clone());
			hooks.use_effect(move || seen.set(node_ref.get::<MemoryNode>()));
			create_element("input", Props::new().node_ref(&input), vec![])
		})
	};

	f.root.render(create_element(component, Props::new(), vec![]));
	assert_eq!(seen.get(), Some(f.single()));
}

#[test]
fn reducers() {
	enum Action {
		Add(i32),
		Reset,
	}

	let mut f = fixture();
	let dispatch = Rc::new(RefCell::new(None));
	let component = {
		let dispatch = Rc::clone(&dispatch);
		Component::new(move |hooks, _| {
			let (total, dispatch_action) = hooks.use_reducer(
				|total: &i32, action: Action| match action {
					Action::Add(n) => total + n,
					Action::Reset => 0,
				},
				|| 0,
			);
			*dispatch.borrow_mut() = Some(dispatch_action);
			total.into()
		})
	};

	f.root.render(create_element(component, Props::new(), vec![]));
	let dispatch_action = dispatch.borrow().clone().expect("component didn't render");
	dispatch_action.dispatch(Action::Add(2));
	dispatch_action.dispatch(Action::Add(3));
	assert_eq!(f.scheduler.requests(), 1);
	assert_eq!(f.root.flush(), 1);
	assert_eq!(f.html(), "5");

	dispatch_action.dispatch(Action::Reset);
	f.root.flush();
	assert_eq!(f.html(), "0");
}

fn child(hooks: &mut Hooks<'_>, props: &Props) -> Node {
	let (own, set_own) = hooks.use_state(|| 0);
	if let Some(slot) = props.get_data::<Slot<i32>>("setter") {
		*slot.borrow_mut() = Some(set_own);
	}
	format!("{}{}", props.get_number("outer").unwrap_or_default(), own).into()
}

#[test]
fn ancestors_flush_first() {
	let mut f = fixture();
	let (outer_setter, child_setter): (Slot<i32>, Slot<i32>) = Default::default();
	let parent = {
		let (outer_setter, child_setter) = (Rc::clone(&outer_setter), Rc::clone(&child_setter));
		Component::new(move |hooks, _| {
			let (outer, set_outer) = hooks.use_state(|| 0);
			*outer_setter.borrow_mut() = Some(set_outer);
			create_element(
				"p",
				Props::new(),
				vec![create_element(Component::new(child), Props::new().with("outer", outer).data("setter", Rc::clone(&child_setter)), vec![])],
			)
		})
	};

	f.root.render(create_element(parent, Props::new(), vec![]));
	assert_eq!(f.html(), "<p>00</p>");

	take(&child_setter).set(1);
	take(&outer_setter).set(1);
	assert_eq!(f.scheduler.requests(), 2);
	assert_eq!(f.root.flush(), 1);
	assert_eq!(f.html(), "<p>11</p>");
}

#[test]
fn stale_setters_are_inert() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));
	f.root.render(Node::Null);
	f.document.clear_mutations();

	take(&setter).set(5);
	assert_eq!(f.root.flush(), 0);
	assert_eq!(f.document.take_mutations(), []);
	assert_eq!(f.html(), "");
}

#[test]
fn components_keep_their_position() {
	let mut f = fixture();
	let shown = Slot::<bool>::default();
	let toggle = {
		let shown = Rc::clone(&shown);
		Component::new(move |hooks, _| {
			let (visible, set_visible) = hooks.use_state(|| false);
			*shown.borrow_mut() = Some(set_visible);
			if visible {
				Node::List(vec!["b".into(), "c".into()])
			} else {
				Node::Null
			}
		})
	};

	f.root.render(fragment(vec!["a".into(), create_element(toggle.clone(), Props::new(), vec![]), "z".into()]));
	assert_eq!(f.html(), "az");

	take(&shown).set(true);
	f.root.flush();
	assert_eq!(f.html(), "abcz");

	take(&shown).set(false);
	f.root.flush();
	assert_eq!(f.html(), "az");

	f.root.render(create_element("div", Props::new(), vec![create_element(toggle, Props::new(), vec![])]));
	take(&shown).set(true);
	f.root.flush();
	assert_eq!(f.html(), "<div>bc</div>");
}

#[test]
#[should_panic(expected = "previous render")]
fn changing_the_hook_count_panics() {
	let mut f = fixture();
	let component = |extra: bool| {
		create_element(
			Component::new(|hooks, props| {
				hooks.use_state(|| 0);
				if props.get_data::<bool>("extra") == Some(&true) {
					hooks.use_state(|| 1);
				}
				Node::Null
			}),
			Props::new().data("extra", extra),
			vec![],
		)
	};

	f.root.render(component(false));
	f.root.render(component(true));
}

#[test]
#[should_panic(expected = "changed from state to ref")]
fn changing_the_hook_kind_panics() {
	let mut f = fixture();
	let component = |as_ref: bool| {
		create_element(
			Component::new(|hooks, props| {
				if props.get_data::<bool>("ref_first") == Some(&true) {
					hooks.use_ref(|| 0);
				} else {
					hooks.use_state(|| 0);
				}
				Node::Null
			}),
			Props::new().data("ref_first", as_ref),
			vec![],
		)
	};

	f.root.render(component(false));
	f.root.render(component(true));
}

#[test]
fn dropping_the_root_runs_cleanups_only() {
	let f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	let document = f.document.clone();
	let container = f.container;
	let mut root = f.root;
	root.render(create_element(counter(&setter, &log), Props::new(), vec![]));
	document.clear_mutations();

	drop(root);
	assert_eq!(log.borrow().last().map(String::as_str), Some("cleanup 0"));
	assert_eq!(document.take_mutations(), []);
	assert_eq!(document.inner_html(container), "<span>0</span>");
}

#[test]
fn orphaned_roots_are_pruned() {
	let mut f = fixture();
	let (setter, log) = (Slot::default(), Log::default());
	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));
	assert!(!f.root.is_orphaned());
	assert!(!f.root.prune_if_orphaned());

	// Something else replaces the container's content.
	f.document.detach(&f.single()).unwrap();
	f.document.clear_mutations();
	assert!(f.root.is_orphaned());
	assert!(f.root.prune_if_orphaned());
	assert_eq!(f.document.take_mutations(), []);
	assert_eq!(f.root.fiber_count(), 0);
	assert_eq!(log.borrow().last().map(String::as_str), Some("cleanup 0"));

	f.root.render(create_element(counter(&setter, &log), Props::new(), vec![]));
	assert_eq!(f.html(), "<span>0</span>");
}
