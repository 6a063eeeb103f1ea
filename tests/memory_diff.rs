use fiber_dom::{
	create_element, fragment, Component, Document as _, ElementKind, Event, EventHandler, Hooks, Key, MemoryNode, Mutation, Node, Props,
};
use std::{cell::Cell, rc::Rc};

use memory_::{fixture, Fixture};

fn li(key: impl Into<Key>, text: &str) -> Node {
	create_element("li", Props::new().key(key), vec![text.into()])
}

fn ul(children: Vec<Node>) -> Node {
	create_element("ul", Props::new(), children)
}

fn ul_children(f: &Fixture) -> Vec<MemoryNode> {
	f.document.children(f.single())
}

fn inserts_into(mutations: &[Mutation], parent: MemoryNode) -> usize {
	mutations.iter().filter(|mutation| mutation.is_insert_into(parent)).count()
}

fn shout(_: &mut Hooks<'_>, props: &Props) -> Node {
	create_element("b", Props::new(), vec![props.get_str("text").unwrap_or_default().to_uppercase().into()])
}

#[test]
fn identical_render_is_idempotent() {
	let mut f = fixture();
	let handler = EventHandler::new(|_| ());
	let tree = || {
		fragment(vec![
			create_element(
				"section",
				Props::new().class("list").style([("color", "red")]).with("data-n", 1).on("click", handler.clone()),
				vec![ul(vec![li(1, "one"), li(2, "two")]), "plain".into(), 3.into()],
			),
			create_element(Component::new(shout), Props::new().with("text", "hi"), vec![]),
		])
	};

	f.root.render(tree());
	assert_eq!(f.html(), r#"<section class="list" data-n="1" style="color:red;"><ul><li>one</li><li>two</li></ul>plain3</section><b>HI</b>"#);
	f.document.clear_mutations();

	f.root.render(tree());
	assert_eq!(f.document.take_mutations(), []);
}

#[test]
fn keyed_rotation_moves_one_node() {
	let mut f = fixture();
	f.root.render(ul(vec![li(1, "A"), li(2, "B"), li(3, "C")]));
	let ul_node = f.single();
	let [a, b, c]: [MemoryNode; 3] = ul_children(&f).try_into().unwrap();
	f.document.clear_mutations();

	f.root.render(ul(vec![li(3, "C"), li(1, "A"), li(2, "B")]));
	assert_eq!(ul_children(&f), [c, a, b]);
	assert_eq!(
		f.document.take_mutations(),
		[Mutation::Insert {
			parent: ul_node,
			child: c,
			before: Some(a)
		}]
	);
}

#[test]
fn keyed_reversal_patches_in_place() {
	let mut f = fixture();
	f.root.render(ul(vec![li("a", "Alpha"), li("b", "Beta")]));
	let [a, b]: [MemoryNode; 2] = ul_children(&f).try_into().unwrap();
	let a_text = f.document.children(a)[0];
	f.document.clear_mutations();

	f.root.render(ul(vec![li("b", "Beta"), li("a", "Beta2")]));
	assert_eq!(ul_children(&f), [b, a]);
	assert_eq!(f.document.text_content(b), "Beta");
	assert_eq!(f.document.text_content(a), "Beta2");
	assert_eq!(f.document.children(a), [a_text]);

	let mutations = f.document.take_mutations();
	assert_eq!(inserts_into(&mutations, f.single()), 1);
	assert!(mutations.iter().all(|mutation| !matches!(mutation, Mutation::Remove { .. })));
}

#[test]
fn keyed_insertions_and_removals() {
	let mut f = fixture();
	f.root.render(ul(vec![li(1, "1"), li(2, "2"), li(3, "3"), li(4, "4")]));
	let [_, two, _, four]: [MemoryNode; 4] = ul_children(&f).try_into().unwrap();

	f.root.render(ul(vec![li(4, "4"), li(5, "5"), li(2, "2")]));
	let children = ul_children(&f);
	assert_eq!(f.document.text_content(f.single()), "452");
	assert_eq!(children[0], four);
	assert_eq!(children[2], two);
}

#[test]
fn keyed_shape_change_remounts() {
	let mut f = fixture();
	f.root.render(fragment(vec![
		create_element("p", Props::new().key("x"), vec!["p".into()]),
		create_element("i", Props::new().key("y"), vec!["i".into()]),
	]));
	let [_, i]: [MemoryNode; 2] = f.document.children(f.container).try_into().unwrap();

	f.root.render(fragment(vec![
		create_element("div", Props::new().key("x"), vec!["div".into()]),
		create_element("i", Props::new().key("y"), vec!["i".into()]),
	]));
	assert_eq!(f.html(), "<div>div</div><i>i</i>");
	assert_eq!(f.document.children(f.container)[1], i);
}

#[test]
fn keyed_fragments_move_as_a_whole() {
	let mut f = fixture();
	let group = |key: u32, texts: &[&str]| create_element(ElementKind::Fragment, Props::new().key(key), texts.iter().map(|&text| text.into()).collect());

	f.root.render(vec![group(1, &["a1", "a2"]), group(2, &["b1"])]);
	let before = f.document.children(f.container);

	f.root.render(vec![group(2, &["b1"]), group(1, &["a1", "a2"])]);
	assert_eq!(f.html(), "b1a1a2");
	assert_eq!(f.document.children(f.container), [before[2], before[0], before[1]]);
}

#[test]
fn duplicate_keys_do_not_panic() {
	let mut f = fixture();
	f.root.render(ul(vec![li(1, "a"), li(1, "b")]));
	assert_eq!(f.document.text_content(f.single()), "ab");

	f.root.render(ul(vec![li(1, "b")]));
	assert_eq!(f.document.text_content(f.single()), "b");
}

#[test]
fn unkeyed_append_is_non_disruptive() {
	let mut f = fixture();
	let items = |n: usize| ul((0..n).map(|i| create_element("li", Props::new(), vec![i.to_string().into()])).collect());

	f.root.render(items(3));
	let before = ul_children(&f);
	f.document.clear_mutations();

	f.root.render(items(4));
	let after = ul_children(&f);
	assert_eq!(after[..3], before[..]);

	let mutations = f.document.take_mutations();
	assert_eq!(inserts_into(&mutations, f.single()), 1);
	assert_eq!(
		mutations.last(),
		Some(&Mutation::Insert {
			parent: f.single(),
			child: after[3],
			before: None
		})
	);
	// The only other write fills the new item.
	assert_eq!(mutations.len(), 2);
}

#[test]
fn unkeyed_truncation() {
	let mut f = fixture();
	f.root.render(vec![Node::from("a"), "b".into(), "c".into()]);
	let a = f.document.children(f.container)[0];

	f.root.render(vec![Node::from("a")]);
	assert_eq!(f.document.children(f.container), [a]);
}

#[test]
fn listener_replacement_leaves_one_handler() {
	let mut f = fixture();
	let (f_calls, g_calls) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
	let handler_f = {
		let f_calls = Rc::clone(&f_calls);
		move |_: &Event| f_calls.set(f_calls.get() + 1)
	};
	let handler_g = {
		let g_calls = Rc::clone(&g_calls);
		move |_: &Event| g_calls.set(g_calls.get() + 1)
	};

	f.root.render(create_element("button", Props::new().on("click", handler_f), vec![]));
	let button = f.single();
	f.root.render(create_element("button", Props::new().on("click", handler_g), vec![]));
	assert_eq!(f.single(), button);
	assert_eq!(f.document.listener_count(button, "click"), 1);

	assert_eq!(f.document.dispatch(button, &Event::new("click")), 1);
	assert_eq!((f_calls.get(), g_calls.get()), (0, 1));

	f.root.render(create_element("button", Props::new(), vec![]));
	assert_eq!(f.document.listener_count(button, "click"), 0);
}

#[test]
fn removed_props_revert() {
	let mut f = fixture();
	f.root.render(create_element(
		"div",
		Props::new().class("a").with("id", "x").with("hidden", true).style([("color", "red")]),
		vec![],
	));
	let div = f.single();

	f.root.render(create_element("div", Props::new(), vec![]));
	assert_eq!(f.single(), div);
	assert_eq!(f.document.attribute(div, "class").as_deref(), Some(""));
	assert_eq!(f.document.attribute(div, "id"), None);
	assert_eq!(f.document.attribute(div, "hidden"), None);
	assert_eq!(f.document.style_property(div, "color"), None);
}

#[test]
fn text_updates_in_place() {
	let mut f = fixture();
	f.root.render(create_element("p", Props::new(), vec![5.into()]));
	let text = f.document.children(f.single())[0];
	f.document.clear_mutations();

	f.root.render(create_element("p", Props::new(), vec![6.into()]));
	assert_eq!(f.document.children(f.single()), [text]);
	assert_eq!(
		f.document.take_mutations(),
		[Mutation::SetText {
			node: text,
			text: "6".to_owned()
		}]
	);
}

#[test]
fn shape_change_replaces_in_position() {
	let mut f = fixture();
	f.root.render(vec![Node::from("x"), create_element("div", Props::new(), vec![]), "y".into()]);
	let [x, _, y]: [MemoryNode; 3] = f.document.children(f.container).try_into().unwrap();

	f.root.render(vec![Node::from("x"), create_element("span", Props::new(), vec![]), "y".into()]);
	assert_eq!(f.html(), "x<span></span>y");
	let children = f.document.children(f.container);
	assert_eq!((children[0], children[2]), (x, y));

	f.root.render(vec![Node::from("x"), "text".into(), "y".into()]);
	assert_eq!(f.html(), "xtexty");
}

#[test]
fn nested_fragments_keep_their_position() {
	let mut f = fixture();
	f.root.render(vec![Node::from("start"), fragment(vec!["a".into()]), fragment(vec![]), "end".into()]);
	f.root.render(vec![Node::from("start"), fragment(vec!["a".into(), "b".into()]), fragment(vec!["c".into()]), "end".into()]);
	assert_eq!(f.html(), "startabcend");

	f.root.render(vec![Node::from("start"), fragment(vec![]), fragment(vec!["c".into()]), "end".into()]);
	assert_eq!(f.html(), "startcend");
}

#[test]
fn externally_detached_nodes_are_removed_quietly() {
	let mut f = fixture();
	f.root.render(ul(vec![li(1, "a"), li(2, "b")]));
	let first = ul_children(&f)[0];
	assert_eq!(f.document.detach(&first), Ok(true));

	f.root.render(ul(vec![]));
	assert_eq!(ul_children(&f), []);
	assert_eq!(f.root.fiber_count(), 2);
}

#[test]
fn mixed_keyed_and_unkeyed_siblings_are_idempotent() {
	let mut f = fixture();
	let tree = || {
		create_element(
			"div",
			Props::new(),
			vec![
				create_element(ElementKind::Fragment, Props::new().key(0), vec![]),
				"label".into(),
				li(1, "one"),
				create_element("hr", Props::new(), vec![]),
			],
		)
	};

	f.root.render(tree());
	assert_eq!(f.html(), "<div>label<li>one</li><hr></hr></div>");
	let children = f.document.children(f.single());
	f.document.clear_mutations();

	f.root.render(tree());
	assert_eq!(f.document.take_mutations(), []);
	assert_eq!(f.document.children(f.single()), children);
}

#[test]
fn unkeyed_siblings_keep_their_nodes_while_keyed_ones_move() {
	let mut f = fixture();
	f.root.render(ul(vec!["head".into(), li(1, "a"), li(2, "b"), "tail".into()]));
	let [head, a, b, tail]: [MemoryNode; 4] = ul_children(&f).try_into().unwrap();
	f.document.clear_mutations();

	f.root.render(ul(vec!["head".into(), li(2, "b"), li(1, "a"), "tail".into()]));
	assert_eq!(ul_children(&f), [head, b, a, tail]);
	assert_eq!(inserts_into(&f.document.take_mutations(), f.single()), 1);

	f.root.render(ul(vec!["head".into(), li(1, "a"), "tail!".into()]));
	assert_eq!(ul_children(&f), [head, a, tail]);
	assert_eq!(f.html(), "<ul>head<li>a</li>tail!</ul>");
}

#[test]
fn style_string_then_object_then_removed() {
	let mut f = fixture();
	f.root.render(create_element("div", Props::new().with("style", "color: red"), vec![]));
	let div = f.single();

	f.root.render(create_element("div", Props::new().style([("color", "blue")]), vec![]));
	assert_eq!(f.html(), r#"<div style="color:blue;"></div>"#);

	f.root.render(create_element("div", Props::new(), vec![]));
	assert_eq!(f.html(), "<div></div>");
	assert_eq!(f.document.attribute(div, "style"), None);

	f.root.render(create_element("div", Props::new().style([("marginTop", "0")]), vec![]));
	f.root.render(create_element("div", Props::new().with("style", "color: green"), vec![]));
	assert_eq!(f.html(), r#"<div style="color:green;"></div>"#);
	assert_eq!(f.single(), div);
}

#[test]
fn nested_lists_are_spliced_into_their_siblings() {
	let mut f = fixture();
	let tree = |n: i32| {
		create_element(
			"p",
			Props::new(),
			vec![Node::from("a"), Node::from(vec![Node::from(vec![Node::from(n)]), Node::Null, "b".into()]), "c".into()],
		)
	};

	f.root.render(tree(1));
	assert_eq!(f.html(), "<p>a1bc</p>");
	let children = f.document.children(f.single());
	assert_eq!(f.root.fiber_count(), 6);
	f.document.clear_mutations();

	f.root.render(tree(2));
	assert_eq!(f.html(), "<p>a2bc</p>");
	assert_eq!(f.document.children(f.single()), children);
	assert_eq!(
		f.document.take_mutations(),
		[Mutation::SetText {
			node: children[1],
			text: "2".to_owned()
		}]
	);
}
