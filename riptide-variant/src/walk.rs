//! Non-recursive tree traversal.
//!
//! Every serializer drives this walk rather than recursing: the traversal
//! keeps an explicit stack of container frames, so input-controlled nesting
//! depth costs heap, never call-stack frames. An earlier recursive version of
//! the same walk in this codebase's ancestry was exploitable with
//! maliciously deep trees.

use crate::string::VariantStr;
use crate::variant::Variant;

/// Per-kind emit callbacks: one virtual table shared by the binary and text
/// serializers (and anything else that needs a full traversal).
pub trait WalkHandler {
    fn on_int(&mut self, value: i64);
    fn on_bool(&mut self, value: bool);
    fn on_real(&mut self, value: f64);
    fn on_string(&mut self, value: &VariantStr<'_>);
    fn on_dict_begin(&mut self, dict: &Variant<'_>);
    fn on_list_begin(&mut self, list: &Variant<'_>);
    fn on_container_end(&mut self, container: &Variant<'_>);
}

#[derive(Clone, Copy)]
enum Item<'v, 'a> {
    Key(&'v VariantStr<'a>),
    Value(&'v Variant<'a>),
}

struct Frame<'v, 'a> {
    node: &'v Variant<'a>,
    items: Vec<Item<'v, 'a>>,
    next: usize,
}

/// Walks `top` depth-first in insertion order, except that with `sort_dicts`
/// each dict's entries are visited in byte-lexicographic key order (the
/// canonical-encoding order). Dict keys are reported through `on_string`
/// immediately before their values.
pub fn walk<H: WalkHandler>(top: &Variant<'_>, sort_dicts: bool, handler: &mut H) {
    let mut stack: Vec<Frame<'_, '_>> = Vec::new();

    enter(top, sort_dicts, handler, &mut stack);

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.items.len() {
            let item = frame.items[frame.next];
            frame.next += 1;
            match item {
                Item::Key(key) => handler.on_string(key),
                Item::Value(value) => enter(value, sort_dicts, handler, &mut stack),
            }
        } else {
            handler.on_container_end(frame.node);
            stack.pop();
        }
    }
}

fn enter<'v, 'a, H: WalkHandler>(
    node: &'v Variant<'a>,
    sort_dicts: bool,
    handler: &mut H,
    stack: &mut Vec<Frame<'v, 'a>>,
) {
    match node {
        Variant::Int(i) => handler.on_int(*i),
        Variant::Bool(b) => handler.on_bool(*b),
        Variant::Real(r) => handler.on_real(*r),
        Variant::Str(s) => handler.on_string(s),
        Variant::List(children) => {
            handler.on_list_begin(node);
            let items = children.iter().map(Item::Value).collect();
            stack.push(Frame {
                node,
                items,
                next: 0,
            });
        }
        Variant::Dict(entries) => {
            handler.on_dict_begin(node);
            let mut order: Vec<usize> = (0..entries.len()).collect();
            if sort_dicts {
                order.sort_by(|&a, &b| entries[a].0.cmp(&entries[b].0));
            }
            let mut items = Vec::with_capacity(entries.len() * 2);
            for i in order {
                let (key, value) = &entries[i];
                items.push(Item::Key(key));
                items.push(Item::Value(value));
            }
            stack.push(Frame {
                node,
                items,
                next: 0,
            });
        }
    }
}
