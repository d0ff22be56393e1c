use crate::value::{Bindings, Repr, Value};
use fnv::FnvHashMap;
use std::{
    cell::RefCell,
    fmt::{self, Debug},
    rc::{Rc, Weak},
};
use tracing::debug;

pub struct Frame {
    up: Option<Env>,
    /// Number of levels up to the next `with` frame, or 0 if there is none.
    prev_with: usize,
    is_with: bool,
    values: RefCell<Vec<Value>>,
}

/**
A lexical environment: a fixed-size frame of value slots linked to the frame
that encloses it.

Frames are reference counted. Closures and thunks stored in a frame usually
capture that same frame, so cycles are expected; [`FrameRegistry::collect`]
reclaims the ones that nothing outside the cycle refers to.
*/
#[derive(Clone)]
pub struct Env(Rc<Frame>);

fn placeholders(size: usize) -> Vec<Value> {
    (0..size).map(|_| Value::mk_null()).collect()
}

impl Env {
    pub fn new(up: Option<Env>, size: usize) -> Self {
        Env(Rc::new(Frame {
            up,
            prev_with: 0,
            is_with: false,
            values: RefCell::new(placeholders(size)),
        }))
    }

    /// A frame for `with attrs; body`. Its single slot holds the attribute set.
    pub fn new_with(up: Env, prev_with: usize, attrs: Value) -> Self {
        Env(Rc::new(Frame {
            up: Some(up),
            prev_with,
            is_with: true,
            values: RefCell::new(vec![attrs]),
        }))
    }

    pub fn up(&self) -> Option<&Env> {
        self.0.up.as_ref()
    }

    pub fn prev_with(&self) -> usize {
        self.0.prev_with
    }

    pub fn is_with(&self) -> bool {
        self.0.is_with
    }

    pub fn size(&self) -> usize {
        self.0.values.borrow().len()
    }

    pub fn get(&self, displ: usize) -> Value {
        self.0.values.borrow()[displ].clone()
    }

    pub fn set(&self, displ: usize, value: Value) {
        self.0.values.borrow_mut()[displ] = value;
    }

    /// The frame `level` steps up the chain.
    pub fn ancestor(&self, level: usize) -> Option<&Env> {
        let mut env = self;
        for _ in 0..level {
            env = env.up()?;
        }
        Some(env)
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Env {{ size: {}, is_with: {}, prev_with: {} }}",
            self.size(),
            self.0.is_with,
            self.0.prev_with
        )
    }
}

/**
Weak references to every frame an evaluator allocated.

[`FrameRegistry::collect`] finds the frames and values that are only kept
alive by references from inside the value graph itself, and clears them so
that the cycles between them are broken. Anything that is referenced from
elsewhere, directly or through other nodes, is left untouched. The registry
collects when it is dropped. Dead entries are pruned whenever the registry has
doubled in size.
*/
pub struct FrameRegistry {
    frames: Vec<Weak<Frame>>,
    prune_at: usize,
}

const MIN_PRUNE_AT: usize = 1024;

impl FrameRegistry {
    pub fn new() -> Self {
        FrameRegistry {
            frames: Vec::new(),
            prune_at: MIN_PRUNE_AT,
        }
    }

    pub fn register(&mut self, env: &Env) {
        if self.frames.len() >= self.prune_at {
            self.prune();
            self.prune_at = std::cmp::max(MIN_PRUNE_AT, self.frames.len() * 2);
        }
        self.frames.push(Rc::downgrade(&env.0));
    }

    fn prune(&mut self) {
        self.frames.retain(|frame| frame.strong_count() > 0);
    }

    pub fn live(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| frame.strong_count() > 0)
            .count()
    }

    /**
    Clear every registered frame that is unreachable from outside the value
    graph, and every value that only such frames reach. Returns the number of
    frames cleared.

    The graph is everything reachable from the live frames. For each node, the
    references coming from other nodes are subtracted from its strong count;
    whatever is left over is held from outside (the Rust stack, the caller, the
    evaluator's own fields). Those nodes and everything they reach are kept.
    */
    pub fn collect(&mut self) -> usize {
        self.prune();
        let mut graph = Graph::default();
        for frame in self.frames.iter() {
            if let Some(frame) = frame.upgrade() {
                graph.add(Node::Frame(frame));
            }
        }
        graph.trace();
        let cleared = graph.clear_unreachable();
        drop(graph);
        self.prune();
        debug!(cleared, live = self.frames.len(), "collected environment frames");
        cleared
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        FrameRegistry::new()
    }
}

impl Drop for FrameRegistry {
    fn drop(&mut self) {
        self.collect();
    }
}

/// A shared allocation in the value graph.
enum Node {
    Frame(Rc<Frame>),
    Value(Value),
    List(Rc<[Value]>),
    Attrs(Rc<Bindings>),
}

impl Node {
    fn addr(&self) -> usize {
        match self {
            Node::Frame(frame) => Rc::as_ptr(frame) as *const () as usize,
            Node::Value(value) => Rc::as_ptr(&value.0) as *const () as usize,
            Node::List(items) => Rc::as_ptr(items) as *const () as usize,
            Node::Attrs(attrs) => Rc::as_ptr(attrs) as *const () as usize,
        }
    }

    /// Excludes the reference the graph itself holds.
    fn strong_count(&self) -> usize {
        let count = match self {
            Node::Frame(frame) => Rc::strong_count(frame),
            Node::Value(value) => Rc::strong_count(&value.0),
            Node::List(items) => Rc::strong_count(items),
            Node::Attrs(attrs) => Rc::strong_count(attrs),
        };
        count - 1
    }

    /// One entry per strong reference this node holds. A node that is
    /// borrowed right now reports nothing, which only makes its children look
    /// more externally referenced than they are.
    fn children(&self) -> Vec<Node> {
        let mut children = Vec::new();
        match self {
            Node::Frame(frame) => {
                if let Some(up) = &frame.up {
                    children.push(Node::Frame(up.0.clone()));
                }
                if let Ok(values) = frame.values.try_borrow() {
                    children.extend(values.iter().cloned().map(Node::Value));
                }
            }
            Node::Value(value) => {
                if let Ok(repr) = value.0.try_borrow() {
                    match &*repr {
                        Repr::List(items) => children.push(Node::List(items.clone())),
                        Repr::Attrs(attrs) => children.push(Node::Attrs(attrs.clone())),
                        Repr::Lambda { env, .. } | Repr::Thunk { env, .. } => {
                            children.push(Node::Frame(env.0.clone()))
                        }
                        Repr::PrimOpApp { args, .. } => children.push(Node::List(args.clone())),
                        Repr::App { fun, arg } => {
                            children.push(Node::Value(fun.clone()));
                            children.push(Node::Value(arg.clone()));
                        }
                        Repr::Int(_)
                        | Repr::Bool(_)
                        | Repr::Null
                        | Repr::String(_)
                        | Repr::Path(_)
                        | Repr::PrimOp(_)
                        | Repr::Blackhole => {}
                    }
                }
            }
            Node::List(items) => children.extend(items.iter().cloned().map(Node::Value)),
            Node::Attrs(attrs) => {
                children.extend(attrs.iter().map(|attr| Node::Value(attr.value.clone())))
            }
        }
        children
    }
}

#[derive(Default)]
struct Graph {
    index: FnvHashMap<usize, usize>,
    nodes: Vec<Node>,
    edges: Vec<Vec<usize>>,
}

impl Graph {
    fn add(&mut self, node: Node) -> usize {
        let addr = node.addr();
        match self.index.get(&addr) {
            Some(ix) => *ix,
            None => {
                let ix = self.nodes.len();
                self.index.insert(addr, ix);
                self.nodes.push(node);
                self.edges.push(Vec::new());
                ix
            }
        }
    }

    fn trace(&mut self) {
        let mut next = 0;
        while next < self.nodes.len() {
            let children = self.nodes[next].children();
            let edges: Vec<usize> = children.into_iter().map(|child| self.add(child)).collect();
            self.edges[next] = edges;
            next += 1;
        }
    }

    fn reachable(&self) -> Vec<bool> {
        let mut external: Vec<usize> = self.nodes.iter().map(Node::strong_count).collect();
        for edges in self.edges.iter() {
            for child in edges {
                external[*child] = external[*child].saturating_sub(1);
            }
        }
        let mut reachable = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = (0..self.nodes.len())
            .filter(|ix| external[*ix] > 0)
            .collect();
        while let Some(ix) = stack.pop() {
            if reachable[ix] {
                continue;
            }
            reachable[ix] = true;
            stack.extend(self.edges[ix].iter().filter(|child| !reachable[**child]));
        }
        reachable
    }

    fn clear_unreachable(&self) -> usize {
        let reachable = self.reachable();
        let mut cleared = 0;
        // The old contents are kept until the end so that nothing is dropped
        // while a slot is borrowed.
        let mut old_slots: Vec<Vec<Value>> = Vec::new();
        let mut old_reprs: Vec<Repr> = Vec::new();
        for (node, reachable) in self.nodes.iter().zip(reachable) {
            if reachable {
                continue;
            }
            match node {
                Node::Frame(frame) => {
                    if let Ok(mut values) = frame.values.try_borrow_mut() {
                        let size = values.len();
                        old_slots.push(std::mem::replace(&mut *values, placeholders(size)));
                        cleared += 1;
                    }
                }
                Node::Value(value) => {
                    if let Ok(mut repr) = value.0.try_borrow_mut() {
                        old_reprs.push(std::mem::replace(&mut *repr, Repr::Null));
                    }
                }
                Node::List(_) | Node::Attrs(_) => {}
            }
        }
        drop(old_slots);
        drop(old_reprs);
        cleared
    }
}
