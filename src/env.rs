use crate::{error::LispError, value::Value};

/// An ordered table of bindings
///
/// Names are unique; [`Env::put`] overwrites in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    bindings: Vec<(String, Value)>,
}

impl Env {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }
    pub fn put<N>(&mut self, name: N, value: Value)
    where
        N: Into<String>,
    {
        let name = name.into();
        match self.bindings.iter_mut().find(|(bound, _)| *bound == name) {
            Some((_, slot)) => *slot = value,
            None => self.bindings.push((name, value)),
        }
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }
    pub fn len(&self) -> usize {
        self.bindings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Handle to a frame in [`Scopes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvId(usize);

#[derive(Debug)]
struct Frame {
    env: Env,
    parent: Option<EnvId>,
}

/// The chain of environments visible during evaluation
///
/// Frames live in an arena and refer to their parent by [`EnvId`]. Frames
/// are only ever pushed for a lambda call and popped when it returns, so the
/// arena behaves like a stack and a parent always outlives its children.
#[derive(Debug)]
pub struct Scopes {
    frames: Vec<Frame>,
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::new(Env::default())
    }
}

impl Scopes {
    pub const ROOT: EnvId = EnvId(0);
    pub fn new(global: Env) -> Self {
        Scopes {
            frames: vec![Frame {
                env: global,
                parent: None,
            }],
        }
    }
    pub fn global(&self) -> &Env {
        &self.frames[Self::ROOT.0].env
    }
    /// Looks `name` up through the chain, returning a copy
    pub fn get(&self, id: EnvId, name: &str) -> Value {
        let mut next = Some(id);
        while let Some(id) = next {
            let frame = &self.frames[id.0];
            if let Some(value) = frame.env.get(name) {
                return value.clone();
            }
            next = frame.parent;
        }
        LispError::UnboundSymbol(name.into()).into()
    }
    pub fn put<N>(&mut self, id: EnvId, name: N, value: Value)
    where
        N: Into<String>,
    {
        self.frames[id.0].env.put(name, value);
    }
    pub fn def<N>(&mut self, id: EnvId, name: N, value: Value)
    where
        N: Into<String>,
    {
        let mut root = id;
        while let Some(parent) = self.frames[root.0].parent {
            root = parent;
        }
        self.put(root, name, value);
    }
    /// Copies the bindings of the frame `id`, which are empty for the global frame
    ///
    /// A call frame already holds its own lambda's captured bindings, so
    /// copying it alone keeps nested closures lexical. Parent links follow
    /// callers and are never walked here.
    pub fn captured(&self, id: EnvId) -> Env {
        if id == Self::ROOT {
            Env::default()
        } else {
            self.frames[id.0].env.clone()
        }
    }
    pub fn push(&mut self, env: Env, parent: EnvId) -> EnvId {
        self.frames.push(Frame {
            env,
            parent: Some(parent),
        });
        EnvId(self.frames.len() - 1)
    }
    #[track_caller]
    pub fn pop(&mut self, id: EnvId) -> Env {
        assert!(
            id != Self::ROOT && id.0 + 1 == self.frames.len(),
            "Only the innermost frame can be popped"
        );
        self.frames.pop().expect("No frame to pop").env
    }
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_in_place() {
        let mut env = Env::default();
        env.put("x", Value::num(1));
        env.put("y", Value::num(2));
        env.put("x", Value::num(3));
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("x"), Some(&Value::num(3)));
        assert_eq!(env.names().collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn lookup_falls_through_to_parents() {
        let mut scopes = Scopes::default();
        scopes.put(Scopes::ROOT, "x", Value::num(1));
        let child = scopes.push(Env::default(), Scopes::ROOT);
        scopes.put(child, "y", Value::num(2));
        assert_eq!(scopes.get(child, "x"), Value::num(1));
        assert_eq!(scopes.get(child, "y"), Value::num(2));
        assert_eq!(
            scopes.get(Scopes::ROOT, "y"),
            Value::Err(LispError::UnboundSymbol("y".into()))
        );
    }

    #[test]
    fn put_is_local_and_def_is_global() {
        let mut scopes = Scopes::default();
        let outer = scopes.push(Env::default(), Scopes::ROOT);
        let inner = scopes.push(Env::default(), outer);
        scopes.put(inner, "local", Value::num(1));
        scopes.def(inner, "global", Value::num(2));
        assert!(scopes.get(outer, "local").is_err());
        assert_eq!(scopes.global().get("global"), Some(&Value::num(2)));
        let env = scopes.pop(inner);
        assert_eq!(env.get("local"), Some(&Value::num(1)));
        scopes.pop(outer);
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn captured_copies_only_the_defining_frame() {
        let mut scopes = Scopes::default();
        scopes.put(Scopes::ROOT, "g", Value::num(0));
        let caller = scopes.push(Env::default(), Scopes::ROOT);
        scopes.put(caller, "secret", Value::num(1));
        scopes.put(caller, "y", Value::num(2));
        let definer = scopes.push(Env::default(), caller);
        scopes.put(definer, "y", Value::num(10));
        let captured = scopes.captured(definer);
        assert_eq!(captured.get("y"), Some(&Value::num(10)));
        assert_eq!(captured.get("secret"), None);
        assert_eq!(captured.get("g"), None);
        assert!(scopes.captured(Scopes::ROOT).is_empty());
    }
}
