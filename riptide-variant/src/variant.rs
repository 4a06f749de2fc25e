//! The variant tree.

use crate::error::VariantError;
use crate::string::VariantStr;

/// One dict entry: a string key and its value. Duplicate keys are not
/// rejected at construction; lookup returns the first match in insertion
/// order.
pub type DictEntry<'a> = (VariantStr<'a>, Variant<'a>);

/// A tagged value: the in-memory tree both codecs read and write.
///
/// Containers own their children and preserve insertion order; the binary
/// codec re-orders dict entries by key only at serialization time.
#[derive(Debug)]
pub enum Variant<'a> {
    Int(i64),
    Bool(bool),
    Real(f64),
    Str(VariantStr<'a>),
    List(Vec<Variant<'a>>),
    Dict(Vec<DictEntry<'a>>),
}

impl<'a> Variant<'a> {
    /// An empty list.
    pub fn new_list() -> Self {
        Variant::List(Vec::new())
    }

    /// An empty dict.
    pub fn new_dict() -> Self {
        Variant::Dict(Vec::new())
    }

    /// A string node from anything convertible to [`VariantStr`].
    pub fn str(s: impl Into<VariantStr<'a>>) -> Self {
        Variant::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Int(_) => "int",
            Variant::Bool(_) => "bool",
            Variant::Real(_) => "real",
            Variant::Str(_) => "string",
            Variant::List(_) => "list",
            Variant::Dict(_) => "dict",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Variant::List(_) | Variant::Dict(_))
    }

    fn mismatch(&self, expected: &'static str) -> VariantError {
        VariantError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    pub fn as_int(&self) -> Result<i64, VariantError> {
        match self {
            Variant::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, VariantError> {
        match self {
            Variant::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_real(&self) -> Result<f64, VariantError> {
        match self {
            Variant::Real(r) => Ok(*r),
            other => Err(other.mismatch("real")),
        }
    }

    pub fn as_string(&self) -> Result<&VariantStr<'a>, VariantError> {
        match self {
            Variant::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], VariantError> {
        self.as_string().map(|s| s.as_bytes())
    }

    pub fn as_list(&self) -> Result<&[Variant<'a>], VariantError> {
        match self {
            Variant::List(v) => Ok(v),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut Vec<Variant<'a>>, VariantError> {
        match self {
            Variant::List(v) => Ok(v),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_dict(&self) -> Result<&[DictEntry<'a>], VariantError> {
        match self {
            Variant::Dict(v) => Ok(v),
            other => Err(other.mismatch("dict")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Vec<DictEntry<'a>>, VariantError> {
        match self {
            Variant::Dict(v) => Ok(v),
            other => Err(other.mismatch("dict")),
        }
    }

    /// Appends a child to a list.
    pub fn push(&mut self, child: Variant<'a>) -> Result<(), VariantError> {
        self.as_list_mut().map(|v| v.push(child))
    }

    /// Appends a key/value pair to a dict. A key equal to an existing one is
    /// appended, not merged; lookups will keep returning the first.
    pub fn insert(
        &mut self,
        key: impl Into<VariantStr<'a>>,
        value: Variant<'a>,
    ) -> Result<(), VariantError> {
        self.as_dict_mut().map(|v| v.push((key.into(), value)))
    }

    /// First-match dict lookup, `O(n)`. Returns `None` if `self` is not a
    /// dict or the key is absent.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Variant<'a>> {
        let key = key.as_ref();
        match self {
            Variant::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_bytes() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut Variant<'a>> {
        let key = key.as_ref();
        match self {
            Variant::Dict(entries) => entries
                .iter_mut()
                .find(|(k, _)| k.as_bytes() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Dict lookup returning the value only when it is an int.
    pub fn get_int(&self, key: impl AsRef<[u8]>) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int().ok())
    }

    pub fn get_bytes(&self, key: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.get(key).and_then(|v| v.as_bytes().ok())
    }

    pub fn get_str(&self, key: impl AsRef<[u8]>) -> Option<&str> {
        self.get(key).and_then(|v| v.as_string().ok()?.as_str())
    }

    pub fn get_list(&self, key: impl AsRef<[u8]>) -> Option<&[Variant<'a>]> {
        self.get(key).and_then(|v| v.as_list().ok())
    }

    pub fn get_dict(&self, key: impl AsRef<[u8]>) -> Option<&Variant<'a>> {
        self.get(key).filter(|v| matches!(v, Variant::Dict(_)))
    }
}

/// Deep clone with the same explicit-stack discipline as drop and the
/// walks: a derived `Clone` would recurse once per nesting level, and
/// decoded trees can be arbitrarily deep.
impl<'a> Clone for Variant<'a> {
    fn clone(&self) -> Self {
        enum Src<'v, 'a> {
            List(std::slice::Iter<'v, Variant<'a>>),
            Dict(std::slice::Iter<'v, DictEntry<'a>>),
        }

        struct Frame<'v, 'a> {
            src: Src<'v, 'a>,
            dst: Variant<'a>,
        }

        // Leaves clone shallowly; containers open a frame.
        fn open<'v, 'a>(v: &'v Variant<'a>) -> Result<Frame<'v, 'a>, Variant<'a>> {
            match v {
                Variant::Int(i) => Err(Variant::Int(*i)),
                Variant::Bool(b) => Err(Variant::Bool(*b)),
                Variant::Real(r) => Err(Variant::Real(*r)),
                Variant::Str(s) => Err(Variant::Str(s.clone())),
                Variant::List(children) => Ok(Frame {
                    src: Src::List(children.iter()),
                    dst: Variant::List(Vec::with_capacity(children.len())),
                }),
                Variant::Dict(entries) => Ok(Frame {
                    src: Src::Dict(entries.iter()),
                    dst: Variant::Dict(Vec::with_capacity(entries.len())),
                }),
            }
        }

        // A dict frame's last entry starts as a placeholder value that
        // `place` overwrites once the real value is built.
        fn place<'a>(dst: &mut Variant<'a>, value: Variant<'a>) {
            match dst {
                Variant::List(children) => children.push(value),
                Variant::Dict(entries) => {
                    if let Some(last) = entries.last_mut() {
                        last.1 = value;
                    }
                }
                _ => {}
            }
        }

        let mut stack = match open(self) {
            Err(leaf) => return leaf,
            Ok(frame) => vec![frame],
        };
        loop {
            let top = match stack.last_mut() {
                Some(top) => top,
                None => return Variant::new_list(),
            };
            let child = match &mut top.src {
                Src::List(iter) => iter.next(),
                Src::Dict(iter) => match iter.next() {
                    Some((key, value)) => {
                        if let Variant::Dict(entries) = &mut top.dst {
                            entries.push((key.clone(), Variant::Bool(false)));
                        }
                        Some(value)
                    }
                    None => None,
                },
            };
            match child {
                Some(child) => match open(child) {
                    Err(leaf) => place(&mut top.dst, leaf),
                    Ok(frame) => stack.push(frame),
                },
                None => {
                    let done = match stack.pop() {
                        Some(frame) => frame.dst,
                        None => return Variant::new_list(),
                    };
                    match stack.last_mut() {
                        Some(parent) => place(&mut parent.dst, done),
                        None => return done,
                    }
                }
            }
        }
    }
}

/// Structural equality, also without recursion. Reals compare bitwise-free
/// (`f64::eq`), dicts compare in insertion order.
impl<'a, 'b> PartialEq<Variant<'b>> for Variant<'a> {
    fn eq(&self, other: &Variant<'b>) -> bool {
        let mut stack: Vec<(&Variant<'a>, &Variant<'b>)> = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            match (a, b) {
                (Variant::Int(x), Variant::Int(y)) if x == y => {}
                (Variant::Bool(x), Variant::Bool(y)) if x == y => {}
                (Variant::Real(x), Variant::Real(y)) if x == y => {}
                (Variant::Str(x), Variant::Str(y)) if x == y => {}
                (Variant::List(xs), Variant::List(ys)) if xs.len() == ys.len() => {
                    stack.extend(xs.iter().zip(ys.iter()));
                }
                (Variant::Dict(xs), Variant::Dict(ys)) if xs.len() == ys.len() => {
                    for ((xk, xv), (yk, yv)) in xs.iter().zip(ys.iter()) {
                        if xk != yk {
                            return false;
                        }
                        stack.push((xv, yv));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

/// Deep-free without recursing: container children are drained into an
/// explicit worklist so that adversarially deep trees (which only a decoder
/// with heap-bounded depth can build) cannot exhaust the call stack on drop.
impl<'a> Drop for Variant<'a> {
    fn drop(&mut self) {
        let mut work: Vec<Variant<'a>> = Vec::new();
        match self {
            Variant::List(children) => work.append(children),
            Variant::Dict(entries) => work.extend(entries.drain(..).map(|(_, v)| v)),
            _ => return,
        }
        while let Some(mut v) = work.pop() {
            match &mut v {
                Variant::List(children) => work.append(children),
                Variant::Dict(entries) => work.extend(entries.drain(..).map(|(_, v)| v)),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dict() -> Variant<'static> {
        let mut d = Variant::new_dict();
        d.insert("port".to_string(), Variant::Int(51413)).unwrap();
        d.insert("name".to_string(), Variant::str("ubuntu.iso".to_string()))
            .unwrap();
        d
    }

    #[test]
    fn test_typed_accessors() {
        let v = Variant::Int(7);
        assert_eq!(v.as_int().unwrap(), 7);
        assert_eq!(
            v.as_bytes().unwrap_err(),
            VariantError::TypeMismatch {
                expected: "string",
                found: "int"
            }
        );
    }

    #[test]
    fn test_no_implicit_coercion() {
        assert!(Variant::Bool(true).as_int().is_err());
        assert!(Variant::Int(1).as_bool().is_err());
        assert!(Variant::Real(1.0).as_int().is_err());
    }

    #[test]
    fn test_dict_first_match_wins() {
        let mut d = sample_dict();
        d.insert("port".to_string(), Variant::Int(9091)).unwrap();

        // Duplicate key kept, but lookup returns the first in insertion order.
        assert_eq!(d.as_dict().unwrap().len(), 3);
        assert_eq!(d.get_int("port"), Some(51413));
    }

    #[test]
    fn test_typed_finders_check_type() {
        let d = sample_dict();
        assert_eq!(d.get_str("name"), Some("ubuntu.iso"));
        assert_eq!(d.get_int("name"), None);
        assert_eq!(d.get_int("missing"), None);
    }

    #[test]
    fn test_list_append_order() {
        let mut l = Variant::new_list();
        l.push(Variant::Int(1)).unwrap();
        l.push(Variant::str("two")).unwrap();
        let items = l.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_int().unwrap(), 1);
    }

    #[test]
    fn test_push_into_non_list_fails() {
        let mut v = Variant::Int(0);
        assert!(v.push(Variant::Int(1)).is_err());
        assert!(v.insert("k", Variant::Int(1)).is_err());
    }

    #[test]
    fn test_borrowed_strings_compare_equal_to_owned() {
        let buf = b"swarm".to_vec();
        let borrowed = Variant::Str(VariantStr::Borrowed(&buf));
        let owned = Variant::str(b"swarm".to_vec());
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn test_deep_tree_drop_does_not_overflow() {
        // Deeper than any sane call stack would tolerate if drop recursed.
        let mut v = Variant::new_list();
        for _ in 0..200_000 {
            let mut outer = Variant::new_list();
            outer.push(v).unwrap();
            v = outer;
        }
        drop(v);
    }
}
