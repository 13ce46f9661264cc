//! The objects color spaces, functions and shadings are described with.
//!
//! The PostScript virtual machine is not part of this crate. A host interpreter converts its
//! own objects into an [`Object`] once, at the boundary, and all further processing works on
//! these typed values.

use crate::function::Values;
use pscolor_postscript::Procedure;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod keys;

/// A procedure that cannot be run by the restricted evaluator, like a tint transform that
/// calls into the host's dictionaries.
///
/// The host provides an implementation that runs the procedure in the full interpreter.
pub trait TintTransform: Debug + Send + Sync {
    /// Map `input` to the output values, or return `None` if running the procedure failed.
    fn eval(&self, input: &[f32]) -> Option<Values>;
}

/// A name object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a new name.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Return a string representation of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

/// An object.
#[derive(Debug, Clone)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer or real number.
    Number(f32),
    /// A name.
    Name(Name),
    /// A string.
    String(Arc<[u8]>),
    /// An array.
    Array(Arc<[Object]>),
    /// An executable array that only uses the restricted operator set.
    Procedure(Procedure),
    /// A dictionary.
    Dict(Dict),
    /// A dictionary with attached data, like an ICC profile or a sampled function.
    Stream(Stream),
    /// A procedure that is run by the host interpreter.
    External(Arc<dyn TintTransform>),
}

impl Object {
    /// Create a name object.
    pub fn name(name: &str) -> Self {
        Self::Name(Name::new(name))
    }

    /// Create a string object.
    pub fn string(data: &[u8]) -> Self {
        Self::String(Arc::from(data))
    }

    /// Create an array object.
    pub fn array(items: impl IntoIterator<Item = Object>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Create an array of numbers.
    pub fn numbers(items: &[f32]) -> Self {
        Self::array(items.iter().copied().map(Self::Number))
    }

    /// Scan `source` into a procedure object.
    pub fn procedure(source: &[u8]) -> crate::Result<Self> {
        Ok(Self::Procedure(Procedure::parse(source)?))
    }

    /// Try to convert the object into a specific type.
    pub fn cast<T: FromObject>(&self) -> Option<T> {
        T::from_object(self)
    }

    /// Return the object as a name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Return the object as an array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Return the dictionary of a dictionary or stream object.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(s.dict()),
            _ => None,
        }
    }

    /// Return the object as a stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Return the object as a number.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the object is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Number(value as f32)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Name> for Object {
    fn from(value: Name) -> Self {
        Self::Name(value)
    }
}

impl From<Procedure> for Object {
    fn from(value: Procedure) -> Self {
        Self::Procedure(value)
    }
}

impl From<Dict> for Object {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Self::Stream(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Self::Array(value.into())
    }
}

impl From<Arc<dyn TintTransform>> for Object {
    fn from(value: Arc<dyn TintTransform>) -> Self {
        Self::External(value)
    }
}

/// A dictionary, which is a key-value map, keys being names, and values being any object.
///
/// Dictionaries are immutable once built and cheap to clone.
#[derive(Clone, Default)]
pub struct Dict(Arc<FxHashMap<Name, Object>>);

impl Dict {
    /// Create a new empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary from a list of entries.
    pub fn from_entries<'k>(entries: impl IntoIterator<Item = (&'k str, Object)>) -> Self {
        Self(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (Name::new(k), v))
                .collect(),
        ))
    }

    /// Return a copy of the dictionary with an additional entry.
    pub fn with(mut self, key: &str, value: impl Into<Object>) -> Self {
        Arc::make_mut(&mut self.0).insert(Name::new(key), value.into());

        self
    }

    /// Returns the entry of a key as a specific type.
    pub fn get<T: FromObject>(&self, key: &str) -> Option<T> {
        self.0.get(key).and_then(T::from_object)
    }

    /// Returns the raw object stored under a key.
    pub fn get_object(&self, key: &str) -> Option<&Object> {
        self.0.get(key)
    }

    /// Checks whether the dictionary contains an entry with a specific key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries in the dictionary.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Dict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut entries = self.0.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        f.debug_map().entries(entries).finish()
    }
}

/// The identity of a stream, unique within the process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);

/// A dictionary together with the (already decoded) data that follows it.
#[derive(Clone)]
pub struct Stream {
    dict: Dict,
    data: Arc<[u8]>,
    id: StreamId,
}

impl Stream {
    /// Create a new stream.
    pub fn new(dict: Dict, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            dict,
            data: data.into(),
            id: StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// The dictionary of the stream.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The data of the stream.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The identity of the stream. Clones of a stream share the same identity.
    pub fn id(&self) -> StreamId {
        self.id
    }
}

impl Debug for Stream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("len", &self.data.len())
            .field("id", &self.id)
            .finish()
    }
}

/// A type that can be extracted from an [`Object`].
pub trait FromObject: Sized {
    /// Try to convert the object. Returns `None` if it has the wrong type.
    fn from_object(object: &Object) -> Option<Self>;
}

impl FromObject for Object {
    fn from_object(object: &Object) -> Option<Self> {
        Some(object.clone())
    }
}

impl FromObject for f32 {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_f32()
    }
}

impl FromObject for f64 {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_f32().map(f64::from)
    }
}

impl FromObject for bool {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! integer {
    ($t:ty) => {
        impl FromObject for $t {
            fn from_object(object: &Object) -> Option<Self> {
                let n = object.as_f32()?;

                if !n.is_finite() || n.fract() != 0.0 {
                    return None;
                }

                <$t>::try_from(n as i64).ok()
            }
        }
    };
}

integer!(i32);
integer!(u8);
integer!(u16);
integer!(u32);
integer!(usize);

impl FromObject for Name {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_name().cloned()
    }
}

impl FromObject for Dict {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_dict().cloned()
    }
}

impl FromObject for Stream {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_stream().cloned()
    }
}

impl FromObject for Procedure {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Procedure(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl FromObject for Arc<[Object]> {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Array(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl FromObject for Arc<[u8]> {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromObject for Arc<dyn TintTransform> {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::External(e) => Some(e.clone()),
            _ => None,
        }
    }
}

impl FromObject for Vec<f32> {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_array()?.iter().map(Object::as_f32).collect()
    }
}

impl FromObject for SmallVec<[f32; 4]> {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_array()?.iter().map(Object::as_f32).collect()
    }
}

impl<const N: usize> FromObject for [f32; N] {
    fn from_object(object: &Object) -> Option<Self> {
        let array = object.as_array()?;

        if array.len() != N {
            return None;
        }

        let mut out = [0.0; N];

        for (o, item) in out.iter_mut().zip(array.iter()) {
            *o = item.as_f32()?;
        }

        Some(out)
    }
}

impl<const N: usize> FromObject for [bool; N] {
    fn from_object(object: &Object) -> Option<Self> {
        let array = object.as_array()?;

        if array.len() != N {
            return None;
        }

        let mut out = [false; N];

        for (o, item) in out.iter_mut().zip(array.iter()) {
            *o = bool::from_object(item)?;
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_typed_access() {
        let dict = Dict::new()
            .with(keys::N, 3)
            .with(keys::RANGE, Object::numbers(&[0.0, 1.0, -1.0, 1.0]))
            .with(keys::ALTERNATE, Object::name("DeviceRGB"));

        assert_eq!(dict.get::<u8>(keys::N), Some(3));
        assert_eq!(dict.get::<f32>(keys::N), Some(3.0));
        assert_eq!(
            dict.get::<[f32; 4]>(keys::RANGE),
            Some([0.0, 1.0, -1.0, 1.0])
        );
        assert_eq!(dict.get::<[f32; 2]>(keys::RANGE), None);
        assert_eq!(
            dict.get::<Name>(keys::ALTERNATE).as_deref(),
            Some("DeviceRGB")
        );
        assert_eq!(dict.get::<Dict>(keys::N).map(|d| d.len()), None);
        assert!(!dict.contains_key(keys::DOMAIN));
    }

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(Object::Number(2.5).cast::<u32>(), None);
        assert_eq!(Object::Number(-1.0).cast::<u32>(), None);
        assert_eq!(Object::Number(-1.0).cast::<i32>(), Some(-1));
        assert_eq!(Object::Number(300.0).cast::<u8>(), None);
    }

    #[test]
    fn stream_identity() {
        let a = Stream::new(Dict::new(), vec![1, 2, 3]);
        let b = Stream::new(Dict::new(), vec![1, 2, 3]);

        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.data(), &[1, 2, 3]);
    }

    #[test]
    fn stream_as_dict() {
        let stream = Stream::new(Dict::new().with(keys::N, 1), vec![]);

        assert_eq!(
            Object::Stream(stream).cast::<Dict>().and_then(|d| d.get::<u8>(keys::N)),
            Some(1)
        );
    }
}
