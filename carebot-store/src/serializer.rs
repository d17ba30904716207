//! Bidirectional value conversion between an in-memory and a storable form.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

type ToFn<A, B> = Arc<dyn Fn(&A) -> StoreResult<B> + Send + Sync>;
type FromFn<A, B> = Arc<dyn Fn(B) -> StoreResult<A> + Send + Sync>;

/// A pair of conversions `to: A -> B` and `from: B -> A`.
///
/// The two functions are expected to be near-inverses for values the
/// application actually produces; nothing checks that. Malformed input to
/// `from` surfaces as [`crate::StoreError::Serialization`] to the caller.
pub struct Serializer<A, B> {
    to: ToFn<A, B>,
    from: FromFn<A, B>,
}

impl<A, B> Clone for Serializer<A, B> {
    fn clone(&self) -> Self {
        Self {
            to: Arc::clone(&self.to),
            from: Arc::clone(&self.from),
        }
    }
}

impl<A, B> fmt::Debug for Serializer<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("from", &std::any::type_name::<A>())
            .field("to", &std::any::type_name::<B>())
            .finish()
    }
}

impl<A, B> Serializer<A, B> {
    /// Create a serializer from two fallible conversions.
    pub fn new<T, F>(to: T, from: F) -> Self
    where
        T: Fn(&A) -> StoreResult<B> + Send + Sync + 'static,
        F: Fn(B) -> StoreResult<A> + Send + Sync + 'static,
    {
        Self {
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }

    /// Create a serializer from two conversions that cannot fail.
    pub fn infallible<T, F>(to: T, from: F) -> Self
    where
        T: Fn(&A) -> B + Send + Sync + 'static,
        F: Fn(B) -> A + Send + Sync + 'static,
    {
        Self::new(move |a| Ok(to(a)), move |b| Ok(from(b)))
    }

    /// Convert an in-memory value to its stored form.
    pub fn to(&self, value: &A) -> StoreResult<B> {
        (self.to)(value)
    }

    /// Convert a stored value back to its in-memory form.
    pub fn from(&self, value: B) -> StoreResult<A> {
        (self.from)(value)
    }
}

impl<T: Clone + 'static> Serializer<T, T> {
    /// Serializer that leaves values untouched.
    pub fn identity() -> Self {
        Self::infallible(|value: &T| value.clone(), |value| value)
    }
}

impl<T> Serializer<T, String>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON text serializer for any serde type.
    pub fn json() -> Self {
        Self::new(
            |value: &T| Ok(serde_json::to_string(value)?),
            |text: String| Ok(serde_json::from_str(&text)?),
        )
    }
}

impl<T> Serializer<Vec<T>, String>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// JSON array serializer, used for id lists and member lists.
    pub fn json_array() -> Self {
        Self::json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Member {
        id: i64,
        username: String,
    }

    #[test]
    fn test_identity() {
        let serializer = Serializer::<String, String>::identity();
        let value = "hello".to_string();
        assert_eq!(serializer.to(&value).unwrap(), "hello");
        assert_eq!(serializer.from(value.clone()).unwrap(), value);
    }

    #[test]
    fn test_json_array_inverse() {
        let serializer = Serializer::<Vec<i64>, String>::json_array();
        let ids = vec![3, 1, 2];
        let stored = serializer.to(&ids).unwrap();
        assert_eq!(stored, "[3,1,2]");
        assert_eq!(serializer.from(stored).unwrap(), ids);
    }

    #[test]
    fn test_json_struct_inverse() {
        let serializer = Serializer::<Member, String>::json();
        let member = Member {
            id: 7,
            username: "ada".to_string(),
        };
        let restored = serializer.from(serializer.to(&member).unwrap()).unwrap();
        assert_eq!(restored, member);
    }

    #[test]
    fn test_malformed_input_is_serialization_error() {
        let serializer = Serializer::<Vec<i64>, String>::json_array();
        let err = serializer.from("not json".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_infallible_numbers() {
        let serializer = Serializer::<u32, String>::infallible(
            |n| n.to_string(),
            |s| s.parse().unwrap_or_default(),
        );
        assert_eq!(serializer.to(&12).unwrap(), "12");
        assert_eq!(serializer.from("12".to_string()).unwrap(), 12);
    }
}
