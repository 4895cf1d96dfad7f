use std::fmt;

use serde::{Deserialize, Serialize};

/// One element of a [`QueryKey`].
///
/// Non-negative integers are always stored as [`KeyPart::UInt`], so `5_i32`
/// and `5_u64` build the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A non-negative integer.
    UInt(u64),
    /// A negative integer.
    Int(i64),
    /// A string.
    Str(String),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<()> for KeyPart {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        u64::try_from(value).map_or(Self::Int(value), Self::UInt)
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

macro_rules! key_part_from_int {
    ($($signed:ty),* ; $($unsigned:ty),*) => {
        $(
            impl From<$signed> for KeyPart {
                fn from(value: $signed) -> Self {
                    Self::from(i64::from(value))
                }
            }
        )*
        $(
            impl From<$unsigned> for KeyPart {
                fn from(value: $unsigned) -> Self {
                    Self::UInt(u64::from(value))
                }
            }
        )*
    };
}

key_part_from_int!(i8, i16, i32; u8, u16, u32);

impl From<usize> for KeyPart {
    fn from(value: usize) -> Self {
        // usize is at most 64 bits on supported targets
        u64::try_from(value).map_or(Self::Str(value.to_string()), Self::UInt)
    }
}

impl<T: Into<Self>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Identity of a cache entry: an ordered sequence of [`KeyPart`]s.
///
/// Keys built from equal parts are equal and hash the same.
///
/// ```
/// use brx::{QueryKey, query_key};
///
/// assert_eq!(query_key!["posts", 5], query_key!["posts", 5_u64]);
/// assert_eq!(QueryKey::from("tasks"), query_key!["tasks"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Build a key from its parts.
    #[must_use]
    pub const fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// The parts, in order.
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty key, which is a prefix of every key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `prefix` is a leading subsequence of this key.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Append a part.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, part) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str("]")
    }
}

impl From<KeyPart> for QueryKey {
    fn from(part: KeyPart) -> Self {
        Self(vec![part])
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self::from(KeyPart::from(value))
    }
}

impl From<String> for QueryKey {
    fn from(value: String) -> Self {
        Self::from(KeyPart::from(value))
    }
}

impl From<Vec<KeyPart>> for QueryKey {
    fn from(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }
}

impl FromIterator<KeyPart> for QueryKey {
    fn from_iter<I: IntoIterator<Item = KeyPart>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build a [`QueryKey`] from values convertible into [`KeyPart`].
///
/// ```
/// use brx::{KeyPart, query_key};
///
/// let key = query_key!["posts", 5];
/// assert_eq!(key.parts(), &[KeyPart::from("posts"), KeyPart::UInt(5)]);
/// ```
#[macro_export]
macro_rules! query_key {
    ($($part:expr),* $(,)?) => {
        $crate::QueryKey::from_parts(vec![$($crate::KeyPart::from($part)),*])
    };
}
