//! String identifiers for model entities and lookups against collections of them.
use anyhow::{Result, anyhow};
use indexmap::{IndexMap, IndexSet};
use std::borrow::Borrow;
use std::fmt::Display;
use std::hash::Hash;

/// Bounds shared by all identifier types
pub trait IDLike: Eq + Hash + Borrow<str> + Clone + Display + From<String> {}
impl<T> IDLike for T where T: Eq + Hash + Borrow<str> + Clone + Display + From<String> {}

/// Declare a cheaply clonable, string-backed identifier type.
///
/// The generated type can be looked up in maps keyed by it using a plain `&str`.
macro_rules! define_id_type {
    ($name:ident) => {
        /// A string identifier
        #[derive(
            Clone,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            std::hash::Hash,
            derive_more::Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[display("{_0}")]
        pub struct $name(pub std::rc::Rc<str>);

        impl $name {
            /// The identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }
    };
}
pub(crate) use define_id_type;

/// Something which carries its own identifier
pub trait HasID<ID: IDLike> {
    /// The identifier of this item
    fn get_id(&self) -> &ID;
}

/// Implement [`HasID`] for a struct whose identifier lives in a field named `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> &$id_ty {
                &self.id
            }
        }
    };
}
pub(crate) use define_id_getter;

/// A collection which can resolve raw strings to the identifiers it holds
pub trait IDCollection<ID: IDLike> {
    /// Find the stored identifier equal to `id`.
    ///
    /// Fails if `id` is not present, so this doubles as validation of references read from input
    /// files.
    fn get_id(&self, id: &str) -> Result<ID>;
}

fn unknown_id(id: &str) -> anyhow::Error {
    anyhow!("Unknown ID {id} found")
}

impl<ID: IDLike> IDCollection<ID> for IndexSet<ID> {
    fn get_id(&self, id: &str) -> Result<ID> {
        self.get(id).cloned().ok_or_else(|| unknown_id(id))
    }
}

impl<ID: IDLike, V> IDCollection<ID> for IndexMap<ID, V> {
    fn get_id(&self, id: &str) -> Result<ID> {
        self.get_key_value(id)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| unknown_id(id))
    }
}
