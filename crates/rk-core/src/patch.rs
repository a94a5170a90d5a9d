//! Tri-state field value for partial updates.
//!
//! A [`Patch`] says whether an optional column is left untouched, set to a
//! new value, or explicitly cleared. When deserialized as a struct field
//! marked `#[serde(default)]`, a missing key becomes [`Patch::Unset`], an
//! explicit `null` becomes [`Patch::Clear`], and any other value becomes
//! [`Patch::Set`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field was not supplied; keep the stored value.
    #[default]
    Unset,
    /// Field was supplied with a value.
    Set(T),
    /// Field was supplied as empty; clear the stored value.
    Clear,
}

impl<T> Patch<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Set(v) => Patch::Set(f(v)),
            Patch::Clear => Patch::Clear,
        }
    }

    /// Column-level view: `None` leaves the column alone, `Some(None)`
    /// writes NULL, `Some(Some(v))` writes `v`.
    pub fn into_update(self) -> Option<Option<T>> {
        match self {
            Patch::Unset => None,
            Patch::Set(v) => Some(Some(v)),
            Patch::Clear => Some(None),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// A supplied `Option`: `Some` sets, `None` clears.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(v) => serializer.serialize_some(v),
            Patch::Unset | Patch::Clear => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Input {
        #[serde(default)]
        url: Patch<String>,
        #[serde(default)]
        favorite: Patch<bool>,
    }

    #[test]
    fn missing_null_and_value_are_distinct() {
        let input: Input = serde_json::from_str(r#"{"url": null}"#).unwrap();
        assert_eq!(input.url, Patch::Clear);
        assert_eq!(input.favorite, Patch::Unset);

        let input: Input = serde_json::from_str(r#"{"url": "x", "favorite": true}"#).unwrap();
        assert_eq!(input.url, Patch::Set("x".to_string()));
        assert_eq!(input.favorite, Patch::Set(true));
    }

    #[test]
    fn into_update_maps_columns() {
        assert_eq!(Patch::<i32>::Unset.into_update(), None);
        assert_eq!(Patch::Set(3).into_update(), Some(Some(3)));
        assert_eq!(Patch::<i32>::Clear.into_update(), Some(None));
    }

    #[test]
    fn map_preserves_state() {
        assert_eq!(Patch::Set(2).map(|v| v * 2), Patch::Set(4));
        assert_eq!(Patch::<i32>::Clear.map(|v| v * 2), Patch::Clear);
        assert_eq!(Patch::<i32>::Unset.map(|v| v * 2), Patch::Unset);
    }
}
