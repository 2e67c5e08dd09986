use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for buyer contact data (email, phone) that hides the value from
/// Debug/Display so it cannot leak through log macros. Serialization still
/// emits the real value: API responses need it, tracing output does not.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<masked>")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<masked>")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_shows_value() {
        let email = Masked::new("buyer@example.com".to_string());
        assert_eq!(format!("{:?}", email), "<masked>");
        assert_eq!(format!("{}", email), "<masked>");
    }

    #[test]
    fn test_serialize_passes_through() {
        let email = Masked::new("buyer@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"buyer@example.com\"");
    }

    #[test]
    fn test_roundtrip() {
        let parsed: Masked<String> = serde_json::from_str("\"+34600111222\"").unwrap();
        assert_eq!(parsed.inner(), "+34600111222");
    }
}
