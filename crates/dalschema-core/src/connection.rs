use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Connection string used when the caller does not provide one.
pub const DEFAULT_CONNECTION_STRING: &str =
    "Data Source=Localhost;Initial Catalog=Master;Integrated Security=SSPI;Connect Timeout=1;";

/// ADO.NET-style connection string handed to a query executor.
///
/// The raw text is only reachable through [`ConnectionDescriptor::as_str`];
/// `Debug`, `Display`, and serialization all emit the redacted form.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    raw: String,
}

impl ConnectionDescriptor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Trusted connection to `master` on the local default instance.
    pub fn local() -> Self {
        Self::new(DEFAULT_CONNECTION_STRING)
    }

    /// The unredacted connection string, for executors only.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Iterate over `key=value` pairs, trimming whitespace around both sides.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw.split(';').filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let mut iter = pair.splitn(2, '=');
            let key = iter.next().unwrap_or("").trim();
            let value = iter.next().unwrap_or("").trim();
            Some((key, value))
        })
    }

    /// Look up a value by key, ignoring ASCII case. The last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs()
            .filter(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
            .last()
    }

    /// Server the descriptor points at, from `Data Source` or `Server`.
    pub fn server(&self) -> Option<&str> {
        self.get("Data Source")
            .or_else(|| self.get("Server"))
            .or_else(|| self.get("Address"))
    }

    /// Connection string with secrets masked.
    pub fn redacted(&self) -> String {
        self.pairs()
            .map(|(key, value)| {
                if is_sensitive_key(key) {
                    format!("{key}=***;")
                } else {
                    format!("{key}={value};")
                }
            })
            .collect()
    }
}

impl Default for ConnectionDescriptor {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl From<&str> for ConnectionDescriptor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConnectionDescriptor {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl Serialize for ConnectionDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.redacted())
    }
}

impl<'de> Deserialize<'de> for ConnectionDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pwd" | "access token" | "accesstoken"
    )
}
