use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// A single proxy endpoint as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProxyRecord {
    pub link: String,
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "Port")]
    pub port: Option<PortValue>,
    #[serde(rename = "Country", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "Ping", skip_serializing_if = "Option::is_none")]
    pub ping: Option<String>,
}

impl ProxyRecord {
    pub fn new(link: &str, ip: &str, port: PortValue) -> Self {
        Self {
            link: link.to_string(),
            ip: ip.to_string(),
            port: Some(port),
            country: None,
            ping: None,
        }
    }

    pub fn port_str(&self) -> String {
        self.port.as_ref().map(|p| p.to_string()).unwrap_or_default()
    }

    pub fn country_str(&self) -> &str {
        self.country.as_deref().unwrap_or("")
    }

    pub fn ping_str(&self) -> &str {
        self.ping.as_deref().unwrap_or("")
    }

    /// Project a decoded JSON entry onto a record without rejecting odd values.
    ///
    /// The backend does not validate what it stores, so field types are taken as
    /// they come: strings verbatim, other scalars in their JSON spelling. The
    /// capitalised wire name wins when both spellings are present. Anything that
    /// is not an object becomes an empty record.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            link: field(obj, &["link"]).and_then(text).unwrap_or_default(),
            ip: field(obj, &["IP", "ip"]).and_then(text).unwrap_or_default(),
            port: field(obj, &["Port", "port"]).and_then(|v| match v {
                Value::Number(n) => Some(PortValue::Number(n.clone())),
                other => text(other).map(PortValue::Text),
            }),
            country: field(obj, &["Country", "country"]).and_then(text),
            ping: field(obj, &["Ping", "ping"]).and_then(text),
        }
    }
}

impl<'de> Deserialize<'de> for ProxyRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ProxyRecord::from_value(&value))
    }
}

/// First non-null value among `names`
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Port as sent by the backend, which stores it either as a number or a string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(serde_json::Number),
    Text(String),
}

impl From<u16> for PortValue {
    fn from(port: u16) -> Self {
        PortValue::Number(port.into())
    }
}

impl From<&str> for PortValue {
    fn from(port: &str) -> Self {
        PortValue::Text(port.to_string())
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Number(n) => write!(f, "{}", n),
            PortValue::Text(s) => f.write_str(s),
        }
    }
}

/// Keyed proxy collection as returned by `/proxies` and `/update-proxies`.
///
/// The keys carry no meaning for the client but are kept so the mapping can be
/// handed back unchanged. Entries are ordered the way a JavaScript object
/// enumerates its own keys: canonical array-index keys first in ascending
/// numeric order, then all remaining keys in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyMap {
    entries: Vec<(String, ProxyRecord)>,
}

impl ProxyMap {
    fn sort_index_keys(&mut self) {
        // sort_by_key is stable, so non-index keys keep document order
        self.entries
            .sort_by_key(|(key, _)| array_index(key).map_or((1, 0), |idx| (0, idx)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Backend keys in display order. The view only shows values; the keys
    /// stay available for callers that need to address a record on the backend.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Key/record pairs in display order, see [`ProxyMap::keys`]
    pub fn entries(&self) -> &[(String, ProxyRecord)] {
        &self.entries
    }

    /// Drop the keys and keep the records in display order
    pub fn into_records(self) -> Vec<ProxyRecord> {
        self.entries.into_iter().map(|(_, record)| record).collect()
    }
}

/// Canonical array index: decimal digits without leading zeros, below 2^32 - 1
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|idx| *idx < u32::MAX)
}

impl<'de> Deserialize<'de> for ProxyMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ProxyMapVisitor;

        impl<'de> Visitor<'de> for ProxyMapVisitor {
            type Value = ProxyMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping keys to proxy records")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, ProxyRecord)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                // a repeated key keeps its first position, last value wins
                let mut positions: HashMap<String, usize> = HashMap::new();
                while let Some((key, record)) = access.next_entry::<String, ProxyRecord>()? {
                    match positions.get(&key) {
                        Some(&pos) => entries[pos].1 = record,
                        None => {
                            positions.insert(key.clone(), entries.len());
                            entries.push((key, record));
                        }
                    }
                }

                let mut map = ProxyMap { entries };
                map.sort_index_keys();
                Ok(map)
            }
        }

        deserializer.deserialize_map(ProxyMapVisitor)
    }
}

/// Response of the backend `/health` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
