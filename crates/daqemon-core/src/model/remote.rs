// ── Remote resource types ──
//
// Inputs, feeds and process methods as the metering server reports them.
// The server is loose with scalar types (ids arrive as numbers or numeric
// strings, node ids as either), so every field is decoded leniently.

use daqemon_api::emon::value_as_id;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(value_as_id(&Value::deserialize(d)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// An input known to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nodeid: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Encoded `proc:feed` pairs currently attached.
    #[serde(default, rename = "processList", deserialize_with = "lenient_string")]
    pub process_list: Option<String>,
}

impl RemoteInput {
    pub fn belongs_to(&self, node: &str) -> bool {
        self.nodeid.as_deref() == Some(node)
    }
}

/// A feed known to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFeed {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub engine: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub datatype: Option<i64>,
}

/// One remote processing method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id_num: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub function: Option<String>,
}

impl ProcessInfo {
    /// Numeric id used in encoded process lists.
    pub fn numeric_id(&self) -> Option<i64> {
        self.id_num.or(self.id)
    }
}

/// The server's process-method catalogue, keyed by method name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessCatalogue {
    methods: IndexMap<String, ProcessInfo>,
}

impl ProcessCatalogue {
    /// Accepts the keyed-object form, or an array whose entries name their
    /// method in `function` and default their id to the array index.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let methods = match value {
            Value::Array(items) => {
                let mut methods = IndexMap::new();
                for (index, item) in items.into_iter().enumerate() {
                    let mut info: ProcessInfo = serde_json::from_value(item)?;
                    if info.numeric_id().is_none() {
                        info.id = i64::try_from(index).ok();
                    }
                    if let Some(key) = info.function.clone() {
                        methods.insert(key, info);
                    }
                }
                methods
            }
            Value::Null => IndexMap::new(),
            other => serde_json::from_value(other)?,
        };
        Ok(Self { methods })
    }

    pub fn get(&self, method: &str) -> Option<&ProcessInfo> {
        self.methods.get(method)
    }

    pub fn numeric_id(&self, method: &str) -> Option<i64> {
        self.get(method).and_then(ProcessInfo::numeric_id)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Method names with their entries, in server order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessInfo)> {
        self.methods.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ProcessInfo)> for ProcessCatalogue {
    fn from_iter<I: IntoIterator<Item = (String, ProcessInfo)>>(iter: I) -> Self {
        Self {
            methods: iter.into_iter().collect(),
        }
    }
}
