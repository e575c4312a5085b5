// URL composition strategies for the metering server's resource families
//
// The server exposes different URL shapes per family and operation, so each
// resource client is bound to one of these pure composers.

use std::fmt;

use serde_json::Value;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::error::Error;

/// Operation a URL is composed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Set,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Set => "set",
            Self::Delete => "delete",
        })
    }
}

/// Resource key: a numeric id or a symbolic name (`list`, a node id, a type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    Id(i64),
    Name(String),
}

impl ResourceKey {
    /// Non-zero numeric value, the only keys `get`/`set`/`delete` accept.
    /// Names that spell a number count as numeric.
    pub fn numeric(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(name) => name.trim().parse().ok(),
        }
        .filter(|id| *id != 0)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ResourceKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// A URL-composition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlComposer {
    /// Feeds, processes, nodes: `{base}{key}.json` family.
    #[default]
    Default,
    /// Device templates: read-only, addressed by type name.
    Profile,
    /// Inputs: arguments travel under a `fields` parameter.
    Input,
}

impl UrlComposer {
    fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Profile => "profile",
            Self::Input => "input",
        }
    }

    /// Compose the concrete URL for `op` on `key` under `base`.
    pub fn compose(
        self,
        base: &Url,
        key: &ResourceKey,
        op: Operation,
        args: Option<&Value>,
    ) -> Result<Url, Error> {
        let base = base.as_str();
        let id = key.numeric();
        let raw = match self {
            Self::Default => match (op, id) {
                (Operation::Get, Some(id)) => format!("{base}get.json?id={id}"),
                (Operation::Create, _) => format!("{base}create.json?{}", serialize(args)),
                (Operation::Set, Some(id)) => format!("{base}set.json?id={id}&fields={}", fields(args)),
                (Operation::Delete, Some(id)) => format!("{base}delete.json?id={id}"),
                _ => format!("{base}{key}.json"),
            },
            Self::Profile => {
                if op != Operation::Get {
                    return Err(Error::UnsupportedOperation {
                        composer: self.name(),
                        operation: op.to_string(),
                    });
                }
                match key {
                    ResourceKey::Name(n) if n == "list" || n == "listshort" => format!("{base}{n}.json"),
                    _ => format!("{base}get.json?type={}", encode(&key.to_string())),
                }
            }
            Self::Input => match (op, id) {
                (Operation::Get, Some(id)) => format!("{base}get.json?id={id}"),
                (Operation::Create, _) => format!("{base}set.json?fields={}", fields(args)),
                (Operation::Set, Some(id)) => {
                    format!("{base}set.json?inputid={id}&fields={}", fields(args))
                }
                (Operation::Delete, Some(id)) => format!("{base}delete?inputid={id}"),
                _ => format!("{base}get/{key}"),
            },
        };
        Ok(Url::parse(&raw)?)
    }
}

/// `k=v&k=v` with every value URI-encoded. Strings go as-is, everything
/// else as its JSON text.
pub fn serialize(args: Option<&Value>) -> String {
    let Some(Value::Object(map)) = args else {
        return String::new();
    };
    map.iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{k}={}", encode(&text))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn fields(args: Option<&Value>) -> String {
    encode(&args.map_or_else(|| "{}".to_owned(), Value::to_string))
}

pub(crate) fn encode(text: &str) -> String {
    byte_serialize(text.as_bytes()).collect()
}
