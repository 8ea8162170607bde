use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::{ProviderError, Result};

pub static ORGANIZATION_ID: &str = "organization_id";
pub static PROJECT_ID: &str = "project_id";
pub static CLUSTER_ID: &str = "cluster_id";
pub static ID: &str = "id";

const PAIR_DELIMITER: char = ',';
const KEY_VALUE_DELIMITER: char = '=';

/// Ordered set of identifier fields for one remote resource.
///
/// Keys keep the order they were inserted in, which is also the order
/// they are encoded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIds {
    pairs: Vec<(String, String)>,
}

impl ResourceIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key, replacing the value in place if the key already exists.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a key that must be present and non-empty.
    pub fn value(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ProviderError::missing_id(key)),
        }
    }

    /// Verify that every key is present with a non-empty value.
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        keys.iter().try_for_each(|key| self.value(key).map(|_| ()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for ResourceIds {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let joined = self.pairs
            .iter()
            .map(|(k, v)| format!("{k}{KEY_VALUE_DELIMITER}{v}"))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}

/// Encode identifiers as `key1=value1,key2=value2` in caller order.
///
/// # Arguments
/// * `ids` - The identifiers to encode
///
/// # Returns
/// The import string, or `MissingId` naming the first empty value
pub fn encode(ids: &ResourceIds) -> Result<String> {
    if let Some((key, _)) = ids.pairs.iter().find(|(_, v)| v.is_empty()) {
        return Err(ProviderError::missing_id(key));
    }
    Ok(ids.to_string())
}

/// Decode an import string produced by [`encode`].
///
/// Segments are split on `,` and then on the first `=`, so values may
/// themselves contain `=`.
///
/// # Arguments
/// * `identifier` - The import string
///
/// # Returns
/// The decoded identifiers, or `MalformedIdentifier` if a segment has no
/// `=` or a key repeats
pub fn decode(identifier: &str) -> Result<ResourceIds> {
    let malformed = |reason| ProviderError::MalformedIdentifier {
        identifier: identifier.to_string(),
        reason,
    };

    let mut ids = ResourceIds::new();
    for segment in identifier.split(PAIR_DELIMITER) {
        let (key, value) = segment
            .split_once(KEY_VALUE_DELIMITER)
            .ok_or_else(|| malformed("segment is missing `=`"))?;

        if ids.get(key).is_some() {
            return Err(malformed("duplicate key"));
        }
        ids.pairs.push((key.to_string(), value.to_string()));
    }
    Ok(ids)
}

/// Recover the identifiers of a resource from its stored fields.
///
/// A resource that was just imported only carries the raw import string,
/// stored in the `import_key` field, and has no `organization_id` yet. In
/// that case the import string is decoded and must name exactly the
/// expected keys. Otherwise the fields are used as they are.
///
/// # Arguments
/// * `fields` - The expected keys with their current values, in import order
/// * `import_key` - The field the import string is written to
///
/// # Returns
/// The identifiers, every value guaranteed non-empty
pub fn resolve(fields: &[(&str, Option<&str>)], import_key: &str) -> Result<ResourceIds> {
    let organization_id = fields
        .iter()
        .find(|(key, _)| *key == ORGANIZATION_ID)
        .and_then(|(_, value)| *value);

    let ids = match organization_id {
        Some(_) => fields
            .iter()
            .fold(ResourceIds::new(), |ids, (key, value)| ids.with(key, value.unwrap_or_default())),
        None => {
            let import_string = fields
                .iter()
                .find(|(key, _)| *key == import_key)
                .and_then(|(_, value)| *value)
                .ok_or_else(|| ProviderError::missing_id(import_key))?;

            let decoded = decode(import_string)?;
            if decoded.len() != fields.len() {
                return Err(ProviderError::MissingId(format!(
                    "expected {} keys in import string, found {}",
                    fields.len(),
                    decoded.len(),
                )));
            }
            // Re-key in the expected order so callers see a stable layout.
            fields.iter().try_fold(ResourceIds::new(), |ids, (key, _)| {
                decoded
                    .get(key)
                    .map(|value| ids.with(key, value))
                    .ok_or_else(|| ProviderError::missing_id(key))
            })?
        }
    };

    let keys: Vec<&str> = fields.iter().map(|(key, _)| *key).collect();
    ids.require(&keys)?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_caller_order() {
        let ids = ResourceIds::new()
            .with("id", "user123")
            .with("organization_id", "org123");

        assert_eq!(encode(&ids).unwrap(), "id=user123,organization_id=org123");
    }

    #[test]
    fn encode_rejects_empty_value() {
        let ids = ResourceIds::new().with("id", "").with("organization_id", "org123");

        assert!(matches!(encode(&ids), Err(ProviderError::MissingId(key)) if key == "id"));
    }

    #[test]
    fn decode_splits_on_first_equals() {
        let ids = decode("id=a=b,organization_id=org").unwrap();

        assert_eq!(ids.get("id"), Some("a=b"));
        assert_eq!(ids.keys().collect::<Vec<_>>(), vec!["id", "organization_id"]);
    }

    #[test]
    fn decode_rejects_segment_without_equals() {
        assert!(matches!(
            decode("id=user123,org123"),
            Err(ProviderError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn decode_rejects_duplicate_key() {
        assert!(matches!(
            decode("id=a,id=b"),
            Err(ProviderError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn decode_inverts_encode() {
        let ids = ResourceIds::new()
            .with("app_service_id", "as1")
            .with("cluster_id", "c1")
            .with("project_id", "p1")
            .with("organization_id", "o1");

        assert_eq!(decode(&encode(&ids).unwrap()).unwrap(), ids);
    }

    #[test]
    fn resolve_uses_fields_when_organization_is_known() {
        let ids = resolve(
            &[("id", Some("user123")), ("organization_id", Some("org123"))],
            "id",
        )
        .unwrap();

        assert_eq!(ids.value("id").unwrap(), "user123");
    }

    #[test]
    fn resolve_decodes_import_string() {
        let ids = resolve(
            &[
                ("id", Some("organization_id=org123,id=user123")),
                ("organization_id", None),
            ],
            "id",
        )
        .unwrap();

        assert_eq!(ids.value("id").unwrap(), "user123");
        assert_eq!(ids.value("organization_id").unwrap(), "org123");
        assert_eq!(ids.keys().collect::<Vec<_>>(), vec!["id", "organization_id"]);
    }

    #[test]
    fn resolve_rejects_missing_and_extra_keys() {
        let missing = resolve(&[("id", Some("id=user123")), ("organization_id", None)], "id");
        assert!(matches!(missing, Err(ProviderError::MissingId(_))));

        let extra = resolve(
            &[
                ("id", Some("id=u,organization_id=o,project_id=p")),
                ("organization_id", None),
            ],
            "id",
        );
        assert!(matches!(extra, Err(ProviderError::MissingId(_))));

        let renamed = resolve(
            &[("id", Some("id=u,org_id=o")), ("organization_id", None)],
            "id",
        );
        assert!(matches!(renamed, Err(ProviderError::MissingId(key)) if key == "organization_id"));
    }

    #[test]
    fn resolve_rejects_empty_field() {
        let result = resolve(&[("id", Some("")), ("organization_id", Some("org"))], "id");

        assert!(matches!(result, Err(ProviderError::MissingId(key)) if key == "id"));
    }
}
