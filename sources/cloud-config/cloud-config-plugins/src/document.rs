//! The document module owns `ConfigDocument`, the parsed form of cloud-config user data.

use crate::error;
use crate::Result;
use serde_yaml::Value;
use snafu::ResultExt;

/// The first line of any user data meant for us starts with this.
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config";

/// Parsed cloud-config user data: directive names mapped to their values, in the order they were
/// given.  Names are unique; the YAML mapping can't hold the same key twice.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigDocument {
    directives: Vec<(String, Value)>,
}

/// One directive of a `ConfigDocument`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directive<'a> {
    pub name: &'a str,
    pub value: &'a Value,
}

impl ConfigDocument {
    /// Parse a YAML (or JSON) string into a document.
    ///
    /// Blank input and top-level values that aren't mappings give an empty document; there's
    /// nothing in them we could act on.
    pub fn from_yaml_str<S>(data: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let data = data.as_ref();
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(data).context(error::UserDataParseSnafu)?;
        Self::from_value(value)
    }

    /// Build a document from an already-parsed YAML value.
    pub fn from_value(value: Value) -> Result<Self> {
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            other => {
                warn!(
                    "Expected a mapping at the top level of user data, found {}; ignoring it",
                    value_kind(&other)
                );
                return Ok(Self::default());
            }
        };

        let mut directives = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                Value::String(name) => name,
                other => {
                    return error::NonStringKeySnafu {
                        key: format!("{:?}", other),
                    }
                    .fail()
                }
            };
            directives.push((name, value));
        }
        Ok(Self { directives })
    }

    /// Iterates over the directives in document order.
    pub fn iter(&self) -> impl Iterator<Item = Directive<'_>> {
        self.directives
            .iter()
            .map(|(name, value)| Directive { name, value })
    }

    /// Returns the value of the named directive.  Names are case-sensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.directives
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

/// Whether the given user data is cloud-config, judged by its first line.
pub fn is_cloud_config<S>(user_data: S) -> bool
where
    S: AsRef<str>,
{
    user_data
        .as_ref()
        .lines()
        .next()
        .map(|line| line.trim_end() == CLOUD_CONFIG_HEADER)
        .unwrap_or(false)
}

/// Human-readable YAML type name, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn keeps_document_order() {
        let doc = ConfigDocument::from_yaml_str(
            "#cloud-config\nwrite_files: []\nntp: {}\nruncmd: [ls]\n",
        )
        .unwrap();
        let names: Vec<&str> = doc.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["write_files", "ntp", "runcmd"]);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let doc = ConfigDocument::from_yaml_str("NTP: {}\n").unwrap();
        assert!(doc.get("NTP").is_some());
        assert!(doc.get("ntp").is_none());
    }

    #[test]
    fn blank_and_scalar_documents_are_empty() {
        for data in ["", "   \n", "#cloud-config\n", "just a string", "- a\n- b\n"] {
            let doc = ConfigDocument::from_yaml_str(data).unwrap();
            assert!(doc.is_empty(), "expected no directives from {:?}", data);
        }
    }

    #[test]
    fn json_is_accepted() {
        let doc = ConfigDocument::from_yaml_str(r#"{"ntp": {"servers": ["a"]}}"#).unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn non_string_key() {
        let err = ConfigDocument::from_yaml_str("42: answer\n").unwrap_err();
        assert!(matches!(err, Error::NonStringKey { .. }));
    }

    #[test]
    fn invalid_yaml() {
        let err = ConfigDocument::from_yaml_str("ntp: [unclosed\n").unwrap_err();
        assert!(matches!(err, Error::UserDataParse { .. }));
    }

    #[test]
    fn cloud_config_header() {
        assert!(is_cloud_config("#cloud-config\nntp: {}\n"));
        assert!(is_cloud_config("#cloud-config  \r\n"));
        assert!(!is_cloud_config("#!/bin/bash\necho hi\n"));
        assert!(!is_cloud_config("ntp: {}\n#cloud-config\n"));
        assert!(!is_cloud_config(""));
        assert!(!is_cloud_config("#cloud-configfoo\nntp: {}\n"));
        assert!(!is_cloud_config("#cloud-config-archive\n- type: text/cloud-config\n"));
        assert!(!is_cloud_config(" #cloud-config\n"));
    }
}
