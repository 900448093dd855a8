use std::{collections::BTreeMap, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DictionaryError;

/// Subsystem group for descriptors that do not name one.
pub const UNGROUPED_SUBSYSTEM: &str = "other";

/// Byte offset of an argument inside the encoded command.
///
/// Multi-byte fields are transmitted as the list of bytes they occupy; only the
/// starting byte matters for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ByteSpan {
    Single(u32),
    Range(Vec<u32>),
}

impl ByteSpan {
    pub fn start(&self) -> u32 {
        match self {
            Self::Single(offset) => *offset,
            Self::Range(offsets) => offsets.first().copied().unwrap_or(0),
        }
    }
}

impl Default for ByteSpan {
    fn default() -> Self {
        Self::Single(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub bytes: ByteSpan,
    #[serde(default)]
    pub fixed: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// How an argument is presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind<'a> {
    Fixed,
    Enumerated(&'a IndexMap<String, String>),
    FreeText,
}

impl ArgumentDefinition {
    pub fn kind(&self) -> ArgumentKind<'_> {
        if self.fixed {
            return ArgumentKind::Fixed;
        }
        match &self.enumeration {
            Some(options) => ArgumentKind::Enumerated(options),
            None => ArgumentKind::FreeText,
        }
    }

    /// `level_pct` becomes `Level Pct`.
    pub fn display_name(&self) -> String {
        display_name(&self.name)
    }

    pub fn unit_label(&self) -> Option<&str> {
        match self.units.as_deref().map(str::trim) {
            None | Some("") | Some("none") => None,
            Some(units) => Some(units),
        }
    }
}

pub fn display_name(raw: &str) -> String {
    raw.split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: IndexMap<String, ArgumentDefinition>,
}

impl CommandDescriptor {
    /// Arguments the operator fills in, in the order they appear in the encoded command.
    pub fn form_arguments(&self) -> Vec<&ArgumentDefinition> {
        let mut arguments: Vec<&ArgumentDefinition> = self
            .arguments
            .values()
            .filter(|argument| !argument.fixed)
            .collect();
        arguments.sort_by_key(|argument| argument.bytes.start());
        arguments
    }

    pub fn subsystem_key(&self) -> &str {
        match self.subsystem.as_deref() {
            Some(subsystem) if !subsystem.trim().is_empty() => subsystem,
            _ => UNGROUPED_SUBSYSTEM,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArgumentsWire {
    Map(IndexMap<String, ArgumentDefinition>),
    List(Vec<ArgumentDefinition>),
}

fn deserialize_arguments<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, ArgumentDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    let arguments = match Option::<ArgumentsWire>::deserialize(deserializer)? {
        None => IndexMap::new(),
        Some(ArgumentsWire::Map(map)) => map
            .into_iter()
            .map(|(key, mut argument)| {
                if argument.name.is_empty() {
                    argument.name = key.clone();
                }
                (key, argument)
            })
            .collect(),
        Some(ArgumentsWire::List(list)) => list
            .into_iter()
            .map(|argument| (argument.name.clone(), argument))
            .collect(),
    };
    Ok(arguments)
}

/// The command dictionary as served by the backend, grouped for browsing.
#[derive(Debug, Clone, Default)]
pub struct CommandDictionary {
    by_name: IndexMap<String, Arc<CommandDescriptor>>,
    by_subsystem: BTreeMap<String, Vec<Arc<CommandDescriptor>>>,
}

impl CommandDictionary {
    pub fn from_json(raw: &str) -> Result<Self, DictionaryError> {
        let entries: IndexMap<String, CommandDescriptor> = serde_json::from_str(raw)?;
        let mut descriptors = Vec::with_capacity(entries.len());
        for (key, descriptor) in entries {
            if descriptor.name != key {
                return Err(DictionaryError::NameMismatch {
                    key,
                    name: descriptor.name,
                });
            }
            descriptors.push(descriptor);
        }
        Ok(Self::from_descriptors(descriptors))
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        let mut dictionary = Self::default();
        for descriptor in descriptors {
            let descriptor = Arc::new(descriptor);
            dictionary
                .by_subsystem
                .entry(descriptor.subsystem_key().to_string())
                .or_default()
                .push(Arc::clone(&descriptor));
            dictionary
                .by_name
                .insert(descriptor.name.clone(), descriptor);
        }
        dictionary
    }

    pub fn by_subsystem(&self) -> &BTreeMap<String, Vec<Arc<CommandDescriptor>>> {
        &self.by_subsystem
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT_JSON: &str = r#"{
        "SET_POWER": {
            "name": "SET_POWER",
            "desc": "Switch the instrument power rail",
            "subsystem": "EPS",
            "arguments": {
                "level": {"name": "level", "bytes": [1, 2], "units": "none"},
                "mode": {"name": "mode", "bytes": 0, "enum": {"0": "OFF", "1": "ON"}},
                "opcode": {"name": "opcode", "bytes": 3, "fixed": true}
            }
        },
        "NOOP": {"name": "NOOP", "desc": "Does nothing"},
        "HTR_SET_TEMP": {
            "name": "HTR_SET_TEMP",
            "subsystem": "THERMAL",
            "arguments": [
                {"name": "heater_id", "bytes": 0, "enum": {"1": "A", "2": "B"}},
                {"name": "target_temp", "bytes": [1, 2], "units": "degC"}
            ]
        }
    }"#;

    #[test]
    fn groups_commands_by_subsystem() {
        let dict = CommandDictionary::from_json(DICT_JSON).expect("parse dictionary");
        assert_eq!(dict.len(), 3);
        let groups: Vec<&str> = dict.by_subsystem().keys().map(String::as_str).collect();
        assert_eq!(groups, vec!["EPS", "THERMAL", UNGROUPED_SUBSYSTEM]);
        assert!(Arc::ptr_eq(
            dict.get("NOOP").expect("noop"),
            &dict.by_subsystem()[UNGROUPED_SUBSYSTEM][0]
        ));
    }

    #[test]
    fn form_arguments_skip_fixed_and_sort_by_start_byte() {
        let dict = CommandDictionary::from_json(DICT_JSON).expect("parse dictionary");
        let names: Vec<&str> = dict
            .get("SET_POWER")
            .expect("set power")
            .form_arguments()
            .into_iter()
            .map(|argument| argument.name.as_str())
            .collect();
        assert_eq!(names, vec!["mode", "level"]);
    }

    #[test]
    fn argument_list_form_is_keyed_by_name() {
        let dict = CommandDictionary::from_json(DICT_JSON).expect("parse dictionary");
        let heater = dict.get("HTR_SET_TEMP").expect("heater");
        assert!(heater.arguments.contains_key("target_temp"));
        assert_eq!(
            heater.arguments["target_temp"].unit_label(),
            Some("degC")
        );
    }

    #[test]
    fn classifies_argument_kinds() {
        let dict = CommandDictionary::from_json(DICT_JSON).expect("parse dictionary");
        let set_power = dict.get("SET_POWER").expect("set power");
        assert_eq!(set_power.arguments["opcode"].kind(), ArgumentKind::Fixed);
        assert_eq!(set_power.arguments["level"].kind(), ArgumentKind::FreeText);
        assert!(matches!(
            set_power.arguments["mode"].kind(),
            ArgumentKind::Enumerated(options) if options.len() == 2
        ));
        assert_eq!(set_power.arguments["level"].unit_label(), None);
    }

    #[test]
    fn rejects_key_name_mismatch() {
        let err = CommandDictionary::from_json(r#"{"A": {"name": "B"}}"#)
            .expect_err("mismatch must fail");
        assert!(matches!(err, DictionaryError::NameMismatch { .. }));
    }

    #[test]
    fn display_name_capitalises_each_segment() {
        assert_eq!(display_name("target_temp"), "Target Temp");
        assert_eq!(display_name("mode"), "Mode");
        assert_eq!(display_name("rw_a"), "Rw A");
    }

    #[test]
    fn empty_byte_range_sorts_first() {
        assert_eq!(ByteSpan::Range(Vec::new()).start(), 0);
        assert_eq!(ByteSpan::Range(vec![4, 5]).start(), 4);
    }
}
