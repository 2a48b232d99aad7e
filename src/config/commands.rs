//! Command lists from configuration
//!
//! `post-create` accepts either one command or an ordered table of named
//! commands; both become a `Vec<Command>`.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};

/// A command template with its optional name
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Name from the table form (e.g. "install"); `None` for the single-string form
    pub name: Option<String>,
    /// Template string that may contain variables like `{{ branch }}`
    pub template: String,
}

impl Command {
    pub fn new(name: Option<String>, template: String) -> Self {
        Self { name, template }
    }
}

/// Configuration for commands - canonical representation
///
/// Deserializes from two TOML formats:
/// - Single string: `post-create = "npm install"`
/// - Named table: `[post-create]` followed by `install = "npm install"`
///
/// Named commands keep TOML insertion order (`preserve_order` feature on the
/// toml crate plus `IndexMap`), so users control execution order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandConfig {
    commands: Vec<Command>,
}

impl CommandConfig {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Base commands first, then `other`'s.
    pub fn merge_append(&self, other: &Self) -> Self {
        let mut commands = self.commands.clone();
        commands.extend(other.commands.iter().cloned());
        Self { commands }
    }
}

impl<'de> Deserialize<'de> for CommandConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CommandConfigToml {
            Single(String),
            Named(IndexMap<String, String>),
        }

        let commands = match CommandConfigToml::deserialize(deserializer)? {
            CommandConfigToml::Single(cmd) => vec![Command::new(None, cmd)],
            CommandConfigToml::Named(map) => map
                .into_iter()
                .map(|(name, template)| Command::new(Some(name), template))
                .collect(),
        };
        Ok(CommandConfig { commands })
    }
}

impl Serialize for CommandConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if let [only] = self.commands.as_slice()
            && only.name.is_none()
        {
            return only.template.serialize(serializer);
        }

        let mut map = serializer.serialize_map(Some(self.commands.len()))?;
        for (i, cmd) in self.commands.iter().enumerate() {
            let key = cmd.name.clone().unwrap_or_else(|| (i + 1).to_string());
            map.serialize_entry(&key, &cmd.template)?;
        }
        map.end()
    }
}
