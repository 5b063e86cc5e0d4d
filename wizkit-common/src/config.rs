//! Wizard Definition Parser
//!
//! Parses wizard.toml files describing declarative form wizards.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// The main configuration structure matching wizard.toml
#[derive(Debug, Clone, Deserialize)]
pub struct WizardDefinition {
    pub wizard: WizardMeta,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Wizard-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct WizardMeta {
    /// Title shown above every step
    pub title: String,

    /// Longer explanation shown before the first step (optional)
    #[serde(default)]
    pub description: Option<String>,

    /// Open every step read-only (default: false)
    #[serde(default)]
    pub read_only: bool,
}

/// One page of the wizard
#[derive(Debug, Clone, Deserialize)]
pub struct StepDefinition {
    /// Unique step identifier
    pub id: String,

    /// Label shown in the step list
    pub label: String,

    /// Help text for the step (optional)
    #[serde(default)]
    pub description: Option<String>,

    /// Show the description panel above the fields (default: true)
    #[serde(default = "default_true")]
    pub show_description: bool,

    /// Bypass the step when all its fields already have values
    #[serde(default)]
    pub skip_when_filled: bool,

    /// Allow Finish from this step regardless of the steps after it
    #[serde(default)]
    pub always_finishable: bool,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// A single input on a step
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDefinition {
    /// Settings key the field reads from and stores into
    pub key: String,

    /// Prompt text
    pub prompt: String,

    /// Must be non-empty before Next is enabled (default: false)
    #[serde(default)]
    pub required: bool,

    /// Value used when the settings have none (optional)
    #[serde(default)]
    pub default: Option<String>,

    /// Mask input (default: false)
    #[serde(default)]
    pub secret: bool,

    /// Fixed list of allowed values (optional)
    #[serde(default)]
    pub choices: Vec<String>,

    /// Entity kind whose names are offered as choices, reloaded on activation
    #[serde(default)]
    pub choices_from: Option<String>,

    /// Entity kind the value must not already exist in
    #[serde(default)]
    pub unique_in: Option<String>,
}

fn default_true() -> bool {
    true
}

impl WizardDefinition {
    /// Load a definition from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read wizard definition: {}", path.display()))?;

        Self::from_str(&contents)
            .with_context(|| format!("Invalid wizard definition: {}", path.display()))
    }

    /// Parse a definition from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Failed to parse wizard definition")
    }

    /// Every field across all steps, in chain order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }

    /// Validate the definition
    pub fn validate(&self) -> Result<()> {
        if self.wizard.title.trim().is_empty() {
            anyhow::bail!("[wizard] title must not be empty");
        }

        if self.steps.is_empty() {
            anyhow::bail!(
                "Wizard '{}' has no steps.\n\
                 Add at least one [[steps]] table with one or more [[steps.fields]].",
                self.wizard.title
            );
        }

        let mut step_ids = HashSet::new();
        let mut field_keys = HashSet::new();

        for step in &self.steps {
            if step.id.trim().is_empty() {
                anyhow::bail!("Step '{}' has an empty id", step.label);
            }
            if !step_ids.insert(step.id.as_str()) {
                anyhow::bail!("Duplicate step id: '{}'", step.id);
            }
            if step.fields.is_empty() {
                anyhow::bail!("Step '{}' has no fields", step.id);
            }

            for field in &step.fields {
                if field.key.trim().is_empty() {
                    anyhow::bail!("Step '{}' has a field with an empty key", step.id);
                }
                if !field_keys.insert(field.key.as_str()) {
                    anyhow::bail!(
                        "Duplicate field key '{}' (in step '{}').\n\
                         Field keys are settings keys and must be unique across the wizard.",
                        field.key,
                        step.id
                    );
                }
                if let Some(ref default) = field.default {
                    if !field.choices.is_empty() && !field.choices.contains(default) {
                        anyhow::bail!(
                            "Default '{}' for field '{}' is not one of its choices: {}",
                            default,
                            field.key,
                            field.choices.join(", ")
                        );
                    }
                }
                if !field.choices.is_empty() && field.choices_from.is_some() {
                    anyhow::bail!(
                        "Field '{}' sets both choices and choices_from; pick one",
                        field.key
                    );
                }
            }
        }

        Ok(())
    }
}

/// Generate a template wizard.toml file
pub fn generate_template(title: &str) -> String {
    format!(
        r#"# wizkit Wizard Definition

[wizard]
title = "{title}"
description = "Configure a new JMS connection"

[[steps]]
id = "connection"
label = "Connection"
description = "Name the connection and pick its provider"

[[steps.fields]]
key = "name"
prompt = "Connection name"
required = true
# Checked against existing entities when leaving the step
unique_in = "jms-connection"

[[steps.fields]]
key = "provider"
prompt = "Provider"
choices = ["generic", "weblogic", "mqseries"]
default = "generic"

[[steps]]
id = "destination"
label = "Destination"
# Bypassed when a previous run already filled these values
skip_when_filled = true

[[steps.fields]]
key = "queue"
prompt = "Queue name"
required = true

[[steps.fields]]
key = "password"
prompt = "Password"
secret = true

[[steps]]
id = "review"
label = "Review"
description = "Nothing to fill in here; Finish when ready"
always_finishable = true

[[steps.fields]]
key = "notes"
prompt = "Notes (optional)"
"#,
        title = title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_definition() {
        let toml = r#"
            [wizard]
            title = "Minimal"

            [[steps]]
            id = "only"
            label = "Only"

            [[steps.fields]]
            key = "name"
            prompt = "Name"
        "#;

        let def = WizardDefinition::from_str(toml).unwrap();
        assert_eq!(def.wizard.title, "Minimal");
        assert_eq!(def.steps.len(), 1);
        assert!(def.steps[0].show_description); // default
        assert!(!def.steps[0].fields[0].required); // default
        def.validate().unwrap();
    }

    #[test]
    fn test_template_parses_and_validates() {
        let def = WizardDefinition::from_str(&generate_template("JMS Connection")).unwrap();
        def.validate().unwrap();

        assert_eq!(def.steps.len(), 3);
        assert!(def.steps[1].skip_when_filled);
        assert!(def.steps[2].always_finishable);
        assert_eq!(
            def.fields().map(|f| f.key.as_str()).collect::<Vec<_>>(),
            vec!["name", "provider", "queue", "password", "notes"]
        );
        assert_eq!(def.steps[0].fields[0].unique_in.as_deref(), Some("jms-connection"));
    }

    #[test]
    fn test_rejects_duplicate_field_keys() {
        let toml = r#"
            [wizard]
            title = "Dup"

            [[steps]]
            id = "a"
            label = "A"
            [[steps.fields]]
            key = "name"
            prompt = "Name"

            [[steps]]
            id = "b"
            label = "B"
            [[steps.fields]]
            key = "name"
            prompt = "Name again"
        "#;

        let err = WizardDefinition::from_str(toml).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate field key 'name'"));
    }

    #[test]
    fn test_rejects_default_outside_choices() {
        let toml = r#"
            [wizard]
            title = "Choices"

            [[steps]]
            id = "a"
            label = "A"
            [[steps.fields]]
            key = "mode"
            prompt = "Mode"
            choices = ["x", "y"]
            default = "z"
        "#;

        let err = WizardDefinition::from_str(toml).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("not one of its choices"));
    }

    #[test]
    fn test_rejects_empty_wizard() {
        let def = WizardDefinition::from_str("[wizard]\ntitle = \"Empty\"\n").unwrap();
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wizard.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = WizardDefinition::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("wizard.toml"));
    }
}
