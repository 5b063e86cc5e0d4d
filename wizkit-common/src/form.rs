//! Form Steps - Declarative wizard pages built from a WizardDefinition
//!
//! Each `FormStep` edits a flat, string-keyed `FormSettings` record. The
//! step's view is its map of current field values; the host writes into it
//! through `set_value`, which keeps change listeners informed.

use crate::config::{FieldDefinition, StepDefinition, WizardDefinition};
use crate::error::FieldError;
use crate::session::AdminSession;
use crate::step::{suffix_finishable, MessageKind, StepCore, StepRef, WizardStep};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Settings object shared by every step of a form wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSettings {
    values: BTreeMap<String, String>,
}

impl FormSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load initial settings from a JSON object of strings
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Settings must be a JSON object of strings: {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Present and not blank
    pub fn is_filled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.trim().is_empty())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A wizard page whose fields come from a `StepDefinition`
pub struct FormStep {
    core: StepCore<FormSettings>,
    definition: StepDefinition,
    values: BTreeMap<String, String>,
    /// Values of unique fields as loaded, when editing an existing entity
    originals: BTreeMap<String, String>,
    new_entity: bool,
    /// Option lists fetched for `choices_from` fields
    loaded_choices: BTreeMap<String, Vec<String>>,
    session: Option<Rc<dyn AdminSession>>,
}

impl FormStep {
    pub fn new(
        definition: StepDefinition,
        next: Option<StepRef<FormSettings>>,
        session: Option<Rc<dyn AdminSession>>,
    ) -> Self {
        let core = StepCore::new(next).with_description_panel(definition.show_description);
        let values = definition
            .fields
            .iter()
            .map(|field| (field.key.clone(), field.default.clone().unwrap_or_default()))
            .collect();

        Self {
            core,
            definition,
            values,
            originals: BTreeMap::new(),
            new_entity: true,
            loaded_choices: BTreeMap::new(),
            session,
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.core = self.core.with_read_only(read_only);
        self
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.definition.fields
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Allowed values for a field; empty means free text
    pub fn choices(&self, key: &str) -> &[String] {
        match self.field(key) {
            Some(field) if !field.choices.is_empty() => &field.choices,
            Some(_) => self
                .loaded_choices
                .get(key)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            None => &[],
        }
    }

    /// Prompts of required fields that are still blank
    pub fn missing_required(&self) -> Vec<&str> {
        self.definition
            .fields
            .iter()
            .filter(|field| field.required && !self.is_filled(&field.key))
            .map(|field| field.prompt.as_str())
            .collect()
    }

    /// Edit one field of the view
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<(), FieldError> {
        if self.is_read_only() {
            return Err(FieldError::ReadOnly {
                step: self.definition.id.clone(),
            });
        }
        if self.field(key).is_none() {
            return Err(FieldError::UnknownField {
                step: self.definition.id.clone(),
                key: key.to_string(),
            });
        }

        let value = value.into();
        let choices = self.choices(key);
        if !value.is_empty() && !choices.is_empty() && !choices.contains(&value) {
            return Err(FieldError::NotAChoice {
                key: key.to_string(),
                value,
                choices: choices.to_vec(),
            });
        }

        let could_advance = self.can_advance();
        self.values.insert(key.to_string(), value);

        if could_advance != self.can_advance() {
            self.notify_listeners();
        }
        Ok(())
    }

    fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.definition.fields.iter().find(|field| field.key == key)
    }

    fn is_filled(&self, key: &str) -> bool {
        self.value(key).is_some_and(|value| !value.trim().is_empty())
    }

    /// Whether a unique field still holds the value it was loaded with
    fn unchanged_existing(&self, key: &str) -> bool {
        !self.new_entity && self.originals.get(key).map(String::as_str) == self.value(key)
    }
}

impl WizardStep<FormSettings> for FormStep {
    fn core(&self) -> &StepCore<FormSettings> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StepCore<FormSettings> {
        &mut self.core
    }

    fn step_label(&self) -> String {
        self.definition.label.clone()
    }

    fn description(&self) -> String {
        self.definition.description.clone().unwrap_or_default()
    }

    fn can_advance(&self) -> bool {
        self.definition.fields.iter().all(|field| {
            if field.required && !self.is_filled(&field.key) {
                return false;
            }
            let value = self.value(&field.key).unwrap_or_default();
            let choices = self.choices(&field.key);
            value.is_empty() || choices.is_empty() || choices.iter().any(|c| c == value)
        })
    }

    fn can_finish(&self) -> bool {
        if self.definition.always_finishable {
            return true;
        }
        suffix_finishable::<FormSettings, Self>(self)
    }

    fn can_skip(&self, settings: &FormSettings) -> bool {
        self.definition.skip_when_filled
            && self
                .definition
                .fields
                .iter()
                .all(|field| settings.is_filled(&field.key))
    }

    fn on_next_button(&mut self) -> bool {
        let Some(session) = self.session.clone() else {
            return true;
        };

        let checks: Vec<(String, String, String)> = self
            .definition
            .fields
            .iter()
            .filter_map(|field| {
                let kind = field.unique_in.as_ref()?;
                let value = self.value(&field.key)?.trim();
                if value.is_empty() || self.unchanged_existing(&field.key) {
                    return None;
                }
                Some((kind.clone(), value.to_string(), field.prompt.clone()))
            })
            .collect();

        for (kind, value, prompt) in checks {
            match session.entity_exists(&kind, &value) {
                Ok(false) => {}
                Ok(true) => {
                    tracing::info!(step = %self.definition.id, %kind, %value, "duplicate name, staying on step");
                    return self.veto(format!("A {kind} named '{value}' already exists."));
                }
                Err(e) => {
                    tracing::warn!(step = %self.definition.id, "uniqueness check failed: {e:#}");
                    return self.veto(format!("Could not check {prompt}: {e:#}"));
                }
            }
        }

        true
    }

    fn read_settings(&mut self, settings: &FormSettings) {
        self.read_settings_with(settings, false);
    }

    fn read_settings_with(&mut self, settings: &FormSettings, accept_new_provider: bool) {
        self.new_entity = accept_new_provider;
        self.originals.clear();

        for field in &self.definition.fields {
            let value = settings
                .get(&field.key)
                .map(str::to_string)
                .or_else(|| field.default.clone())
                .unwrap_or_default();

            if !accept_new_provider && field.unique_in.is_some() {
                if let Some(original) = settings.get(&field.key) {
                    self.originals.insert(field.key.clone(), original.to_string());
                }
            }
            self.values.insert(field.key.clone(), value);
        }
    }

    fn store_settings(&self, settings: &mut FormSettings) {
        for field in &self.definition.fields {
            let value = self.value(&field.key).unwrap_or_default();
            if value.is_empty() && !settings.contains(&field.key) {
                continue;
            }
            settings.set(field.key.clone(), value);
        }
    }

    fn notify_active(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };

        let sources: Vec<(String, String)> = self
            .definition
            .fields
            .iter()
            .filter_map(|field| Some((field.key.clone(), field.choices_from.clone()?)))
            .collect();
        if sources.is_empty() {
            return;
        }

        for (key, kind) in sources {
            match session.list_entities(&kind) {
                Ok(names) => {
                    tracing::debug!(%key, %kind, count = names.len(), "reloaded choices");
                    self.loaded_choices.insert(key, names);
                }
                Err(e) => {
                    tracing::warn!(%key, %kind, "could not load choices: {e:#}");
                    self.report(MessageKind::Error, format!("Could not load {kind} list: {e:#}"));
                }
            }
        }

        self.notify_listeners();
    }
}

/// A form wizard's step chain plus typed handles to each step
pub struct FormChain {
    pub head: StepRef<FormSettings>,
    pub steps: Vec<Rc<RefCell<FormStep>>>,
}

impl FormChain {
    /// The typed form step behind a chain handle
    pub fn find(&self, step: &StepRef<FormSettings>) -> Option<Rc<RefCell<FormStep>>> {
        let target = Rc::as_ptr(step) as *const ();
        self.steps
            .iter()
            .find(|candidate| Rc::as_ptr(candidate) as *const () == target)
            .cloned()
    }
}

/// Build the chain tail-first from a validated definition
pub fn build_form_chain(
    definition: &WizardDefinition,
    session: Option<Rc<dyn AdminSession>>,
) -> Result<FormChain> {
    definition.validate()?;

    let mut steps = Vec::with_capacity(definition.steps.len());
    let mut next: Option<StepRef<FormSettings>> = None;

    for step_def in definition.steps.iter().rev() {
        let step = FormStep::new(step_def.clone(), next.take(), session.clone())
            .with_read_only(definition.wizard.read_only);
        let step = Rc::new(RefCell::new(step));
        let handle: StepRef<FormSettings> = step.clone();
        next = Some(handle);
        steps.push(step);
    }
    steps.reverse();

    let head = next.context("wizard definition has no steps")?;
    Ok(FormChain { head, steps })
}
