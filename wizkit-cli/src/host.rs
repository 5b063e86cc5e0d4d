//! Terminal host for a form wizard
//!
//! Prints the step list, prompts the active step's fields and offers the
//! navigation actions the wizard currently enables.

use crate::Console;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password, Select};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use wizkit_common::config::FieldDefinition;
use wizkit_common::form::{FormChain, FormSettings, FormStep};
use wizkit_common::{MessageKind, StepMessage, WizardStep};
use wizkit_runtime::wizard::StepSummary;
use wizkit_runtime::{Action, ButtonState, Transition, Wizard, WizardState};

/// One entry of the action menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Edit,
    Navigate(Action),
}

impl MenuItem {
    fn label(&self) -> &'static str {
        match self {
            MenuItem::Edit => "Edit fields",
            MenuItem::Navigate(action) => action.label(),
        }
    }
}

/// Menu for the current button state; Edit is offered on writable steps
pub fn menu(buttons: ButtonState, writable: bool) -> Vec<MenuItem> {
    let mut items: Vec<MenuItem> = buttons.enabled().into_iter().map(MenuItem::Navigate).collect();
    if writable {
        // keep Cancel last
        let at = items.len().saturating_sub(usize::from(buttons.cancel));
        items.insert(at, MenuItem::Edit);
    }
    items
}

/// Step list lines, e.g. `> 2. Destination`
pub fn render_overview(steps: &[StepSummary]) -> Vec<String> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let marker = if step.active {
                ">"
            } else if step.skipped {
                "-"
            } else if step.visited {
                "*"
            } else {
                " "
            };
            let note = if step.skipped { " (skipped)" } else { "" };
            format!("{marker} {}. {}{note}", i + 1, step.label)
        })
        .collect()
}

/// Settings as `key = value` lines with secret fields masked
pub fn masked_summary<'a>(
    settings: &FormSettings,
    fields: impl IntoIterator<Item = &'a FieldDefinition>,
) -> Vec<String> {
    let secrets: Vec<&str> = fields
        .into_iter()
        .filter(|field| field.secret)
        .map(|field| field.key.as_str())
        .collect();

    settings
        .iter()
        .map(|(key, value)| {
            if secrets.contains(&key) {
                format!("{key} = ********")
            } else {
                format!("{key} = {value}")
            }
        })
        .collect()
}

/// Write settings as TOML for `.toml` paths, JSON otherwise
pub fn write_settings(path: &Path, settings: &FormSettings) -> Result<()> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let contents = if is_toml {
        toml::to_string_pretty(settings).context("Failed to serialize settings as TOML")?
    } else {
        serde_json::to_string_pretty(settings).context("Failed to serialize settings as JSON")?
    };

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write settings: {}", path.display()))
}

fn show_message(console: &Console, message: &StepMessage) {
    match message.kind {
        MessageKind::Info => console.log(format!("   ℹ️  {message}")),
        MessageKind::Error => console.warn(message),
    }
}

/// Drive `wizard` until it is finished or cancelled
pub fn drive(wizard: &mut Wizard<FormSettings>, form: &FormChain, console: &Console) -> Result<WizardState> {
    let mut needs_edit = true;

    loop {
        let step = wizard.current_step().context("wizard has no active step")?;
        let typed = form.find(&step).context("active step is not part of the form")?;

        if needs_edit {
            print_step(wizard, &typed, console);
        }
        if let Some(message) = wizard.take_step_message() {
            show_message(console, &message);
        }

        let writable = !typed.borrow().is_read_only();
        if needs_edit && writable {
            prompt_fields(&typed, console)?;
        }
        needs_edit = false;

        let missing: Vec<String> = typed
            .borrow()
            .missing_required()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            console.warn(format!("Still required: {}", missing.join(", ")));
        }

        let items = menu(wizard.buttons(), writable);
        let labels: Vec<&str> = items.iter().map(MenuItem::label).collect();
        let choice = Select::new()
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        match items[choice] {
            MenuItem::Edit => prompt_fields(&typed, console)?,
            MenuItem::Navigate(Action::Next) => match wizard.next() {
                Ok(Transition::Moved { skipped, .. }) => {
                    for label in skipped {
                        console.verbose(format!("Skipped {label}: already filled in"));
                    }
                    needs_edit = true;
                }
                Ok(Transition::Vetoed(message)) => match message {
                    Some(message) => show_message(console, &message),
                    None => console.warn("This step cannot be left yet"),
                },
                Err(e) => console.warn(e),
            },
            MenuItem::Navigate(Action::Back) => match wizard.back() {
                Ok(_) => needs_edit = true,
                Err(e) => console.warn(e),
            },
            MenuItem::Navigate(Action::Test) => match wizard.test() {
                Ok(outcome) => {
                    if let Some(message) = &outcome.message {
                        show_message(console, message);
                    }
                    if outcome.passed {
                        console.success("Test passed");
                    } else {
                        console.warn("Test failed");
                    }
                }
                Err(e) => console.warn(e),
            },
            MenuItem::Navigate(Action::Finish) => match wizard.finish() {
                Ok(()) => return Ok(WizardState::Finished),
                Err(e) => console.warn(e),
            },
            MenuItem::Navigate(Action::Cancel) => {
                let confirm = Confirm::new()
                    .with_prompt("Discard this wizard?")
                    .default(false)
                    .interact()?;
                if confirm {
                    wizard.cancel()?;
                    return Ok(WizardState::Cancelled);
                }
            }
        }
    }
}

fn print_step(wizard: &Wizard<FormSettings>, step: &Rc<RefCell<FormStep>>, console: &Console) {
    console.log("");
    for line in render_overview(&wizard.overview()) {
        console.log(line);
    }

    let step = step.borrow();
    let position = wizard
        .position()
        .map(|(index, total)| format!(" ({} of {total})", index + 1))
        .unwrap_or_default();
    console.log(format!("\n📋 {}{position}", step.step_label()));

    let description = step.description();
    if step.is_show_description_panel() && !description.is_empty() {
        console.log(format!("   {description}"));
    }
    if step.is_read_only() {
        console.log("   (read-only)");
    }
}

fn prompt_fields(step: &Rc<RefCell<FormStep>>, console: &Console) -> Result<()> {
    let fields = step.borrow().fields().to_vec();

    for field in &fields {
        loop {
            let (current, choices) = {
                let step = step.borrow();
                (
                    step.value(&field.key).unwrap_or_default().to_string(),
                    step.choices(&field.key).to_vec(),
                )
            };

            let value = prompt_field(field, &current, &choices)?;
            match step.borrow_mut().set_value(&field.key, value) {
                Ok(()) => break,
                Err(e) => console.warn(e),
            }
        }
    }
    Ok(())
}

fn prompt_field(field: &FieldDefinition, current: &str, choices: &[String]) -> Result<String> {
    let prompt = if field.required {
        format!("{} *", field.prompt)
    } else {
        field.prompt.clone()
    };

    if !choices.is_empty() {
        let default = choices.iter().position(|c| c == current).unwrap_or(0);
        let index = Select::new()
            .with_prompt(prompt)
            .items(choices)
            .default(default)
            .interact()?;
        return Ok(choices[index].clone());
    }

    if field.secret {
        let value = Password::new()
            .with_prompt(format!("{prompt} (leave empty to keep)"))
            .allow_empty_password(true)
            .interact()?;
        return Ok(if value.is_empty() { current.to_string() } else { value });
    }

    let mut input = Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(!field.required);
    if !current.is_empty() {
        input = input.default(current.to_string());
    }
    Ok(input.interact_text()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizkit_common::config::{generate_template, WizardDefinition};

    fn summary(label: &str, active: bool, skipped: bool, visited: bool) -> StepSummary {
        StepSummary {
            label: label.to_string(),
            active,
            skipped,
            visited,
        }
    }

    #[test]
    fn test_render_overview_markers() {
        let lines = render_overview(&[
            summary("Connection", false, false, true),
            summary("Destination", false, true, false),
            summary("Review", true, false, true),
        ]);
        assert_eq!(
            lines,
            vec!["* 1. Connection", "- 2. Destination (skipped)", "> 3. Review"]
        );
    }

    #[test]
    fn test_menu_keeps_cancel_last() {
        let buttons = ButtonState {
            back: true,
            next: true,
            finish: false,
            test: false,
            cancel: true,
        };
        assert_eq!(
            menu(buttons, true),
            vec![
                MenuItem::Navigate(Action::Back),
                MenuItem::Navigate(Action::Next),
                MenuItem::Edit,
                MenuItem::Navigate(Action::Cancel),
            ]
        );
        assert!(!menu(buttons, false).contains(&MenuItem::Edit));
    }

    #[test]
    fn test_masked_summary_hides_secrets() {
        let definition = WizardDefinition::from_str(&generate_template("JMS")).unwrap();
        let settings = FormSettings::new()
            .with("name", "orders")
            .with("password", "hunter2");

        let lines = masked_summary(&settings, definition.fields());
        assert_eq!(lines, vec!["name = orders", "password = ********"]);
    }

    #[test]
    fn test_write_settings_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FormSettings::new().with("name", "orders").with("queue", "q1");

        let json = dir.path().join("out.json");
        write_settings(&json, &settings).unwrap();
        assert_eq!(FormSettings::from_json_file(&json).unwrap(), settings);

        let toml_path = dir.path().join("out.toml");
        write_settings(&toml_path, &settings).unwrap();
        let contents = std::fs::read_to_string(&toml_path).unwrap();
        assert!(contents.contains("name = \"orders\""));
        let parsed: FormSettings = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, settings);
    }
}
