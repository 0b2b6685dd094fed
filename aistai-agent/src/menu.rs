//! Inline menus and the callback payloads they carry

use aistai_core::ModelRegistry;

pub const WELCOME_TEXT: &str = "Hi, I'm a virtual assistant written by an AI 🤖 \
almost without human help.\n\nPick a model and let's get started!";

pub const ABOUT_TEXT: &str = "🤖 AistaiBot\n\
An AI assistant built on OpenAI models.\n\
Every user gets their own separate conversation context.\n\
Created almost entirely without human involvement 😉";

pub const NEW_CHAT_TEXT: &str = "Started a new chat 🧹\nAsk your first question.";

pub const MAIN_MENU_TEXT: &str = "Main menu:";

pub const MODEL_SELECT_TEXT: &str = "Choose a model for AistaiBot:";

const SET_MODEL_PREFIX: &str = "set_model:";

/// What a callback button asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    ChangeModel,
    NewChat,
    AboutBot,
    BackToMenu,
    /// Carries the raw code; it is stored without validation
    SetModel(String),
    /// Anything we did not render ourselves
    Unknown(String),
}

impl CallbackAction {
    pub fn parse(payload: &str) -> Self {
        match payload {
            "change_model" => CallbackAction::ChangeModel,
            "new_chat" => CallbackAction::NewChat,
            "about_bot" => CallbackAction::AboutBot,
            "back_to_menu" => CallbackAction::BackToMenu,
            other => match other.strip_prefix(SET_MODEL_PREFIX) {
                Some(code) => CallbackAction::SetModel(code.to_string()),
                None => CallbackAction::Unknown(other.to_string()),
            },
        }
    }

    /// Payload string carried by the button
    pub fn payload(&self) -> String {
        match self {
            CallbackAction::ChangeModel => "change_model".to_string(),
            CallbackAction::NewChat => "new_chat".to_string(),
            CallbackAction::AboutBot => "about_bot".to_string(),
            CallbackAction::BackToMenu => "back_to_menu".to_string(),
            CallbackAction::SetModel(code) => format!("{}{}", SET_MODEL_PREFIX, code),
            CallbackAction::Unknown(raw) => raw.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            payload: action.payload(),
        }
    }
}

/// Inline keyboard, row by row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// One button per row
    pub fn single_column(buttons: Vec<Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|button| vec![button]).collect(),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

pub fn main_menu() -> Keyboard {
    Keyboard::single_column(vec![
        Button::new("🧠 Change model", CallbackAction::ChangeModel),
        Button::new("🧹 New chat", CallbackAction::NewChat),
        Button::new("ℹ️ About bot", CallbackAction::AboutBot),
    ])
}

/// Model picker with the current selection ticked
pub fn model_menu(registry: &ModelRegistry, current: &str) -> Keyboard {
    let mut buttons: Vec<Button> = registry
        .entries()
        .iter()
        .map(|entry| {
            let label = if entry.code == current {
                format!("✅ {}", entry.display_name)
            } else {
                entry.display_name.clone()
            };
            Button::new(label, CallbackAction::SetModel(entry.code.clone()))
        })
        .collect();
    buttons.push(Button::new("⬅️ Back", CallbackAction::BackToMenu));
    Keyboard::single_column(buttons)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads_round_trip() {
        for payload in [
            "change_model",
            "new_chat",
            "about_bot",
            "back_to_menu",
            "set_model:gpt5_instance",
            "set_model:gpt5_syncing",
            "set_model:gpt4o",
        ] {
            assert_eq!(CallbackAction::parse(payload).payload(), payload);
        }
    }

    #[test]
    fn test_parse_set_model_keeps_raw_code() {
        assert_eq!(
            CallbackAction::parse("set_model:bogus"),
            CallbackAction::SetModel("bogus".to_string())
        );
        assert_eq!(
            CallbackAction::parse("set_model:"),
            CallbackAction::SetModel(String::new())
        );
        assert_eq!(
            CallbackAction::parse("delete_everything"),
            CallbackAction::Unknown("delete_everything".to_string())
        );
    }

    #[test]
    fn test_main_menu_layout() {
        let menu = main_menu();
        assert_eq!(menu.rows.len(), 3);
        assert!(menu.rows.iter().all(|row| row.len() == 1));
        let payloads: Vec<&str> = menu.buttons().map(|b| b.payload.as_str()).collect();
        assert_eq!(payloads, vec!["change_model", "new_chat", "about_bot"]);
    }

    #[test]
    fn test_model_menu_marks_current() {
        let registry = ModelRegistry::new();
        let menu = model_menu(&registry, "gpt5_syncing");
        let labels: Vec<&str> = menu.buttons().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["GPT-5 Instance", "✅ GPT-5 Syncing", "GPT-4o", "⬅️ Back"]
        );
        assert_eq!(menu.rows[0][0].payload, "set_model:gpt5_instance");
        assert_eq!(menu.rows[3][0].payload, "back_to_menu");
    }

    #[test]
    fn test_model_menu_with_unknown_current_has_no_tick() {
        let menu = model_menu(&ModelRegistry::new(), "bogus");
        assert!(menu.buttons().all(|b| !b.label.starts_with('✅')));
    }
}
