use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOption {
    /// Requires the device to be unlocked.
    AuthenticationRequired,
    Destructive,
    /// Brings the host application to the foreground.
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOption {
    CustomDismissAction,
    AllowInCarPlay,
    HiddenPreviewsShowTitle,
    HiddenPreviewsShowSubtitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInput {
    pub button_title: String,
    pub placeholder: String,
}

/// A response button shown on notifications of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub options: Vec<ActionOption>,
    /// Turns the button into a text reply field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_input: Option<TextInput>,
}

impl NotificationAction {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            options: Vec::new(),
            text_input: None,
        }
    }

    pub fn with_option(mut self, option: ActionOption) -> Self {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
        self
    }

    pub fn with_text_input(
        mut self,
        button_title: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        self.text_input = Some(TextInput {
            button_title: button_title.into(),
            placeholder: placeholder.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCategory {
    pub id: String,
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub options: Vec<CategoryOption>,
}

impl NotificationCategory {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.actions.retain(|existing| existing.id != action.id);
        self.actions.push(action);
        self
    }

    pub fn with_option(mut self, option: CategoryOption) -> Self {
        if !self.options.contains(&option) {
            self.options.push(option);
        }
        self
    }

    pub fn action(&self, id: &str) -> Option<&NotificationAction> {
        self.actions.iter().find(|action| action.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_action_replaces_same_id() {
        let category = NotificationCategory::new("reminder")
            .with_action(NotificationAction::new("done", "Done"))
            .with_action(
                NotificationAction::new("done", "Mark done").with_option(ActionOption::Foreground),
            );
        assert_eq!(category.actions.len(), 1);
        let action = category.action("done").expect("action registered");
        assert_eq!(action.title, "Mark done");
        assert_eq!(action.options, vec![ActionOption::Foreground]);
    }

    #[test]
    fn text_input_action() {
        let action = NotificationAction::new("reply", "Reply").with_text_input("Send", "Message");
        assert_eq!(
            action.text_input.as_ref().map(|input| input.button_title.as_str()),
            Some("Send")
        );
    }
}
