use super::errors::ReportError;
use config::ReportSettings;

/// Built-in system instruction: daily briefing for an economic journalist
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("system_prompt.md");

/// The fixed instructions sent with every report request
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPrompt {
    pub system_instruction: String,
    pub user_instruction: String,
}

impl ReportPrompt {
    /// Resolve the prompt from settings, reading the system prompt override if one is set
    pub fn from_settings(settings: &ReportSettings) -> Result<Self, ReportError> {
        let system_instruction = match &settings.system_prompt_path {
            Some(path) => std::fs::read_to_string(path).map_err(|source| ReportError::Prompt {
                path: path.display().to_string(),
                source,
            })?,
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        Ok(Self {
            system_instruction,
            user_instruction: settings.user_prompt.clone(),
        })
    }
}

impl Default for ReportPrompt {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_instruction: ReportSettings::default().user_prompt,
        }
    }
}
