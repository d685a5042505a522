use serde::Deserialize;
use std::{collections::HashMap, env, path::PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub gemini: GeminiConfig,
    pub report: ReportSettings,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl ReportConfig {
    /// Override fields with values from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), String> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Override fields using an arbitrary variable lookup
    ///
    /// The lookup receives environment variable names (`API_KEY`, `GEMINI_MODEL`, ...)
    /// and returns `None` when a variable is unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.gemini.apply_overrides(&lookup)?;
        self.report.apply_overrides(&lookup);
        self.output.apply_overrides(&lookup)?;
        self.logging.apply_overrides(&lookup);
        Ok(())
    }
}

/// Google Gemini connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    /// Total request timeout. `None` lets the stream run to completion.
    pub timeout_seconds: Option<u64>,
    /// Credential; only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl GeminiConfig {
    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(timeout) = lookup("GEMINI_TIMEOUT_SECONDS") {
            self.timeout_seconds = Some(
                timeout
                    .parse()
                    .map_err(|_| "GEMINI_TIMEOUT_SECONDS must be a valid number")?,
            );
        }
        self.api_key = lookup("API_KEY").filter(|key| !key.trim().is_empty());
        Ok(())
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: None,
            api_key: None,
        }
    }
}

/// What the report asks the model for
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// File replacing the built-in system instruction
    pub system_prompt_path: Option<PathBuf>,
    pub user_prompt: String,
    /// Enable the Google Search grounding tool
    pub search_enabled: bool,
}

impl ReportSettings {
    fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("REPORT_SYSTEM_PROMPT_PATH") {
            self.system_prompt_path = Some(PathBuf::from(path));
        }
        if let Some(prompt) = lookup("REPORT_USER_PROMPT") {
            self.user_prompt = prompt;
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            system_prompt_path: None,
            user_prompt: "Przygotuj raport na dziś.".to_string(),
            search_enabled: true,
        }
    }
}

/// Where the rendered page is written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Browser refresh interval while a report is streaming
    pub refresh_seconds: u32,
}

impl OutputConfig {
    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("REPORT_OUTPUT_PATH") {
            self.path = PathBuf::from(path);
        }
        if let Some(refresh) = lookup("REPORT_REFRESH_SECONDS") {
            self.refresh_seconds = refresh
                .parse()
                .map_err(|_| "REPORT_REFRESH_SECONDS must be a valid number")?;
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("report.html"),
            refresh_seconds: 2,
        }
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Load module-specific log levels
        if let Some(level) = lookup("LOG_MODULE_SERVICES") {
            self.modules.insert("services".to_string(), level);
        }
        if let Some(level) = lookup("LOG_MODULE_INFERENCE") {
            self.modules.insert("inference_providers".to_string(), level);
        }
        if let Some(level) = lookup("LOG_MODULE_REPORTER") {
            self.modules.insert("reporter".to_string(), level);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.format = format;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert("reporter".to_string(), "debug".to_string());
        modules.insert("services".to_string(), "debug".to_string());

        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules,
        }
    }
}
