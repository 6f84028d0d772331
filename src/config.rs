use std::path::{Path, PathBuf};

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;
use serde_json::Value;

/// Section of the client's `workspace/didChangeConfiguration` payload.
pub const CLIENT_SECTION: &str = "thaliak-timeline-linter";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Soft cap on diagnostics per lint pass
    pub max_number_of_problems: usize,
    /// Explicit enum directory; found next to the raid documents when unset
    pub enums_dir: Option<PathBuf>,
    pub max_cached_documents: usize,
    pub hover: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ClientSettings {
    max_number_of_problems: Option<usize>,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/thaliak/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.thaliak",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("max_number_of_problems", 1000)?
            .set_default("max_cached_documents", 10)?
            .set_default("hover", true)?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let mut settings = settings.try_deserialize::<Settings>()?;
        if let Some(dir) = &settings.enums_dir {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            settings.enums_dir = Some(PathBuf::from(expanded));
        }

        anyhow::Ok(settings)
    }

    /// Applies a `workspace/didChangeConfiguration` payload. Returns whether anything
    /// changed; a payload without the section resets to the default cap.
    pub fn apply_client_settings(&mut self, payload: &Value) -> bool {
        let client = payload
            .get(CLIENT_SECTION)
            .and_then(|section| serde_json::from_value::<ClientSettings>(section.clone()).ok())
            .unwrap_or_default();
        let max = client
            .max_number_of_problems
            .unwrap_or(Settings::default().max_number_of_problems);

        let changed = self.max_number_of_problems != max;
        self.max_number_of_problems = max;
        changed
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_number_of_problems: 1000,
            enums_dir: None,
            max_cached_documents: 10,
            hover: true,
        }
    }
}
