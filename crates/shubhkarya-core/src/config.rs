use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

const CONFIG_ENV_VAR: &str =
  "SHUBHKARYA_CONFIG";
const API_URL_ENV_VAR: &str =
  "SHUBHKARYA_API_URL";
const CONFIG_DIR_NAME: &str =
  "shubhkarya";
const CONFIG_FILE_NAME: &str =
  "config.toml";

const DEFAULT_API_BASE_URL: &str =
  "http://localhost:5000";
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TIMEZONE: &str =
  "Asia/Kolkata";
const DEFAULT_REVIEW_CLEAR_MS: u64 =
  2_500;
const DEFAULT_BOOKING_CLEAR_MS: u64 =
  3_500;

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct ApiSection {
  pub base_url:     String,
  pub timeout_secs: u64
}

impl Default for ApiSection {
  fn default() -> Self {
    Self {
      base_url:     DEFAULT_API_BASE_URL
        .to_string(),
      timeout_secs:
        DEFAULT_API_TIMEOUT_SECS
    }
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct TimeSection {
  pub timezone: String
}

impl Default for TimeSection {
  fn default() -> Self {
    Self {
      timezone: DEFAULT_TIMEZONE
        .to_string()
    }
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct MessageSection {
  pub review_clear_ms:  u64,
  pub booking_clear_ms: u64
}

impl Default for MessageSection {
  fn default() -> Self {
    Self {
      review_clear_ms:
        DEFAULT_REVIEW_CLEAR_MS,
      booking_clear_ms:
        DEFAULT_BOOKING_CLEAR_MS
    }
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct DataSection {
  pub location: Option<PathBuf>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(default)]
pub struct DisplaySection {
  pub color: bool
}

impl Default for DisplaySection {
  fn default() -> Self {
    Self {
      color: true
    }
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct Config {
  pub api:          ApiSection,
  pub time:         TimeSection,
  pub messages:     MessageSection,
  pub data:         DataSection,
  pub display:      DisplaySection,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = match resolve_config_path(
      config_override
    ) {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        let text =
          fs::read_to_string(&path)
            .with_context(|| {
              format!(
                "failed to read {}",
                path.display()
              )
            })?;
        let mut cfg =
          Self::from_toml_str(&text)
            .with_context(|| {
              format!(
                "invalid config {}",
                path.display()
              )
            })?;
        cfg.loaded_files.push(path);
        cfg
      }
      | None => {
        warn!(
          "no config file found; using \
           defaults"
        );
        Self::default()
      }
    };

    if let Ok(url) =
      std::env::var(API_URL_ENV_VAR)
      && !url.trim().is_empty()
    {
      debug!(url = %url, "api url from environment");
      cfg.api.base_url =
        url.trim().to_string();
    }

    cfg.sanitize();
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Config =
      toml::from_str(text)
        .context("failed parsing toml")?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// Applies dotted `key=value` pairs from
  /// the command line.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      let value = value.trim();
      match key.trim() {
        | "api.base_url" => {
          self.api.base_url =
            value.to_string();
        }
        | "api.timeout_secs" => {
          self.api.timeout_secs =
            parse_number(&key, value)?;
        }
        | "time.timezone" => {
          self.time.timezone =
            value.to_string();
        }
        | "messages.review_clear_ms" => {
          self.messages.review_clear_ms =
            parse_number(&key, value)?;
        }
        | "messages.booking_clear_ms" => {
          self
            .messages
            .booking_clear_ms =
            parse_number(&key, value)?;
        }
        | "data.location" => {
          self.data.location = Some(
            expand_tilde(Path::new(value))
          );
        }
        | "display.color" => {
          self.display.color =
            parse_bool(value);
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: {other}"
          ));
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  pub fn timezone(&self) -> Tz {
    parse_timezone(&self.time.timezone)
      .unwrap_or(chrono_tz::Asia::Kolkata)
  }

  pub fn api_timeout(&self) -> Duration {
    Duration::from_secs(
      self.api.timeout_secs
    )
  }

  pub fn review_clear_delay(
    &self
  ) -> Duration {
    Duration::from_millis(
      self.messages.review_clear_ms
    )
  }

  pub fn booking_clear_delay(
    &self
  ) -> Duration {
    Duration::from_millis(
      self.messages.booking_clear_ms
    )
  }

  fn sanitize(&mut self) {
    let trimmed = self
      .api
      .base_url
      .trim()
      .trim_end_matches('/')
      .to_string();
    if trimmed.is_empty() {
      warn!(
        "empty api.base_url; using \
         default"
      );
      self.api.base_url =
        DEFAULT_API_BASE_URL.to_string();
    } else {
      self.api.base_url = trimmed;
    }

    if self.api.timeout_secs == 0 {
      self.api.timeout_secs =
        DEFAULT_API_TIMEOUT_SECS;
    }

    if parse_timezone(&self.time.timezone)
      .is_none()
    {
      warn!(
        timezone = %self.time.timezone,
        "invalid timezone; using default"
      );
      self.time.timezone =
        DEFAULT_TIMEZONE.to_string();
    }

    if self.messages.review_clear_ms == 0 {
      self.messages.review_clear_ms =
        DEFAULT_REVIEW_CLEAR_MS;
    }
    if self.messages.booking_clear_ms == 0
    {
      self.messages.booking_clear_ms =
        DEFAULT_BOOKING_CLEAR_MS;
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(path) =
    cfg.data.location.as_deref()
  {
    expand_tilde(path)
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  candidate.exists().then_some(candidate)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .or_else(dirs::home_dir)
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join(CONFIG_DIR_NAME))
}

fn parse_timezone(raw: &str) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed.parse::<Tz>().ok()
}

fn parse_number(
  key: &str,
  value: &str
) -> anyhow::Result<u64> {
  value.parse::<u64>().with_context(|| {
    format!(
      "{key} expects a whole number, \
       got {value:?}"
    )
  })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
