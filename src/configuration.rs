use std::time::Duration;

use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub webdriver: WebdriverSettings,
    pub search: SearchSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct WebdriverSettings {
    pub url: String,
    pub headless: bool,
    pub window_size: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct SearchSettings {
    /// Implicit wait applied to every element lookup, in seconds.
    /// Increase on slow connections to avoid spurious element-not-found.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub element_wait_secs: u64,
    /// Fixed settle delay after navigation or CAPTCHA submission, in
    /// seconds, to let asynchronous rendering catch up.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub captcha_settle_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_captcha_attempts: u32,
}

impl SearchSettings {
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn captcha_settle(&self) -> Duration {
        Duration::from_secs(self.captcha_settle_secs)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    let settings = config::Config::builder()
        .set_default("webdriver.url", "http://localhost:9515")?
        .set_default("webdriver.headless", true)?
        .set_default("webdriver.window_size", "1920x1080")?
        .set_default("search.element_wait_secs", 2)?
        .set_default("search.captcha_settle_secs", 3)?
        .set_default("search.max_captcha_attempts", 5)?
        .add_source(config::File::from(base_path.join("configuration.yaml")).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
