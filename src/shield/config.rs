use crate::config::ConfigError;

/// Every option the gate understands: dotted key and the environment variable
/// that overrides it in [`ShieldConfig::from_env`].
pub const OPTION_KEYS: [(&str, &str); 8] = [
    ("login.path", "SHIELD_LOGIN_PATH"),
    ("login.path_post", "SHIELD_LOGIN_PATH_POST"),
    ("login.target", "SHIELD_LOGIN_TARGET"),
    ("login.username", "SHIELD_LOGIN_USERNAME"),
    ("login.password", "SHIELD_LOGIN_PASSWORD"),
    ("login.use_referrer", "SHIELD_LOGIN_USE_REFERRER"),
    ("logout.path", "SHIELD_LOGOUT_PATH"),
    ("logout.target", "SHIELD_LOGOUT_TARGET"),
];

/// Gate options, fixed once the gate is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShieldConfig {
    /// Where unauthenticated visitors of protected pages are sent.
    pub login_path: String,
    /// Path whose POST is treated as a login submission.
    pub login_path_post: String,
    /// Post-login destination when no referrer applies.
    pub login_target: String,
    pub username_field: String,
    pub password_field: String,
    /// Remember the page that triggered the login and return to it afterwards.
    pub use_referrer: bool,
    pub logout_path: String,
    pub logout_target: String,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            login_path_post: "/login".to_string(),
            login_target: "/".to_string(),
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            use_referrer: true,
            logout_path: "/logout".to_string(),
            logout_target: "/".to_string(),
        }
    }
}

impl ShieldConfig {
    /// Merge dotted-key overrides (`login.path`, `logout.target`, ...) over the defaults.
    pub fn with_overrides<I, K, V>(overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in overrides {
            config.apply(key.as_ref(), value.into())?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SHIELD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let overrides = OPTION_KEYS
            .iter()
            .filter_map(|(key, var)| std::env::var(var).ok().map(|value| (*key, value)));

        Self::with_overrides(overrides)
    }

    fn apply(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "login.path" => self.login_path = value,
            "login.path_post" => self.login_path_post = value,
            "login.target" => self.login_target = value,
            "login.username" => self.username_field = value,
            "login.password" => self.password_field = value,
            "login.use_referrer" => self.use_referrer = parse_flag(&value, "login.use_referrer")?,
            "logout.path" => self.logout_path = value,
            "logout.target" => self.logout_target = value,
            other => return Err(ConfigError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let paths = [
            ("login.path", &self.login_path),
            ("login.path_post", &self.login_path_post),
            ("logout.path", &self.logout_path),
        ];
        for (key, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(key));
            }
        }

        let targets = [
            ("login.target", &self.login_target),
            ("logout.target", &self.logout_target),
        ];
        for (key, target) in targets {
            if target.trim().is_empty() {
                return Err(ConfigError::Invalid(key));
            }
        }

        if self.username_field.trim().is_empty() {
            return Err(ConfigError::Invalid("login.username"));
        }
        if self.password_field.trim().is_empty() {
            return Err(ConfigError::Invalid("login.password"));
        }

        Ok(())
    }
}

fn parse_flag(value: &str, key: &'static str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(key)),
    }
}
