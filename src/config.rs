use std::fmt;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_MAX_MESSAGES: usize = 10;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Process-wide settings, read once at startup and never mutated.
#[derive(Clone)]
pub struct Config {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
    pub allowed_origin: String,
    pub twilio_api_base: String,
    pub port: u16,
    pub max_messages: usize,
}

/// The three provider values, only available when all of them are set.
#[derive(Clone)]
pub struct Credentials {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated the same as unset ones.
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = get("SMS_RELAY_PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let max_messages = get("SMS_RELAY_MAX_MESSAGES")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_MESSAGES);

        Self {
            account_sid: get("TWILIO_ACCOUNT_SID"),
            auth_token: get("TWILIO_AUTH_TOKEN"),
            phone_number: get("TWILIO_PHONE_NUMBER"),
            allowed_origin: get("ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
            twilio_api_base: get("TWILIO_API_BASE")
                .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
            port,
            max_messages,
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            account_sid: self.account_sid.clone()?,
            auth_token: self.auth_token.clone()?,
            phone_number: self.phone_number.clone()?,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("phone_number", &self.phone_number)
            .field("allowed_origin", &self.allowed_origin)
            .field("twilio_api_base", &self.twilio_api_base)
            .field("port", &self.port)
            .field("max_messages", &self.max_messages)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}
