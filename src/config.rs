use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

pub const DEFAULT_CHAT_URL: &str = "https://api.cohere.com/v2/chat";
pub const DEFAULT_CHAT_MODEL: &str = "command-r-plus-08-2024";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_TWILIO_URL: &str = "https://api.twilio.com";
pub const DEFAULT_TWILIO_FROM: &str = "+13164489551";

/// Process-wide settings, resolved once at startup from the environment
/// (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub upstream_timeout: Duration,
    pub chat: ChatConfig,
    pub overpass_url: String,
    pub twilio: TwilioConfig,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: String,
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    dotenv::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let port: u16 = or_default("SERVER_PORT", "8080")
            .parse()
            .context("SERVER_PORT must be a port number")?;
        let timeout_secs: u64 = or_default("UPSTREAM_TIMEOUT_SECS", "20")
            .parse()
            .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            jwt_secret: required("JWT_SECRET")?,
            upstream_timeout: Duration::from_secs(timeout_secs),
            chat: ChatConfig {
                url: or_default("GEN_API_URL", DEFAULT_CHAT_URL),
                model: or_default("GEN_MODEL", DEFAULT_CHAT_MODEL),
                api_key: required("GEN_API_KEY")?,
            },
            overpass_url: or_default("OVERPASS_URL", DEFAULT_OVERPASS_URL),
            twilio: TwilioConfig {
                base_url: or_default("TWILIO_API_URL", DEFAULT_TWILIO_URL),
                account_sid: required("TWILIO_ACCOUNT_SID")?,
                auth_token: required("TWILIO_AUTH_TOKEN")?,
                from_number: or_default("TWILIO_FROM_NUMBER", DEFAULT_TWILIO_FROM),
            },
        })
    }
}
