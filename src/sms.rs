use serde_json::Value;

use crate::{config::TwilioConfig, AppError, AppResult, GetField};

/// Twilio-style SMS sender. One attempt per message, no retries.
#[derive(Debug, Clone)]
pub struct SmsGateway {
    http_client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsGateway {
    pub fn new(http_client: reqwest::Client, config: &TwilioConfig) -> Self {
        SmsGateway {
            http_client,
            messages_url: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.base_url.trim_end_matches('/'),
                config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }

    /// Sends `body` to `to`, returning the delivery id.
    pub async fn send(&self, to: &str, body: &str) -> AppResult<String> {
        let response: Value = self.http_client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("sms to {to} failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("sms to {to} rejected: {e}")))?
            .json()
            .await?;

        let sid = response.get_str_field("sid")?;
        tracing::info!(%sid, "sms sent");
        Ok(sid)
    }
}
