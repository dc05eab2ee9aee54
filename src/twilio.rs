//! Twilio provider client and the narrow send capability the dispatcher
//! depends on.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::Credentials;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single message as handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub body: String,
    pub from: String,
}

/// What the provider reports back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    pub sid: String,
    pub status: String,
}

/// Errors from a single send. `Display` is the provider-facing description
/// and ends up verbatim in the per-item `error` field.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("{0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    #[error("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    #[error("invalid provider response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The send capability used by the dispatcher.
pub trait SmsSender: Send + Sync {
    fn send<'a>(&'a self, sms: &'a OutboundSms) -> BoxFuture<'a, Result<SmsReceipt, SendError>>;
}

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
}

trait HttpTransport: Send + Sync {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        basic_auth: (&'a str, &'a str),
        params: Vec<(&'static str, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        basic_auth: (&'a str, &'a str),
        params: Vec<(&'static str, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let (user, password) = basic_auth;
            let response = self
                .client
                .post(url)
                .basic_auth(user, Some(password))
                .form(&params)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
}

#[derive(Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Client for the Twilio Programmable Messaging REST API.
#[derive(Clone)]
pub struct TwilioClient {
    account_sid: String,
    auth_token: String,
    messages_url: String,
    http: Arc<dyn HttpTransport>,
}

impl TwilioClient {
    pub fn new(credentials: &Credentials, api_base: &str) -> Self {
        Self::with_transport(
            credentials,
            api_base,
            Arc::new(ReqwestTransport {
                client: reqwest::Client::new(),
            }),
        )
    }

    fn with_transport(
        credentials: &Credentials,
        api_base: &str,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            api_base.trim_end_matches('/'),
            credentials.account_sid
        );
        Self {
            account_sid: credentials.account_sid.clone(),
            auth_token: credentials.auth_token.clone(),
            messages_url,
            http,
        }
    }

    pub async fn create_message(&self, sms: &OutboundSms) -> Result<SmsReceipt, SendError> {
        let params = vec![
            ("To", sms.to.clone()),
            ("From", sms.from.clone()),
            ("Body", sms.body.clone()),
        ];

        let response = self
            .http
            .post_form(
                &self.messages_url,
                (self.account_sid.as_str(), self.auth_token.as_str()),
                params,
            )
            .await
            .map_err(SendError::Transport)?;

        if !(200..=299).contains(&response.status) {
            return Err(decode_error(response));
        }

        let resource: MessageResource = serde_json::from_str(&response.body)?;
        Ok(SmsReceipt {
            sid: resource.sid,
            status: resource.status,
        })
    }
}

impl SmsSender for TwilioClient {
    fn send<'a>(&'a self, sms: &'a OutboundSms) -> BoxFuture<'a, Result<SmsReceipt, SendError>> {
        Box::pin(self.create_message(sms))
    }
}

fn decode_error(response: HttpResponse) -> SendError {
    match serde_json::from_str::<TwilioErrorBody>(&response.body) {
        Ok(err) => SendError::Api {
            status: response.status,
            code: err.code,
            message: err.message,
        },
        Err(_) => SendError::HttpStatus {
            status: response.status,
            body: if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body)
            },
        },
    }
}
