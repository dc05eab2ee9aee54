use log::{info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::twilio::{OutboundSms, SendError, SmsSender};
use crate::types::{FailedMessage, OutgoingMessage, SendResponse, SentMessage};

pub const MISSING_FIELDS: &str = "Missing \"to\" or \"body\"";

/// Sends every message in order and folds the outcomes into one envelope.
/// Each item gets exactly one outcome; a failing item never stops the rest.
pub async fn dispatch_batch(
    sender: &dyn SmsSender,
    from: &str,
    messages: Vec<OutgoingMessage>,
) -> SendResponse {
    let batch_id = Uuid::new_v4();
    info!("Batch {}: dispatching {} message(s)", batch_id, messages.len());

    let mut sent = Vec::new();
    let mut errors = Vec::new();

    for (index, msg) in messages.into_iter().enumerate() {
        let Some((to, body)) = msg.text_fields() else {
            warn!("Batch {} item {}: missing \"to\" or \"body\"", batch_id, index);
            errors.push(FailedMessage {
                to: msg.to,
                error: MISSING_FIELDS.to_string(),
            });
            continue;
        };

        let sms = OutboundSms {
            to,
            body,
            from: from.to_string(),
        };

        match sender.send(&sms).await {
            Ok(receipt) => {
                info!(
                    "Batch {} item {}: sent to {} (sid {}, status {})",
                    batch_id, index, sms.to, receipt.sid, receipt.status
                );
                sent.push(SentMessage {
                    to: sms.to,
                    sid: receipt.sid,
                    status: receipt.status,
                });
            }
            Err(e) => {
                warn!("Batch {} item {}: send to {} failed: {}", batch_id, index, sms.to, e);
                if let SendError::HttpStatus { body: Some(body), .. } = &e {
                    warn!("Batch {} item {}: provider response body: {}", batch_id, index, body);
                }
                errors.push(FailedMessage {
                    to: Some(Value::String(sms.to)),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Batch {}: {} sent, {} failed",
        batch_id,
        sent.len(),
        errors.len()
    );
    SendResponse::new(sent, errors)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::twilio::{BoxFuture, SmsReceipt};

    /// Records every send and fails for numbers registered as rejected.
    #[derive(Default)]
    pub(crate) struct FakeSender {
        pub(crate) calls: Mutex<Vec<OutboundSms>>,
        pub(crate) rejected: HashMap<String, String>,
    }

    impl FakeSender {
        pub(crate) fn rejecting(to: &str, message: &str) -> Self {
            let mut rejected = HashMap::new();
            rejected.insert(to.to_owned(), message.to_owned());
            Self {
                calls: Mutex::new(Vec::new()),
                rejected,
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl SmsSender for FakeSender {
        fn send<'a>(
            &'a self,
            sms: &'a OutboundSms,
        ) -> BoxFuture<'a, Result<SmsReceipt, SendError>> {
            Box::pin(async move {
                let n = {
                    let mut calls = self.calls.lock().unwrap();
                    calls.push(sms.clone());
                    calls.len()
                };
                if let Some(message) = self.rejected.get(&sms.to) {
                    return Err(SendError::Api {
                        status: 400,
                        code: Some(21211),
                        message: message.clone(),
                    });
                }
                Ok(SmsReceipt {
                    sid: format!("SM{n:04}"),
                    status: "queued".to_owned(),
                })
            })
        }
    }

    fn msg(to: Option<&str>, body: Option<&str>) -> OutgoingMessage {
        OutgoingMessage {
            to: to.map(|v| json!(v)),
            body: body.map(|v| json!(v)),
        }
    }

    #[tokio::test]
    async fn single_message_is_sent_with_configured_from() {
        let sender = FakeSender::default();
        let response =
            dispatch_batch(&sender, "+15550001111", vec![msg(Some("+15551112222"), Some("hi"))])
                .await;

        assert!(response.success);
        assert!(response.errors.is_none());
        assert_eq!(
            response.sent,
            vec![SentMessage {
                to: "+15551112222".to_owned(),
                sid: "SM0001".to_owned(),
                status: "queued".to_owned(),
            }]
        );

        let calls = sender.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            OutboundSms {
                to: "+15551112222".to_owned(),
                body: "hi".to_owned(),
                from: "+15550001111".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn invalid_items_fail_without_contacting_the_provider() {
        let sender = FakeSender::default();
        let response = dispatch_batch(
            &sender,
            "+15550001111",
            vec![
                msg(Some(""), Some("hi")),
                msg(None, Some("hi")),
                msg(Some("+15551112222"), None),
                msg(Some("+15551112222"), Some("")),
            ],
        )
        .await;

        assert_eq!(sender.call_count(), 0);
        assert!(!response.success);
        assert!(response.sent.is_empty());
        let errors = response.errors.unwrap();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.error == MISSING_FIELDS));
        assert_eq!(errors[0].to, Some(json!("")));
        assert_eq!(errors[1].to, None);
        assert_eq!(errors[2].to, Some(json!("+15551112222")));
    }

    #[tokio::test]
    async fn non_string_fields_and_non_object_items_fail_per_item() {
        let sender = FakeSender::default();
        let items = vec![
            json!({ "to": 5, "body": "x" }),
            json!({ "to": "+15551112222", "body": 7 }),
            json!(["+15551112222", "hi"]),
            json!(null),
            json!({ "to": "+15553334444", "body": "ok" }),
        ];
        let response = dispatch_batch(
            &sender,
            "+15550001111",
            items.into_iter().map(OutgoingMessage::from_value).collect(),
        )
        .await;

        assert_eq!(sender.call_count(), 1);
        assert_eq!(response.sent.len(), 1);
        assert_eq!(response.sent[0].to, "+15553334444");

        let errors = response.errors.unwrap();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.error == MISSING_FIELDS));
        assert_eq!(errors[0].to, Some(json!(5)));
        assert_eq!(errors[1].to, Some(json!("+15551112222")));
        assert_eq!(errors[2].to, None);
        assert_eq!(errors[3].to, None);
    }

    #[tokio::test]
    async fn provider_failures_do_not_abort_the_batch() {
        let sender = FakeSender::rejecting("+15550000000", "invalid number");
        let response = dispatch_batch(
            &sender,
            "+15550001111",
            vec![
                msg(Some("+15551112222"), Some("one")),
                msg(Some("+15550000000"), Some("two")),
                msg(Some(""), Some("three")),
                msg(Some("+15553334444"), Some("four")),
            ],
        )
        .await;

        assert_eq!(sender.call_count(), 3);
        assert!(!response.success);
        let sent: Vec<_> = response.sent.iter().map(|s| s.to.as_str()).collect();
        assert_eq!(sent, vec!["+15551112222", "+15553334444"]);

        let errors = response.errors.unwrap();
        assert_eq!(response.sent.len() + errors.len(), 4);
        assert_eq!(
            errors[0],
            FailedMessage {
                to: Some(json!("+15550000000")),
                error: "invalid number".to_owned(),
            }
        );
        assert_eq!(errors[1].error, MISSING_FIELDS);
    }

    struct GatewayDown;

    impl SmsSender for GatewayDown {
        fn send<'a>(
            &'a self,
            _sms: &'a OutboundSms,
        ) -> BoxFuture<'a, Result<SmsReceipt, SendError>> {
            Box::pin(async {
                Err::<SmsReceipt, _>(SendError::HttpStatus {
                    status: 502,
                    body: Some("<html>bad gateway</html>".to_owned()),
                })
            })
        }
    }

    #[tokio::test]
    async fn raw_provider_bodies_stay_out_of_the_response() {
        let response = dispatch_batch(
            &GatewayDown,
            "+15550001111",
            vec![msg(Some("+15551112222"), Some("hi"))],
        )
        .await;

        let errors = response.errors.unwrap();
        assert_eq!(errors[0].error, "unexpected HTTP status: 502");
        assert!(!errors[0].error.contains("bad gateway"));
    }

    #[tokio::test]
    async fn all_items_failing_still_yields_an_envelope() {
        let sender = FakeSender::rejecting("+15550000000", "invalid number");
        let response = dispatch_batch(
            &sender,
            "+15550001111",
            vec![msg(Some("+15550000000"), Some("a")), msg(None, None)],
        )
        .await;

        assert!(!response.success);
        assert!(response.sent.is_empty());
        assert_eq!(response.errors.map(|e| e.len()), Some(2));
    }

    #[tokio::test]
    async fn resubmitting_a_batch_sends_again() {
        // No deduplication across requests: the same batch is dispatched twice.
        let sender = FakeSender::default();
        let batch = vec![msg(Some("+15551112222"), Some("hi"))];

        let first = dispatch_batch(&sender, "+15550001111", batch.clone()).await;
        let second = dispatch_batch(&sender, "+15550001111", batch).await;

        assert_eq!(sender.call_count(), 2);
        assert_ne!(first.sent[0].sid, second.sent[0].sid);
    }
}
