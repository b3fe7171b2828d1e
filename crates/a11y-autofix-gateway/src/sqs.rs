//! SQS-backed work queue to the remediation worker.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use tracing::debug;

use crate::error::GatewayError;
use crate::payload::OutboundMessage;
use crate::traits::WorkQueue;
use crate::Result;

/// [`WorkQueue`] publishing JSON bodies to one SQS queue.
pub struct SqsWorkQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsWorkQueue {
    pub fn new(sdk_config: &SdkConfig, queue_url: &str) -> Self {
        SqsWorkQueue {
            client: aws_sdk_sqs::Client::new(sdk_config),
            queue_url: queue_url.to_string(),
        }
    }
}

#[async_trait]
impl WorkQueue for SqsWorkQueue {
    async fn publish(&self, message: &OutboundMessage) -> Result<String> {
        let body = message.to_body()?;
        debug!(queue = %self.queue_url, bytes = body.len(), "sending message");

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Queue(DisplayErrorContext(e).to_string()))?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Queue("queue accepted the message without an id".into()))
    }
}
