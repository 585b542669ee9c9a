//! NATS message producer for assessment responses

use crate::types::AssessmentResponse;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Producer for publishing assessment responses to NATS
#[derive(Clone)]
pub struct VerdictProducer {
    client: Client,
    subject: String,
}

impl VerdictProducer {
    /// Create a new verdict producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a response to the request's reply subject, or to the verdict
    /// subject when the request expected no reply.
    pub async fn publish(&self, response: &AssessmentResponse, reply: Option<&str>) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let subject = route(reply, &self.subject);

        self.client
            .publish(subject.to_string(), payload.into())
            .await?;

        debug!(
            request_id = %response.request_id,
            subject = %subject,
            has_verdict = response.verdict.is_some(),
            "Published assessment response"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

fn route<'a>(reply: Option<&'a str>, verdict_subject: &'a str) -> &'a str {
    reply.unwrap_or(verdict_subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_prefers_reply_subject() {
        assert_eq!(route(Some("_INBOX.abc"), "risk.verdicts"), "_INBOX.abc");
        assert_eq!(route(None, "risk.verdicts"), "risk.verdicts");
    }
}
