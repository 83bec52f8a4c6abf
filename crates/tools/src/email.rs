//! `send_email(subject, body)`: deliver a message to the end user.

use std::sync::Arc;

use td_domain::record::ToolArgs;
use td_domain::tool::ToolDefinition;

use crate::notify::NotificationSink;
use crate::registry::{FailureKind, Tool, ToolOutcome};

pub const SEND_EMAIL: &str = "send_email";
pub const SENT_OK: &str = "Email sent successfully.";

pub struct SendEmailTool {
    sink: Arc<dyn NotificationSink>,
    description: String,
}

impl SendEmailTool {
    pub fn new(sink: Arc<dyn NotificationSink>, description: impl Into<String>) -> Self {
        Self { sink, description: description.into() }
    }
}

#[async_trait::async_trait]
impl Tool for SendEmailTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEND_EMAIL.into(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "subject": { "type": "string", "description": "Subject line of the email" },
                    "body": { "type": "string", "description": "Body of the email" }
                },
                "required": ["subject", "body"]
            }),
        }
    }

    async fn call(&self, args: &ToolArgs) -> ToolOutcome {
        let (subject, body) = match (args.get("subject"), args.get("body")) {
            (Some(s), Some(b)) => (s, b),
            (None, _) => {
                return ToolOutcome::failure(
                    FailureKind::InvalidArguments,
                    "missing required argument `subject`",
                )
            }
            (_, None) => {
                return ToolOutcome::failure(
                    FailureKind::InvalidArguments,
                    "missing required argument `body`",
                )
            }
        };

        match self.sink.send(subject, body).await {
            Ok(()) => ToolOutcome::Success(SENT_OK.into()),
            Err(e) => ToolOutcome::failure(FailureKind::Sink, e.to_string()),
        }
    }
}
