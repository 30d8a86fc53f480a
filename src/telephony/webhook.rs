//! Inbound telephony webhooks — status callbacks and SMS replies.
//!
//! Twilio posts these as form-encoded bodies with PascalCase field
//! names. Reply keywords drive a small automated-response table; the
//! TwiML answer goes back in the webhook response body.

use serde::Deserialize;

/// Union of the fields Twilio sends across call-status, SMS-status, and
/// inbound-SMS webhooks. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioWebhookPayload {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
    #[serde(rename = "AnsweredBy")]
    pub answered_by: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    #[serde(rename = "ErrorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

/// Automated handling for an inbound SMS reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsReplyAction {
    Confirm,
    Decline,
    OptOut,
    OptIn,
    Help,
    /// Anything else: acknowledge and queue for care-manager review.
    Review,
}

impl SmsReplyAction {
    /// Classify a reply body by keyword, whitespace- and case-insensitive.
    pub fn classify(body: &str) -> Self {
        match body.trim().to_uppercase().as_str() {
            "YES" | "Y" | "CONFIRM" => Self::Confirm,
            "NO" | "N" | "DECLINE" => Self::Decline,
            "STOP" | "UNSUBSCRIBE" | "CANCEL" => Self::OptOut,
            "START" | "SUBSCRIBE" => Self::OptIn,
            "HELP" | "INFO" => Self::Help,
            _ => Self::Review,
        }
    }

    /// Text to send back automatically.
    pub fn auto_response(&self) -> &'static str {
        match self {
            Self::Confirm => "Thank you for confirming! A Care Manager will contact you shortly.",
            Self::Decline => {
                "We understand. If you change your mind, please contact our office."
            }
            Self::OptOut => "You have been unsubscribed. Reply START to opt back in.",
            Self::OptIn => "Welcome back! You will receive updates from our care team.",
            Self::Help => {
                "For assistance, call our office or visit our website. Reply STOP to unsubscribe."
            }
            Self::Review => "Thank you for your message. A Care Manager will respond soon.",
        }
    }

    /// Patient outreach status update implied by the reply, if any.
    pub fn status_update(&self) -> Option<&'static str> {
        match self {
            Self::Confirm => Some("Consent Sent"),
            Self::Decline => Some("Not Approved"),
            Self::OptOut => Some("Opted Out"),
            _ => None,
        }
    }
}

/// Render a single-message TwiML response.
pub fn twiml_message(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Message>{}</Message>\n</Response>",
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_classify_case_insensitively() {
        assert_eq!(SmsReplyAction::classify("yes"), SmsReplyAction::Confirm);
        assert_eq!(SmsReplyAction::classify(" Y "), SmsReplyAction::Confirm);
        assert_eq!(SmsReplyAction::classify("CONFIRM"), SmsReplyAction::Confirm);
        assert_eq!(SmsReplyAction::classify("no"), SmsReplyAction::Decline);
        assert_eq!(SmsReplyAction::classify("STOP"), SmsReplyAction::OptOut);
        assert_eq!(SmsReplyAction::classify("cancel"), SmsReplyAction::OptOut);
        assert_eq!(SmsReplyAction::classify("start"), SmsReplyAction::OptIn);
        assert_eq!(SmsReplyAction::classify("help"), SmsReplyAction::Help);
        assert_eq!(
            SmsReplyAction::classify("when is my appointment?"),
            SmsReplyAction::Review
        );
    }

    #[test]
    fn status_updates_only_for_consent_changes() {
        assert_eq!(
            SmsReplyAction::Confirm.status_update(),
            Some("Consent Sent")
        );
        assert_eq!(SmsReplyAction::OptOut.status_update(), Some("Opted Out"));
        assert_eq!(SmsReplyAction::Help.status_update(), None);
        assert_eq!(SmsReplyAction::Review.status_update(), None);
    }

    #[test]
    fn twiml_escapes_markup() {
        let twiml = twiml_message("a < b & c");
        assert!(twiml.contains("<Message>a &lt; b &amp; c</Message>"));
        assert!(twiml.starts_with("<?xml"));
    }
}
