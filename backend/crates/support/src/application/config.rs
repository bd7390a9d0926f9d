//! Application Configuration

/// Ticket workflow configuration
#[derive(Debug, Clone)]
pub struct SupportConfig {
    /// Replies on a closed ticket are accepted and reopen it
    pub allow_reply_on_closed: bool,
    /// Days until an invoice created by assign-service is due
    pub payment_terms_days: i64,
    /// Maximum subject length in characters
    pub subject_max_chars: usize,
    /// Maximum message length in characters
    pub message_max_chars: usize,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            allow_reply_on_closed: true,
            payment_terms_days: 14,
            subject_max_chars: 200,
            message_max_chars: 10_000,
        }
    }
}
