//! Article moderation state machine.
//!
//! Writers submit into PENDING; admins decide APPROVED or REJECTED, and
//! soft-delete decided articles by flipping them to DISABLED. Re-applying the
//! decision an article already carries is allowed (idempotent review). The
//! writer-initiated hard delete bypasses this machine entirely — it is
//! ownership-gated row removal, handled in the writer area.

use crate::localized::{Lang, LocalizedText};
use crate::models::ArticleStatus;

/// Whether an admin review may move an article from `from` to `to`.
pub fn transition_allowed(from: ArticleStatus, to: ArticleStatus) -> bool {
    use ArticleStatus::*;

    if from == to {
        // Idempotent re-application of the same decision.
        return true;
    }

    matches!(
        (from, to),
        (Pending, Approved) | (Pending, Rejected) | (Approved, Disabled) | (Rejected, Disabled)
    )
}

/// Body text for the channel notification sent when an article is approved.
///
/// The channel audience reads Amharic first, so the Amharic text is preferred
/// and English is the fallback; the title leads on its own line.
pub fn notification_text(title: &LocalizedText, content: &LocalizedText) -> String {
    format!(
        "{}\n\n{}",
        title.resolve(Lang::Am),
        content.resolve(Lang::Am)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ArticleStatus::*;

    #[test]
    fn pending_can_be_decided() {
        assert!(transition_allowed(Pending, Approved));
        assert!(transition_allowed(Pending, Rejected));
    }

    #[test]
    fn decided_articles_can_be_disabled() {
        assert!(transition_allowed(Approved, Disabled));
        assert!(transition_allowed(Rejected, Disabled));
    }

    #[test]
    fn same_decision_is_idempotent() {
        for status in [Pending, Approved, Rejected, Disabled] {
            assert!(transition_allowed(status, status));
        }
    }

    #[test]
    fn no_path_back_out_of_disabled() {
        assert!(!transition_allowed(Disabled, Approved));
        assert!(!transition_allowed(Disabled, Rejected));
        assert!(!transition_allowed(Disabled, Pending));
    }

    #[test]
    fn decisions_cannot_be_flipped() {
        assert!(!transition_allowed(Approved, Rejected));
        assert!(!transition_allowed(Rejected, Approved));
        assert!(!transition_allowed(Approved, Pending));
        assert!(!transition_allowed(Pending, Disabled));
    }

    #[test]
    fn notification_prefers_amharic() {
        let title = LocalizedText {
            en: "Title".to_string(),
            am: Some("ርዕስ".to_string()),
            om: None,
        };
        let content = LocalizedText {
            en: "Body".to_string(),
            am: Some("ይዘት".to_string()),
            om: None,
        };
        assert_eq!(notification_text(&title, &content), "ርዕስ\n\nይዘት");
    }

    #[test]
    fn notification_falls_back_to_english() {
        let title = LocalizedText::new("Title");
        let content = LocalizedText::new("Body");
        assert_eq!(notification_text(&title, &content), "Title\n\nBody");
    }
}
