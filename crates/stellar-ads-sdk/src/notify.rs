//! Reward notices.
//!
//! When an engagement report comes back with a reward, the viewer sees a
//! short message on the host page that dismisses itself after a fixed
//! display time. Dismissal runs on a detached timer so the engagement path
//! never waits on it.

use std::sync::Arc;
use std::time::Duration;

use stellar_ads_types::{EngagementKind, RewardOffer};
use tracing::debug;

use crate::host::{HostPage, Notice, NoticeId};

/// Text shown for a reward earned through `kind`.
pub fn notice_message(reward: &RewardOffer, kind: EngagementKind) -> String {
    let action = match kind {
        EngagementKind::Impression => "viewing",
        EngagementKind::Click => "clicking",
    };
    format!("You earned {} XLM for {action} this ad!", reward.amount.normalize())
}

/// Shows reward notices on the host page.
#[derive(Clone)]
pub struct NoticeBoard {
    page: Arc<dyn HostPage>,
    display_for: Duration,
}

impl NoticeBoard {
    /// Create a board that keeps notices up for `display_for`.
    pub fn new(page: Arc<dyn HostPage>, display_for: Duration) -> Self {
        Self { page, display_for }
    }

    /// Show a notice for `reward` and schedule its dismissal.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn show(&self, reward: &RewardOffer, kind: EngagementKind) -> NoticeId {
        let message = notice_message(reward, kind);
        debug!(kind = kind.as_str(), %message, "showing reward notice");
        let id = self.page.show_notice(Notice { message, kind });

        let page = Arc::clone(&self.page);
        let display_for = self.display_for;
        tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            page.dismiss_notice(id);
        });
        id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;
    use crate::host::InMemoryPage;

    fn reward(amount: &str) -> RewardOffer {
        RewardOffer {
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn message_names_the_engagement() {
        assert_eq!(
            notice_message(&reward("0.50"), EngagementKind::Impression),
            "You earned 0.5 XLM for viewing this ad!"
        );
        assert_eq!(
            notice_message(&reward("2"), EngagementKind::Click),
            "You earned 2 XLM for clicking this ad!"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn notice_dismisses_itself() {
        let page = Arc::new(InMemoryPage::new());
        let board = NoticeBoard::new(page.clone(), Duration::from_millis(4000));

        board.show(&reward("1"), EngagementKind::Click);
        assert_eq!(page.active_notices().len(), 1);

        tokio::time::sleep(Duration::from_millis(3999)).await;
        assert_eq!(page.active_notices().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(page.active_notices().is_empty());
        assert_eq!(page.notice_history().len(), 1);
    }
}
