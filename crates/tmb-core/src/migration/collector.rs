use tracing::debug;

use crate::{
    config::{MigrationSettings, SelfMessagePolicy},
    domain::{ChannelId, MessageId, SourceMessage, UserId},
    messaging::port::ChatPlatform,
    Result,
};

/// Eligible messages, oldest first, plus how many bot messages were skipped.
#[derive(Clone, Debug, Default)]
pub struct Collected {
    pub messages: Vec<SourceMessage>,
    pub bot_ignored: usize,
}

impl Collected {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub struct MessageCollector<'a> {
    platform: &'a dyn ChatPlatform,
    settings: &'a MigrationSettings,
}

impl<'a> MessageCollector<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, settings: &'a MigrationSettings) -> Self {
        Self { platform, settings }
    }

    pub async fn collect(&self, channel: ChannelId, target: usize) -> Result<Collected> {
        self.collect_before(channel, target, None).await
    }

    /// Like [`collect`](Self::collect), but only looks at history older than
    /// `cursor` when one is given.
    pub async fn collect_before(
        &self,
        channel: ChannelId,
        target: usize,
        cursor: Option<MessageId>,
    ) -> Result<Collected> {
        let me = self.platform.current_user().await?;
        let page_limit = self.platform.capabilities().history_page_limit.max(1);
        let max_scan = self.settings.collect_max_scan.max(target);

        // Reverse-chronological while scanning; flipped before sorting.
        let mut newest_first: Vec<SourceMessage> = Vec::new();
        let mut bot_ignored = 0usize;
        let mut scanned = 0usize;
        let mut before = cursor;
        // Over-provision the first page so interleaved bot chatter rarely costs
        // a second round trip.
        let mut want = target + self.settings.collect_margin;

        'pages: while newest_first.len() < target && scanned < max_scan {
            let limit = want.min(page_limit).min(max_scan - scanned);
            let mut page = self.platform.fetch_history(channel, before, limit).await?;
            let exhausted = page.len() < limit;
            if page.is_empty() {
                break;
            }

            // Adapters return newest first, but don't rely on it.
            page.sort_by(|a, b| b.id.cmp(&a.id));
            before = page.last().map(|m| m.id);
            scanned += page.len();

            for msg in page {
                if newest_first.len() >= target {
                    break 'pages;
                }
                if self.is_eligible(&msg, me) {
                    newest_first.push(msg);
                } else {
                    bot_ignored += 1;
                }
            }

            if exhausted {
                break;
            }
            want = (target - newest_first.len()) + self.settings.collect_margin;
        }

        debug!(
            channel = %channel,
            scanned,
            eligible = newest_first.len(),
            bot_ignored,
            "history collected"
        );

        newest_first.reverse();
        // Stable: equal timestamps keep chronological (id) order.
        newest_first.sort_by_key(|m| m.created_at);

        Ok(Collected {
            messages: newest_first,
            bot_ignored,
        })
    }

    fn is_eligible(&self, msg: &SourceMessage, me: UserId) -> bool {
        if !msg.author.is_bot {
            return true;
        }
        msg.author.id == me && self.settings.self_messages == SelfMessagePolicy::Include
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::fake::{bot, human, message, Call, FakePlatform, BOT_USER, SOURCE};

    fn settings() -> MigrationSettings {
        MigrationSettings::default()
    }

    fn own(id: u64, minutes_ago: i64) -> SourceMessage {
        let mut m = message(id, minutes_ago, "report", true);
        m.author.id = BOT_USER;
        m
    }

    #[tokio::test]
    async fn skips_bots_and_orders_oldest_first() {
        // 3 bot + 7 human messages interleaved.
        let mut history = Vec::new();
        for i in 0..10u64 {
            let minutes_ago = 100 - i as i64;
            if i % 3 == 1 {
                history.push(bot(i + 1, minutes_ago));
            } else {
                history.push(human(i + 1, minutes_ago, &format!("m{i}")));
            }
        }
        let platform = FakePlatform::new().with_history(history);
        let s = settings();

        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 10)
            .await
            .unwrap();

        assert_eq!(got.messages.len(), 7);
        assert_eq!(got.bot_ignored, 3);
        assert!(got.messages.iter().all(|m| !m.author.is_bot));
        assert!(got
            .messages
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
        // Window over-provisioned in a single round trip.
        assert_eq!(
            platform.count(|c| matches!(c, Call::History { .. })),
            1
        );
    }

    #[tokio::test]
    async fn order_does_not_depend_on_fetch_order() {
        let history: Vec<_> = (1..=30u64)
            .map(|i| human(i, 1000 - i as i64, &format!("m{i}")))
            .collect();
        let mut platform = FakePlatform::new().with_history(history);
        platform.scramble_pages = true;
        let s = settings();

        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 12)
            .await
            .unwrap();

        let ids: Vec<u64> = got.messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, (19..=30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn pages_backwards_until_target_is_met() {
        // Newest 150 messages are bot chatter; the humans sit behind them.
        let mut history: Vec<_> = (1..=20u64)
            .map(|i| human(i, 1000 - i as i64, "old"))
            .collect();
        history.extend((21..=170u64).map(|i| bot(i, 1000 - i as i64)));
        let platform = FakePlatform::new().with_history(history);
        let s = settings();

        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 5)
            .await
            .unwrap();

        assert_eq!(got.messages.len(), 5);
        assert_eq!(got.bot_ignored, 150);
        let ids: Vec<u64> = got.messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![16, 17, 18, 19, 20]);

        let history_calls: Vec<Call> = platform
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::History { .. }))
            .collect();
        assert!(history_calls.len() > 1);
        assert_eq!(
            history_calls[0],
            Call::History {
                before: None,
                limit: 25
            }
        );
        assert!(matches!(
            history_calls[1],
            Call::History {
                before: Some(MessageId(146)),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stops_at_max_scan() {
        let history: Vec<_> = (1..=300u64).map(|i| bot(i, 1000 - i as i64)).collect();
        let platform = FakePlatform::new().with_history(history);
        let mut s = settings();
        s.collect_max_scan = 120;

        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 10)
            .await
            .unwrap();

        assert!(got.is_empty());
        assert_eq!(got.bot_ignored, 120);
    }

    #[tokio::test]
    async fn empty_history_is_not_an_error() {
        let platform = FakePlatform::new();
        let s = settings();
        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 10)
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(got.bot_ignored, 0);
    }

    #[tokio::test]
    async fn own_messages_follow_the_self_policy() {
        let history = vec![human(1, 30, "a"), own(2, 20), bot(3, 10)];

        let platform = FakePlatform::new().with_history(history.clone());
        let s = settings();
        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 10)
            .await
            .unwrap();
        assert_eq!(got.messages.len(), 1);
        assert_eq!(got.bot_ignored, 2);

        let platform = FakePlatform::new().with_history(history);
        let mut s = settings();
        s.self_messages = SelfMessagePolicy::Include;
        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 10)
            .await
            .unwrap();
        let ids: Vec<u64> = got.messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(got.bot_ignored, 1);
    }

    #[tokio::test]
    async fn bots_beyond_the_target_are_not_counted() {
        let history = vec![bot(1, 40), human(2, 30, "a"), bot(3, 20), human(4, 10, "b")];
        let platform = FakePlatform::new().with_history(history);
        let s = settings();

        let got = MessageCollector::new(&platform, &s)
            .collect(SOURCE, 1)
            .await
            .unwrap();
        let ids: Vec<u64> = got.messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![4]);
        assert_eq!(got.bot_ignored, 0);
    }

    #[tokio::test]
    async fn history_newer_than_the_cursor_is_ignored() {
        // The bot's own reply to the invocation lands after the cursor.
        let history = vec![human(1, 30, "a"), human(2, 20, "b"), own(5, 0)];
        let platform = FakePlatform::new().with_history(history);
        let mut s = settings();
        s.self_messages = SelfMessagePolicy::Include;

        let got = MessageCollector::new(&platform, &s)
            .collect_before(SOURCE, 10, Some(MessageId(4)))
            .await
            .unwrap();

        let ids: Vec<u64> = got.messages.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(got.bot_ignored, 0);
        assert_eq!(
            platform.calls()[0],
            Call::History {
                before: Some(MessageId(4)),
                limit: 30
            }
        );
    }
}
