//! In-memory `ChatPlatform` used by the unit tests. Records every call.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    domain::{
        Attachment, Author, ChannelId, MessageId, SourceMessage, ThreadHandle, ThreadOwnership,
        UserId,
    },
    errors::Error,
    messaging::{
        port::{ChatPlatform, InvocationContext},
        types::{OutgoingMessage, PlatformCapabilities, ReportDelivery},
    },
    Result,
};

pub(crate) const BOT_USER: UserId = UserId(9000);
pub(crate) const SOURCE: ChannelId = ChannelId(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FakeError {
    Permission,
    NotFound,
    Other,
}

impl FakeError {
    fn into_error(self, what: &str) -> Error {
        match self {
            FakeError::Permission => Error::PermissionDenied(format!("missing permissions: {what}")),
            FakeError::NotFound => Error::NotFound(format!("unknown: {what}")),
            FakeError::Other => Error::Platform(format!("boom: {what}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    History {
        before: Option<MessageId>,
        limit: usize,
    },
    FetchAttachment(String),
    Send {
        channel: ChannelId,
        content: String,
        files: Vec<String>,
    },
    Delete {
        channel: ChannelId,
        message: MessageId,
    },
    BulkDelete {
        channel: ChannelId,
        messages: Vec<MessageId>,
    },
    ActiveThreads,
    CreateFromMessage {
        anchor: MessageId,
        name: String,
    },
    CreatePrivate {
        name: String,
    },
    CanDelete,
}

pub(crate) struct FakePlatform {
    pub caps: PlatformCapabilities,
    pub now: DateTime<Utc>,
    /// Newest first, like the platform returns it.
    history: Vec<SourceMessage>,
    threads: Vec<ThreadHandle>,
    pub calls: Mutex<Vec<Call>>,
    pub can_delete: Mutex<std::result::Result<bool, FakeError>>,
    pub scramble_pages: bool,
    pub fail_history: bool,
    pub fail_thread_create: bool,
    pub fail_send_containing: Vec<String>,
    pub fail_attachment_urls: Vec<String>,
    pub delete_errors: HashMap<MessageId, FakeError>,
    pub bulk_errors: Mutex<Vec<FakeError>>,
    next_id: Mutex<u64>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            caps: PlatformCapabilities::discord(),
            now: fake_now(),
            history: Vec::new(),
            threads: Vec::new(),
            calls: Mutex::new(Vec::new()),
            can_delete: Mutex::new(Ok(true)),
            scramble_pages: false,
            fail_history: false,
            fail_thread_create: false,
            fail_send_containing: Vec::new(),
            fail_attachment_urls: Vec::new(),
            delete_errors: HashMap::new(),
            bulk_errors: Mutex::new(Vec::new()),
            next_id: Mutex::new(100_000),
        }
    }

    /// Replace the channel history. Input may be in any order.
    pub fn with_history(mut self, mut messages: Vec<SourceMessage>) -> Self {
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        self.history = messages;
        self
    }

    pub fn with_thread(mut self, thread: ThreadHandle) -> Self {
        self.threads.push(thread);
        self
    }

    pub fn set_can_delete(&self, v: std::result::Result<bool, FakeError>) {
        *self.can_delete.lock().unwrap() = v;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends_to(&self, channel: ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send {
                    channel: ch,
                    content,
                    ..
                } if ch == channel => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn alloc(&self) -> u64 {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        *guard
    }

    fn thread(&self, name: &str) -> ThreadHandle {
        let id = self.alloc();
        ThreadHandle {
            id: ChannelId(id),
            name: name.to_string(),
            archived: false,
            jump_url: format!("https://discord.com/channels/1/{id}"),
            ownership: ThreadOwnership::Created,
        }
    }
}

pub(crate) fn fake_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

/// A human-authored message `minutes_ago` minutes before the fake clock.
/// Ids grow with creation time, like snowflakes.
pub(crate) fn human(id: u64, minutes_ago: i64, text: &str) -> SourceMessage {
    message(id, minutes_ago, text, false)
}

pub(crate) fn bot(id: u64, minutes_ago: i64) -> SourceMessage {
    message(id, minutes_ago, "beep", true)
}

pub(crate) fn message(id: u64, minutes_ago: i64, text: &str, is_bot: bool) -> SourceMessage {
    let now = fake_now();
    let author_id = if is_bot { 77 } else { 10 + id % 3 };
    SourceMessage {
        id: MessageId(id),
        author: Author {
            id: UserId(author_id),
            display_name: format!("user{author_id}"),
            mention: format!("<@{author_id}>"),
            is_bot,
        },
        created_at: now - Duration::minutes(minutes_ago),
        content: if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        },
        attachments: Vec::new(),
        embed_count: 0,
    }
}

pub(crate) fn attachment(name: &str) -> Attachment {
    Attachment {
        filename: name.to_string(),
        url: format!("https://cdn.example/{name}"),
        size: 1024,
    }
}

pub(crate) fn existing_thread(id: u64, name: &str, archived: bool) -> ThreadHandle {
    ThreadHandle {
        id: ChannelId(id),
        name: name.to_string(),
        archived,
        jump_url: format!("https://discord.com/channels/1/{id}"),
        ownership: ThreadOwnership::Borrowed,
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        self.caps
    }

    async fn current_user(&self) -> Result<UserId> {
        Ok(BOT_USER)
    }

    async fn fetch_history(
        &self,
        _channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        self.record(Call::History { before, limit });
        if self.fail_history {
            return Err(Error::Platform("history unavailable".to_string()));
        }
        let mut page: Vec<SourceMessage> = self
            .history
            .iter()
            .filter(|m| before.map(|b| m.id < b).unwrap_or(true))
            .take(limit.min(self.caps.history_page_limit))
            .cloned()
            .collect();
        if self.scramble_pages {
            page.reverse();
            let mid = page.len() / 2;
            page.rotate_left(mid);
        }
        Ok(page)
    }

    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        self.record(Call::FetchAttachment(attachment.url.clone()));
        if self.fail_attachment_urls.contains(&attachment.url) {
            return Err(Error::Platform("cdn timeout".to_string()));
        }
        Ok(attachment.filename.as_bytes().to_vec())
    }

    async fn send_message(&self, channel: ChannelId, msg: OutgoingMessage) -> Result<MessageId> {
        self.record(Call::Send {
            channel,
            content: msg.content.clone(),
            files: msg.files.iter().map(|f| f.filename.clone()).collect(),
        });
        if self
            .fail_send_containing
            .iter()
            .any(|needle| msg.content.contains(needle.as_str()))
        {
            return Err(Error::Platform("send rejected".to_string()));
        }
        Ok(MessageId(self.alloc()))
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.record(Call::Delete { channel, message });
        match self.delete_errors.get(&message) {
            Some(e) => Err(e.into_error(&message.to_string())),
            None => Ok(()),
        }
    }

    async fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()> {
        self.record(Call::BulkDelete {
            channel,
            messages: messages.to_vec(),
        });
        let next = {
            let mut errs = self.bulk_errors.lock().unwrap();
            if errs.is_empty() {
                None
            } else {
                Some(errs.remove(0))
            }
        };
        match next {
            Some(e) => Err(e.into_error("bulk")),
            None => Ok(()),
        }
    }

    async fn active_threads(&self, _channel: ChannelId) -> Result<Vec<ThreadHandle>> {
        self.record(Call::ActiveThreads);
        Ok(self.threads.clone())
    }

    async fn create_thread_from_message(
        &self,
        _channel: ChannelId,
        anchor: MessageId,
        name: &str,
    ) -> Result<ThreadHandle> {
        self.record(Call::CreateFromMessage {
            anchor,
            name: name.to_string(),
        });
        if self.fail_thread_create {
            return Err(Error::Platform("thread create failed".to_string()));
        }
        Ok(self.thread(name))
    }

    async fn create_private_thread(&self, _channel: ChannelId, name: &str) -> Result<ThreadHandle> {
        self.record(Call::CreatePrivate {
            name: name.to_string(),
        });
        if self.fail_thread_create {
            return Err(Error::Platform("thread create failed".to_string()));
        }
        Ok(self.thread(name))
    }

    async fn can_delete_messages(&self, _channel: ChannelId) -> Result<bool> {
        self.record(Call::CanDelete);
        let state = *self.can_delete.lock().unwrap();
        state.map_err(|e| e.into_error("permission check"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Interaction {
    Ack { ephemeral: bool },
    Report { text: String, delivery: ReportDelivery },
    Retract,
}

#[derive(Default)]
pub(crate) struct FakeInvocation {
    pub events: Mutex<Vec<Interaction>>,
    pub fail_ack: bool,
}

impl FakeInvocation {
    pub fn events(&self) -> Vec<Interaction> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvocationContext for FakeInvocation {
    async fn acknowledge(&self, ephemeral: bool) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(Interaction::Ack { ephemeral });
        if self.fail_ack {
            return Err(Error::Platform("interaction expired".to_string()));
        }
        Ok(())
    }

    async fn report(&self, text: &str, delivery: ReportDelivery) -> Result<()> {
        self.events.lock().unwrap().push(Interaction::Report {
            text: text.to_string(),
            delivery,
        });
        Ok(())
    }

    async fn retract_acknowledgment(&self) -> Result<()> {
        self.events.lock().unwrap().push(Interaction::Retract);
        Ok(())
    }
}
