use crate::{
    domain::{ChannelId, MessageId, ThreadSpec, Visibility},
    errors::Error,
    messaging::types::ReportDelivery,
    Result,
};

/// A validated migration request. Only constructible through [`MigrationRequest::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationRequest {
    channel: ChannelId,
    count: usize,
    thread: ThreadSpec,
    response: Visibility,
    silent: bool,
    /// Only history strictly older than this is collected. Set to the
    /// invocation's own id so the bot's reply never counts as history.
    history_before: Option<MessageId>,
}

impl MigrationRequest {
    pub fn new(
        channel: ChannelId,
        count: i64,
        max_count: u32,
        thread: ThreadSpec,
        response: Visibility,
        silent: bool,
    ) -> Result<Self> {
        if count < 1 || count > max_count as i64 {
            return Err(Error::InvalidRequest(format!(
                "count must be between 1 and {max_count}, got {count}"
            )));
        }
        Ok(Self {
            channel,
            count: count as usize,
            thread,
            response,
            silent,
            history_before: None,
        })
    }

    pub fn with_history_before(mut self, cursor: MessageId) -> Self {
        self.history_before = Some(cursor);
        self
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn thread(&self) -> &ThreadSpec {
        &self.thread
    }

    pub fn response(&self) -> Visibility {
        self.response
    }

    pub fn silent(&self) -> bool {
        self.silent
    }

    pub fn history_before(&self) -> Option<MessageId> {
        self.history_before
    }
}

/// How the invocation is acknowledged and answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponsePlan {
    pub ack_ephemeral: bool,
    pub delivery: ReportDelivery,
    pub retract_ack: bool,
}

impl ResponsePlan {
    pub fn for_request(req: &MigrationRequest) -> Self {
        match (req.response(), req.silent()) {
            (Visibility::Private, _) => Self {
                ack_ephemeral: true,
                delivery: ReportDelivery::EditAcknowledgment,
                retract_ack: false,
            },
            (Visibility::Public, false) => Self {
                ack_ephemeral: false,
                delivery: ReportDelivery::EditAcknowledgment,
                retract_ack: false,
            },
            // Silent public: keep the command banner out of the channel and
            // post the report as a plain message instead.
            (Visibility::Public, true) => Self {
                ack_ephemeral: true,
                delivery: ReportDelivery::Broadcast,
                retract_ack: true,
            },
        }
    }
}
