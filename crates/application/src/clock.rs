use chrono::{DateTime, FixedOffset, Utc};
use domain::TIMESTAMP_FORMAT;

use crate::error::ApplicationError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// 按消息时间戳格式输出当前时间
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// 固定时区的系统时钟
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    offset: FixedOffset,
}

impl ZonedClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ApplicationError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
            .ok_or_else(|| {
                ApplicationError::configuration(format!("invalid utc offset: {minutes} minutes"))
            })
    }
}

impl Clock for ZonedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}
