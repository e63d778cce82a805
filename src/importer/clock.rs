// ==========================================
// 实体导入系统 - 时钟
// ==========================================
// 用途: 派生时间戳字段 / 模板中的日期替换
// 说明: 可注入，测试使用固定或步进时钟
// ==========================================

use chrono::{DateTime, Local, TimeZone};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    /// 当前时间（Unix 秒）
    fn now_timestamp(&self) -> i64;

    /// 当前本地时间
    fn now_local(&self) -> DateTime<Local> {
        Local
            .timestamp_opt(self.now_timestamp(), 0)
            .single()
            .unwrap_or_else(Local::now)
    }
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_timestamp(&self) -> i64 {
        Local::now().timestamp()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 步进时钟：每次读取后前进 step 秒
#[derive(Debug)]
pub struct SteppingClock {
    next: AtomicI64,
    step: i64,
}

impl SteppingClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            step,
        }
    }

    /// 固定时钟
    pub fn fixed(at: i64) -> Self {
        Self::new(at, 0)
    }
}

impl Clock for SteppingClock {
    fn now_timestamp(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_clock() {
        let clock = SteppingClock::new(100, 10);
        assert_eq!(clock.now_timestamp(), 100);
        assert_eq!(clock.now_timestamp(), 110);

        let fixed = SteppingClock::fixed(5);
        assert_eq!(fixed.now_timestamp(), 5);
        assert_eq!(fixed.now_timestamp(), 5);
    }
}
