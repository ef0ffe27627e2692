//! 播放状态机
//!
//! ```text
//!   Idle ──prepare──▶ Configured ──start──▶ Playing
//!    ▲                                         │
//!    └─────── stop / 设备报告播放结束 ─────────┘
//! ```
//!
//! 播放中不允许 prepare 或 run。
//!
//! 跟踪器只记录主机侧认为已下载到设备的内容。任何一步硬件交换失败时，
//! 状态保持不变；如果失败发生在已经改写设备之后，缓存会被作废，
//! 下一次 prepare 一定重新下载。

use crate::timeline::Timeline;

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// 采样表和周期已下载，未在播放
    Configured,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.pad("idle"),
            Self::Configured => f.pad("configured"),
            Self::Playing => f.pad("playing"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PlaybackTracker {
    state: PlaybackState,
    /// 最近一次成功下载所用的时长
    last_run_duration_us: Option<u64>,
    /// 上次下载后亮度表是否被修改
    intensity_changed: bool,
    timeline: Option<Timeline>,
    /// 模拟模式下播放开始的时钟读数
    started_at_us: Option<u64>,
}

impl PlaybackTracker {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn timeline(&self) -> Option<Timeline> {
        self.timeline
    }

    /// 以 `duration_us` 准备时是否需要重新下载
    pub fn needs_reload(&self, duration_us: u64) -> bool {
        self.intensity_changed || self.last_run_duration_us != Some(duration_us)
    }

    pub fn mark_intensity_changed(&mut self) {
        self.intensity_changed = true;
    }

    /// 周期和采样表都已被设备确认
    pub fn mark_loaded(&mut self, duration_us: u64, timeline: Timeline) {
        self.last_run_duration_us = Some(duration_us);
        self.intensity_changed = false;
        self.timeline = Some(timeline);
        if self.state == PlaybackState::Idle {
            self.state = PlaybackState::Configured;
        }
    }

    /// 设备上已有可用的下载内容（无需重载）
    pub fn mark_ready(&mut self) {
        if self.state == PlaybackState::Idle {
            self.state = PlaybackState::Configured;
        }
    }

    /// 设备内容与主机记录可能不一致，下次必须重新下载
    pub fn invalidate(&mut self) {
        self.last_run_duration_us = None;
        self.timeline = None;
    }

    pub fn mark_started(&mut self, now_us: u64) {
        self.state = PlaybackState::Playing;
        self.started_at_us = Some(now_us);
    }

    /// 停止或播放自然结束
    pub fn mark_finished(&mut self) {
        self.state = PlaybackState::Idle;
        self.started_at_us = None;
    }

    /// 模拟播放是否已经走完
    pub fn simulated_run_elapsed(&self, now_us: u64) -> bool {
        match (self.started_at_us, self.last_run_duration_us) {
            (Some(start), Some(duration)) => now_us.saturating_sub(start) >= duration,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: Timeline = Timeline {
        period: 2,
        samples_used: 50,
    };

    #[test]
    fn test_reload_decisions() {
        let mut tracker = PlaybackTracker::default();
        assert_eq!(tracker.state(), PlaybackState::Idle);
        assert!(tracker.needs_reload(10_000));

        tracker.mark_loaded(10_000, TIMELINE);
        assert_eq!(tracker.state(), PlaybackState::Configured);
        assert!(!tracker.needs_reload(10_000));
        assert!(tracker.needs_reload(20_000));

        tracker.mark_intensity_changed();
        assert!(tracker.needs_reload(10_000));

        tracker.mark_loaded(10_000, TIMELINE);
        tracker.invalidate();
        assert!(tracker.needs_reload(10_000));
        assert_eq!(tracker.state(), PlaybackState::Configured);
    }

    #[test]
    fn test_play_and_finish() {
        let mut tracker = PlaybackTracker::default();
        tracker.mark_loaded(10_000, TIMELINE);
        tracker.mark_started(1_000);
        assert!(tracker.is_playing());

        assert!(!tracker.simulated_run_elapsed(10_999));
        assert!(tracker.simulated_run_elapsed(11_000));

        tracker.mark_finished();
        assert_eq!(tracker.state(), PlaybackState::Idle);
        // 下载的内容仍然有效
        assert!(!tracker.needs_reload(10_000));
        tracker.mark_ready();
        assert_eq!(tracker.state(), PlaybackState::Configured);
    }
}
