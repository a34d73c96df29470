//! Eye-closure drowsiness state machine
//!
//! [`transition`] is a pure function of the previous state, the previous
//! alert level, one frame's eye reading and the sample time. It returns the
//! next state together with edge events; [`plan_commands`] turns those events
//! into alert channel commands. Nothing here touches a device or a clock.

use alerting::{AlertChannel, AlertCommand, ChannelStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DmsConfig;
use crate::frame::EyeReading;
use crate::state::{AlertLevel, DrowsinessState};

/// Open/closed classification of both eyes for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeState {
    pub left_open: bool,
    pub right_open: bool,
}

impl EyeState {
    /// Each eye is open when its score is strictly above `threshold`
    pub fn classify(left: f32, right: f32, threshold: f32) -> Self {
        Self {
            left_open: left > threshold,
            right_open: right > threshold,
        }
    }

    /// One open eye is enough to cancel a closed run
    pub fn both_closed(&self) -> bool {
        !self.left_open && !self.right_open
    }
}

/// Edge-triggered drowsiness events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessEvent {
    /// Closed duration crossed the mild threshold
    EnteredMild,
    /// Closed duration crossed the severe threshold
    EnteredSevere,
    /// Eyes reopened after a closed run
    AlertsOff,
}

/// Result of evaluating one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: DrowsinessState,
    pub level: AlertLevel,
    /// Eye classification, `None` when the frame was skipped
    pub eyes: Option<EyeState>,
    /// Length of the current closed run at this frame (also reported on
    /// skipped frames while a run is in progress)
    pub closed_ms: Option<u64>,
    pub events: Vec<DrowsinessEvent>,
}

impl Step {
    /// The frame carried no usable openness scores
    pub fn is_skipped(&self) -> bool {
        self.eyes.is_none()
    }
}

/// Alert level for a closed duration
pub fn band(config: &DmsConfig, closed_ms: u64) -> AlertLevel {
    if closed_ms >= config.severe_after_ms {
        AlertLevel::Severe
    } else if closed_ms >= config.mild_after_ms {
        AlertLevel::Mild
    } else {
        AlertLevel::None
    }
}

/// Evaluate one frame.
///
/// A reading with either eye uncomputed leaves state and level untouched.
/// Within a closed run the level only rises, so a clock glitch can hold it
/// but never drops Severe back to Mild.
pub fn transition(
    config: &DmsConfig,
    state: DrowsinessState,
    level: AlertLevel,
    reading: EyeReading,
    now_ms: u64,
) -> Step {
    let Some((left, right)) = reading.scores() else {
        return Step {
            state,
            level,
            eyes: None,
            closed_ms: state.closed_for(now_ms),
            events: Vec::new(),
        };
    };

    let eyes = EyeState::classify(left, right, config.eye_open_threshold);

    match (eyes.both_closed(), state) {
        (true, DrowsinessState::Awake) => Step {
            state: DrowsinessState::EyesClosed { since_ms: now_ms },
            level: AlertLevel::None,
            eyes: Some(eyes),
            closed_ms: Some(0),
            events: Vec::new(),
        },
        (true, DrowsinessState::EyesClosed { since_ms }) => {
            let closed_ms = now_ms.saturating_sub(since_ms);
            let next = band(config, closed_ms).max(level);

            let mut events = Vec::new();
            if next != level {
                match next {
                    AlertLevel::Severe => events.push(DrowsinessEvent::EnteredSevere),
                    AlertLevel::Mild => events.push(DrowsinessEvent::EnteredMild),
                    AlertLevel::None => {}
                }
            }

            Step {
                state,
                level: next,
                eyes: Some(eyes),
                closed_ms: Some(closed_ms),
                events,
            }
        }
        (false, DrowsinessState::EyesClosed { .. }) => Step {
            state: DrowsinessState::Awake,
            level: AlertLevel::None,
            eyes: Some(eyes),
            closed_ms: None,
            events: vec![DrowsinessEvent::AlertsOff],
        },
        (false, DrowsinessState::Awake) => Step {
            state: DrowsinessState::Awake,
            level: AlertLevel::None,
            eyes: Some(eyes),
            closed_ms: None,
            events: Vec::new(),
        },
    }
}

/// Translate events into alert commands given what is currently playing.
///
/// - Severe: silence Mild, then start Severe, unless Severe already plays.
///   With the Severe device unavailable, Mild plays instead.
/// - Mild: start only if neither channel plays.
/// - Alerts off: stop and rewind both, whatever was active.
pub fn plan_commands(events: &[DrowsinessEvent], mut status: ChannelStatus) -> Vec<AlertCommand> {
    let mut commands = Vec::new();

    for event in events {
        match event {
            DrowsinessEvent::EnteredSevere => {
                if status.severe_ready {
                    if !status.severe_playing {
                        commands.push(AlertCommand::StopAndRewind(AlertChannel::Mild));
                        commands.push(AlertCommand::Start(AlertChannel::Severe));
                        status.mild_playing = false;
                        status.severe_playing = true;
                    }
                } else if !status.mild_playing {
                    commands.push(AlertCommand::Start(AlertChannel::Mild));
                    status.mild_playing = true;
                }
            }
            DrowsinessEvent::EnteredMild => {
                if !status.mild_playing && !status.severe_playing {
                    commands.push(AlertCommand::Start(AlertChannel::Mild));
                    status.mild_playing = true;
                }
            }
            DrowsinessEvent::AlertsOff => {
                commands.push(AlertCommand::StopAndRewind(AlertChannel::Mild));
                commands.push(AlertCommand::StopAndRewind(AlertChannel::Severe));
                status.mild_playing = false;
                status.severe_playing = false;
            }
        }
    }

    commands
}

/// Stateful wrapper that threads [`DrowsinessState`] through [`transition`]
#[derive(Debug, Clone)]
pub struct DrowsinessMonitor {
    config: DmsConfig,
    state: DrowsinessState,
    level: AlertLevel,
}

impl DrowsinessMonitor {
    pub fn new(config: DmsConfig) -> Self {
        Self {
            config,
            state: DrowsinessState::default(),
            level: AlertLevel::default(),
        }
    }

    /// Evaluate one frame sampled at `now_ms`
    pub fn step(&mut self, reading: EyeReading, now_ms: u64) -> Step {
        let step = transition(&self.config, self.state, self.level, reading, now_ms);

        if step.is_skipped() {
            debug!("Eye openness uncomputed, holding drowsiness state");
        } else if let Some(closed_ms) = step.closed_ms.filter(|_| self.state.eyes_closed()) {
            debug!("Eyes closed for: {}ms", closed_ms);
        }

        if step.level != self.level {
            info!(from = ?self.level, to = ?step.level, "Drowsiness level changed");
        }

        self.state = step.state;
        self.level = step.level;
        step
    }

    pub fn state(&self) -> DrowsinessState {
        self.state
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Forget any closed run (on driver change)
    pub fn reset(&mut self) {
        self.state = DrowsinessState::default();
        self.level = AlertLevel::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLOSED: EyeReading = EyeReading {
        left: Some(0.1),
        right: Some(0.2),
    };
    const OPEN: EyeReading = EyeReading {
        left: Some(0.9),
        right: Some(0.8),
    };
    const DROPOUT: EyeReading = EyeReading {
        left: None,
        right: Some(0.1),
    };

    fn monitor() -> DrowsinessMonitor {
        DrowsinessMonitor::new(DmsConfig::default())
    }

    #[test]
    fn test_first_closed_frame_starts_run() {
        let mut monitor = monitor();
        let step = monitor.step(CLOSED, 1_000);

        assert_eq!(step.state, DrowsinessState::EyesClosed { since_ms: 1_000 });
        assert_eq!(step.level, AlertLevel::None);
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_escalation_through_bands() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 0);

        assert_eq!(monitor.step(CLOSED, 2_999).level, AlertLevel::None);

        let mild = monitor.step(CLOSED, 3_000);
        assert_eq!(mild.level, AlertLevel::Mild);
        assert_eq!(mild.events, vec![DrowsinessEvent::EnteredMild]);

        // Same band, no repeated edge
        assert!(monitor.step(CLOSED, 5_000).events.is_empty());

        let severe = monitor.step(CLOSED, 8_000);
        assert_eq!(severe.level, AlertLevel::Severe);
        assert_eq!(severe.events, vec![DrowsinessEvent::EnteredSevere]);
        assert!(monitor.step(CLOSED, 20_000).events.is_empty());
    }

    #[test]
    fn test_one_open_eye_cancels_run() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 0);
        monitor.step(CLOSED, 4_000);

        let step = monitor.step(EyeReading::new(0.1, 0.51), 4_100);
        assert_eq!(step.state, DrowsinessState::Awake);
        assert_eq!(step.level, AlertLevel::None);
        assert_eq!(step.events, vec![DrowsinessEvent::AlertsOff]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let eyes = EyeState::classify(0.5, 0.5, 0.5);
        assert!(eyes.both_closed());
    }

    #[test]
    fn test_alerts_off_even_without_alert() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 0);
        let step = monitor.step(OPEN, 500);
        assert_eq!(step.events, vec![DrowsinessEvent::AlertsOff]);

        // Already awake: nothing to switch off
        assert!(monitor.step(OPEN, 600).events.is_empty());
    }

    #[test]
    fn test_dropout_freezes_state() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 0);
        monitor.step(CLOSED, 3_500);

        let step = monitor.step(DROPOUT, 9_000);
        assert!(step.is_skipped());
        assert_eq!(step.closed_ms, Some(9_000));
        assert_eq!(step.level, AlertLevel::Mild);
        assert_eq!(step.state, DrowsinessState::EyesClosed { since_ms: 0 });
        assert!(step.events.is_empty());

        // Dropout while awake does not open a run either
        let mut awake = self::monitor();
        let step = awake.step(DROPOUT, 0);
        assert_eq!(awake.state(), DrowsinessState::Awake);
        assert_eq!(step.closed_ms, None);
    }

    #[test]
    fn test_level_never_regresses_within_run() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 10_000);
        monitor.step(CLOSED, 18_000);
        assert_eq!(monitor.level(), AlertLevel::Severe);

        // Clock stepped backwards
        let step = monitor.step(CLOSED, 14_000);
        assert_eq!(step.level, AlertLevel::Severe);
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_jump_straight_to_severe() {
        let mut monitor = monitor();
        monitor.step(CLOSED, 0);
        let step = monitor.step(CLOSED, 9_000);
        assert_eq!(step.events, vec![DrowsinessEvent::EnteredSevere]);
    }

    #[test]
    fn test_plan_severe_silences_mild() {
        let status = ChannelStatus {
            mild_playing: true,
            ..ChannelStatus::idle()
        };
        assert_eq!(
            plan_commands(&[DrowsinessEvent::EnteredSevere], status),
            vec![
                AlertCommand::StopAndRewind(AlertChannel::Mild),
                AlertCommand::Start(AlertChannel::Severe),
            ]
        );
    }

    #[test]
    fn test_plan_skips_playing_channels() {
        let severe = ChannelStatus {
            severe_playing: true,
            ..ChannelStatus::idle()
        };
        assert!(plan_commands(&[DrowsinessEvent::EnteredMild], severe).is_empty());
        assert!(plan_commands(&[DrowsinessEvent::EnteredSevere], severe).is_empty());

        let mild = ChannelStatus {
            mild_playing: true,
            ..ChannelStatus::idle()
        };
        assert!(plan_commands(&[DrowsinessEvent::EnteredMild], mild).is_empty());
    }

    #[test]
    fn test_plan_keeps_mild_when_severe_unavailable() {
        let status = ChannelStatus {
            mild_playing: true,
            severe_ready: false,
            ..ChannelStatus::idle()
        };
        assert!(plan_commands(&[DrowsinessEvent::EnteredSevere], status).is_empty());

        // Jumped straight past Mild: Mild stands in for the missing Severe
        let status = ChannelStatus {
            severe_ready: false,
            ..ChannelStatus::idle()
        };
        assert_eq!(
            plan_commands(&[DrowsinessEvent::EnteredSevere], status),
            vec![AlertCommand::Start(AlertChannel::Mild)]
        );
    }

    #[test]
    fn test_plan_alerts_off_stops_both() {
        assert_eq!(
            plan_commands(&[DrowsinessEvent::AlertsOff], ChannelStatus::default()),
            vec![
                AlertCommand::StopAndRewind(AlertChannel::Mild),
                AlertCommand::StopAndRewind(AlertChannel::Severe),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_level_depends_only_on_duration(
            start in 0u64..1_000_000,
            interval in 1u64..500,
            duration in 0u64..12_000,
        ) {
            let config = DmsConfig::default();
            let mut monitor = DrowsinessMonitor::new(config.clone());

            let mut t = start;
            while t < start + duration {
                monitor.step(CLOSED, t);
                t += interval;
            }
            let last = monitor.step(CLOSED, start + duration);

            prop_assert_eq!(last.level, band(&config, duration));
        }

        #[test]
        fn prop_reopening_restarts_timer(
            first_run in 0u64..20_000,
            gap in 1u64..5_000,
            second_run in 0u64..12_000,
        ) {
            let config = DmsConfig::default();
            let mut monitor = DrowsinessMonitor::new(config.clone());

            monitor.step(CLOSED, 0);
            monitor.step(CLOSED, first_run);
            monitor.step(OPEN, first_run + gap);

            let restart = first_run + gap + 1;
            monitor.step(CLOSED, restart);
            let last = monitor.step(CLOSED, restart + second_run);

            prop_assert_eq!(last.state, DrowsinessState::EyesClosed { since_ms: restart });
            prop_assert_eq!(last.level, band(&config, second_run));
        }

        #[test]
        fn prop_dropout_frames_are_transparent(
            times in proptest::collection::vec(1u64..1_000, 1..40),
            dropouts in proptest::collection::vec(any::<bool>(), 40),
        ) {
            let mut clean = monitor();
            let mut noisy = monitor();
            clean.step(CLOSED, 0);
            noisy.step(CLOSED, 0);

            let mut t = 0;
            for (i, dt) in times.iter().enumerate() {
                t += dt;
                if dropouts[i] {
                    let before = noisy.level();
                    let step = noisy.step(DROPOUT, t);
                    prop_assert_eq!(step.level, before);
                    prop_assert_eq!(step.state, DrowsinessState::EyesClosed { since_ms: 0 });
                    t += 1;
                }
                clean.step(CLOSED, t);
                noisy.step(CLOSED, t);
                prop_assert_eq!(clean.level(), noisy.level());
                prop_assert_eq!(clean.state(), noisy.state());
            }
        }
    }
}
