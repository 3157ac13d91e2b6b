//! Streaming decisions derived from UI and device state.
//!
//! Every function here is pure: the host pushes a fresh [`PolicyInputs`]
//! whenever a flag changes and reapplies the resulting [`StreamingDecision`]
//! if it differs from the last one.

/// Tabs of the host's control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    Visualization,
    Gestures,
    Games,
    Settings,
}

/// Current host state relevant to streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyInputs {
    pub device_connected: bool,
    pub motion_permission_granted: bool,
    pub panel_visible: bool,
    pub active_tab: PanelTab,
    pub graph_playing: bool,
    pub gesture_tester_active: bool,
    pub calibration_capturing: bool,
    pub control_mode_enabled: bool,
    pub has_profile: bool,
    pub prompt_target_available: bool,
}

bitflags::bitflags! {
    /// Features currently wanting motion samples.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Consumers: u8 {
        const VISUALIZATION  = 1 << 0;
        const GESTURE_TESTER = 1 << 1;
        const CALIBRATION    = 1 << 2;
        const CONTROL_MODE   = 1 << 3;
        const GAMES          = 1 << 4;
    }
}

impl Consumers {
    /// Highest preferred sample rate among the set, `None` when empty.
    pub fn preferred_rate_hz(&self) -> Option<u32> {
        self.iter()
            .map(|consumer| match consumer {
                Consumers::VISUALIZATION | Consumers::GAMES => 45,
                Consumers::CALIBRATION => 40,
                Consumers::GESTURE_TESTER => 30,
                _ => 20,
            })
            .max()
    }
}

/// Control mode only runs with a profile to detect against.
pub fn control_mode_effective(inputs: &PolicyInputs) -> bool {
    inputs.control_mode_enabled && inputs.has_profile
}

/// Which features currently justify streaming.
///
/// Empty whenever the device is gone or motion permission is denied.
pub fn active_consumers(inputs: &PolicyInputs) -> Consumers {
    let mut consumers = Consumers::empty();
    if !inputs.device_connected || !inputs.motion_permission_granted {
        return consumers;
    }

    if inputs.calibration_capturing {
        consumers |= Consumers::CALIBRATION;
    }
    if control_mode_effective(inputs) && inputs.prompt_target_available {
        consumers |= Consumers::CONTROL_MODE;
    }
    if inputs.panel_visible {
        match inputs.active_tab {
            PanelTab::Visualization if inputs.graph_playing => {
                consumers |= Consumers::VISUALIZATION;
            }
            PanelTab::Gestures if inputs.gesture_tester_active => {
                consumers |= Consumers::GESTURE_TESTER;
            }
            PanelTab::Games => consumers |= Consumers::GAMES,
            _ => {}
        }
    }
    consumers
}

pub fn should_stream(inputs: &PolicyInputs) -> bool {
    !active_consumers(inputs).is_empty()
}

/// Rate to request from the sensor, `None` when nothing is streaming.
pub fn sample_rate_hz(inputs: &PolicyInputs) -> Option<u32> {
    active_consumers(inputs).preferred_rate_hz()
}

/// Whether smoothed poses should be pushed to the UI.
pub fn should_publish_visuals(inputs: &PolicyInputs) -> bool {
    active_consumers(inputs).intersects(Consumers::VISUALIZATION | Consumers::GAMES)
}

/// Whether samples should go through the gesture detector.
pub fn should_analyze_gestures(inputs: &PolicyInputs) -> bool {
    let consumers = active_consumers(inputs);
    consumers.intersects(Consumers::GESTURE_TESTER | Consumers::CONTROL_MODE)
        || (!consumers.is_empty() && control_mode_effective(inputs))
}

/// The pose filter runs in its fast range while the graph is live.
pub fn live_graph_active(inputs: &PolicyInputs) -> bool {
    active_consumers(inputs).contains(Consumers::VISUALIZATION)
}

/// Everything the host needs to apply after an input change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingDecision {
    pub consumers: Consumers,
    pub stream: bool,
    pub sample_rate_hz: Option<u32>,
    pub publish_visuals: bool,
    pub analyze_gestures: bool,
    pub live_graph: bool,
    pub control_mode_effective: bool,
}

pub fn decide(inputs: &PolicyInputs) -> StreamingDecision {
    let decision = StreamingDecision {
        consumers: active_consumers(inputs),
        stream: should_stream(inputs),
        sample_rate_hz: sample_rate_hz(inputs),
        publish_visuals: should_publish_visuals(inputs),
        analyze_gestures: should_analyze_gestures(inputs),
        live_graph: live_graph_active(inputs),
        control_mode_effective: control_mode_effective(inputs),
    };
    log::trace!("Streaming decision: {:?}", decision);
    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> PolicyInputs {
        PolicyInputs {
            device_connected: true,
            motion_permission_granted: true,
            ..PolicyInputs::default()
        }
    }

    #[test]
    fn test_idle_when_nothing_wants_samples() {
        let inputs = connected();
        let decision = decide(&inputs);
        assert!(!decision.stream);
        assert_eq!(decision.sample_rate_hz, None);
        assert!(decision.consumers.is_empty());
    }

    #[test]
    fn test_calibration_forces_streaming() {
        let inputs = PolicyInputs {
            calibration_capturing: true,
            ..connected()
        };
        let decision = decide(&inputs);
        assert!(decision.stream);
        assert_eq!(decision.sample_rate_hz, Some(40));
        assert!(!decision.publish_visuals);
        assert!(!decision.analyze_gestures);
    }

    #[test]
    fn test_disconnect_or_denied_permission_wins() {
        let busy = PolicyInputs {
            panel_visible: true,
            graph_playing: true,
            calibration_capturing: true,
            control_mode_enabled: true,
            has_profile: true,
            prompt_target_available: true,
            ..connected()
        };
        assert!(should_stream(&busy));

        let disconnected = PolicyInputs {
            device_connected: false,
            ..busy
        };
        let denied = PolicyInputs {
            motion_permission_granted: false,
            ..busy
        };
        for inputs in [disconnected, denied] {
            assert!(!should_stream(&inputs));
            assert_eq!(sample_rate_hz(&inputs), None);
            assert!(!should_analyze_gestures(&inputs));
        }
    }

    #[test]
    fn test_visualization_needs_visible_playing_graph() {
        let playing = PolicyInputs {
            panel_visible: true,
            active_tab: PanelTab::Visualization,
            graph_playing: true,
            ..connected()
        };
        let decision = decide(&playing);
        assert!(decision.stream && decision.publish_visuals && decision.live_graph);
        assert_eq!(decision.sample_rate_hz, Some(45));

        let paused = PolicyInputs {
            graph_playing: false,
            ..playing
        };
        assert!(!should_stream(&paused));

        let hidden = PolicyInputs {
            panel_visible: false,
            ..playing
        };
        assert!(!should_stream(&hidden));
    }

    #[test]
    fn test_gesture_tester_streams_at_30hz() {
        let inputs = PolicyInputs {
            panel_visible: true,
            active_tab: PanelTab::Gestures,
            gesture_tester_active: true,
            ..connected()
        };
        assert_eq!(sample_rate_hz(&inputs), Some(30));
        assert!(should_analyze_gestures(&inputs));
        assert!(!should_publish_visuals(&inputs));
    }

    #[test]
    fn test_control_mode_requires_profile_and_target() {
        let armed = PolicyInputs {
            control_mode_enabled: true,
            has_profile: true,
            prompt_target_available: true,
            ..connected()
        };
        assert!(control_mode_effective(&armed));
        assert_eq!(sample_rate_hz(&armed), Some(20));
        assert!(should_analyze_gestures(&armed));

        let no_profile = PolicyInputs {
            has_profile: false,
            ..armed
        };
        assert!(!control_mode_effective(&no_profile));
        assert!(!should_stream(&no_profile));

        let no_target = PolicyInputs {
            prompt_target_available: false,
            ..armed
        };
        assert!(!should_stream(&no_target));
    }

    #[test]
    fn test_control_mode_analyzes_while_streaming_for_others() {
        let inputs = PolicyInputs {
            panel_visible: true,
            active_tab: PanelTab::Games,
            control_mode_enabled: true,
            has_profile: true,
            ..connected()
        };
        assert!(should_analyze_gestures(&inputs));
        assert!(should_publish_visuals(&inputs));
        assert!(!live_graph_active(&inputs));
    }

    #[test]
    fn test_rate_is_max_of_active_consumers() {
        let inputs = PolicyInputs {
            panel_visible: true,
            active_tab: PanelTab::Visualization,
            graph_playing: true,
            calibration_capturing: true,
            control_mode_enabled: true,
            has_profile: true,
            prompt_target_available: true,
            ..connected()
        };
        let consumers = active_consumers(&inputs);
        assert_eq!(
            consumers,
            Consumers::VISUALIZATION | Consumers::CALIBRATION | Consumers::CONTROL_MODE
        );
        assert_eq!(sample_rate_hz(&inputs), Some(45));
        assert_eq!(Consumers::empty().preferred_rate_hz(), None);
        assert_eq!(Consumers::CONTROL_MODE.preferred_rate_hz(), Some(20));
    }

    #[test]
    fn test_settings_tab_is_idle() {
        let inputs = PolicyInputs {
            panel_visible: true,
            active_tab: PanelTab::Settings,
            graph_playing: true,
            gesture_tester_active: true,
            ..connected()
        };
        assert!(!should_stream(&inputs));
    }

    #[test]
    fn test_decision_changes_only_with_inputs() {
        let a = PolicyInputs {
            calibration_capturing: true,
            ..connected()
        };
        assert_eq!(decide(&a), decide(&a));
        let b = PolicyInputs {
            calibration_capturing: false,
            ..a
        };
        assert_ne!(decide(&a), decide(&b));
    }
}
