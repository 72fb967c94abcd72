//! Visualization Session
//!
//! Composes a [`Sequencer`], a shared [`LayoutCache`] and a pattern
//! scenario. [`VisualizationSession::simulate_pattern_flow`] turns a
//! scenario's script into sequencer steps that each emit a [`FlowFrame`].

use crate::config::PlaybackConfig;
use crate::flow_style::{edge_style, EdgeStyle, MessageKind};
use crate::layout::{GraphLayout, LayoutCache, LayoutOptions};
use crate::patterns::PatternScenario;
use crate::scheduler::Scheduler;
use crate::sequencer::{PlaybackMode, RunState, Sequencer};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

/// What one step of a walkthrough changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowFrame {
    /// A message travels along an edge
    Message {
        step: usize,
        total: usize,
        from: String,
        to: String,
        kind: MessageKind,
        label: String,
        edge: EdgeStyle,
    },
    /// The walkthrough finished
    Completed { pattern: String, steps: usize },
}

type FrameListener = Rc<dyn Fn(&FlowFrame)>;

#[derive(Default)]
struct SessionState {
    frames: Vec<FlowFrame>,
    active_node: Option<String>,
    active_edge: Option<(String, String)>,
    pattern: Option<String>,
    listener: Option<FrameListener>,
}

/// One visualiser instance: playback, layout and frame log.
pub struct VisualizationSession {
    sequencer: Sequencer,
    layout_cache: Arc<LayoutCache>,
    layout: Option<Arc<GraphLayout>>,
    state: Rc<RefCell<SessionState>>,
}

impl VisualizationSession {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        playback: &PlaybackConfig,
        layout_cache: Arc<LayoutCache>,
    ) -> Self {
        let sequencer = Sequencer::new(scheduler).with_base_delay(playback.base_delay());
        sequencer.set_mode(playback.mode);
        sequencer.set_speed_factor(playback.speed_factor);

        Self {
            sequencer,
            layout_cache,
            layout: None,
            state: Rc::new(RefCell::new(SessionState::default())),
        }
    }

    /// Like [`new`](Self::new), with a listener for waiting-state changes.
    pub fn with_wait_listener(mut self, listener: impl Fn(bool) + 'static) -> Self {
        self.sequencer = self.sequencer.with_wait_listener(listener);
        self
    }

    /// Called with each frame as it is recorded.
    pub fn on_frame(&self, listener: impl Fn(&FlowFrame) + 'static) {
        self.state.borrow_mut().listener = Some(Rc::new(listener));
    }

    /// Reset playback and queue one step per scripted message plus a final
    /// completion step. Call [`start`](Self::start) to play.
    pub fn simulate_pattern_flow(&mut self, scenario: &PatternScenario, options: &LayoutOptions) {
        self.sequencer.reset();
        {
            let mut state = self.state.borrow_mut();
            state.frames.clear();
            state.active_node = None;
            state.active_edge = None;
            state.pattern = Some(scenario.id.to_string());
        }

        self.layout = Some(
            self.layout_cache
                .get_or_compute(&scenario.nodes(), &scenario.edges(), options),
        );

        let total = scenario.script().len();
        for (step, message) in scenario.script().iter().enumerate() {
            let state = Rc::clone(&self.state);
            let message = message.clone();
            self.sequencer.add_step(move || {
                let frame = FlowFrame::Message {
                    step,
                    total,
                    from: message.from.to_string(),
                    to: message.to.to_string(),
                    kind: message.kind,
                    label: message.label.to_string(),
                    edge: edge_style(message.kind, true),
                };
                {
                    let mut state = state.borrow_mut();
                    state.active_node = Some(message.from.to_string());
                    state.active_edge = Some((message.from.to_string(), message.to.to_string()));
                }
                emit(&state, frame);
            });
        }

        let state = Rc::clone(&self.state);
        let pattern = scenario.id.to_string();
        self.sequencer.add_step(move || {
            {
                let mut state = state.borrow_mut();
                state.active_edge = None;
                state.active_node = None;
            }
            info!(pattern = pattern.as_str(), steps = total, "Pattern walkthrough finished");
            emit(
                &state,
                FlowFrame::Completed {
                    pattern: pattern.clone(),
                    steps: total,
                },
            );
        });
    }

    pub fn start(&self) {
        self.sequencer.start();
    }

    pub fn advance(&self) {
        self.sequencer.advance_to_next_step();
    }

    pub fn stop(&self) {
        self.sequencer.stop();
    }

    /// Clear the queued walkthrough and its frames.
    pub fn reset(&mut self) {
        self.sequencer.reset();
        self.layout = None;
        let mut state = self.state.borrow_mut();
        state.frames.clear();
        state.active_node = None;
        state.active_edge = None;
        state.pattern = None;
    }

    pub fn set_mode(&self, mode: PlaybackMode) {
        self.sequencer.set_mode(mode);
    }

    pub fn set_speed_factor(&self, factor: f64) {
        self.sequencer.set_speed_factor(factor);
    }

    pub fn is_waiting(&self) -> bool {
        self.sequencer.is_waiting()
    }

    pub fn run_state(&self) -> RunState {
        self.sequencer.state()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn layout(&self) -> Option<&GraphLayout> {
        self.layout.as_deref()
    }

    pub fn frames(&self) -> Vec<FlowFrame> {
        self.state.borrow().frames.clone()
    }

    pub fn active_node(&self) -> Option<String> {
        self.state.borrow().active_node.clone()
    }

    pub fn active_edge(&self) -> Option<(String, String)> {
        self.state.borrow().active_edge.clone()
    }

    pub fn pattern(&self) -> Option<String> {
        self.state.borrow().pattern.clone()
    }
}

fn emit(state: &Rc<RefCell<SessionState>>, frame: FlowFrame) {
    let listener = {
        let mut state = state.borrow_mut();
        state.frames.push(frame.clone());
        state.listener.clone()
    };
    if let Some(listener) = listener {
        listener(&frame);
    }
}
