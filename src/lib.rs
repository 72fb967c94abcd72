//! patternflow - playback core for agent design pattern walkthroughs
//!
//! Sequences scripted animation frames for visualising agent patterns
//! such as ReAct, Reflection, A2A and MCP.
//!
//! - **Sequencer**: auto or step-by-step playback with pause/resume/reset
//! - **Scheduler**: injectable timers, with a virtual clock for tests
//! - **Flow styles**: how each message type is drawn
//! - **Layout**: level layout of pattern graphs with a TTL cache
//! - **Session**: composes the above into a playable walkthrough
//!
//! # Quick Start
//!
//! ```
//! use patternflow::scheduler::VirtualScheduler;
//! use patternflow::sequencer::{PlaybackMode, Sequencer};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let clock = VirtualScheduler::new();
//! let seq = Sequencer::new(clock.clone());
//! let log = Rc::new(RefCell::new(Vec::new()));
//! for name in ["observe", "think", "act"] {
//!     let log = Rc::clone(&log);
//!     seq.add_step(move || log.borrow_mut().push(name));
//! }
//!
//! seq.set_mode(PlaybackMode::StepByStep);
//! seq.start();
//! assert!(seq.is_waiting());
//! seq.advance_to_next_step();
//! seq.advance_to_next_step();
//! assert_eq!(*log.borrow(), vec!["observe", "think", "act"]);
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod flow_style;
pub mod layout;
pub mod patterns;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod telemetry;

pub use config::Config;
pub use errors::{PatternflowError, Result};
pub use flow_style::{edge_style, flow_style, flow_style_for_tag, FlowStyle, MessageKind};
pub use layout::{compute_layout, GraphLayout, LayoutCache, LayoutOptions};
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler, VirtualScheduler};
pub use sequencer::{PlaybackMode, RunState, Sequencer};
pub use session::{FlowFrame, VisualizationSession};
