//! Flow Styles
//!
//! Maps the semantic type of a message travelling between pattern nodes to
//! the way a renderer should draw it. Every lookup is a pure `match`.

use ratatui::style::Color;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Stroke width of every animated flow.
pub const FLOW_STROKE_WIDTH: u16 = 4;

/// Stroke width of an edge with no traffic on it.
pub const IDLE_STROKE_WIDTH: u16 = 2;

/// Colour of an edge with no traffic on it.
pub const IDLE_EDGE_COLOR: Color = Color::Rgb(0x9C, 0xA3, 0xAF);

/// Semantic type of a message in a pattern walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Query,
    Response,
    ToolCall,
    Observation,
    Reflection,
    Plan,
    Message,
    Data,
    Error,
    /// Anything not in the list above
    Other,
}

impl MessageKind {
    pub const ALL: [MessageKind; 10] = [
        MessageKind::Query,
        MessageKind::Response,
        MessageKind::ToolCall,
        MessageKind::Observation,
        MessageKind::Reflection,
        MessageKind::Plan,
        MessageKind::Message,
        MessageKind::Data,
        MessageKind::Error,
        MessageKind::Other,
    ];

    /// Parse a tag such as `tool_call` or `Tool-Call`. Unknown tags map to `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "query" => MessageKind::Query,
            "response" => MessageKind::Response,
            "tool_call" => MessageKind::ToolCall,
            "observation" => MessageKind::Observation,
            "reflection" => MessageKind::Reflection,
            "plan" => MessageKind::Plan,
            "message" => MessageKind::Message,
            "data" => MessageKind::Data,
            "error" => MessageKind::Error,
            _ => MessageKind::Other,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::Query => "query",
            MessageKind::Response => "response",
            MessageKind::ToolCall => "tool_call",
            MessageKind::Observation => "observation",
            MessageKind::Reflection => "reflection",
            MessageKind::Plan => "plan",
            MessageKind::Message => "message",
            MessageKind::Data => "data",
            MessageKind::Error => "error",
            MessageKind::Other => "other",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// How a flow of a given kind is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowStyle {
    #[serde(serialize_with = "serialize_color")]
    pub color: Color,
    pub stroke_width: u16,
    /// Duration of one pulse along the edge; shorter is faster.
    #[serde(serialize_with = "serialize_millis")]
    pub pulse: Duration,
    pub label: Option<&'static str>,
}

impl FlowStyle {
    /// Colour as `#rrggbb`.
    pub fn hex(&self) -> String {
        color_hex(self.color)
    }
}

/// Style for a flow of `kind`.
pub fn flow_style(kind: MessageKind) -> FlowStyle {
    let (rgb, pulse_ms, label) = match kind {
        MessageKind::Query => ((0x3B, 0x82, 0xF6), 1500, Some("Query")),
        MessageKind::Response => ((0x10, 0xB9, 0x81), 1500, Some("Response")),
        MessageKind::ToolCall => ((0xF5, 0x9E, 0x0B), 1000, Some("Tool Call")),
        MessageKind::Observation => ((0x8B, 0x5C, 0xF6), 1200, Some("Observation")),
        MessageKind::Reflection => ((0xEC, 0x48, 0x99), 2000, Some("Reflection")),
        MessageKind::Plan => ((0x06, 0xB6, 0xD4), 2000, Some("Plan")),
        MessageKind::Message => ((0x63, 0x66, 0xF1), 1500, Some("Message")),
        MessageKind::Data => ((0x14, 0xB8, 0xA6), 800, Some("Data")),
        MessageKind::Error => ((0xEF, 0x44, 0x44), 600, Some("Error")),
        MessageKind::Other => ((0x6B, 0x72, 0x80), 1500, None),
    };
    let (r, g, b) = rgb;

    FlowStyle {
        color: Color::Rgb(r, g, b),
        stroke_width: FLOW_STROKE_WIDTH,
        pulse: Duration::from_millis(pulse_ms),
        label,
    }
}

/// Style for a raw message-type tag; unknown tags get the default style.
pub fn flow_style_for_tag(tag: &str) -> FlowStyle {
    flow_style(MessageKind::from_tag(tag))
}

/// How an edge is drawn depending on whether traffic is on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeStyle {
    #[serde(serialize_with = "serialize_color")]
    pub color: Color,
    pub stroke_width: u16,
    pub animated: bool,
    /// Length of the dash pattern; zero draws a solid line.
    pub dash: u16,
    #[serde(serialize_with = "serialize_millis")]
    pub pulse: Duration,
}

/// Edge style: active edges take the flow style and animate, idle ones are muted.
pub fn edge_style(kind: MessageKind, active: bool) -> EdgeStyle {
    if active {
        let flow = flow_style(kind);
        EdgeStyle {
            color: flow.color,
            stroke_width: flow.stroke_width,
            animated: true,
            dash: 5,
            pulse: flow.pulse,
        }
    } else {
        EdgeStyle {
            color: IDLE_EDGE_COLOR,
            stroke_width: IDLE_STROKE_WIDTH,
            animated: false,
            dash: 0,
            pulse: Duration::ZERO,
        }
    }
}

/// Render a colour as `#rrggbb`. Named colours fall back to their usual RGB.
pub fn color_hex(color: Color) -> String {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (0x80, 0, 0),
        Color::Green => (0, 0x80, 0),
        Color::Yellow => (0x80, 0x80, 0),
        Color::Blue => (0, 0, 0x80),
        Color::Magenta => (0x80, 0, 0x80),
        Color::Cyan => (0, 0x80, 0x80),
        Color::Gray => (0xC0, 0xC0, 0xC0),
        Color::DarkGray => (0x80, 0x80, 0x80),
        Color::White => (0xFF, 0xFF, 0xFF),
        _ => (0x6B, 0x72, 0x80),
    };
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn serialize_color<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&color_hex(*color))
}

fn serialize_millis<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(d.as_millis() as u64)
}
