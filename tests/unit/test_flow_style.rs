//! Unit tests for flow styles

use patternflow::flow_style::{
    edge_style, flow_style, flow_style_for_tag, MessageKind, FLOW_STROKE_WIDTH,
};

const TAGS: [&str; 9] = [
    "query",
    "response",
    "tool_call",
    "observation",
    "reflection",
    "plan",
    "message",
    "data",
    "error",
];

#[test]
fn test_every_known_tag_has_its_own_style() {
    let default = flow_style(MessageKind::Other);
    for tag in TAGS {
        let style = flow_style_for_tag(tag);
        assert_ne!(style, default, "{tag} fell back to the default style");
        assert_eq!(style.stroke_width, FLOW_STROKE_WIDTH);
        assert!(style.label.is_some());
    }
}

#[test]
fn test_unrecognized_tag_gets_default() {
    for tag in ["handoff", "TOOL CALL", "", "🤖"] {
        assert_eq!(flow_style_for_tag(tag), flow_style(MessageKind::Other));
    }
}

#[test]
fn test_lookup_is_referentially_transparent() {
    for tag in TAGS {
        assert_eq!(flow_style_for_tag(tag), flow_style_for_tag(tag));
    }
}

#[test]
fn test_hex_format() {
    for kind in MessageKind::ALL {
        let hex = flow_style(kind).hex();
        assert_eq!(hex.len(), 7);
        assert!(hex.starts_with('#'));
        assert!(hex[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn test_idle_edges_share_one_style() {
    let idle: Vec<_> = MessageKind::ALL.iter().map(|k| edge_style(*k, false)).collect();
    assert!(idle.windows(2).all(|w| w[0] == w[1]));
}
