//! Pattern Scenarios
//!
//! Scripted walkthroughs of common agent design patterns. Each scenario is
//! a small graph plus the ordered list of messages that travel over it.

use crate::errors::PatternError;
use crate::flow_style::MessageKind::{self, *};
use crate::layout::{FlowEdge, FlowNode};

/// One message in a walkthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedMessage {
    pub from: &'static str,
    pub to: &'static str,
    pub kind: MessageKind,
    pub label: &'static str,
}

/// A pattern walkthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternScenario {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    nodes: &'static [(&'static str, &'static str)],
    script: &'static [ScriptedMessage],
}

impl PatternScenario {
    pub fn nodes(&self) -> Vec<FlowNode> {
        self.nodes
            .iter()
            .map(|(id, label)| FlowNode::new(*id, *label))
            .collect()
    }

    /// One edge per distinct sender/receiver pair in the script.
    pub fn edges(&self) -> Vec<FlowEdge> {
        let mut edges: Vec<FlowEdge> = Vec::new();
        for msg in self.script {
            let edge = FlowEdge::new(msg.from, msg.to);
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
        edges
    }

    pub fn script(&self) -> &[ScriptedMessage] {
        self.script
    }

    pub fn node_label(&self, id: &str) -> Option<&'static str> {
        self.nodes.iter().find(|(n, _)| *n == id).map(|(_, l)| *l)
    }

    /// Check that every scripted message connects declared nodes.
    pub fn validate(&self) -> Result<(), PatternError> {
        for msg in self.script {
            if self.node_label(msg.from).is_none() || self.node_label(msg.to).is_none() {
                return Err(PatternError::InvalidScript {
                    id: self.id.to_string(),
                    from: msg.from.to_string(),
                    to: msg.to.to_string(),
                });
            }
        }
        Ok(())
    }
}

const fn msg(
    from: &'static str,
    to: &'static str,
    kind: MessageKind,
    label: &'static str,
) -> ScriptedMessage {
    ScriptedMessage {
        from,
        to,
        kind,
        label,
    }
}

static REACT: PatternScenario = PatternScenario {
    id: "react",
    title: "ReAct",
    summary: "Interleaves reasoning with tool use until the question is answered",
    nodes: &[
        ("user", "User"),
        ("agent", "Reasoning Agent"),
        ("tool", "Search Tool"),
        ("answer", "Final Answer"),
    ],
    script: &[
        msg("user", "agent", Query, "What is the population of the capital of France?"),
        msg("agent", "agent", Reflection, "Thought: I need the capital first"),
        msg("agent", "tool", ToolCall, "search(\"capital of France\")"),
        msg("tool", "agent", Observation, "Paris"),
        msg("agent", "tool", ToolCall, "search(\"population of Paris\")"),
        msg("tool", "agent", Observation, "About 2.1 million"),
        msg("agent", "answer", Response, "Paris has about 2.1 million residents"),
    ],
};

static REFLECTION: PatternScenario = PatternScenario {
    id: "reflection",
    title: "Reflection",
    summary: "A generator drafts, a critic reviews, and the draft is revised",
    nodes: &[
        ("user", "User"),
        ("generator", "Generator"),
        ("critic", "Critic"),
        ("output", "Output"),
    ],
    script: &[
        msg("user", "generator", Query, "Write a function that reverses a list"),
        msg("generator", "critic", Data, "Draft v1"),
        msg("critic", "generator", Reflection, "Mutates the input; return a new list"),
        msg("generator", "critic", Data, "Draft v2"),
        msg("critic", "generator", Reflection, "Looks good"),
        msg("generator", "output", Response, "Final implementation"),
    ],
};

static PLAN_EXECUTE: PatternScenario = PatternScenario {
    id: "plan-execute",
    title: "Plan and Execute",
    summary: "A planner breaks the goal into steps that an executor carries out",
    nodes: &[
        ("user", "User"),
        ("planner", "Planner"),
        ("executor", "Executor"),
        ("tools", "Tools"),
    ],
    script: &[
        msg("user", "planner", Query, "Book a trip to Lisbon"),
        msg("planner", "executor", Plan, "1. Find flights 2. Find hotel 3. Confirm"),
        msg("executor", "tools", ToolCall, "flights.search(LIS)"),
        msg("tools", "executor", Observation, "3 options found"),
        msg("executor", "tools", ToolCall, "hotels.search(LIS)"),
        msg("tools", "executor", Error, "Rate limited"),
        msg("executor", "planner", Observation, "Hotel search failed"),
        msg("planner", "executor", Plan, "Retry hotel search later, confirm flight now"),
        msg("executor", "user", Response, "Flight booked, hotel pending"),
    ],
};

static A2A: PatternScenario = PatternScenario {
    id: "a2a",
    title: "Agent-to-Agent (A2A)",
    summary: "A client agent discovers a remote agent and delegates a task to it",
    nodes: &[
        ("client", "Client Agent"),
        ("card", "Agent Card"),
        ("remote", "Remote Agent"),
    ],
    script: &[
        msg("client", "card", Query, "GET /.well-known/agent.json"),
        msg("card", "client", Data, "Capabilities: currency conversion"),
        msg("client", "remote", Message, "tasks/send: convert 100 USD to EUR"),
        msg("remote", "client", Message, "status: working"),
        msg("remote", "client", Response, "artifact: 92.4 EUR"),
    ],
};

static MCP: PatternScenario = PatternScenario {
    id: "mcp",
    title: "Model Context Protocol (MCP)",
    summary: "A host's client negotiates with a server and invokes one of its tools",
    nodes: &[
        ("host", "Host App"),
        ("client", "MCP Client"),
        ("server", "MCP Server"),
        ("resource", "Resource"),
    ],
    script: &[
        msg("host", "client", Query, "Summarize open issues"),
        msg("client", "server", Message, "initialize"),
        msg("server", "client", Response, "capabilities: tools, resources"),
        msg("client", "server", Message, "tools/list"),
        msg("server", "client", Response, "[list_issues]"),
        msg("client", "server", ToolCall, "tools/call list_issues"),
        msg("server", "resource", Data, "query issue tracker"),
        msg("resource", "server", Data, "42 issues"),
        msg("server", "client", Response, "result: 42 issues"),
        msg("client", "host", Response, "Summary ready"),
    ],
};

static ACP: PatternScenario = PatternScenario {
    id: "acp",
    title: "Agent Communication Protocol (ACP)",
    summary: "Agents exchange run requests through a shared ACP server",
    nodes: &[
        ("caller", "Caller Agent"),
        ("server", "ACP Server"),
        ("worker", "Worker Agent"),
    ],
    script: &[
        msg("caller", "server", Message, "POST /runs"),
        msg("server", "worker", Message, "dispatch run"),
        msg("worker", "server", Data, "partial output"),
        msg("server", "caller", Data, "stream event"),
        msg("worker", "server", Response, "run completed"),
        msg("server", "caller", Response, "final output"),
    ],
};

static CATALOG: [&PatternScenario; 6] = [&REACT, &REFLECTION, &PLAN_EXECUTE, &A2A, &MCP, &ACP];

/// Every built-in scenario.
pub fn catalog() -> &'static [&'static PatternScenario] {
    &CATALOG
}

/// Look up a scenario by id (case-insensitive).
pub fn find(id: &str) -> Result<&'static PatternScenario, PatternError> {
    CATALOG
        .iter()
        .copied()
        .find(|s| s.id.eq_ignore_ascii_case(id.trim()))
        .ok_or_else(|| PatternError::NotFound { id: id.to_string() })
}
