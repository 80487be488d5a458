//! Agent-callable tools over the calendar and meeting APIs.
//!
//! Tools: `calendar`, `meet`, `meet_members`. Each dispatches on an
//! `operation` argument and validates arguments before any request. Every
//! tool talks through a [`ToolScope`] so calls are attributed to
//! `"<tool>.<operation>"` in metrics.

use std::sync::Arc;

use {
    meetbridge_api::{CalendarApi, Gateway, MeetApi},
    meetbridge_monitor::ToolScope,
};

mod args;
pub mod calendar_tool;
pub mod meet_tool;
pub mod members_tool;
pub mod registry;

pub use {
    calendar_tool::CalendarTool,
    meet_tool::MeetTool,
    members_tool::MeetMembersTool,
    registry::{AgentTool, ToolRegistry},
};

/// Registry with all three tools wired to `gateway`.
pub fn build_registry(gateway: Arc<dyn Gateway>) -> ToolRegistry {
    let scoped = |tool: &str| -> Arc<dyn Gateway> { Arc::new(ToolScope::new(gateway.clone(), tool)) };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CalendarTool::new(CalendarApi::new(scoped("calendar")))));
    registry.register(Box::new(MeetTool::new(MeetApi::new(scoped("meet")))));
    registry.register(Box::new(MeetMembersTool::new(MeetApi::new(scoped(
        "meet_members",
    )))));
    registry
}
