//! ReAct 核心：解析器、单步执行、主循环、最终回答与会话上下文更新

pub mod events;
pub mod finalizer;
pub mod loop_;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod state;
pub mod step;

pub use events::{EventSink, ReactEvent};
pub use loop_::{ReactAgent, ReactOptions, ReactOutcome};
pub use parser::{parse_react_output, ParseResult, ParsedStep};
pub use session::{merge_context, session_updates};
pub use state::{ReasoningStep, RunPhase, RunState, FINAL_ANSWER};
