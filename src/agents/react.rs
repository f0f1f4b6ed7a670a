//! ReAct loop controller
//!
//! The loop is an explicit three-state machine:
//!
//! ```text
//!            tool calls                 results appended
//!   DECIDE ─────────────▶ ACT ──────────────────────────▶ DECIDE
//!     │
//!     │ no tool calls
//!     ▼
//!   DONE
//! ```
//!
//! Each DECIDE invokes the model with the full history (see
//! [`ReactAgent::decide`]); each ACT runs the requested tools through the
//! [`ToolCoordinator`]. The number of DECIDE steps is capped by
//! `max_iterations`, after which the run fails with
//! [`AppError::LoopLimitExceeded`].
//!
//! Callers either drive the loop to completion with [`ReactAgent::run`] or
//! step through it with [`AgentRun::next_step`] to render progress as it
//! happens.
//!
//! # Example
//!
//! ```rust,ignore
//! let agent = ReactAgent::new(client, registry, AgentConfig::default())?;
//! let mut state = ConversationState::from_query("Calculate 25 * 4 + 10");
//!
//! let mut run = agent.start(&mut state);
//! while let Some(step) = run.next_step().await {
//!     for message in &step?.emitted {
//!         println!("{}: {}", message.kind(), message.content());
//!     }
//! }
//! ```

use crate::llm::client::LLMClient;
use crate::llm::coordinator::{ToolCallRecord, ToolCallingConfig, ToolCoordinator};
use crate::memory::ConversationState;
use crate::tools::registry::ToolRegistry;
use crate::types::{AppError, Message, Result};
use futures::Stream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default cap on model invocations per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

/// Loop controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Invoke the model.
    Decide,
    /// Execute the tool calls of the latest assistant turn.
    Act,
    /// The latest assistant turn is a final answer.
    Done,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopPhase::Decide => write!(f, "decide"),
            LoopPhase::Act => write!(f, "act"),
            LoopPhase::Done => write!(f, "done"),
        }
    }
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of DECIDE steps (model invocations) per run.
    pub max_iterations: usize,
    /// How the ACT step executes tools.
    pub tool_calling: ToolCallingConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_calling: ToolCallingConfig::default(),
        }
    }
}

/// Outcome of one state-machine transition.
#[derive(Debug, Clone)]
pub struct Step {
    /// The phase that was executed.
    pub phase: LoopPhase,
    /// Messages appended to the conversation by this step, in order.
    pub emitted: Vec<Message>,
    /// Execution records, for ACT steps.
    pub tool_calls: Vec<ToolCallRecord>,
    /// The phase the loop moved to.
    pub next: LoopPhase,
}

/// Result of a run that reached DONE.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// Final answer text.
    pub content: String,
    /// All tool calls executed during the run.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of DECIDE steps taken.
    pub iterations: usize,
}

/// A ReAct agent: a model client, a shared tool registry, and loop settings.
///
/// The agent holds no conversation; every run borrows the caller's
/// [`ConversationState`], so one agent can serve any number of sessions.
pub struct ReactAgent {
    client: Arc<dyn LLMClient>,
    tools: ToolCoordinator,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(
        client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(AppError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            client,
            tools: ToolCoordinator::new(registry, config.tool_calling),
            max_iterations: config.max_iterations,
        })
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.tools.registry()
    }

    /// Decision step: produce the next assistant message for `state`.
    ///
    /// Does not touch `state`; the caller decides whether to append the result.
    /// A response with neither text nor tool calls is treated as malformed.
    pub async fn decide(&self, state: &ConversationState) -> Result<Message> {
        if state.is_empty() {
            return Err(AppError::InvalidInput(
                "cannot invoke the model on an empty conversation".to_string(),
            ));
        }

        let tools = self.tools.registry().get_tool_definitions();
        let mut response = self
            .client
            .generate_with_tools_and_history(state.messages(), &tools)
            .await?;

        if response.content.trim().is_empty() && response.tool_calls.is_empty() {
            return Err(AppError::ModelInvocation(
                "model returned neither an answer nor tool calls".to_string(),
            ));
        }

        // Every call needs a distinct id for its result to reference.
        let mut seen = HashSet::new();
        for call in &mut response.tool_calls {
            if call.id.is_empty() || !seen.insert(call.id.clone()) {
                call.id = uuid::Uuid::new_v4().to_string();
                seen.insert(call.id.clone());
            }
        }

        debug!(
            finish_reason = %response.finish_reason,
            tool_calls = response.tool_calls.len(),
            "model responded"
        );
        Ok(response.into_message())
    }

    /// Begin a step-by-step run over `state`.
    pub fn start<'a>(&'a self, state: &'a mut ConversationState) -> AgentRun<'a> {
        self.start_with_cancel(state, CancellationToken::new())
    }

    /// Begin a step-by-step run that stops with [`AppError::Cancelled`] once
    /// `cancel` fires.
    ///
    /// A state that ends with unanswered tool calls resumes in ACT.
    pub fn start_with_cancel<'a>(
        &'a self,
        state: &'a mut ConversationState,
        cancel: CancellationToken,
    ) -> AgentRun<'a> {
        let phase = if state.has_pending_tool_calls() {
            LoopPhase::Act
        } else {
            LoopPhase::Decide
        };
        AgentRun {
            agent: self,
            state,
            phase,
            iterations: 0,
            cancel,
        }
    }

    /// Run the loop until the model gives a final answer.
    pub async fn run(&self, state: &mut ConversationState) -> Result<AgentResponse> {
        self.run_with_cancel(state, CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        state: &mut ConversationState,
        cancel: CancellationToken,
    ) -> Result<AgentResponse> {
        let mut run = self.start_with_cancel(state, cancel);
        let mut tool_calls = Vec::new();
        while let Some(step) = run.next_step().await {
            tool_calls.extend(step?.tool_calls);
        }

        let iterations = run.iterations();
        let content = run
            .state()
            .final_answer()
            .map(str::to_string)
            .unwrap_or_default();

        Ok(AgentResponse {
            content,
            tool_calls,
            iterations,
        })
    }

    /// Run a single query in a fresh conversation and return that conversation.
    pub async fn invoke(&self, query: &str) -> Result<ConversationState> {
        let mut state = ConversationState::from_query(query);
        self.run(&mut state).await?;
        Ok(state)
    }
}

/// An in-progress run of the loop over a borrowed conversation.
pub struct AgentRun<'a> {
    agent: &'a ReactAgent,
    state: &'a mut ConversationState,
    phase: LoopPhase,
    iterations: usize,
    cancel: CancellationToken,
}

impl<'a> AgentRun<'a> {
    /// The phase the next call to [`next_step`](Self::next_step) will execute.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn state(&self) -> &ConversationState {
        &*self.state
    }

    /// DECIDE steps taken so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Execute one transition.
    ///
    /// Returns `None` once the loop is in DONE. After an error the run is
    /// finished as well; the conversation holds everything appended before
    /// the failing step and nothing from it.
    pub async fn next_step(&mut self) -> Option<Result<Step>> {
        let result = match self.phase {
            LoopPhase::Done => return None,
            LoopPhase::Decide => self.decide_step().await,
            LoopPhase::Act => self.act_step().await,
        };

        match result {
            Ok(step) => {
                self.phase = step.next;
                Some(Ok(step))
            }
            Err(e) => {
                self.phase = LoopPhase::Done;
                Some(Err(e))
            }
        }
    }

    /// Adapt the run into a stream of steps.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Step>> + 'a {
        async_stream::stream! {
            while let Some(step) = self.next_step().await {
                yield step;
            }
        }
    }

    async fn decide_step(&mut self) -> Result<Step> {
        let max_iterations = self.agent.max_iterations;
        if self.iterations >= max_iterations {
            warn!(max_iterations, "loop guard tripped");
            return Err(AppError::LoopLimitExceeded { max_iterations });
        }

        let iteration = self.iterations + 1;
        info!(iteration, messages = self.state.len(), "decide");

        let message = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(iteration, "cancelled while waiting for the model");
                return Err(AppError::Cancelled("cancelled while waiting for the model".to_string()));
            }
            decided = self.agent.decide(&*self.state) => decided?,
        };
        self.iterations = iteration;

        self.state.push(message.clone())?;
        let next = if message.tool_calls().is_empty() {
            LoopPhase::Done
        } else {
            LoopPhase::Act
        };

        Ok(Step {
            phase: LoopPhase::Decide,
            emitted: vec![message],
            tool_calls: Vec::new(),
            next,
        })
    }

    async fn act_step(&mut self) -> Result<Step> {
        let calls: Vec<_> = self
            .state
            .pending_tool_calls()
            .into_iter()
            .cloned()
            .collect();
        info!(calls = calls.len(), "act");

        let records = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("cancelled while tools were running");
                return Err(AppError::Cancelled("cancelled while tools were running".to_string()));
            }
            records = self.agent.tools.execute_tool_calls(&calls) => records,
        };

        let emitted: Vec<Message> = records.iter().map(ToolCallRecord::to_message).collect();
        self.state.extend(emitted.clone())?;

        Ok(Step {
            phase: LoopPhase::Act,
            emitted,
            tool_calls: records,
            next: LoopPhase::Decide,
        })
    }
}
