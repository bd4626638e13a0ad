use std::sync::Arc;

use async_stream::try_stream;
use futures::stream::{Stream, StreamExt};
use scout_llm::{message, ChatMessage, ChatMessageExt, ChatModel, ChatStreamEvent};
use tracing::{debug, info, warn};

use crate::engine::{
    AgentEngine, EngineError, EventStream, ExecutionEvent, RunRequest, ToolCallRequest, ToolOutput,
};
use crate::store::SessionStore;
use crate::tools::ToolSet;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Upper bound on model turns per run
    pub max_steps: usize,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            system_prompt: None,
        }
    }
}

/// Model/tool loop: the model answers or asks for tools, tool results are
/// fed back, until the model answers without tool calls.
///
/// Every message of the run is appended to the session store as it is
/// produced, so the store doubles as the thread checkpoint.
#[derive(Clone)]
pub struct ToolAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    store: Arc<dyn SessionStore>,
    config: AgentConfig,
}

impl ToolAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolSet, store: Arc<dyn SessionStore>) -> Self {
        Self {
            model,
            tools,
            store,
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    async fn invoke(&self, call: &ToolCallRequest) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!("Model requested unknown tool {} ({})", call.name, call.id);
            return ToolOutput::Text(format!("Error: {} is not a valid tool", call.name));
        };

        match tool.call(call.args.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} ({}) failed: {}", call.name, call.id, e);
                ToolOutput::Text(format!("Error: {}", e))
            }
        }
    }
}

impl AgentEngine for ToolAgent {
    fn run(&self, request: RunRequest) -> EventStream {
        agent_loop(self.clone(), request).boxed()
    }
}

fn agent_loop(
    agent: ToolAgent,
    request: RunRequest,
) -> impl Stream<Item = Result<ExecutionEvent, EngineError>> {
    try_stream! {
        let RunRequest { thread_id, message: user_message } = request;
        agent.store.append(&thread_id, user_message).await?;

        for step in 1..=agent.config.max_steps {
            let mut messages: Vec<ChatMessage> = agent
                .config
                .system_prompt
                .iter()
                .map(|prompt| message::system(prompt.clone()))
                .collect();
            messages.extend(agent.store.history(&thread_id).await?);
            debug!("[] - [{}] Model step {} with {} messages", thread_id, step, messages.len());

            let mut turn = agent
                .model
                .stream_chat(messages, agent.tools.definitions())
                .await?;

            let mut reply = None;
            while let Some(event) = turn.next().await {
                match event? {
                    ChatStreamEvent::Delta(text) => {
                        yield ExecutionEvent::ModelTokenDelta { text };
                    }
                    ChatStreamEvent::Done(assembled) => {
                        reply = Some(assembled);
                    }
                }
            }
            let reply = reply.ok_or(EngineError::IncompleteResponse)?;

            let calls: Vec<ToolCallRequest> = reply
                .tool_calls()
                .iter()
                .map(ToolCallRequest::from_tool_call)
                .collect();

            if calls.is_empty() {
                agent.store.append(&thread_id, reply).await?;
                yield ExecutionEvent::ModelRunEnd { tool_calls: calls };
                info!("[] - [{}] Run completed after {} model step(s)", thread_id, step);
                return;
            }

            // A tool-calling turn is stored only together with all of its tool replies
            yield ExecutionEvent::ModelRunEnd { tool_calls: calls.clone() };
            let mut committed = vec![reply];
            for call in calls {
                let output = agent.invoke(&call).await;
                committed.push(message::tool_result(call.id.clone(), output.to_text()));
                yield ExecutionEvent::ToolRunEnd {
                    call_id: call.id,
                    tool_name: call.name,
                    output,
                };
            }
            agent.store.append_all(&thread_id, committed).await?;
        }

        Err::<(), EngineError>(EngineError::StepLimit(agent.config.max_steps))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use futures::stream;
    use scout_llm::message::{assistant, tool_call, user};
    use scout_llm::{ChatCompletionTool, ChatStream, LlmError};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedModel {
        turns: Mutex<VecDeque<Vec<ChatStreamEvent>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<Vec<ChatStreamEvent>>) -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(turns.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn stream_chat(
            &self,
            messages: Vec<ChatMessage>,
            _tools: Vec<ChatCompletionTool>,
        ) -> Result<ChatStream, LlmError> {
            self.seen.lock().unwrap().push(messages);
            let turn = self
                .turns
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Stream("script exhausted".into()))?;
            Ok(stream::iter(turn.into_iter().map(Ok)).boxed())
        }
    }

    struct FixedSearch;

    #[async_trait]
    impl Tool for FixedSearch {
        fn name(&self) -> &str {
            "tavily_search"
        }

        fn description(&self) -> &str {
            "search"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
            if args.get("query").is_none() {
                return Err(ToolError::InvalidArguments("missing query".into()));
            }
            Ok(ToolOutput::Structured(json!({
                "results": [{"url": "https://a.example"}, {"url": "https://b.example"}]
            })))
        }
    }

    struct StalledSearch;

    #[async_trait]
    impl Tool for StalledSearch {
        fn name(&self) -> &str {
            "tavily_search"
        }

        fn description(&self) -> &str {
            "search"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, _args: Value) -> Result<ToolOutput, ToolError> {
            futures::future::pending().await
        }
    }

    /// Ids of assistant tool calls with no matching tool message after them
    fn unanswered_calls(history: &[ChatMessage]) -> Vec<String> {
        let mut open: Vec<String> = Vec::new();
        for message in history {
            match message {
                ChatMessage::Tool { tool_call_id, .. } => open.retain(|id| id != tool_call_id),
                other => open.extend(other.tool_calls().iter().map(|c| c.id.clone())),
            }
        }
        open
    }

    fn search_turn(id: &str) -> Vec<ChatStreamEvent> {
        vec![ChatStreamEvent::Done(assistant(
            "",
            vec![tool_call(id, "tavily_search", r#"{"query":"rust"}"#)],
        ))]
    }

    fn answer_turn(parts: &[&str]) -> Vec<ChatStreamEvent> {
        let mut turn: Vec<ChatStreamEvent> = parts
            .iter()
            .map(|p| ChatStreamEvent::Delta(p.to_string()))
            .collect();
        turn.push(ChatStreamEvent::Done(assistant(parts.concat(), vec![])));
        turn
    }

    fn agent(model: Arc<ScriptedModel>, store: Arc<InMemorySessionStore>) -> ToolAgent {
        ToolAgent::new(model, ToolSet::new().with(Arc::new(FixedSearch)), store)
    }

    #[tokio::test]
    async fn plain_answer_streams_tokens_then_run_end() {
        let model = ScriptedModel::new(vec![answer_turn(&["Hel", "lo"])]);
        let store = Arc::new(InMemorySessionStore::new());
        let events: Vec<_> = agent(model, store.clone())
            .run(RunRequest::new("t1", user("hi")))
            .collect()
            .await;

        let events: Vec<ExecutionEvent> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                ExecutionEvent::ModelTokenDelta { text: "Hel".into() },
                ExecutionEvent::ModelTokenDelta { text: "lo".into() },
                ExecutionEvent::ModelRunEnd { tool_calls: vec![] },
            ]
        );

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(ChatMessageExt::text(&history[1]), "Hello");
    }

    #[tokio::test]
    async fn tool_round_trip_feeds_result_back_to_model() {
        let model = ScriptedModel::new(vec![search_turn("call_1"), answer_turn(&["Found it"])]);
        let store = Arc::new(InMemorySessionStore::new());
        let events: Vec<ExecutionEvent> = agent(model.clone(), store.clone())
            .run(RunRequest::new("t1", user("search rust")))
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            ExecutionEvent::ModelRunEnd {
                tool_calls: vec![ToolCallRequest::new("call_1", "tavily_search", json!({"query": "rust"}))]
            }
        );
        match &events[1] {
            ExecutionEvent::ToolRunEnd { call_id, tool_name, output } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(tool_name, "tavily_search");
                assert!(matches!(output, ToolOutput::Structured(_)));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let second = &seen[1];
        assert_eq!(second.last().unwrap().role(), "tool");
        assert!(ChatMessageExt::text(second.last().unwrap()).contains("https://a.example"));
        assert_eq!(store.history("t1").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn history_carries_across_runs_and_system_prompt_leads() {
        let model = ScriptedModel::new(vec![answer_turn(&["one"]), answer_turn(&["two"])]);
        let store = Arc::new(InMemorySessionStore::new());
        let agent = agent(model.clone(), store.clone()).with_config(AgentConfig {
            max_steps: 3,
            system_prompt: Some("be brief".into()),
        });

        let _: Vec<_> = agent.run(RunRequest::new("t1", user("a"))).collect().await;
        let _: Vec<_> = agent.run(RunRequest::new("t1", user("b"))).collect().await;

        let seen = model.seen.lock().unwrap();
        let second = &seen[1];
        assert_eq!(second[0].role(), "system");
        assert_eq!(ChatMessageExt::text(&second[0]), "be brief");
        let contents: Vec<String> = second.iter().skip(1).map(|m| ChatMessageExt::text(m)).collect();
        assert_eq!(contents, vec!["a", "one", "b"]);
    }

    #[tokio::test]
    async fn step_limit_ends_with_error() {
        let model = ScriptedModel::new(vec![search_turn("c1"), search_turn("c2")]);
        let store = Arc::new(InMemorySessionStore::new());
        let agent = agent(model, store).with_config(AgentConfig {
            max_steps: 2,
            system_prompt: None,
        });

        let events: Vec<_> = agent.run(RunRequest::new("t1", user("loop"))).collect().await;
        assert_eq!(events.len(), 5);
        assert!(matches!(events.last(), Some(Err(EngineError::StepLimit(2)))));
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_engine_error() {
        let model = ScriptedModel::new(vec![]);
        let store = Arc::new(InMemorySessionStore::new());
        let events: Vec<_> = agent(model, store)
            .run(RunRequest::new("t1", user("hi")))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(EngineError::Model(_))));
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_args_become_error_output() {
        let turn = vec![ChatStreamEvent::Done(assistant(
            "",
            vec![
                tool_call("c1", "calculator", "{}"),
                tool_call("c2", "tavily_search", "{}"),
            ],
        ))];
        let model = ScriptedModel::new(vec![turn, answer_turn(&["sorry"])]);
        let store = Arc::new(InMemorySessionStore::new());
        let events: Vec<ExecutionEvent> = agent(model, store)
            .run(RunRequest::new("t1", user("hi")))
            .map(Result::unwrap)
            .collect()
            .await;

        let outputs: Vec<&ToolOutput> = events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::ToolRunEnd { output, .. } => Some(output),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs[0],
            &ToolOutput::Text("Error: calculator is not a valid tool".into())
        );
        assert!(matches!(outputs[1], ToolOutput::Text(t) if t.starts_with("Error: invalid arguments")));
    }

    #[tokio::test]
    async fn run_dropped_mid_tool_leaves_thread_usable() {
        let model = ScriptedModel::new(vec![search_turn("c1"), answer_turn(&["done"])]);
        let store = Arc::new(InMemorySessionStore::new());

        let stalled = ToolAgent::new(
            model.clone(),
            ToolSet::new().with(Arc::new(StalledSearch)),
            store.clone(),
        );
        let mut run = stalled.run(RunRequest::new("t1", user("first")));
        let first = run.next().await.unwrap().unwrap();
        assert!(matches!(first, ExecutionEvent::ModelRunEnd { .. }));
        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), run.next()).await;
        assert!(pending.is_err());
        drop(run);

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(unanswered_calls(&history).is_empty());

        let events: Vec<_> = agent(model.clone(), store.clone())
            .run(RunRequest::new("t1", user("second")))
            .collect()
            .await;
        assert!(events.iter().all(Result::is_ok));

        let seen = model.seen.lock().unwrap();
        assert!(unanswered_calls(&seen[1]).is_empty());
        let history = store.history("t1").await.unwrap();
        let roles: Vec<&str> = history.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["user", "user", "assistant"]);
    }

    #[tokio::test]
    async fn tool_turn_is_committed_with_its_replies() {
        let model = ScriptedModel::new(vec![search_turn("c1"), answer_turn(&["ok"])]);
        let store = Arc::new(InMemorySessionStore::new());
        let _: Vec<_> = agent(model, store.clone())
            .run(RunRequest::new("t1", user("q")))
            .collect()
            .await;

        let history = store.history("t1").await.unwrap();
        let roles: Vec<&str> = history.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);
        assert!(unanswered_calls(&history).is_empty());
    }
}
