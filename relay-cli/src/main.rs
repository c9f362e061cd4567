//! Thin CLI harness for the relay engine (C17): resolves `Deps`/`Services`
//! from the process environment (via `config`), compiles the turn graph,
//! runs one turn, and prints its event stream.
//!
//! This is not the presentation layer — no session management, no
//! multi-turn REPL loop. It exists to give the engine a runnable entry
//! point for smoke tests, the same role the source workspace's thin
//! `cli_run` helper plays relative to its full interactive CLI.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use relay::{
    build_graph, ChatParams, Deps, McpSession, OllamaProvider, Role, RoleConfig, Services,
    TemplateLoader,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relay", about = "Run one turn of the relay engine")]
struct Args {
    /// User text for the turn; reads a line from stdin if omitted.
    #[arg(long)]
    once: Option<String>,

    /// Print raw event JSON instead of a human-readable line per event.
    #[arg(long)]
    json: bool,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

async fn build_mcp(registry: &relay::ToolRegistryLocked, default_user_id: &str) -> Option<Arc<McpSession>> {
    let url = std::env::var("RELAY_MCP_URL").ok()?;
    let mut headers = Vec::new();
    if let Ok(key) = std::env::var("RELAY_MCP_API_KEY") {
        headers.push(("Authorization".to_string(), format!("Bearer {key}")));
    }
    match McpSession::connect(url, headers).await {
        Ok(session) => {
            let session = Arc::new(session);
            registry
                .register(Arc::new(relay::tools::bindings::MemoryQueryTool::new(
                    Arc::clone(&session),
                    default_user_id.to_string(),
                )))
                .await;
            registry
                .register(Arc::new(relay::tools::bindings::MemoryStoreTool::new(
                    Arc::clone(&session),
                    default_user_id.to_string(),
                )))
                .await;
            Some(session)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to connect to configured MCP server; memory tools disabled");
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let _ = config::load_and_apply("relay", None::<&std::path::Path>);

    let args = Args::parse();
    let user_text = match args.once {
        Some(text) => text,
        None => {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).expect("read stdin");
            line.trim_end().to_string()
        }
    };

    let base_url = env_or("RELAY_PROVIDER_BASE_URL", "http://localhost:11434");
    let provider = Arc::new(OllamaProvider::new(base_url));

    let mut roles = HashMap::new();
    for (role, key) in [
        (Role::Router, "RELAY_MODEL_ROUTER"),
        (Role::Planner, "RELAY_MODEL_PLANNER"),
        (Role::Reflect, "RELAY_MODEL_REFLECT"),
        (Role::Answer, "RELAY_MODEL_ANSWER"),
    ] {
        roles.insert(
            role,
            RoleConfig {
                model: env_or(key, "llama3"),
                params: ChatParams::default(),
                response_format: None,
            },
        );
    }

    let prompts_dir = std::env::var("RELAY_PROMPTS_DIR").ok().map(PathBuf::from);
    let prompts = match prompts_dir {
        Some(dir) => TemplateLoader::new(Some(dir)),
        None => TemplateLoader::embedded(),
    };

    let tool_step_limit = env_usize("RELAY_TOOL_STEP_LIMIT", 8);
    let deps = Arc::new(Deps::new(provider, prompts, roles, tool_step_limit));

    let tools = Arc::new(relay::ToolRegistryLocked::new(relay::ToolRegistry::new()));
    let history_path = env_or("RELAY_CHAT_HISTORY_PATH", "./relay-history.jsonl");
    tools
        .register(Arc::new(relay::tools::bindings::ChatHistoryTailTool::new(Arc::new(
            relay::ChatHistory::new(history_path.clone()),
        ))))
        .await;

    let default_memory_user_id = env_or("RELAY_MEMORY_USER_ID", "default-user");
    let mcp = build_mcp(tools.as_ref(), &default_memory_user_id).await;

    let services = Arc::new(Services::new(
        tools,
        history_path,
        env_or("RELAY_WORLD_STATE_PATH", "./relay-world.json"),
        env_or("RELAY_TIMEZONE", "UTC"),
        mcp,
        default_memory_user_id,
        env_usize("RELAY_CHAT_HISTORY_MAX_TURNS", 200),
    ));

    let graph = match build_graph(deps.clone(), services.clone()) {
        Ok(graph) => Arc::new(graph),
        Err(e) => {
            eprintln!("failed to compile turn graph: {e}");
            std::process::exit(1);
        }
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let run_handle = tokio::spawn(relay::run_turn(deps, services, graph, user_text, None, tx));

    let json_mode = args.json;
    let stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        let mut out = stdout.lock();
        if json_mode {
            let _ = writeln!(out, "{}", serde_json::to_string(&event).unwrap());
        } else {
            let _ = writeln!(out, "[{}] seq={} {}", event.turn_id, event.seq, event.kind.name());
        }
    }

    match run_handle.await.expect("turn task panicked") {
        Ok(_outcome) => {}
        Err(e) => {
            eprintln!("turn ended with error: {e}");
            std::process::exit(1);
        }
    }
}
