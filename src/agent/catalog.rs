//! Built-in agents
//!
//! Each entry binds the configured model to an instruction and a tool set.
//! Agents backed by Google APIs need the OAuth client secrets; agents backed
//! by a subprocess tool server need whatever secret that server reads.

use std::sync::Arc;
use crate::config::{require_key, ApiKeys, Config};
use crate::error::Error;
use crate::gateway::drive::DRIVE_API_BASE;
use crate::gateway::gmail::GMAIL_API_BASE;
use crate::gateway::{build_client, DriveGateway, HttpTransport, Integration, MailGateway};
use crate::tools::clock::ClockTool;
use crate::tools::pdf::PdfTool;
use crate::tools::drive::{ListDriveFilesTool, ReadDriveFileTool};
use crate::tools::reddit::RedditTool;
use crate::tools::speech::SpeechTool;
use crate::tools::summary::WordReductionTool;
use crate::tools::translate::TranslateTool;
use crate::tools::weather::WeatherTool;
use crate::tools::{gmail, ToolRegistry};
use crate::Result;
use super::{AgentShell, ToolsetSpec};

/// Catalog listing entry
#[derive(Debug, Clone, Copy)]
pub struct AgentInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const AGENTS: &[AgentInfo] = &[
    AgentInfo {
        name: "location_info_agent",
        description: "Agent to answer questions about the time and weather in a city.",
    },
    AgentInfo {
        name: "summarizer",
        description: "Agent that summarizes input text and computes word reduction statistics.",
    },
    AgentInfo {
        name: "gdrive_assistant_agent",
        description: "Agent that lists, searches and reads files on Google Drive.",
    },
    AgentInfo {
        name: "gsuite_assistant_agent",
        description: "Agent that manages Google Drive files and Gmail messages.",
    },
    AgentInfo {
        name: "reddit_agent",
        description: "Agent that fetches and summarizes hot Reddit posts about a topic, optionally as a PDF report.",
    },
    AgentInfo {
        name: "search_agent",
        description: "Agent that searches the web through the Brave Search tool server.",
    },
    AgentInfo {
        name: "web_automation_agent",
        description: "Agent that extracts information from web pages through a headless browser tool server.",
    },
    AgentInfo {
        name: "file_manager_agent",
        description: "Agent that works with local files through the filesystem tool server.",
    },
];

const LOCATION_INSTRUCTION: &str = "You are a helpful agent who can answer user questions about the time and weather in a city in the chosen language, and even give a voice response.";

const SUMMARIZER_INSTRUCTION: &str = "You are a concise summarization assistant. \
Your goal is to summarize the provided input text in **less than 30 words**. \
Do not add any commentary. \
**CRITICAL STEP:** After generating the summary, you must call the \
`compute_word_reduction` tool, providing your generated summary text as arguments. \
Finally, combine your summary and the results of the tool into one \
human-friendly, easy-to-read response.";

const GDRIVE_INSTRUCTION: &str = "Help the user manage their files. You can list files, search files, read files on Google Drive.";

const GSUITE_INSTRUCTION: &str = "Help the user use Google's services. \
Manage their files. You can list files, search files, read files on Google Drive. \
You can also read, send & delete emails, and get the current user's information.";

const REDDIT_INSTRUCTION: &str = "You are a Reddit news assistant. \
Call `fetch_reddit_posts` with the user's topic, then present the most interesting posts \
with their titles, subreddits and links. Do not invent posts. \
When the user asks for a report, call `generate_pdf` with a title and the post list, one post per line, \
and tell the user where the file was saved.";

const SEARCH_INSTRUCTION: &str = "Help the user search for various topics on the internet. Perform a web search by default.";

const WEB_AUTOMATION_INSTRUCTION: &str = "Help the user extract information from the web";

const FILE_MANAGER_INSTRUCTION: &str = "Help user accessing their file systems";

pub fn info(name: &str) -> Option<&'static AgentInfo> {
    AGENTS.iter().find(|a| a.name == name)
}

/// Build a catalog agent by name
pub fn build(name: &str, config: &Config, keys: &ApiKeys) -> Result<AgentShell> {
    let info = info(name).ok_or_else(|| {
        let known: Vec<&str> = AGENTS.iter().map(|a| a.name).collect();
        Error::NotFound(format!("Unknown agent: {} (available: {})", name, known.join(", ")))
    })?;

    config.validate()?;

    let shell = |instruction: &str| AgentShell::new(info.name, &config.model, info.description, instruction);
    let client = build_client(config.http_timeout())?;

    let agent = match info.name {
        "location_info_agent" => {
            let mut tools = ToolRegistry::new();
            tools.register(WeatherTool::new(client.clone(), keys.weather.clone()));
            tools.register(ClockTool);
            tools.register(TranslateTool::new(client.clone(), &config.model, keys.google.clone()));
            tools.register(SpeechTool::new(client, config.speech.clone(), keys.elevenlabs.clone()));
            shell(LOCATION_INSTRUCTION).with_tools(tools)
        }
        "summarizer" => {
            let mut tools = ToolRegistry::new();
            tools.register(WordReductionTool);
            shell(SUMMARIZER_INSTRUCTION).with_tools(tools)
        }
        "gdrive_assistant_agent" => {
            let mut tools = ToolRegistry::new();
            register_drive(&mut tools, drive_gateway(config)?);
            shell(GDRIVE_INSTRUCTION).with_tools(tools)
        }
        "gsuite_assistant_agent" => {
            let mut tools = ToolRegistry::new();
            register_drive(&mut tools, drive_gateway(config)?);
            gmail::register_all(&mut tools, mail_gateway(config)?, config.list_all_limit);
            shell(GSUITE_INSTRUCTION).with_tools(tools)
        }
        "reddit_agent" => {
            let mut tools = ToolRegistry::new();
            tools.register(RedditTool::new(client, config.reddit.clone()));
            tools.register(PdfTool::new(config.reports_dir.clone()));
            shell(REDDIT_INSTRUCTION).with_tools(tools)
        }
        "search_agent" => {
            let key = require_key(&keys.brave, "BRAVE_API_KEY")?;
            let server = ToolsetSpec::npx("@modelcontextprotocol/server-brave-search", &[])
                .with_env("BRAVE_API_KEY", key);
            shell(SEARCH_INSTRUCTION).with_toolset(server)
        }
        "web_automation_agent" => {
            let server = ToolsetSpec::npx("@modelcontextprotocol/server-puppeteer", &[]);
            shell(WEB_AUTOMATION_INSTRUCTION).with_toolset(server)
        }
        "file_manager_agent" => {
            let root = config.filesystem_root.display().to_string();
            let server = ToolsetSpec::npx("@modelcontextprotocol/server-filesystem", &[root]);
            shell(FILE_MANAGER_INSTRUCTION).with_toolset(server)
        }
        other => return Err(Error::NotFound(format!("Unknown agent: {}", other))),
    };

    tracing::debug!("Built {} with {} tools and {} tool servers", name, agent.tools().len(), agent.toolsets().len());
    Ok(agent)
}

fn register_drive(tools: &mut ToolRegistry, drive: Arc<DriveGateway>) {
    tools.register(ListDriveFilesTool::new(drive.clone()));
    tools.register(ReadDriveFileTool::new(drive));
}

/// Drive gateway with its own authenticator and credential record
pub fn drive_gateway(config: &Config) -> Result<Arc<DriveGateway>> {
    let auth = Arc::new(Integration::Drive.authenticator(config)?);
    let http = HttpTransport::new(DRIVE_API_BASE, config.http_timeout())?;
    Ok(Arc::new(DriveGateway::new(auth, http)))
}

/// Gmail gateway with its own authenticator and credential record
pub fn mail_gateway(config: &Config) -> Result<Arc<MailGateway>> {
    let auth = Arc::new(Integration::Gmail.authenticator(config)?);
    let http = HttpTransport::new(GMAIL_API_BASE, config.http_timeout())?;
    Ok(Arc::new(MailGateway::new(auth, http)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            credentials_dir: dir.join("credentials"),
            filesystem_root: dir.join("files"),
            ..Config::default()
        }
    }

    fn write_client_secrets(config: &Config) {
        std::fs::create_dir_all(&config.credentials_dir).unwrap();
        std::fs::write(
            config.client_secrets_path(),
            r#"{"installed": {"client_id": "id.apps.googleusercontent.com", "client_secret": "s"}}"#,
        ).unwrap();
    }

    fn names(agent: &AgentShell) -> Vec<&str> {
        agent.tools().tool_names()
    }

    #[test]
    fn test_every_catalog_entry_is_buildable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_client_secrets(&config);
        let keys = ApiKeys { brave: Some("b".into()), ..ApiKeys::default() };

        for info in AGENTS {
            let agent = build(info.name, &config, &keys).unwrap();
            assert_eq!(agent.name(), info.name);
            assert_eq!(agent.model(), "gemini-2.0-flash");
            assert!(!agent.instruction().is_empty());
            assert!(!agent.tools().is_empty() || !agent.toolsets().is_empty());
        }
    }

    #[test]
    fn test_location_agent_tools_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let agent = build("location_info_agent", &config_in(dir.path()), &ApiKeys::default()).unwrap();
        assert_eq!(names(&agent), vec!["get_weather", "get_current_time", "translate_response", "get_voice_response"]);
    }

    #[test]
    fn test_gsuite_agent_tools() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        write_client_secrets(&config);

        let agent = build("gsuite_assistant_agent", &config, &ApiKeys::default()).unwrap();
        assert_eq!(names(&agent), vec![
            "list_drive_files",
            "read_drive_file",
            "get_current_user_email_id",
            "send_email",
            "get_emails",
            "read_email_content",
            "delete_email",
        ]);
    }

    #[tokio::test]
    async fn test_reddit_agent_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { reports_dir: dir.path().join("reports"), ..config_in(dir.path()) };
        let agent = build("reddit_agent", &config, &ApiKeys::default()).unwrap();
        assert_eq!(names(&agent), vec!["fetch_reddit_posts", "generate_pdf"]);

        let outcome = agent
            .invoke("generate_pdf", json!({"title": "Space", "content": "r/space: launch today"}))
            .await
            .to_json();
        let path = outcome["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).starts_with(dir.path().join("reports")));
    }

    #[test]
    fn test_google_agents_need_client_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        for name in ["gdrive_assistant_agent", "gsuite_assistant_agent"] {
            let err = build(name, &config, &ApiKeys::default()).err().unwrap();
            assert!(matches!(err, Error::Config(_)), "{}: {}", name, err);
        }
    }

    #[test]
    fn test_search_agent_needs_brave_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = build("search_agent", &config, &ApiKeys::default()).err().unwrap();
        assert!(err.to_string().contains("BRAVE_API_KEY"));

        let keys = ApiKeys { brave: Some("b".into()), ..ApiKeys::default() };
        let agent = build("search_agent", &config, &keys).unwrap();
        assert_eq!(agent.manifest()["toolsets"][0]["env"], json!({"BRAVE_API_KEY": "<redacted>"}));
    }

    #[test]
    fn test_file_manager_is_rooted() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let agent = build("file_manager_agent", &config, &ApiKeys::default()).unwrap();

        match &agent.toolsets()[0] {
            ToolsetSpec::Stdio { command, args, .. } => {
                assert_eq!(command, "npx");
                assert_eq!(args.last().map(String::as_str), Some(dir.path().join("files").to_str().unwrap()));
            }
        }
    }

    #[test]
    fn test_out_of_range_config_is_rejected() {
        let config = Config { list_all_limit: 0, ..Config::default() };
        let err = build("summarizer", &config, &ApiKeys::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_agent() {
        let err = build("nope", &Config::default(), &ApiKeys::default()).err().unwrap();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("location_info_agent"));
    }

    #[tokio::test]
    async fn test_summarizer_invokes_tool() {
        let agent = build("summarizer", &Config::default(), &ApiKeys::default()).unwrap();
        let outcome = agent
            .invoke("compute_word_reduction", json!({"original_text": "a b c d", "summarized_text": "a"}))
            .await
            .to_json();
        assert_eq!(outcome["percentage_reduction"], 75.0);
    }
}
