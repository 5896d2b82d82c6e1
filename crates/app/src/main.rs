//! Courier - command line front end over the request engine.
//!
//! Imports a Postman collection, lists its requests, and sends one by
//! name through the full pipeline: overrides, variable resolution,
//! scripts, dispatch, persistence and history.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use courier_application::environments::EnvironmentStore;
use courier_application::history::HistoryStore;
use courier_application::overrides::OverrideStore;
use courier_application::session::SessionStore;
use courier_application::{SendRequest, VariableStore};
use courier_domain::{FailureKind, SendState};
use courier_infrastructure::{
    FileKeyValueStore, ReqwestHttpClient, import_collection, import_environment,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: courier <collection.json> [--env <file>] [--send <request name>] \
                     [--prefix <folder prefix>] [--state <file>]";

struct Args {
    collection: String,
    environment: Option<String>,
    send: Option<String>,
    prefix: Option<String>,
    state: String,
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args, String> {
    let default_state = std::env::var("COURIER_STATE")
        .unwrap_or_else(|_| ".courier/state.json".to_string());

    let mut collection = None;
    let mut environment = None;
    let mut send = None;
    let mut prefix = None;
    let mut state = default_state;

    while let Some(arg) = argv.next() {
        let mut value_for = |flag: &str| {
            argv.next()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--env" => environment = Some(value_for("--env")?),
            "--send" => send = Some(value_for("--send")?),
            "--prefix" => prefix = Some(value_for("--prefix")?),
            "--state" => state = value_for("--state")?,
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            positional if collection.is_none() => collection = Some(positional.to_string()),
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }

    Ok(Args {
        collection: collection.ok_or("missing collection file")?,
        environment,
        send,
        prefix,
        state,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(reason) => {
            eprintln!("{reason}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(reason) => {
            eprintln!("{reason}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, String> {
    let content = std::fs::read_to_string(&args.collection)
        .map_err(|e| format!("cannot read {}: {e}", args.collection))?;
    let collection = import_collection(&content, args.prefix.as_deref())
        .map_err(|e| format!("{}: {e}", args.collection))?;

    let Some(name) = args.send else {
        list_requests(&collection);
        return Ok(ExitCode::SUCCESS);
    };

    let kv = Arc::new(FileKeyValueStore::new(&args.state));
    let mut overrides = OverrideStore::new(kv.clone());
    let environments = EnvironmentStore::new(kv.clone());
    let history = HistoryStore::new(kv.clone());
    let session = SessionStore::new(kv);

    let environment = match &args.environment {
        Some(path) => {
            let env_content =
                std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))?;
            let env = import_environment(&env_content, &file_stem(path))
                .map_err(|e| format!("{path}: {e}"))?;
            environments.save(&env).await;
            session.set_selected_environment(&env.name).await;
            env
        }
        None => match session.selected_environment().await {
            Some(selected) => environments.load(&selected).await,
            None => courier_domain::EnvironmentSet::default(),
        },
    };

    let mut vars = VariableStore::new(collection.variables.clone(), environment, BTreeMap::new());

    let definition = collection
        .request_by_name(&name)
        .ok_or_else(|| format!("no request named {name:?} in {}", collection.name))?;
    let editable = overrides.initial_state(definition, false).await;
    let global_bearer = session.global_bearer().await;

    let client = ReqwestHttpClient::new().map_err(|e| format!("http client setup: {e}"))?;
    let mut send = SendRequest::new(&client, &mut overrides, &environments, &history);
    let outcome = send
        .execute(
            &editable,
            &collection.scripts,
            definition.auth.as_ref(),
            &mut vars,
            global_bearer.as_deref(),
        )
        .await;

    for line in &outcome.logs {
        println!("| {line}");
    }
    Ok(report(&outcome.state))
}

fn list_requests(collection: &courier_domain::CollectionSpec) {
    println!("{} ({} requests)", collection.name, collection.requests.len());
    for request in &collection.requests {
        let folder = if request.folder_path.is_empty() {
            String::new()
        } else {
            format!("{} / ", request.folder_path.join(" / "))
        };
        println!(
            "  {:<7} {folder}{}  {}",
            request.method.as_str(),
            request.name,
            request.url
        );
    }
}

fn report(state: &SendState) -> ExitCode {
    match state {
        SendState::Succeeded { response } => {
            println!(
                "{} {} ({} ms)",
                response.status, response.status_text, response.duration_ms
            );
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
            ExitCode::SUCCESS
        }
        SendState::Failed { kind, response } => {
            let label = match kind {
                FailureKind::Timeout => "timed out",
                FailureKind::Network => "network error",
                FailureKind::ScriptAborted => "aborted by script",
            };
            eprintln!(
                "{label}: {} {} ({} ms)",
                response.status, response.status_text, response.duration_ms
            );
            if !response.body.is_empty() {
                eprintln!("{}", response.body);
            }
            ExitCode::FAILURE
        }
        SendState::Idle | SendState::Sending { .. } => ExitCode::FAILURE,
    }
}

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map_or_else(|| "environment".to_string(), |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn test_parse_args_collection_only() {
        let parsed = args(&["api.json"]).unwrap();
        assert_eq!(parsed.collection, "api.json");
        assert!(parsed.send.is_none());
        assert!(parsed.environment.is_none());
    }

    #[test]
    fn test_parse_args_full() {
        let parsed = args(&[
            "api.json", "--env", "dev.json", "--send", "List orders", "--prefix", "Shop",
            "--state", "/tmp/state.json",
        ])
        .unwrap();
        assert_eq!(parsed.environment.as_deref(), Some("dev.json"));
        assert_eq!(parsed.send.as_deref(), Some("List orders"));
        assert_eq!(parsed.prefix.as_deref(), Some("Shop"));
        assert_eq!(parsed.state, "/tmp/state.json");
    }

    #[test]
    fn test_parse_args_rejects_missing_value() {
        assert!(args(&["api.json", "--send"]).is_err());
        assert!(args(&["--env", "dev.json"]).is_err());
        assert!(args(&["api.json", "--bogus"]).is_err());
    }

    #[test]
    fn test_file_stem_fallback() {
        assert_eq!(file_stem("envs/dev.json"), "dev");
        assert_eq!(file_stem(""), "environment");
    }
}
