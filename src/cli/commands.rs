use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::sync::broadcast::Receiver;

use lakeconn::blueprint::{filter_blueprints, BlueprintFilter, BlueprintQuery};
use lakeconn::connection::{Connection, ConnectionId, Field};
use lakeconn::gateway::{ConnectionGateway, GatewayConfig, HttpGateway};
use lakeconn::manager::{
    ConnectionManager, DeletePhase, FetchPhase, Intent, ManagerEvent, SavePhase,
};
use lakeconn::provider::{self, AuthStyle, Payload};
use lakeconn::storage::{Config, ConfigStore};

/// Connection fields settable from the command line.
#[derive(Debug, Default, Args)]
pub struct FieldArgs {
    /// Connection name
    #[arg(long)]
    pub name: Option<String>,
    /// Data source endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Proxy URL (providers that support one)
    #[arg(long)]
    pub proxy: Option<String>,
    /// Access token; repeat for several tokens
    #[arg(long = "token")]
    pub tokens: Vec<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
}

impl FieldArgs {
    fn apply(&self, mgr: &ConnectionManager<HttpGateway>) {
        for (field, value) in [
            (Field::Name, &self.name),
            (Field::Endpoint, &self.endpoint),
            (Field::Proxy, &self.proxy),
            (Field::Username, &self.username),
            (Field::Password, &self.password),
        ] {
            if let Some(value) = value {
                mgr.set_field(field, value.as_str());
            }
        }

        if !self.tokens.is_empty() {
            // Blank out slots left over from a fetched connection.
            let slots = mgr
                .snapshot()
                .fields
                .token_slots()
                .len()
                .max(self.tokens.len());
            for i in 0..slots {
                mgr.set_token_slot(i, self.tokens.get(i).cloned().unwrap_or_default());
            }
        }
    }
}

/// Everything a backend command needs: the loaded config and a gateway.
pub struct Backend {
    config: Config,
    gateway: Arc<HttpGateway>,
}

impl Backend {
    pub fn open(server: Option<&str>) -> Result<Self> {
        let store = ConfigStore::new()?;
        let config = store.load_config()?;
        let endpoint = store.resolve_endpoint(server)?;

        let gateway = HttpGateway::new(
            GatewayConfig::new(endpoint.as_str()).with_timeout(config.timeout()),
        )
        .with_context(|| format!("Invalid endpoint '{}'", endpoint))?;

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    fn manager(&self, provider_name: &str) -> Result<ConnectionManager<HttpGateway>> {
        Ok(ConnectionManager::new(self.gateway.clone(), provider_name)?
            .with_test_concurrency(self.config.test_concurrency)
            .with_connection_limits(self.config.connection_limits()))
    }
}

/// Prints pending toasts to stderr.
fn print_notifications(rx: &mut Receiver<ManagerEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let ManagerEvent::Notify(n) = event {
            match n.intent {
                Intent::Success => eprintln!("{}", n.message),
                Intent::Danger => eprintln!("! {}", n.message),
            }
        }
    }
}

fn last_error(errors: &[String]) -> String {
    errors
        .last()
        .cloned()
        .unwrap_or_else(|| "unknown error".to_string())
}

fn print_connection_line(conn: &Connection) {
    println!(
        "  {:>4}  {:<24} {:<40} {:?}",
        conn.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
        conn.name,
        conn.endpoint,
        conn.status
    );
}

pub fn cmd_providers() -> Result<()> {
    let config = ConfigStore::new()?.load_config()?;
    let limits = config.connection_limits();

    for prov in provider::all_providers() {
        let auth = match prov.auth_style() {
            AuthStyle::Basic => "username/password",
            AuthStyle::Token => "token",
        };
        let limit = limits
            .get(prov.name())
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        println!(
            "{:<8} {:<8} auth={} proxy={} limit={}",
            prov.name(),
            prov.display_name(),
            auth,
            if prov.supports_proxy() { "yes" } else { "no" },
            limit
        );
    }
    Ok(())
}

pub async fn cmd_list(
    backend: &Backend,
    provider_name: &str,
    all_sources: bool,
    test: bool,
) -> Result<()> {
    let mgr = backend.manager(provider_name)?;
    let mut rx = mgr.subscribe();

    mgr.fetch_all_connections(false, all_sources).await;
    print_notifications(&mut rx);

    let state = mgr.snapshot();
    if !state.errors.is_empty() {
        if state.is_offline() {
            bail!("Backend is offline: {}", last_error(&state.errors));
        }
        bail!("{}", last_error(&state.errors));
    }

    let mut connections = state.connections.clone();
    if test {
        mgr.test_all_connections(&connections).await;
        let tested = mgr.snapshot().tested_connections;
        for conn in connections.iter_mut() {
            if let Some(t) = tested.iter().find(|t| t.id == conn.id) {
                conn.status = t.status;
            }
        }
    }

    if connections.is_empty() {
        eprintln!(
            "No {} connections. Run `lakeconn add {}` to create one.",
            mgr.provider().display_name(),
            provider_name
        );
    } else {
        println!("{}:", provider_name);
        for conn in &connections {
            print_connection_line(conn);
        }
    }
    if state.limit_reached {
        eprintln!(
            "Connection limit reached for {} ({} of {}).",
            provider_name,
            state.connection_count,
            state.connection_limits.get(provider_name).copied().unwrap_or_default()
        );
    }

    if all_sources {
        println!("all sources:");
        for conn in &state.all_provider_connections {
            println!(
                "  {:<8} {:>4}  {}",
                conn.provider,
                conn.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
                conn.name
            );
        }
    }

    Ok(())
}

pub async fn cmd_get(backend: &Backend, provider_name: &str, id: &str) -> Result<()> {
    let id: ConnectionId = id.parse()?;
    let mgr = backend.manager(provider_name)?.editing(id);
    let mut rx = mgr.subscribe();

    mgr.fetch_connection(false, None).await;
    print_notifications(&mut rx);

    let state = mgr.snapshot();
    if state.fetch == FetchPhase::Failed {
        bail!("{}", last_error(&state.errors));
    }
    println!("{}", serde_json::to_string_pretty(&state.active_connection)?);
    Ok(())
}

fn check_required(mgr: &ConnectionManager<HttpGateway>) -> Result<()> {
    let state = mgr.snapshot();
    let missing: Vec<String> = mgr
        .provider()
        .required_fields()
        .into_iter()
        .filter(|f| state.fields.get(*f).trim().is_empty())
        .map(|f| format!("--{}", f))
        .collect();
    if !missing.is_empty() {
        bail!(
            "Missing required fields for {}: {}",
            mgr.provider().display_name(),
            missing.join(", ")
        );
    }
    Ok(())
}

async fn save(mgr: &ConnectionManager<HttpGateway>) -> Result<Connection> {
    let mut rx = mgr.subscribe();
    mgr.save_connection(Payload::new()).await;
    print_notifications(&mut rx);

    let state = mgr.snapshot();
    match (state.save, state.saved) {
        (SavePhase::Saved, Some(saved)) => Ok(saved),
        _ => bail!("{}", last_error(&state.errors)),
    }
}

pub async fn cmd_add(backend: &Backend, provider_name: &str, fields: &FieldArgs) -> Result<()> {
    let mgr = backend.manager(provider_name)?;

    mgr.fetch_all_connections(false, false).await;
    let state = mgr.snapshot();
    if state.limit_reached {
        bail!(
            "Connection limit reached for {}; remove a connection first.",
            mgr.provider().display_name()
        );
    }

    mgr.clear_connection();
    fields.apply(&mgr);
    check_required(&mgr)?;

    let saved = save(&mgr).await?;
    eprintln!(
        "Connection saved: {}/{} ({})",
        provider_name,
        saved.id.map(|id| id.to_string()).unwrap_or_default(),
        saved.name
    );
    Ok(())
}

pub async fn cmd_update(
    backend: &Backend,
    provider_name: &str,
    id: &str,
    fields: &FieldArgs,
) -> Result<()> {
    let id: ConnectionId = id.parse()?;
    let mgr = backend.manager(provider_name)?.editing(id.clone());
    let mut rx = mgr.subscribe();

    mgr.fetch_connection(false, None).await;
    print_notifications(&mut rx);
    if mgr.snapshot().fetch == FetchPhase::Failed {
        bail!("Could not load {}/{}", provider_name, id);
    }

    fields.apply(&mgr);
    check_required(&mgr)?;

    let saved = save(&mgr).await?;
    eprintln!("Connection updated: {}/{} ({})", provider_name, id, saved.name);
    Ok(())
}

pub async fn cmd_remove(backend: &Backend, provider_name: &str, id: &str) -> Result<()> {
    let id: ConnectionId = id.parse()?;
    let mgr = backend.manager(provider_name)?;
    let mut rx = mgr.subscribe();

    mgr.fetch_all_connections(false, false).await;
    let connections = mgr.snapshot().connections;
    let target = connections
        .iter()
        .find(|c| c.id.as_ref() == Some(&id))
        .cloned()
        .unwrap_or_else(|| Connection {
            id: Some(id.clone()),
            provider: provider_name.to_string(),
            ..Connection::default()
        });
    let name = ConnectionManager::<HttpGateway>::connection_name(&id, &connections);

    mgr.delete_connection(&target).await;
    print_notifications(&mut rx);

    let state = mgr.snapshot();
    if state.delete != DeletePhase::Deleted {
        bail!("{}", last_error(&state.errors));
    }
    eprintln!("Removed {}/{} ({}).", provider_name, id, name);
    Ok(())
}

pub async fn cmd_test(
    backend: &Backend,
    provider_name: &str,
    id: Option<&str>,
    fields: &FieldArgs,
) -> Result<()> {
    let mut mgr = backend.manager(provider_name)?;
    let mut rx = mgr.subscribe();

    if let Some(id) = id {
        let id: ConnectionId = id.parse()?;
        mgr = mgr.editing(id.clone());
        mgr.fetch_connection(false, None).await;
        if mgr.snapshot().fetch == FetchPhase::Failed {
            print_notifications(&mut rx);
            bail!("Could not load {}/{}", provider_name, id);
        }
    }
    fields.apply(&mgr);

    let result = mgr.test_connection(true, Payload::new()).await;
    print_notifications(&mut rx);

    if !result.success {
        bail!("Connection test failed");
    }
    Ok(())
}

pub async fn cmd_repos(backend: &Backend) -> Result<()> {
    let repos = backend.gateway.domain_repositories().await?;
    if repos.is_empty() {
        eprintln!("No repositories collected yet.");
        return Ok(());
    }
    for repo in repos {
        println!(
            "{}  {}  {}",
            repo.id,
            repo.name,
            repo.language.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn cmd_version(backend: &Backend) -> Result<()> {
    let version = backend.gateway.version().await?;
    println!("{}", version.version);
    Ok(())
}

pub async fn cmd_blueprints(
    backend: &Backend,
    filter: Option<&str>,
    enabled_only: bool,
) -> Result<()> {
    let filter: Option<BlueprintFilter> = filter.map(str::parse::<BlueprintFilter>).transpose()?;
    let query = BlueprintQuery {
        enable: enabled_only.then_some(true),
        ..BlueprintQuery::default()
    };

    let list = backend.gateway.list_blueprints(&query).await?;
    let shown = filter_blueprints(&list.blueprints, filter);

    if shown.is_empty() {
        eprintln!("No blueprints match.");
        return Ok(());
    }
    for bp in shown {
        let schedule = match bp.preset() {
            Some(preset) => preset.to_string(),
            None if bp.is_manual => "manual".to_string(),
            None => bp.cron_config.clone(),
        };
        println!(
            "{:>4}  {:<32} {:<12} {}",
            bp.id,
            bp.name,
            schedule,
            if bp.enable { "enabled" } else { "disabled" }
        );
    }
    eprintln!("{} of {} blueprints.", list.blueprints.len(), list.count);
    Ok(())
}

pub async fn cmd_blueprint_enable(backend: &Backend, id: u64, enable: bool) -> Result<()> {
    let bp = backend.gateway.set_blueprint_enabled(id, enable).await?;
    eprintln!(
        "Blueprint {} ({}) {}.",
        bp.id,
        bp.name,
        if bp.enable { "activated" } else { "deactivated" }
    );
    Ok(())
}

// -- Config -------------------------------------------------------------------

pub fn cmd_config_show(server: Option<&str>) -> Result<()> {
    let store = ConfigStore::new()?;
    let config = store.load_config()?;

    println!("# {}", store.config_path().display());
    println!("# resolved endpoint: {}", store.resolve_endpoint(server)?);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn cmd_config_set_endpoint(url: &str) -> Result<()> {
    let store = ConfigStore::new()?;
    store.set_endpoint(url)?;
    eprintln!("Endpoint set to {}.", url);
    Ok(())
}

pub fn cmd_config_set_limit(provider_name: &str, limit: Option<usize>) -> Result<()> {
    let store = ConfigStore::new()?;
    store.set_connection_limit(provider_name, limit)?;
    match limit {
        Some(limit) => eprintln!("Connection limit for '{}' set to {}.", provider_name, limit),
        None => eprintln!("Connection limit for '{}' reset to default.", provider_name),
    }
    Ok(())
}
