use std::{
    env,
    io::{self, BufRead, Write},
    sync::Arc,
};

use anyhow::Context;
use smartwayz_client::{
    ApiConfig, AuthSessionManager, FileTokenStore, GeocodeConfig, GeocodeResolver,
    KeyringTokenStore, Report, ReqwestTransport, SessionClient, SessionState, TokenStore,
};
use smartwayz_core::UserProfile;

const KEYRING_SERVICE: &str = "smartwayz";
const KEYRING_ACCOUNT_PREFIX: &str = "session";

pub(crate) type SharedStore = Box<dyn TokenStore + Send + Sync>;
pub(crate) type Manager = AuthSessionManager<ReqwestTransport, SharedStore>;
pub(crate) type Client = SessionClient<ReqwestTransport, SharedStore>;

pub(crate) fn load_api_config() -> anyhow::Result<ApiConfig> {
    let mut config = ApiConfig::default();
    if let Ok(base_url) = env::var("SMARTWAYZ_API_URL") {
        config.base_url = base_url;
    }
    if let Ok(user_agent) = env::var("SMARTWAYZ_USER_AGENT") {
        config.user_agent = user_agent;
    }
    config.validate().context("invalid api configuration")?;
    Ok(config)
}

pub(crate) fn load_geocode_config() -> GeocodeConfig {
    GeocodeConfig::default().with_opencage_api_key(env::var("OPENCAGE_API_KEY").ok())
}

fn build_store() -> SharedStore {
    match env::var("SMARTWAYZ_TOKEN_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            log::debug!("using token file {path}");
            Box::new(FileTokenStore::new(path))
        }
        _ => Box::new(KeyringTokenStore::new(
            KEYRING_SERVICE,
            KEYRING_ACCOUNT_PREFIX,
        )),
    }
}

pub(crate) fn build_manager(config: &ApiConfig) -> anyhow::Result<Manager> {
    let transport = ReqwestTransport::new(config).context("failed to create http client")?;
    AuthSessionManager::new(config, transport, build_store())
        .context("failed to create session manager")
}

/// Restores the stored session and hands back its client, or explains how
/// to sign in.
pub(crate) async fn authenticated_client(manager: &Manager) -> anyhow::Result<Arc<Client>> {
    manager.restore().await;
    manager
        .require_authenticated()
        .context("not signed in; run `smartwayz auth login` first")
}

pub(crate) fn build_resolver(api: &ApiConfig) -> anyhow::Result<GeocodeResolver> {
    let transport = ReqwestTransport::new(api).context("failed to create http client")?;
    Ok(GeocodeResolver::standard(
        api,
        &load_geocode_config(),
        Arc::new(transport),
    ))
}

pub(crate) fn read_password(prompt: &str) -> anyhow::Result<String> {
    if let Ok(password) = env::var("SMARTWAYZ_PASSWORD") {
        return Ok(password);
    }

    print!("{prompt}: ");
    io::stdout().flush().context("failed to flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

pub(crate) fn print_profile(user: &UserProfile) {
    println!("User: {} ({})", user.display_name(), user.id);
    println!("Email: {}", user.email);
    println!("Role: {}", user.role);
    if let Some(authority) = &user.authority_name {
        println!("Authority: {authority}");
    }
}

pub(crate) fn print_session(state: &SessionState) {
    println!("Status: {:?}", state.status);
    match &state.user {
        Some(user) => print_profile(user),
        None if state.is_authenticated() => println!("User: <unknown>"),
        None => {}
    }
}

pub(crate) fn print_report(report: &Report) {
    println!("Report #{}", report.id);
    println!(
        "  Category: {}",
        report
            .category_name
            .clone()
            .unwrap_or_else(|| report.category.to_string())
    );
    if let Some(sub_category) = report.sub_category {
        println!("  Subcategory: {sub_category}");
    }
    println!("  Location: {}", report.coordinates());
    if let Some(description) = &report.description {
        println!("  Description: {description}");
    }
    if let Some(created_at) = &report.created_at {
        println!("  Created: {created_at}");
    }
}
