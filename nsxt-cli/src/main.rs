use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;

use nsxt_core::differ::{Diff, create_plan};
use nsxt_core::provider::Provider;
use nsxt_core::resource::{Resource, ResourceId, State, Value};
use nsxt_core::schema::ResourceSchema;
use nsxt_provider::resources::{find_schema, resource_types};
use nsxt_provider::{NsxtProvider, ProviderConfig};
use nsxt_state::{DEFAULT_STATE_PATH, RecordedResource, StateFile, StateLock, StateStore};

#[derive(Parser)]
#[command(name = "nsxt")]
#[command(about = "Manage NSX-T policy objects from a desired-state file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Path to the state file
    #[arg(long, global = true, default_value = DEFAULT_STATE_PATH)]
    state: PathBuf,

    /// Log provider operations (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ConnectionArgs {
    /// NSX manager host or URL
    #[arg(long, global = true, env = "NSXT_MANAGER_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "NSXT_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "NSXT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = "NSXT_ALLOW_UNVERIFIED_SSL")]
    allow_unverified_ssl: bool,

    /// Enforcement point used when a resource does not name one
    #[arg(long, global = true, env = "NSXT_POLICY_ENFORCEMENT_POINT")]
    enforcement_point: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the desired-state file against the resource schemas
    Validate {
        /// Path to the desired-state file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Delete every resource recorded in the state file
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,

        /// Read each resource back after deleting it and fail if it still exists
        #[arg(long)]
        verify: bool,
    },
    /// Adopt an existing NSX object into the state file
    Import {
        /// Resource type (e.g., "vpc")
        resource_type: String,
        /// Name of the resource in the state file
        name: String,
        /// Policy path of the object (or bare ID for ip_block)
        import_id: String,
    },
    /// Read the data sources declared in the desired-state file
    Lookup {
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Inspect or repair the state file
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List recorded resources
    List,
    /// Show the recorded attributes of one resource
    Show {
        /// Resource address (e.g., "vpc.web")
        address: String,
    },
    /// Release a lock left behind by an interrupted run
    Unlock {
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file, &cli.connection, &cli.state).await,
        Commands::Apply { file } => run_apply(&file, &cli.connection, &cli.state).await,
        Commands::Destroy {
            auto_approve,
            verify,
        } => run_destroy(&cli.connection, &cli.state, auto_approve, verify).await,
        Commands::Import {
            resource_type,
            name,
            import_id,
        } => {
            let id = ResourceId::new(resource_type, name);
            run_import(&id, &import_id, &cli.connection, &cli.state).await
        }
        Commands::Lookup { file } => run_lookup(&file, &cli.connection).await,
        Commands::State { command } => run_state_command(command, &cli.state).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// =============================================================================
// Desired-State File
// =============================================================================

/// `{ "resources": [...], "data": [...] }`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DesiredStateFile {
    resources: Vec<Declaration>,
    data: Vec<Declaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Declaration {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl Declaration {
    fn to_resource(&self, read_only: bool) -> Resource {
        let mut resource = Resource::new(&self.resource_type, &self.name).with_read_only(read_only);
        for (key, value) in &self.attributes {
            if let Some(value) = Value::from_json(value) {
                resource.attributes.insert(key.clone(), value);
            }
        }
        resource
    }
}

#[derive(Debug)]
struct Desired {
    resources: Vec<Resource>,
    data: Vec<Resource>,
}

fn parse_desired(content: &str) -> Result<Desired, String> {
    let file: DesiredStateFile =
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;

    let resources: Vec<Resource> = file.resources.iter().map(|d| d.to_resource(false)).collect();
    let data: Vec<Resource> = file.data.iter().map(|d| d.to_resource(true)).collect();

    for list in [&resources, &data] {
        let mut seen = std::collections::HashSet::new();
        for resource in list {
            if !seen.insert(&resource.id) {
                return Err(format!("{} is declared more than once", resource.id));
            }
        }
    }

    Ok(Desired { resources, data })
}

fn load_desired(file: &Path) -> Result<Desired, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    parse_desired(&content)
}

fn schema_for(resource: &Resource) -> Result<ResourceSchema, String> {
    find_schema(&resource.id.resource_type, resource.read_only).ok_or_else(|| {
        let kind = if resource.read_only { "data source" } else { "resource type" };
        format!("{}: unknown {} '{}'", resource.id, kind, resource.id.resource_type)
    })
}

fn validate_resources(desired: &Desired) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for resource in desired.resources.iter().chain(&desired.data) {
        match schema_for(resource) {
            Ok(schema) => {
                if let Err(errors) = schema.validate(&resource.attributes) {
                    for error in errors {
                        all_errors.push(format!("{}: {}", resource.id, error));
                    }
                }
            }
            Err(e) => all_errors.push(e),
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

/// Schemas of managed resource types, keyed by type name
fn resource_schemas() -> HashMap<String, ResourceSchema> {
    resource_types()
        .into_iter()
        .filter(|t| !t.is_data_source())
        .map(|t| (t.name().to_string(), t.schema()))
        .collect()
}

/// Desired resources with schema defaults filled in, as the differ expects
fn with_defaults(resources: &[Resource], schemas: &HashMap<String, ResourceSchema>) -> Vec<Resource> {
    resources
        .iter()
        .map(|r| {
            let mut resource = r.clone();
            if let Some(schema) = schemas.get(&r.id.resource_type) {
                resource.attributes = schema.with_defaults(&r.attributes);
            }
            resource
        })
        .collect()
}

// =============================================================================
// Provider and State
// =============================================================================

fn get_provider(connection: &ConnectionArgs) -> Result<NsxtProvider, String> {
    let mut config = ProviderConfig {
        host: connection.host.clone().unwrap_or_default(),
        username: connection.username.clone().unwrap_or_default(),
        password: connection.password.clone().unwrap_or_default(),
        allow_unverified_ssl: connection.allow_unverified_ssl,
        ..Default::default()
    };
    if let Some(enforcement_point) = &connection.enforcement_point {
        config.enforcement_point = enforcement_point.clone();
    }

    config.validate().map_err(|e| e.to_string())?;
    log::info!("Using NSX manager at {}", config.base_url());
    NsxtProvider::new(config).map_err(|e| e.to_string())
}

async fn open_store(state_path: &Path) -> Result<StateStore, String> {
    StateStore::open(state_path)
        .await
        .map_err(|e| format!("Failed to open state: {}", e))
}

async fn read_state(store: &StateStore) -> Result<StateFile, String> {
    store
        .load()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))
}

/// Read the state and check it belongs to the manager `provider` talks to
async fn load_state(store: &StateStore, provider: &NsxtProvider) -> Result<StateFile, String> {
    let mut state = read_state(store).await?;
    state
        .bind_manager(&provider.config().base_url())
        .map_err(|e| e.to_string())?;
    Ok(state)
}

async fn save_state(store: &StateStore, state: &mut StateFile) -> Result<(), String> {
    store
        .save(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

/// Resource carrying the recorded attributes (scope included) of a state entry
fn recorded_resource(recorded: &RecordedResource) -> Resource {
    recorded_from(&recorded.to_state())
}

/// Refresh every recorded resource from the manager
async fn refresh(provider: &dyn Provider, state: &StateFile) -> Result<Vec<State>, String> {
    let mut current = Vec::new();
    for recorded in &state.managed {
        let resource = recorded_resource(recorded);
        let refreshed = provider
            .read(&resource, &recorded.nsx_id)
            .await
            .map_err(|e| format!("Failed to read {}: {}", resource.id, e))?;
        if refreshed.exists {
            current.push(refreshed);
        } else {
            println!(
                "  {} {} no longer exists",
                "!".yellow(),
                resource.id.to_string().yellow()
            );
        }
    }
    Ok(current)
}

async fn lock_state(store: &StateStore, operation: &str) -> Result<StateLock, String> {
    store
        .lock(operation)
        .await
        .map_err(|e| format!("Failed to acquire state lock: {}", e))
}

async fn unlock_state(store: &StateStore, lock: &StateLock) {
    if let Err(e) = store.unlock(lock).await {
        eprintln!("{} failed to release state lock: {}", "Warning:".yellow(), e);
    }
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    let desired = load_desired(file)?;
    validate_resources(&desired)?;

    println!(
        "{} {} resource(s), {} data source(s)",
        "✓ Configuration is valid:".green().bold(),
        desired.resources.len(),
        desired.data.len()
    );
    Ok(())
}

async fn run_plan(file: &Path, connection: &ConnectionArgs, state_path: &Path) -> Result<(), String> {
    let desired = load_desired(file)?;
    validate_resources(&desired)?;

    let provider = get_provider(connection)?;
    let store = open_store(state_path).await?;
    let state = load_state(&store, &provider).await?;

    let current = refresh(&provider, &state).await?;
    let schemas = resource_schemas();
    let plan = create_plan(&with_defaults(&desired.resources, &schemas), &current, &schemas);

    print_plan(&plan);
    Ok(())
}

async fn run_apply(file: &Path, connection: &ConnectionArgs, state_path: &Path) -> Result<(), String> {
    let desired = load_desired(file)?;
    validate_resources(&desired)?;

    let provider = get_provider(connection)?;
    let store = open_store(state_path).await?;

    let lock = lock_state(&store, "apply").await?;
    let result = apply_changes(&provider, &store, &desired).await;
    unlock_state(&store, &lock).await;
    result
}

async fn apply_changes(
    provider: &NsxtProvider,
    store: &StateStore,
    desired: &Desired,
) -> Result<(), String> {
    let mut state = load_state(store, provider).await?;
    let current = refresh(provider, &state).await?;

    // Drop entries the manager no longer knows about
    state.retain_present(&current);

    let schemas = resource_schemas();
    let plan = create_plan(&with_defaults(&desired.resources, &schemas), &current, &schemas);

    if !plan.iter().any(Diff::is_change) {
        println!("{}", "No changes needed.".green());
        return save_state(store, &mut state).await;
    }

    print_plan(&plan);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let mut success_count = 0;
    let mut failure_count = 0;

    for diff in plan.iter().filter(|d| d.is_change()) {
        match apply_diff(provider, diff, &mut state).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), diff.summary());
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), diff.summary(), e);
                failure_count += 1;
            }
        }
    }

    save_state(store, &mut state).await?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

async fn apply_diff(provider: &NsxtProvider, diff: &Diff, state: &mut StateFile) -> Result<(), String> {
    match diff {
        Diff::Create(resource) => {
            let created = provider.create(resource).await.map_err(|e| e.to_string())?;
            record(state, &created);
        }
        Diff::Update { from, to, .. } => {
            let identifier = identifier_of(from)?;
            let updated = provider
                .update(identifier, from, to)
                .await
                .map_err(|e| e.to_string())?;
            record(state, &updated);
        }
        Diff::Replace { from, to, .. } => {
            let identifier = identifier_of(from)?;
            provider
                .delete(&recorded_from(from), identifier)
                .await
                .map_err(|e| e.to_string())?;
            state.forget(&from.id);

            let created = provider.create(to).await.map_err(|e| e.to_string())?;
            record(state, &created);
        }
        Diff::Delete(from) => {
            let identifier = identifier_of(from)?;
            provider
                .delete(&recorded_from(from), identifier)
                .await
                .map_err(|e| e.to_string())?;
            state.forget(&from.id);
        }
        Diff::NoChange(_) => {}
    }
    Ok(())
}

/// Resource addressing the object a state was read from
fn recorded_from(state: &State) -> Resource {
    let mut resource = Resource::new(&state.id.resource_type, &state.id.name);
    resource.attributes = state.attributes.clone();
    resource
}

fn identifier_of(state: &State) -> Result<&str, String> {
    state
        .identifier
        .as_deref()
        .ok_or_else(|| format!("{} has no recorded identifier", state.id))
}

fn record(state: &mut StateFile, result: &State) {
    if !state.record(result) {
        log::warn!("{} has no remote object, not recorded", result.id);
    }
}

async fn run_destroy(
    connection: &ConnectionArgs,
    state_path: &Path,
    auto_approve: bool,
    verify: bool,
) -> Result<(), String> {
    let provider = get_provider(connection)?;
    let store = open_store(state_path).await?;

    let lock = lock_state(&store, "destroy").await?;
    let result = destroy_recorded(&provider, &store, auto_approve, verify).await;
    unlock_state(&store, &lock).await;
    result
}

async fn destroy_recorded(
    provider: &NsxtProvider,
    store: &StateStore,
    auto_approve: bool,
    verify: bool,
) -> Result<(), String> {
    let mut state = load_state(store, provider).await?;

    if state.is_empty() {
        println!("{}", "No resources recorded in state.".yellow());
        return Ok(());
    }

    println!("{}", "The following resources will be destroyed:".red().bold());
    for recorded in state.destroy_order() {
        println!("  {} {}.{}", "-".red(), recorded.resource_type, recorded.name);
    }
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    let mut success_count = 0;
    let mut failure_count = 0;

    let destroy_order: Vec<RecordedResource> = state.destroy_order().cloned().collect();
    for recorded in destroy_order {
        let resource = recorded_resource(&recorded);
        match destroy_one(provider, &resource, &recorded.nsx_id, verify).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), resource.id);
                state.forget(&resource.id);
                success_count += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), resource.id, e);
                failure_count += 1;
            }
        }
    }

    save_state(store, &mut state).await?;

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

async fn destroy_one(
    provider: &NsxtProvider,
    resource: &Resource,
    identifier: &str,
    verify: bool,
) -> Result<(), String> {
    provider
        .delete(resource, identifier)
        .await
        .map_err(|e| e.to_string())?;
    if verify {
        provider
            .check_destroyed(resource, identifier)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool, String> {
    print!("{} Only 'yes' will be accepted: ", question.bold());
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| format!("Failed to read input: {}", e))?;
    Ok(input.trim() == "yes")
}

async fn run_import(
    id: &ResourceId,
    import_id: &str,
    connection: &ConnectionArgs,
    state_path: &Path,
) -> Result<(), String> {
    let provider = get_provider(connection)?;
    let store = open_store(state_path).await?;

    let lock = lock_state(&store, "import").await?;
    let result = import_into_state(&provider, &store, id, import_id).await;
    unlock_state(&store, &lock).await;
    result
}

async fn import_into_state(
    provider: &NsxtProvider,
    store: &StateStore,
    id: &ResourceId,
    import_id: &str,
) -> Result<(), String> {
    let mut state = load_state(store, provider).await?;
    if state.get(id).is_some() {
        return Err(format!("{} is already recorded in state", id));
    }

    let imported = provider
        .import(id, import_id)
        .await
        .map_err(|e| e.to_string())?;
    record(&mut state, &imported);
    save_state(store, &mut state).await?;

    println!("{} {} from {}", "✓ Imported".green().bold(), id, import_id);
    print_attributes(&imported.attributes);
    Ok(())
}

async fn run_lookup(file: &Path, connection: &ConnectionArgs) -> Result<(), String> {
    let desired = load_desired(file)?;
    validate_resources(&desired)?;

    if desired.data.is_empty() {
        println!("{}", "No data sources declared in configuration.".yellow());
        return Ok(());
    }

    let provider = get_provider(connection)?;
    for query in &desired.data {
        let state = provider
            .lookup(query)
            .await
            .map_err(|e| format!("{}: {}", query.id, e))?;

        println!("{} {}", "data".cyan().bold(), query.id.to_string().bold());
        print_attributes(&state.attributes);
        println!();
    }
    Ok(())
}

async fn run_state_command(command: StateCommands, state_path: &Path) -> Result<(), String> {
    let store = open_store(state_path).await?;

    match command {
        StateCommands::List => {
            let state = read_state(&store).await?;
            if let Some(manager) = &state.manager {
                println!("{} {}", "Manager:".bold(), manager);
            }
            for recorded in &state.managed {
                println!("{}  {}", recorded.id(), recorded.nsx_id.dimmed());
            }
            if let Some(lock) = store.current_lock().await.map_err(|e| e.to_string())? {
                println!();
                println!("{} {}", "Locked:".yellow().bold(), lock);
            }
        }
        StateCommands::Show { address } => {
            let state = read_state(&store).await?;
            let (resource_type, name) = address
                .split_once('.')
                .ok_or_else(|| format!("invalid address '{}', expected <type>.<name>", address))?;
            let recorded = state
                .get(&ResourceId::new(resource_type, name))
                .ok_or_else(|| format!("{} is not recorded in state", address))?;

            println!("{} {}", address.bold(), recorded.nsx_id.dimmed());
            print_attributes(&recorded.to_state().attributes);
        }
        StateCommands::Unlock { lock_id } => {
            store
                .force_unlock(&lock_id)
                .await
                .map_err(|e| format!("Failed to unlock state: {}", e))?;
            println!("{} {}", "✓ Released lock".green().bold(), lock_id);
        }
    }
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn print_plan(plan: &[Diff]) {
    let changes: Vec<&Diff> = plan.iter().filter(|d| d.is_change()).collect();
    if changes.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let (mut create, mut update, mut replace, mut delete) = (0, 0, 0, 0);
    for diff in &changes {
        let line = diff.summary();
        match diff {
            Diff::Create(_) => {
                create += 1;
                println!("  {}", line.green());
            }
            Diff::Update { .. } => {
                update += 1;
                println!("  {}", line.yellow());
            }
            Diff::Replace { .. } => {
                replace += 1;
                println!("  {}", line.magenta());
            }
            Diff::Delete(_) => {
                delete += 1;
                println!("  {}", line.red());
            }
            Diff::NoChange(_) => {}
        }
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        create.to_string().green(),
        update.to_string().yellow(),
        replace.to_string().magenta(),
        delete.to_string().red()
    );
}

fn print_attributes(attributes: &HashMap<String, Value>) {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!("    {} = {}", key, format_value(&attributes[key]));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} = {}", k, format_value(v)))
                .collect();
            entries.sort();
            format!("{{ {} }}", entries.join(", "))
        }
    }
}
