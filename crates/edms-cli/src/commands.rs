use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};

use edms_model::Thing;
use edms_server::{EdmsServer, ServerConfig};
use edms_service::{EdmsService, ReadOptions, WriteRequest};
use edms_types::{ClassKind, Iid};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::CheckConfig(args) => cmd_check_config(args, &cli.format),
        Command::Demo(args) => cmd_demo(args, &cli.format),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            ServerConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = EdmsServer::new(config)?;
    println!(
        "{} EDMS server on {} (site directory {})",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.site().site_directory.to_string().cyan()
    );
    if let Some(seeded) = server.seeded() {
        println!("  Seed model: {}", seeded.handle.model.to_string().cyan());
        println!("  Iteration:  {}", seeded.handle.iteration.to_string().cyan());
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(Some(&args.config))?;
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    println!("{} {} is valid", "✓".green().bold(), args.config.display());
    println!("  Bind:            {}", config.bind_addr.to_string().bold());
    println!("  Site:            {}", config.site_name);
    println!("  Administrator:   {}", config.admin.yellow());
    println!("  Anonymous reads: {}", config.allow_anonymous_read);
    println!("  Tokens:          {}", config.tokens.len());
    match &config.service.blob_dir {
        Some(dir) => println!("  Blobs:           {}", dir.display()),
        None => println!("  Blobs:           {}", "in memory".dimmed()),
    }
    if let Some(seed) = &config.seed {
        println!(
            "  Seed model:      {} ({}), domain {}",
            seed.model_name, seed.model_short_name, seed.domain_short_name
        );
    }
    Ok(())
}

fn thing(value: Value) -> anyhow::Result<Thing> {
    serde_json::from_value(value).context("demo thing does not parse")
}

/// Possible finite state list with `count` states named `{prefix}1..`.
fn possible_list(
    request: WriteRequest,
    iteration: Iid,
    domain: Iid,
    prefix: &str,
    count: usize,
) -> anyhow::Result<(WriteRequest, Iid)> {
    let list = Iid::new();
    let mut request = request.create(
        iteration,
        thing(json!({
            "classKind": "PossibleFiniteStateList", "iid": list,
            "name": prefix, "shortName": prefix, "owner": domain,
        }))?,
    );
    for n in 1..=count {
        let name = format!("{prefix}{n}");
        request = request.create(
            list,
            thing(json!({
                "classKind": "PossibleFiniteState", "iid": Iid::new(),
                "name": name, "shortName": name,
            }))?,
        );
    }
    Ok((request, list))
}

/// Build a small model: one or two state lists combined into an actual list,
/// and a state-dependent parameter. Prints the derived states and value sets.
fn cmd_demo(args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    anyhow::ensure!(args.states > 0, "--states must be at least 1");

    let service = EdmsService::in_memory();
    let site = service.bootstrap("Demo", "admin")?;
    let (domain, mass) = (Iid::new(), Iid::new());
    service.write(
        &site.admin,
        &site.site_directory,
        WriteRequest::new()
            .create(
                site.site_directory,
                thing(json!({
                    "classKind": "DomainOfExpertise", "iid": domain,
                    "name": "Systems", "shortName": "SYS",
                }))?,
            )
            .create(
                site.site_directory,
                thing(json!({
                    "classKind": "ParameterType", "iid": mass, "name": "mass", "shortName": "m",
                }))?,
            ),
    )?;
    let model = service.create_model(&site.admin, "Demo satellite", "DEMO", vec![domain])?;

    let iteration = model.iteration;
    let (mut request, first) =
        possible_list(WriteRequest::new(), iteration, domain, "mode", args.states)?;
    let mut lists = vec![first];
    if let Some(count) = args.second.filter(|c| *c > 0) {
        let (next, second) = possible_list(request, iteration, domain, "phase", count)?;
        request = next;
        lists.push(second);
    }
    let (actual, element, parameter) = (Iid::new(), Iid::new(), Iid::new());
    let members: Vec<Value> = lists
        .iter()
        .enumerate()
        .map(|(i, list)| json!({"k": i as i64 + 1, "v": list}))
        .collect();
    let request = request
        .create(
            iteration,
            thing(json!({
                "classKind": "ActualFiniteStateList", "iid": actual,
                "owner": domain, "possibleFiniteStateList": members,
            }))?,
        )
        .create(
            iteration,
            thing(json!({
                "classKind": "ElementDefinition", "iid": element,
                "name": "Battery", "shortName": "bat", "owner": domain,
            }))?,
        )
        .create(
            element,
            thing(json!({
                "classKind": "Parameter", "iid": parameter, "owner": domain,
                "parameterType": mass, "stateDependence": actual,
            }))?,
        );
    let response = service.write(&site.admin, &model.model, request)?;

    let deep = ReadOptions::deep();
    let states = service.read(Some(&site.admin), &model.model, &actual, &deep)?;
    let value_sets = service.read(Some(&site.admin), &model.model, &parameter, &deep)?;
    let report = service.verify(&model.model)?;

    let states: Vec<&Thing> = states
        .things()
        .iter()
        .filter(|t| t.class_kind() == ClassKind::ActualFiniteState)
        .collect();
    let value_sets: Vec<&Thing> = value_sets
        .things()
        .iter()
        .filter(|t| t.class_kind() == ClassKind::ParameterValueSet)
        .collect();

    if let OutputFormat::Json = format {
        let out = json!({
            "model": model.model,
            "revision": response.revision,
            "touched": response.things.len(),
            "actualStates": states,
            "valueSets": value_sets,
            "ledgerValid": report.is_valid(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} Wrote revision {} of model {} ({} things touched)",
        "✓".green().bold(),
        response.revision.to_string().yellow().bold(),
        model.model.to_string().cyan(),
        response.things.len()
    );
    println!("  Actual states: {}", states.len().to_string().bold());
    for state in &states {
        if let Thing::ActualFiniteState(state) = state {
            println!("    {} {:?}", state.iid.to_string().dimmed(), state.kind);
        }
    }
    println!("  Value sets:    {}", value_sets.len().to_string().bold());
    for set in &value_sets {
        if let Thing::ParameterValueSet(set) = set {
            let state = set.actual_state.map(|s| s.to_string()).unwrap_or_default();
            println!("    {} state {}", set.iid.to_string().dimmed(), state.dimmed());
        }
    }
    if report.is_valid() {
        println!(
            "  Ledger: {} ({} records)",
            "valid".green(),
            report.record_count
        );
    } else {
        println!("  Ledger: {}", "broken".red().bold());
        for violation in &report.violations {
            println!("    r{} {}", violation.revision, violation.description);
        }
    }
    Ok(())
}
