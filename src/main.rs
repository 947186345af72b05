use std::sync::Arc;

mod config;
mod environment;
mod handler;
mod http;
mod logger;
mod routing;
mod server;

/// Config file looked up when `-c` is not given ("config.toml" and friends)
const DEFAULT_CONFIG_PATH: &str = "config";

const USAGE: &str = "\
Usage: apod_env_server [OPTIONS]

Options:
  -c, --config <PATH>  Configuration file (default: config.toml)
      --dump-config    Print the effective configuration as TOML and exit
  -h, --help           Print this help";

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config_path: String,
    dump_config: bool,
    help: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        config_path: DEFAULT_CONFIG_PATH.to_string(),
        dump_config: false,
        help: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                parsed.config_path = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a path argument"))?;
            }
            "--dump-config" => parsed.dump_config = true,
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("Unknown argument '{other}'\n\n{USAGE}")),
        }
    }

    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut cfg = config::Config::load_from(&args.config_path)?;
    cfg.apply_token_fallback(&environment::ProcessEnv);

    if args.dump_config {
        print!("{}", cfg.to_toml_redacted()?);
        return Ok(());
    }

    cfg.validate()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let mut routes = routing::RouteTable::new();
    handler::setup_handlers(&mut routes, &cfg, Arc::new(environment::ProcessEnv));

    logger::log_server_start(&addr, &cfg, &routes);

    let state = Arc::new(config::AppState::new(cfg, routes));
    server::start_signal_handler(Arc::clone(&state.shutdown));
    server::start_server_loop(listener, state).await;

    Ok(())
}
