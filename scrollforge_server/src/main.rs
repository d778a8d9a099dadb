// CLI entry point for the scrollforge battle server.
//
// Starts the three listeners and the world tick, then parks the main
// thread. See `server.rs` for the threading architecture.
//
// Usage:
//   scrollforge [OPTIONS]
//     --name <NAME>           Server name (default: scrollforge)
//     --lookup-port <PORT>    Lookup listener port (default: 7700)
//     --lobby-port <PORT>     Lobby listener port (default: 7701)
//     --battle-port <PORT>    Battle listener port (default: 7702)
//     --seed <SEED>           Pin the battle randomness base seed

use scrollforge_server::{ServerConfig, start_server};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = parse_args();
    let handle = match start_server(config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Lookup listening on {}", handle.lookup_addr);
    println!("Lobby  listening on {}", handle.lobby_addr);
    println!("Battle listening on {}", handle.battle_addr);
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM; the listeners and tick thread
    // are torn down with it.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

/// Parse command-line arguments into a `ServerConfig`. Plain
/// `std::env::args()` matching, no CLI crate.
fn parse_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                i += 1;
                config.name = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--name requires a value");
                    std::process::exit(1);
                });
            }
            "--lookup-port" => {
                i += 1;
                config.lookup_port = parse_port(args.get(i), "--lookup-port");
            }
            "--lobby-port" => {
                i += 1;
                config.lobby_port = parse_port(args.get(i), "--lobby-port");
            }
            "--battle-port" => {
                i += 1;
                config.battle_port = parse_port(args.get(i), "--battle-port");
            }
            "--seed" => {
                i += 1;
                config.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a valid number");
                    std::process::exit(1);
                }));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn parse_port(arg: Option<&String>, flag: &str) -> u16 {
    arg.and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a valid port number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: scrollforge [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --name <NAME>           Server name (default: scrollforge)");
    println!("  --lookup-port <PORT>    Lookup listener port (default: 7700)");
    println!("  --lobby-port <PORT>     Lobby listener port (default: 7701)");
    println!("  --battle-port <PORT>    Battle listener port (default: 7702)");
    println!("  --seed <SEED>           Pin the battle randomness base seed");
    println!("  --help, -h              Show this help");
}
