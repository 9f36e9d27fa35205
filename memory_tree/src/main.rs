//! memory_tree — interactive entry point.

use std::path::PathBuf;

use memory_tree::app::{run, RunMode};
use memory_tree::config::AppConfig;

struct Args {
    config:   Option<PathBuf>,
    debug:    bool,
    headless: Option<usize>,
    quick:    bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args { config: None, debug: false, headless: None, quick: false };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--headless" => {
                let frames = it.next().ok_or("--headless needs a frame count")?;
                let frames = frames.parse().map_err(|_| format!("bad frame count: {}", frames))?;
                args.headless = Some(frames);
            }
            "--debug" => args.debug = true,
            "--quick" => args.quick = true,
            other     => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(args)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Memory Tree — Gesture-Controlled Photo Tree         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("  {}", e);
            eprintln!("  usage: memory_tree [--config <path>] [--debug] [--headless <frames>] [--quick]");
            std::process::exit(2);
        }
    };

    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    if args.quick {
        println!("  Quick-start: reduced particle counts\n");
        config = config.quick();
    }
    config.debug |= args.debug;

    let mode = match args.headless {
        Some(frames) => {
            println!("  Mode: headless, scripted hand for {} frames", frames);
            RunMode::Headless { frames }
        }
        None => {
            #[cfg(feature = "leap")]
            println!("  Mode: LeapMotion hardware");
            #[cfg(not(feature = "leap"))]
            println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
            println!();
            println!("  Opening visualizer window…");
            RunMode::Window
        }
    };
    println!();

    if let Err(e) = run(config, mode) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
