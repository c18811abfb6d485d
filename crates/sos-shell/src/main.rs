//! `simpleos` - interactive shell for the SimpleOS simulator.
//!
//! Boots a kernel, mounts the file system, restores the saved directory and
//! reads commands from stdin until `exit` or end of input.

mod command;
mod hal;
mod session;
mod store;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sos_kernel::{Kernel, KernelConfig};
use sos_vfs::{FileSystem, Snapshot};

use crate::hal::StdHal;
use crate::session::{Flow, Session};
use crate::store::SnapshotStore;

const PROMPT: &str = "SimpleOS> ";

#[derive(Parser, Debug)]
#[command(name = "simpleos", about = "SimpleOS - kernel-integrated file system shell")]
struct Args {
    /// Size of the simulated address space (overrides --config)
    #[arg(short, long, value_name = "UNITS")]
    memory: Option<usize>,

    /// Kernel configuration (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Snapshot file restored at startup and saved after each change
    #[arg(short, long, value_name = "FILE", default_value = "filesystem.json")]
    state: PathBuf,

    /// Do not read or write the snapshot file
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_persist: bool,

    /// Print kernel debug output to stderr
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<KernelConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        }
        None => KernelConfig::default(),
    };
    if let Some(memory) = args.memory {
        config.memory_size = memory;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let kernel = Kernel::new(StdHal::new(args.verbose), config);
    let fs = FileSystem::new(kernel);

    let store = (!args.no_persist).then(|| SnapshotStore::new(&args.state));
    let snapshot = match &store {
        Some(store) => store.load_or_seed()?,
        None => Snapshot::default_seed(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut session = Session::new(fs, store);
    session.restore(&snapshot, &mut out)?;

    writeln!(out, "Welcome to SimpleOS")?;
    writeln!(out, "- Kernel-integrated File System")?;
    writeln!(out, "- Type help or ? to list commands")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush().context("Failed to flush stdout")?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        let command = if read == 0 { "exit" } else { line.trim() };

        if session.run_line(command, &mut out)? == Flow::Exit {
            break;
        }
    }

    Ok(())
}
