use anyhow::Result;

fn main() -> Result<()> {
    drift_cli::main_entry()
}
