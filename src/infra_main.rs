use std::env;
use std::path::PathBuf;

use askdocs::logging;
use askdocs::provision::{Stack, StackConfig};

/// Declares the deployment stack and prints its plan: every resource in
/// dependency order with its inputs, then the export names. Apply/preview/
/// destroy are the provisioning engine's verbs, not ours.
fn main() -> anyhow::Result<()> {
    logging::init();

    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("ASKDOCS_STACK_CONFIG").ok())
        .map(PathBuf::from);
    let config = StackConfig::load(config_path.as_deref())?;

    let stack = Stack::declare(&config);
    tracing::info!(
        "Declared {} resources, {} outputs pending",
        stack.resource_count(),
        stack.pending_keys().len()
    );

    print!("{}", stack.render_plan());
    println!("exports:");
    for (name, _) in stack.exports() {
        println!("    {}", name);
    }

    Ok(())
}
