//! The `effects` command: list plugin descriptors.

use clap::Args;

use lumen_core::ParamType;
use lumen_registry::{EffectRegistry, GeneratorRegistry, PluginDescriptor, TransitionRegistry};

/// Arguments for `lumen effects`.
#[derive(Args)]
pub struct EffectsArgs {
    /// Show parameter schemas
    #[arg(long)]
    params: bool,
}

pub fn run(args: EffectsArgs) -> anyhow::Result<()> {
    println!("Effects:");
    for desc in EffectRegistry::new().all() {
        print_plugin(desc, args.params);
    }
    println!("\nGenerators:");
    for desc in GeneratorRegistry::new().all() {
        print_plugin(desc, args.params);
    }
    println!("\nTransitions:");
    for desc in TransitionRegistry::new().all() {
        print_plugin(desc, args.params);
    }
    Ok(())
}

fn print_plugin(desc: &PluginDescriptor, with_params: bool) {
    println!("  {:<12} {}", desc.id, desc.description);
    if !with_params {
        return;
    }
    for param in desc.params {
        let range = match (param.min, param.max) {
            (Some(min), Some(max)) => format!(" [{min}, {max}]"),
            _ => String::new(),
        };
        let options = if matches!(param.param_type, ParamType::Select) {
            format!(" ({})", param.options.join(", "))
        } else {
            String::new()
        };
        println!(
            "      {:<14} {:?}{range}{options}",
            param.name, param.param_type
        );
    }
}
