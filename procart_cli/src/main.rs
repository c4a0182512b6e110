// procart: headless runner for the terrain and tree generators.
//
// Builds a `Studio`, requests a terrain in the chosen color variant, lets
// the initial tree pass and the terrain job run for a number of ticks, then
// optionally grows and prunes branches the way a user clicking on visuals
// would. The final terrain mesh and tree are written as JSON.
//
// Usage:
//   cargo run -p procart_cli -- [output.json] [--config FILE] [--seed N]
//     [--ticks N] [--variant a|b|none] [--preset classic|bushy|spire]
//     [--grow N] [--prune N] [--print-config]
//
// `--grow N` grows the first N terminals; `--prune N` prunes the first N
// branches off the root. Log verbosity follows `RUST_LOG` (default `info`).

use procart_gen::command::{StudioAction, StudioCommand};
use procart_gen::config::{BranchParams, StudioConfig};
use procart_gen::error::{GenError, GenResult};
use procart_gen::event::StudioEventKind;
use procart_gen::gradient::ColorVariant;
use procart_gen::studio::Studio;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "procart failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> GenResult<()> {
    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("procart.json");
    let seed: u64 = parse_flag(args, "--seed").unwrap_or(0);
    let ticks: u64 = parse_flag(args, "--ticks").unwrap_or(400);
    let grow: usize = parse_flag(args, "--grow").unwrap_or(0);
    let prune: usize = parse_flag(args, "--prune").unwrap_or(0);
    let variant_name: String = parse_flag(args, "--variant").unwrap_or_else(|| "a".to_string());
    let preset: Option<String> = parse_flag(args, "--preset");

    let mut config = match parse_flag::<String>(args, "--config") {
        Some(path) => StudioConfig::load(Path::new(&path))?,
        None => StudioConfig::default(),
    };
    if let Some(name) = preset {
        config.branches = parse_preset(&name)?;
    }
    if args.iter().any(|a| a == "--print-config") {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    let variant = parse_variant(&variant_name)?;

    let mut studio = Studio::new(seed, config)?;

    // Phase 1: initial generation.
    let start: Vec<StudioCommand> = variant
        .map(|variant| StudioCommand::new(0, StudioAction::RegenerateTerrain { variant }))
        .into_iter()
        .collect();
    let mut events = studio.step(&start, ticks).events;
    if studio.is_tree_generating() || studio.is_terrain_generating() {
        tracing::warn!(ticks, "generation still running; output will be partial");
    }

    // Phase 2: grow the first terminals.
    let tick = studio.tick();
    let grow_cmds: Vec<StudioCommand> = studio
        .tree()
        .terminals()
        .into_iter()
        .take(grow)
        .map(|handle| StudioCommand::new(tick, StudioAction::GrowTerminal { handle }))
        .collect();
    events.extend(studio.step(&grow_cmds, tick + 1).events);

    // Phase 3: prune branches off the root.
    let tick = studio.tick();
    let tree = studio.tree();
    let prune_cmds: Vec<StudioCommand> = tree
        .get(tree.root())
        .map(|root| root.children.to_vec())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| tree.get(id).and_then(|n| n.trunk))
        .take(prune)
        .map(|handle| StudioCommand::new(tick, StudioAction::PruneTrunk { handle }))
        .collect();
    events.extend(studio.step(&prune_cmds, tick + 1).events);

    let rejected = events
        .iter()
        .filter(|e| matches!(e.kind, StudioEventKind::CommandRejected { .. }))
        .count();

    let snapshot = studio.snapshot();
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(output_path, json)?;

    println!("=== procart ===");
    println!("Seed: {seed}");
    println!("Ticks: {}", studio.tick());
    match studio.terrain() {
        Some(t) => println!(
            "Terrain: {} ({} vertices, {} triangles, heights {:.2}..{:.2})",
            t.variant.label(),
            t.mesh.vertices.len(),
            t.mesh.triangle_count(),
            t.mesh.height_range.min,
            t.mesh.height_range.max
        ),
        None => println!("Terrain: none"),
    }
    println!(
        "Tree: {} nodes, {} terminals",
        studio.tree().len(),
        studio.tree().terminals().len()
    );
    if rejected > 0 {
        println!("Rejected commands: {rejected}");
    }
    println!("Wrote {output_path}");
    Ok(())
}

fn parse_variant(name: &str) -> GenResult<Option<ColorVariant>> {
    match name.to_ascii_lowercase().as_str() {
        "a" | "pink" => Ok(Some(ColorVariant::A)),
        "b" | "blue" => Ok(Some(ColorVariant::B)),
        "none" => Ok(None),
        other => Err(GenError::InvalidArgument(format!(
            "unknown variant '{other}' (expected a, b or none)"
        ))),
    }
}

fn parse_preset(name: &str) -> GenResult<BranchParams> {
    match name {
        "classic" => Ok(BranchParams::classic()),
        "bushy" => Ok(BranchParams::bushy()),
        "spire" => Ok(BranchParams::spire()),
        other => Err(GenError::InvalidArgument(format!(
            "unknown preset '{other}' (expected classic, bushy or spire)"
        ))),
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_flag_reads_following_value() {
        let a = args(&["procart", "out.json", "--seed", "42", "--ticks", "x"]);
        assert_eq!(parse_flag::<u64>(&a, "--seed"), Some(42));
        assert_eq!(parse_flag::<u64>(&a, "--ticks"), None);
        assert_eq!(parse_flag::<u64>(&a, "--grow"), None);
    }

    #[test]
    fn variants_and_presets() {
        assert_eq!(parse_variant("B").unwrap(), Some(ColorVariant::B));
        assert_eq!(parse_variant("none").unwrap(), None);
        assert!(parse_variant("green").is_err());
        assert_eq!(parse_preset("bushy").unwrap(), BranchParams::bushy());
        assert!(parse_preset("willow").is_err());
    }
}
