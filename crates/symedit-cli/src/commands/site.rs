use crate::cli::PositionArgs;
use crate::error::{CliError, Result};
use crate::utils::format;
use symedit::core::models::cell::UnitCell;
use symedit::core::symmetry::groups::SpaceGroup;
use symedit::engine::config::EngineConfig;
use symedit::engine::constraint::Constraint;
use symedit::engine::provider::SymmetryOperationProvider;
use tracing::info;

fn provider_for(args: &PositionArgs) -> Result<SymmetryOperationProvider> {
    let group = SpaceGroup::resolve(&args.group)?;
    let cell = match &args.cell {
        Some(cell) => cell.clone(),
        None => unit_cube()?,
    };
    Ok(SymmetryOperationProvider::new(group, Some(cell))?)
}

pub(crate) fn unit_cube() -> Result<UnitCell> {
    UnitCell::new([1.0, 1.0, 1.0], [90.0, 90.0, 90.0])
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build default cell: {}", e)))
}

pub fn run_site(args: PositionArgs, config: &EngineConfig) -> Result<()> {
    let provider = provider_for(&args)?;
    let cartesian = provider.to_cartesian(&args.position);
    let site_operations = provider.invariant_operations(&args.position, config.invariance_tolerance);
    let constraint = Constraint::derive(&provider, &site_operations, &cartesian);
    let multiplicity = provider
        .orbit(&args.position, config.invariance_tolerance)
        .len();
    info!(
        "Site of {:?} in '{}' has {} operation(s).",
        args.position,
        provider.group().identifier(),
        site_operations.len()
    );

    println!("Group:        {}", provider.group().identifier());
    println!("Position:     {}", format::point(&args.position));
    println!("Multiplicity: {}", multiplicity);
    println!("Constraint:   {}", format::constraint(&constraint));
    println!("Site operations:");
    for op in &site_operations {
        let xyz = provider
            .group()
            .operation(op.index)
            .map(|o| o.to_xyz())
            .unwrap_or_default();
        println!("{:>4}  {}", op.index + 1, xyz);
    }
    Ok(())
}

pub fn run_orbit(args: PositionArgs, config: &EngineConfig) -> Result<()> {
    let provider = provider_for(&args)?;
    let orbit = provider.orbit(&args.position, config.invariance_tolerance);
    info!("Orbit has {} distinct image(s).", orbit.len());

    println!(
        "{} image(s) of {} in {}:",
        orbit.len(),
        format::point(&args.position),
        provider.group().identifier()
    );
    for (i, image) in orbit.iter().enumerate() {
        println!("{:>4}  {}", i + 1, format::point(image));
    }
    Ok(())
}
