use crate::cli::GroupArgs;
use crate::error::Result;
use symedit::core::symmetry::groups::{self, SpaceGroup};
use tracing::info;

pub fn run_list() -> Result<()> {
    println!("{:>4}  {:<12} {:<10} {:>5}", "No.", "Symbol", "Centering", "Order");
    for entry in groups::known_groups() {
        let group = SpaceGroup::from_number(entry.number)?;
        println!(
            "{:>4}  {:<12} {:<10} {:>5}",
            entry.number,
            entry.symbol,
            format!("{:?}", entry.centering),
            group.order()
        );
    }

    let mut settings: Vec<_> = groups::named_settings().collect();
    settings.sort_by_key(|s| (s.number, s.name));
    println!("\nNamed settings:");
    for setting in settings {
        println!(
            "{:>4}  {:<12} {}",
            setting.number, setting.name, setting.transform
        );
    }
    Ok(())
}

pub fn run_ops(args: GroupArgs) -> Result<()> {
    info!("Resolving group '{}'", args.group);
    let group = SpaceGroup::resolve(&args.group)?;

    println!(
        "{} (number {}), {} operation(s)",
        group.identifier(),
        group
            .number()
            .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        group.order()
    );
    for op in group.operations() {
        println!("{:>4}  {}", op.index() + 1, op.to_xyz());
    }
    Ok(())
}
