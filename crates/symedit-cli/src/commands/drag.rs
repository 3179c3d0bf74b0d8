use crate::cli::DragArgs;
use crate::commands::site::unit_cube;
use crate::error::{CliError, Result};
use crate::utils::format;
use symedit::core::models::model::ModelSymmetry;
use symedit::core::models::system::Structure;
use symedit::engine::propagation::MoveTargets;
use symedit::workflows::edit::SymmetryEditor;
use tracing::{info, warn};

pub fn run(args: DragArgs, editor: &mut SymmetryEditor) -> Result<()> {
    let cell = match args.cell {
        Some(cell) => cell,
        None => unit_cube()?,
    };
    let from = cell.to_cartesian(&args.from);
    let to = cell.to_cartesian(&args.to);

    let mut structure = Structure::new();
    let symmetry = ModelSymmetry::new(&args.group, Some(cell.clone()));
    let model = structure.add_model("drag", Some(symmetry));
    let atoms = editor.add_atom_with_equivalents(&mut structure, model, "X", from)?;
    let dragged = *atoms
        .first()
        .ok_or_else(|| CliError::Argument("No atom was placed".to_string()))?;
    info!("Placed {} equivalent atom(s).", atoms.len());

    let constraint = editor.resolve_constraint(&mut structure, dragged)?;
    println!("Constraint: {}", format::constraint(&constraint));

    let outcome = if args.no_projection {
        editor.move_selection(
            &mut structure,
            &[dragged],
            &MoveTargets::Displacement(to - from),
            false,
            false,
        )?
    } else {
        editor.move_atom(&mut structure, dragged, to)?
    };
    if !outcome.is_accepted() {
        warn!("Drag was rejected: {:?}", outcome);
    }
    println!("Outcome:    {}", format::outcome(&outcome));

    println!("Atoms (fractional):");
    for (i, id) in atoms.iter().enumerate() {
        if let Some(atom) = structure.atom(*id) {
            println!("{:>4}  {}", i + 1, format::point(&cell.to_fractional(&atom.position)));
        }
    }
    Ok(())
}
