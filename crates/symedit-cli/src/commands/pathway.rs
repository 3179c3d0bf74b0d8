use crate::cli::PathwayArgs;
use crate::error::Result;
use crate::utils::format;
use symedit::core::symmetry::notation;
use symedit::engine::pathway;
use symedit::workflows::edit::SymmetryEditor;
use tracing::info;

pub fn run(args: PathwayArgs, editor: &SymmetryEditor) -> Result<()> {
    let chain = pathway::split_pathway(&args.chain);
    info!("Resolving pathway with {} token(s).", chain.len());
    let resolved = editor.resolve_pathway(&chain[..], args.cell.as_ref())?;

    println!("Nodes:");
    for node in &resolved.nodes {
        println!(
            "  {:<16} link {}",
            node.identifier,
            notation::format_basis_change(&node.link)
        );
    }
    println!("Transform:    {}", resolved.transform_notation());
    println!("{}", format::matrix(&resolved.transform, 2));
    if let Some(cell) = &resolved.cell {
        let [a, b, c, alpha, beta, gamma] = cell.parameters();
        println!(
            "Cell:         a={:.4} b={:.4} c={:.4} alpha={:.3} beta={:.3} gamma={:.3}",
            a, b, c, alpha, beta, gamma
        );
    }
    Ok(())
}
