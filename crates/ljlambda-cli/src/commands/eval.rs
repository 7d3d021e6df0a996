use crate::cli::EvalArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use ljlambda::core::forcefield::term::Virial;
use ljlambda::core::io::inputs;
use ljlambda::workflows::{self, WorkflowError};
use tracing::info;

pub fn run(args: EvalArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let run_config = partial_config.merge_with_cli(&args)?;

    info!("Invoking the core evaluation workflow...");
    let report = workflows::evaluate::run(&run_config.setup)?;

    let flags = run_config.setup.config.flags;
    println!("Dihedrals evaluated: {}", report.summary.evaluated);
    if report.summary.warnings > 0 {
        println!("Degenerate dihedrals: {}", report.summary.warnings);
    }
    if flags.energy {
        println!("Dihedral energy:     {:.10}", report.energy.dihedral);
        println!("1-4 pair energy:     {:.10}", report.energy.pair);
        println!("Total energy:        {:.10}", report.energy.total());
    }
    if flags.virial {
        println!("Virial:              {}", format_virial(&report.virial()));
    }

    let per_atom_energy = report.per_atom_energy.as_deref();
    match &run_config.forces_output {
        Some(path) => {
            inputs::write_forces(path, &report.system, per_atom_energy)
                .map_err(WorkflowError::from)?;
            info!("Forces written to {:?}", path);
            println!("Forces written to {}", path.display());
        }
        None => {
            if let Some(energies) = per_atom_energy {
                println!("Per-particle energy:");
                for (tag, energy) in report.system.tags().iter().zip(energies) {
                    println!("  {:>8} {:.10}", tag, energy);
                }
            }
        }
    }
    Ok(())
}

fn format_virial(virial: &Virial) -> String {
    let [xx, yy, zz, xy, xz, yz] = virial.0;
    format!(
        "xx={:.6e} yy={:.6e} zz={:.6e} xy={:.6e} xz={:.6e} yz={:.6e}",
        xx, yy, zz, xy, xz, yz
    )
}
