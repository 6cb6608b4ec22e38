use std::{
    fs::File,
    io::{BufWriter, Write},
    process::ExitCode,
};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};
use log::{error, info};

use regtuner::{
    constants::{Iteration, DEFAULT_TRAIL_LENGTH, DEGREES_PER_RADIAN},
    session::TrailFrame,
    RunOrchestrator, TubeGeometry, TunerConfig, TunerError, TunerSession,
};

/// Run a rigid image-to-tube registration and inspect its optimization progression.
#[derive(Debug, Parser)]
#[command(name = "regtuner", version)]
struct Cli {
    /// Configuration file for the tuning analysis (JSON parameter store)
    configuration: Utf8PathBuf,

    /// Iteration to examine (default: last iteration)
    #[arg(long)]
    iteration: Option<Iteration>,

    /// Number of iterations shown in the trail, current one included
    #[arg(long, default_value_t = DEFAULT_TRAIL_LENGTH)]
    trail: usize,

    /// Write the whole progression table as CSV
    #[arg(long)]
    export_csv: Option<Utf8PathBuf>,

    /// Write the tube points transformed to the examined iteration as JSON
    #[arg(long)]
    transformed_tubes: Option<Utf8PathBuf>,
}

fn trail_table(session: &TunerSession, frames: &[TrailFrame]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Iteration"),
        Cell::new("Alpha"),
        Cell::new("Cost"),
        Cell::new("1 / Cost"),
        Cell::new("Rotation [deg]"),
        Cell::new("Translation"),
    ]);

    let trace = session.state().trace();
    for frame in frames {
        let cost = trace
            .and_then(|t| t.record_at(frame.iteration).ok().flatten())
            .map(|r| r.cost_function_value);
        let r = frame.parameters.rotation * DEGREES_PER_RADIAN;
        let t = frame.parameters.translation;
        table.add_row(Row::from(vec![
            Cell::new(frame.iteration).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", frame.alpha)).set_alignment(CellAlignment::Right),
            Cell::new(cost.map(|c| format!("{c:.6e}")).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(cost.map(|c| format!("{:.6e}", 1.0 / c)).unwrap_or_default())
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:+.4} {:+.4} {:+.4}", r.x, r.y, r.z)),
            Cell::new(format!("{:+.4} {:+.4} {:+.4}", t.x, t.y, t.z)),
        ]));
    }
    table
}

fn write_transformed_tubes(
    session: &TunerSession,
    tubes_path: &Utf8Path,
    output: &Utf8Path,
    weights_file: Option<&Utf8Path>,
) -> Result<(), TunerError> {
    let template = TubeGeometry::from_tre(tubes_path)?;
    let weights = template.point_weights(weights_file)?;
    let moved = template.transformed(&session.current_parameters()?, &session.rotation_center());

    let points: Vec<[f64; 3]> = moved.points().iter().map(|p| [p.x, p.y, p.z]).collect();
    let document = serde_json::json!({
        "Iteration": session.iteration(),
        "Points": points,
        "Radii": moved.radii(),
        "Weights": weights,
        "Tubes": moved.tubes().iter().map(|r| [r.start, r.end]).collect::<Vec<_>>(),
    });

    let mut writer = BufWriter::new(File::create(output)?);
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;
    info!("Wrote transformed tubes to {output}");
    Ok(())
}

fn run(cli: Cli) -> Result<(), TunerError> {
    let config = TunerConfig::from_path(&cli.configuration)?;
    let mut orchestrator = RunOrchestrator::new(config)?;
    let trace = orchestrator.run()?;

    let mut session = TunerSession::new();
    session.install_trace(trace.clone());
    if let Some(iteration) = cli.iteration {
        session.set_iteration(iteration)?;
    }

    let frames = session.overlay_trail(cli.trail)?;
    println!("{}", trail_table(&session, &frames));
    let best = trace.best_record();
    println!(
        "{} iterations, best cost {:.6e} at iteration {}",
        trace.iteration_count(),
        best.cost_function_value,
        best.iteration
    );

    if let Some(path) = &cli.export_csv {
        let mut writer = BufWriter::new(File::create(path)?);
        trace.write_csv(&mut writer)?;
        writer.flush()?;
        info!("Wrote progression table to {path}");
    }

    if let Some(output) = &cli.transformed_tubes {
        if let Some(tubes) = orchestrator.subsampled_tubes() {
            write_transformed_tubes(
                &session,
                tubes,
                output,
                orchestrator.config().tube_point_weights_file(),
            )?;
        }
    }

    orchestrator.teardown()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
