// CLI binary — panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use chorolux::compile::resolvers::PatternLibrary;
use chorolux::compile::step::StepCompiler;
use chorolux::compile::template::{BeatGrid, ConstantTempo, TemplateCompiler, TemplateLibrary};
use chorolux::model::fixture::FixtureContext;
use chorolux::model::template::{PlaybackPlan, Template, TemplatePreset};
use chorolux::sequence::{self, SequenceHead};
use chorolux::CompileError;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "chorolux", about = "Choreography template compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a playback plan into a sequence file
    Compile {
        /// JSON file with an array of templates
        #[arg(long)]
        templates: PathBuf,
        /// JSON file with an array of presets
        #[arg(long)]
        presets: Option<PathBuf>,
        /// JSON file with the fixture context
        #[arg(long)]
        fixtures: PathBuf,
        /// JSON file with the playback plan
        #[arg(long)]
        plan: PathBuf,
        /// Tempo in beats per minute
        #[arg(long, default_value = "120.0")]
        bpm: f64,
        /// Meter, beats per bar
        #[arg(long, default_value = "4")]
        beats_per_bar: u32,
        /// Output sequence file
        #[arg(long, short)]
        out: PathBuf,
        /// Author written into the sequence head
        #[arg(long, default_value = "")]
        author: String,
        /// Media file name written into the sequence head
        #[arg(long, default_value = "")]
        media: String,
    },
    /// Parse a sequence file and report its contents
    Verify { file: PathBuf },
    /// List the built-in pattern identifiers
    Patterns,
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Compile {
            templates,
            presets,
            fixtures,
            plan,
            bpm,
            beats_per_bar,
            out,
            author,
            media,
        } => run_compile(CompileArgs {
            templates,
            presets,
            fixtures,
            plan,
            bpm,
            beats_per_bar,
            out,
            author,
            media,
        }),
        Commands::Verify { file } => run_verify(&file),
        Commands::Patterns => {
            run_patterns();
            0
        }
    };
    process::exit(code);
}

struct CompileArgs {
    templates: PathBuf,
    presets: Option<PathBuf>,
    fixtures: PathBuf,
    plan: PathBuf,
    bpm: f64,
    beats_per_bar: u32,
    out: PathBuf,
    author: String,
    media: String,
}

fn run_compile(args: CompileArgs) -> i32 {
    match compile(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[chorolux] Error: {e}");
            1
        }
    }
}

fn compile(args: CompileArgs) -> Result<(), CompileError> {
    let templates: Vec<Template> = load_json(&args.templates)?;
    let mut library = TemplateLibrary::new();
    for template in templates {
        library.add_template(template);
    }
    if let Some(path) = &args.presets {
        let presets: Vec<TemplatePreset> = load_json(path)?;
        for preset in presets {
            library.add_preset(preset);
        }
    }
    let fixtures: FixtureContext = load_json(&args.fixtures)?;
    let plan: PlaybackPlan = load_json(&args.plan)?;

    let grid = ConstantTempo::new(args.bpm, args.beats_per_bar).ok_or_else(|| {
        CompileError::invalid(format!(
            "tempo must be positive with at least 1 beat per bar (got {} BPM, {}/bar)",
            args.bpm, args.beats_per_bar
        ))
    })?;

    let compiler = TemplateCompiler {
        library: &library,
        grid: &grid,
        steps: StepCompiler {
            geometry: &PatternLibrary,
            movement: &PatternLibrary,
            dimmer: &PatternLibrary,
        },
    };
    let result = compiler.compile(&plan, &fixtures)?;
    for warning in result.warnings() {
        eprintln!("[chorolux] Warning: {warning}");
    }

    let head = SequenceHead {
        version: "1.0".to_string(),
        author: args.author,
        media_file: args.media,
        duration_ms: grid.bars_to_ms(plan.window.end_bar()),
    };
    let exported = sequence::export(&result, &fixtures, head);
    let bytes = sequence::write(&exported)?;
    fs::write(&args.out, bytes)?;

    eprintln!(
        "[chorolux] Wrote {}: {} placements, {} settings, {} palettes",
        args.out.display(),
        exported.placement_count(),
        exported.effect_db.len(),
        exported.color_palettes.len()
    );
    Ok(())
}

fn run_verify(file: &PathBuf) -> i32 {
    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("[chorolux] Error reading {}: {e}", file.display());
            return 1;
        }
    };
    match sequence::parse(&bytes) {
        Ok(seq) => {
            eprintln!(
                "[chorolux] {} v{}: {} ms, {} elements, {} placements, {} settings, {} palettes",
                file.display(),
                seq.head.version,
                seq.head.duration_ms,
                seq.elements.len(),
                seq.placement_count(),
                seq.effect_db.len(),
                seq.color_palettes.len()
            );
            0
        }
        Err(e) => {
            eprintln!("[chorolux] Invalid sequence: {e}");
            1
        }
    }
}

fn run_patterns() {
    println!("geometry: {}", PatternLibrary::GEOMETRY_PATTERNS.join(", "));
    println!("movement: {}", PatternLibrary::MOVEMENT_PATTERNS.join(", "));
    println!("dimmer:   {}", PatternLibrary::DIMMER_PATTERNS.join(", "));
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, CompileError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
