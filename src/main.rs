use facekeeper::{
    camera::{self, V4lCamera},
    cli::{KeyboardInput, TerminalView},
    common::config::{MAX_THRESHOLD, MIN_THRESHOLD},
    core::{EnrollmentRequest, EnrollmentWorkflow, FacePipeline, RecognitionMode, RecognitionWorkflow},
    storage::{SampleStore, UserRecord, UserStore},
    Config, DevMode,
};

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "facekeeper")]
#[command(about = "Webcam face enrollment and recognition")]
struct Cli {
    /// Enable development mode (saves data locally for testing)
    #[arg(long, global = true)]
    dev: bool,

    /// Config file to use instead of configs/facekeeper.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new person from live camera samples
    Enroll {
        #[arg(short, long)]
        first_name: String,
        #[arg(short, long)]
        last_name: String,
        #[arg(short, long, allow_negative_numbers = true)]
        age: i64,
    },
    /// Recognize enrolled people in the live camera feed
    Recognize {
        /// Match threshold, lower is stricter (10-200)
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },
    /// List enrolled users
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a user and their face samples
    Delete {
        #[arg(short, long)]
        id: u32,
    },
    /// Show enrollment and configuration status
    Status,
    /// List available cameras
    Cameras,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let dev_mode = DevMode::new(cli.dev, &config)?;

    match cli.command {
        Commands::Enroll { first_name, last_name, age } => {
            let mut users = UserStore::load(dev_mode.store_file());
            let samples = SampleStore::new(dev_mode.samples_dir(), config.recognizer.sample_size)?;
            let mut pipeline = FacePipeline::from_config(&config)?;
            let mut camera = V4lCamera::new(&config);
            let request = EnrollmentRequest { first_name, last_name, age };

            let result = {
                let mut view = TerminalView::new(&dev_mode, "SPACE capture | ESC cancel | s snapshot")?;
                EnrollmentWorkflow::new(&mut pipeline, &mut users, &samples, &config.enrollment)
                    .enroll(&request, &mut camera, &mut view, &mut KeyboardInput)
            };

            let record = result?;
            println!("✅ Enrolled {} (ID {}) with {} samples", record.full_name(), record.id, record.face_files.len());
        }
        Commands::Recognize { threshold } => {
            let users = UserStore::load(dev_mode.store_file());
            let samples = SampleStore::new(dev_mode.samples_dir(), config.recognizer.sample_size)?;
            let mut pipeline = FacePipeline::from_config(&config)?;
            if let Some(threshold) = threshold {
                pipeline.set_threshold(threshold);
            }
            let mut camera = V4lCamera::new(&config);

            tracing::info!("Match threshold: {}", pipeline.threshold());

            let mut workflow = RecognitionWorkflow::new(&mut pipeline);
            workflow.prepare(&users, &samples);
            if workflow.mode() == RecognitionMode::DetectionOnly {
                println!("No trained faces available - running in detection-only mode");
            }

            let summary = {
                let mut view = TerminalView::new(&dev_mode, "q/ESC stop | s snapshot")?;
                workflow.run(&users, &mut camera, &mut view, &mut KeyboardInput)?
            };

            println!(
                "Processed {} frames, {} recognitions ({:?})",
                summary.frames, summary.recognized, summary.ending
            );
        }
        Commands::List { json } => {
            let users = UserStore::load(dev_mode.store_file());
            let records: Vec<UserRecord> = users.all().into_values().collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No users enrolled yet");
            } else {
                println!("{:<5} {:<30} {:<5} {:<20} {}", "ID", "Name", "Age", "Enrolled", "Samples");
                for record in &records {
                    println!(
                        "{:<5} {:<30} {:<5} {:<20} {}",
                        record.id,
                        record.full_name(),
                        record.age,
                        record.enrolled_date,
                        record.face_files.len()
                    );
                }
            }
        }
        Commands::Delete { id } => {
            let mut users = UserStore::load(dev_mode.store_file());
            let samples = SampleStore::new(dev_mode.samples_dir(), config.recognizer.sample_size)?;

            let name = users
                .get(id)
                .map(|r| r.full_name())
                .ok_or(facekeeper::FaceRecError::UserNotFound(id))?;

            samples.delete_user_files(id)?;
            users.delete(id)?;
            println!("🗑  Deleted {} (ID {})", name, id);
        }
        Commands::Status => {
            let users = UserStore::load(dev_mode.store_file());
            let samples = SampleStore::new(dev_mode.samples_dir(), config.recognizer.sample_size)?;

            println!(
                "Data directory:   {}{}",
                dev_mode.base_dir().display(),
                if dev_mode.is_enabled() { " (dev mode)" } else { "" }
            );
            println!("User records:     {}", users.path().display());
            println!("Face samples:     {}", samples.root().display());
            println!("Enrolled users:   {}", users.len());
            println!("Next user ID:     {}", users.next_id());
            println!("Match threshold:  {}", config.recognizer.threshold);
            println!(
                "Detector model:   {} ({})",
                config.detector.model_path.display(),
                if config.detector.model_path.exists() { "found" } else { "missing" }
            );
            println!("Camera:           /dev/video{}", config.camera.device_index);
            if users.is_empty() {
                println!("\nNo faces enrolled - recognition will run in detection-only mode.");
                println!("Enroll someone with: facekeeper enroll -f <FIRST> -l <LAST> -a <AGE>");
            }
        }
        Commands::Cameras => {
            let cameras = camera::list_cameras()?;

            if cameras.is_empty() {
                println!("❌ No cameras found!");
                println!("\nTroubleshooting:");
                println!("  1. Check if cameras are connected");
                println!("  2. Ensure you have permission to access /dev/video*");
                return Ok(());
            }

            for info in &cameras {
                println!("📷 /dev/video{}: {}", info.index, info.name);
                for format in &info.formats {
                    println!("   - {}", format);
                }
            }

            println!("\n📝 To pick a camera, set in configs/facekeeper.toml:");
            println!("   [camera]");
            println!("   device_index = <NUMBER>");
        }
    }

    Ok(())
}

fn parse_threshold(value: &str) -> std::result::Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("threshold must be between {} and {}", MIN_THRESHOLD, MAX_THRESHOLD))
    }
}

fn setup_logging(dev_mode: bool) {
    // stderr keeps log lines out of the terminal preview on stdout
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }
}
