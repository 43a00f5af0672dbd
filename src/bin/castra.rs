//! Castra CLI: submit, poll, and cancel synthetic-casualty generation jobs,
//! or start the REST API server.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use castra::config::ConfigLoader;
use castra::domain::ReferenceData;
use castra::observability::Metrics;
use castra::store::JobStore;
use castra::{JobId, WorkerPool};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "castra")]
#[command(about = "Synthetic military casualty generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a generation job from a JSON request file
    Submit {
        /// JobRequest JSON file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Poll a job's current state
    Status {
        /// Job id
        job_id: String,
    },

    /// List all jobs known to the store
    ListJobs,

    /// Request cancellation of a running job
    Cancel {
        /// Job id
        job_id: String,
    },

    /// Start the REST API server
    #[cfg(feature = "http")]
    Serve {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ConfigLoader::load_from_env()?;

    let reference = Arc::new(ReferenceData::load()?);
    let store = Arc::new(JobStore::open(&config.runner.store_path)?);
    let pool = Arc::new(WorkerPool::new(
        config.runner.concurrency_cap,
        reference,
        store,
        config.runner.output_dir.clone(),
        config.runner.limits,
    ));

    match cli.command {
        Commands::Submit { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let request = serde_json::from_str(&contents)?;
            let job_id = pool.submit(request)?;
            println!("job submitted: {job_id}");
        }

        Commands::Status { job_id } => {
            let job_id = JobId::parse_str(&job_id)?;
            let state = pool.get_state(job_id)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::ListJobs => {
            let jobs = pool.list_states()?;
            for job in jobs {
                println!("{} {:?} {:.1}%", job.id, job.status, job.progress * 100.0);
            }
        }

        Commands::Cancel { job_id } => {
            let job_id = JobId::parse_str(&job_id)?;
            pool.cancel(job_id);
            println!("cancellation requested for {job_id}");
        }

        #[cfg(feature = "http")]
        Commands::Serve { port, host } => {
            use castra::api::rest::RestApiServer;
            let metrics = Arc::new(Metrics::new());
            let server = RestApiServer::new(pool.clone(), metrics);
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            println!("listening on http://{addr}");
            server.serve(addr).await?;
        }
    }

    Ok(())
}
