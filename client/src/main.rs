use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{JobInfo, JobRequest, JobResults, WorkerInfo};
use reqwest::{Client, StatusCode};
use std::env;

/// Igual que en el worker:
/// - En Docker: MASTER_URL=http://master:8080
/// - Local: default http://localhost:8080
fn master_base_url() -> String {
    env::var("MASTER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI simple para hablar con el master")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Envía un job de conteo de palabras
    Submit {
        #[arg(value_name = "NOMBRE")]
        name: String,

        /// Patrón de archivos de entrada (ruta vista por master y workers)
        #[arg(long, default_value = "/data/input/*")]
        input_glob: String,

        /// Cantidad de tareas reduce
        #[arg(long, default_value_t = 4)]
        n_reduce: usize,
    },
    /// Consulta el estado de un job
    Status {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Lista los archivos de salida de un job
    Results {
        #[arg(value_name = "JOB_ID")]
        id: String,
    },
    /// Lista los workers registrados
    Workers,
}

fn print_job(job: &JobInfo) {
    println!("Job:");
    println!("  id: {}", job.id);
    println!("  nombre: {}", job.name);
    println!("  estado: {:?}", job.status);
    if let Some(phase) = job.phase {
        println!("  fase: {}", phase);
    }
    println!(
        "  tareas: {} ({} maps, {} reduces)",
        job.total_tasks,
        job.input_files.len(),
        job.n_reduce
    );
    if let Some(finished) = job.finished_at {
        println!("  terminado: {}", finished);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = master_base_url();

    match cli.command {
        Commands::Submit {
            name,
            input_glob,
            n_reduce,
        } => {
            let url = format!("{}/api/v1/jobs", base_url);
            let resp = client
                .post(&url)
                .json(&JobRequest {
                    name,
                    input_glob,
                    n_reduce,
                })
                .send()
                .await
                .with_context(|| format!("no se pudo hablar con {}", base_url))?;

            if resp.status().is_success() {
                let job_info: JobInfo = resp.json().await?;
                println!("Job creado:");
                print_job(&job_info);
            } else {
                let status = resp.status();
                let msg = resp.text().await.unwrap_or_default();
                println!("El master rechazó el job ({}): {}", status, msg);
            }
        }
        Commands::Status { id } => {
            let url = format!("{}/api/v1/jobs/{id}", base_url);
            let resp = client.get(&url).send().await?;

            if resp.status().is_success() {
                let job_info: JobInfo = resp.json().await?;
                print_job(&job_info);
            } else {
                println!("No se encontró el job con id {id}");
            }
        }
        Commands::Results { id } => {
            let url = format!("{}/api/v1/jobs/{id}/results", base_url);
            let resp = client.get(&url).send().await?;

            if resp.status() == StatusCode::NOT_FOUND {
                println!("No se encontró el job con id {id}");
                return Ok(());
            }

            let results: JobResults = resp.error_for_status()?.json().await?;
            println!("Resultados de {} en {}:", results.job_id, results.output_dir);
            if results.files.is_empty() {
                println!("  (todavía no hay archivos)");
            }
            for f in results.files {
                println!("  {}", f);
            }
        }
        Commands::Workers => {
            let url = format!("{}/api/v1/workers", base_url);
            let workers: Vec<WorkerInfo> = client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            println!("{} workers registrados:", workers.len());
            for w in workers {
                println!("  {} (desde {})", w.addr, w.registered_at);
            }
        }
    }

    Ok(())
}
