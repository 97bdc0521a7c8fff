use std::env;

use anyhow::{Context, Result};
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;

use drawing_register::{
    config::AppConfig,
    db,
    models::{Drawing, Project},
    schema::{drawings, projects},
    supersession::{self, LineageViolation},
};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("verify") => {
            let violations = verify_lineages()?;
            if !violations.is_empty() {
                std::process::exit(1);
            }
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\nUsage: register-maintenance verify");
            std::process::exit(2);
        }
        None => {
            eprintln!("Usage: register-maintenance verify");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn verify_lineages() -> Result<Vec<LineageViolation>> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded register configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let all_projects: Vec<Project> = projects::table
        .order(projects::code.asc())
        .load(&mut conn)
        .context("failed to load projects")?;

    let mut violations = Vec::new();
    for project in &all_projects {
        let rows: Vec<Drawing> = drawings::table
            .filter(drawings::project_id.eq(project.id))
            .load(&mut conn)
            .with_context(|| format!("failed to load drawings for project {}", project.code))?;

        let found = supersession::verify(&rows);
        println!(
            "{}: {} drawings, {} violations",
            project.code,
            rows.len(),
            found.len()
        );
        for violation in &found {
            println!("  {}", serde_json::to_string(violation)?);
        }
        violations.extend(found);
    }

    if violations.is_empty() {
        println!("All lineages are consistent.");
    } else {
        tracing::warn!(count = violations.len(), "lineage violations found");
    }
    Ok(violations)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
