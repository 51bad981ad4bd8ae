use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Applies SQL migrations by invoking the `goose` CLI.
pub struct MigrationRunner {
    goose_binary_path: String,
    migrations_dir: String,
    /// goose driver name, e.g. "postgres"
    driver: String,
    dsn: String,
}

impl MigrationRunner {
    pub fn new(
        goose_binary_path: String,
        migrations_dir: String,
        driver: String,
        dsn: String,
    ) -> Self {
        Self {
            goose_binary_path,
            migrations_dir,
            driver,
            dsn,
        }
    }

    /// Runner for the postgres driver
    pub fn postgres(goose_binary_path: &str, migrations_dir: &str, dsn: &str) -> Self {
        Self::new(
            goose_binary_path.to_string(),
            migrations_dir.to_string(),
            "postgres".to_string(),
            dsn.to_string(),
        )
    }

    /// Apply every pending migration (`goose up`)
    pub async fn run_migrations(&self) -> Result<()> {
        debug!(dir = %self.migrations_dir, driver = %self.driver, "applying migrations");

        let stdout = self.goose("up").await.context("Migration failed")?;
        debug!(output = %stdout.trim(), "migrations applied");

        Ok(())
    }

    fn command_args<'a>(&'a self, command: &'a str) -> [&'a str; 5] {
        ["-dir", &self.migrations_dir, &self.driver, &self.dsn, command]
    }

    async fn goose(&self, command: &str) -> Result<String> {
        let output = Command::new(&self.goose_binary_path)
            .args(self.command_args(command))
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.goose_binary_path))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "goose {} exited with {}.\nstdout: {}\nstderr: {}",
                command,
                output.status,
                stdout,
                stderr
            );
        }

        Ok(stdout)
    }
}
