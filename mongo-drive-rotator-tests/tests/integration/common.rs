//! Common utilities for integration tests
//!
//! This module provides cleanup guards and helper functions for integration tests.

use anyhow::Result;
use std::process::Command;
use std::thread;
use std::time::Duration;

pub const MONGO_IMAGE: &str = "mongo:7";

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        cleanup_container(&self.name);
    }
}

/// Helper to stop and remove a Docker container
/// The -v flag also removes anonymous volumes associated with the container
fn cleanup_container(name: &str) {
    let _ = Command::new("docker").args(["stop", name]).output();
    let _ = Command::new("docker").args(["rm", "-v", name]).output();
}

/// Helper to check if Docker is available
pub fn is_docker_available() -> bool {
    Command::new("docker")
        .args(["ps"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Start a MongoDB container published on `port` and wait until it answers
pub fn start_mongo_container(name: &str, port: u16) -> Result<()> {
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-p",
            &format!("{}:27017", port),
            MONGO_IMAGE,
        ])
        .output()?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to start MongoDB container: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    for _ in 0..30 {
        if mongosh(name, "db.runCommand({ ping: 1 }).ok").is_ok() {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }

    Err(anyhow::anyhow!("MongoDB failed to become ready"))
}

/// Evaluate a script inside the container
pub fn mongosh(container: &str, script: &str) -> Result<String> {
    let output = Command::new("docker")
        .args(["exec", container, "mongosh", "--quiet", "--eval", script])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("mongosh failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
