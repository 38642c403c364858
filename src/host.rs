//! Host collaborators backed by external commands.
//!
//! Each vendor-facing operation is delegated to a configured executable:
//! - the token fetch prints the token on stdout
//! - launches and the store opener are spawned without a shell
//! - alternate-review results come back later through the activity-result entry

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::Config;
use crate::error::ProviderError;
use crate::platform::{AlternateIntent, AlternateLauncher, ReviewProvider, StoreNavigator, Surface};
use crate::probe::{EnvironmentProbe, EnvironmentSnapshot, platform_version_sufficient};
use crate::session::Collaborators;
use crate::token::ReviewToken;

/// Cap on captured stdout. A token is a short opaque string.
pub const MAX_TOKEN_BYTES: usize = 64 * 1024;

/// Build every collaborator from config.
pub fn collaborators(config: &Config) -> Collaborators {
    let timeout = Duration::from_secs(config.primary.timeout_secs.max(1));
    Collaborators {
        probe: Arc::new(HostProbe::new(
            &config.primary.package_executable,
            config.services_reachable,
            config.platform_version,
        )),
        review: Arc::new(CommandReviewProvider {
            request_command: config.primary.request_command.clone(),
            launch_command: config.primary.launch_command.clone(),
            timeout,
        }),
        alternate: Arc::new(CommandAlternateLauncher {
            command: config.alternate.launch_command.clone(),
        }),
        navigator: Arc::new(CommandNavigator {
            command: config.navigator.open_command.clone(),
        }),
    }
}

/// Environment as seen from the host. Package presence is looked up once, at
/// construction, so answering never blocks the runtime on a subprocess.
pub struct HostProbe {
    pub package_executable: String,
    pub package_installed: bool,
    pub services_reachable: bool,
    pub platform_version: u32,
}

impl HostProbe {
    pub fn new(package_executable: &str, services_reachable: bool, platform_version: u32) -> Self {
        let package_installed = !package_executable.is_empty() && which_exists(package_executable);
        tracing::debug!(package_executable, package_installed, "provider package looked up");
        Self {
            package_executable: package_executable.to_string(),
            package_installed,
            services_reachable,
            platform_version,
        }
    }
}

impl EnvironmentProbe for HostProbe {
    fn probe(&self) -> EnvironmentSnapshot {
        if !self.package_installed {
            tracing::info!("{} not installed", self.package_executable);
        }
        if !self.services_reachable {
            tracing::info!("provider services not reachable");
        }
        EnvironmentSnapshot {
            provider_package_installed: self.package_installed,
            provider_services_reachable: self.services_reachable,
            platform_version_sufficient: platform_version_sufficient(self.platform_version),
        }
    }
}

pub struct CommandReviewProvider {
    pub request_command: Vec<String>,
    pub launch_command: Vec<String>,
    pub timeout: Duration,
}

#[async_trait]
impl ReviewProvider for CommandReviewProvider {
    async fn request_review_flow(&self) -> Result<ReviewToken, ProviderError> {
        let argv = render(&self.request_command, &[])?;
        let stdout = run_to_completion(&argv, self.timeout).await?;
        let token = stdout.trim();
        if token.is_empty() {
            return Err(ProviderError::new("review flow request returned no token"));
        }
        Ok(ReviewToken::new(token))
    }

    async fn launch_review_flow(
        &self,
        surface: &Surface,
        token: ReviewToken,
    ) -> Result<(), ProviderError> {
        let argv = render(
            &self.launch_command,
            &[("{token}", token.expose()), ("{surface}", surface.id.as_str())],
        )?;
        run_to_completion(&argv, self.timeout).await.map(|_| ())
    }
}

pub struct CommandAlternateLauncher {
    pub command: Vec<String>,
}

impl AlternateLauncher for CommandAlternateLauncher {
    fn launch(&self, surface: &Surface, intent: &AlternateIntent) -> Result<(), ProviderError> {
        let request_code = intent.request_code.to_string();
        let argv = render(
            &self.command,
            &[
                ("{action}", intent.action.as_str()),
                ("{package}", intent.package.as_str()),
                ("{request_code}", request_code.as_str()),
                ("{surface}", surface.id.as_str()),
            ],
        )?;
        spawn_detached(&argv)
    }
}

pub struct CommandNavigator {
    pub command: Vec<String>,
}

impl StoreNavigator for CommandNavigator {
    fn open(&self, _surface: &Surface, url: &str) -> Result<(), ProviderError> {
        let argv = render(&self.command, &[("{url}", url)])?;
        spawn_detached(&argv)
    }
}

/// Substitute `{placeholders}` into a command template. No shell is involved,
/// so substituted values are never re-parsed.
pub fn render(template: &[String], vars: &[(&str, &str)]) -> Result<Vec<String>, ProviderError> {
    if template.is_empty() {
        return Err(ProviderError::new("no command configured"));
    }
    Ok(template
        .iter()
        .map(|arg| {
            vars.iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
        })
        .collect())
}

/// Run a command, wait for it to exit and return its stdout.
/// Non-zero exit, timeout and oversized output are all errors.
async fn run_to_completion(argv: &[String], timeout: Duration) -> Result<String, ProviderError> {
    let start = Instant::now();
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ProviderError::new("no command configured"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProviderError::new(format!("failed to spawn {program}: {e}")))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProviderError::new("stdout not captured"))?;

    let work = async {
        let mut buf = Vec::new();
        (&mut stdout)
            .take(MAX_TOKEN_BYTES as u64 + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| ProviderError::new(format!("reading {program} output: {e}")))?;
        if buf.len() > MAX_TOKEN_BYTES {
            let _ = child.start_kill();
            return Err(ProviderError::new(format!(
                "{program} output exceeded {MAX_TOKEN_BYTES} bytes"
            )));
        }
        let status = child
            .wait()
            .await
            .map_err(|e| ProviderError::new(format!("waiting on {program}: {e}")))?;
        Ok::<_, ProviderError>((buf, status))
    };

    let (buf, status) = tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| ProviderError::new(format!("{program} timed out after {}ms", timeout.as_millis())))??;

    if !status.success() {
        return Err(ProviderError::new(format!(
            "{program} exited with {}",
            status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string())
        )));
    }
    tracing::debug!(
        program = program.as_str(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "command finished"
    );
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Start a command and return as soon as it is running. The child is reaped in
/// the background.
fn spawn_detached(argv: &[String]) -> Result<(), ProviderError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ProviderError::new("no command configured"))?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ProviderError::new(format!("failed to spawn {program}: {e}")))?;

    let program = program.clone();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::debug!(program = %program, "detached command exited with {status}");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(program = %program, "detached command wait failed: {e}"),
        }
    });
    Ok(())
}

/// Check if an executable exists in PATH.
fn which_exists(name: &str) -> bool {
    std::process::Command::new("which")
        .arg(name)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}
