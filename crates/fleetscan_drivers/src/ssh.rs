use crate::DriverError;
use async_ssh2_tokio::{AuthMethod, Client, ServerCheckMethod};
use std::time::Duration;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// A single throwaway SSH session used purely for classification probing.
/// Host keys are never verified: the scanner has no prior trust
/// relationship with the targets it is discovering.
pub struct SshProbe {
    client: Client,
}

pub struct SshExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: u32,
}

impl SshProbe {
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, DriverError> {
        let auth = AuthMethod::with_password(password);
        let connect_fut = Client::connect((host, port), username, auth, ServerCheckMethod::NoCheck);
        let client = tokio::time::timeout(timeout, connect_fut)
            .await
            .map_err(|_| DriverError::Timeout)?
            .map_err(|e| DriverError::ConnectFailed(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn exec(&self, command: &str, timeout: Duration) -> Result<SshExecOutput, DriverError> {
        let result = tokio::time::timeout(timeout, self.client.execute(command))
            .await
            .map_err(|_| DriverError::Timeout)?
            .map_err(|e| DriverError::CommandFailed(e.to_string()))?;
        Ok(SshExecOutput {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_status: result.exit_status,
        })
    }

    /// Sessions are throwaway; there is nothing to flush, so closing is
    /// just dropping the underlying connection.
    pub async fn close(self) -> Result<(), DriverError> {
        drop(self.client);
        Ok(())
    }
}
