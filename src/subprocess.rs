//! 子进程运行
//!
//! 一次性运行外部命令并等待退出，只关心成败。传入环境变量时
//! 子进程使用干净环境，不继承父进程变量。

use tokio::process::Command;

use thiserror::Error;

/// 子进程运行失败
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// 没有给出可执行命令
    #[error("required command to run")]
    EmptyCommand,

    /// 环境变量条目不是 KEY=VALUE 形式
    #[error("environment variable format error, required KEY=VALUE: {0}")]
    InvalidEnvEntry(String),

    /// 进程无法启动或等待失败
    #[error("unable to run command: {0}")]
    Io(#[from] std::io::Error),

    /// 进程退出码非零
    #[error("command exited with failure code: {code:?}")]
    Failed { code: Option<i32> },
}

/// 运行一条命令并等待其退出
///
/// `args[0]` 是可执行文件，其余是参数。`envs` 为空时继承父进程
/// 环境；非空时子进程只看到给出的 KEY=VALUE 条目。
pub async fn run_command<A, E>(args: &[A], envs: &[E]) -> Result<(), SubprocessError>
where
    A: AsRef<str>,
    E: AsRef<str>,
{
    if args.is_empty() {
        return Err(SubprocessError::EmptyCommand);
    }

    let mut parsed = Vec::with_capacity(envs.len());
    for entry in envs {
        let entry = entry.as_ref();
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                parsed.push((key.to_string(), value.to_string()));
            }
            _ => return Err(SubprocessError::InvalidEnvEntry(entry.to_string())),
        }
    }

    let rendered: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    tracing::info!(command = ?rendered, "run command");

    let mut command = Command::new(rendered[0]);
    command.args(&rendered[1..]);
    if !parsed.is_empty() {
        command.env_clear();
        command.envs(parsed);
    }

    let output = command.output().await?;
    if !output.status.success() {
        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "command output"
        );
        tracing::error!(code = ?output.status.code(), "command run failed");
        return Err(SubprocessError::Failed {
            code: output.status.code(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ENV: &[&str] = &[];

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let no_args: &[&str] = &[];
        let result = run_command(no_args, NO_ENV).await;
        assert!(matches!(result, Err(SubprocessError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_malformed_env_entry_is_rejected() {
        let result = run_command(&["true"], &["NOT_A_PAIR"]).await;
        match result {
            Err(SubprocessError::InvalidEnvEntry(entry)) => assert_eq!(entry, "NOT_A_PAIR"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_command() {
        run_command(&["true"], NO_ENV).await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_command_reports_exit_code() {
        let result = run_command(&["sh", "-c", "exit 3"], NO_ENV).await;
        match result {
            Err(SubprocessError::Failed { code }) => assert_eq!(code, Some(3)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let result = run_command(&["livingkit-no-such-binary"], NO_ENV).await;
        assert!(matches!(result, Err(SubprocessError::Io(_))));
    }

    #[tokio::test]
    async fn test_explicit_envs_replace_parent_environment() {
        // 子进程环境被清空后只剩传入的变量
        std::env::set_var("LIVINGKIT_PARENT_ONLY", "leaked");
        run_command(
            &["sh", "-c", "test -z \"$LIVINGKIT_PARENT_ONLY\" && test \"$CHILD_ONLY\" = yes"],
            &["CHILD_ONLY=yes"],
        )
        .await
        .unwrap();
        std::env::remove_var("LIVINGKIT_PARENT_ONLY");
    }
}
