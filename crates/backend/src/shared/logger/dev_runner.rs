use anyhow::Context;
use chrono::Utc;
use contracts::shared::logger::{iso_timestamp, LogCategory};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use super::store::LogStore;

/// Внешняя команда, вывод которой нужно сохранять в build.log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DevCommand {
    /// Разбирает `--wrap <program> [args...]` из аргументов командной строки.
    pub fn from_args(args: &[String]) -> Option<Self> {
        let pos = args.iter().position(|a| a == "--wrap")?;
        let mut rest = args[pos + 1..].iter().cloned();
        let program = rest.next()?;
        Some(Self {
            program,
            args: rest.collect(),
        })
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Запускает команду и пишет всё, что она выводит, в build.log.
/// Вывод дублируется в терминал. Возвращает код завершения
/// (`None`, если процесс убит сигналом).
pub async fn run(store: Arc<LogStore>, command: DevCommand) -> anyhow::Result<Option<i32>> {
    append_build(
        &store,
        &format!("\n[{}] Starting dev server\n", iso_timestamp(Utc::now())),
    );
    tracing::info!("Wrapping dev command: {} {:?}", command.program, command.args);

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn '{}'", command.program))?;

    let stdout = child.stdout.take().context("child stdout not captured")?;
    let stderr = child.stderr.take().context("child stderr not captured")?;

    let out_task = tokio::spawn(capture(
        Arc::clone(&store),
        stdout,
        tokio::io::stdout(),
        Stream::Stdout,
    ));
    let err_task = tokio::spawn(capture(
        Arc::clone(&store),
        stderr,
        tokio::io::stderr(),
        Stream::Stderr,
    ));

    let status = child.wait().await?;
    // Дочитываем хвост вывода до строки о завершении
    for task in [out_task, err_task] {
        if let Err(e) = task.await? {
            tracing::warn!("Dev output capture stopped: {}", e);
        }
    }

    let code = status.code();
    let code_text = code.map(|c| c.to_string()).unwrap_or_else(|| "null".to_string());
    append_build(
        &store,
        &format!(
            "\n[{}] Dev server exited with code {}\n",
            iso_timestamp(Utc::now()),
            code_text
        ),
    );
    tracing::info!("Dev command exited with code {}", code_text);

    Ok(code)
}

async fn capture<R, W>(store: Arc<LogStore>, mut reader: R, mut echo: W, stream: Stream) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; 8192];
    let mut echo_ok = true;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let chunk = &buf[..n];
        // Вывод дочернего процесса дочитывается до конца, даже если
        // терминал или build.log недоступны
        if echo_ok {
            if let Err(e) = echo_chunk(&mut echo, chunk).await {
                tracing::warn!("Failed to echo dev output: {}", e);
                echo_ok = false;
            }
        }

        let text = String::from_utf8_lossy(chunk);
        let timestamp = iso_timestamp(Utc::now());
        let entry = match stream {
            Stream::Stdout => format!("[{}] {}", timestamp, text),
            Stream::Stderr => format!("[{}] ERROR: {}", timestamp, text),
        };
        append_build(&store, &entry);
    }
}

async fn echo_chunk<W: AsyncWrite + Unpin>(echo: &mut W, chunk: &[u8]) -> std::io::Result<()> {
    echo.write_all(chunk).await?;
    echo.flush().await
}

fn append_build(store: &LogStore, entry: &str) {
    if let Err(e) = store.append(LogCategory::Build, entry) {
        tracing::warn!("Failed to append dev output to build.log: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_wrap_args() {
        assert_eq!(DevCommand::from_args(&args(&[])), None);
        assert_eq!(DevCommand::from_args(&args(&["--wrap"])), None);
        assert_eq!(
            DevCommand::from_args(&args(&["--wrap", "trunk", "serve", "--port", "8080"])),
            Some(DevCommand {
                program: "trunk".into(),
                args: args(&["serve", "--port", "8080"]),
            })
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_both_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(dir.path()).unwrap());

        let code = run(
            Arc::clone(&store),
            DevCommand {
                program: "sh".into(),
                args: args(&["-c", "echo compiled; echo oops 1>&2; exit 3"]),
            },
        )
        .await
        .unwrap();

        assert_eq!(code, Some(3));
        let build = store.read_all(LogCategory::Build).unwrap();
        assert!(build.starts_with("\n["));
        assert!(build.contains("] Starting dev server\n"));
        assert!(build.contains("] compiled\n"));
        assert!(build.contains("] ERROR: oops\n"));
        assert!(build.ends_with("] Dev server exited with code 3\n"));
        assert_eq!(store.read_all(LogCategory::Error).unwrap(), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_keeps_draining_when_build_log_unwritable() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(dir.path()).unwrap());
        let root = dir.path().to_string_lossy().to_string();

        // Больше буфера pipe: без чтения дочерний процесс бы завис
        let script = r#"echo first; rm -rf "$1/terminal"; head -c 100000 /dev/zero | tr '\0' x; echo; echo done"#;
        let code = run(
            Arc::clone(&store),
            DevCommand {
                program: "sh".into(),
                args: args(&["-c", script, "sh", &root]),
            },
        )
        .await
        .unwrap();

        assert_eq!(code, Some(0));
        assert!(!store.category_path(LogCategory::Build).exists());
    }

    #[tokio::test]
    async fn test_run_missing_program_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(dir.path()).unwrap());
        let result = run(
            store,
            DevCommand {
                program: "definitely-not-a-real-program-xyz".into(),
                args: vec![],
            },
        )
        .await;
        assert!(result.is_err());
    }
}
