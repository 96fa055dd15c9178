// Purpose: Invoke the external Java compiler and archiver on a staged build.
// Inputs/Outputs: Takes source/class paths; returns captured stderr lines and exit state.
// Invariants: Argument vectors are built by pure functions so they can be checked without a JDK.
// Gotchas: Compiler stderr is drained on a helper thread; a timeout kills the child but keeps lines read so far.

use anyhow::{Context, bail};
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const CLASSPATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub classpath: Vec<PathBuf>,
    pub out_dir: PathBuf,
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub stderr: Vec<String>,
    pub success: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub archive: PathBuf,
    pub manifest: PathBuf,
    pub class_dir: PathBuf,
    /// Class files relative to `class_dir`.
    pub entries: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub stderr: Vec<String>,
}

/// The external compiler/archiver pair a build drives.
pub trait Toolchain {
    fn compile(&self, request: &CompileRequest) -> anyhow::Result<CompileReport>;
    fn archive(&self, request: &ArchiveRequest) -> anyhow::Result<ArchiveReport>;
}

/// `javac` and `jar` from a JDK installation.
#[derive(Debug, Clone)]
pub struct JdkToolchain {
    bin_dir: PathBuf,
    timeout: Duration,
}

impl JdkToolchain {
    pub fn new(root: &Path, timeout: Duration) -> Self {
        Self {
            bin_dir: root.join("bin"),
            timeout,
        }
    }

    pub fn tool(&self, name: &str) -> PathBuf {
        tool_path(&self.bin_dir, name)
    }
}

pub fn tool_path(bin_dir: &Path, name: &str) -> PathBuf {
    bin_dir.join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
}

impl Toolchain for JdkToolchain {
    fn compile(&self, request: &CompileRequest) -> anyhow::Result<CompileReport> {
        let javac = self.tool("javac");
        debug!("{} with {} source(s)", javac.display(), request.sources.len());
        let mut child = Command::new(&javac)
            .args(compile_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute {}", javac.display()))?;
        let Some(stderr) = child.stderr.take() else {
            bail!("{}: stderr was not captured", javac.display());
        };

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let deadline = Instant::now() + self.timeout;
        let mut report = CompileReport::default();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(line) => report.stderr.push(line),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("{} timed out after {:?}; killing it", javac.display(), self.timeout);
                    report.timed_out = true;
                    child
                        .kill()
                        .with_context(|| format!("kill {} after timeout", javac.display()))?;
                    break;
                }
            }
        }
        let status = child
            .wait()
            .with_context(|| format!("wait for {}", javac.display()))?;
        report.stderr.extend(rx.try_iter());
        let _ = reader.join();
        report.success = status.success() && !report.timed_out;
        Ok(report)
    }

    fn archive(&self, request: &ArchiveRequest) -> anyhow::Result<ArchiveReport> {
        let jar = self.tool("jar");
        debug!("{} with {} class file(s)", jar.display(), request.entries.len());
        let out = Command::new(&jar)
            .args(archive_args(request))
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute {}", jar.display()))?;
        let stderr = String::from_utf8_lossy(&out.stderr)
            .lines()
            .map(str::to_string)
            .collect();
        Ok(ArchiveReport { stderr })
    }
}

/// `.` followed by each library, joined with the platform separator.
pub fn classpath_arg(libraries: &[PathBuf]) -> Option<OsString> {
    if libraries.is_empty() {
        return None;
    }
    let mut cp = OsString::from(".");
    for lib in libraries {
        cp.push(CLASSPATH_SEPARATOR.to_string());
        cp.push(lib.as_os_str());
    }
    Some(cp)
}

pub fn compile_args(request: &CompileRequest) -> Vec<OsString> {
    let mut args = vec![OsString::from("-nowarn")];
    if let Some(cp) = classpath_arg(&request.classpath) {
        args.push("-classpath".into());
        args.push(cp);
    }
    args.push("-d".into());
    args.push(request.out_dir.clone().into_os_string());
    args.extend(request.sources.iter().map(|p| p.clone().into_os_string()));
    args
}

pub fn archive_args(request: &ArchiveRequest) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("cfm"),
        request.archive.clone().into_os_string(),
        request.manifest.clone().into_os_string(),
    ];
    for entry in &request.entries {
        args.push("-C".into());
        args.push(request.class_dir.clone().into_os_string());
        args.push(entry.clone().into_os_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::{
        ArchiveRequest, CLASSPATH_SEPARATOR, CompileRequest, archive_args, classpath_arg, compile_args, tool_path,
    };
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[cfg(unix)]
    fn temp_dir(prefix: &str) -> PathBuf {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time drift")
            .as_nanos();
        std::env::temp_dir().join(format!("jsc-{}-{}-{}", prefix, std::process::id(), nonce))
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn classpath_starts_with_current_dir() {
        assert_eq!(classpath_arg(&[]), None);
        let cp = classpath_arg(&[PathBuf::from("/l/a.jar"), PathBuf::from("/l/b c.jar")]).expect("classpath");
        let sep = CLASSPATH_SEPARATOR;
        assert_eq!(cp.to_string_lossy(), format!(".{sep}/l/a.jar{sep}/l/b c.jar"));
    }

    #[test]
    fn compile_args_omit_empty_classpath() {
        let req = CompileRequest {
            classpath: vec![],
            out_dir: PathBuf::from("/s/bin"),
            sources: vec![PathBuf::from("/s/src/A.java"), PathBuf::from("/s/src/p/B.java")],
        };
        assert_eq!(
            strings(compile_args(&req)),
            vec!["-nowarn", "-d", "/s/bin", "/s/src/A.java", "/s/src/p/B.java"]
        );

        let with_libs = CompileRequest {
            classpath: vec![PathBuf::from("/l/x.jar")],
            ..req
        };
        let args = strings(compile_args(&with_libs));
        let cp = format!(".{}/l/x.jar", CLASSPATH_SEPARATOR);
        assert_eq!(&args[..3], &["-nowarn", "-classpath", cp.as_str()]);
        assert_eq!(args[3], "-d");
    }

    #[test]
    fn archive_args_repeat_class_dir_per_entry() {
        let req = ArchiveRequest {
            archive: PathBuf::from("JSCRuntime.jar"),
            manifest: PathBuf::from("/s/temp.mf"),
            class_dir: PathBuf::from("/s/bin"),
            entries: vec![PathBuf::from("Main.class"), PathBuf::from("Main$0.class")],
        };
        assert_eq!(
            strings(archive_args(&req)),
            vec![
                "cfm",
                "JSCRuntime.jar",
                "/s/temp.mf",
                "-C",
                "/s/bin",
                "Main.class",
                "-C",
                "/s/bin",
                "Main$0.class",
            ]
        );
    }

    #[test]
    fn tool_path_uses_platform_suffix() {
        let p = tool_path(Path::new("/jdk/bin"), "javac");
        assert_eq!(p, PathBuf::from(format!("/jdk/bin/javac{}", std::env::consts::EXE_SUFFIX)));
    }

    #[cfg(unix)]
    #[test]
    fn hung_compiler_is_killed_and_keeps_stderr() {
        use super::{JdkToolchain, Toolchain};
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        let root = temp_dir("hung-javac");
        let bin = root.join("bin");
        fs::create_dir_all(&bin).expect("mkdir bin");
        let javac = bin.join("javac");
        fs::write(&javac, "#!/bin/sh\necho \"A.java:1: error: boom\" >&2\nexec sleep 30\n").expect("write javac");
        fs::set_permissions(&javac, fs::Permissions::from_mode(0o755)).expect("chmod javac");

        let req = CompileRequest {
            classpath: vec![],
            out_dir: root.join("out"),
            sources: vec![root.join("A.java")],
        };
        let started = Instant::now();
        let report = JdkToolchain::new(&root, Duration::from_secs(1))
            .compile(&req)
            .expect("compile");
        assert!(report.timed_out);
        assert!(!report.success);
        assert_eq!(report.stderr, vec!["A.java:1: error: boom".to_string()]);
        assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());

        let _ = fs::remove_dir_all(root);
    }
}
