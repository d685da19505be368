//! Target program preparation and execution environment
//!
//! A [`Target`] is validated once before instrumentation starts: it must exist,
//! be a regular file, and be either executable or start with a `#!` line
//! naming an interpreter that exists. [`ExecEnv`] carries the search path the
//! target runs with; the profiler's own environment is never modified.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::TargetError;

/// Bytes read from the start of the file when looking for a `#!` line
const HEADER_LEN: usize = 256;

/// How the target gets started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// The file is executable; exec it directly
    Direct,
    /// Not executable; run it through its `#!` interpreter
    Interpreter {
        interpreter: PathBuf,
        argument: Option<String>,
    },
}

/// A prepared target program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    path: PathBuf,
    args: Vec<String>,
    launch: Launch,
}

/// Parse a `#!interpreter [argument]` line
///
/// Everything after the first run of whitespace is a single argument, the way
/// the kernel treats it.
pub fn parse_shebang(header: &[u8]) -> Option<(PathBuf, Option<String>)> {
    let rest = header.strip_prefix(b"#!")?;
    let line_end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
    let line = String::from_utf8_lossy(&rest[..line_end]);
    let line = line.trim();

    let (interpreter, argument) = match line.split_once(char::is_whitespace) {
        Some((interpreter, argument)) => {
            let argument = argument.trim();
            (interpreter, (!argument.is_empty()).then(|| argument.to_string()))
        }
        None => (line, None),
    };

    if interpreter.is_empty() {
        return None;
    }
    Some((PathBuf::from(interpreter), argument))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Resolve the program named on the command line
///
/// Names containing a path separator, or naming an existing file, are used as
/// given. Bare names are otherwise looked up on `search_path`.
pub fn resolve_program(program: &str, search_path: Option<&OsStr>) -> Result<PathBuf, TargetError> {
    let candidate = PathBuf::from(program);
    if program.contains('/') || candidate.exists() {
        return Ok(candidate);
    }

    search_path
        .into_iter()
        .flat_map(std::env::split_paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
        .ok_or(TargetError::NotFound(candidate))
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    File::open(path)?
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}

impl Target {
    /// Validate a program before any instrumentation happens
    pub fn prepare(program: &str, args: &[String]) -> Result<Self, TargetError> {
        let inherited = std::env::var_os("PATH");
        let path = resolve_program(program, inherited.as_deref())?;

        let metadata = fs::metadata(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TargetError::NotFound(path.clone()),
            _ => TargetError::Read {
                path: path.clone(),
                source,
            },
        })?;
        if !metadata.is_file() {
            return Err(TargetError::NotAFile(path));
        }

        let header = read_header(&path).map_err(|source| TargetError::Read {
            path: path.clone(),
            source,
        })?;
        let shebang = parse_shebang(&header);

        if let Some((interpreter, _)) = &shebang {
            if interpreter.is_absolute() && !interpreter.exists() {
                return Err(TargetError::BadInterpreter {
                    script: path,
                    interpreter: interpreter.clone(),
                });
            }
        }

        let launch = if metadata.permissions().mode() & 0o111 != 0 {
            Launch::Direct
        } else if let Some((interpreter, argument)) = shebang {
            Launch::Interpreter {
                interpreter,
                argument,
            }
        } else {
            return Err(TargetError::NotExecutable(path));
        };

        debug!(path = %path.display(), ?launch, "target prepared");
        Ok(Self {
            path,
            args: args.to_vec(),
            launch,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn launch(&self) -> &Launch {
        &self.launch
    }

    /// File name used as the root frame of the report
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Directory holding the target; `.` for bare relative names
    pub fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Path handed to exec, never a bare name that would trigger a PATH lookup
    fn exec_path(&self) -> PathBuf {
        if self.path.components().count() == 1 && self.path.is_relative() {
            Path::new(".").join(&self.path)
        } else {
            self.path.clone()
        }
    }

    /// Build the command that runs this target inside `env`
    pub fn command(&self, env: &ExecEnv) -> Result<Command, TargetError> {
        let mut command = match &self.launch {
            Launch::Direct => {
                let mut command = Command::new(self.exec_path());
                command.arg0(self.path.as_os_str());
                command
            }
            Launch::Interpreter {
                interpreter,
                argument,
            } => {
                let mut command = Command::new(interpreter);
                command.args(argument.iter());
                command.arg(self.exec_path());
                command
            }
        };

        command.args(&self.args);
        env.apply(&mut command)?;
        Ok(command)
    }
}

/// Execution environment of the target
///
/// The target's directory is placed first on its search path so that sibling
/// programs resolve as if the target had been started from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecEnv {
    search_path: Vec<PathBuf>,
}

impl ExecEnv {
    /// Environment for `target`, layered over an inherited `PATH` value
    pub fn for_target(target: &Target, inherited: Option<&OsStr>) -> Self {
        let mut search_path = vec![target.directory()];
        search_path.extend(inherited.into_iter().flat_map(std::env::split_paths));
        Self { search_path }
    }

    /// Environment for `target`, layered over the current process's `PATH`
    pub fn inherit(target: &Target) -> Self {
        let inherited = std::env::var_os("PATH");
        Self::for_target(target, inherited.as_deref())
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Joined `PATH` value for the target
    pub fn path_var(&self) -> Result<OsString, TargetError> {
        Ok(std::env::join_paths(&self.search_path)?)
    }

    /// Install this environment on a command
    pub fn apply(&self, command: &mut Command) -> Result<(), TargetError> {
        command.env("PATH", self.path_var()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_parse_shebang() {
        assert_eq!(
            parse_shebang(b"#!/bin/sh\necho hi\n"),
            Some((PathBuf::from("/bin/sh"), None))
        );
        assert_eq!(
            parse_shebang(b"#! /usr/bin/env python3 -u\n"),
            Some((PathBuf::from("/usr/bin/env"), Some("python3 -u".to_string())))
        );
        assert_eq!(parse_shebang(b"#!\n"), None);
        assert_eq!(parse_shebang(b"echo hi\n"), None);
        assert_eq!(parse_shebang(b"\x7fELF"), None);
    }

    #[test]
    fn test_prepare_executable_script() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "job.sh", "#!/bin/sh\nexit 0\n", 0o755);

        let target = Target::prepare(path.to_str().unwrap(), &["a".to_string()]).unwrap();
        assert_eq!(target.launch(), &Launch::Direct);
        assert_eq!(target.args(), ["a".to_string()]);
        assert_eq!(target.display_name(), "job.sh");
        assert_eq!(target.directory(), dir.path());
    }

    #[test]
    fn test_prepare_non_executable_script_uses_interpreter() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "job.sh", "#!/bin/sh\nexit 0\n", 0o644);

        let target = Target::prepare(path.to_str().unwrap(), &[]).unwrap();
        assert_eq!(
            target.launch(),
            &Launch::Interpreter {
                interpreter: PathBuf::from("/bin/sh"),
                argument: None
            }
        );
    }

    #[test]
    fn test_prepare_rejects_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "notes.txt", "just words\n", 0o644);

        let err = Target::prepare(path.to_str().unwrap(), &[]).unwrap_err();
        assert!(matches!(err, TargetError::NotExecutable(_)));
    }

    #[test]
    fn test_prepare_rejects_missing_interpreter() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "job.sh", "#!/nonexistent/shell\n", 0o755);

        let err = Target::prepare(path.to_str().unwrap(), &[]).unwrap_err();
        assert!(matches!(err, TargetError::BadInterpreter { .. }));
    }

    #[test]
    fn test_prepare_rejects_missing_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.sh");
        assert!(matches!(
            Target::prepare(missing.to_str().unwrap(), &[]).unwrap_err(),
            TargetError::NotFound(_)
        ));
        assert!(matches!(
            Target::prepare(dir.path().to_str().unwrap(), &[]).unwrap_err(),
            TargetError::NotAFile(_)
        ));
    }

    #[test]
    fn test_resolve_program_searches_path_for_bare_names() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "samplr-test-tool", "#!/bin/sh\n", 0o755);
        let search = std::env::join_paths([dir.path()]).unwrap();

        assert_eq!(
            resolve_program("samplr-test-tool", Some(search.as_os_str())).unwrap(),
            path
        );
        assert!(matches!(
            resolve_program("samplr-no-such-tool", Some(search.as_os_str())),
            Err(TargetError::NotFound(_))
        ));
    }

    #[test]
    fn test_exec_env_prepends_target_directory() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "job.sh", "#!/bin/sh\n", 0o755);
        let target = Target::prepare(path.to_str().unwrap(), &[]).unwrap();

        let inherited = OsString::from("/usr/bin:/bin");
        let env = ExecEnv::for_target(&target, Some(inherited.as_os_str()));
        assert_eq!(
            env.search_path(),
            [dir.path().to_path_buf(), PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
        );
        let expected = format!("{}:/usr/bin:/bin", dir.path().display());
        assert_eq!(env.path_var().unwrap(), OsString::from(expected));
    }

    #[test]
    fn test_directory_of_bare_name_is_current_dir() {
        let target = Target {
            path: PathBuf::from("job.sh"),
            args: Vec::new(),
            launch: Launch::Direct,
        };
        assert_eq!(target.directory(), PathBuf::from("."));
        assert_eq!(target.exec_path(), PathBuf::from("./job.sh"));
    }

    #[test]
    fn test_command_for_interpreter_launch() {
        let target = Target {
            path: PathBuf::from("/tmp/job.py"),
            args: vec!["--fast".to_string()],
            launch: Launch::Interpreter {
                interpreter: PathBuf::from("/usr/bin/env"),
                argument: Some("python3".to_string()),
            },
        };
        let env = ExecEnv::for_target(&target, None);
        let command = target.command(&env).unwrap();

        assert_eq!(command.get_program(), "/usr/bin/env");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["python3", "/tmp/job.py", "--fast"]);
    }
}
