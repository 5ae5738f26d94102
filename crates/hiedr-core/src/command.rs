use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// One argument of an external tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolArg {
    /// `key=value`, the parameter form every image tool accepts.
    Param { key: String, value: OsString },
    Positional(OsString),
}

impl ToolArg {
    pub fn to_os_string(&self) -> OsString {
        match self {
            Self::Param { key, value } => {
                let mut s = OsString::from(format!("{key}="));
                s.push(value);
                s
            }
            Self::Positional(value) => value.clone(),
        }
    }
}

/// An external program invocation of the form `tool key1=value1 key2=value2`.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<ToolArg>,
    /// Directory created before launch, used as the working directory, and
    /// removed once the tool exits.
    pub scratch_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            scratch_dir: None,
        }
    }

    /// Append a `key=value` parameter.
    pub fn param(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.args.push(ToolArg::Param {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn path_param(self, key: &str, path: &Path) -> Self {
        self.param(key, path.as_os_str())
    }

    pub fn positional(mut self, value: impl Into<OsString>) -> Self {
        self.args.push(ToolArg::Positional(value.into()));
        self
    }

    pub fn in_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    /// Look the program up in `dir` instead of `PATH`.
    pub fn resolved_in(mut self, dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            self.program = dir.join(&self.program).to_string_lossy().into_owned();
        }
        self
    }

    /// Value of the first `key=` parameter, if any.
    pub fn value_of(&self, key: &str) -> Option<&OsString> {
        self.args.iter().find_map(|a| match a {
            ToolArg::Param { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    pub fn os_args(&self) -> Vec<OsString> {
        self.args.iter().map(ToolArg::to_os_string).collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_os_string().to_string_lossy())?;
        }
        Ok(())
    }
}
