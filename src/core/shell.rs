//! Shell discovery
//!
//! Picks the shell executable and its invocation arguments for the host
//! platform.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

/// Candidate shells for Windows hosts, in priority order
const WINDOWS_CANDIDATES: &[(&str, &[&str])] = &[
    ("pwsh.exe", &["-NoLogo"]),
    ("powershell.exe", &["-NoLogo"]),
    ("cmd.exe", &["/K"]),
];

/// Candidate shells for POSIX hosts, in priority order
const POSIX_CANDIDATES: &[(&str, &[&str])] = &[
    ("bash", &["-i"]),
    ("zsh", &["-i"]),
    ("fish", &["-i"]),
    ("sh", &["-i"]),
];

/// Shell family of a host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFamily {
    Windows,
    Posix,
}

impl ShellFamily {
    /// Family of the platform this binary was built for
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFamily::Windows
        } else {
            ShellFamily::Posix
        }
    }

    fn candidates(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            ShellFamily::Windows => WINDOWS_CANDIDATES,
            ShellFamily::Posix => POSIX_CANDIDATES,
        }
    }

    /// Shell that is always present on this family, run without flags
    fn fallback(self) -> ShellCommand {
        match self {
            ShellFamily::Windows => ShellCommand::new("cmd.exe", Vec::new()),
            ShellFamily::Posix => ShellCommand::new("sh", Vec::new()),
        }
    }
}

/// An executable plus its argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Short display name (file name of the program)
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Resolves the shell command line for a platform family
pub struct ShellResolver {
    family: ShellFamily,
}

impl Default for ShellResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellResolver {
    /// Resolver for the host platform
    pub fn new() -> Self {
        Self {
            family: ShellFamily::host(),
        }
    }

    pub fn for_family(family: ShellFamily) -> Self {
        Self { family }
    }

    /// Resolve using the executable search path
    pub fn resolve(&self) -> ShellCommand {
        self.resolve_with(|name| which::which(name).ok())
    }

    /// Resolve using a custom executable lookup
    pub fn resolve_with<F>(&self, lookup: F) -> ShellCommand
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        for (name, args) in self.family.candidates() {
            if let Some(path) = lookup(name) {
                debug!("Resolved shell {} at {}", name, path.display());
                return ShellCommand::new(path, args.iter().map(|a| a.to_string()).collect());
            }
        }
        let fallback = self.family.fallback();
        debug!("No candidate shell found, falling back to {}", fallback);
        fallback
    }

    /// Build a command line for an explicitly configured shell.
    ///
    /// Without explicit args, known shells get the same flags the resolver
    /// would give them; unknown programs get none.
    pub fn from_override(&self, program: &str, args: Option<&[String]>) -> ShellCommand {
        let args = match args {
            Some(args) => args.to_vec(),
            None => Self::default_args(program),
        };
        ShellCommand::new(program, args)
    }

    /// Invocation flags for a known shell program name
    pub fn default_args(program: &str) -> Vec<String> {
        // Configured paths may use either separator regardless of host
        let name = program
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(program)
            .to_lowercase();
        let stem = name.strip_suffix(".exe").unwrap_or(&name);

        let flags: &[&str] = match stem {
            "pwsh" | "powershell" => &["-NoLogo"],
            "cmd" => &["/K"],
            "bash" | "zsh" | "fish" | "sh" | "dash" | "ksh" => &["-i"],
            _ => &[],
        };
        flags.iter().map(|f| f.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_only<'a>(present: &'a [&'a str]) -> impl Fn(&str) -> Option<PathBuf> + 'a {
        move |name| {
            present
                .contains(&name)
                .then(|| PathBuf::from("/usr/bin").join(name))
        }
    }

    #[test]
    fn test_posix_prefers_bash() {
        let resolver = ShellResolver::for_family(ShellFamily::Posix);
        let shell = resolver.resolve_with(lookup_only(&["sh", "zsh", "bash"]));

        assert_eq!(shell.program, PathBuf::from("/usr/bin/bash"));
        assert_eq!(shell.args, vec!["-i"]);
    }

    #[test]
    fn test_posix_falls_through_candidates() {
        let resolver = ShellResolver::for_family(ShellFamily::Posix);
        let shell = resolver.resolve_with(lookup_only(&["fish"]));

        assert_eq!(shell.name(), "fish");
        assert_eq!(shell.args, vec!["-i"]);
    }

    #[test]
    fn test_posix_fallback_has_no_interactive_flag() {
        let resolver = ShellResolver::for_family(ShellFamily::Posix);
        let shell = resolver.resolve_with(|_| None);

        assert_eq!(shell.program, PathBuf::from("sh"));
        assert!(shell.args.is_empty());
    }

    #[test]
    fn test_windows_candidates() {
        let resolver = ShellResolver::for_family(ShellFamily::Windows);

        let shell = resolver.resolve_with(lookup_only(&["powershell.exe", "cmd.exe"]));
        assert_eq!(shell.name(), "powershell.exe");
        assert_eq!(shell.args, vec!["-NoLogo"]);

        let shell = resolver.resolve_with(lookup_only(&["cmd.exe"]));
        assert_eq!(shell.args, vec!["/K"]);

        let shell = resolver.resolve_with(|_| None);
        assert_eq!(shell.program, PathBuf::from("cmd.exe"));
        assert!(shell.args.is_empty());
    }

    #[test]
    fn test_override_args() {
        let resolver = ShellResolver::new();

        let shell = resolver.from_override("/bin/zsh", None);
        assert_eq!(shell.args, vec!["-i"]);

        let shell = resolver.from_override("C:\\Tools\\PWSH.EXE", None);
        assert_eq!(shell.args, vec!["-NoLogo"]);

        let shell = resolver.from_override("python3", None);
        assert!(shell.args.is_empty());

        let explicit = vec!["--norc".to_string()];
        let shell = resolver.from_override("bash", Some(&explicit));
        assert_eq!(shell.args, explicit);
    }

    #[test]
    fn test_display() {
        let shell = ShellCommand::new("/bin/bash", vec!["-i".to_string()]);
        assert_eq!(shell.to_string(), "/bin/bash -i");
    }
}
