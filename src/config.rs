//! Target configuration for code generation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable consulted by [`Config::from_env`].
pub const ARCH_ENV: &str = "CPPFORGE_ARCH";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown target architecture: `{0}`")]
    UnknownArch(String),
}

/// Target architecture; decides the width of the platform `int`/`uint` types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    I386,
    Amd64,
    Arm,
    Arm64,
}

impl Arch {
    /// Architecture matching the pointer width of the running host.
    pub fn host() -> Self {
        #[cfg(target_pointer_width = "32")]
        {
            Arch::I386
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            Arch::Amd64
        }
    }

    pub fn bit_size(self) -> u32 {
        match self {
            Arch::I386 | Arch::Arm => 32,
            Arch::Amd64 | Arch::Arm64 => 64,
        }
    }
}

impl Default for Arch {
    fn default() -> Self {
        Arch::host()
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i386" | "x86" => Ok(Arch::I386),
            "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm" => Ok(Arch::Arm),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            _ => Err(ConfigError::UnknownArch(s.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Arch::I386 => "i386",
            Arch::Amd64 => "amd64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        };
        f.write_str(text)
    }
}

/// Code generation settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub arch: Arch,
    /// Runtime prelude placed verbatim at the top of the translation unit.
    pub prelude: String,
}

impl Config {
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            prelude: String::new(),
        }
    }

    /// Build a configuration from `CPPFORGE_ARCH`, falling back to the host.
    pub fn from_env() -> Result<Self, ConfigError> {
        let arch = match std::env::var(ARCH_ENV) {
            Ok(name) => name.parse()?,
            Err(_) => Arch::host(),
        };
        Ok(Self::new(arch))
    }

    pub fn set_prelude(&mut self, prelude: impl Into<String>) {
        self.prelude = prelude.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_architectures() {
        assert_eq!("amd64".parse::<Arch>(), Ok(Arch::Amd64));
        assert_eq!("AArch64".parse::<Arch>(), Ok(Arch::Arm64));
        assert_eq!("x86".parse::<Arch>(), Ok(Arch::I386));
    }

    #[test]
    fn rejects_unknown_architecture() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownArch("sparc".to_string()));
        assert_eq!(err.to_string(), "unknown target architecture: `sparc`");
    }

    #[test]
    fn architecture_from_environment() {
        std::env::set_var(ARCH_ENV, "arm");
        assert_eq!(Config::from_env().map(|c| c.arch), Ok(Arch::Arm));
        std::env::set_var(ARCH_ENV, "sparc");
        assert_eq!(
            Config::from_env().map(|c| c.arch),
            Err(ConfigError::UnknownArch("sparc".to_string()))
        );
        std::env::remove_var(ARCH_ENV);
        assert_eq!(Config::from_env().map(|c| c.arch), Ok(Arch::host()));
    }

    #[test]
    fn bit_sizes() {
        assert_eq!(Arch::I386.bit_size(), 32);
        assert_eq!(Arch::Arm64.bit_size(), 64);
    }
}
