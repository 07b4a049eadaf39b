use std::sync::LazyLock;

use regex::Regex;

use crate::error::HydraError;

pub static DEFAULT_HOST_URL: &str = "https://hydra.nixos.org";

/// Systems built on hydra.nixos.org (`supportedSystems` of nixpkgs/trunk).
pub static KNOWN_ARCHITECTURES: [&str; 4] = [
    "x86_64-linux",
    "aarch64-linux",
    "x86_64-darwin",
    "aarch64-darwin",
];

static NIXOS_RELEASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^nixos-[0-9]+\.[0-9]+").unwrap());
static NIXPKGS_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^nixpkgs-[0-9]+\.[0-9]+").unwrap());

/// Maps a channel alias to the Hydra jobset it is built by.
pub fn resolve_jobset(channel: &str) -> String {
    match channel {
        "master" | "nixpkgs-unstable" => String::from("nixpkgs/trunk"),
        "unstable" | "nixos-unstable" => String::from("nixos/trunk-combined"),
        "nixos-unstable-small" => String::from("nixos/unstable-small"),
        "staging" => String::from("nixos/staging"),
        c if c.starts_with("staging-next") => format!("nixpkgs/{c}"),
        c if c.starts_with(|ch: char| ch.is_ascii_digit()) => format!("nixos/release-{c}"),
        c if NIXOS_RELEASE.is_match(c) => c.replacen("nixos", "nixos/release", 1),
        c if NIXPKGS_RELEASE.is_match(c) => c.replacen("nixpkgs", "nixpkgs/nixpkgs", 1),
        // assume a verbatim jobset name such as nixpkgs/nixpkgs-20.03-darwin
        c => c.to_string(),
    }
}

pub fn is_channel_jobset(jobset: &str) -> bool {
    jobset.starts_with("nixos/")
}

fn has_known_arch_suffix(package: &str) -> bool {
    KNOWN_ARCHITECTURES
        .iter()
        .any(|arch| package.strip_suffix(arch).is_some_and(|rest| rest.ends_with('.')))
}

/// An empty `arch`, or a package already ending in a known system, adds no suffix.
pub fn build_job_id(package: &str, arch: &str, is_channel: bool) -> String {
    let arch_suffix = if arch.is_empty() || has_known_arch_suffix(package) {
        String::new()
    } else {
        format!(".{arch}")
    };
    if package.starts_with("nixpkgs.") || package.starts_with("nixos.") {
        format!("{package}{arch_suffix}")
    } else if is_channel {
        // a package is far more likely than a test here
        format!("nixpkgs.{package}{arch_suffix}")
    } else {
        format!("{package}{arch_suffix}")
    }
}

/// Rejects package names that are known not to exist as Hydra jobs.
pub fn check_package(package: &str) -> Result<(), HydraError> {
    if package.starts_with("python3Packages") || package.starts_with("python3.pkgs") {
        Err(HydraError::Usage {
            package: package.to_string(),
        })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// `<jobset>/<job id>`
    pub ident: String,
    pub url: String,
}

impl Job {
    pub fn new(host_url: &str, jobset: &str, job_id: &str) -> Job {
        let host_url = host_url.trim_end_matches('/');
        let ident = format!("{jobset}/{job_id}");
        let url = format!("{host_url}/job/{ident}");
        Job { ident, url }
    }
}
