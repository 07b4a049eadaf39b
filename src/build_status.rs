use std::fmt;

static SUCCEEDED: &str = "Succeeded";
static CANCELLED: &str = "Cancelled";
static QUEUED_STATUS: &str = "No build has been attempted for this package yet (still queued)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StatusIcon {
    #[serde(rename = "✔")]
    Succeeded,
    #[serde(rename = "✖")]
    Failed,
    #[serde(rename = "⏹")]
    Cancelled,
    #[serde(rename = "⚠")]
    Warning,
    #[serde(rename = "⧖")]
    Pending,
}

impl StatusIcon {
    pub fn symbol(&self) -> char {
        match self {
            Self::Succeeded => '✔',
            Self::Failed => '✖',
            Self::Cancelled => '⏹',
            Self::Warning => '⚠',
            Self::Pending => '⧖',
        }
    }
}

impl fmt::Display for StatusIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A real build row as reported by Hydra.
#[derive(Debug, Clone, PartialEq)]
pub struct Build {
    pub status: String,
    pub build_id: String,
    pub build_url: String,
    pub timestamp: String,
    pub name: String,
    pub arch: String,
}

impl Build {
    pub fn success(&self) -> bool {
        self.status == SUCCEEDED
    }
}

/// One classified entry of a job page: either a build attempt, or an
/// explanation of why there is no build to show.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(into = "StatusEntry", try_from = "StatusEntry")]
pub enum BuildStatus {
    Evaluated(Build),
    Unevaluated { icon: StatusIcon, status: String },
}

impl BuildStatus {
    pub fn queued() -> Self {
        Self::Unevaluated {
            icon: StatusIcon::Pending,
            status: String::from(QUEUED_STATUS),
        }
    }

    pub fn unknown(marker: &str) -> Self {
        Self::Unevaluated {
            icon: StatusIcon::Pending,
            status: format!("Unknown Hydra status: {marker}"),
        }
    }

    pub fn not_evaluated(status: String) -> Self {
        Self::Unevaluated {
            icon: StatusIcon::Warning,
            status,
        }
    }

    pub fn icon(&self) -> StatusIcon {
        match self {
            Self::Evaluated(build) if build.success() => StatusIcon::Succeeded,
            Self::Evaluated(build) if build.status == CANCELLED => StatusIcon::Cancelled,
            Self::Evaluated(_) => StatusIcon::Failed,
            Self::Unevaluated { icon, .. } => *icon,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Evaluated(build) if build.success())
    }

    pub fn evaluates(&self) -> bool {
        matches!(self, Self::Evaluated(_))
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Evaluated(build) => &build.status,
            Self::Unevaluated { status, .. } => status,
        }
    }
}

// Flat JSON shape; build fields only appear on evaluating entries.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StatusEntry {
    icon: StatusIcon,
    success: bool,
    evaluates: bool,
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    build_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arch: Option<String>,
}

impl From<BuildStatus> for StatusEntry {
    fn from(status: BuildStatus) -> Self {
        let icon = status.icon();
        let success = status.success();
        match status {
            BuildStatus::Evaluated(build) => StatusEntry {
                icon,
                success,
                evaluates: true,
                status: build.status,
                timestamp: Some(build.timestamp),
                build_id: Some(build.build_id),
                build_url: Some(build.build_url),
                name: Some(build.name),
                arch: Some(build.arch),
            },
            BuildStatus::Unevaluated { status, .. } => StatusEntry {
                icon,
                success,
                evaluates: false,
                status,
                timestamp: None,
                build_id: None,
                build_url: None,
                name: None,
                arch: None,
            },
        }
    }
}

impl TryFrom<StatusEntry> for BuildStatus {
    type Error = String;

    fn try_from(entry: StatusEntry) -> Result<Self, Self::Error> {
        if !entry.evaluates {
            if entry.success {
                return Err(String::from("a successful entry must evaluate"));
            }
            return Ok(BuildStatus::Unevaluated {
                icon: entry.icon,
                status: entry.status,
            });
        }
        match (entry.timestamp, entry.build_id, entry.build_url, entry.name, entry.arch) {
            (Some(timestamp), Some(build_id), Some(build_url), Some(name), Some(arch)) => {
                let build = Build {
                    status: entry.status,
                    build_id,
                    build_url,
                    timestamp,
                    name,
                    arch,
                };
                if build.success() != entry.success {
                    return Err(format!("success flag contradicts status '{}'", build.status));
                }
                Ok(BuildStatus::Evaluated(build))
            }
            _ => Err(String::from("an evaluating entry needs all build fields")),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_build(status: &str, build_id: &str) -> BuildStatus {
    BuildStatus::Evaluated(Build {
        status: String::from(status),
        build_id: String::from(build_id),
        build_url: format!("https://hydra.nixos.org/build/{build_id}"),
        timestamp: String::from("2020-03-07T12:34:56Z"),
        name: String::from("hello-2.10"),
        arch: String::from("x86_64-linux"),
    })
}
