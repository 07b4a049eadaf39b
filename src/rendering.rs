use std::io::Write;

use crate::build_status::BuildStatus;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Only show the most recent build, even when it failed.
    pub short: bool,
}

// The date is whatever precedes the first `T` of the ISO-8601 timestamp.
fn date_portion(timestamp: &str) -> &str {
    timestamp
        .split_once('T')
        .map(|(date, _)| date)
        .unwrap_or(timestamp)
}

pub fn format_build(build: &BuildStatus) -> String {
    let icon = build.icon();
    match build {
        BuildStatus::Evaluated(b) => {
            let extra = if b.success() {
                String::new()
            } else {
                format!(" ({})", b.status)
            };
            let date = date_portion(&b.timestamp);
            let name = &b.name;
            let url = &b.build_url;
            format!("{icon}{extra} {name} from {date} - {url}")
        }
        BuildStatus::Unevaluated { .. } => format!("{icon} {}", build.status()),
    }
}

pub fn render_one(out: &mut impl Write, build: &BuildStatus) -> std::io::Result<()> {
    writeln!(out, "{}", format_build(build))
}

pub fn render_text(
    out: &mut impl Write,
    job_id: &str,
    channel: &str,
    builds: &[BuildStatus],
    options: RenderOptions,
) -> std::io::Result<()> {
    writeln!(out, "Build Status for {job_id} on {channel}")?;
    let Some((latest, older)) = builds.split_first() else {
        return Ok(());
    };
    render_one(out, latest)?;
    if latest.evaluates() && !latest.success() && !options.short {
        writeln!(out)?;
        writeln!(out, "Last Builds:")?;
        for build in older {
            render_one(out, build)?;
        }
    }
    Ok(())
}

/// Records of every queried package, in query order.
#[derive(Debug, Default)]
pub struct JsonReport {
    entries: Vec<(String, Vec<BuildStatus>)>,
}

impl JsonReport {
    pub fn insert(&mut self, package: &str, builds: Vec<BuildStatus>) {
        match self.entries.iter_mut().find(|(name, _)| name == package) {
            Some((_, existing)) => *existing = builds,
            None => self.entries.push((package.to_string(), builds)),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl serde::Serialize for JsonReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(package, builds)| (package, builds)))
    }
}
