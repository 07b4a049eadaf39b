use std::io::Write;

use tracing::{debug, error, warn};

use crate::{
    build_status::BuildStatus,
    error::HydraError,
    hydra,
    jobset::{Job, build_job_id, check_package, is_channel_jobset, resolve_jobset},
    rendering::{JsonReport, RenderOptions, render_text},
    utils::Fetch,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text(RenderOptions),
    Json,
    /// Print the job URLs without fetching anything.
    Url,
}

#[derive(Debug)]
pub struct Query {
    pub packages: Vec<String>,
    pub arch: String,
    pub channel: String,
    /// Verbatim jobset, used instead of resolving `channel`.
    pub jobset: Option<String>,
    pub host_url: String,
    pub mode: OutputMode,
}

fn latest_succeeded(builds: &[BuildStatus]) -> bool {
    builds.first().is_some_and(BuildStatus::success)
}

async fn fetch_builds<F: Fetch>(fetcher: &F, job: &Job) -> Result<Vec<BuildStatus>, HydraError> {
    let markup = fetcher.fetch(job).await?;
    hydra::parse(&markup)
}

/// Checks every package in order. Returns whether the latest build of each
/// package succeeded.
pub async fn run<F: Fetch>(query: &Query, fetcher: &F, out: &mut impl Write) -> Result<bool, HydraError> {
    let jobset = match &query.jobset {
        Some(jobset) => jobset.clone(),
        None => {
            let jobset = resolve_jobset(&query.channel);
            debug!("--channel '{}' implies jobset '{jobset}'", query.channel);
            jobset
        }
    };
    let is_channel = is_channel_jobset(&jobset);
    let target = query.jobset.as_deref().unwrap_or(&query.channel);
    if query.arch.is_empty() {
        warn!("empty --arch, expecting an architecture suffix on each package such as 'gimp.x86_64-linux'");
    }

    let mut all_succeeded = true;
    let mut report = JsonReport::default();
    let mut rendered = 0;
    for package in &query.packages {
        if let Err(e) = check_package(package) {
            error!("{e}");
            all_succeeded = false;
            continue;
        }
        let job_id = build_job_id(package, &query.arch, is_channel);
        let job = Job::new(&query.host_url, &jobset, &job_id);
        match query.mode {
            OutputMode::Url => writeln!(out, "{}", job.url)?,
            OutputMode::Json => {
                let builds = fetch_builds(fetcher, &job).await?;
                all_succeeded &= latest_succeeded(&builds);
                report.insert(package, builds);
            }
            OutputMode::Text(options) => {
                let builds = fetch_builds(fetcher, &job).await?;
                all_succeeded &= latest_succeeded(&builds);
                if rendered > 0 {
                    writeln!(out)?;
                }
                render_text(out, &job_id, target, &builds, options)?;
                rendered += 1;
            }
        }
    }
    if let OutputMode::Json = query.mode {
        writeln!(out, "{}", report.to_json()?)?;
    }
    Ok(all_succeeded)
}
