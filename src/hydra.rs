//! Classification of Hydra job pages, e.g.
//! <https://hydra.nixos.org/job/nixos/trunk-combined/nixpkgs.hello.x86_64-linux>.
//!
//! A job page either carries a table of recent builds (most recent first), or
//! an alert explaining why the job was never evaluated.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{
    build_status::{Build, BuildStatus},
    error::HydraError,
};

static UNKNOWN_ERROR: &str =
    "Unknown Hydra error, no builds or alert found; check the job URL directly";

fn selector(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

static TBODY: LazyLock<Selector> = LazyLock::new(|| selector("tbody"));
static ALERT: LazyLock<Selector> = LazyLock::new(|| selector("div.alert"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static TIME: LazyLock<Selector> = LazyLock::new(|| selector("time"));
static TT: LazyLock<Selector> = LazyLock::new(|| selector("tt"));

pub fn parse(markup: &str) -> Result<Vec<BuildStatus>, HydraError> {
    let doc = Html::parse_document(markup);
    parse_document(&doc).collect()
}

/// Yields the records of a job page in page order. A page without any build
/// row yields a single record built from its alert.
pub fn parse_document(doc: &Html) -> BuildRecords<'_> {
    let rows: Box<dyn Iterator<Item = ElementRef<'_>> + '_> = match doc.select(&TBODY).next() {
        Some(tbody) => Box::new(child_elements(tbody, "tr")),
        None => Box::new(std::iter::empty()),
    };
    BuildRecords {
        doc,
        rows,
        yielded: false,
        finished: false,
    }
}

pub struct BuildRecords<'a> {
    doc: &'a Html,
    rows: Box<dyn Iterator<Item = ElementRef<'a>> + 'a>,
    yielded: bool,
    finished: bool,
}

impl Iterator for BuildRecords<'_> {
    type Item = Result<BuildStatus, HydraError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for row in self.rows.by_ref() {
            match parse_row(row) {
                Ok(Some(record)) => {
                    self.yielded = true;
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        self.finished = true;
        if self.yielded {
            None
        } else {
            Some(Ok(alert_status(self.doc)))
        }
    }
}

fn child_elements<'a>(parent: ElementRef<'a>, tag: &'static str) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == tag)
}

fn text_of(e: ElementRef<'_>) -> String {
    e.text().collect::<String>().trim().to_string()
}

fn alert_status(doc: &Html) -> BuildStatus {
    let status = match doc.select(&ALERT).next() {
        Some(alert) => {
            let text: String = alert.text().collect();
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
        None => String::from(UNKNOWN_ERROR),
    };
    BuildStatus::not_evaluated(status)
}

fn find<'a>(e: ElementRef<'a>, selector: &Selector, what: &str) -> Result<ElementRef<'a>, HydraError> {
    e.select(selector)
        .next()
        .ok_or_else(|| HydraError::Parse(format!("no {what} in {}", e.html())))
}

fn attr<'a>(e: ElementRef<'a>, name: &str) -> Result<&'a str, HydraError> {
    e.attr(name)
        .ok_or_else(|| HydraError::Parse(format!("no attribute '{name}' in {}", e.html())))
}

// Pagination rows link to the full build listing instead of describing a build.
fn is_pagination_row(cells: &[ElementRef<'_>]) -> bool {
    cells
        .first()
        .and_then(|cell| cell.select(&LINK).next())
        .and_then(|link| link.attr("href"))
        .is_some_and(|href| href.ends_with("/all") || href.contains("full=1"))
}

fn parse_row(row: ElementRef<'_>) -> Result<Option<BuildStatus>, HydraError> {
    let cells: Vec<_> = child_elements(row, "td").collect();
    let [status, build, timestamp, name, arch] = cells.as_slice() else {
        if is_pagination_row(&cells) {
            debug!("skipping pagination row");
            return Ok(None);
        }
        return Err(HydraError::Parse(format!(
            "unexpected build row: {}",
            row.html()
        )));
    };

    let Some(img) = status.select(&IMG).next() else {
        // not evaluated yet, only a text marker
        let marker = match status.select(&SPAN).next() {
            Some(span) => text_of(span),
            None => text_of(*status),
        };
        let record = if marker == "Queued" {
            BuildStatus::queued()
        } else {
            BuildStatus::unknown(&marker)
        };
        return Ok(Some(record));
    };

    let link = find(*build, &LINK, "build link")?;
    let time = find(*timestamp, &TIME, "time")?;
    let build = Build {
        status: attr(img, "title")?.to_string(),
        build_id: text_of(link),
        build_url: attr(link, "href")?.to_string(),
        timestamp: attr(time, "datetime")?.to_string(),
        name: text_of(*name),
        arch: text_of(find(*arch, &TT, "architecture")?),
    };
    Ok(Some(BuildStatus::Evaluated(build)))
}

#[cfg(test)]
pub(crate) fn page(rows: &str) -> String {
    format!(
        "<html><body><div class=\"container\">\
         <table class=\"table table-striped table-condensed clickable-rows\">\
         <thead><tr><th></th><th>#</th><th>Finished at</th><th>Package/release name</th><th>System</th></tr></thead>\
         <tbody>{rows}</tbody></table></div></body></html>"
    )
}

#[cfg(test)]
pub(crate) fn build_row(title: &str, id: u32, datetime: &str) -> String {
    format!(
        "<tr>\
         <td><img src=\"/static/images/emblems/green.png\" alt=\"{title}\" title=\"{title}\" class=\"build-status\"></td>\
         <td><a class=\"row-link\" href=\"https://hydra.nixos.org/build/{id}\">{id}</a></td>\
         <td class=\"nowrap\"><time datetime=\"{datetime}\" title=\"{datetime}\">{datetime}</time></td>\
         <td>\n  hello-2.10\n</td>\
         <td><tt>x86_64-linux</tt></td>\
         </tr>"
    )
}

#[cfg(test)]
mod hydra_tests {
    use super::*;
    use crate::build_status::StatusIcon;

    fn pending_row(marker: &str) -> String {
        format!(
            "<tr><td><span class=\"badge\">{marker}</span></td>\
             <td><a href=\"https://hydra.nixos.org/build/3\">3</a></td>\
             <td></td><td>hello-2.10</td><td><tt>x86_64-linux</tt></td></tr>"
        )
    }

    #[test]
    fn alert_when_not_evaluated() {
        let html = "<html><body><div class=\"alert alert-warning\">\nFoo\nBar\n</div></body></html>";
        let builds = parse(html).unwrap();
        assert_eq!(builds, vec![BuildStatus::not_evaluated(String::from("Foo Bar"))]);
        assert!(!builds[0].evaluates());
        assert_eq!(builds[0].icon(), StatusIcon::Warning);
    }

    #[test]
    fn fallback_without_alert() {
        let builds = parse("<html><body><p>nothing here</p></body></html>").unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].status(), UNKNOWN_ERROR);
        assert!(!builds[0].success());
    }

    #[test]
    fn succeeded_row() {
        let html = page(&build_row("Succeeded", 115049543, "2020-03-21T09:10:40Z"));
        let builds = parse(&html).unwrap();
        let expected = BuildStatus::Evaluated(Build {
            status: String::from("Succeeded"),
            build_id: String::from("115049543"),
            build_url: String::from("https://hydra.nixos.org/build/115049543"),
            timestamp: String::from("2020-03-21T09:10:40Z"),
            name: String::from("hello-2.10"),
            arch: String::from("x86_64-linux"),
        });
        assert_eq!(builds, vec![expected]);
        assert!(builds[0].success());
        assert_eq!(builds[0].icon(), StatusIcon::Succeeded);
    }

    #[test]
    fn rows_keep_page_order() {
        let rows = [
            build_row("Failed", 3, "2020-03-23T00:00:00Z"),
            build_row("Succeeded", 2, "2020-03-22T00:00:00Z"),
            build_row("Timed out", 1, "2020-03-21T00:00:00Z"),
        ]
        .concat();
        let builds = parse(&page(&rows)).unwrap();
        let statuses: Vec<_> = builds.iter().map(|b| b.status()).collect();
        assert_eq!(statuses, vec!["Failed", "Succeeded", "Timed out"]);
        assert_eq!(builds[0].icon(), StatusIcon::Failed);
        assert_eq!(builds[2].icon(), StatusIcon::Failed);
    }

    #[test]
    fn queued_marker() {
        let builds = parse(&page(&pending_row("Queued"))).unwrap();
        assert_eq!(builds, vec![BuildStatus::queued()]);
        assert_eq!(
            builds[0].status(),
            "No build has been attempted for this package yet (still queued)"
        );
        assert!(!builds[0].evaluates());
    }

    #[test]
    fn unknown_marker() {
        let builds = parse(&page(&pending_row("Scheduled"))).unwrap();
        assert_eq!(builds[0].status(), "Unknown Hydra status: Scheduled");
        assert_eq!(builds[0].icon(), StatusIcon::Pending);
    }

    #[test]
    fn pagination_row_is_skipped() {
        let rows = [
            build_row("Succeeded", 2, "2020-03-22T00:00:00Z"),
            String::from(
                "<tr><td colspan=\"5\"><a href=\"https://hydra.nixos.org/job/nixpkgs/trunk/hello.x86_64-linux/all\">More...</a></td></tr>",
            ),
        ]
        .concat();
        let builds = parse(&page(&rows)).unwrap();
        assert_eq!(builds.len(), 1);
    }

    #[test]
    fn empty_table_falls_back_to_alert() {
        let builds = parse(&page("")).unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].status(), UNKNOWN_ERROR);
        assert_eq!(builds[0].icon(), StatusIcon::Warning);

        let html = page("").replace(
            "<div class=\"container\">",
            "<div class=\"container\"><div class=\"alert\">\nThis job is unfree\n</div>",
        );
        assert_eq!(
            parse(&html).unwrap(),
            vec![BuildStatus::not_evaluated(String::from("This job is unfree"))]
        );
    }

    #[test]
    fn only_pagination_rows_fall_back_to_alert() {
        let rows = "<tr><td colspan=\"5\"><a href=\"https://hydra.nixos.org/job/nixpkgs/trunk/hello.x86_64-linux/all\">More...</a></td></tr>";
        let builds = parse(&page(rows)).unwrap();
        assert_eq!(builds, vec![BuildStatus::not_evaluated(String::from(UNKNOWN_ERROR))]);
        assert!(!builds[0].evaluates());
    }

    #[test]
    fn unexpected_row_is_an_error() {
        let rows = "<tr><td>one</td><td>two</td></tr>";
        assert!(matches!(parse(&page(rows)), Err(HydraError::Parse(_))));

        let wrong_link = "<tr><td colspan=\"5\"><a href=\"https://hydra.nixos.org/build/1\">1</a></td></tr>";
        assert!(matches!(parse(&page(wrong_link)), Err(HydraError::Parse(_))));
    }

    #[test]
    fn missing_title_is_an_error() {
        let row = build_row("Succeeded", 1, "2020-03-21T00:00:00Z").replace("title=\"Succeeded\"", "");
        assert!(matches!(parse(&page(&row)), Err(HydraError::Parse(_))));
    }

    #[test]
    fn lazy_rows_stop_at_first_error() {
        let rows = [
            build_row("Succeeded", 2, "2020-03-22T00:00:00Z"),
            String::from("<tr><td>broken</td></tr>"),
        ]
        .concat();
        let doc = Html::parse_document(&page(&rows));
        let mut records = parse_document(&doc);
        assert!(records.next().unwrap().is_ok());
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }
}
