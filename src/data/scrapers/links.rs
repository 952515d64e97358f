//! Replay link harvesting and links files

use crate::Result;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::path::Path;

/// Pulls replay links out of a saved "Duel Records" page
pub struct ReplayLinkExtractor {
    base_url: String,
}

impl Default for ReplayLinkExtractor {
    fn default() -> Self {
        Self::new(&crate::ScrapeConfig::default().base_url)
    }
}

impl ReplayLinkExtractor {
    pub fn new(base_url: &str) -> Self {
        ReplayLinkExtractor {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Parse a saved HTML file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>> {
        let html = std::fs::read_to_string(path.as_ref())?;
        Ok(self.parse_page(&html))
    }

    /// Sorted, de-duplicated replay URLs found in the page
    pub fn parse_page(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        let scoped = Selector::parse("#duel_records .content a[href]").ok();
        let anywhere = Selector::parse("a[href]").ok();

        let mut links = BTreeSet::new();
        let mut collect = |selector: &Selector| {
            for anchor in document.select(selector) {
                if let Some(href) = anchor.value().attr("href") {
                    if href.contains("replay?id=") {
                        links.insert(self.absolutize(href.trim()));
                    }
                }
            }
        };

        match scoped {
            Some(sel) if document.select(&sel).next().is_some() => collect(&sel),
            _ => {
                log::debug!("No #duel_records container, scanning the whole page");
                if let Some(sel) = anywhere {
                    collect(&sel);
                }
            }
        }

        log::info!("Found {} replay links", links.len());
        links.into_iter().collect()
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}

/// Read replay identifiers from a links file: CSV (first column, with a
/// header row) or plain text (one per line)
pub fn read_links_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let mut links = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(first) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) {
                links.push(first.to_string());
            }
        }
        return Ok(links);
    }

    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Write a one-column `url` CSV
pub fn write_links_csv<P: AsRef<Path>>(links: &[String], path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["url"])?;
    for link in links {
        writer.write_record([link.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="https://www.duelingbook.com/replay?id=1-99">outside</a>
          <div id="duel_records"><div class="content">
            <a href="https://www.duelingbook.com/replay?id=1313181-78115439">Replay</a>
            <a href="/replay?id=1313181-78114879">Replay</a>
            <a href="https://www.duelingbook.com/replay?id=1313181-78115439">Replay</a>
            <a href="https://www.youtube.com/channel/x">Goat replays</a>
          </div></div>
        </body></html>"#;

    #[test]
    fn test_extracts_scoped_links() {
        let links = ReplayLinkExtractor::default().parse_page(PAGE);
        assert_eq!(
            links,
            vec![
                "https://www.duelingbook.com/replay?id=1313181-78114879".to_string(),
                "https://www.duelingbook.com/replay?id=1313181-78115439".to_string(),
            ]
        );
    }

    #[test]
    fn test_falls_back_to_whole_page() {
        let html = r#"<a href="replay?id=5">r</a><a href="/deck?id=3">d</a>"#;
        let links = ReplayLinkExtractor::default().parse_page(html);
        assert_eq!(links, vec!["https://www.duelingbook.com/replay?id=5".to_string()]);
    }

    #[test]
    fn test_links_files() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("links.txt");
        std::fs::write(&txt, "745183-77512517\n\n  77512518  \n").unwrap();
        assert_eq!(
            read_links_file(&txt).unwrap(),
            vec!["745183-77512517".to_string(), "77512518".to_string()]
        );

        let csv_path = dir.path().join("links.csv");
        write_links_csv(
            &["https://www.duelingbook.com/replay?id=1-2".to_string()],
            &csv_path,
        )
        .unwrap();
        assert_eq!(
            read_links_file(&csv_path).unwrap(),
            vec!["https://www.duelingbook.com/replay?id=1-2".to_string()]
        );
    }
}
