//! Planetary coordinate reference systems from the VESPA CRS registry.
//!
//! The registry publishes one HTML page per solar body, each holding a
//! table of WKT2 definitions. [`WktDownloader`] collects every table into
//! a single CSV file; [`read_projections`] and [`filter_projections`]
//! query that file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use regex::{Regex, RegexBuilder};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use stac_common::parse_timestamp;
use tracing::{debug, error, info, warn};

pub const BASE_URL: &str = "https://voparis-vespa-crs.obspm.fr/web";

/// Bodies with a registry page, in download order.
pub const SOLAR_BODIES: [&str; 8] = [
    "mercury", "venus", "earth", "mars", "jupiter", "saturn", "uranus", "neptune",
];

const CREATED_AT: &str = "created_at";

/// Pause between two registry pages.
const PAUSE: Duration = Duration::from_secs(2);

/// Rows of one or more registry tables, aligned on header names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WktTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WktTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append `other`, adding its unknown columns at the end. Cells of
    /// missing columns stay empty.
    pub fn append(&mut self, other: WktTable) {
        for header in &other.headers {
            if !self.headers.contains(header) {
                self.headers.push(header.clone());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let positions: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect();

        for row in other.rows {
            let mut aligned = vec![String::new(); self.headers.len()];
            for (header, cell) in other.headers.iter().zip(row) {
                if let Some(&i) = positions.get(header.as_str()) {
                    aligned[i] = cell;
                }
            }
            self.rows.push(aligned);
        }
    }

    /// Rewrite the `created_at` column as RFC 3339 UTC timestamps.
    /// Cells that do not parse are kept as they are.
    pub fn normalize_created_at(&mut self) {
        let Some(column) = self.headers.iter().position(|h| h == CREATED_AT) else {
            return;
        };
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                match parse_timestamp(cell) {
                    Ok(dt) => *cell = dt.to_rfc3339_opts(SecondsFormat::Secs, true),
                    Err(e) => debug!(value = %cell, error = %e, "Keeping unparsed created_at"),
                }
            }
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse the first `<table>` of an HTML page. Header names come from the
/// `th` cells of the first row that has any.
pub fn parse_first_table(html: &str) -> Option<WktTable> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let th_sel = Selector::parse("th").ok()?;
    let td_sel = Selector::parse("td").ok()?;

    let table = document.select(&table_sel).next()?;
    let mut result = WktTable::default();

    for row in table.select(&row_sel) {
        if result.headers.is_empty() {
            let headers: Vec<String> = row.select(&th_sel).map(cell_text).collect();
            if !headers.is_empty() {
                result.headers = headers;
                continue;
            }
        }
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if !cells.is_empty() {
            result.rows.push(cells);
        }
    }

    if result.headers.is_empty() {
        let width = result.rows.iter().map(Vec::len).max().unwrap_or(0);
        result.headers = (0..width).map(|i| format!("column_{}", i)).collect();
    }
    Some(result)
}

/// Downloads every registry page into one CSV file.
pub struct WktDownloader {
    client: Client,
    base_url: String,
    pause: Duration,
}

impl WktDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            pause: PAUSE,
        })
    }

    pub fn page_url(&self, body: &str) -> String {
        format!("{}/{}.html", self.base_url, body)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let text = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    /// Fetch every body, skipping pages without a table, and write the
    /// combined table to `output`.
    pub async fn download(&self, output: &Path) -> Result<WktTable> {
        let mut combined = WktTable::default();

        for (i, body) in SOLAR_BODIES.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pause).await;
            }
            let url = self.page_url(body);
            let html = self.fetch_page(&url).await?;
            match parse_first_table(&html) {
                Some(mut table) => {
                    table.normalize_created_at();
                    info!(body = %body, rows = table.rows.len(), "Fetched WKT definitions");
                    combined.append(table);
                }
                None => error!(body = %body, url = %url, "Couldn't download WKT2 info"),
            }
        }

        if combined.is_empty() {
            warn!("No WKT definitions found");
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        combined.write_csv(output)?;
        info!(path = %output.display(), rows = combined.rows.len(), "Wrote WKT summary");
        Ok(combined)
    }
}

/// One row of the WKT summary file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Projection {
    pub id: String,
    pub solar_body: String,
    pub projection_name: String,
    pub wkt: String,
}

pub fn read_projections(path: &Path) -> Result<Vec<Projection>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut projections = Vec::new();
    for row in reader.deserialize() {
        projections.push(row.with_context(|| format!("Malformed row in {}", path.display()))?);
    }
    Ok(projections)
}

/// Keep projections whose body contains `solar_body` and whose name
/// matches every keyword, all case-insensitive.
pub fn filter_projections<'a>(
    projections: &'a [Projection],
    solar_body: Option<&str>,
    keywords: &[String],
) -> Result<Vec<&'a Projection>> {
    let body = solar_body.map(str::to_lowercase);
    let patterns: Vec<Regex> = keywords
        .iter()
        .map(|kw| {
            RegexBuilder::new(kw)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid keyword pattern '{}'", kw))
        })
        .collect::<Result<_>>()?;

    Ok(projections
        .iter()
        .filter(|p| {
            body.as_deref()
                .map_or(true, |b| p.solar_body.to_lowercase().contains(b))
        })
        .filter(|p| patterns.iter().all(|re| re.is_match(&p.projection_name)))
        .collect())
}

fn starts_keyword(rest: &str) -> bool {
    let name_len = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();
    name_len > 0
        && rest.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && matches!(rest[name_len..].chars().next(), Some('[') | Some('('))
}

/// Indent a single-line WKT: every nested keyword starts a new line,
/// indented four spaces per nesting level.
pub fn pretty_wkt(wkt: &str) -> String {
    let mut out = String::with_capacity(wkt.len() * 2);
    let mut depth = 0usize;
    let mut in_quote = false;
    let source = wkt.trim();
    let mut chars = source.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                in_quote = !in_quote;
                out.push(c);
            }
            '[' | '(' if !in_quote => {
                depth += 1;
                out.push(c);
            }
            ']' | ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                out.push(c);
            }
            ',' if !in_quote => {
                out.push(',');
                let rest = source[i + 1..].trim_start();
                if starts_keyword(rest) {
                    while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
                        chars.next();
                    }
                    out.push('\n');
                    out.push_str(&"    ".repeat(depth));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Text block printed for one projection.
pub fn render_projection(projection: &Projection) -> String {
    format!(
        "== {} ==\n{} - {}\n{}\n",
        projection.id,
        projection.solar_body,
        projection.projection_name,
        pretty_wkt(&projection.wkt)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = r#"
        <html><body>
        <h1>Mars</h1>
        <table>
          <thead><tr><th>id</th><th>solar_body</th><th>created_at</th>
            <th>projection_name</th><th>wkt</th></tr></thead>
          <tbody>
            <tr><td>IAU:2015:49900</td><td>Mars</td><td>2023-03-01 10:20:30</td>
              <td>Ocentric</td><td>GEOGCRS["Mars (2015)"]</td></tr>
            <tr><td>IAU:2015:49910</td><td>Mars</td><td>2023-03-02</td>
              <td>Equirectangular, clon = 0</td><td>PROJCRS["Mars (2015) / Equirectangular"]</td></tr>
          </tbody>
        </table>
        <table><tr><th>ignored</th></tr></table>
        </body></html>
    "#;

    fn projection(id: &str, body: &str, name: &str) -> Projection {
        Projection {
            id: id.to_string(),
            solar_body: body.to_string(),
            projection_name: name.to_string(),
            wkt: "GEOGCRS[\"x\"]".to_string(),
        }
    }

    #[test]
    fn test_parse_first_table() {
        let table = parse_first_table(PAGE).unwrap();
        assert_eq!(
            table.headers,
            vec!["id", "solar_body", "created_at", "projection_name", "wkt"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][3], "Equirectangular, clon = 0");
    }

    #[test]
    fn test_page_without_table() {
        assert!(parse_first_table("<html><body><p>maintenance</p></body></html>").is_none());
    }

    #[test]
    fn test_created_at_normalized() {
        let mut table = parse_first_table(PAGE).unwrap();
        table.normalize_created_at();
        assert_eq!(table.rows[0][2], "2023-03-01T10:20:30Z");
        assert_eq!(table.rows[1][2], "2023-03-02T00:00:00Z");
    }

    #[test]
    fn test_append_aligns_columns() {
        let mut a = WktTable {
            headers: vec!["id".into(), "wkt".into()],
            rows: vec![vec!["1".into(), "A".into()]],
        };
        let b = WktTable {
            headers: vec!["wkt".into(), "id".into(), "note".into()],
            rows: vec![vec!["B".into(), "2".into(), "n".into()]],
        };
        a.append(b);
        assert_eq!(a.headers, vec!["id", "wkt", "note"]);
        assert_eq!(a.rows[0], vec!["1", "A", ""]);
        assert_eq!(a.rows[1], vec!["2", "B", "n"]);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wkt.csv");
        let mut table = parse_first_table(PAGE).unwrap();
        table.normalize_created_at();
        table.write_csv(&path).unwrap();

        let projections = read_projections(&path).unwrap();
        assert_eq!(projections.len(), 2);
        assert_eq!(projections[1].projection_name, "Equirectangular, clon = 0");
        assert_eq!(projections[0].wkt, "GEOGCRS[\"Mars (2015)\"]");
    }

    #[test]
    fn test_filter_projections() {
        let all = vec![
            projection("1", "Mars", "Ocentric"),
            projection("2", "Mars", "Equirectangular, clon = 0"),
            projection("3", "Mars", "Polar Stereographic north"),
            projection("4", "Mercury", "Equirectangular, clon = 180"),
        ];

        let mars = filter_projections(&all, Some("MAR"), &[]).unwrap();
        assert_eq!(mars.len(), 3);

        let keywords = vec!["equi".to_string(), "clon = 0".to_string()];
        let hits = filter_projections(&all, None, &keywords).unwrap();
        assert_eq!(hits.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["2"]);

        assert!(filter_projections(&all, None, &["(".to_string()]).is_err());
    }

    #[test]
    fn test_pretty_wkt() {
        let wkt = r#"GEOGCRS["Mars (2015)",DATUM["Mars",ELLIPSOID["Mars",3396190,169.894447223612,LENGTHUNIT["metre",1]]],ID["IAU",49900,2015]]"#;
        let expected = [
            r#"GEOGCRS["Mars (2015)","#,
            r#"    DATUM["Mars","#,
            r#"        ELLIPSOID["Mars",3396190,169.894447223612,"#,
            r#"            LENGTHUNIT["metre",1]]],"#,
            r#"    ID["IAU",49900,2015]]"#,
        ]
        .join("\n");
        assert_eq!(pretty_wkt(wkt), expected);
    }

    #[test]
    fn test_pretty_wkt_ignores_quoted_commas() {
        let wkt = r#"PROJCRS["Mars, Equirectangular",ID["IAU",49910]]"#;
        assert_eq!(
            pretty_wkt(wkt),
            "PROJCRS[\"Mars, Equirectangular\",\n    ID[\"IAU\",49910]]"
        );
    }

    #[test]
    fn test_page_url() {
        let downloader = WktDownloader::new().unwrap();
        assert_eq!(
            downloader.page_url("mars"),
            "https://voparis-vespa-crs.obspm.fr/web/mars.html"
        );
    }
}
