use crate::classify::ColorClassifier;
use crate::config::AppConfig;
use crate::join::StatIndex;
use crate::types::{County, JoinedValue, RegionId};
use anyhow::{Context, Result};
use askama::Template;
use geo::{LineString, MultiPolygon};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const SVG_FILE: &str = "choropleth.svg";
pub const HTML_FILE: &str = "index.html";

const PAGE_TITLE: &str = "United States Educational Attainment";

#[derive(Template)]
#[template(path = "map.svg", escape = "html")]
struct MapTemplate<'a> {
    width: u32,
    height: u32,
    counties: Vec<CountyView<'a>>,
    legend: String,
}

struct CountyView<'a> {
    fips: RegionId,
    education: f64,
    name: &'a str,
    matched: bool,
    fill: &'a str,
    d: String,
    tooltip: String,
}

#[derive(Template)]
#[template(path = "legend.svg", escape = "html")]
struct LegendTemplate<'a> {
    x: f64,
    y: f64,
    width: u32,
    height: u32,
    title: &'a str,
    swatches: Vec<Swatch<'a>>,
    ticks: Vec<Tick>,
}

struct Swatch<'a> {
    x: f64,
    width: f64,
    fill: &'a str,
}

struct Tick {
    x: f64,
    label: f64,
}

#[derive(Template)]
#[template(path = "index.html")]
struct PageTemplate<'a> {
    title: &'a str,
    svg: &'a str,
}

/// Renders the map and writes `choropleth.svg` and `index.html` to the output directory.
pub fn write_outputs(
    config: &AppConfig,
    classifier: &ColorClassifier,
    counties: &[County],
    stats: &StatIndex,
) -> Result<(PathBuf, PathBuf)> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let svg = render_svg(config, classifier, counties, stats)?;
    let svg_path = dir.join(SVG_FILE);
    fs::write(&svg_path, &svg).with_context(|| format!("Failed to write {:?}", svg_path))?;

    let html_path = dir.join(HTML_FILE);
    fs::write(&html_path, render_html(&svg)?)
        .with_context(|| format!("Failed to write {:?}", html_path))?;

    info!("Wrote {:?} and {:?}", svg_path, html_path);
    Ok((svg_path, html_path))
}

pub fn render_svg(
    config: &AppConfig,
    classifier: &ColorClassifier,
    counties: &[County],
    stats: &StatIndex,
) -> Result<String> {
    info!("Rendering {} counties...", counties.len());

    let counties: Vec<CountyView<'_>> = counties
        .par_iter()
        .map(|county| county_view(county, stats.join(county.id), classifier))
        .collect();

    let template = MapTemplate {
        width: config.map.width,
        height: config.map.height,
        counties,
        legend: render_legend(config, classifier, stats)?,
    };
    template.render().context("Failed to render map template")
}

fn county_view<'a>(
    county: &County,
    joined: JoinedValue<'a>,
    classifier: &'a ColorClassifier,
) -> CountyView<'a> {
    CountyView {
        fips: county.id,
        education: joined.value,
        name: joined.name,
        matched: joined.matched,
        fill: classifier.color_for(joined.value),
        d: path_data(&county.geometry),
        tooltip: tooltip_text(&joined),
    }
}

/// Tooltip body: the county name, then its education level (or N/A).
pub fn tooltip_text(joined: &JoinedValue<'_>) -> String {
    if joined.matched {
        format!("{}\nEducation Level: {}%", joined.name, joined.value)
    } else {
        format!("{}\nEducation Level: N/A", joined.name)
    }
}

/// SVG path data with coordinates taken as screen positions.
pub fn path_data(geometry: &MultiPolygon<f64>) -> String {
    let mut d = String::new();
    for polygon in geometry {
        append_ring(&mut d, polygon.exterior());
        for interior in polygon.interiors() {
            append_ring(&mut d, interior);
        }
    }
    d
}

fn append_ring(d: &mut String, ring: &LineString<f64>) {
    for (i, c) in ring.coords().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{}{},{}", command, round3(c.x), round3(c.y)));
    }
    if !ring.0.is_empty() {
        d.push('Z');
    }
}

fn round3(v: f64) -> f64 {
    let r = (v * 1000.0).round() / 1000.0;
    // Avoid printing "-0".
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Legend: one swatch per bucket over a linear scale from 0 to the data maximum.
pub fn render_legend(
    config: &AppConfig,
    classifier: &ColorClassifier,
    stats: &StatIndex,
) -> Result<String> {
    let legend = &config.legend;
    let domain_min = 0.0;
    let domain_max = stats
        .max_value()
        .filter(|max| *max > domain_min)
        .unwrap_or_else(|| classifier.thresholds().last().copied().unwrap_or(100.0));
    let scale = LinearScale::new((domain_min, domain_max), (0.0, legend.scale_width));

    let swatches = (0..classifier.bucket_count())
        .map(|bucket| {
            let (lo, hi) = classifier.extent_of(bucket, domain_min, domain_max);
            let x = scale.apply(lo);
            Swatch {
                x: round3(x),
                width: round3((scale.apply(hi) - x).max(0.0)),
                fill: classifier.color(bucket),
            }
        })
        .collect();

    let ticks = legend
        .tick_values
        .iter()
        .map(|&tick| Tick {
            x: round3(scale.apply(tick)),
            label: tick,
        })
        .collect();

    let template = LegendTemplate {
        x: legend.x,
        y: legend.y,
        width: legend.width,
        height: legend.height,
        title: &legend.title,
        swatches,
        ticks,
    };
    template.render().context("Failed to render legend template")
}

/// Page embedding the map with a hover tooltip driven by the path data attributes.
pub fn render_html(svg: &str) -> Result<String> {
    PageTemplate {
        title: PAGE_TITLE,
        svg,
    }
    .render()
    .context("Failed to render page template")
}

struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        LinearScale { domain, range }
    }

    fn apply(&self, v: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 {
            return self.range.0;
        }
        self.range.0 + (v - self.domain.0) / span * (self.range.1 - self.range.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatRecord;
    use geo::{polygon, Polygon};

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        let p: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y),
        ];
        MultiPolygon::new(vec![p])
    }

    fn fixture() -> (AppConfig, ColorClassifier, Vec<County>, StatIndex) {
        let config = AppConfig::default();
        let classifier = config.classifier().unwrap();
        let counties = vec![
            County { id: 1001, geometry: square(0.0, 0.0) },
            County { id: 9999, geometry: square(5.0, 5.0) },
        ];
        let stats = StatIndex::new(vec![StatRecord {
            fips: 1001,
            state: "AL".to_string(),
            area_name: "Autauga & Co".to_string(),
            bachelors_or_higher: 21.9,
        }]);
        (config, classifier, counties, stats)
    }

    #[test]
    fn path_data_draws_closed_rings() {
        assert_eq!(
            path_data(&square(0.5, 1.0)),
            "M0.5,1L1.5,1L1.5,2L0.5,1Z"
        );
    }

    #[test]
    fn coordinates_round_to_three_decimals() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0001), 0.0);
    }

    #[test]
    fn svg_has_one_path_per_county() {
        let (config, classifier, counties, stats) = fixture();
        let svg = render_svg(&config, &classifier, &counties, &stats).unwrap();

        assert_eq!(svg.matches("class=\"county\"").count(), 2);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="960" height="600""#));
        assert!(svg.contains(r##"data-fips="1001" data-education="21.9" data-name="Autauga &amp; Co" data-matched="true" fill="#c6dbef""##));
        assert!(svg.contains("Education Level: 21.9%"));
    }

    #[test]
    fn unmatched_county_uses_defaults() {
        let (config, classifier, counties, stats) = fixture();
        let svg = render_svg(&config, &classifier, &counties, &stats).unwrap();

        assert!(svg.contains(r##"data-fips="9999" data-education="0" data-name="Unknown" data-matched="false" fill="#f7fbff""##));
        assert!(svg.contains("Unknown\nEducation Level: N/A"));
    }

    #[test]
    fn legend_has_one_swatch_per_bucket() {
        let (config, classifier, _, stats) = fixture();
        let legend = render_legend(&config, &classifier, &stats).unwrap();

        assert_eq!(legend.matches("<rect").count(), 9);
        assert_eq!(legend.matches("class=\"tick\"").count(), 8);
        assert!(legend.contains("Education Level (%)"));
        assert!(legend.contains(">80%<"));
        // Buckets beyond the data maximum collapse to zero width.
        assert!(legend.contains(r##"width="0" height="8" fill="#08306b""##));
    }

    #[test]
    fn legend_is_sized_by_its_own_viewport() {
        let (mut config, classifier, _, stats) = fixture();
        config.legend.width = 320;
        config.legend.height = 48;
        let legend = render_legend(&config, &classifier, &stats).unwrap();

        assert!(legend.starts_with(r#"<svg id="legend" x="600" y="20" width="320" height="48""#));
        assert!(legend.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn matched_county_named_unknown_keeps_its_value() {
        let (config, classifier, _, _) = fixture();
        let counties = vec![County { id: 7, geometry: square(0.0, 0.0) }];
        let stats = StatIndex::new(vec![StatRecord {
            fips: 7,
            state: "ZZ".to_string(),
            area_name: "Unknown".to_string(),
            bachelors_or_higher: 33.0,
        }]);
        let svg = render_svg(&config, &classifier, &counties, &stats).unwrap();

        assert!(svg.contains(r##"data-fips="7" data-education="33" data-name="Unknown" data-matched="true" fill="#9ecae1""##));
        assert!(svg.contains("Unknown\nEducation Level: 33%"));

        // The page script decides N/A from the matched flag, not the name.
        let html = render_html(&svg).unwrap();
        assert!(html.contains(r#"path.dataset.matched === "true""#));
        assert!(!html.contains(r#"!== "Unknown""#));
    }

    #[test]
    fn legend_scale_spans_zero_to_max() {
        let (config, classifier, _, stats) = fixture();
        let legend = render_legend(&config, &classifier, &stats).unwrap();
        // First bucket runs from 0 to 10 on a 0..21.9 scale mapped to 200px.
        let width = round3(10.0 / 21.9 * 200.0);
        assert!(legend.contains(&format!(r##"<rect x="0" y="15" width="{}" height="8" fill="#f7fbff"/>"##, width)));
    }

    #[test]
    fn html_wraps_svg_with_tooltip() {
        let html = render_html("<svg></svg>").unwrap();
        assert!(html.contains("<div id=\"choropleth-container\">\n<svg></svg></div>"));
        assert!(html.contains("<div id=\"tooltip\"></div>"));
        assert!(html.contains("<title>United States Educational Attainment</title>"));
    }

    #[test]
    fn write_outputs_creates_files() {
        let (mut config, classifier, counties, stats) = fixture();
        let dir = tempfile::tempdir().unwrap();
        config.output.dir = dir.path().join("out");

        let (svg, html) = write_outputs(&config, &classifier, &counties, &stats).unwrap();
        assert!(fs::read_to_string(svg).unwrap().contains("data-fips=\"1001\""));
        assert!(fs::read_to_string(html).unwrap().contains("id=\"tooltip\""));
    }
}
