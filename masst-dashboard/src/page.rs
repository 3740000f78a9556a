//! Dashboard page and HTML fragments

use crate::deep_link::example_link;
use crate::dispatch::{ClientExit, DispatchReport};
use crate::params::{
    Bounds, CHARGE_BOUNDS, COSINE_THRESHOLD_BOUNDS, DEFAULT_ANALOG_ABOVE, DEFAULT_ANALOG_BELOW,
    DEFAULT_COSINE_THRESHOLD, DEFAULT_FRAGMENT_TOLERANCE, DEFAULT_MIN_MATCHED_PEAKS,
    DEFAULT_PRECURSOR_TOLERANCE, DELTA_MASS_BOUNDS, FRAGMENT_TOLERANCE_BOUNDS,
    MIN_MATCHED_PEAKS_BOUNDS, PRECURSOR_MZ_BOUNDS, PRECURSOR_TOLERANCE_BOUNDS,
};

pub const DASHBOARD_VERSION: &str = "2025.09.29";

/// Example molecules linked from the side card: (label, GNPS library id)
pub const EXAMPLES: &[(&str, &str)] = &[
    ("Phe-CA", "CCMSLIB00011432553"),
    ("Trp-CA", "CCMSLIB00011432558"),
    ("Arg-C18:1", "CCMSLIB00011436056"),
];

pub const CONTRIBUTORS: &[&str] = &[
    "Mingxun Wang PhD - UC Riverside",
    "Shipei Xing PhD - UC San Diego",
    "Vincent Charron-Lamoureux PhD - UC San Diego",
];

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn number_input(id: &str, placeholder: &str, value: impl std::fmt::Display, bounds: Bounds) -> String {
    format!(
        r#"<input class="form-control" id="{id}" name="{id}" type="number" placeholder="{placeholder}" value="{value}" min="{min}" max="{max}" step="{step}">"#,
        min = bounds.min,
        max = bounds.max,
        step = bounds.step,
    )
}

/// The full dashboard page
pub fn render_dashboard() -> String {
    let examples: String = EXAMPLES
        .iter()
        .map(|(label, id)| {
            format!(
                r#"<a href="{}">{}</a><br>"#,
                escape_html(&example_link(id)),
                escape_html(label)
            )
        })
        .collect();

    let contributors: String = CONTRIBUTORS
        .iter()
        .map(|name| format!("{}<br>", escape_html(name)))
        .collect();

    let precursor_mz = format!(
        r#"<input class="form-control" id="precursor_mz" name="precursor_mz" placeholder="precursor m/z" min="{}" max="{}">"#,
        PRECURSOR_MZ_BOUNDS.min, PRECURSOR_MZ_BOUNDS.max
    );
    let charge = format!(
        r#"<input class="form-control" id="charge" name="charge" type="number" placeholder="charge" min="{}" max="{}">"#,
        CHARGE_BOUNDS.min, CHARGE_BOUNDS.max
    );

    DASHBOARD_HTML
        .replace("{{VERSION}}", DASHBOARD_VERSION)
        .replace("{{PRECURSOR_MZ_INPUT}}", &precursor_mz)
        .replace("{{CHARGE_INPUT}}", &charge)
        .replace(
            "{{PM_TOLERANCE_INPUT}}",
            &number_input("pm_tolerance", "pm tolerance", DEFAULT_PRECURSOR_TOLERANCE, PRECURSOR_TOLERANCE_BOUNDS),
        )
        .replace(
            "{{FRAGMENT_TOLERANCE_INPUT}}",
            &number_input("fragment_tolerance", "fragment_tolerance", DEFAULT_FRAGMENT_TOLERANCE, FRAGMENT_TOLERANCE_BOUNDS),
        )
        .replace(
            "{{COSINE_INPUT}}",
            &number_input("cosine_threshold", "cosine_threshold", DEFAULT_COSINE_THRESHOLD, COSINE_THRESHOLD_BOUNDS),
        )
        .replace(
            "{{MIN_MATCHED_INPUT}}",
            &number_input("min_matched_peaks", "min_matched_peaks", DEFAULT_MIN_MATCHED_PEAKS, MIN_MATCHED_PEAKS_BOUNDS),
        )
        .replace(
            "{{DELTA_BELOW_INPUT}}",
            &number_input("delta_mass_below", "delta_mass_below", DEFAULT_ANALOG_BELOW, DELTA_MASS_BOUNDS),
        )
        .replace(
            "{{DELTA_ABOVE_INPUT}}",
            &number_input("delta_mass_above", "delta_mass_above", DEFAULT_ANALOG_ABOVE, DELTA_MASS_BOUNDS),
        )
        .replace("{{EXAMPLES}}", &examples)
        .replace("{{CONTRIBUTORS}}", &contributors)
}

/// Inline viewer and download link for a finished search
pub fn render_dispatch_report(report: &DispatchReport) -> String {
    let url = escape_html(&report.results_url());
    let mut html = format!(
        r#"<iframe src="{url}" width="100%" height="900px"></iframe><br><a href="{url}" download="{task}.html" target="_blank">Download Results</a>"#,
        task = escape_html(report.task.id.as_str()),
    );
    match &report.exit {
        ClientExit::TimedOut { after_secs } => {
            html.push_str(&format!(
                r#"<p class="text-muted">Search stopped after {after_secs} seconds.</p>"#
            ));
        }
        ClientExit::SpawnFailed { .. } => {
            html.push_str(r#"<p class="text-muted">The search client could not be started.</p>"#);
        }
        ClientExit::Exited { .. } => {}
    }
    html
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>microbiomeMASST</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css">
</head>
<body>
    <nav class="navbar navbar-light bg-light sticky-top px-3">
        <a class="navbar-brand" href="https://www.cs.ucr.edu/~mingxunw/">
            <img src="https://gnps2.org/static/img/logo.png" width="120px">
        </a>
        <a class="nav-link" href="/microbiomemasst">microbiomeMASST Dashboard - Version {{VERSION}}</a>
    </nav>
    <div class="container-fluid">
        <div class="row" style="margin-top: 30px">
            <div class="col-9">
                <div class="card">
                    <div class="card-header"><h5>Data Selection</h5></div>
                    <div class="card-body">
                        <h5>GNPS Data Selection - Enter USI or Spectrum Peaks</h5>
                        <br><br>
                        <form id="search_form" onsubmit="return false;">
                            <div class="input-group mb-3">
                                <span class="input-group-text">Spectrum USI</span>
                                <input class="form-control" id="usi1" name="usi1" placeholder="Enter GNPS USI" value="">
                            </div>
                            <hr>
                            <div class="input-group mb-3">
                                <span class="input-group-text">Spectrum Peaks</span>
                                <textarea class="form-control" id="peaks" name="peaks" rows="10"
                                    placeholder="Enter one peak per line as follows:&#10;&#10;m/z1&#9;intensity1&#10;m/z2&#9;intensity2&#10;m/z3&#9;intensity3&#10;..."></textarea>
                            </div>
                            <div class="input-group mb-3">
                                <span class="input-group-text">Precursor m/z</span>
                                {{PRECURSOR_MZ_INPUT}}
                                <span class="input-group-text">Charge</span>
                                {{CHARGE_INPUT}}
                            </div>
                            <hr>
                            <div class="input-group mb-3">
                                <span class="input-group-text">PM Tolerance (Da)</span>
                                {{PM_TOLERANCE_INPUT}}
                                <span class="input-group-text">Fragment Tolerance (Da)</span>
                                {{FRAGMENT_TOLERANCE_INPUT}}
                                <span class="input-group-text">Cosine Threshold</span>
                                {{COSINE_INPUT}}
                                <span class="input-group-text">Minimum Matched Peaks</span>
                                {{MIN_MATCHED_INPUT}}
                            </div>
                            <div class="input-group mb-3">
                                <span class="input-group-text">Analog Search</span>
                                <select class="form-select" id="analog_select" name="analog_select">
                                    <option value="Yes">Yes</option>
                                    <option value="No" selected>No</option>
                                </select>
                                <span class="input-group-text">Delta Mass Below (Da)</span>
                                {{DELTA_BELOW_INPUT}}
                                <span class="input-group-text">Delta Mass Above (Da)</span>
                                {{DELTA_ABOVE_INPUT}}
                            </div>
                        </form>
                        <div class="row">
                            <div class="col d-grid gap-2">
                                <button class="btn btn-warning" id="search_button_usi" onclick="runSearch('search_by_identifier')">Search microbiomeMASST by USI</button>
                            </div>
                            <div class="col d-grid gap-2">
                                <button class="btn btn-warning" id="search_button_peaks" onclick="runSearch('search_by_peaks')">Search microbiomeMASST by Spectrum Peaks</button>
                            </div>
                            <div class="col d-grid gap-2">
                                <button class="btn btn-warning" id="copy_link_button" onclick="copyLink()">Copy Link</button>
                            </div>
                            <div class="col d-grid gap-2">
                                <a class="btn btn-warning" id="link_to_masst" href="" target="_blank">Open External MASST Search Results</a>
                            </div>
                        </div>
                    </div>
                </div>
            </div>
            <div class="col-3">
                <div class="card">
                    <div class="card-header"><h5>Contributors</h5></div>
                    <div class="card-body">{{CONTRIBUTORS}}</div>
                </div>
                <br>
                <div class="card">
                    <div class="card-header"><h5>Examples</h5></div>
                    <div class="card-body">{{EXAMPLES}}</div>
                </div>
            </div>
        </div>
        <br>
        <div class="row">
            <div class="card">
                <div class="card-header"><h5>Data Exploration</h5></div>
                <div class="card-body">
                    <div id="output"></div>
                    <br><hr><br>
                    <div class="input-group mb-3">
                        <span class="input-group-text">Match Accession</span>
                        <input class="form-control" id="match_accession" placeholder="Accession">
                        <span class="input-group-text">DB Scan</span>
                        <input class="form-control" id="match_scan" placeholder="DB Scan">
                        <button class="btn btn-outline-secondary" onclick="selectMatch()">Show Mirror Plot</button>
                    </div>
                    <div id="spectrummirror"></div>
                </div>
            </div>
        </div>
    </div>
    <script>
        let queryLink = '';

        async function loadFromHash() {
            const response = await fetch('/microbiomemasst/state?hash=' + encodeURIComponent(window.location.hash));
            const state = await response.json();
            document.getElementById('usi1').value = state.usi1;
            document.getElementById('peaks').value = state.peaks;
            document.getElementById('precursor_mz').value = state.precursor_mz;
            await refreshLinks();
            await showMirror(null);
        }

        async function refreshLinks() {
            const params = new URLSearchParams({
                usi1: document.getElementById('usi1').value,
                peaks: document.getElementById('peaks').value,
                precursor_mz: document.getElementById('precursor_mz').value,
            });
            const response = await fetch('/microbiomemasst/links?' + params.toString());
            const links = await response.json();
            queryLink = links.query_link;
            document.getElementById('link_to_masst').href = links.masst_link;
        }

        async function runSearch(event) {
            const output = document.getElementById('output');
            output.innerHTML = '<div class="spinner-border" role="status"></div>';
            const body = new URLSearchParams(new FormData(document.getElementById('search_form')));
            const response = await fetch('/microbiomemasst/search/' + event, { method: 'POST', body: body });
            output.innerHTML = await response.text();
        }

        async function showMirror(row) {
            const response = await fetch('/microbiomemasst/mirror', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ usi1: document.getElementById('usi1').value, row: row }),
            });
            document.getElementById('spectrummirror').innerHTML = await response.text();
        }

        function selectMatch() {
            const accession = document.getElementById('match_accession').value.trim();
            const scan = document.getElementById('match_scan').value.trim();
            showMirror(accession && scan ? { 'Accession': accession, 'DB Scan': scan } : null);
        }

        function copyLink() {
            const button = document.getElementById('copy_link_button');
            navigator.clipboard.writeText(queryLink).then(() => {
                button.textContent = 'Copied!';
                setTimeout(() => { button.textContent = 'Copy Link'; }, 1000);
            });
        }

        // Result reports may post the selected table row to the page
        window.addEventListener('message', (e) => {
            if (e.data && e.data['Accession'] !== undefined && e.data['DB Scan'] !== undefined) {
                showMirror({ 'Accession': String(e.data['Accession']), 'DB Scan': String(e.data['DB Scan']) });
            }
        });

        for (const id of ['usi1', 'peaks', 'precursor_mz']) {
            document.getElementById(id).addEventListener('input', refreshLinks);
        }
        window.addEventListener('hashchange', loadFromHash);
        loadFromHash();
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Task, TaskId};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_dashboard_has_no_unfilled_placeholders() {
        let html = render_dashboard();
        assert!(!html.contains("{{"));
        assert!(html.contains("Version 2025.09.29"));
    }

    #[test]
    fn test_dashboard_widget_bounds_and_defaults() {
        let html = render_dashboard();
        assert!(html.contains(
            r#"id="pm_tolerance" name="pm_tolerance" type="number" placeholder="pm tolerance" value="0.05" min="0.01" max="0.5" step="0.02""#
        ));
        assert!(html.contains(r#"value="0.7" min="0.5" max="1" step="0.05""#));
        assert!(html.contains(r#"value="4" min="1" max="100" step="1""#));
        assert!(html.contains(r#"value="130" min="0" max="300" step="1""#));
    }

    #[test]
    fn test_dashboard_lists_examples() {
        let html = render_dashboard();
        for (label, id) in EXAMPLES {
            assert!(html.contains(label));
            assert!(html.contains(id));
        }
    }

    #[test]
    fn test_dispatch_report_fragment() {
        let report = DispatchReport {
            task: Task {
                id: TaskId::from("abc"),
                output_dir: PathBuf::from("/tmp/abc"),
                analog: true,
            },
            exit: ClientExit::Exited {
                code: Some(0),
                success: true,
            },
            elapsed: Duration::from_secs(3),
        };
        let html = render_dispatch_report(&report);
        assert!(html.contains(r#"<iframe src="/microbiomemasst/results?task=abc&amp;analog=True""#));
        assert!(html.contains("Download Results"));
        assert!(!html.contains("text-muted"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
