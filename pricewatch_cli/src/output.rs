use pricewatch_lib::detect::ScoredCandidate;
use pricewatch_lib::{ChangeRecord, CycleReport, Tracker, TrackerOutcome};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Markdown,
    Json,
}

#[derive(Tabled, Serialize)]
struct TrackerRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: u32,
    #[tabled(rename = "Owner")]
    #[serde(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Selector")]
    #[serde(rename = "Selector")]
    selector: String,
    #[tabled(rename = "Render")]
    #[serde(rename = "Render")]
    render: String,
    #[tabled(rename = "URL")]
    #[serde(rename = "URL")]
    url: String,
}

#[derive(Tabled, Serialize)]
struct ChangeRow {
    #[tabled(rename = "Tracker")]
    #[serde(rename = "Tracker")]
    tracker: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Old")]
    #[serde(rename = "Old")]
    old: String,
    #[tabled(rename = "New")]
    #[serde(rename = "New")]
    new: String,
    #[tabled(rename = "Checked")]
    #[serde(rename = "Checked")]
    checked: String,
}

#[derive(Tabled, Serialize)]
struct OutcomeRow {
    #[tabled(rename = "Tracker")]
    #[serde(rename = "Tracker")]
    tracker: String,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    #[serde(rename = "State")]
    state: String,
    #[tabled(rename = "Attempts")]
    #[serde(rename = "Attempts")]
    attempts: usize,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Selector")]
    #[serde(rename = "Selector")]
    selector: String,
}

#[derive(Tabled, Serialize)]
struct CandidateRow {
    #[tabled(rename = "Rank")]
    #[serde(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: i32,
    #[tabled(rename = "Price")]
    #[serde(rename = "Price")]
    price: String,
    #[tabled(rename = "Text")]
    #[serde(rename = "Text")]
    text: String,
    #[tabled(rename = "Selector")]
    #[serde(rename = "Selector")]
    selector: String,
}

// -- Row builders --

fn build_tracker_rows(trackers: &[Tracker]) -> Vec<TrackerRow> {
    trackers
        .iter()
        .map(|t| TrackerRow {
            id: t.id,
            owner: t.owner.to_string(),
            name: t.name.clone(),
            price: t.current_price.clone().unwrap_or_else(|| "-".to_string()),
            selector: t
                .active_selector
                .clone()
                .or_else(|| t.selectors.first().cloned())
                .unwrap_or_else(|| "auto".to_string()),
            render: if t.render_required { "yes" } else { "no" }.to_string(),
            url: t.url.clone(),
        })
        .collect()
}

fn build_change_rows(changes: &[ChangeRecord]) -> Vec<ChangeRow> {
    changes
        .iter()
        .map(|c| ChangeRow {
            tracker: c.tracker.to_string(),
            name: c.name.clone(),
            old: c.old_price.clone().unwrap_or_else(|| "-".to_string()),
            new: c
                .new_price
                .clone()
                .unwrap_or_else(|| "unavailable".to_string()),
            checked: c.checked_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect()
}

fn build_outcome_rows(outcomes: &[TrackerOutcome]) -> Vec<OutcomeRow> {
    outcomes
        .iter()
        .map(|o| OutcomeRow {
            tracker: o.tracker.to_string(),
            name: o.name.clone(),
            state: format!("{:?}", o.state).to_lowercase(),
            attempts: o.attempts,
            price: o
                .resolution
                .as_ref()
                .map(|r| r.price.clone())
                .unwrap_or_else(|| "-".to_string()),
            selector: o
                .resolution
                .as_ref()
                .map(|r| r.selector.clone())
                .unwrap_or_default(),
        })
        .collect()
}

fn build_candidate_rows(candidates: &[ScoredCandidate]) -> Vec<CandidateRow> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateRow {
            rank: i + 1,
            score: c.score,
            price: c.price().unwrap_or_default(),
            text: truncate(&c.candidate.text, 40),
            selector: c.candidate.selector.clone(),
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

fn render<T: Tabled>(rows: Vec<T>, format: &OutputFormat) -> String {
    let mut table = Table::new(rows);
    if let OutputFormat::Markdown = format {
        table.with(Style::markdown());
    }
    table.to_string()
}

// -- Printers --

pub fn print_trackers(trackers: &[Tracker], format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&build_tracker_rows(trackers)),
        _ => println!("{}", render(build_tracker_rows(trackers), format)),
    }
}

pub fn print_candidates(candidates: &[ScoredCandidate], format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&build_candidate_rows(candidates)),
        _ => println!("{}", render(build_candidate_rows(candidates), format)),
    }
}

pub fn print_report(report: &CycleReport, format: &OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        _ => {
            println!("{}", render(build_outcome_rows(&report.outcomes), format));
            if report.changes.is_empty() {
                println!("No price changes.");
            } else {
                println!("{}", render(build_change_rows(&report.changes), format));
            }
        }
    }
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}
