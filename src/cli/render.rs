use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use chrono::Local;

use crate::cli::output;
use crate::config::{self, Config, LimitsConfig};
use crate::cost::{self, CostCache, CostData};
use crate::history::{History, HistoryEntry};
use crate::limits::{self, Limits};
use crate::probe::credentials::{self, OAuthCredentials};
use crate::probe::usage_api;
use crate::render;
use crate::session::Session;
use crate::storage;
use crate::theme::Theme;
use crate::transcript::{self, DEFAULT_TAIL_LINES};
use crate::widget::registry::COST_WIDGETS;
use crate::widget::{Registry, SharedState};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Render the statusline for the session on stdin. Panics are caught and
/// turned into an empty line so the host always sees exit status 0.
pub fn run(debug: bool) -> Result<()> {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| render_stdin(debug)));

    match result {
        Ok(out) => println!("{}", out),
        Err(_) => {
            output::debug(debug, "render panicked; printing an empty line");
            println!();
        }
    }
    Ok(())
}

/// Force colour on: the host pipes stdout, which `colored` would otherwise
/// treat as "no colour". `NO_COLOR` still wins.
pub fn configure_color() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    } else {
        colored::control::set_override(true);
    }
}

fn render_stdin(debug: bool) -> String {
    configure_color();

    let session = Session::parse(std::io::stdin().lock());
    let config = load_config(&storage::config_path(), debug);
    let theme = Theme::resolve(
        &config.general.theme,
        &config.general.separator,
        &config.colors,
    );

    let state = gather(&session, &config, debug);
    let mut registry = Registry::new();
    registry.wire(&state);

    render::render_session(
        &session,
        &config,
        &registry,
        &theme,
        render::terminal_width(),
    )
}

fn load_config(path: &Path, debug: bool) -> Config {
    config::load(path).unwrap_or_else(|e| {
        output::debug(debug, &format!("config {} unusable, using defaults: {}", path.display(), e));
        tracing::warn!("using default config: {}", e);
        Config::default()
    })
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

fn references(config: &Config, names: &[&str]) -> bool {
    config
        .lines
        .iter()
        .flat_map(|line| line.all_widgets())
        .any(|w| names.contains(&w.name.as_str()))
}

/// Snapshot of this invocation for the history ring.
pub fn snapshot(session: &Session) -> HistoryEntry {
    HistoryEntry {
        timestamp: 0,
        context_pct: session.context_pct(),
        cost_usd: session.cost.total_cost_usd,
        duration_ms: session.cost.total_duration_ms,
        cache_hit_pct: session.cache_hit_pct().unwrap_or(0.0),
        api_latency_ms: session.api_latency_ms(),
    }
}

/// Load, enrich and persist everything the widgets need beyond the session.
/// Work for widgets the config never mentions is skipped.
fn gather(session: &Session, config: &Config, debug: bool) -> SharedState {
    let cache_dir = storage::cache_dir();

    let mut history = History::load(&cache_dir, &session.session_id);
    history.update_block_start_time();
    history.add(snapshot(session));
    if let Err(e) = history.save() {
        output::debug(debug, &format!("history not saved: {:#}", e));
    }
    let block_start = history.block_start_time;

    let transcript = (!session.transcript_path.is_empty()).then(|| {
        Rc::new(transcript::read_digest(
            Path::new(&session.transcript_path),
            DEFAULT_TAIL_LINES,
        ))
    });

    let wants_limits = references(config, &["block_limit", "week_limit"]);
    let wants_plan = references(config, &["plan"]);
    let creds = if wants_limits || wants_plan {
        credentials::load()
    } else {
        None
    };

    let mut cost = None;
    let mut limits = None;
    if references(config, COST_WIDGETS) {
        let data = aggregate_cost(&cache_dir, block_start, debug);
        if wants_limits {
            limits = Some(Rc::new(resolve_limits(
                &config.limits,
                &data,
                block_start,
                creds.as_ref(),
                debug,
            )));
        }
        cost = Some(Rc::new(data));
    }

    let plan = if wants_plan {
        credentials::plan_label(creds.as_ref(), |key| std::env::var(key).ok()).map(Rc::new)
    } else {
        None
    };

    SharedState {
        history: Some(Rc::new(history)),
        transcript,
        cost,
        limits,
        plan,
    }
}

fn aggregate_cost(cache_dir: &Path, block_start: i64, debug: bool) -> CostData {
    let mut cache = CostCache::load(cache_dir);
    let data = cost::aggregate(&storage::projects_dir(), &mut cache, block_start, Local::now());
    if let Err(e) = cache.save() {
        output::debug(debug, &format!("cost cache not saved: {:#}", e));
    }
    data
}

/// Limits from the usage API when enabled and reachable, else estimated from
/// local message counts.
pub fn resolve_limits(
    cfg: &LimitsConfig,
    data: &CostData,
    block_start: i64,
    creds: Option<&OAuthCredentials>,
    debug: bool,
) -> Limits {
    if cfg.usage_api {
        match creds {
            Some(c) => match usage_api::fetch_limits(&c.access_token) {
                Ok(limits) => return limits,
                Err(e) => output::debug(debug, &format!("usage API failed, estimating: {}", e)),
            },
            None => output::debug(debug, "usage API enabled but no credentials found"),
        }
    }

    let tier = if cfg.tier.trim().is_empty() {
        creds.map(|c| c.rate_limit_tier.as_str()).unwrap_or("")
    } else {
        cfg.tier.as_str()
    };
    limits::estimate(
        data,
        block_start,
        tier,
        cfg.five_hour,
        cfg.seven_day,
        Local::now(),
    )
}
